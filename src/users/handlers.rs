use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    donations::{dto::DonationListResponse, services},
    error::AppResult,
    state::AppState,
};

pub fn users_routes() -> Router<AppState> {
    Router::new()
        .route("/users/me/donations", get(my_donations))
        .route("/users/me/claims", get(my_claims))
}

/// Donations the signed-in user has offered, any status.
#[instrument(skip(state))]
pub async fn my_donations(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<DonationListResponse>> {
    let donations = services::donated_by(&state, user_id).await?;
    Ok(Json(donations.into()))
}

/// Donations the signed-in user has claimed.
#[instrument(skip(state))]
pub async fn my_claims(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<DonationListResponse>> {
    let donations = services::claimed_by(&state, user_id).await?;
    Ok(Json(donations.into()))
}
