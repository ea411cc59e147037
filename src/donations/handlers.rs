use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, State},
    http::{header, HeaderName, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use bytes::BytesMut;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{
    dto::{DonationForm, DonationListResponse, DonationResponse, ListQuery},
    services,
    upload::{self, ImageKind, ImageUpload, MAX_IMAGES, MAX_IMAGE_BYTES},
};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    extract::{AppMultipart, AppPath, AppQuery},
    state::AppState,
};

// room for the images plus the text fields
const BODY_LIMIT: usize = MAX_IMAGES * MAX_IMAGE_BYTES + 1024 * 1024;

pub fn read_router() -> Router<AppState> {
    Router::new()
        .route("/donations", get(list_donations))
        .route("/donations/:id", get(get_donation))
}

pub fn write_router() -> Router<AppState> {
    Router::new()
        .route("/donations", post(create_donation))
        .route("/donations/:id/claim", put(claim_donation))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
}

#[instrument(skip(state))]
pub async fn list_donations(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListQuery>,
) -> AppResult<Json<DonationListResponse>> {
    let donations = services::list(&state, query).await?;
    Ok(Json(donations.into()))
}

#[instrument(skip(state))]
pub async fn get_donation(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<DonationResponse>> {
    let donation = services::get(&state, id).await?;
    Ok(Json(DonationResponse {
        success: true,
        message: None,
        donation,
    }))
}

/// POST /donations (multipart): text fields plus up to three `images`.
#[instrument(skip(state, mp))]
pub async fn create_donation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppMultipart(mut mp): AppMultipart,
) -> AppResult<(StatusCode, [(HeaderName, String); 1], Json<DonationResponse>)> {
    let mut form = DonationForm::default();
    let mut uploads: Vec<ImageUpload> = Vec::new();

    while let Some(mut field) = mp.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "images" || name == "images[]" {
            // browsers send an empty part when no file was picked
            if field.file_name().map_or(true, str::is_empty) {
                continue;
            }
            upload::check_count(uploads.len())?;
            let kind = ImageKind::detect(field.content_type(), field.file_name())?;
            let original_name = field.file_name().unwrap_or_default().to_string();

            let mut body = BytesMut::new();
            while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                upload::check_size(body.len() + chunk.len())?;
                body.extend_from_slice(&chunk);
            }
            uploads.push(ImageUpload {
                original_name,
                kind,
                body: body.freeze(),
            });
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            if !form.set(&name, value) {
                debug!(field = %name, "ignoring unknown form field");
            }
        }
    }

    let donation = services::create(&state, user_id, form, uploads).await?;
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/donations/{}", donation.id))],
        Json(DonationResponse {
            success: true,
            message: Some("Donation created"),
            donation,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn claim_donation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<DonationResponse>> {
    let donation = services::claim(&state, id, user_id).await?;
    Ok(Json(DonationResponse {
        success: true,
        message: Some("Donation claimed"),
        donation,
    }))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::FileTooLarge("Request body too large".into())
    } else {
        AppError::invalid("form", format!("Malformed multipart body: {}", e.body_text()))
    }
}
