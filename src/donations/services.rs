use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{DonationForm, ListQuery},
    repo_types::{ClaimOutcome, Donation},
    upload::{discard_images, store_images, ImageUpload},
};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

pub async fn list(state: &AppState, query: ListQuery) -> AppResult<Vec<Donation>> {
    let filter = query.into_filter()?;
    let donations = state
        .donations
        .list_available(&filter, OffsetDateTime::now_utc())
        .await?;
    Ok(donations)
}

pub async fn get(state: &AppState, id: Uuid) -> AppResult<Donation> {
    state
        .donations
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Donation not found".into()))
}

/// Validates the form, stores the images, then persists the donation.
/// Stored images are removed again if persisting fails.
pub async fn create(
    state: &AppState,
    donor_id: Uuid,
    form: DonationForm,
    uploads: Vec<ImageUpload>,
) -> AppResult<Donation> {
    let details = form.parse().map_err(|errors| {
        warn!(%donor_id, ?errors, "donation form rejected");
        AppError::Validation(errors)
    })?;

    let images = store_images(state.storage.as_ref(), uploads).await?;
    let new = details.into_new(donor_id, images.clone());

    match state.donations.create(new).await {
        Ok(donation) => {
            info!(donation_id = %donation.id, %donor_id, images = images.len(), "donation created");
            Ok(donation)
        }
        Err(e) => {
            discard_images(state.storage.as_ref(), &images).await;
            Err(e.into())
        }
    }
}

pub async fn claim(state: &AppState, donation_id: Uuid, claimant_id: Uuid) -> AppResult<Donation> {
    let outcome = state
        .donations
        .claim(donation_id, claimant_id, OffsetDateTime::now_utc())
        .await?;

    match outcome {
        ClaimOutcome::Claimed(donation) => {
            info!(%donation_id, %claimant_id, "donation claimed");
            Ok(donation)
        }
        ClaimOutcome::NotFound => Err(AppError::NotFound("Donation not found".into())),
        ClaimOutcome::OwnDonation => {
            warn!(%donation_id, %claimant_id, "donor tried to claim own donation");
            Err(AppError::SelfClaim("You cannot claim your own donation".into()))
        }
        ClaimOutcome::NotAvailable => {
            warn!(%donation_id, %claimant_id, "donation no longer available");
            Err(AppError::State("Donation has already been claimed or is unavailable".into()))
        }
    }
}

pub async fn donated_by(state: &AppState, user_id: Uuid) -> AppResult<Vec<Donation>> {
    Ok(state.donations.list_by_donor(user_id).await?)
}

pub async fn claimed_by(state: &AppState, user_id: Uuid) -> AppResult<Vec<Donation>> {
    Ok(state.donations.list_claimed_by(user_id).await?)
}
