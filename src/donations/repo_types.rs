use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::geo::Point;
use crate::users::repo_types::MemberView;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "donation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    Available,
    Claimed,
}

/// A stored photo; `filename` is the randomized storage key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    pub filename: String,
    pub url: String,
    pub original_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PickupWindow {
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<Coordinates> for Point {
    fn from(c: Coordinates) -> Self {
        Point::new(c.latitude, c.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    pub coordinates: Coordinates,
}

/// A donation joined with its donor (and claimant, once claimed).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub id: Uuid,
    pub donor: MemberView,
    pub title: String,
    pub description: String,
    pub category: String,
    pub quantity: i32,
    pub unit: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expired_date: OffsetDateTime,
    pub pickup_window: PickupWindow,
    pub location: Location,
    pub images: Vec<StoredImage>,
    pub status: DonationStatus,
    pub claimed_by: Option<MemberView>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub claimed_at: Option<OffsetDateTime>,
    pub is_delivery: bool,
    #[serde(rename = "deliveryRadius")]
    pub delivery_radius_km: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

/// Flat row as selected from `donations` joined with `users`.
#[derive(Debug, FromRow)]
pub struct DonationRow {
    pub id: Uuid,
    pub donor_id: Uuid,
    pub donor_name: String,
    pub donor_email: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub quantity: i32,
    pub unit: String,
    pub expired_date: OffsetDateTime,
    pub pickup_start: OffsetDateTime,
    pub pickup_end: OffsetDateTime,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub images: Json<Vec<StoredImage>>,
    pub status: DonationStatus,
    pub claimed_by: Option<Uuid>,
    pub claimant_name: Option<String>,
    pub claimant_email: Option<String>,
    pub claimed_at: Option<OffsetDateTime>,
    pub is_delivery: bool,
    pub delivery_radius_km: i32,
    pub created_at: OffsetDateTime,
    #[sqlx(default)]
    pub distance_m: Option<f64>,
}

impl From<DonationRow> for Donation {
    fn from(r: DonationRow) -> Self {
        let claimed_by = match (r.claimed_by, r.claimant_name, r.claimant_email) {
            (Some(id), Some(name), Some(email)) => Some(MemberView { id, name, email }),
            _ => None,
        };
        Self {
            id: r.id,
            donor: MemberView {
                id: r.donor_id,
                name: r.donor_name,
                email: r.donor_email,
            },
            title: r.title,
            description: r.description,
            category: r.category,
            quantity: r.quantity,
            unit: r.unit,
            expired_date: r.expired_date,
            pickup_window: PickupWindow {
                start: r.pickup_start,
                end: r.pickup_end,
            },
            location: Location {
                address: r.address,
                coordinates: Coordinates {
                    latitude: r.latitude,
                    longitude: r.longitude,
                },
            },
            images: r.images.0,
            status: r.status,
            claimed_by,
            claimed_at: r.claimed_at,
            is_delivery: r.is_delivery,
            delivery_radius_km: r.delivery_radius_km,
            created_at: r.created_at,
            distance_km: r.distance_m.map(|m| m / 1000.0),
        }
    }
}

/// Validated input for a new donation.
#[derive(Debug, Clone)]
pub struct NewDonation {
    pub donor_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub quantity: i32,
    pub unit: String,
    pub expired_date: OffsetDateTime,
    pub pickup_window: PickupWindow,
    pub location: Location,
    pub images: Vec<StoredImage>,
    pub is_delivery: bool,
    pub delivery_radius_km: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proximity {
    pub center: Point,
    pub radius_m: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListFilter {
    pub category: Option<String>,
    pub near: Option<Proximity>,
    pub limit: i64,
}

#[derive(Debug)]
pub enum ClaimOutcome {
    Claimed(Donation),
    NotFound,
    OwnDonation,
    NotAvailable,
}
