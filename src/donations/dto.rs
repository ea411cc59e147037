use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
    PrimitiveDateTime,
};
use uuid::Uuid;

use super::repo_types::{
    Coordinates, Donation, ListFilter, Location, NewDonation, PickupWindow, Proximity, StoredImage,
};
use crate::{
    error::{AppError, AppResult},
    geo::{km_to_m, Point},
    validation::{required, FieldError, Validate},
};

pub const DEFAULT_UNIT: &str = "porsi";
pub const DEFAULT_DELIVERY_RADIUS_KM: i32 = 5;
pub const DEFAULT_SEARCH_RADIUS_KM: f64 = 10.0;
pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius: Option<f64>,
    pub category: Option<String>,
    pub limit: Option<i64>,
}

impl ListQuery {
    pub fn into_filter(self) -> AppResult<ListFilter> {
        let category = self
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty() && c != "all");

        let near = match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => {
                let center = Point::new(lat, lng);
                if !center.is_valid() {
                    return Err(AppError::invalid("lat", "Coordinates out of range"));
                }
                let radius_km = self.radius.unwrap_or(DEFAULT_SEARCH_RADIUS_KM);
                if !(radius_km.is_finite() && radius_km > 0.0) {
                    return Err(AppError::invalid("radius", "radius must be a positive number"));
                }
                Some(Proximity {
                    center,
                    radius_m: km_to_m(radius_km),
                })
            }
            (None, None) => None,
            _ => {
                return Err(AppError::invalid(
                    "lat",
                    "lat and lng must be given together",
                ))
            }
        };

        Ok(ListFilter {
            category,
            near,
            limit: self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        })
    }
}

/// Text fields of the multipart donation form, as received.
#[derive(Debug, Default, Clone)]
pub struct DonationForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<String>,
    pub unit: Option<String>,
    pub expired_date: Option<String>,
    pub pickup_start: Option<String>,
    pub pickup_end: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub is_delivery: Option<String>,
    pub delivery_radius: Option<String>,
}

/// Parsed and checked donation content.
#[derive(Debug, Clone, PartialEq)]
pub struct DonationDetails {
    pub title: String,
    pub description: String,
    pub category: String,
    pub quantity: i32,
    pub unit: String,
    pub expired_date: OffsetDateTime,
    pub pickup_window: PickupWindow,
    pub location: Location,
    pub is_delivery: bool,
    pub delivery_radius_km: i32,
}

impl DonationDetails {
    pub fn into_new(self, donor_id: Uuid, images: Vec<StoredImage>) -> NewDonation {
        NewDonation {
            donor_id,
            title: self.title,
            description: self.description,
            category: self.category,
            quantity: self.quantity,
            unit: self.unit,
            expired_date: self.expired_date,
            pickup_window: self.pickup_window,
            location: self.location,
            images,
            is_delivery: self.is_delivery,
            delivery_radius_km: self.delivery_radius_km,
        }
    }
}

impl DonationForm {
    /// Stores a multipart text field; returns false for unknown names.
    pub fn set(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "title" => &mut self.title,
            "description" => &mut self.description,
            "category" => &mut self.category,
            "quantity" => &mut self.quantity,
            "unit" => &mut self.unit,
            "expiredDate" => &mut self.expired_date,
            "pickupStart" => &mut self.pickup_start,
            "pickupEnd" => &mut self.pickup_end,
            "address" => &mut self.address,
            "latitude" => &mut self.latitude,
            "longitude" => &mut self.longitude,
            "isDelivery" => &mut self.is_delivery,
            "deliveryRadius" => &mut self.delivery_radius,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    pub fn parse(&self) -> Result<DonationDetails, Vec<FieldError>> {
        let mut errors = Vec::new();

        let title = required(&mut errors, "title", &self.title);
        let description = required(&mut errors, "description", &self.description);
        let category = required(&mut errors, "category", &self.category);
        let address = required(&mut errors, "address", &self.address);

        let quantity = required(&mut errors, "quantity", &self.quantity).and_then(|q| {
            match q.parse::<i32>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    errors.push(FieldError::new("quantity", "quantity must be a positive integer"));
                    None
                }
            }
        });

        let expired_date = required(&mut errors, "expiredDate", &self.expired_date)
            .and_then(|v| instant(&mut errors, "expiredDate", v));
        let pickup_start = required(&mut errors, "pickupStart", &self.pickup_start)
            .and_then(|v| instant(&mut errors, "pickupStart", v));
        let pickup_end = required(&mut errors, "pickupEnd", &self.pickup_end)
            .and_then(|v| instant(&mut errors, "pickupEnd", v));
        if let (Some(start), Some(end)) = (pickup_start, pickup_end) {
            if end < start {
                errors.push(FieldError::new("pickupEnd", "pickupEnd must not be before pickupStart"));
            }
        }

        let latitude = required(&mut errors, "latitude", &self.latitude)
            .and_then(|v| coordinate(&mut errors, "latitude", v, 90.0));
        let longitude = required(&mut errors, "longitude", &self.longitude)
            .and_then(|v| coordinate(&mut errors, "longitude", v, 180.0));

        let unit = self
            .unit
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_UNIT)
            .to_string();
        let is_delivery = self.is_delivery.as_deref().map(str::trim) == Some("true");
        let delivery_radius_km = match self.delivery_radius.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_DELIVERY_RADIUS_KM,
            Some(v) => match v.parse::<i32>() {
                Ok(n) if n >= 0 => n,
                _ => {
                    errors.push(FieldError::new(
                        "deliveryRadius",
                        "deliveryRadius must be a non-negative integer",
                    ));
                    DEFAULT_DELIVERY_RADIUS_KM
                }
            },
        };

        match (
            title,
            description,
            category,
            address,
            quantity,
            expired_date,
            pickup_start,
            pickup_end,
            latitude,
            longitude,
        ) {
            (
                Some(title),
                Some(description),
                Some(category),
                Some(address),
                Some(quantity),
                Some(expired_date),
                Some(start),
                Some(end),
                Some(latitude),
                Some(longitude),
            ) if errors.is_empty() => Ok(DonationDetails {
                title: title.to_string(),
                description: description.to_string(),
                category: category.to_string(),
                quantity,
                unit,
                expired_date,
                pickup_window: PickupWindow { start, end },
                location: Location {
                    address: address.to_string(),
                    coordinates: Coordinates {
                        latitude,
                        longitude,
                    },
                },
                is_delivery,
                delivery_radius_km,
            }),
            _ => Err(errors),
        }
    }
}

impl Validate for DonationForm {
    fn validate(&self) -> Vec<FieldError> {
        self.parse().err().unwrap_or_default()
    }
}

fn instant(errors: &mut Vec<FieldError>, field: &'static str, value: &str) -> Option<OffsetDateTime> {
    let parsed = parse_instant(value);
    if parsed.is_none() {
        errors.push(FieldError::new(field, format!("{} is not a valid date", field)));
    }
    parsed
}

fn coordinate(errors: &mut Vec<FieldError>, field: &'static str, value: &str, bound: f64) -> Option<f64> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() && (-bound..=bound).contains(&v) => Some(v),
        _ => {
            errors.push(FieldError::new(field, format!("{} is out of range", field)));
            None
        }
    }
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` and `YYYY-MM-DD`; naive values are UTC.
pub fn parse_instant(value: &str) -> Option<OffsetDateTime> {
    if let Ok(t) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(t);
    }
    if let Ok(t) = PrimitiveDateTime::parse(
        value,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(t.assume_utc());
    }
    if let Ok(t) = PrimitiveDateTime::parse(value, format_description!("[year]-[month]-[day]T[hour]:[minute]")) {
        return Some(t.assume_utc());
    }
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|d| d.midnight().assume_utc())
}

#[derive(Debug, Serialize)]
pub struct DonationListResponse {
    pub success: bool,
    pub count: usize,
    pub donations: Vec<Donation>,
}

impl From<Vec<Donation>> for DonationListResponse {
    fn from(donations: Vec<Donation>) -> Self {
        Self {
            success: true,
            count: donations.len(),
            donations,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DonationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub donation: Donation,
}
