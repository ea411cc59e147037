use anyhow::Context;
use axum::async_trait;
use sqlx::{types::Json, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use super::repo_types::{ClaimOutcome, Donation, DonationRow, DonationStatus, ListFilter, NewDonation};
use crate::geo::EARTH_RADIUS_M;

#[async_trait]
pub trait DonationRepo: Send + Sync {
    /// Available, unexpired donations matching `filter`.
    async fn list_available(&self, filter: &ListFilter, now: OffsetDateTime) -> anyhow::Result<Vec<Donation>>;
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Donation>>;
    /// Inserts the donation and bumps the donor's `total_donations` as one unit.
    async fn create(&self, new: NewDonation) -> anyhow::Result<Donation>;
    /// Moves an available donation to claimed and bumps the claimant's
    /// `total_received`, atomically with respect to other claims.
    async fn claim(&self, id: Uuid, claimant_id: Uuid, at: OffsetDateTime) -> anyhow::Result<ClaimOutcome>;
    async fn list_by_donor(&self, donor_id: Uuid) -> anyhow::Result<Vec<Donation>>;
    async fn list_claimed_by(&self, claimant_id: Uuid) -> anyhow::Result<Vec<Donation>>;
}

const DONATION_COLUMNS: &str = r#"
    d.id, d.donor_id, du.name AS donor_name, du.email AS donor_email,
    d.title, d.description, d.category, d.quantity, d.unit,
    d.expired_date, d.pickup_start, d.pickup_end,
    d.address, d.latitude, d.longitude, d.images, d.status,
    d.claimed_by, cu.name AS claimant_name, cu.email AS claimant_email, d.claimed_at,
    d.is_delivery, d.delivery_radius_km, d.created_at
"#;

const DONATION_JOINS: &str = r#"
    FROM donations d
    JOIN users du ON du.id = d.donor_id
    LEFT JOIN users cu ON cu.id = d.claimed_by
"#;

#[derive(Clone)]
pub struct PgDonationRepo {
    db: PgPool,
}

impl PgDonationRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn fetch_one_tx(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> anyhow::Result<Donation> {
        let row = sqlx::query_as::<_, DonationRow>(&format!(
            "SELECT {DONATION_COLUMNS} {DONATION_JOINS} WHERE d.id = $1"
        ))
        .bind(id)
        .fetch_one(&mut **tx)
        .await
        .context("reload donation")?;
        Ok(row.into())
    }
}

#[async_trait]
impl DonationRepo for PgDonationRepo {
    async fn list_available(&self, filter: &ListFilter, now: OffsetDateTime) -> anyhow::Result<Vec<Donation>> {
        let rows = match filter.near {
            Some(near) => {
                // haversine, clamped so float noise never pushes asin out of range
                sqlx::query_as::<_, DonationRow>(&format!(
                    r#"
                    SELECT * FROM (
                        SELECT {DONATION_COLUMNS},
                               2 * {EARTH_RADIUS_M} * asin(LEAST(1.0, sqrt(
                                   power(sin(radians(d.latitude - $1) / 2), 2)
                                   + cos(radians($1)) * cos(radians(d.latitude))
                                     * power(sin(radians(d.longitude - $2) / 2), 2)
                               ))) AS distance_m
                        {DONATION_JOINS}
                        WHERE d.status = 'available'
                          AND d.expired_date >= $3
                          AND ($4::text IS NULL OR d.category = $4)
                    ) nearby
                    WHERE distance_m <= $5
                    ORDER BY distance_m ASC
                    LIMIT $6
                    "#
                ))
                .bind(near.center.latitude)
                .bind(near.center.longitude)
                .bind(now)
                .bind(filter.category.as_deref())
                .bind(near.radius_m)
                .bind(filter.limit)
                .fetch_all(&self.db)
                .await
                .context("list donations near point")?
            }
            None => sqlx::query_as::<_, DonationRow>(&format!(
                r#"
                SELECT {DONATION_COLUMNS}
                {DONATION_JOINS}
                WHERE d.status = 'available'
                  AND d.expired_date >= $1
                  AND ($2::text IS NULL OR d.category = $2)
                ORDER BY d.created_at DESC
                LIMIT $3
                "#
            ))
            .bind(now)
            .bind(filter.category.as_deref())
            .bind(filter.limit)
            .fetch_all(&self.db)
            .await
            .context("list donations")?,
        };
        Ok(rows.into_iter().map(Donation::from).collect())
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Donation>> {
        let row = sqlx::query_as::<_, DonationRow>(&format!(
            "SELECT {DONATION_COLUMNS} {DONATION_JOINS} WHERE d.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find donation")?;
        Ok(row.map(Donation::from))
    }

    async fn create(&self, new: NewDonation) -> anyhow::Result<Donation> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO donations (
                donor_id, title, description, category, quantity, unit,
                expired_date, pickup_start, pickup_end,
                address, latitude, longitude, images,
                is_delivery, delivery_radius_km
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING id
            "#,
        )
        .bind(new.donor_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.category)
        .bind(new.quantity)
        .bind(&new.unit)
        .bind(new.expired_date)
        .bind(new.pickup_window.start)
        .bind(new.pickup_window.end)
        .bind(&new.location.address)
        .bind(new.location.coordinates.latitude)
        .bind(new.location.coordinates.longitude)
        .bind(Json(&new.images))
        .bind(new.is_delivery)
        .bind(new.delivery_radius_km)
        .fetch_one(&mut *tx)
        .await
        .context("insert donation")?;

        let updated = sqlx::query("UPDATE users SET total_donations = total_donations + 1 WHERE id = $1")
            .bind(new.donor_id)
            .execute(&mut *tx)
            .await
            .context("increment total_donations")?;
        anyhow::ensure!(updated.rows_affected() == 1, "donor {} not found", new.donor_id);

        let donation = Self::fetch_one_tx(&mut tx, id).await?;
        tx.commit().await.context("commit tx")?;
        Ok(donation)
    }

    async fn claim(&self, id: Uuid, claimant_id: Uuid, at: OffsetDateTime) -> anyhow::Result<ClaimOutcome> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        // Conditional write: only one concurrent claimant can see status = 'available'.
        let claimed = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE donations
               SET status = 'claimed', claimed_by = $2, claimed_at = $3
             WHERE id = $1 AND status = 'available' AND donor_id <> $2
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(claimant_id)
        .bind(at)
        .fetch_optional(&mut *tx)
        .await
        .context("claim donation")?;

        if claimed.is_none() {
            let current = sqlx::query_as::<_, (Uuid, DonationStatus)>(
                "SELECT donor_id, status FROM donations WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .context("load donation state")?;
            tx.rollback().await.context("rollback tx")?;

            debug!(donation_id = %id, ?current, "claim guard rejected");
            return Ok(match current {
                None => ClaimOutcome::NotFound,
                Some((donor_id, _)) if donor_id == claimant_id => ClaimOutcome::OwnDonation,
                Some(_) => ClaimOutcome::NotAvailable,
            });
        }

        let updated = sqlx::query("UPDATE users SET total_received = total_received + 1 WHERE id = $1")
            .bind(claimant_id)
            .execute(&mut *tx)
            .await
            .context("increment total_received")?;
        anyhow::ensure!(updated.rows_affected() == 1, "claimant {} not found", claimant_id);

        let donation = Self::fetch_one_tx(&mut tx, id).await?;
        tx.commit().await.context("commit tx")?;
        Ok(ClaimOutcome::Claimed(donation))
    }

    async fn list_by_donor(&self, donor_id: Uuid) -> anyhow::Result<Vec<Donation>> {
        let rows = sqlx::query_as::<_, DonationRow>(&format!(
            "SELECT {DONATION_COLUMNS} {DONATION_JOINS} WHERE d.donor_id = $1 ORDER BY d.created_at DESC"
        ))
        .bind(donor_id)
        .fetch_all(&self.db)
        .await
        .context("list donations by donor")?;
        Ok(rows.into_iter().map(Donation::from).collect())
    }

    async fn list_claimed_by(&self, claimant_id: Uuid) -> anyhow::Result<Vec<Donation>> {
        let rows = sqlx::query_as::<_, DonationRow>(&format!(
            "SELECT {DONATION_COLUMNS} {DONATION_JOINS} WHERE d.claimed_by = $1 ORDER BY d.claimed_at DESC"
        ))
        .bind(claimant_id)
        .fetch_all(&self.db)
        .await
        .context("list donations claimed by user")?;
        Ok(rows.into_iter().map(Donation::from).collect())
    }
}
