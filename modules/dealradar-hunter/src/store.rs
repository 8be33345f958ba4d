use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use thiserror::Error;
use tracing::info;

use dealradar_common::{Offer, Provider, UserProfile};

// --- Errors ---

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

// --- OfferStore trait ---

/// Persistence seam for offers and user profiles. The pipeline and the API
/// only ever talk to this trait, never to a concrete backend.
#[async_trait]
pub trait OfferStore: Send + Sync {
    async fn get_offer(&self, offer_id: &str) -> Result<Option<Offer>>;
    /// Insert or overwrite by `offer_id`.
    async fn put_offer(&self, offer: &Offer) -> Result<()>;
    /// All offers with `expires_at` after `as_of`, newest discovery first.
    async fn active_offers(&self, as_of: DateTime<Utc>) -> Result<Vec<Offer>>;
    /// Delete offers expired at `as_of`. Returns how many were removed.
    async fn reap_expired(&self, as_of: DateTime<Utc>) -> Result<u64>;
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;
    async fn put_profile(&self, profile: &UserProfile) -> Result<()>;
}

// --- Postgres implementation ---

pub struct PgOfferStore {
    pool: PgPool,
}

impl PgOfferStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Create tables and indexes if missing. Runs at boot; every statement
    /// is idempotent.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS offers (
                offer_id         TEXT PRIMARY KEY,
                provider         TEXT NOT NULL,
                title            TEXT NOT NULL,
                snippet          TEXT NOT NULL DEFAULT '',
                source_url       TEXT NOT NULL,
                discount         TEXT,
                confidence_score REAL NOT NULL,
                discovered_at    TIMESTAMPTZ NOT NULL,
                expires_at       TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS offers_expires_at_idx ON offers (expires_at)")
            .execute(&self.pool)
            .await?;

        // current_role is a reserved word in Postgres, hence the quoting.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                user_id            TEXT PRIMARY KEY,
                "current_role"     TEXT,
                target_role        TEXT,
                preferred_provider TEXT,
                location           TEXT,
                interests          TEXT[] NOT NULL DEFAULT '{}'
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Database schema ready");
        Ok(())
    }
}

#[async_trait]
impl OfferStore for PgOfferStore {
    async fn get_offer(&self, offer_id: &str) -> Result<Option<Offer>> {
        let row = sqlx::query_as::<_, OfferRow>(
            r#"
            SELECT offer_id, provider, title, snippet, source_url, discount,
                   confidence_score, discovered_at, expires_at
            FROM offers
            WHERE offer_id = $1
            "#,
        )
        .bind(offer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.0))
    }

    async fn put_offer(&self, offer: &Offer) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO offers (offer_id, provider, title, snippet, source_url,
                                discount, confidence_score, discovered_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (offer_id) DO UPDATE SET
                provider = EXCLUDED.provider,
                title = EXCLUDED.title,
                snippet = EXCLUDED.snippet,
                source_url = EXCLUDED.source_url,
                discount = EXCLUDED.discount,
                confidence_score = EXCLUDED.confidence_score,
                discovered_at = EXCLUDED.discovered_at,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(&offer.offer_id)
        .bind(offer.provider.as_str())
        .bind(&offer.title)
        .bind(&offer.snippet)
        .bind(&offer.source_url)
        .bind(&offer.discount)
        .bind(offer.confidence_score)
        .bind(offer.discovered_at)
        .bind(offer.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn active_offers(&self, as_of: DateTime<Utc>) -> Result<Vec<Offer>> {
        let rows = sqlx::query_as::<_, OfferRow>(
            r#"
            SELECT offer_id, provider, title, snippet, source_url, discount,
                   confidence_score, discovered_at, expires_at
            FROM offers
            WHERE expires_at > $1
            ORDER BY discovered_at DESC
            "#,
        )
        .bind(as_of)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn reap_expired(&self, as_of: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM offers WHERE expires_at <= $1")
            .bind(as_of)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT user_id, "current_role", target_role, preferred_provider,
                   location, interests
            FROM profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.0))
    }

    async fn put_profile(&self, profile: &UserProfile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, "current_role", target_role,
                                  preferred_provider, location, interests)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE SET
                "current_role" = EXCLUDED."current_role",
                target_role = EXCLUDED.target_role,
                preferred_provider = EXCLUDED.preferred_provider,
                location = EXCLUDED.location,
                interests = EXCLUDED.interests
            "#,
        )
        .bind(&profile.user_id)
        .bind(&profile.current_role)
        .bind(&profile.target_role)
        .bind(profile.preferred_provider.map(|p| p.as_str()))
        .bind(&profile.location)
        .bind(&profile.interests)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// --- Row mapping ---

struct OfferRow(Offer);

impl<'r> sqlx::FromRow<'r, PgRow> for OfferRow {
    fn from_row(row: &'r PgRow) -> std::result::Result<Self, sqlx::Error> {
        let provider: String = row.try_get("provider")?;
        Ok(OfferRow(Offer {
            offer_id: row.try_get("offer_id")?,
            provider: Provider::from_token(&provider),
            title: row.try_get("title")?,
            snippet: row.try_get("snippet")?,
            source_url: row.try_get("source_url")?,
            discount: row.try_get("discount")?,
            confidence_score: row.try_get("confidence_score")?,
            discovered_at: row.try_get("discovered_at")?,
            expires_at: row.try_get("expires_at")?,
        }))
    }
}

struct ProfileRow(UserProfile);

impl<'r> sqlx::FromRow<'r, PgRow> for ProfileRow {
    fn from_row(row: &'r PgRow) -> std::result::Result<Self, sqlx::Error> {
        let preferred: Option<String> = row.try_get("preferred_provider")?;
        Ok(ProfileRow(UserProfile {
            user_id: row.try_get("user_id")?,
            current_role: row.try_get("current_role")?,
            target_role: row.try_get("target_role")?,
            preferred_provider: preferred.map(|t| Provider::from_token(&t)),
            location: row.try_get("location")?,
            interests: row.try_get("interests")?,
        }))
    }
}
