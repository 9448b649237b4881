//! # Channel & Section Repository
//!
//! Sales channels and their sections. A section is where a sale is rung up
//! and decides which location its stock comes out of.
//!
//! ```text
//! Online ──┬── Snoonu  ──► Main Store
//!          ├── Talabat ──► Main Store
//!          └── Rafeeq  ──► Warehouse
//! Offline ─┬── Main Store ──► Main Store     (one per location,
//!          └── Warehouse  ──► Warehouse       named after it)
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use stockbook_core::validation::validate_name;
use stockbook_core::{SalesChannel, SalesSection};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::location::ensure_location;

pub const ONLINE_CHANNEL: &str = "Online";
pub const OFFLINE_CHANNEL: &str = "Offline";

/// Repository for channels and sections.
#[derive(Debug, Clone)]
pub struct SectionRepository {
    pool: SqlitePool,
}

impl SectionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SectionRepository { pool }
    }

    // =========================================================================
    // Channels
    // =========================================================================

    /// Creates a channel. Names are unique, ignoring case.
    pub async fn create_channel(&self, name: &str) -> DbResult<SalesChannel> {
        validate_name("name", name)?;

        let channel = SalesChannel {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
        };

        sqlx::query("INSERT INTO sales_channels (id, name) VALUES (?1, ?2)")
            .bind(&channel.id)
            .bind(&channel.name)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { .. } => DbError::duplicate("channel name", &channel.name),
                other => other,
            })?;

        info!(id = %channel.id, name = %channel.name, "Sales channel created");
        Ok(channel)
    }

    pub async fn list_channels(&self) -> DbResult<Vec<SalesChannel>> {
        let channels =
            sqlx::query_as::<_, SalesChannel>("SELECT id, name FROM sales_channels ORDER BY name")
                .fetch_all(&self.pool)
                .await?;

        Ok(channels)
    }

    /// Case-insensitive lookup.
    pub async fn get_channel_by_name(&self, name: &str) -> DbResult<Option<SalesChannel>> {
        let channel = sqlx::query_as::<_, SalesChannel>(
            "SELECT id, name FROM sales_channels WHERE name = ?1 COLLATE NOCASE",
        )
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(channel)
    }

    /// Makes sure the "Online" and "Offline" channels exist. Idempotent.
    pub async fn ensure_default_channels(&self) -> DbResult<Vec<SalesChannel>> {
        for name in [ONLINE_CHANNEL, OFFLINE_CHANNEL] {
            let inserted = sqlx::query("INSERT OR IGNORE INTO sales_channels (id, name) VALUES (?1, ?2)")
                .bind(Uuid::new_v4().to_string())
                .bind(name)
                .execute(&self.pool)
                .await?;

            if inserted.rows_affected() > 0 {
                info!(name, "Default sales channel created");
            }
        }

        self.list_channels().await
    }

    // =========================================================================
    // Sections
    // =========================================================================

    /// Creates a section bound to a location.
    ///
    /// ## Returns
    /// * `Err(NotFound)` - unknown channel or location
    /// * `Err(UniqueViolation)` - channel already has a section of that name
    pub async fn create_section(
        &self,
        channel_id: &str,
        name: &str,
        location_id: &str,
    ) -> DbResult<SalesSection> {
        validate_name("name", name)?;

        let mut conn = self.pool.acquire().await?;
        ensure_channel(&mut conn, channel_id).await?;
        ensure_location(&mut conn, location_id).await?;

        let section = SalesSection {
            id: Uuid::new_v4().to_string(),
            channel_id: channel_id.to_string(),
            name: name.trim().to_string(),
            location_id: location_id.to_string(),
        };

        sqlx::query(
            "INSERT INTO sales_sections (id, channel_id, name, location_id) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&section.id)
        .bind(&section.channel_id)
        .bind(&section.name)
        .bind(&section.location_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("section name", &section.name),
            other => other,
        })?;

        info!(id = %section.id, name = %section.name, "Sales section created");
        Ok(section)
    }

    pub async fn get_section(&self, id: &str) -> DbResult<Option<SalesSection>> {
        let mut conn = self.pool.acquire().await?;
        fetch_section(&mut conn, id).await
    }

    /// Rebinds a section to another location. Later sales deduct from it.
    pub async fn set_section_location(&self, section_id: &str, location_id: &str) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        ensure_location(&mut conn, location_id).await?;

        let result = sqlx::query("UPDATE sales_sections SET location_id = ?2 WHERE id = ?1")
            .bind(section_id)
            .bind(location_id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Section", section_id));
        }

        debug!(section_id, location_id, "Section location changed");
        Ok(())
    }

    /// Sections of one channel, by name.
    pub async fn list_by_channel(&self, channel_id: &str) -> DbResult<Vec<SalesSection>> {
        let sections = sqlx::query_as::<_, SalesSection>(
            r#"
            SELECT id, channel_id, name, location_id
            FROM sales_sections
            WHERE channel_id = ?1
            ORDER BY name
            "#,
        )
        .bind(channel_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sections)
    }

    /// Sections of the channel with this name (any case).
    pub async fn list_by_channel_name(&self, channel_name: &str) -> DbResult<Vec<SalesSection>> {
        let sections = sqlx::query_as::<_, SalesSection>(
            r#"
            SELECT s.id, s.channel_id, s.name, s.location_id
            FROM sales_sections s
            INNER JOIN sales_channels c ON c.id = s.channel_id
            WHERE c.name = ?1 COLLATE NOCASE
            ORDER BY s.name
            "#,
        )
        .bind(channel_name.trim())
        .fetch_all(&self.pool)
        .await?;

        Ok(sections)
    }

    /// Gives every location a section of the same name in the Offline
    /// channel. Returns how many sections were created.
    pub async fn ensure_offline_sections(&self) -> DbResult<u64> {
        self.ensure_default_channels().await?;

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO sales_sections (id, channel_id, name, location_id)
            SELECT lower(hex(randomblob(16))), c.id, l.name, l.id
            FROM locations l
            CROSS JOIN sales_channels c
            WHERE c.name = ?1 COLLATE NOCASE
            "#,
        )
        .bind(OFFLINE_CHANNEL)
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected();
        if created > 0 {
            info!(created, "Offline sections created");
        }
        Ok(created)
    }
}

/// Loads a section on the caller's connection or transaction.
pub(crate) async fn fetch_section(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<SalesSection>> {
    let section = sqlx::query_as::<_, SalesSection>(
        "SELECT id, channel_id, name, location_id FROM sales_sections WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(section)
}

async fn ensure_channel(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM sales_channels WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match exists {
        Some(_) => Ok(()),
        None => Err(DbError::not_found("Channel", id)),
    }
}
