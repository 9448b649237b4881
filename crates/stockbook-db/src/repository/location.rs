//! # Location Repository
//!
//! Stock points. Names are unique; a location is referenced by ledger rows,
//! purchase receipts, sale lines and sections, so there is no delete.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use stockbook_core::validation::validate_name;
use stockbook_core::Location;
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// Repository for locations.
#[derive(Debug, Clone)]
pub struct LocationRepository {
    pool: SqlitePool,
}

impl LocationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LocationRepository { pool }
    }

    /// Creates a location. A taken name is a `UniqueViolation`.
    pub async fn create(&self, name: &str) -> DbResult<Location> {
        validate_name("name", name)?;

        let location = Location {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO locations (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(&location.id)
            .bind(&location.name)
            .bind(location.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { .. } => DbError::duplicate("location name", &location.name),
                other => other,
            })?;

        info!(id = %location.id, name = %location.name, "Location created");
        Ok(location)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(
            "SELECT id, name, created_at FROM locations WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(
            "SELECT id, name, created_at FROM locations WHERE name = ?1",
        )
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    /// All locations by name.
    pub async fn list(&self) -> DbResult<Vec<Location>> {
        let locations = sqlx::query_as::<_, Location>(
            "SELECT id, name, created_at FROM locations ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(locations)
    }
}

/// Fails with `NotFound` unless the location exists.
pub(crate) async fn ensure_location(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM locations WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match exists {
        Some(_) => Ok(()),
        None => Err(DbError::not_found("Location", id)),
    }
}
