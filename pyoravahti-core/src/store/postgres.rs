//! PostgreSQL implementation of the bike store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{BikeQuery, BikeStore, StoreError};
use crate::bike::{
    Bike, BikeDetails, BikeImage, BikeStatus, BikeUpdate, Find, NewBike, NewFind, NewReport,
    Report,
};

const BIKE_COLUMNS: &str = "id, brand, model, color, serial_number, description, status, \
     location_lat, location_lng, city, source, source_url, phash, created_at, updated_at, \
     archived, archived_at";

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(db.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Connection(e.to_string())
            }
            _ => Self::Query(e.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Self::Migration(e.to_string())
    }
}

/// PostgreSQL-backed bike store.
#[derive(Clone)]
pub struct PostgresBikeStore {
    pool: PgPool,
}

/// Row type for bike queries. Status is stored as text.
#[derive(FromRow)]
struct BikeRow {
    id: Uuid,
    brand: Option<String>,
    model: Option<String>,
    color: Option<String>,
    serial_number: Option<String>,
    description: Option<String>,
    status: String,
    location_lat: Option<f64>,
    location_lng: Option<f64>,
    city: Option<String>,
    source: Option<String>,
    source_url: Option<String>,
    phash: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    archived: bool,
    archived_at: Option<DateTime<Utc>>,
}

impl TryFrom<BikeRow> for Bike {
    type Error = StoreError;

    fn try_from(row: BikeRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<BikeStatus>()
            .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(Self {
            id: row.id,
            brand: row.brand,
            model: row.model,
            color: row.color,
            serial_number: row.serial_number,
            description: row.description,
            status,
            location_lat: row.location_lat,
            location_lng: row.location_lng,
            city: row.city,
            source: row.source,
            source_url: row.source_url,
            phash: row.phash,
            created_at: row.created_at,
            updated_at: row.updated_at,
            archived: row.archived,
            archived_at: row.archived_at,
        })
    }
}

#[derive(FromRow)]
struct ImageRow {
    id: Uuid,
    bike_id: Uuid,
    url: String,
    created_at: DateTime<Utc>,
}

impl From<ImageRow> for BikeImage {
    fn from(row: ImageRow) -> Self {
        Self {
            id: row.id,
            bike_id: row.bike_id,
            url: row.url,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct ReportRow {
    id: Uuid,
    user_id: String,
    bike_id: Uuid,
    lost_date: Option<DateTime<Utc>>,
    place: Option<String>,
    contact: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ReportRow> for Report {
    fn from(row: ReportRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            bike_id: row.bike_id,
            lost_date: row.lost_date,
            place: row.place,
            contact: row.contact,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct FindRow {
    id: Uuid,
    user_id: String,
    bike_id: Uuid,
    note: Option<String>,
    found_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<FindRow> for Find {
    fn from(row: FindRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            bike_id: row.bike_id,
            note: row.note,
            found_date: row.found_date,
            created_at: row.created_at,
        }
    }
}

fn into_bikes(rows: Vec<BikeRow>) -> Result<Vec<Bike>, StoreError> {
    rows.into_iter().map(Bike::try_from).collect()
}

/// Escape LIKE wildcards so user input is matched literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Row limit as a SQL bigint; oversized values saturate instead of wrapping negative.
fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Append the WHERE clause for `query`.
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &BikeQuery) {
    builder.push(" WHERE TRUE");

    if !query.statuses.is_empty() {
        let statuses: Vec<String> = query.statuses.iter().map(|s| s.to_string()).collect();
        builder.push(" AND status = ANY(").push_bind(statuses).push(")");
    }
    if let Some(id) = query.exclude_id {
        builder.push(" AND id <> ").push_bind(id);
    }
    if let Some(serial) = &query.serial_number {
        builder.push(" AND serial_number = ").push_bind(serial.clone());
    }
    if query.has_phash {
        builder.push(" AND phash IS NOT NULL");
    }
    for (column, value) in [
        ("brand", &query.brand),
        ("city", &query.city),
        ("color", &query.color),
    ] {
        if let Some(term) = value {
            builder
                .push(format!(" AND {} ILIKE ", column))
                .push_bind(like_pattern(term));
        }
    }
    if let Some(term) = &query.search {
        let pattern = like_pattern(term);
        builder.push(" AND (");
        let mut separated = builder.separated(" OR ");
        for column in ["brand", "model", "color", "city", "serial_number"] {
            separated
                .push(format!("{} ILIKE ", column))
                .push_bind_unseparated(pattern.clone());
        }
        builder.push(")");
    }
    if let Some(after) = query.created_after {
        builder.push(" AND created_at >= ").push_bind(after);
    }
}

impl PostgresBikeStore {
    /// Connect to the database and apply pending migrations.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::info!(
            max_connections,
            min_connections,
            "Bike store connected and migrations applied"
        );

        Ok(Self { pool })
    }
}

#[async_trait]
impl BikeStore for PostgresBikeStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn check_health(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn get_bike(&self, id: Uuid) -> Result<Option<Bike>, StoreError> {
        let row: Option<BikeRow> =
            sqlx::query_as(&format!("SELECT {} FROM bikes WHERE id = $1", BIKE_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Bike::try_from).transpose()
    }

    async fn get_bike_details(&self, id: Uuid) -> Result<Option<BikeDetails>, StoreError> {
        let Some(bike) = self.get_bike(id).await? else {
            return Ok(None);
        };

        let images = self.images_for(id, None).await?;

        let reports: Vec<ReportRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, bike_id, lost_date, place, contact, created_at
            FROM reports
            WHERE bike_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let finds: Vec<FindRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, bike_id, note, found_date, created_at
            FROM finds
            WHERE bike_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(BikeDetails {
            bike,
            images,
            reports: reports.into_iter().map(Into::into).collect(),
            finds: finds.into_iter().map(Into::into).collect(),
        }))
    }

    async fn find_bikes(&self, query: &BikeQuery) -> Result<Vec<Bike>, StoreError> {
        let mut builder = QueryBuilder::new(format!("SELECT {} FROM bikes", BIKE_COLUMNS));
        push_filters(&mut builder, query);
        builder.push(" ORDER BY created_at DESC");
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(sql_limit(limit));
        }

        let rows: Vec<BikeRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        into_bikes(rows)
    }

    async fn count_bikes(&self, query: &BikeQuery) -> Result<u64, StoreError> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM bikes");
        push_filters(&mut builder, query);

        let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn images_for(
        &self,
        bike_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<BikeImage>, StoreError> {
        let rows: Vec<ImageRow> = sqlx::query_as(
            r#"
            SELECT id, bike_id, url, created_at
            FROM bike_images
            WHERE bike_id = $1
            ORDER BY created_at ASC
            LIMIT $2
            "#,
        )
        .bind(bike_id)
        .bind(limit.map(sql_limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_by_serial_number(&self, serial: &str) -> Result<Option<Bike>, StoreError> {
        let query = BikeQuery {
            limit: Some(1),
            ..BikeQuery::default().with_serial_number(serial)
        };
        Ok(self.find_bikes(&query).await?.into_iter().next())
    }

    async fn find_by_source_url(
        &self,
        source_url: &str,
        status: BikeStatus,
    ) -> Result<Option<Bike>, StoreError> {
        let row: Option<BikeRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bikes WHERE source_url = $1 AND status = $2",
            BIKE_COLUMNS
        ))
        .bind(source_url)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Bike::try_from).transpose()
    }

    async fn create_bike(&self, input: NewBike) -> Result<Bike, StoreError> {
        let status = input.status_or_default();
        let row: BikeRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO bikes (id, brand, model, color, serial_number, description, status,
                               location_lat, location_lng, city, source, source_url, phash,
                               created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, COALESCE($14, NOW()))
            RETURNING {}
            "#,
            BIKE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&input.brand)
        .bind(&input.model)
        .bind(&input.color)
        .bind(&input.serial_number)
        .bind(&input.description)
        .bind(status.as_str())
        .bind(input.location_lat)
        .bind(input.location_lng)
        .bind(&input.city)
        .bind(&input.source)
        .bind(&input.source_url)
        .bind(&input.phash)
        .bind(input.created_at)
        .fetch_one(&self.pool)
        .await?;

        let bike = Bike::try_from(row)?;
        tracing::debug!(bike_id = %bike.id, status = %bike.status, "Created bike");
        Ok(bike)
    }

    async fn update_bike(
        &self,
        id: Uuid,
        update: BikeUpdate,
    ) -> Result<Option<Bike>, StoreError> {
        let row: Option<BikeRow> = sqlx::query_as(&format!(
            r#"
            UPDATE bikes SET
                brand = COALESCE($2, brand),
                model = COALESCE($3, model),
                color = COALESCE($4, color),
                serial_number = COALESCE($5, serial_number),
                description = COALESCE($6, description),
                status = COALESCE($7, status),
                location_lat = COALESCE($8, location_lat),
                location_lng = COALESCE($9, location_lng),
                city = COALESCE($10, city),
                phash = COALESCE($11, phash),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            BIKE_COLUMNS
        ))
        .bind(id)
        .bind(&update.brand)
        .bind(&update.model)
        .bind(&update.color)
        .bind(&update.serial_number)
        .bind(&update.description)
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.location_lat)
        .bind(update.location_lng)
        .bind(&update.city)
        .bind(&update.phash)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Bike::try_from).transpose()
    }

    async fn archive_bike(&self, id: Uuid) -> Result<Option<Bike>, StoreError> {
        let row: Option<BikeRow> = sqlx::query_as(&format!(
            r#"
            UPDATE bikes SET archived = TRUE, archived_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            BIKE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Bike::try_from).transpose()
    }

    async fn delete_bike(&self, id: Uuid) -> Result<Option<Bike>, StoreError> {
        // Images, reports and finds go with the bike (ON DELETE CASCADE)
        let row: Option<BikeRow> = sqlx::query_as(&format!(
            "DELETE FROM bikes WHERE id = $1 RETURNING {}",
            BIKE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Bike::try_from).transpose()
    }

    async fn add_image(&self, bike_id: Uuid, url: String) -> Result<BikeImage, StoreError> {
        let row: ImageRow = sqlx::query_as(
            r#"
            INSERT INTO bike_images (id, bike_id, url)
            VALUES ($1, $2, $3)
            RETURNING id, bike_id, url, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(bike_id)
        .bind(url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StoreError::NotFound(format!("bike {}", bike_id))
            }
            other => other.into(),
        })?;

        Ok(row.into())
    }

    async fn create_report(&self, input: NewReport) -> Result<Report, StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE bikes SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(input.bike_id)
            .bind(BikeStatus::Stolen.as_str())
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("bike {}", input.bike_id)));
        }

        let row: ReportRow = sqlx::query_as(
            r#"
            INSERT INTO reports (id, user_id, bike_id, lost_date, place, contact)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, bike_id, lost_date, place, contact, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.user_id)
        .bind(input.bike_id)
        .bind(input.lost_date)
        .bind(&input.place)
        .bind(&input.contact)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn create_find(&self, input: NewFind) -> Result<Find, StoreError> {
        let row: FindRow = sqlx::query_as(
            r#"
            INSERT INTO finds (id, user_id, bike_id, note, found_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, bike_id, note, found_date, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.user_id)
        .bind(input.bike_id)
        .bind(&input.note)
        .bind(input.found_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StoreError::NotFound(format!("bike {}", input.bike_id))
            }
            other => other.into(),
        })?;

        Ok(row.into())
    }
}
