use crate::error::RepositoryError;
use crate::models::{CreateRoomRequest, Owner, Room, RoomFilter, UpdateRoomRequest};
use async_trait::async_trait;
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

/// RoomRepository Trait
///
/// Defines the abstract contract for all listing persistence operations,
/// allowing the handlers to interact with the data layer without knowing the
/// concrete implementation (Postgres, Mock, etc.). Every operation returns a
/// uniform `Result<T, RepositoryError>`; failures are values, never panics.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn RoomRepository>`) safely shareable across Axum's task boundaries.
#[async_trait]
pub trait RoomRepository: Send + Sync {
    // --- Listing Retrieval ---
    /// Public listing with conjunctive filtering, newest first, unpaginated.
    async fn list_public(&self, filter: &RoomFilter) -> Result<Vec<Room>, RepositoryError>;
    /// Owner-scoped listing, newest first. An owner with no listings gets an
    /// empty vec, not an error.
    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Room>, RepositoryError>;
    /// Single-record fetch: zero rows is NotFound, more than one is an
    /// invariant violation surfaced as an internal error.
    async fn get_by_id(&self, id: Uuid) -> Result<Room, RepositoryError>;

    // --- Listing Mutation (owner-scoped) ---
    async fn create(&self, req: CreateRoomRequest, owner_id: Uuid)
    -> Result<Room, RepositoryError>;
    /// Full-field replace of the mutable attributes, only if `owner_id`
    /// matches the listing's owner.
    async fn update(
        &self,
        id: Uuid,
        owner_id: Uuid,
        fields: UpdateRoomRequest,
    ) -> Result<Room, RepositoryError>;
    /// Removes the listing if `owner_id` matches. A miss is NotFound.
    async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<(), RepositoryError>;

    // --- Identity Mirror ---
    async fn get_owner(&self, id: Uuid) -> Result<Option<Owner>, RepositoryError>;
    async fn upsert_owner(&self, owner: Owner) -> Result<Owner, RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn RoomRepository>;

const ROOM_COLUMNS: &str = "id, owner_id, title, location, rent, property_type, \
                            tenant_preference, contact_number, images, created_at";

/// build_public_rooms_query
///
/// Composes the public listing query from a `RoomFilter` in one place, using
/// QueryBuilder for safe parameterization. Each present criterion is ANDed on
/// independently: case-insensitive substring on location, inclusive rent
/// bounds, exact matches on property type and tenant preference. Absent
/// criteria add nothing. Ordering is always by creation time, newest first.
pub fn build_public_rooms_query(filter: &RoomFilter) -> QueryBuilder<'static, sqlx::Postgres> {
    let mut builder: QueryBuilder<sqlx::Postgres> =
        QueryBuilder::new(format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE TRUE"));

    if let Some(location) = &filter.location {
        // A blank location (e.g. an empty query param) imposes no constraint.
        if !location.trim().is_empty() {
            builder.push(" AND location ILIKE ");
            builder.push_bind(format!("%{}%", location));
        }
    }

    if let Some(min_rent) = filter.min_rent {
        builder.push(" AND rent >= ");
        builder.push_bind(min_rent);
    }

    if let Some(max_rent) = filter.max_rent {
        builder.push(" AND rent <= ");
        builder.push_bind(max_rent);
    }

    if let Some(property_type) = filter.property_type {
        builder.push(" AND property_type = ");
        builder.push_bind(property_type.as_str());
    }

    if let Some(tenant_preference) = filter.tenant_preference {
        builder.push(" AND tenant_preference = ");
        builder.push_bind(tenant_preference.as_str());
    }

    builder.push(" ORDER BY created_at DESC");
    builder
}

/// PostgresRepository
///
/// The concrete implementation of `RoomRepository`, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomRepository for PostgresRepository {
    async fn list_public(&self, filter: &RoomFilter) -> Result<Vec<Room>, RepositoryError> {
        let mut builder = build_public_rooms_query(filter);
        let rooms = builder
            .build_query_as::<Room>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rooms)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Room>, RepositoryError> {
        let sql = format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE owner_id = $1 ORDER BY created_at DESC"
        );
        let rooms = sqlx::query_as::<_, Room>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rooms)
    }

    /// get_by_id
    ///
    /// Discriminates explicitly between zero, one, and many rows. `id` is the
    /// primary key, so the many case indicates store corruption and is never
    /// resolved by silently picking an arbitrary row.
    async fn get_by_id(&self, id: Uuid) -> Result<Room, RepositoryError> {
        let sql = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1");
        let mut rows = sqlx::query_as::<_, Room>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        match rows.len() {
            0 => Err(RepositoryError::NotFound),
            1 => Ok(rows.remove(0)),
            n => Err(RepositoryError::Internal(format!(
                "{n} rows share listing id {id}"
            ))),
        }
    }

    /// create
    ///
    /// Inserts a new listing. The id is generated here; `created_at` is
    /// assigned by the database and returned with the persisted record.
    async fn create(
        &self,
        req: CreateRoomRequest,
        owner_id: Uuid,
    ) -> Result<Room, RepositoryError> {
        let sql = format!(
            "INSERT INTO rooms (id, owner_id, title, location, rent, property_type, \
             tenant_preference, contact_number, images) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {ROOM_COLUMNS}"
        );
        let room = sqlx::query_as::<_, Room>(&sql)
            .bind(Uuid::new_v4())
            .bind(owner_id)
            .bind(req.title)
            .bind(req.location)
            .bind(req.rent)
            .bind(req.property_type)
            .bind(req.tenant_preference)
            .bind(req.contact_number)
            .bind(req.images)
            .fetch_one(&self.pool)
            .await?;
        Ok(room)
    }

    /// update
    ///
    /// Replaces every mutable attribute of the listing. Scoped to
    /// `owner_id = $2`, so a non-owner attempt affects zero rows and is
    /// indistinguishable from a missing listing.
    async fn update(
        &self,
        id: Uuid,
        owner_id: Uuid,
        fields: UpdateRoomRequest,
    ) -> Result<Room, RepositoryError> {
        let sql = format!(
            "UPDATE rooms \
             SET title = $3, location = $4, rent = $5, property_type = $6, \
                 tenant_preference = $7, contact_number = $8, images = $9 \
             WHERE id = $1 AND owner_id = $2 \
             RETURNING {ROOM_COLUMNS}"
        );
        let room = sqlx::query_as::<_, Room>(&sql)
            .bind(id)
            .bind(owner_id)
            .bind(fields.title)
            .bind(fields.location)
            .bind(fields.rent)
            .bind(fields.property_type)
            .bind(fields.tenant_preference)
            .bind(fields.contact_number)
            .bind(fields.images)
            .fetch_optional(&self.pool)
            .await?;
        room.ok_or(RepositoryError::NotFound)
    }

    /// delete
    ///
    /// Owner-scoped removal. Zero affected rows (missing listing or not the
    /// owner) is reported as NotFound rather than silent success.
    async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM rooms WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() > 0 {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    async fn get_owner(&self, id: Uuid) -> Result<Option<Owner>, RepositoryError> {
        let owner = sqlx::query_as::<_, Owner>("SELECT id, email FROM owners WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(owner)
    }

    /// upsert_owner
    ///
    /// Mirrors the externally-verified identity locally. Re-verification with
    /// a changed email refreshes the record.
    async fn upsert_owner(&self, owner: Owner) -> Result<Owner, RepositoryError> {
        let owner = sqlx::query_as::<_, Owner>(
            "INSERT INTO owners (id, email) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET email = EXCLUDED.email \
             RETURNING id, email",
        )
        .bind(owner.id)
        .bind(owner.email)
        .fetch_one(&self.pool)
        .await?;
        Ok(owner)
    }
}
