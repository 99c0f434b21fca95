use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// Owner
///
/// The local mirror of an identity issued by the external auth provider,
/// stored in the `owners` table. Created/refreshed after a successful
/// one-time-code verification so the auth extractor can resolve a token
/// subject to a live record.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Owner {
    // Primary key, equal to the provider-side user id.
    pub id: Uuid,
    pub email: String,
}

/// PropertyType
///
/// The listing's property category. Serialized with the exact strings the
/// frontend shows in its select box, and stored as TEXT in Postgres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub enum PropertyType {
    #[default]
    #[serde(rename = "1 BHK")]
    OneBhk,
    #[serde(rename = "2 BHK")]
    TwoBhk,
    #[serde(rename = "3 BHK")]
    ThreeBhk,
    #[serde(rename = "1 Room Set")]
    OneRoomSet,
    #[serde(rename = "PG")]
    Pg,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::OneBhk => "1 BHK",
            PropertyType::TwoBhk => "2 BHK",
            PropertyType::ThreeBhk => "3 BHK",
            PropertyType::OneRoomSet => "1 Room Set",
            PropertyType::Pg => "PG",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1 BHK" => Ok(PropertyType::OneBhk),
            "2 BHK" => Ok(PropertyType::TwoBhk),
            "3 BHK" => Ok(PropertyType::ThreeBhk),
            "1 Room Set" => Ok(PropertyType::OneRoomSet),
            "PG" => Ok(PropertyType::Pg),
            other => Err(format!("unknown property type: {other}")),
        }
    }
}

/// TenantPreference
///
/// Who the owner wants to rent to. Same TEXT-column treatment as `PropertyType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub enum TenantPreference {
    #[default]
    Any,
    Bachelors,
    Family,
    Girls,
    #[serde(rename = "Working Professionals")]
    WorkingProfessionals,
}

impl TenantPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantPreference::Any => "Any",
            TenantPreference::Bachelors => "Bachelors",
            TenantPreference::Family => "Family",
            TenantPreference::Girls => "Girls",
            TenantPreference::WorkingProfessionals => "Working Professionals",
        }
    }
}

impl fmt::Display for TenantPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TenantPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Any" => Ok(TenantPreference::Any),
            "Bachelors" => Ok(TenantPreference::Bachelors),
            "Family" => Ok(TenantPreference::Family),
            "Girls" => Ok(TenantPreference::Girls),
            "Working Professionals" => Ok(TenantPreference::WorkingProfessionals),
            other => Err(format!("unknown tenant preference: {other}")),
        }
    }
}

// Both enums live in TEXT columns, so Type/Decode/Encode delegate to the
// string implementations rather than a Postgres enum type.

macro_rules! text_column_enum {
    ($ty:ty) => {
        impl sqlx::Type<sqlx::Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <&str as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $ty {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let text = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
                text.parse::<$ty>().map_err(Into::into)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }
    };
}

text_column_enum!(PropertyType);
text_column_enum!(TenantPreference);

/// Room
///
/// A room-rental listing from the `rooms` table. The primary data structure
/// of the marketplace. `owner_id` is immutable after creation and `created_at`
/// is server-assigned; both come back from the database, never the client.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Room {
    pub id: Uuid,
    // FK to owners.id; the authenticated identity that created the listing.
    pub owner_id: Uuid,
    pub title: String,
    pub location: String,
    // Monthly rent, always >= 0.
    pub rent: i64,
    pub property_type: PropertyType,
    pub tenant_preference: TenantPreference,
    pub contact_number: String,
    // Ordered public URLs of uploaded images.
    pub images: Vec<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Filter ---

/// RoomFilter
///
/// The accepted query parameters for the public listing endpoint (GET /rooms).
/// Every criterion is optional; absent criteria impose no constraint. All
/// present criteria are applied conjunctively by the repository.
#[derive(Debug, Clone, Serialize, Deserialize, IntoParams, Default)]
pub struct RoomFilter {
    /// Case-insensitive substring match on the location field.
    pub location: Option<String>,
    /// Inclusive lower bound on rent.
    pub min_rent: Option<i64>,
    /// Inclusive upper bound on rent.
    pub max_rent: Option<i64>,
    /// Exact property type match.
    pub property_type: Option<PropertyType>,
    /// Exact tenant preference match.
    pub tenant_preference: Option<TenantPreference>,
}

// --- Request Payloads (Input Schemas) ---

/// CreateRoomRequest
///
/// Input payload for publishing a new listing (POST /rooms). The owner id is
/// taken from the authenticated session, never from the payload; rent is
/// clamped to a non-negative value before submission.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateRoomRequest {
    pub title: String,
    pub location: String,
    pub rent: i64,
    pub property_type: PropertyType,
    pub tenant_preference: TenantPreference,
    pub contact_number: String,
    /// URLs returned by the image upload endpoint.
    #[serde(default)]
    pub images: Vec<String>,
}

/// UpdateRoomRequest
///
/// Full-field replace of a listing's mutable attributes (PUT /rooms/{id}).
/// Deliberately has no optional fields: a caller always submits the complete
/// set, so an update can never leave unspecified columns at stale values.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateRoomRequest {
    pub title: String,
    pub location: String,
    pub rent: i64,
    pub property_type: PropertyType,
    pub tenant_preference: TenantPreference,
    pub contact_number: String,
    pub images: Vec<String>,
}

/// RequestCodeRequest
///
/// Input payload for requesting a one-time login code (POST /auth/code).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RequestCodeRequest {
    #[schema(example = "owner@example.com")]
    pub email: String,
}

/// VerifyCodeRequest
///
/// Input payload for exchanging a one-time code for a session (POST /auth/verify).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct VerifyCodeRequest {
    pub email: String,
    #[schema(example = "123456")]
    pub code: String,
}

/// SessionResponse
///
/// Output of a successful code verification: the provider-issued access token
/// plus the mirrored owner record. The client sends the token as a bearer
/// header on every guarded request.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SessionResponse {
    pub access_token: String,
    pub user: Owner,
}

// --- Upload Schemas (Output) ---

/// UploadedImage
///
/// One successfully stored file from an image batch.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UploadedImage {
    pub file_name: String,
    /// Publicly reachable URL of the stored object.
    pub url: String,
}

/// FailedUpload
///
/// One file from an image batch that the blob store rejected. Failed files
/// are skipped; the rest of the batch still goes through.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct FailedUpload {
    pub file_name: String,
    pub reason: String,
}

/// ImageUploadResponse
///
/// Aggregate result of a multipart image batch (POST /images). Uploads are
/// independent per file; partial failure is reported here rather than failing
/// the whole request.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ImageUploadResponse {
    pub uploaded: Vec<UploadedImage>,
    pub failed: Vec<FailedUpload>,
}
