use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, RepositoryError},
    models::{
        CreateRoomRequest, FailedUpload, ImageUploadResponse, Owner, RequestCodeRequest, Room,
        RoomFilter, SessionResponse, UpdateRoomRequest, UploadedImage, VerifyCodeRequest,
    },
};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
};
use uuid::Uuid;

// --- Listing Handlers ---

/// list_rooms
///
/// [Public Route] Lists all published rooms, newest first, narrowed by the
/// optional filter criteria. Every present criterion applies conjunctively;
/// absent criteria are no-ops. The full result set is returned per call — no
/// pagination.
#[utoipa::path(
    get,
    path = "/rooms",
    params(RoomFilter),
    responses((status = 200, description = "Filtered listings", body = [Room]))
)]
pub async fn list_rooms(
    State(state): State<AppState>,
    Query(filter): Query<RoomFilter>,
) -> Result<Json<Vec<Room>>, ApiError> {
    let rooms = state.repo.list_public(&filter).await?;
    Ok(Json(rooms))
}

/// get_room
///
/// [Public Route] Retrieves a single listing by id. A miss is a 404, never an
/// empty success; clients use that to fall back to a safe view.
#[utoipa::path(
    get,
    path = "/rooms/{id}",
    params(("id" = Uuid, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Found", body = Room),
        (status = 404, description = "Not Found", body = crate::error::ErrorBody)
    )
)]
pub async fn get_room(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Room>, ApiError> {
    let room = state.repo.get_by_id(id).await?;
    Ok(Json(room))
}

/// get_my_rooms
///
/// [Authenticated Route] The owner-scoped management view: every listing
/// created by the requesting identity, newest first. An owner with no
/// listings gets an empty list.
#[utoipa::path(
    get,
    path = "/me/rooms",
    responses((status = 200, description = "My listings", body = [Room]))
)]
pub async fn get_my_rooms(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Room>>, ApiError> {
    let rooms = state.repo.list_by_owner(id).await?;
    Ok(Json(rooms))
}

/// create_room
///
/// [Authenticated Route] Publishes a new listing. The owner id is stamped
/// from the session — never trusted from the payload — and rent is coerced
/// to a non-negative value before submission. The persisted record, including
/// the generated id and server-assigned timestamp, comes back to the caller.
#[utoipa::path(
    post,
    path = "/rooms",
    request_body = CreateRoomRequest,
    responses((status = 200, description = "Created", body = Room))
)]
pub async fn create_room(
    AuthUser { id: owner_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(mut payload): Json<CreateRoomRequest>,
) -> Result<Json<Room>, ApiError> {
    payload.rent = payload.rent.max(0);
    let room = state.repo.create(payload, owner_id).await?;
    Ok(Json(room))
}

/// update_room
///
/// [Authenticated Route] Replaces every mutable field of a listing the caller
/// owns. Image removal happens here too: the client submits the edited image
/// list as part of the full field set. A non-owner attempt looks like a 404.
#[utoipa::path(
    put,
    path = "/rooms/{id}",
    params(("id" = Uuid, Path, description = "Listing ID")),
    request_body = UpdateRoomRequest,
    responses(
        (status = 200, description = "Updated", body = Room),
        (status = 404, description = "Not Found or Not Yours", body = crate::error::ErrorBody)
    )
)]
pub async fn update_room(
    AuthUser { id: owner_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mut payload): Json<UpdateRoomRequest>,
) -> Result<Json<Room>, ApiError> {
    payload.rent = payload.rent.max(0);
    let room = state.repo.update(id, owner_id, payload).await?;
    Ok(Json(room))
}

/// delete_room
///
/// [Authenticated Route] Removes a listing the caller owns. A miss (or a
/// non-owner attempt) reports 404 rather than succeeding silently.
#[utoipa::path(
    delete,
    path = "/rooms/{id}",
    params(("id" = Uuid, Path, description = "Listing ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found or Not Yours", body = crate::error::ErrorBody)
    )
)]
pub async fn delete_room(
    AuthUser { id: owner_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.repo.delete(id, owner_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Image Upload ---

/// upload_images
///
/// [Authenticated Route] Accepts a multipart batch of image files and stores
/// each one independently in the blob store. There is no all-or-nothing
/// transaction: a file the store rejects is skipped and reported in `failed`
/// while the rest of the batch still yields URLs in `uploaded`. The client
/// appends the returned URLs to the listing's image sequence.
#[utoipa::path(
    post,
    path = "/images",
    request_body(content_type = "multipart/form-data"),
    responses((status = 200, description = "Per-file upload results", body = ImageUploadResponse))
)]
pub async fn upload_images(
    AuthUser { .. }: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImageUploadResponse>, ApiError> {
    let mut uploaded = Vec::new();
    let mut failed = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| crate::error::UploadError::Rejected(e.to_string()))?
    {
        let file_name = field.file_name().unwrap_or("image").to_string();

        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                failed.push(FailedUpload {
                    file_name,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        match state.storage.upload_image(bytes.to_vec(), &file_name).await {
            Ok(url) => uploaded.push(UploadedImage { file_name, url }),
            Err(e) => {
                tracing::warn!(file = %file_name, error = %e, "image upload skipped");
                failed.push(FailedUpload {
                    file_name,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(Json(ImageUploadResponse { uploaded, failed }))
}

// --- Auth Handlers ---

/// request_login_code
///
/// [Public Route] Asks the external auth provider to email a one-time login
/// code. Obviously malformed addresses are rejected locally; everything else
/// is the provider's call.
#[utoipa::path(
    post,
    path = "/auth/code",
    request_body = RequestCodeRequest,
    responses(
        (status = 202, description = "Code issued"),
        (status = 400, description = "Invalid email", body = crate::error::ErrorBody)
    )
)]
pub async fn request_login_code(
    State(state): State<AppState>,
    Json(payload): Json<RequestCodeRequest>,
) -> Result<StatusCode, ApiError> {
    state.auth.request_code(&payload.email).await?;
    Ok(StatusCode::ACCEPTED)
}

/// verify_login_code
///
/// [Public Route] Exchanges a one-time code for a session. On success the
/// verified identity is mirrored into the owners table (so the bearer token
/// resolves on subsequent requests) and the session is returned for the
/// client to store. On a wrong or expired code nothing is mirrored and no
/// session exists.
#[utoipa::path(
    post,
    path = "/auth/verify",
    request_body = VerifyCodeRequest,
    responses(
        (status = 200, description = "Session established", body = SessionResponse),
        (status = 401, description = "Wrong or expired code", body = crate::error::ErrorBody)
    )
)]
pub async fn verify_login_code(
    State(state): State<AppState>,
    Json(payload): Json<VerifyCodeRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state
        .auth
        .verify_code(&payload.email, &payload.code)
        .await?;

    let user = state
        .repo
        .upsert_owner(Owner {
            id: session.user_id,
            email: session.email.clone(),
        })
        .await?;

    Ok(Json(SessionResponse {
        access_token: session.access_token,
        user,
    }))
}

/// sign_out
///
/// [Authenticated Route] Invalidates the remote session behind the presented
/// bearer token. Idempotent: a token the provider already forgot still signs
/// out cleanly.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Signed out"))
)]
pub async fn sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .unwrap_or_default();

    state.auth.sign_out(token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// get_me
///
/// [Authenticated Route] Resolves the current session to the mirrored owner
/// record — the caller's identity as the rest of the API sees it.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Current identity", body = Owner))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Owner>, ApiError> {
    let owner = state
        .repo
        .get_owner(id)
        .await?
        .ok_or(RepositoryError::NotFound)?;
    Ok(Json(owner))
}
