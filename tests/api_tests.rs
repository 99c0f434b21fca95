use async_trait::async_trait;
use chrono::{Duration, Utc};
use roomhunt::{
    AppConfig, AppState, MockStorageService, create_router,
    auth::Claims,
    error::RepositoryError,
    models::{CreateRoomRequest, Owner, Room, RoomFilter, UpdateRoomRequest},
    repository::RoomRepository,
    session::MockAuthProvider,
    storage::StorageState,
};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use uuid::Uuid;

// --- IN-MEMORY REPOSITORY ---

// A faithful in-memory stand-in for the Postgres repository, mirroring its
// observable contract (conjunctive filtering, newest first, owner scoping,
// miss-as-NotFound) so full request/response cycles run without a database.
#[derive(Default)]
pub struct InMemoryRepo {
    pub rooms: Mutex<Vec<Room>>,
    pub owners: Mutex<Vec<Owner>>,
}

#[async_trait]
impl RoomRepository for InMemoryRepo {
    async fn list_public(&self, filter: &RoomFilter) -> Result<Vec<Room>, RepositoryError> {
        let mut rooms: Vec<Room> = self
            .rooms
            .lock()
            .unwrap()
            .iter()
            .filter(|room| {
                if let Some(location) = &filter.location {
                    if !location.trim().is_empty()
                        && !room
                            .location
                            .to_lowercase()
                            .contains(&location.to_lowercase())
                    {
                        return false;
                    }
                }
                if let Some(min_rent) = filter.min_rent {
                    if room.rent < min_rent {
                        return false;
                    }
                }
                if let Some(max_rent) = filter.max_rent {
                    if room.rent > max_rent {
                        return false;
                    }
                }
                if let Some(property_type) = filter.property_type {
                    if room.property_type != property_type {
                        return false;
                    }
                }
                if let Some(tenant_preference) = filter.tenant_preference {
                    if room.tenant_preference != tenant_preference {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();
        rooms.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rooms)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Room>, RepositoryError> {
        let mut rooms: Vec<Room> = self
            .rooms
            .lock()
            .unwrap()
            .iter()
            .filter(|room| room.owner_id == owner_id)
            .cloned()
            .collect();
        rooms.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rooms)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Room, RepositoryError> {
        self.rooms
            .lock()
            .unwrap()
            .iter()
            .find(|room| room.id == id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn create(
        &self,
        req: CreateRoomRequest,
        owner_id: Uuid,
    ) -> Result<Room, RepositoryError> {
        let room = Room {
            id: Uuid::new_v4(),
            owner_id,
            title: req.title,
            location: req.location,
            rent: req.rent,
            property_type: req.property_type,
            tenant_preference: req.tenant_preference,
            contact_number: req.contact_number,
            images: req.images,
            created_at: Utc::now(),
        };
        self.rooms.lock().unwrap().push(room.clone());
        Ok(room)
    }

    async fn update(
        &self,
        id: Uuid,
        owner_id: Uuid,
        fields: UpdateRoomRequest,
    ) -> Result<Room, RepositoryError> {
        let mut rooms = self.rooms.lock().unwrap();
        let room = rooms
            .iter_mut()
            .find(|room| room.id == id && room.owner_id == owner_id)
            .ok_or(RepositoryError::NotFound)?;
        room.title = fields.title;
        room.location = fields.location;
        room.rent = fields.rent;
        room.property_type = fields.property_type;
        room.tenant_preference = fields.tenant_preference;
        room.contact_number = fields.contact_number;
        room.images = fields.images;
        Ok(room.clone())
    }

    async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<(), RepositoryError> {
        let mut rooms = self.rooms.lock().unwrap();
        let before = rooms.len();
        rooms.retain(|room| !(room.id == id && room.owner_id == owner_id));
        if rooms.len() < before {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    async fn get_owner(&self, id: Uuid) -> Result<Option<Owner>, RepositoryError> {
        Ok(self
            .owners
            .lock()
            .unwrap()
            .iter()
            .find(|owner| owner.id == id)
            .cloned())
    }

    async fn upsert_owner(&self, owner: Owner) -> Result<Owner, RepositoryError> {
        let mut owners = self.owners.lock().unwrap();
        match owners.iter_mut().find(|existing| existing.id == owner.id) {
            Some(existing) => existing.email = owner.email.clone(),
            None => owners.push(owner.clone()),
        }
        Ok(owner)
    }
}

// --- TEST APP ---

const ACCEPTED_CODE: &str = "424242";

pub struct TestApp {
    pub address: String,
    pub repo: Arc<InMemoryRepo>,
    pub owner_id: Uuid,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

async fn spawn_app_with_storage(storage: StorageState) -> TestApp {
    let owner_id = Uuid::new_v4();
    let repo = Arc::new(InMemoryRepo::default());
    repo.owners.lock().unwrap().push(Owner {
        id: owner_id,
        email: "owner@example.com".to_string(),
    });

    let state = AppState {
        repo: repo.clone(),
        storage,
        auth: Arc::new(MockAuthProvider::new(ACCEPTED_CODE, owner_id)),
        config: AppConfig::default(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        repo,
        owner_id,
    }
}

async fn spawn_app() -> TestApp {
    spawn_app_with_storage(Arc::new(MockStorageService::new())).await
}

fn sample_room(rent: i64, property_type: &str) -> serde_json::Value {
    serde_json::json!({
        "title": "Sunny room near metro",
        "location": "Koramangala",
        "rent": rent,
        "property_type": property_type,
        "tenant_preference": "Family",
        "contact_number": "9876543210"
    })
}

// --- TESTS ---

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .get(app.url("/health"))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_guarded_routes_reject_anonymous_requests() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    for path in ["/me", "/me/rooms"] {
        let response = client.get(app.url(path)).send().await.unwrap();
        assert_eq!(response.status(), 401, "GET {path} should require a session");
    }

    let response = client
        .post(app.url("/rooms"))
        .json(&sample_room(12000, "2 BHK"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_local_header_bypass_resolves_known_owner() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(app.url("/me/rooms"))
        .header("x-user-id", app.owner_id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let rooms: Vec<Room> = response.json().await.unwrap();
    assert!(rooms.is_empty());

    // An unknown UUID falls through to token validation and fails
    let response = client
        .get(app.url("/me/rooms"))
        .header("x-user-id", Uuid::new_v4().to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_bearer_token_resolves_owner() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let now = Utc::now();
    let claims = Claims {
        sub: app.owner_id,
        exp: (now + Duration::hours(1)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(AppConfig::default().jwt_secret.as_bytes()),
    )
    .unwrap();

    let response = client
        .get(app.url("/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let me: Owner = response.json().await.unwrap();
    assert_eq!(me.id, app.owner_id);

    // An expired token is refused
    let expired = Claims {
        sub: app.owner_id,
        exp: (now - Duration::hours(2)).timestamp() as usize,
        iat: (now - Duration::hours(3)).timestamp() as usize,
    };
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &expired,
        &jsonwebtoken::EncodingKey::from_secret(AppConfig::default().jwt_secret.as_bytes()),
    )
    .unwrap();
    let response = client
        .get(app.url("/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_login_flow_end_to_end() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Request a code
    let response = client
        .post(app.url("/auth/code"))
        .json(&serde_json::json!({ "email": "owner@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 202);

    // Malformed email is rejected locally
    let response = client
        .post(app.url("/auth/code"))
        .json(&serde_json::json!({ "email": "not-an-email" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Wrong code yields no session
    let response = client
        .post(app.url("/auth/verify"))
        .json(&serde_json::json!({ "email": "owner@example.com", "code": "000000" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    // Correct code establishes a session
    let response = client
        .post(app.url("/auth/verify"))
        .json(&serde_json::json!({ "email": "owner@example.com", "code": ACCEPTED_CODE }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let session: serde_json::Value = response.json().await.unwrap();
    assert!(!session["access_token"].as_str().unwrap().is_empty());
    assert_eq!(session["user"]["email"], "owner@example.com");

    // Sign out is a 204 regardless of provider-side state
    let response = client
        .post(app.url("/auth/logout"))
        .bearer_auth(session["access_token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);
}

#[tokio::test]
async fn test_room_lifecycle() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let owner_header = app.owner_id.to_string();

    // Create
    let response = client
        .post(app.url("/rooms"))
        .header("x-user-id", &owner_header)
        .json(&sample_room(15000, "2 BHK"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let room: Room = response.json().await.unwrap();
    assert_eq!(room.owner_id, app.owner_id);
    assert_eq!(room.rent, 15000);

    // Publicly visible
    let fetched: Room = client
        .get(app.url(&format!("/rooms/{}", room.id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched.id, room.id);

    // Full-field update
    let response = client
        .put(app.url(&format!("/rooms/{}", room.id)))
        .header("x-user-id", &owner_header)
        .json(&serde_json::json!({
            "title": "Quiet room, newly painted",
            "location": "Indiranagar",
            "rent": 18000,
            "property_type": "3 BHK",
            "tenant_preference": "Any",
            "contact_number": "9876543210",
            "images": ["http://localhost:9000/room-images/a.png"]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let updated: Room = response.json().await.unwrap();
    assert_eq!(updated.rent, 18000);
    assert_eq!(updated.location, "Indiranagar");
    assert_eq!(updated.images.len(), 1);

    // Delete, then the listing is gone
    let response = client
        .delete(app.url(&format!("/rooms/{}", room.id)))
        .header("x-user-id", &owner_header)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let response = client
        .get(app.url(&format!("/rooms/{}", room.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_negative_rent_is_clamped_on_create() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(app.url("/rooms"))
        .header("x-user-id", app.owner_id.to_string())
        .json(&sample_room(-500, "PG"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let room: Room = response.json().await.unwrap();
    assert_eq!(room.rent, 0);
}

#[tokio::test]
async fn test_public_filtering_is_conjunctive() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let owner_header = app.owner_id.to_string();

    for (rent, property_type) in [(8000, "PG"), (15000, "2 BHK"), (25000, "2 BHK")] {
        let response = client
            .post(app.url("/rooms"))
            .header("x-user-id", &owner_header)
            .json(&sample_room(rent, property_type))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    // Rent window and property type together select the one matching room
    let rooms: Vec<Room> = client
        .get(app.url("/rooms"))
        .query(&[
            ("min_rent", "10000"),
            ("max_rent", "20000"),
            ("property_type", "2 BHK"),
        ])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].rent, 15000);

    // Bounds are inclusive
    let rooms: Vec<Room> = client
        .get(app.url("/rooms"))
        .query(&[("min_rent", "15000"), ("max_rent", "15000")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rooms.len(), 1);

    // Location matching is a case-insensitive substring
    let rooms: Vec<Room> = client
        .get(app.url("/rooms"))
        .query(&[("location", "koramangala")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rooms.len(), 3);

    let rooms: Vec<Room> = client
        .get(app.url("/rooms"))
        .query(&[("location", "Whitefield")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(rooms.is_empty());
}

#[tokio::test]
async fn test_public_listing_is_newest_first() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Seed with explicit timestamps so the ordering is unambiguous
    let base = Utc::now();
    {
        let mut rooms = app.repo.rooms.lock().unwrap();
        for (title, age_hours) in [("oldest", 3), ("middle", 2), ("newest", 1)] {
            rooms.push(Room {
                id: Uuid::new_v4(),
                owner_id: app.owner_id,
                title: title.to_string(),
                created_at: base - Duration::hours(age_hours),
                ..Room::default()
            });
        }
    }

    let rooms: Vec<Room> = client
        .get(app.url("/rooms"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let titles: Vec<&str> = rooms.iter().map(|room| room.title.as_str()).collect();
    assert_eq!(titles, vec!["newest", "middle", "oldest"]);
}

#[tokio::test]
async fn test_image_batch_reports_partial_failure() {
    let storage = Arc::new(MockStorageService::failing_on("corrupt"));
    let app = spawn_app_with_storage(storage).await;
    let client = reqwest::Client::new();

    let form = reqwest::multipart::Form::new()
        .part(
            "file1",
            reqwest::multipart::Part::bytes(vec![1, 2, 3]).file_name("front door.png"),
        )
        .part(
            "file2",
            reqwest::multipart::Part::bytes(vec![4, 5, 6]).file_name("corrupt-scan.png"),
        );

    let response = client
        .post(app.url("/images"))
        .header("x-user-id", app.owner_id.to_string())
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let result: serde_json::Value = response.json().await.unwrap();
    let uploaded = result["uploaded"].as_array().unwrap();
    let failed = result["failed"].as_array().unwrap();

    assert_eq!(uploaded.len(), 1);
    assert_eq!(uploaded[0]["file_name"], "front door.png");
    assert!(
        uploaded[0]["url"]
            .as_str()
            .unwrap()
            .ends_with("front-door.png")
    );
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["file_name"], "corrupt-scan.png");
}

#[tokio::test]
async fn test_mutations_are_owner_scoped() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // A second owner who did not create the listing
    let intruder_id = Uuid::new_v4();
    app.repo.owners.lock().unwrap().push(Owner {
        id: intruder_id,
        email: "intruder@example.com".to_string(),
    });

    let room: Room = client
        .post(app.url("/rooms"))
        .header("x-user-id", app.owner_id.to_string())
        .json(&sample_room(9000, "1 BHK"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Non-owner mutations look like a missing listing
    let response = client
        .delete(app.url(&format!("/rooms/{}", room.id)))
        .header("x-user-id", intruder_id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let response = client
        .put(app.url(&format!("/rooms/{}", room.id)))
        .header("x-user-id", intruder_id.to_string())
        .json(&serde_json::json!({
            "title": "hijacked",
            "location": "x",
            "rent": 1,
            "property_type": "PG",
            "tenant_preference": "Any",
            "contact_number": "0",
            "images": []
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    // The listing is untouched
    let fetched: Room = client
        .get(app.url(&format!("/rooms/{}", room.id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched.title, "Sunny room near metro");
}
