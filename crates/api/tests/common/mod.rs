//! Shared helpers for the API integration tests: app construction, a stub
//! face-matching service, database seeding, and request builders.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::Multipart;
use axum::http::{header, Method, Request, Response};
use axum::routing::post;
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt;

use schoolhub_api::auth::jwt::{generate_access_token, JwtConfig};
use schoolhub_api::auth::password::hash_password;
use schoolhub_api::config::ServerConfig;
use schoolhub_api::router::build_app_router;
use schoolhub_api::state::AppState;
use schoolhub_core::crypto::EncodingCipher;
use schoolhub_core::upload::DEFAULT_MAX_UPLOAD_BYTES;
use schoolhub_db::models::class::{Class, CreateClass};
use schoolhub_db::models::school::CreateSchool;
use schoolhub_db::models::student::{CreateStudent, Student};
use schoolhub_db::models::user::{CreateUser, User};
use schoolhub_db::repositories::{ClassRepo, RoleRepo, SchoolRepo, StudentRepo, UserRepo};
use schoolhub_events::EventBus;
use schoolhub_facematch::{FaceMatchClient, FaceMatchConfig};

pub const TEST_PASSWORD: &str = "correct horse battery";

/// Base URL where nothing listens; requests fail to connect.
pub const UNREACHABLE_FACE_SERVICE: &str = "http://127.0.0.1:9";

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub pool: PgPool,
    upload_root: TempDir,
}

impl TestApp {
    pub fn upload_dir(&self) -> &Path {
        self.upload_root.path()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    pub fn token_for(&self, user: &User, role: &str) -> String {
        generate_access_token(user.id, user.school_id, role, &self.state.config.jwt).unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub fn test_config(face_url: &str, upload_dir: PathBuf) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-jwt-secret".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
        face_service: FaceMatchConfig {
            base_url: face_url.to_string(),
            api_key: Some("test-face-key".to_string()),
            timeout: Duration::from_secs(5),
        },
        face_encoding_key: "test-face-encoding-key".to_string(),
        upload_dir,
        max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
    }
}

/// Build the full application router against `pool` and the face service at
/// `face_url`, with uploads under a fresh temporary directory.
pub fn build_test_app(pool: PgPool, face_url: &str) -> TestApp {
    build_test_app_with(pool, face_url, |_| {})
}

/// Like [`build_test_app`], with `adjust` applied to the config first.
pub fn build_test_app_with(
    pool: PgPool,
    face_url: &str,
    adjust: impl FnOnce(&mut ServerConfig),
) -> TestApp {
    let upload_root = tempfile::tempdir().unwrap();
    let mut config = test_config(face_url, upload_root.path().to_path_buf());
    adjust(&mut config);

    let state = AppState {
        pool: pool.clone(),
        face_client: Arc::new(FaceMatchClient::new(config.face_service.clone()).unwrap()),
        cipher: Arc::new(EncodingCipher::from_secret(&config.face_encoding_key).unwrap()),
        event_bus: Arc::new(EventBus::default()),
        config: Arc::new(config.clone()),
    };
    let router = build_app_router(state.clone(), &config);

    TestApp {
        router,
        state,
        pool,
        upload_root,
    }
}

/// Files currently in `dir` (empty when the directory does not exist).
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Stub face service
// ---------------------------------------------------------------------------
//
// Test images are a JPEG header followed by ASCII directives the stub reads:
//
//   count=N            faces in the photo (encode, detect); default 1
//   faces=ID@CONF,...  students recognized in a group photo
//   unknown=N          unrecognized faces in a group photo
//   delay_ms=N         recognize answers after N milliseconds

const JPEG_MAGIC: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];

/// A minimal JPEG-looking payload carrying stub directives.
pub fn jpeg(directives: &str) -> Vec<u8> {
    let mut bytes = JPEG_MAGIC.to_vec();
    bytes.extend_from_slice(directives.as_bytes());
    bytes
}

fn directives(image: &[u8]) -> HashMap<String, String> {
    let text = String::from_utf8_lossy(image.get(JPEG_MAGIC.len()..).unwrap_or_default()).to_string();
    text.split(';')
        .filter_map(|part| part.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

fn face_count(image: &[u8]) -> u32 {
    directives(image)
        .get("count")
        .and_then(|v| v.parse().ok())
        .unwrap_or(1)
}

fn location(i: i32) -> Value {
    json!({ "top": 10 + i * 100, "right": 90 + i * 100, "bottom": 90 + i * 100, "left": 10 + i * 100 })
}

async fn read_fields(mut multipart: Multipart) -> HashMap<String, Vec<u8>> {
    let mut fields = HashMap::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        fields.insert(name, field.bytes().await.unwrap().to_vec());
    }
    fields
}

async fn stub_encode(multipart: Multipart) -> Json<Value> {
    let fields = read_fields(multipart).await;
    let count = face_count(&fields["image"]);
    if count != 1 {
        let message = if count == 0 {
            "No face detected in the image".to_string()
        } else {
            format!("Multiple faces detected ({count}). Please upload an image with only one face.")
        };
        return Json(json!({ "success": false, "message": message, "encoding": null, "face_count": count }));
    }
    Json(json!({
        "success": true,
        "message": "Face encoding extracted successfully",
        "encoding": vec![0.05; 128],
        "face_count": 1
    }))
}

async fn stub_recognize(multipart: Multipart) -> Json<Value> {
    let fields = read_fields(multipart).await;
    let known: Vec<Value> = serde_json::from_slice(&fields["known_faces"]).unwrap();
    let directives = directives(&fields["image"]);
    if let Some(ms) = directives.get("delay_ms").and_then(|v| v.parse().ok()) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    let mut recognized = Vec::new();
    if let Some(faces) = directives.get("faces") {
        for (i, entry) in faces.split(',').filter(|e| !e.is_empty()).enumerate() {
            let (id, confidence) = entry.split_once('@').unwrap();
            let confidence: f64 = confidence.parse().unwrap();
            if let Some(face) = known.iter().find(|k| k["id"] == id) {
                recognized.push(json!({
                    "id": id,
                    "rollNumber": face["rollNumber"],
                    "name": face["name"],
                    "confidence": confidence,
                    "location": location(i as i32),
                }));
            }
        }
    }
    let unknown: u32 = directives
        .get("unknown")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    Json(json!({
        "success": true,
        "message": format!("Recognized {} students", recognized.len()),
        "total_faces_detected": recognized.len() as u32 + unknown,
        "recognized": recognized,
        "unrecognized_count": unknown,
        "processing_time_ms": 12.5
    }))
}

async fn stub_detect(multipart: Multipart) -> Json<Value> {
    let fields = read_fields(multipart).await;
    let count = face_count(&fields["image"]);
    let faces: Vec<Value> = (0..count as i32)
        .map(|i| json!({ "location": location(i), "width": 80, "height": 80 }))
        .collect();
    Json(json!({ "success": true, "face_count": count, "faces": faces }))
}

async fn stub_compare(multipart: Multipart) -> Json<Value> {
    let fields = read_fields(multipart).await;
    if face_count(&fields["image1"]) == 0 || face_count(&fields["image2"]) == 0 {
        return Json(json!({ "success": false, "message": "No face detected in one of the images" }));
    }
    let same = fields["image1"] == fields["image2"];
    Json(json!({
        "success": true,
        "is_same_person": same,
        "confidence": if same { 0.97 } else { 0.21 },
        "distance": if same { 0.03 } else { 0.79 }
    }))
}

/// Start the stub face service on an ephemeral port and return its base URL.
pub async fn spawn_face_service() -> String {
    let router = Router::new()
        .route("/health", axum::routing::get(|| async { Json(json!({ "status": "healthy" })) }))
        .route("/encode", post(stub_encode))
        .route("/recognize", post(stub_recognize))
        .route("/detect", post(stub_detect))
        .route("/compare", post(stub_compare));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

/// One school with a teacher, a principal, a class taught by the teacher,
/// and three active students (roll numbers 1 to 3).
pub struct Seed {
    pub school_id: i64,
    pub teacher: User,
    pub principal: User,
    pub class: Class,
    pub students: Vec<Student>,
}

pub async fn create_user(pool: &PgPool, school_id: i64, username: &str, role: &str) -> User {
    let role_id = RoleRepo::find_id_by_name(pool, role).await.unwrap().unwrap();
    UserRepo::create(
        pool,
        &CreateUser {
            school_id,
            username: username.to_string(),
            email: format!("{username}@school.test"),
            full_name: username.replace('_', " "),
            password_hash: hash_password(TEST_PASSWORD).unwrap(),
            role_id,
        },
    )
    .await
    .unwrap()
}

pub async fn seed_school(pool: &PgPool, name: &str) -> Seed {
    let school = SchoolRepo::create(pool, &CreateSchool { name: name.to_string() })
        .await
        .unwrap();
    let prefix = name.to_lowercase().replace(' ', "_");
    let teacher = create_user(pool, school.id, &format!("{prefix}_teacher"), "teacher").await;
    let principal = create_user(pool, school.id, &format!("{prefix}_principal"), "principal").await;
    let class = ClassRepo::create(
        pool,
        &CreateClass {
            school_id: school.id,
            name: "Grade 5".to_string(),
            section: Some("A".to_string()),
            teacher_id: Some(teacher.id),
        },
    )
    .await
    .unwrap();

    let mut students = Vec::new();
    for (roll, first) in [("1", "Asha"), ("2", "Bilal"), ("3", "Chen")] {
        let student = StudentRepo::create(
            pool,
            &CreateStudent {
                school_id: school.id,
                class_id: class.id,
                roll_number: roll.to_string(),
                first_name: first.to_string(),
                last_name: "Okafor".to_string(),
                parent_email: Some(format!("{}_parent@school.test", first.to_lowercase())),
            },
        )
        .await
        .unwrap();
        students.push(student);
    }

    Seed {
        school_id: school.id,
        teacher,
        principal,
        class,
        students,
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

fn with_auth(builder: axum::http::request::Builder, token: Option<&str>) -> axum::http::request::Builder {
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    with_auth(Request::builder().method(Method::GET).uri(uri), token)
        .body(Body::empty())
        .unwrap()
}

pub fn delete(uri: &str, token: Option<&str>) -> Request<Body> {
    with_auth(Request::builder().method(Method::DELETE).uri(uri), token)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    with_auth(Request::builder().method(Method::POST).uri(uri), token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

pub fn post_empty(uri: &str, token: Option<&str>) -> Request<Body> {
    with_auth(Request::builder().method(Method::POST).uri(uri), token)
        .body(Body::empty())
        .unwrap()
}

/// Builds a `multipart/form-data` request body.
#[derive(Default)]
pub struct MultipartForm {
    body: Vec<u8>,
}

const BOUNDARY: &str = "schoolhub-test-boundary";

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: image/jpeg\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self, uri: &str, token: Option<&str>) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        with_auth(Request::builder().method(Method::POST).uri(uri), token)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
