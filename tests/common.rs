use lottery_backend::{
    api::router::create_router,
    state::AppState,
    config::Config,
    domain::services::lottery::DrawPolicy,
    infra::factory::{run_sqlite_migrations, sqlite_state},
};
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Pool, Sqlite};
use std::sync::Arc;
use uuid::Uuid;
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
    Router,
};
use std::str::FromStr;
use tower::ServiceExt;
use serde_json::{json, Value};

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub state: Arc<AppState>,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn new() -> Self {
        Self::with_policy(DrawPolicy::default()).await
    }

    pub async fn with_policy(draw_policy: DrawPolicy) -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        run_sqlite_migrations(&pool).await;

        let config = Config {
            database_url: db_url.clone(),
            port: 0,
            draw_policy,
            lottery_seed: Some(42),
        };

        let state = Arc::new(sqlite_state(&config, pool.clone()));
        let router = create_router(state.clone());

        Self {
            router,
            pool,
            db_filename,
            state,
        }
    }

    pub async fn post(&self, uri: &str, payload: Value) -> Response {
        self.router.clone().oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap()
        ).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.router.clone().oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap()
        ).await.unwrap()
    }

    pub async fn create_event(&self, name: &str, max_capacity: i32, max_waiting_list_size: i32) -> String {
        let response = self.post("/api/v1/events", json!({
            "name": name,
            "description": "Test event",
            "max_capacity": max_capacity,
            "max_waiting_list_size": max_waiting_list_size,
        })).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = parse_body(response).await;
        body["id"].as_str().unwrap().to_string()
    }

    pub async fn join(&self, event_id: &str, name: &str, email: &str) -> Response {
        self.post(
            &format!("/api/v1/events/{}/waiting-list", event_id),
            json!({ "name": name, "email": email }),
        ).await
    }

    /// Joins `n` distinct entrants and returns their ids in join order.
    pub async fn fill_waiting_list(&self, event_id: &str, n: usize) -> Vec<String> {
        let mut ids = Vec::with_capacity(n);
        for i in 0..n {
            let response = self.join(event_id, &format!("Entrant {}", i), &format!("entrant{}@example.com", i)).await;
            assert_eq!(response.status(), StatusCode::CREATED);
            let body = parse_body(response).await;
            ids.push(body["id"].as_str().unwrap().to_string());
        }
        ids
    }

    pub async fn entrants(&self, event_id: &str, status: &str) -> Vec<Value> {
        let response = self.get(&format!("/api/v1/events/{}/entrants?status={}", event_id, status)).await;
        assert_eq!(response.status(), StatusCode::OK);
        parse_body(response).await.as_array().unwrap().clone()
    }

    pub async fn event(&self, event_id: &str) -> Value {
        let response = self.get(&format!("/api/v1/events/{}", event_id)).await;
        assert_eq!(response.status(), StatusCode::OK);
        parse_body(response).await
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
    }
}

#[allow(dead_code)]
pub async fn parse_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
