//! # RepoHub API - REST Layer
//!
//! Exposes the user and repository-record services over HTTP and maps the
//! service error taxonomy onto status codes.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use repohub_cache::CacheStore;
use repohub_core::{RecordService, ServiceError, UserService};
use repohub_events::EventPublisher;
use repohub_store::Store;
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub mod handlers;
pub mod health;

use handlers::{repositories, users};

/// Transport-level error wrapper around the service taxonomy.
///
/// Body-decode failures never reach this type; axum's `Json` rejection
/// already answers 400/415/422 before the handler runs.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ApiError::Service(err) = &self;
        let status = match err {
            ServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::InvalidId(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Publish(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Canceled => StatusCode::REQUEST_TIMEOUT,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Application state shared by every handler.
///
/// The raw store/cache/publisher handles exist only for the readiness
/// probes; all request flows go through the services.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub records: Arc<RecordService>,
    pub store: Arc<dyn Store>,
    pub cache: Arc<dyn CacheStore>,
    pub publisher: Arc<dyn EventPublisher>,
}

async fn banner() -> &'static str {
    "RepoHub: users and repositories over interchangeable backends\n"
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user).put(users::update_user).delete(users::delete_user),
        )
        .route(
            "/repositories",
            get(repositories::list_records).post(repositories::create_record),
        )
        .route(
            "/repositories/{id}",
            get(repositories::get_record)
                .put(repositories::update_record)
                .delete(repositories::delete_record),
        )
        .route("/health/liveness", get(health::liveness_handler))
        .route("/health/readiness", get(health::readiness_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Graceful shutdown signal handler
///
/// Waits for SIGTERM or SIGINT (Ctrl+C) and initiates graceful shutdown.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }

    info!("Shutdown signal received, draining connections...");
}

/// Start the REST API server
pub async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("{}:{}", host, port);
    info!("Starting REST API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use repohub_cache::MemoryCache;
    use repohub_core::{BreakerConfig, CircuitBreaker, ServiceConfig};
    use repohub_events::MemoryPublisher;
    use repohub_store::MemoryBackend;
    use repohub_types::{RepoRecord, User};
    use serde_json::json;
    use tower::ServiceExt; // for `oneshot`

    use super::*;

    fn create_test_state() -> AppState {
        let store: Arc<dyn Store> = Arc::new(MemoryBackend::new());
        let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
        let publisher: Arc<dyn EventPublisher> = Arc::new(MemoryPublisher::new());

        let users = Arc::new(UserService::new(
            store.clone(),
            cache.clone(),
            publisher.clone(),
            CircuitBreaker::new("users", BreakerConfig::default()),
            ServiceConfig::default(),
        ));
        let records = Arc::new(RecordService::new(
            store.clone(),
            cache.clone(),
            publisher.clone(),
            CircuitBreaker::new("repositories", BreakerConfig::default()),
            ServiceConfig::default(),
        ));

        AppState { users, records, store, cache, publisher }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    fn put(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn banner_responds() {
        let app = create_router(create_test_state());

        let response =
            app.oneshot(Request::builder().uri("/").body(Body::empty()).unwrap()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn create_and_get_user() {
        let app = create_router(create_test_state());

        let response = app
            .clone()
            .oneshot(post("/users", json!({"name": "alice", "email": "alice@example.com"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        let user: User = serde_json::from_value(created).unwrap();
        assert_eq!(user.name, "alice");

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/users/{}", user.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let fetched: User = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(fetched, user);
    }

    #[tokio::test]
    async fn invalid_user_draft_is_unprocessable() {
        let app = create_router(create_test_state());

        let response = app
            .oneshot(post("/users", json!({"name": "", "email": "a@b.io"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("name"));
    }

    #[tokio::test]
    async fn malformed_json_body_is_bad_request() {
        let app = create_router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/users")
                    .header("content-type", "application/json")
                    .body(Body::from("{not valid json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_id_is_bad_request() {
        let app = create_router(create_test_state());

        let response = app
            .oneshot(
                Request::builder().uri("/users/not-an-id").body(Body::empty()).unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let app = create_router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/users/f47ac10b-58cc-4372-a567-0e02b2c3d479")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_and_list_users() {
        let app = create_router(create_test_state());

        let response = app
            .clone()
            .oneshot(post("/users", json!({"name": "bob", "email": "bob@example.com"})))
            .await
            .unwrap();
        let user: User = serde_json::from_value(body_json(response).await).unwrap();

        let response = app
            .clone()
            .oneshot(put(
                &format!("/users/{}", user.id),
                json!({"name": "robert", "email": "bob@example.com"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let updated: User = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(updated.name, "robert");

        let response = app
            .oneshot(Request::builder().uri("/users").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listed: Vec<User> = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "robert");
    }

    #[tokio::test]
    async fn delete_user_then_repeat_is_not_found() {
        let app = create_router(create_test_state());

        let response = app
            .clone()
            .oneshot(post("/users", json!({"name": "carol", "email": "carol@example.com"})))
            .await
            .unwrap();
        let user: User = serde_json::from_value(body_json(response).await).unwrap();
        let uri = format!("/users/{}", user.id);

        let response = app
            .clone()
            .oneshot(
                Request::builder().method("DELETE").uri(&uri).body(Body::empty()).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(
                Request::builder().method("DELETE").uri(&uri).body(Body::empty()).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn repository_crud_round_trip() {
        let app = create_router(create_test_state());

        let response = app
            .clone()
            .oneshot(post("/users", json!({"name": "dave", "email": "dave@example.com"})))
            .await
            .unwrap();
        let owner: User = serde_json::from_value(body_json(response).await).unwrap();

        let response = app
            .clone()
            .oneshot(post(
                "/repositories",
                json!({
                    "user_id": owner.id.to_string(),
                    "name": "orchestrator",
                    "url": "https://git.example.com/dave/orchestrator",
                    "ai_enabled": true
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let record: RepoRecord = serde_json::from_value(body_json(response).await).unwrap();
        assert!(record.ai_enabled);
        assert_eq!(record.user_id, owner.id);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/repositories").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let listed: Vec<RepoRecord> = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(listed.len(), 1);

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/repositories/{}", record.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn repository_without_owner_is_unprocessable() {
        let app = create_router(create_test_state());

        let response = app
            .oneshot(post(
                "/repositories",
                json!({"name": "orphan", "url": "https://git.example.com/orphan"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn liveness_is_static() {
        let app = create_router(create_test_state());

        let response = app
            .oneshot(Request::builder().uri("/health/liveness").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "alive");
    }

    #[tokio::test]
    async fn readiness_reports_components() {
        let app = create_router(create_test_state());

        let response = app
            .oneshot(Request::builder().uri("/health/readiness").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ready");
        assert_eq!(body["components"]["store"], "ok");
        assert_eq!(body["components"]["cache"], "ok");
        assert_eq!(body["components"]["events"], "ok");
    }

    #[tokio::test]
    async fn readiness_degrades_when_publisher_is_down() {
        let store: Arc<dyn Store> = Arc::new(MemoryBackend::new());
        let cache: Arc<dyn CacheStore> = Arc::new(MemoryCache::new());
        let publisher = Arc::new(MemoryPublisher::new());
        publisher.set_failing(true);

        let users = Arc::new(UserService::new(
            store.clone(),
            cache.clone(),
            publisher.clone(),
            CircuitBreaker::new("users", BreakerConfig::default()),
            ServiceConfig::default(),
        ));
        let records = Arc::new(RecordService::new(
            store.clone(),
            cache.clone(),
            publisher.clone(),
            CircuitBreaker::new("repositories", BreakerConfig::default()),
            ServiceConfig::default(),
        ));
        let state = AppState { users, records, store, cache, publisher };

        let app = create_router(state);
        let response = app
            .oneshot(Request::builder().uri("/health/readiness").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["components"]["events"], "unreachable");
    }
}
