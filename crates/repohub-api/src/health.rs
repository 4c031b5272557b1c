//! Health check endpoints
//!
//! Liveness is static; readiness pings every external dependency with a
//! short per-component deadline so a hung backend cannot stall the probe.

use std::time::Duration;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use tokio::time::timeout;
use tracing::warn;

use crate::AppState;

const PING_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Serialize)]
struct LivenessResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadinessResponse {
    status: &'static str,
    components: Components,
}

#[derive(Serialize)]
struct Components {
    store: &'static str,
    cache: &'static str,
    events: &'static str,
}

pub async fn liveness_handler() -> impl IntoResponse {
    Json(LivenessResponse { status: "alive" })
}

pub async fn readiness_handler(State(state): State<AppState>) -> impl IntoResponse {
    let store = probe("store", timeout(PING_TIMEOUT, state.store.ping()).await.map(|r| r.is_ok()));
    let cache = probe("cache", timeout(PING_TIMEOUT, state.cache.ping()).await.map(|r| r.is_ok()));
    let events =
        probe("events", timeout(PING_TIMEOUT, state.publisher.ping()).await.map(|r| r.is_ok()));

    let ready = store && cache && events;
    let response = ReadinessResponse {
        status: if ready { "ready" } else { "degraded" },
        components: Components {
            store: component_status(store),
            cache: component_status(cache),
            events: component_status(events),
        },
    };

    let status = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(response))
}

fn probe(component: &str, result: Result<bool, tokio::time::error::Elapsed>) -> bool {
    match result {
        Ok(true) => true,
        Ok(false) => {
            warn!(component, "Readiness ping failed");
            false
        }
        Err(_) => {
            warn!(component, "Readiness ping timed out");
            false
        }
    }
}

fn component_status(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "unreachable"
    }
}
