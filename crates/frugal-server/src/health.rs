use axum::Json;
use axum::extract::State;
use frugal_config::BackendKind;
use frugal_llm::RouterState;
use serde::Serialize;

/// Router readiness with the registered backends
#[derive(Debug, Serialize)]
pub struct HealthReport {
    status: &'static str,
    backends: Vec<BackendHealth>,
    quota_blocked: Vec<String>,
}

#[derive(Debug, Serialize)]
struct BackendHealth {
    id: String,
    kind: BackendKind,
    model: String,
    /// False while the backend sits out a quota cool-down
    available: bool,
}

/// Liveness probe; always 200 once the router is built
pub async fn health_handler(State(state): State<RouterState>) -> Json<HealthReport> {
    let quota_blocked = state.quota_blocked();

    let backends = state
        .backends()
        .iter()
        .map(|b| BackendHealth {
            id: b.id.clone(),
            kind: b.kind,
            model: b.model.clone(),
            available: !quota_blocked.contains(&b.id),
        })
        .collect();

    Json(HealthReport {
        status: "ok",
        backends,
        quota_blocked,
    })
}
