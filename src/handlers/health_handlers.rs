//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks the order backend and upload disk I/O

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;
use tokio::fs;
use uuid::Uuid;

/// `GET /healthz`
///
/// Always 200 with a tiny JSON body. Never performs I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// 1. Asks the active order backend to read its collection (or `SELECT 1`).
/// 2. Writes, reads back and deletes a probe file under the uploads root.
///
/// HTTP 200 when both pass, 503 otherwise.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let orders_check = match state.orders.check_ready().await {
        Ok(()) => (true, None::<String>),
        Err(e) => (false, Some(format!("error: {}", e))),
    };

    // Probe names start with '.', so listings skip them.
    let probe = state.files.base_path.join(format!(".readyz-{}", Uuid::new_v4()));
    let disk_check = match fs::create_dir_all(&state.files.base_path).await {
        Err(e) => (false, Some(format!("could not create uploads dir: {}", e))),
        Ok(()) => match fs::write(&probe, b"readyz").await {
            Err(e) => (false, Some(format!("could not write probe file: {}", e))),
            Ok(()) => {
                let read_back = fs::read(&probe).await;
                let _ = fs::remove_file(&probe).await;
                match read_back {
                    Ok(bytes) if bytes == b"readyz" => (true, None),
                    Ok(_) => (false, Some("probe file content mismatch".to_string())),
                    Err(e) => (false, Some(format!("could not read probe file: {}", e))),
                }
            }
        },
    };

    let overall_ok = orders_check.0 && disk_check.0;

    let mut checks = HashMap::new();
    checks.insert(
        "orders",
        CheckStatus {
            ok: orders_check.0,
            backend: Some(state.orders.backend_name()),
            error: orders_check.1,
        },
    );
    checks.insert(
        "uploads",
        CheckStatus {
            ok: disk_check.0,
            backend: None,
            error: disk_check.1,
        },
    );

    let body = ReadyResponse {
        status: if overall_ok {
            "ok".into()
        } else {
            "error".into()
        },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    backend: Option<&'static str>,
    error: Option<String>,
}
