//! Defines routes for the order intake API.
//!
//! ## Structure
//! - **Orders**
//!   - `GET    /api/orders` - list (`?orderId=` single order, `?stats=1` counts)
//!   - `POST   /api/orders` - create order
//!   - `PATCH  /api/orders?orderId=X&action=status` - update status
//!   - `DELETE /api/orders` - delete all orders
//!   - `GET    /api/orders/export`, `POST /api/orders/import` - backup / restore
//!
//! - **Files**
//!   - `POST   /api/upload` - multipart upload (field `file`)
//!   - `GET    /api/files` - list (`?path=` single file)
//!   - `DELETE /api/files` - delete all files
//!   - `GET    /uploads/{*name}` - raw file bytes
//!
//! Every API path answers `OPTIONS` with 200 and any other unsupported
//! method with a JSON 405.

use crate::{
    errors::{AppError, GENERIC_ERROR},
    handlers::{
        file_handlers::{delete_files, get_files, serve_upload, upload_file},
        health_handlers::{healthz, readyz},
        order_handlers::{
            create_order, delete_orders, export_orders, get_orders, import_orders, update_order,
        },
    },
    services::file_store::MAX_UPLOAD_BYTES,
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{MethodRouter, get, post},
};
use std::any::Any;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the router for all API routes, carrying `AppState` to handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Order routes
        .route(
            "/api/orders",
            api(get(get_orders)
                .post(create_order)
                .patch(update_order)
                .delete(delete_orders)),
        )
        .route("/api/orders/export", api(get(export_orders)))
        .route("/api/orders/import", api(post(import_orders)))
        // File routes
        .route("/api/files", api(get(get_files).delete(delete_files)))
        .route(
            "/api/upload",
            api(post(upload_file))
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES as usize + MULTIPART_OVERHEAD)),
        )
        .route("/uploads/{*name}", get(serve_upload))
}

/// Wrap routes with cross-cutting layers and attach state.
///
/// Outermost first: request tracing, permissive CORS, panic recovery.
pub fn app(state: AppState) -> Router {
    routes()
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api(router: MethodRouter<AppState>) -> MethodRouter<AppState> {
    router.options(preflight).fallback(method_not_allowed)
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> AppError {
    AppError::method_not_allowed()
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "handler panicked");
    AppError::internal(GENERIC_ERROR).into_response()
}
