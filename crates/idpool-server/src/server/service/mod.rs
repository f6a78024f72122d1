//! HTTP routes over a shared [`IdPool`](idpool::IdPool).
//!
//! ## Structure
//!
//! - [`handler`] - request handlers and their shared [`AppState`].
//! - [`config`] - concrete pool types used by the binary.

pub mod config;
pub mod handler;

use axum::{Router, routing::get};
use handler::{AppState, get_id, get_ids, health, stats};
use idpool::{IdSource, RefillExecutor};
use tower_http::cors::{Any, CorsLayer};

/// Builds the application router.
pub fn router<S, E>(state: AppState<S, E>) -> Router
where
    S: IdSource,
    E: RefillExecutor,
{
    Router::new()
        .route("/id", get(get_id::<S, E>))
        .route("/ids", get(get_ids::<S, E>))
        .route("/health", get(health))
        .route("/stats", get(stats::<S, E>))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
