//! Request handlers for the ID endpoints.
//!
//! Every handler waits for IDs through [`IdPool::get_id_async`] so a
//! momentarily empty pool parks the request task instead of a Tokio worker.
//! The wait is bounded by the configured timeout; on expiry the request fails
//! with [`ApiError::Unavailable`].

use crate::server::{config::ServerConfig, error::ApiError};
use axum::{
    Json,
    extract::{Query, State},
};
use core::time::Duration;
use idpool::{Error, IdPool, IdSource, PoolStats, RefillExecutor, TokioSleep};
use serde::{Deserialize, Serialize};

/// State shared by all handlers.
pub struct AppState<S, E>
where
    S: IdSource,
    E: RefillExecutor,
{
    pool: IdPool<S, E>,
    default_batch: usize,
    max_batch: usize,
    wait_timeout: Duration,
}

impl<S, E> Clone for AppState<S, E>
where
    S: IdSource,
    E: RefillExecutor,
{
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            default_batch: self.default_batch,
            max_batch: self.max_batch,
            wait_timeout: self.wait_timeout,
        }
    }
}

impl<S, E> AppState<S, E>
where
    S: IdSource,
    E: RefillExecutor,
{
    pub fn new(pool: IdPool<S, E>, config: &ServerConfig) -> Self {
        Self {
            pool,
            default_batch: config.default_batch,
            max_batch: config.max_batch,
            wait_timeout: config.wait_timeout,
        }
    }

    /// Runs `fut` under the request wait timeout.
    async fn bounded<T>(&self, fut: impl Future<Output = T>) -> Result<T, ApiError> {
        tokio::time::timeout(self.wait_timeout, fut)
            .await
            .map_err(|_| {
                Error::Starved {
                    timeout: self.wait_timeout,
                }
                .into()
            })
    }

    /// Number of IDs a `/ids` request receives.
    ///
    /// A missing, non-numeric or non-positive `count` falls back to the
    /// default batch; larger counts are clamped to the maximum.
    fn batch_size(&self, count: Option<&str>) -> usize {
        count
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|&n| n > 0)
            .map_or(self.default_batch, |n| {
                usize::try_from(n).map_or(self.max_batch, |n| n.min(self.max_batch))
            })
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    count: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IdResponse {
    id: u64,
}

#[derive(Debug, Serialize)]
pub struct IdsResponse {
    ids: Vec<u64>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

/// `GET /id`
pub async fn get_id<S, E>(State(state): State<AppState<S, E>>) -> Result<Json<IdResponse>, ApiError>
where
    S: IdSource,
    E: RefillExecutor,
{
    let id = state
        .bounded(state.pool.get_id_async::<TokioSleep>())
        .await?;
    Ok(Json(IdResponse { id }))
}

/// `GET /ids?count=K`
///
/// The whole batch shares one wait timeout. A batch that times out part way
/// answers `503`, and the IDs it had already taken are discarded: they are
/// never handed to another caller.
pub async fn get_ids<S, E>(
    State(state): State<AppState<S, E>>,
    Query(query): Query<BatchQuery>,
) -> Result<Json<IdsResponse>, ApiError>
where
    S: IdSource,
    E: RefillExecutor,
{
    let count = state.batch_size(query.count.as_deref());
    let ids = state
        .bounded(state.pool.get_ids_async::<TokioSleep>(count))
        .await?;
    Ok(Json(IdsResponse { ids }))
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// `GET /stats`
pub async fn stats<S, E>(State(state): State<AppState<S, E>>) -> Json<PoolStats>
where
    S: IdSource,
    E: RefillExecutor,
{
    Json(state.pool.stats())
}

#[cfg(test)]
mod tests {
    use crate::server::{
        config::{CliArgs, ServerConfig},
        service::{handler::AppState, router},
    };
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use clap::Parser;
    use idpool::{IdPool, PoolBuilder, TokioExecutor};
    use serde_json::Value;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tower::ServiceExt;

    type TestSource = Box<dyn Fn() -> Result<u64, &'static str> + Send + Sync>;

    fn config(extra: &[&str]) -> ServerConfig {
        let args = CliArgs::try_parse_from(["idpool-server"].iter().chain(extra)).unwrap();
        ServerConfig::try_from(args).unwrap()
    }

    /// Counts up from 1 and fails for good after `limit` IDs.
    fn source(limit: u64) -> TestSource {
        let next = AtomicU64::new(1);
        Box::new(move || {
            let n = next.fetch_add(1, Ordering::Relaxed);
            if n <= limit { Ok(n) } else { Err("source down") }
        })
    }

    fn pool(capacity: usize, limit: u64) -> IdPool<TestSource, TokioExecutor> {
        PoolBuilder::new(capacity)
            .build_with_executor(source(limit), TokioExecutor::current().unwrap())
            .unwrap()
    }

    fn app(pool: &IdPool<TestSource, TokioExecutor>, extra: &[&str]) -> Router {
        router(AppState::new(pool.clone(), &config(extra)))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn single_id() {
        let pool = pool(16, u64::MAX);
        let (status, body) = get(app(&pool, &[]), "/id").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 1);
        pool.close();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn batch_sizes() {
        let pool = pool(64, u64::MAX);
        let app = app(&pool, &["--default-batch", "3", "--max-batch", "5"]);

        for (uri, expected) in [
            ("/ids", 3),
            ("/ids?count=4", 4),
            ("/ids?count=500", 5),
            ("/ids?count=0", 3),
            ("/ids?count=-2", 3),
            ("/ids?count=lots", 3),
        ] {
            let (status, body) = get(app.clone(), uri).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert_eq!(body["ids"].as_array().unwrap().len(), expected, "{uri}");
        }
        pool.close();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn batch_ids_are_unique_and_ordered() {
        let pool = pool(8, u64::MAX);
        let (_, body) = get(app(&pool, &[]), "/ids?count=50").await;

        let ids: Vec<u64> = body["ids"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_u64().unwrap())
            .collect();
        assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 50);
        assert_eq!(&ids[..8], &[1, 2, 3, 4, 5, 6, 7, 8]);
        pool.close();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn starved_pool_answers_503() {
        // Both buffers fill at startup, then the source never recovers.
        let pool = pool(4, 8);
        let app = app(&pool, &["--wait-timeout-ms", "50"]);

        let (status, _) = get(app.clone(), "/ids?count=8").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = get(app, "/id").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].as_str().unwrap().contains("no ID"));
        pool.close();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn timed_out_batch_discards_what_it_took() {
        let pool = pool(4, 8);
        let app = app(&pool, &["--wait-timeout-ms", "50"]);

        let (status, _) = get(app.clone(), "/ids?count=10").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(pool.stats().buffered, [0, 0]);

        let (status, _) = get(app, "/id").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        pool.close();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn health_and_stats() {
        let pool = pool(20, u64::MAX);
        let app = app(&pool, &[]);

        let (status, body) = get(app.clone(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = get(app, "/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["capacity"], 20);
        assert_eq!(body["threshold"], 2);
        assert_eq!(body["closed"], false);
        pool.close();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_route_is_404() {
        let pool = pool(4, u64::MAX);
        let response = app(&pool, &[])
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        pool.close();
    }
}
