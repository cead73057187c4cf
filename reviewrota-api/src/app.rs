/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use reviewrota_api::{app::{build_router, AppState}, config::Config};
/// use reviewrota_shared::storage::{InMemoryStore, Stores};
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> anyhow::Result<()> {
/// let stores = Stores::in_memory(Arc::new(InMemoryStore::new()));
/// let state = AppState::new(Config::in_memory(), stores, None, CancellationToken::new());
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::handle_middleware_error};
use axum::{
    error_handling::HandleErrorLayer,
    routing::{get, post},
    Router,
};
use rand::{rngs::StdRng, SeedableRng};
use reviewrota_shared::{
    assignment::{AssignmentEngine, StatsAggregator},
    roster::TeamService,
    storage::{CallGuard, Stores},
};
use sqlx::PgPool;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::{timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Pull request lifecycle and rebalancing
    pub engine: Arc<AssignmentEngine>,

    /// Team and user management
    pub teams: TeamService,

    /// Review statistics
    pub stats: StatsAggregator,

    /// Database connection pool, absent for the in-memory backend
    pub db: Option<PgPool>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    ///
    /// Every storage call made by the services observes `cancel`, so
    /// cancelling it on shutdown stops in-flight work at the next
    /// storage round-trip.
    pub fn new(config: Config, stores: Stores, db: Option<PgPool>, cancel: CancellationToken) -> Self {
        let guard = CallGuard::new(config.storage.call_timeout(), cancel);

        let mut engine = AssignmentEngine::new(stores.clone(), guard.clone());
        if let Some(seed) = config.rng_seed {
            engine = engine.with_rng(StdRng::seed_from_u64(seed));
        }

        Self {
            engine: Arc::new(engine),
            teams: TeamService::new(stores.clone(), guard.clone()),
            stats: StatsAggregator::new(stores, guard),
            db,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health
/// ├── /team/
/// │   ├── POST /add
/// │   ├── GET  /get?team_name=
/// │   └── POST /rebalance
/// ├── /users/
/// │   ├── POST /setIsActive
/// │   └── GET  /getReview?user_id=
/// ├── /pullRequest/
/// │   ├── POST /create
/// │   ├── POST /merge
/// │   └── POST /reassign
/// └── GET  /stats/user?user_id=
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Request timeout (tower TimeoutLayer, answered as a `TIMEOUT` error)
/// 2. Logging (tower-http TraceLayer)
/// 3. CORS (tower-http CorsLayer)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let team_routes = Router::new()
        .route("/add", post(routes::team::add_team))
        .route("/get", get(routes::team::get_team))
        .route("/rebalance", post(routes::team::rebalance_team));

    let user_routes = Router::new()
        .route("/setIsActive", post(routes::users::set_is_active))
        .route("/getReview", get(routes::users::get_review));

    let pr_routes = Router::new()
        .route("/create", post(routes::pull_requests::create_pr))
        .route("/merge", post(routes::pull_requests::merge_pr))
        .route("/reassign", post(routes::pull_requests::reassign_reviewer));

    let request_timeout = state.config.request_timeout();

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/stats/user", get(routes::stats::user_stats))
        .nest("/team", team_routes)
        .nest("/users", user_routes)
        .nest("/pullRequest", pr_routes)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
