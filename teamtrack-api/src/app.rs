/// Application state and router builder
///
/// This module defines the shared application state and builds the Axum
/// router with all routes and middleware.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use teamtrack_api::{app::{build_router, AppState}, config::Config};
/// use teamtrack_shared::store::memory::MemoryStore;
///
/// # fn example(config: Config) {
/// let state = AppState::new(Arc::new(MemoryStore::new()), config);
/// let app = build_router(state);
/// # }
/// ```

use crate::{config::Config, error::ApiError, routes};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use teamtrack_shared::auth::middleware::authenticate_request;
use teamtrack_shared::store::Store;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Entity store, created once at startup
    pub store: Arc<dyn Store>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health                  # public
/// ├── /auth/                        # public
/// │   ├── POST /register
/// │   └── POST /login
/// └── bearer token required:
///     ├── GET|PATCH   /profile
///     ├── GET|POST    /projects
///     ├── POST        /projects/:id/members
///     ├── GET|POST    /tasks
///     ├── PATCH|DELETE /tasks/:id
///     └── GET         /users
/// ```
///
/// # Middleware Stack
///
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Bearer authentication on the protected routes
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    let protected_routes = Router::new()
        .route(
            "/profile",
            get(routes::profile::get_profile).patch(routes::profile::update_profile),
        )
        .route(
            "/projects",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route("/projects/:id/members", post(routes::projects::add_member))
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            patch(routes::tasks::update_task).delete(routes::tasks::delete_task),
        )
        .route("/users", get(routes::users::list_users))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/auth", auth_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// Bearer authentication layer
///
/// Rejects the request before it reaches a handler unless the
/// `Authorization` header carries a valid token, then injects
/// `AuthContext` into request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate_request(req.headers(), state.jwt_secret()).map_err(|e| {
        tracing::debug!(error = %e, path = %req.uri().path(), "Rejected unauthenticated request");
        ApiError::from(e)
    })?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
