pub mod handlers;
pub mod middleware;
pub mod models;
pub mod ws;

use axum::{
    http::{header, Method},
    middleware as axum_middleware,
    routing::{any, get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use hookpost_core::{
    Broadcaster, EndpointRegistry, HookIngestor, SessionConfig, SessionManager,
};
use hookpost_db::entities::endpoint;

use middleware::AuthState;

/// Application state shared across handlers
pub struct AppState {
    pub registry: Arc<EndpointRegistry>,
    pub ingestor: HookIngestor,
    pub sessions: Arc<SessionManager>,
    pub broadcaster: Broadcaster,
    pub auth: Arc<AuthState>,
    /// Public domain under which endpoints are addressable
    pub domain: String,
}

impl AppState {
    pub fn endpoint_info(&self, record: endpoint::Model) -> models::EndpointInfo {
        models::EndpointInfo {
            url: format!("https://{}.{}", record.name, self.domain),
            endpoint: record.name,
            plan: record.plan,
            created_at: record.created_at,
            expires_at: record.expires_at,
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Hookpost API",
        version = "0.1.0",
        description = "REST API for claiming endpoints and inspecting captured hooks",
        contact(
            name = "Hookpost Team",
            email = "team@hookpost.dev"
        )
    ),
    paths(
        handlers::health_check,
        handlers::check_availability,
        handlers::provision_endpoint,
        handlers::provision_guest_endpoint,
        handlers::list_endpoints,
        handlers::capture_hook,
        handlers::list_history,
        handlers::get_request,
        handlers::get_stats,
    ),
    components(
        schemas(
            models::ProvisionEndpointRequest,
            models::EndpointInfo,
            models::EndpointList,
            models::AvailabilityStatus,
            models::AvailabilityResponse,
            models::HookRecord,
            models::HistoryResponse,
            models::HistoryQuery,
            models::StatsResponse,
            models::HealthResponse,
            models::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "endpoints", description = "Endpoint provisioning and availability"),
        (name = "hooks", description = "Hook capture and inspection"),
        (name = "system", description = "System health and info endpoints")
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// API server configuration
pub struct ApiServerConfig {
    /// Address to bind the API server
    pub bind_addr: SocketAddr,
    /// Public domain endpoints live under (e.g. "hookpost.dev")
    pub domain: String,
    /// Enable CORS (for development)
    pub enable_cors: bool,
    /// Secret for validating bearer tokens
    pub jwt_secret: String,
    /// Inspector session knobs
    pub session_config: SessionConfig,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".parse().unwrap(),
            domain: "hookpost.dev".to_string(),
            enable_cors: true,
            jwt_secret: "change-me-in-production".to_string(),
            session_config: SessionConfig::default(),
        }
    }
}

/// API Server
pub struct ApiServer {
    config: ApiServerConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    /// Create a new API server around an endpoint registry
    pub fn new(config: ApiServerConfig, registry: Arc<EndpointRegistry>) -> Self {
        let sessions = Arc::new(SessionManager::new(config.session_config.clone()));
        let state = Arc::new(AppState {
            ingestor: HookIngestor::new(registry.clone()),
            broadcaster: Broadcaster::new(sessions.clone()),
            sessions,
            auth: Arc::new(AuthState::new(config.jwt_secret.as_bytes())),
            domain: config.domain.clone(),
            registry,
        });

        Self { config, state }
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let api_doc = ApiDoc::openapi();

        // Build PUBLIC routes (no authentication required)
        let public_router = Router::new()
            .route("/api/health", get(handlers::health_check))
            .route(
                "/api/endpoints/exists/{name}",
                get(handlers::check_availability),
            )
            .route(
                "/api/endpoints/guest",
                post(handlers::provision_guest_endpoint),
            )
            .route("/api/hook/{name}", any(handlers::capture_hook_root))
            .route("/api/hook/{name}/{*path}", any(handlers::capture_hook))
            .route("/api/inspect/{name}", get(ws::open_inspector_session))
            .with_state(self.state.clone());

        // Build PROTECTED routes (require bearer token authentication)
        let protected_router = Router::new()
            .route(
                "/api/endpoints",
                get(handlers::list_endpoints).post(handlers::provision_endpoint),
            )
            .route(
                "/api/endpoints/{name}/history",
                get(handlers::list_history),
            )
            .route("/api/endpoints/{name}/stats", get(handlers::get_stats))
            .route("/api/requests/{token}", get(handlers::get_request))
            .with_state(self.state.clone())
            .layer(axum_middleware::from_fn_with_state(
                self.state.auth.clone(),
                middleware::require_auth,
            ));

        // Merge public and protected routers with Swagger UI
        // SwaggerUi automatically creates a route for /api/openapi.json
        let router = Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api/openapi.json", api_doc))
            .merge(public_router)
            .merge(protected_router);

        let cors = if self.config.enable_cors {
            Some(
                CorsLayer::new()
                    .allow_methods([Method::GET, Method::POST, Method::DELETE])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
                    .allow_origin(tower_http::cors::Any),
            )
        } else {
            None
        };

        let mut router = router.layer(TraceLayer::new_for_http());

        if let Some(cors) = cors {
            router = router.layer(cors);
        }

        router
    }

    /// Start the API server
    pub async fn start(self) -> Result<(), anyhow::Error> {
        let router = self.build_router();

        info!("Starting API server on {}", self.config.bind_addr);
        info!(
            "OpenAPI spec: http://{}/api/openapi.json",
            self.config.bind_addr
        );
        info!("Swagger UI: http://{}/swagger-ui", self.config.bind_addr);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        axum::serve(listener, router)
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        Ok(())
    }
}
