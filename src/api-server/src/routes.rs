//! Route definitions for the API server
//!
//! Routes are organized by functionality:
//! - Health endpoint
//! - Project policy bindings
//! - Policy management
//! - Local identities

use crate::{handlers, middleware, state::AppState, API_VERSION};
use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI documentation configuration
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Polbind API",
        version = "1.0.0",
        description = "Subject-to-policy binding API",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    paths(
        handlers::health_check,
        handlers::bind_project_policy,
        handlers::unbind_project_policy,
        handlers::create_policy,
        handlers::get_policy,
        handlers::list_policies,
        handlers::create_identity,
        handlers::update_identity,
        handlers::list_identities,
    ),
    components(
        schemas(
            crate::HealthResponse,
            crate::models::SubjectModel,
            crate::models::BindingRequestBody,
            crate::models::ProjectPolicyResponse,
            crate::models::ScopeModel,
            crate::models::CreatePolicyRequest,
            crate::models::PolicyResponse,
            crate::models::ListPoliciesResponse,
            crate::models::IdentityRequest,
            crate::models::IdentityResponse,
            crate::models::ListIdentitiesResponse,
            crate::models::SyncFailureModel,
            crate::models::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health endpoint"),
        (name = "bindings", description = "Project policy bindings"),
        (name = "policies", description = "Policy management"),
        (name = "identities", description = "Local identities and declared policies"),
    )
)]
pub struct ApiDoc;

/// Create the application router with all routes and middleware
pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Project bindings
        .route(
            "/projects/:project/policies/binding",
            post(handlers::bind_project_policy),
        )
        .route(
            "/projects/:project/policies/unbinding",
            post(handlers::unbind_project_policy),
        )
        // Policies
        .route(
            "/policies",
            post(handlers::create_policy).get(handlers::list_policies),
        )
        .route("/policies/:id", get(handlers::get_policy))
        // Identities
        .route(
            "/identities",
            post(handlers::create_identity).get(handlers::list_identities),
        )
        .route("/identities/:name", put(handlers::update_identity));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest(&format!("/api/{}", API_VERSION), api_routes)
        .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        // Middleware layers (executed bottom to top)
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(middleware::cors_layer())
        .layer(TraceLayer::new_for_http())
}
