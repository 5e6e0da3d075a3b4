use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use polbind_authz::{BindingError, BindingRequest, Policy, RequestContext};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::{
    error::{ApiError, Result},
    middleware::X_PROJECT_ID,
    models::*,
    state::AppState,
    HealthResponse,
};

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// Scope of a project binding request: header hint, path fallback
fn request_context(project: String, headers: &HeaderMap) -> RequestContext {
    let ctx = RequestContext::new(project);
    match headers.get(X_PROJECT_ID).and_then(|v| v.to_str().ok()) {
        Some(hint) => ctx.with_hint(hint),
        None => ctx,
    }
}

/// Bind subjects to a policy inside a project
#[utoipa::path(
    post,
    path = "/api/v1/projects/{project}/policies/binding",
    params(
        ("project" = String, Path, description = "Project name"),
        ("x-project-id" = Option<String>, Header, description = "Project overriding the path")
    ),
    request_body = BindingRequestBody,
    responses(
        (status = 200, description = "Binding after the change", body = ProjectPolicyResponse),
        (status = 400, description = "Missing policy or policy not project-scoped", body = ErrorResponse),
        (status = 404, description = "Policy not found", body = ErrorResponse),
        (status = 409, description = "Binding modified concurrently", body = ErrorResponse)
    ),
    tag = "bindings"
)]
pub async fn bind_project_policy(
    State(state): State<Arc<AppState>>,
    Path(project): Path<String>,
    headers: HeaderMap,
    Json(body): Json<BindingRequestBody>,
) -> Result<Json<ProjectPolicyResponse>> {
    body.validate()?;

    let ctx = request_context(project, &headers);
    let request: BindingRequest = body.into();
    let binding = state.reconciler.bind(&ctx, &request).await?;
    Ok(Json(binding.into()))
}

/// Unbind subjects from a policy inside a project
#[utoipa::path(
    post,
    path = "/api/v1/projects/{project}/policies/unbinding",
    params(
        ("project" = String, Path, description = "Project name"),
        ("x-project-id" = Option<String>, Header, description = "Project overriding the path")
    ),
    request_body = BindingRequestBody,
    responses(
        (status = 200, description = "Binding after the change", body = ProjectPolicyResponse),
        (status = 400, description = "Missing policy or policy not project-scoped", body = ErrorResponse),
        (status = 404, description = "Policy or binding not found", body = ErrorResponse),
        (status = 409, description = "Binding modified concurrently", body = ErrorResponse)
    ),
    tag = "bindings"
)]
pub async fn unbind_project_policy(
    State(state): State<Arc<AppState>>,
    Path(project): Path<String>,
    headers: HeaderMap,
    Json(body): Json<BindingRequestBody>,
) -> Result<Json<ProjectPolicyResponse>> {
    body.validate()?;

    let ctx = request_context(project, &headers);
    let request: BindingRequest = body.into();
    let binding = state.reconciler.unbind(&ctx, &request).await?;
    Ok(Json(binding.into()))
}

/// Create a policy
#[utoipa::path(
    post,
    path = "/api/v1/policies",
    request_body = CreatePolicyRequest,
    responses(
        (status = 201, description = "Policy created", body = PolicyResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Policy already exists", body = ErrorResponse)
    ),
    tag = "policies"
)]
pub async fn create_policy(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePolicyRequest>,
) -> Result<(StatusCode, Json<PolicyResponse>)> {
    req.validate()?;

    let policy: Policy = req.into();
    let created = state
        .policies
        .create(policy)
        .await
        .map_err(BindingError::from)?;
    info!(policy = %created.id, scope = %created.scope, "created policy");

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Get policy by ID
#[utoipa::path(
    get,
    path = "/api/v1/policies/{id}",
    params(
        ("id" = String, Path, description = "Policy ID")
    ),
    responses(
        (status = 200, description = "Policy details", body = PolicyResponse),
        (status = 404, description = "Policy not found", body = ErrorResponse)
    ),
    tag = "policies"
)]
pub async fn get_policy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PolicyResponse>> {
    let policy = state.policies.get(&id).await.map_err(|e| {
        if e.is_not_found() {
            BindingError::PolicyNotFound(id.clone())
        } else {
            e.into()
        }
    })?;
    Ok(Json(policy.into()))
}

/// List the policies of a tenant
#[utoipa::path(
    get,
    path = "/api/v1/policies",
    params(PolicyQuery),
    responses(
        (status = 200, description = "Policies ordered by ID", body = ListPoliciesResponse),
        (status = 400, description = "Missing tenant", body = ErrorResponse)
    ),
    tag = "policies"
)]
pub async fn list_policies(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PolicyQuery>,
) -> Result<Json<ListPoliciesResponse>> {
    if query.tenant_id.trim().is_empty() {
        return Err(ApiError::BadRequest("tenant_id is required".to_string()));
    }

    let policies = state
        .policies
        .list(&query.tenant_id)
        .await
        .map_err(BindingError::from)?;

    let items: Vec<PolicyResponse> = policies.into_iter().map(Into::into).collect();
    Ok(Json(ListPoliciesResponse {
        total: items.len(),
        items,
    }))
}

/// Create a local identity, syncing its declared policies
#[utoipa::path(
    post,
    path = "/api/v1/identities",
    request_body = IdentityRequest,
    responses(
        (status = 201, description = "Identity created and policies synced", body = IdentityResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 502, description = "Identity stored, some policies failed to sync", body = ErrorResponse)
    ),
    tag = "identities"
)]
pub async fn create_identity(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IdentityRequest>,
) -> Result<(StatusCode, Json<IdentityResponse>)> {
    req.validate()?;

    let identity = state.identities.create(req.into()).await?;
    Ok((StatusCode::CREATED, Json(identity.into())))
}

/// Update a local identity, syncing its declared policies
#[utoipa::path(
    put,
    path = "/api/v1/identities/{name}",
    params(
        ("name" = String, Path, description = "Identity name")
    ),
    request_body = IdentityRequest,
    responses(
        (status = 200, description = "Identity updated and policies synced", body = IdentityResponse),
        (status = 404, description = "Identity not found", body = ErrorResponse),
        (status = 502, description = "Identity stored, some policies failed to sync", body = ErrorResponse)
    ),
    tag = "identities"
)]
pub async fn update_identity(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(mut req): Json<IdentityRequest>,
) -> Result<Json<IdentityResponse>> {
    // the path names the identity
    req.name = name;
    req.validate()?;

    let updated = state.identities.update(req.into()).await?;
    Ok(Json(updated.into()))
}

/// List local identities with the display names of their policies
#[utoipa::path(
    get,
    path = "/api/v1/identities",
    params(IdentityQuery),
    responses(
        (status = 200, description = "Identities", body = ListIdentitiesResponse)
    ),
    tag = "identities"
)]
pub async fn list_identities(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IdentityQuery>,
) -> Result<Json<ListIdentitiesResponse>> {
    let identities = state
        .identities
        .list(&query.tenant_id, query.username.as_deref())
        .await?;

    let items: Vec<IdentityResponse> = identities.into_iter().map(Into::into).collect();
    Ok(Json(ListIdentitiesResponse {
        total: items.len(),
        items,
    }))
}
