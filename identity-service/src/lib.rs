pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;

use service_core::axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};

use crate::config::IdentityConfig;
use crate::middleware::{protection_middleware, Protection};
use crate::models::scope::{ADMIN_SCOPE, ORGANIZATION_MEMBER, ORGANIZATION_OWNER};
use crate::services::{
    AccessTokenResolver, GlobalConfigStore, HealthCheck, HierarchyResolver, InvitationService,
    InvitationStore, OrganizationService, OrganizationStore, UserDirectory,
};

const ANY_SCOPE: &[&str] = &[];
const OWNER: &[&str] = &[ORGANIZATION_OWNER];
const OWNER_OR_MEMBER: &[&str] = &[ORGANIZATION_OWNER, ORGANIZATION_MEMBER];
const ADMIN: &[&str] = &[ADMIN_SCOPE];

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::organization::create_organization,
        handlers::organization::create_sub_organization,
        handlers::organization::get_organization,
        handlers::organization::update_organization,
        handlers::organization::get_organization_tree,
        handlers::membership::add_member,
        handlers::membership::remove_member,
        handlers::membership::add_owner,
        handlers::membership::remove_owner,
        handlers::invitation::list_pending_invitations,
        handlers::invitation::cancel_invitation,
        handlers::invitation::accept_invitation,
        handlers::invitation::reject_invitation,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::organization::CreateOrganizationRequest,
            dtos::organization::UpdateOrganizationRequest,
            dtos::invitation::MemberRequest,
            dtos::invitation::PendingInvitationResponse,
            models::Organization,
            dtos::invitation::InvitationResponse,
            models::InvitationRole,
            models::InvitationStatus,
            services::OrganizationTreeNode,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Organizations", description = "Organization namespace and hierarchy"),
        (name = "Membership", description = "Members and owners of an organization"),
        (name = "Invitations", description = "Pending membership and ownership offers"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "access_token",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("Authorization"))),
            );
        }
    }
}

/// Store adapters the service runs against.
#[derive(Clone)]
pub struct Stores {
    pub health: Arc<dyn HealthCheck>,
    pub organizations: Arc<dyn OrganizationStore>,
    pub tokens: Arc<dyn AccessTokenResolver>,
    pub users: Arc<dyn UserDirectory>,
    pub invitations: Arc<dyn InvitationStore>,
    pub global_config: Arc<dyn GlobalConfigStore>,
}

impl Stores {
    /// Use one backend for every store.
    pub fn shared<T>(store: Arc<T>) -> Self
    where
        T: HealthCheck
            + OrganizationStore
            + AccessTokenResolver
            + UserDirectory
            + InvitationStore
            + GlobalConfigStore
            + 'static,
    {
        Self {
            health: store.clone(),
            organizations: store.clone(),
            tokens: store.clone(),
            users: store.clone(),
            invitations: store.clone(),
            global_config: store,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<IdentityConfig>,
    pub health: Arc<dyn HealthCheck>,
    pub tokens: Arc<dyn AccessTokenResolver>,
    pub organizations: Arc<dyn OrganizationStore>,
    pub organization_service: OrganizationService,
    pub invitation_service: InvitationService,
    pub hierarchy: HierarchyResolver,
    pub ip_rate_limiter: IpRateLimiter,
}

impl AppState {
    pub fn new(config: IdentityConfig, stores: Stores) -> Self {
        let ip_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.global_ip_limit,
            config.rate_limit.global_ip_window_seconds,
        );
        let organization_service = OrganizationService::new(
            stores.organizations.clone(),
            config.security.admin_client_id.clone(),
        );

        Self {
            config: Arc::new(config),
            health: stores.health,
            tokens: stores.tokens,
            organization_service,
            invitation_service: InvitationService::new(
                stores.organizations.clone(),
                stores.users,
                stores.invitations,
            ),
            hierarchy: HierarchyResolver::new(stores.organizations.clone()),
            organizations: stores.organizations,
            ip_rate_limiter,
        }
    }
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    let guard_state = state.clone();
    let org = move |required: &'static [&'static str]| {
        from_fn_with_state(
            Protection::organization(guard_state.clone(), required),
            protection_middleware,
        )
    };
    let user_guard_state = state.clone();
    let user = move |required: &'static [&'static str]| {
        from_fn_with_state(
            Protection::user(user_guard_state.clone(), required),
            protection_middleware,
        )
    };

    let organization_routes = Router::new()
        .route(
            "/organizations",
            post(handlers::create_organization).route_layer(org(ANY_SCOPE)),
        )
        .route(
            "/organizations/:globalid",
            get(handlers::get_organization)
                .route_layer(org(OWNER_OR_MEMBER))
                .merge(put(handlers::update_organization).route_layer(org(OWNER))),
        )
        .route(
            "/organizations/:globalid/tree",
            get(handlers::get_organization_tree).route_layer(org(OWNER_OR_MEMBER)),
        )
        .route(
            "/organizations/:globalid/suborganizations",
            post(handlers::create_sub_organization).route_layer(org(OWNER)),
        )
        .route(
            "/organizations/:globalid/members",
            post(handlers::add_member).route_layer(org(OWNER)),
        )
        .route(
            "/organizations/:globalid/members/:username",
            delete(handlers::remove_member).route_layer(org(OWNER)),
        )
        .route(
            "/organizations/:globalid/owners",
            post(handlers::add_owner).route_layer(org(OWNER)),
        )
        .route(
            "/organizations/:globalid/owners/:username",
            delete(handlers::remove_owner).route_layer(org(OWNER)),
        )
        .route(
            "/organizations/:globalid/invitations",
            get(handlers::list_pending_invitations).route_layer(org(OWNER)),
        )
        .route(
            "/organizations/:globalid/invitations/:username",
            delete(handlers::cancel_invitation).route_layer(org(OWNER)),
        );

    let user_routes = Router::new().route(
        "/users/:username/organizations/:globalid/roles/:role",
        post(handlers::accept_invitation)
            .delete(handlers::reject_invitation)
            .route_layer(user(ADMIN)),
    );

    let ip_limiter = state.ip_rate_limiter.clone();

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .merge(organization_routes)
        .merge(user_routes)
        .with_state(state.clone())
        // Global IP rate limiting
        .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &service_core::axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(
                    state
                        .config
                        .security
                        .allowed_origins
                        .iter()
                        .filter_map(|o| match o.parse::<HeaderValue>() {
                            Ok(origin) => Some(origin),
                            Err(e) => {
                                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                                None
                            }
                        })
                        .collect::<Vec<HeaderValue>>(),
                )
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        );

    Ok(app)
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 500, description = "Store is unreachable")
    ),
    tag = "Observability"
)]
pub async fn health_check(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    state.health.ping().await.map_err(|e| {
        tracing::error!(error = %e, "MongoDB health check failed");
        AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "mongodb": "up"
        }
    })))
}
