use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{self, HeaderName, HeaderValue, Method},
    response::IntoResponse,
    routing::{get, post},
};
use platform_api::{ApiError, ApiResult};
use platform_authz::{Permission, PermissionEngine, Role};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, instrument};

use crate::{
    check::{self, CheckRequest, CheckResponse},
    config::AppConfig,
    graphql::SchemaType,
    roster::RosterSource,
};

#[derive(Clone)]
pub struct AppState {
    pub engine: &'static PermissionEngine,
    pub schema: SchemaType,
    pub config: Arc<AppConfig>,
    pub roster: RosterSource,
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "authz server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_methods([Method::POST, Method::GET])
        .allow_origin(allow_origin)
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    Router::new()
        .route("/health", get(health_handler))
        .route("/catalogue", get(catalogue_handler))
        .route("/roles/{role}/grants", get(role_grants_handler))
        .route("/check", post(check_handler))
        .route("/graphql", post(graphql_handler))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

/// Denials are 200s; only malformed requests are 400s.
#[instrument(name = "http.check", skip_all)]
async fn check_handler(
    State(state): State<AppState>,
    payload: Result<Json<CheckRequest>, JsonRejection>,
) -> ApiResult<Json<CheckResponse>> {
    let Json(request) = payload.map_err(|rejection| ApiError::invalid(rejection.body_text()))?;
    let context = state.roster.resolve(request.context.clone()).await;
    let response = check::evaluate(
        state.engine,
        state.config.environment,
        &request,
        context.as_ref(),
    )?;
    Ok(Json(response))
}

async fn catalogue_handler() -> Json<Vec<Permission>> {
    Json(Permission::ALL.to_vec())
}

#[derive(Serialize)]
struct RoleGrantsResponse {
    role: Role,
    permissions: Vec<Permission>,
    contextual: &'static [Permission],
}

async fn role_grants_handler(
    State(state): State<AppState>,
    Path(role): Path<String>,
) -> ApiResult<Json<RoleGrantsResponse>> {
    let role = role.parse::<Role>()?;
    Ok(Json(RoleGrantsResponse {
        role,
        permissions: state.engine.grants().grants(role).into_iter().collect(),
        contextual: state.engine.contextual().contextual_for(role),
    }))
}

async fn graphql_handler(
    State(state): State<AppState>,
    request: GraphQLRequest,
) -> GraphQLResponse {
    state.schema.execute(request.into_inner()).await.into()
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        ok: true,
        roster_source: state.roster.label(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    roster_source: &'static str,
    version: &'static str,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}
