use std::sync::Arc;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use futures::future::join_all;
use serde::Deserialize;
use shared::protocol::API_PREFIX;
use shared::types::{ServiceIdentifier, ServiceRecord, ServiceType};
use crate::discovery::ServiceDiscovery;
use crate::dns::ResolveError;
use crate::error::DiscoveryError;

#[derive(Clone)]
pub struct AppState {
    pub discovery: Arc<dyn ServiceDiscovery>,
    /// The record this daemon published
    pub instance: Arc<ServiceRecord>,
}

#[derive(Deserialize)]
pub struct ServiceQuery {
    #[serde(rename = "type")]
    pub service_type: Option<String>,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/instance", get(get_instance))
        .route("/types", get(get_types))
        .route("/services", get(get_services))
        .route("/services/:instance", get(get_service))
        .with_state(state);
    Router::new().nest(API_PREFIX, api)
}

fn status_of(error: &DiscoveryError) -> StatusCode {
    match error {
        DiscoveryError::NoInstance { .. } => StatusCode::NOT_FOUND,
        DiscoveryError::Resolve(ResolveError::NotFound { .. }) => StatusCode::NOT_FOUND,
        DiscoveryError::Resolve(ResolveError::InvalidName { .. }) => StatusCode::BAD_REQUEST,
        _ => StatusCode::BAD_GATEWAY,
    }
}

async fn get_instance(State(state): State<AppState>) -> Json<ServiceRecord> {
    Json(state.instance.as_ref().clone())
}

async fn get_types(State(state): State<AppState>) -> Result<Json<Vec<ServiceType>>, StatusCode> {
    state
        .discovery
        .lookup_types()
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!("Failed to look up service types: {}", e);
            status_of(&e)
        })
}

async fn get_services(
    State(state): State<AppState>,
    Query(params): Query<ServiceQuery>,
) -> Result<Json<Vec<ServiceIdentifier>>, StatusCode> {
    let explicit = params.service_type.is_some();
    let types = match params.service_type {
        Some(service_type) => vec![ServiceType::parse(&service_type)],
        None => state.discovery.lookup_types().await.map_err(|e| {
            tracing::error!("Failed to look up service types: {}", e);
            status_of(&e)
        })?,
    };

    let results = join_all(types.iter().map(|ty| state.discovery.lookup_identifiers(ty))).await;

    let mut identifiers = Vec::new();
    for (ty, result) in types.iter().zip(results) {
        match result {
            Ok(found) => identifiers.extend(found),
            Err(e) if explicit => {
                tracing::error!("Failed to look up instances of {}: {}", ty, e);
                return Err(status_of(&e));
            }
            Err(e) => tracing::warn!("Skipping instances of {}: {}", ty, e),
        }
    }
    Ok(Json(identifiers))
}

async fn get_service(
    State(state): State<AppState>,
    Path(instance): Path<String>,
) -> Result<Json<ServiceRecord>, StatusCode> {
    state
        .discovery
        .lookup_record(&ServiceIdentifier::parse(&instance))
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!("Failed to look up {}: {}", instance, e);
            status_of(&e)
        })
}
