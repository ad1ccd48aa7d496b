//! Property API Endpoints
//! Mission: Public browsing, host-owned listing management

use crate::{
    api::extract::ValidatedJson,
    auth::{auth_middleware, authorize_owner, require_host, AuthContext, AuthState},
    error::ApiError,
    properties::{
        models::{NewProperty, PropertyFilter, PropertyPatch, PropertyQuery, PropertyView},
        store::PropertyStore,
    },
};
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub message: &'static str,
}

/// Build the `/api/properties` router. Reads are public; writes require a token.
pub fn router(store: PropertyStore, auth: AuthState) -> Router {
    let auth_layer = middleware::from_fn_with_state(auth, auth_middleware);

    Router::new()
        .route(
            "/",
            get(list_properties).merge(
                post(create_property)
                    .route_layer(middleware::from_fn(require_host))
                    .route_layer(auth_layer.clone()),
            ),
        )
        .route(
            "/:id",
            get(get_property).merge(
                put(update_property)
                    .delete(delete_property)
                    .route_layer(auth_layer),
            ),
        )
        .with_state(store)
}

/// List - GET /api/properties
pub async fn list_properties(
    State(store): State<PropertyStore>,
    query: Result<Query<PropertyQuery>, QueryRejection>,
) -> Result<Json<Vec<PropertyView>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::invalid(e.body_text()))?;
    let filter = PropertyFilter::try_from(query)?;
    Ok(Json(store.list(&filter).await?))
}

/// Detail - GET /api/properties/:id
pub async fn get_property(
    State(store): State<PropertyStore>,
    Path(id): Path<String>,
) -> Result<Json<PropertyView>, ApiError> {
    let id = parse_id(&id)?;
    store
        .get(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Property"))
}

/// Create - POST /api/properties (host or admin)
pub async fn create_property(
    State(store): State<PropertyStore>,
    Extension(ctx): Extension<AuthContext>,
    ValidatedJson(payload): ValidatedJson<NewProperty>,
) -> Result<(StatusCode, Json<PropertyView>), ApiError> {
    let view = store.create(ctx.account_id, payload).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Update - PUT /api/properties/:id (owner or admin)
pub async fn update_property(
    State(store): State<PropertyStore>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
    ValidatedJson(patch): ValidatedJson<PropertyPatch>,
) -> Result<Json<PropertyView>, ApiError> {
    let id = parse_id(&id)?;
    let host_id = store.host_of(id).await?.ok_or(ApiError::NotFound("Property"))?;
    authorize_owner(&ctx, host_id)?;

    store
        .update(id, patch)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Property"))
}

/// Delete - DELETE /api/properties/:id (owner or admin)
pub async fn delete_property(
    State(store): State<PropertyStore>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let id = parse_id(&id)?;
    let host_id = store.host_of(id).await?.ok_or(ApiError::NotFound("Property"))?;
    authorize_owner(&ctx, host_id)?;

    if !store.delete(id).await? {
        return Err(ApiError::NotFound("Property"));
    }

    info!("Property {} deleted by {}", id, ctx.account_id);
    Ok(Json(DeletedResponse {
        message: "Property deleted",
    }))
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::invalid("Invalid property id"))
}
