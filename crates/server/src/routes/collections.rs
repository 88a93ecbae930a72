use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use serde_json::Value;
use store::models::form_schema::FormData;
use tracing::debug;
use utils::response::ApiResponse;

use crate::{AppState, collection::MockCollection, error::ApiError};

/// What an `/api/admin/...` path addresses. Collection paths may span several segments
/// (`cardpc/zhixiang/news`), so the path is matched against the known collections.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Endpoint {
    Collection(String),
    Item { key: String, id: String },
    Form { key: String, form: String },
}

fn resolve(collections: &HashMap<String, MockCollection>, path: &str) -> Result<Endpoint, ApiError> {
    let path = path.trim_matches('/');
    if collections.contains_key(path) {
        return Ok(Endpoint::Collection(path.to_string()));
    }
    if let Some((prefix, last)) = path.rsplit_once('/') {
        if let Some((key, "forms")) = prefix.rsplit_once('/') {
            if collections.contains_key(key) {
                return Ok(Endpoint::Form {
                    key: key.to_string(),
                    form: last.to_string(),
                });
            }
        }
        if collections.contains_key(prefix) {
            return Ok(Endpoint::Item {
                key: prefix.to_string(),
                id: last.to_string(),
            });
        }
    }
    Err(ApiError::InvalidEndpoint)
}

/// GET /api/admin/{domain}/{collection}[/{id} | /forms/{form}]
pub async fn get_endpoint(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<ResponseJson<ApiResponse<Value>>, ApiError> {
    let collections = state.collections().read().await;
    match resolve(&collections, &path)? {
        Endpoint::Collection(key) => {
            let (rows, pagination) = collections[&key].list(&query);
            debug!(collection = %key, total = pagination.total, "listing");
            Ok(ResponseJson(ApiResponse::success_page(
                Value::Array(rows),
                pagination,
            )))
        }
        Endpoint::Item { key, id } => {
            Ok(ResponseJson(ApiResponse::success(collections[&key].get(&id)?)))
        }
        Endpoint::Form { key, form } => {
            let schema = collections[&key].form(&form).ok_or(ApiError::NotFound)?;
            let value =
                serde_json::to_value(schema).map_err(|e| ApiError::Internal(e.to_string()))?;
            Ok(ResponseJson(ApiResponse::success(value)))
        }
    }
}

/// POST /api/admin/{domain}/{collection}
pub async fn create_item(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Json(body): Json<FormData>,
) -> Result<ResponseJson<ApiResponse<Value>>, ApiError> {
    let mut collections = state.collections().write().await;
    let Endpoint::Collection(key) = resolve(&collections, &path)? else {
        return Err(ApiError::InvalidEndpoint);
    };
    let created = collections
        .get_mut(&key)
        .ok_or(ApiError::NotFound)?
        .create(&body);
    debug!(collection = %key, id = %created["id"], "created");
    Ok(ResponseJson(ApiResponse::success(created)))
}

/// PATCH /api/admin/{domain}/{collection}/{id}
pub async fn patch_item(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Json(body): Json<FormData>,
) -> Result<ResponseJson<ApiResponse<Value>>, ApiError> {
    let mut collections = state.collections().write().await;
    let Endpoint::Item { key, id } = resolve(&collections, &path)? else {
        return Err(ApiError::InvalidEndpoint);
    };
    let patched = collections
        .get_mut(&key)
        .ok_or(ApiError::NotFound)?
        .patch(&id, &body)?;
    Ok(ResponseJson(ApiResponse::success(patched)))
}

/// DELETE /api/admin/{domain}/{collection}/{id}
pub async fn delete_item(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<ResponseJson<ApiResponse<Value>>, ApiError> {
    let mut collections = state.collections().write().await;
    let Endpoint::Item { key, id } = resolve(&collections, &path)? else {
        return Err(ApiError::InvalidEndpoint);
    };
    let deleted = collections
        .get_mut(&key)
        .ok_or(ApiError::NotFound)?
        .delete(&id)?;
    debug!(collection = %key, id = %id, "deleted");
    Ok(ResponseJson(ApiResponse::success(deleted)))
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{*path}",
        get(get_endpoint)
            .post(create_item)
            .patch(patch_item)
            .delete(delete_item),
    )
}
