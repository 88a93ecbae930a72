//! A mock of the admin backend: the uniform collection endpoints over in-memory rows.

pub mod collection;
pub mod error;
pub mod fixtures;
pub mod routes;

use std::{collections::HashMap, sync::Arc};

use axum::Router;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{collection::MockCollection, fixtures::Fixtures};

/// Collections keyed by `{domain}/{collection}`.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    collections: Arc<RwLock<HashMap<String, MockCollection>>>,
}

impl AppState {
    pub fn new(fixtures: Fixtures) -> Self {
        let collections = fixtures
            .collections
            .into_iter()
            .map(|fixture| {
                let key = fixture.key();
                (key, MockCollection::new(fixture.rows, fixture.forms))
            })
            .collect();
        Self {
            collections: Arc::new(RwLock::new(collections)),
        }
    }

    pub fn collections(&self) -> &RwLock<HashMap<String, MockCollection>> {
        &self.collections
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api/admin", routes::collections::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
