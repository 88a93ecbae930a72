use dashmap::DashMap;
use tracing::debug;

use crate::models::form_schema::FormData;

/// Last search filters of every list page, keyed by route name.
///
/// Shared through an `Arc` by all list pages of one admin session so that leaving a list and
/// coming back restores its filters. Lives in memory only.
#[derive(Debug, Default)]
pub struct SearchFormCache {
    forms: DashMap<String, FormData>,
}

impl SearchFormCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a deep copy of `formdata`; later edits by the caller do not leak into the cache.
    pub fn store(&self, route_name: &str, formdata: &FormData) {
        debug!(route = route_name, fields = formdata.len(), "caching search form");
        self.forms.insert(route_name.to_string(), formdata.clone());
    }

    pub fn get(&self, route_name: &str) -> Option<FormData> {
        self.forms.get(route_name).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}
