//! Controller behind every admin list page: search filters, pagination, row deletion.

use std::{fmt, sync::Arc};

use serde_json::Value;
use store::{
    SearchFormCache,
    models::{form_schema::FormData, pagination::Pagination},
};
use strum_macros::Display;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{
    admin_api::{ApiTransport, CollectionApi, TransportError, entity_id, search_params},
    config::AdminConfig,
    notification::Notifier,
};

pub const LOAD_FAILED_MESSAGE: &str = "failed to load data";
pub const DELETED_MESSAGE: &str = "deleted";
pub const DELETE_FAILED_MESSAGE: &str = "failed to delete";

/// Reshapes the `data` of a listing reply into rows.
pub type ParseListData = Arc<dyn Fn(Value) -> Vec<Value> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LoadPhase {
    Idle,
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListPageState {
    pub phase: LoadPhase,
    pub search_formdata: FormData,
    /// `None` until the first successful load.
    pub cached_data: Option<Vec<Value>>,
    pub pagination: Pagination,
}

#[derive(Debug, Error)]
pub enum ListPageError {
    #[error("request failed with status {0}")]
    Status(u16),
    #[error("row has no id")]
    MissingId,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub struct ListPage {
    transport: Arc<dyn ApiTransport>,
    api: CollectionApi,
    route_name: String,
    cache: Arc<SearchFormCache>,
    notifier: Arc<dyn Notifier>,
    parse_list_data: Option<ParseListData>,
    state: RwLock<ListPageState>,
}

impl fmt::Debug for ListPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListPage")
            .field("api", &self.api)
            .field("route_name", &self.route_name)
            .finish_non_exhaustive()
    }
}

impl ListPage {
    pub fn new(
        transport: Arc<dyn ApiTransport>,
        api: CollectionApi,
        route_name: impl Into<String>,
        cache: Arc<SearchFormCache>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            transport,
            api,
            route_name: route_name.into(),
            cache,
            notifier,
            parse_list_data: None,
            state: RwLock::new(ListPageState {
                phase: LoadPhase::Idle,
                search_formdata: FormData::new(),
                cached_data: None,
                pagination: Pagination::default(),
            }),
        }
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.state.get_mut().pagination.page_size = page_size;
        self
    }

    /// Take the page size configured for the admin.
    pub fn with_config(self, config: &AdminConfig) -> Self {
        self.with_page_size(config.page_size)
    }

    pub fn with_parse_list_data(mut self, parse: ParseListData) -> Self {
        self.parse_list_data = Some(parse);
        self
    }

    pub fn route_name(&self) -> &str {
        &self.route_name
    }

    pub async fn state(&self) -> ListPageState {
        self.state.read().await.clone()
    }

    pub async fn phase(&self) -> LoadPhase {
        self.state.read().await.phase
    }

    pub async fn rows(&self) -> Vec<Value> {
        self.state.read().await.cached_data.clone().unwrap_or_default()
    }

    pub async fn pagination(&self) -> Pagination {
        self.state.read().await.pagination
    }

    /// Restore the filters cached for this route (if any) and load the first page.
    pub async fn mount(&self) -> Result<(), ListPageError> {
        let cached = self.cache.get(&self.route_name).unwrap_or_default();
        debug!(route = %self.route_name, filters = cached.len(), "mounting list page");
        self.state.write().await.search_formdata = cached;
        self.refresh_data().await
    }

    /// Reload the current page with the current filters.
    ///
    /// Overlapping refreshes are not cancelled; whichever completes last sets the rows.
    pub async fn refresh_data(&self) -> Result<(), ListPageError> {
        let request = {
            let mut state = self.state.write().await;
            state.phase = LoadPhase::Loading;
            self.api
                .list(search_params(&state.search_formdata, &state.pagination))
        };

        let reply = match self.transport.send(request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(route = %self.route_name, error = %e, "list request failed");
                self.state.write().await.phase = LoadPhase::Failed;
                return Err(e.into());
            }
        };

        if !reply.is_ok() {
            warn!(route = %self.route_name, status = reply.status, "list request rejected");
            self.state.write().await.phase = LoadPhase::Failed;
            self.notifier.error(LOAD_FAILED_MESSAGE);
            return Err(ListPageError::Status(reply.status));
        }

        let page_info = reply.pagination().cloned();
        let rows = self.parse_rows(reply.into_data().unwrap_or(Value::Null));

        let mut state = self.state.write().await;
        debug!(route = %self.route_name, rows = rows.len(), "list loaded");
        state.cached_data = Some(rows);
        match page_info {
            Some(info) => state.pagination.apply(&info),
            None => debug!(route = %self.route_name, "listing reply has no pagination"),
        }
        state.phase = LoadPhase::Loaded;
        Ok(())
    }

    pub async fn handle_page_change(&self, page: u64) -> Result<(), ListPageError> {
        self.state.write().await.pagination.page = page;
        self.refresh_data().await
    }

    pub async fn delete_row(&self, row: &Value) -> Result<(), ListPageError> {
        let Some(id) = entity_id(row) else {
            self.notifier.error(DELETE_FAILED_MESSAGE);
            return Err(ListPageError::MissingId);
        };

        let reply = match self.transport.send(self.api.delete(&id)).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(route = %self.route_name, id = %id, error = %e, "delete request failed");
                self.notifier.error(DELETE_FAILED_MESSAGE);
                return Err(e.into());
            }
        };

        if !reply.is_ok() {
            self.notifier.error(DELETE_FAILED_MESSAGE);
            return Err(ListPageError::Status(reply.status));
        }
        self.notifier.success(DELETED_MESSAGE);
        self.refresh_data().await
    }

    /// Replace the search filters, remember them for this route and reload.
    pub async fn set_search_formdata(&self, formdata: FormData) -> Result<(), ListPageError> {
        self.cache.store(&self.route_name, &formdata);
        self.state.write().await.search_formdata = formdata;
        self.refresh_data().await
    }

    pub async fn set_search_field(
        &self,
        key: impl Into<String>,
        value: Value,
    ) -> Result<(), ListPageError> {
        let formdata = {
            let mut state = self.state.write().await;
            state.search_formdata.insert(key.into(), value);
            state.search_formdata.clone()
        };
        self.cache.store(&self.route_name, &formdata);
        self.refresh_data().await
    }

    fn parse_rows(&self, data: Value) -> Vec<Value> {
        if let Some(parse) = &self.parse_list_data {
            return parse(data);
        }
        match data {
            Value::Array(rows) => rows,
            Value::Null => Vec::new(),
            other => {
                warn!(route = %self.route_name, "listing data is not a list");
                vec![other]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::oneshot;
    use utils::response::{ApiResponse, PageInfo};

    use super::*;
    use crate::services::{
        admin_api::{ApiReply, ApiRequest, HttpMethod},
        testing::{FakeTransport, RecordingNotifier},
    };

    /// Holds every request until the test releases the gate it was handed on arrival.
    struct GatedTransport {
        gates: Mutex<VecDeque<oneshot::Receiver<ApiReply>>>,
        arrived: AtomicUsize,
    }

    impl GatedTransport {
        fn new(gates: Vec<oneshot::Receiver<ApiReply>>) -> Arc<Self> {
            Arc::new(Self {
                gates: Mutex::new(gates.into()),
                arrived: AtomicUsize::new(0),
            })
        }

        fn arrived(&self) -> usize {
            self.arrived.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ApiTransport for GatedTransport {
        async fn send(&self, _request: ApiRequest) -> Result<ApiReply, TransportError> {
            let gate = self.gates.lock().unwrap().pop_front();
            self.arrived.fetch_add(1, Ordering::SeqCst);
            match gate {
                Some(gate) => gate
                    .await
                    .map_err(|_| TransportError::Network("gate dropped".to_string())),
                None => Err(TransportError::Timeout),
            }
        }
    }

    fn listing(rows: Value, total: u64) -> ApiReply {
        ApiReply::new(
            200,
            ApiResponse::success_page(rows, PageInfo::compute(total, 1, 10)),
        )
    }

    fn param<'a>(request: &'a ApiRequest, key: &str) -> Option<&'a str> {
        request
            .params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Serves a three-row collection, page size taken from the request.
    fn three_rows() -> Arc<FakeTransport> {
        FakeTransport::new(|request| match request.method {
            HttpMethod::Get => {
                let page = param(request, "page").and_then(|p| p.parse().ok()).unwrap_or(1);
                let size = param(request, "page_size")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(10);
                Ok(ApiReply::new(
                    200,
                    ApiResponse::success_page(
                        json!([{ "id": 1 }, { "id": 2 }, { "id": 3 }]),
                        PageInfo::compute(3, page, size),
                    ),
                ))
            }
            HttpMethod::Delete if request.url.ends_with("/2") => Ok(ApiReply::ok(json!({ "id": 2 }))),
            _ => Ok(ApiReply::new(404, ApiResponse::error(404, "not found"))),
        })
    }

    fn page(transport: Arc<dyn ApiTransport>, notifier: Arc<RecordingNotifier>) -> ListPage {
        ListPage::new(
            transport,
            CollectionApi::new("media", "presentations"),
            "media-presentations",
            Arc::new(SearchFormCache::new()),
            notifier,
        )
    }

    #[tokio::test]
    async fn test_refresh_loads_rows_and_total() {
        let notifier = Arc::new(RecordingNotifier::default());
        let list = page(three_rows(), notifier.clone());
        assert_eq!(list.phase().await, LoadPhase::Idle);

        list.refresh_data().await.unwrap();

        let state = list.state().await;
        assert_eq!(state.phase, LoadPhase::Loaded);
        assert_eq!(state.cached_data.unwrap().len(), 3);
        assert_eq!(state.pagination.total, 3);
        assert_eq!(state.pagination.page, 1);
        assert!(notifier.errors().is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_refreshes_last_completion_wins() {
        let (early_tx, early_rx) = oneshot::channel();
        let (late_tx, late_rx) = oneshot::channel();
        let transport = GatedTransport::new(vec![early_rx, late_rx]);
        let list = page(transport.clone(), Arc::default());

        let driver = async {
            while transport.arrived() < 2 {
                tokio::task::yield_now().await;
            }
            // the second request is answered first
            late_tx
                .send(listing(json!([{ "id": 20 }, { "id": 21 }]), 2))
                .unwrap();
            while list.rows().await.is_empty() {
                tokio::task::yield_now().await;
            }
            early_tx.send(listing(json!([{ "id": 10 }]), 1)).unwrap();
        };

        let (first, second, ()) = tokio::join!(list.refresh_data(), list.refresh_data(), driver);
        first.unwrap();
        second.unwrap();

        let state = list.state().await;
        assert_eq!(state.phase, LoadPhase::Loaded);
        assert_eq!(state.cached_data, Some(vec![json!({ "id": 10 })]));
        assert_eq!(state.pagination.total, 1);
    }

    #[tokio::test]
    async fn test_page_change_sends_page_and_takes_server_page() {
        let transport = three_rows();
        let list = page(transport.clone(), Arc::default());

        list.handle_page_change(5).await.unwrap();

        let sent = transport.sent();
        assert_eq!(param(&sent[0], "page"), Some("5"));
        assert_eq!(param(&sent[0], "page_size"), Some("10"));
        // three rows fit on one page, the server clamps
        assert_eq!(list.pagination().await.page, 1);
    }

    #[tokio::test]
    async fn test_rejected_listing_fails_and_notifies() {
        let notifier = Arc::new(RecordingNotifier::default());
        let transport = FakeTransport::scripted(vec![Ok(ApiReply::new(
            500,
            ApiResponse::error(500, "boom"),
        ))]);
        let list = page(transport, notifier.clone());

        let err = list.refresh_data().await.unwrap_err();
        assert!(matches!(err, ListPageError::Status(500)));
        assert_eq!(list.phase().await, LoadPhase::Failed);
        assert!(list.state().await.cached_data.is_none());
        assert_eq!(notifier.errors(), vec![LOAD_FAILED_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn test_transport_error_fails_quietly() {
        let notifier = Arc::new(RecordingNotifier::default());
        let list = page(FakeTransport::scripted(vec![]), notifier.clone());

        assert!(matches!(
            list.refresh_data().await,
            Err(ListPageError::Transport(TransportError::Timeout))
        ));
        assert_eq!(list.phase().await, LoadPhase::Failed);
        assert!(notifier.errors().is_empty());
    }

    #[tokio::test]
    async fn test_delete_row_refreshes_on_success() {
        let notifier = Arc::new(RecordingNotifier::default());
        let transport = three_rows();
        let list = page(transport.clone(), notifier.clone());

        list.delete_row(&json!({ "id": 2 })).await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].url, "/api/admin/media/presentations/2");
        assert_eq!(sent[1].method, HttpMethod::Get);
        assert_eq!(notifier.successes(), vec![DELETED_MESSAGE.to_string()]);
        assert_eq!(list.phase().await, LoadPhase::Loaded);
    }

    #[tokio::test]
    async fn test_delete_row_failure_does_not_refresh() {
        let notifier = Arc::new(RecordingNotifier::default());
        let transport = three_rows();
        let list = page(transport.clone(), notifier.clone());

        let err = list.delete_row(&json!({ "id": 9 })).await.unwrap_err();
        assert!(matches!(err, ListPageError::Status(404)));
        assert_eq!(transport.sent().len(), 1);
        assert_eq!(notifier.errors(), vec![DELETE_FAILED_MESSAGE.to_string()]);

        assert!(matches!(
            list.delete_row(&json!({ "title": "no id" })).await,
            Err(ListPageError::MissingId)
        ));
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_search_filters_are_cached_and_restored() {
        let cache = Arc::new(SearchFormCache::new());
        let transport = three_rows();
        let make = || {
            ListPage::new(
                transport.clone(),
                CollectionApi::new("media", "presentations"),
                "media-presentations",
                cache.clone(),
                Arc::new(RecordingNotifier::default()),
            )
        };

        let first = make();
        first.set_search_field("title", json!("rust")).await.unwrap();
        assert_eq!(param(&transport.sent()[0], "title"), Some("rust"));

        let second = make();
        second.mount().await.unwrap();
        assert_eq!(second.state().await.search_formdata["title"], "rust");
        assert_eq!(param(&transport.sent()[1], "title"), Some("rust"));
    }

    #[tokio::test]
    async fn test_cached_filters_are_a_copy() {
        let cache = Arc::new(SearchFormCache::new());
        let list = ListPage::new(
            three_rows(),
            CollectionApi::new("course", "courses"),
            "courses",
            cache.clone(),
            Arc::new(RecordingNotifier::default()),
        );

        let mut formdata = FormData::new();
        formdata.insert("level".to_string(), json!(2));
        list.set_search_formdata(formdata.clone()).await.unwrap();
        formdata.insert("level".to_string(), json!(3));

        assert_eq!(cache.get("courses").unwrap()["level"], 2);
    }

    #[tokio::test]
    async fn test_parse_list_data_hook() {
        let calls = Arc::new(Mutex::new(0));
        let seen = calls.clone();
        let list = page(three_rows(), Arc::default()).with_parse_list_data(Arc::new(
            move |data: Value| {
                *seen.lock().unwrap() += 1;
                data.as_array()
                    .map(|rows| rows.iter().take(1).cloned().collect())
                    .unwrap_or_default()
            },
        ));

        list.refresh_data().await.unwrap();
        assert_eq!(list.rows().await, vec![json!({ "id": 1 })]);
        assert_eq!(*calls.lock().unwrap(), 1);
        assert_eq!(list.pagination().await.total, 3);
    }

    #[tokio::test]
    async fn test_custom_page_size_is_sent() {
        let transport = three_rows();
        let list = page(transport.clone(), Arc::default()).with_page_size(2);
        list.refresh_data().await.unwrap();
        assert_eq!(param(&transport.sent()[0], "page_size"), Some("2"));
        assert_eq!(list.pagination().await.page_size, 2);
    }

    #[tokio::test]
    async fn test_configured_page_size_is_sent() {
        let transport = three_rows();
        let config = AdminConfig {
            page_size: 25,
            ..Default::default()
        };
        let list = page(transport.clone(), Arc::default()).with_config(&config);

        list.refresh_data().await.unwrap();
        assert_eq!(param(&transport.sent()[0], "page_size"), Some("25"));
        assert_eq!(list.pagination().await.page_size, 25);
    }
}
