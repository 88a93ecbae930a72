//! In-memory fakes shared by the controller tests.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;

use super::{
    admin_api::{ApiReply, ApiRequest, ApiTransport, TransportError},
    notification::{Navigator, Notifier},
};

type Handler = Box<dyn Fn(&ApiRequest) -> Result<ApiReply, TransportError> + Send + Sync>;

/// Answers every request through a handler and records what was sent.
pub struct FakeTransport {
    handler: Handler,
    sent: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&ApiRequest) -> Result<ApiReply, TransportError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            sent: Mutex::default(),
        })
    }

    /// Replies in order; once exhausted every call times out.
    pub fn scripted(replies: Vec<Result<ApiReply, TransportError>>) -> Arc<Self> {
        let queue = Mutex::new(replies.into_iter().rev().collect::<Vec<_>>());
        Self::new(move |_| {
            queue
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(TransportError::Timeout))
        })
    }

    pub fn sent(&self) -> Vec<ApiRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApiTransport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiReply, TransportError> {
        let reply = (self.handler)(&request);
        self.sent.lock().unwrap().push(request);
        reply
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub successes: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn successes(&self) -> Vec<String> {
        self.successes.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.successes.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

#[derive(Default)]
pub struct CountingNavigator {
    backs: AtomicUsize,
}

impl CountingNavigator {
    pub fn backs(&self) -> usize {
        self.backs.load(Ordering::SeqCst)
    }
}

impl Navigator for CountingNavigator {
    fn back(&self) {
        self.backs.fetch_add(1, Ordering::SeqCst);
    }
}
