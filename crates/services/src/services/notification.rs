//! User-facing feedback and navigation seams used by the page controllers.

use std::sync::Arc;

use tracing::{error, info};

/// Shows short toast-style messages to the operator.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Default notifier: every notification becomes a log event.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        info!(notification = "success", "{}", message);
    }

    fn error(&self, message: &str) {
        error!(notification = "error", "{}", message);
    }
}

/// History navigation of the hosting router.
pub trait Navigator: Send + Sync {
    fn back(&self);
}

/// Navigator for headless use; going back has nowhere to go.
#[derive(Debug, Clone, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn back(&self) {}
}

pub fn tracing_notifier() -> Arc<dyn Notifier> {
    Arc::new(TracingNotifier)
}
