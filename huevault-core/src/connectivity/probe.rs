use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::Notify;

/// Default deadline for one reachability check.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Source of the current network reachability.
pub trait ReachabilityProbe: Send + Sync {
    fn is_reachable(&self) -> BoxFuture<'_, bool>;

    /// Resolves when the probe knows reachability may have changed.
    ///
    /// Probes without change notification never resolve and are only polled.
    fn changed(&self) -> BoxFuture<'_, ()> {
        Box::pin(futures::future::pending())
    }
}

/// Considers the network reachable when `url` answers an HTTP request at all.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn check(&self) -> bool {
        match self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(url = %self.url, error = %e, "reachability check failed");
                false
            }
        }
    }
}

impl ReachabilityProbe for HttpProbe {
    fn is_reachable(&self) -> BoxFuture<'_, bool> {
        Box::pin(self.check())
    }
}

/// Reachability set from outside, e.g. by a platform network callback.
#[derive(Debug, Default)]
pub struct ManualProbe {
    online: AtomicBool,
    notify: Notify,
}

impl ManualProbe {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
            notify: Notify::new(),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
        self.notify.notify_one();
    }
}

impl ReachabilityProbe for ManualProbe {
    fn is_reachable(&self) -> BoxFuture<'_, bool> {
        let online = self.online.load(Ordering::SeqCst);
        Box::pin(async move { online })
    }

    fn changed(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.notify.notified())
    }
}
