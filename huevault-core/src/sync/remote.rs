//! Remote document store.
//!
//! The reconciler only ever inserts documents; it never reads them back.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::Serialize;

use super::error::RemoteSyncError;
use crate::models::{ColorRecord, HexCode};

/// Payload pushed for one color. Built right before the push and dropped
/// once the remote has answered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteSyncRequest {
    #[serde(rename = "hexCode")]
    pub hex_code: HexCode,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "syncAttemptID")]
    pub sync_attempt_id: String,
}

impl RemoteSyncRequest {
    pub fn from_record(record: &ColorRecord, sync_attempt_id: &str) -> Self {
        Self {
            hex_code: record.hex_code.clone(),
            timestamp: record.created_at,
            sync_attempt_id: sync_attempt_id.to_string(),
        }
    }
}

/// Something that accepts color documents.
pub trait RemoteStore: Send + Sync {
    fn insert_document<'a>(
        &'a self,
        request: &'a RemoteSyncRequest,
    ) -> BoxFuture<'a, Result<(), RemoteSyncError>>;
}

/// Remote store reached over HTTP.
///
/// Documents are posted as JSON to
/// `{server_url}/v1/collections/{collection}/documents`.
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: reqwest::Client,
    server_url: String,
    api_key: Option<String>,
    collection: String,
}

impl HttpRemoteStore {
    pub fn new(
        server_url: impl Into<String>,
        api_key: Option<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            server_url: server_url.into(),
            api_key,
            collection: collection.into(),
        }
    }

    /// Builds the document insert URL, defaulting to http when no scheme is given.
    fn documents_url(&self) -> String {
        let base = self.server_url.trim_end_matches('/');
        let base = if base.starts_with("http://") || base.starts_with("https://") {
            base.to_string()
        } else {
            format!("http://{}", base)
        };

        format!("{}/v1/collections/{}/documents", base, self.collection)
    }

    async fn post(&self, request: &RemoteSyncRequest) -> Result<(), RemoteSyncError> {
        let mut builder = self.client.post(self.documents_url()).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        Err(RemoteSyncError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

impl RemoteStore for HttpRemoteStore {
    fn insert_document<'a>(
        &'a self,
        request: &'a RemoteSyncRequest,
    ) -> BoxFuture<'a, Result<(), RemoteSyncError>> {
        Box::pin(self.post(request))
    }
}

/// In-process remote store for tests.
#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    #[derive(Default)]
    pub(crate) struct FakeRemote {
        inserted: Mutex<Vec<RemoteSyncRequest>>,
        rejected: HashSet<HexCode>,
        delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeRemote {
        pub(crate) fn accepting() -> Self {
            Self::default()
        }

        pub(crate) fn rejecting(hex_codes: impl IntoIterator<Item = HexCode>) -> Self {
            Self {
                rejected: hex_codes.into_iter().collect(),
                ..Self::default()
            }
        }

        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub(crate) fn inserted(&self) -> Vec<RemoteSyncRequest> {
            self.inserted.lock().unwrap().clone()
        }

        pub(crate) fn insert_count(&self, hex_code: &HexCode) -> usize {
            self.inserted
                .lock()
                .unwrap()
                .iter()
                .filter(|r| &r.hex_code == hex_code)
                .count()
        }

        pub(crate) fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }
    }

    impl RemoteStore for FakeRemote {
        fn insert_document<'a>(
            &'a self,
            request: &'a RemoteSyncRequest,
        ) -> BoxFuture<'a, Result<(), RemoteSyncError>> {
            Box::pin(async move {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(now, Ordering::SeqCst);

                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                self.in_flight.fetch_sub(1, Ordering::SeqCst);

                if self.rejected.contains(&request.hex_code) {
                    return Err(RemoteSyncError::Rejected {
                        status: 403,
                        message: "permission denied".to_string(),
                    });
                }

                self.inserted.lock().unwrap().push(request.clone());
                Ok(())
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(url: &str) -> HttpRemoteStore {
        HttpRemoteStore::new(url, Some("test-key".to_string()), "colors")
    }

    #[test]
    fn test_documents_url_with_http() {
        assert_eq!(
            store("http://localhost:8080").documents_url(),
            "http://localhost:8080/v1/collections/colors/documents"
        );
    }

    #[test]
    fn test_documents_url_with_https_and_trailing_slash() {
        assert_eq!(
            store("https://sync.example.com/").documents_url(),
            "https://sync.example.com/v1/collections/colors/documents"
        );
    }

    #[test]
    fn test_documents_url_bare_host() {
        assert_eq!(
            store("localhost:8080").documents_url(),
            "http://localhost:8080/v1/collections/colors/documents"
        );
    }

    #[test]
    fn test_request_payload_keys() {
        let record = ColorRecord::new(HexCode::from_rgb(0x00FF00));
        let request = RemoteSyncRequest::from_record(&record, "device-1");

        let json = serde_json::to_value(&request).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert_eq!(obj["hexCode"], "#00FF00");
        assert_eq!(obj["syncAttemptID"], "device-1");
        assert!(obj["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        // Port 9 (discard) on localhost is closed on any sane test host.
        let remote = store("http://127.0.0.1:9");
        let record = ColorRecord::new(HexCode::from_rgb(1));
        let request = RemoteSyncRequest::from_record(&record, "device-1");

        assert!(remote.insert_document(&request).await.is_err());
    }
}
