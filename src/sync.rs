use crate::config::SyncConfig;
use crate::model::ScheduleBook;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("sync endpoint is not configured")]
    NotConfigured,
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid document: {0}")]
    Document(#[from] serde_json::Error),
    #[error("remote store rejected the save (status {0:?})")]
    Rejected(Option<String>),
}

/// Remote store holding the whole document. Every push replaces it.
pub trait SyncGateway: Send + Sync {
    fn pull(&self) -> Result<ScheduleBook, SyncError>;
    fn push(&self, book: &ScheduleBook) -> Result<(), SyncError>;
}

#[derive(Debug, Deserialize)]
struct SaveReply {
    status: Option<String>,
}

pub struct HttpSyncGateway {
    client: reqwest::blocking::Client,
    url: Option<String>,
}

impl HttpSyncGateway {
    pub fn new(cfg: &SyncConfig) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(HttpSyncGateway {
            client,
            url: cfg.endpoint_url.clone(),
        })
    }

    fn url(&self) -> Result<&str, SyncError> {
        self.url.as_deref().ok_or(SyncError::NotConfigured)
    }
}

impl SyncGateway for HttpSyncGateway {
    fn pull(&self) -> Result<ScheduleBook, SyncError> {
        let text = self
            .client
            .get(self.url()?)
            .send()?
            .error_for_status()?
            .text()?;
        Ok(serde_json::from_str(&text)?)
    }

    fn push(&self, book: &ScheduleBook) -> Result<(), SyncError> {
        // Spreadsheet script endpoints read the raw body; plain text keeps
        // them from treating the request as a form post.
        let body = serde_json::to_string(book)?;
        let text = self
            .client
            .post(self.url()?)
            .header(CONTENT_TYPE, "text/plain;charset=utf-8")
            .body(body)
            .send()?
            .text()?;
        let reply: SaveReply = serde_json::from_str(&text)?;
        if reply.status.as_deref() == Some("success") {
            Ok(())
        } else {
            Err(SyncError::Rejected(reply.status))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DataSource {
    Remote,
    Seed,
    Bundle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushOutcome {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub finished_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub syncing: bool,
    pub completed_pushes: u64,
    pub last_push: Option<PushOutcome>,
}

#[derive(Default)]
struct PushTracker {
    in_flight: AtomicUsize,
    completed: AtomicU64,
    last: Mutex<Option<PushOutcome>>,
}

/// Fans document pushes out to background threads. Pushes are not
/// serialized; the remote keeps whichever lands last.
pub struct SyncDispatcher {
    gateway: Arc<dyn SyncGateway>,
    tracker: Arc<PushTracker>,
}

impl SyncDispatcher {
    pub fn new(gateway: Arc<dyn SyncGateway>) -> Self {
        SyncDispatcher {
            gateway,
            tracker: Arc::new(PushTracker::default()),
        }
    }

    /// Swaps the gateway; pushes already in flight finish on the old one.
    pub fn set_gateway(&mut self, gateway: Arc<dyn SyncGateway>) {
        self.gateway = gateway;
    }

    /// Pulls the remote document, falling back to the seed dataset.
    pub fn load(&self) -> (ScheduleBook, DataSource) {
        match self.gateway.pull() {
            Ok(book) => {
                tracing::info!(
                    students = book.students.len(),
                    class_times = book.class_times.len(),
                    "loaded remote document"
                );
                (book, DataSource::Remote)
            }
            Err(SyncError::NotConfigured) => {
                tracing::info!("no sync endpoint configured, using seed data");
                (ScheduleBook::seed(), DataSource::Seed)
            }
            Err(e) => {
                tracing::warn!(error = %e, "remote load failed, using seed data");
                (ScheduleBook::seed(), DataSource::Seed)
            }
        }
    }

    pub fn push(&self, snapshot: ScheduleBook) -> JoinHandle<()> {
        let gateway = Arc::clone(&self.gateway);
        let tracker = Arc::clone(&self.tracker);
        tracker.in_flight.fetch_add(1, Ordering::SeqCst);
        std::thread::spawn(move || {
            let res = gateway.push(&snapshot);
            let outcome = match res {
                Ok(()) => {
                    tracing::info!(students = snapshot.students.len(), "document saved");
                    PushOutcome {
                        ok: true,
                        error: None,
                        finished_at: now_rfc3339(),
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "document save failed");
                    PushOutcome {
                        ok: false,
                        error: Some(e.to_string()),
                        finished_at: now_rfc3339(),
                    }
                }
            };
            *tracker.last.lock().unwrap_or_else(|p| p.into_inner()) = Some(outcome);
            tracker.completed.fetch_add(1, Ordering::SeqCst);
            tracker.in_flight.fetch_sub(1, Ordering::SeqCst);
        })
    }

    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            syncing: self.tracker.in_flight.load(Ordering::SeqCst) > 0,
            completed_pushes: self.tracker.completed.load(Ordering::SeqCst),
            last_push: self
                .tracker
                .last
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .clone(),
        }
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    struct Recorder {
        pulled: Option<ScheduleBook>,
        pushes: Mutex<Vec<ScheduleBook>>,
        fail_push: bool,
    }

    impl SyncGateway for Recorder {
        fn pull(&self) -> Result<ScheduleBook, SyncError> {
            self.pulled.clone().ok_or(SyncError::Rejected(None))
        }

        fn push(&self, book: &ScheduleBook) -> Result<(), SyncError> {
            self.pushes.lock().expect("lock").push(book.clone());
            if self.fail_push {
                Err(SyncError::Rejected(Some("error".into())))
            } else {
                Ok(())
            }
        }
    }

    fn recorder(pulled: Option<ScheduleBook>, fail_push: bool) -> Arc<Recorder> {
        Arc::new(Recorder {
            pulled,
            pushes: Mutex::new(Vec::new()),
            fail_push,
        })
    }

    #[test]
    fn load_falls_back_to_seed_on_failure() {
        let d = SyncDispatcher::new(recorder(None, false));
        let (book, source) = d.load();
        assert_eq!(source, DataSource::Seed);
        assert_eq!(book, ScheduleBook::seed());

        let remote = ScheduleBook {
            students: vec![],
            class_times: vec!["9:00".into()],
        };
        let d = SyncDispatcher::new(recorder(Some(remote.clone()), false));
        assert_eq!(d.load(), (remote, DataSource::Remote));
    }

    #[test]
    fn unconfigured_http_gateway_reports_not_configured() {
        let gw = HttpSyncGateway::new(&SyncConfig::default()).expect("client");
        assert!(matches!(gw.pull(), Err(SyncError::NotConfigured)));
        assert!(matches!(
            gw.push(&ScheduleBook::seed()),
            Err(SyncError::NotConfigured)
        ));
    }

    #[test]
    fn pushes_send_full_snapshots_and_track_outcome() {
        let rec = recorder(None, false);
        let d = SyncDispatcher::new(rec.clone());
        let mut book = ScheduleBook::seed();
        let first = d.push(book.clone());
        book.class_times.push("6:30".into());
        let second = d.push(book.clone());
        first.join().expect("join");
        second.join().expect("join");

        let status = d.status();
        assert!(!status.syncing);
        assert_eq!(status.completed_pushes, 2);
        assert!(status.last_push.map(|p| p.ok).unwrap_or(false));
        let pushes = rec.pushes.lock().expect("lock");
        assert_eq!(pushes.len(), 2);
        assert!(pushes.iter().any(|b| b.class_times.len() == 5));
    }

    #[test]
    fn failed_push_is_recorded_without_panicking() {
        let d = SyncDispatcher::new(recorder(None, true));
        d.push(ScheduleBook::seed()).join().expect("join");
        let last = d.status().last_push.expect("outcome");
        assert!(!last.ok);
        assert!(last.error.unwrap_or_default().contains("rejected"));
    }

    #[test]
    fn syncing_flag_is_set_while_a_push_is_in_flight() {
        struct Gate(Mutex<mpsc::Receiver<()>>);
        impl SyncGateway for Gate {
            fn pull(&self) -> Result<ScheduleBook, SyncError> {
                Err(SyncError::NotConfigured)
            }
            fn push(&self, _book: &ScheduleBook) -> Result<(), SyncError> {
                let _ = self.0.lock().expect("lock").recv();
                Ok(())
            }
        }
        let (tx, rx) = mpsc::channel();
        let d = SyncDispatcher::new(Arc::new(Gate(Mutex::new(rx))));
        let handle = d.push(ScheduleBook::default());
        assert!(d.status().syncing);
        tx.send(()).expect("release");
        handle.join().expect("join");
        assert!(!d.status().syncing);
    }
}
