//! Batch import orchestration.
//!
//! Coordinates the full flow per source: freshness check → download → parse
//! → reconcile → apply → commit. Sources are processed strictly sequentially
//! on one background task, which makes the batch the single writer into the
//! contact store and the progress tracker; no internal locking discipline is
//! needed beyond that.
//!
//! The contact-store snapshot is loaded once per batch so concurrent sources
//! cannot race each other into duplicate additions; records created while
//! the batch runs are appended to the snapshot, so later sources observe
//! earlier sources' additions.
//!
//! Callbacks are delivered through an [`ImportObserver`]. A UI-bound caller
//! uses [`ChannelObserver`] and drains the receiver on its own context; the
//! batch task never touches the caller's thread. Per-source terminal events
//! fire in submission order, and `BatchFinished` fires exactly once, after
//! every source has reached a terminal state.

use std::io::Write;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::ImportError;
use crate::freshness::FreshnessStamp;
use crate::models::{LastImportOutcome, Source};
use crate::progress::{ImportPhase, ProgressTracker};
use crate::reconcile::{reconcile, ReconcileOutcome};
use crate::store::{ContactStore, ExistingRecord};
use crate::traits::{CardParser, CredentialStore, Transport};

/// Terminal state of one source after an import pass.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    /// The remote file has not changed since the last import; nothing was
    /// fetched and no diff was performed.
    Unchanged,
    /// The file was fetched, reconciled, and applied.
    Imported {
        added: usize,
        updated: usize,
        duplicate_skips: u32,
        ambiguous_skips: u32,
    },
    /// This source failed; sibling sources are unaffected.
    Failed { message: String },
}

impl SourceStatus {
    fn from_outcome(outcome: &ReconcileOutcome) -> Self {
        SourceStatus::Imported {
            added: outcome.additions.len(),
            updated: outcome.changes.len(),
            duplicate_skips: outcome.duplicate_skips,
            ambiguous_skips: outcome.ambiguous_skips,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SourceStatus::Failed { .. })
    }

    /// Human-readable per-source message. Skip counts appear only when
    /// non-zero.
    pub fn message(&self) -> String {
        match self {
            SourceStatus::Unchanged => "unchanged since last import".to_string(),
            SourceStatus::Imported {
                added,
                updated,
                duplicate_skips,
                ambiguous_skips,
            } => {
                let mut parts = vec![format!("{added} added"), format!("{updated} updated")];
                if *duplicate_skips > 0 {
                    parts.push(format!("{duplicate_skips} duplicates in file skipped"));
                }
                if *ambiguous_skips > 0 {
                    parts.push(format!("{ambiguous_skips} ambiguous matches skipped"));
                }
                parts.join(", ")
            }
            SourceStatus::Failed { message } => message.clone(),
        }
    }
}

/// Progress and lifecycle events emitted while a batch runs.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ImportEvent {
    SourceStarted {
        source_id: String,
        name: String,
    },
    /// Overall batch completion ratio in `[0, 1]`, monotonically
    /// non-decreasing.
    Progress {
        source_id: String,
        overall: f64,
    },
    SourceFinished {
        source_id: String,
        status: SourceStatus,
    },
    BatchFinished {
        success: bool,
    },
}

/// Receives [`ImportEvent`]s from the batch task.
pub trait ImportObserver: Send + Sync {
    fn notify(&self, event: ImportEvent);
}

/// Discards all events.
pub struct NullObserver;

impl ImportObserver for NullObserver {
    fn notify(&self, _event: ImportEvent) {}
}

/// Forwards events onto a caller-owned channel.
///
/// The receiver is drained on whatever context the caller runs; event order
/// is the channel's FIFO order, so the batch's ordering guarantees carry
/// over unchanged.
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<ImportEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ImportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ImportObserver for ChannelObserver {
    fn notify(&self, event: ImportEvent) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.tx.send(event);
    }
}

/// Machine-readable events: one JSON object per line on stderr.
pub struct JsonLineObserver;

impl ImportObserver for JsonLineObserver {
    fn notify(&self, event: ImportEvent) {
        if let Ok(line) = serde_json::to_string(&event) {
            let _ = writeln!(std::io::stderr().lock(), "{line}");
        }
    }
}

/// Outcome of one source within a finished batch.
#[derive(Debug, Clone)]
pub struct SourceReport {
    /// The source value updated with this pass's outcome and freshness
    /// stamp, ready to be persisted by the configuration layer.
    pub source: Source,
    pub status: SourceStatus,
}

/// Outcome of a whole batch.
#[derive(Debug)]
pub struct BatchReport {
    /// One report per enabled source, in submission order.
    pub sources: Vec<SourceReport>,
    /// False when any source ended in an error.
    pub success: bool,
}

/// Run a batch import over the given sources, sequentially.
///
/// Disabled sources are filtered out up front. Every per-source failure is
/// caught here and turned into that source's terminal outcome; the only
/// error this function itself returns is [`ImportError::StoreUnavailable`],
/// when the contact store cannot be read at all.
pub async fn run_batch(
    sources: Vec<Source>,
    transport: &dyn Transport,
    parser: &dyn CardParser,
    store: &dyn ContactStore,
    credentials: &dyn CredentialStore,
    observer: &dyn ImportObserver,
) -> Result<BatchReport, ImportError> {
    let sources: Vec<Source> = sources.into_iter().filter(|s| s.enabled).collect();

    let mut snapshot = store.load_all().map_err(ImportError::StoreUnavailable)?;
    debug!(
        sources = sources.len(),
        existing = snapshot.len(),
        "starting batch import"
    );

    let tracker = Mutex::new(ProgressTracker::new(sources.len()));
    let mut reports = Vec::with_capacity(sources.len());
    let mut success = true;

    for source in sources {
        observer.notify(ImportEvent::SourceStarted {
            source_id: source.id().to_string(),
            name: source.name.clone(),
        });

        let effective = with_credentials(&source, credentials);
        let result = import_source(
            &effective,
            transport,
            parser,
            store,
            &mut snapshot,
            &tracker,
            observer,
        )
        .await;

        // A terminal source always fills its progress share, so the overall
        // ratio reaches 1.0 exactly when the batch does.
        let overall = tracker.lock().unwrap().complete(source.id());
        observer.notify(ImportEvent::Progress {
            source_id: source.id().to_string(),
            overall,
        });

        let (status, stamp) = match result {
            Ok(done) => done,
            Err(err) => {
                warn!(source = %source.name, error = %err, "source import failed");
                (
                    SourceStatus::Failed {
                        message: err.to_string(),
                    },
                    source.last_stamp().cloned(),
                )
            }
        };
        if status.is_failure() {
            success = false;
        }

        let mut updated = source;
        updated.last_outcome = Some(LastImportOutcome {
            success: !status.is_failure(),
            message: status.message(),
            finished_at: Utc::now(),
            stamp,
        });

        observer.notify(ImportEvent::SourceFinished {
            source_id: updated.id().to_string(),
            status: status.clone(),
        });
        reports.push(SourceReport {
            source: updated,
            status,
        });
    }

    observer.notify(ImportEvent::BatchFinished { success });
    Ok(BatchReport {
        sources: reports,
        success,
    })
}

/// Run a batch on a dedicated background task.
///
/// The caller must not start a second batch while one is in flight; a batch
/// runs to completion once started.
pub fn spawn_batch(
    sources: Vec<Source>,
    transport: Arc<dyn Transport>,
    parser: Arc<dyn CardParser>,
    store: Arc<dyn ContactStore>,
    credentials: Arc<dyn CredentialStore>,
    observer: Arc<dyn ImportObserver>,
) -> JoinHandle<Result<BatchReport, ImportError>> {
    tokio::spawn(async move {
        run_batch(
            sources,
            transport.as_ref(),
            parser.as_ref(),
            store.as_ref(),
            credentials.as_ref(),
            observer.as_ref(),
        )
        .await
    })
}

async fn import_source(
    source: &Source,
    transport: &dyn Transport,
    parser: &dyn CardParser,
    store: &dyn ContactStore,
    snapshot: &mut Vec<ExistingRecord>,
    tracker: &Mutex<ProgressTracker>,
    observer: &dyn ImportObserver,
) -> Result<(SourceStatus, Option<FreshnessStamp>), ImportError> {
    let current = transport
        .check_freshness(source)
        .await
        .map_err(ImportError::Transport)?;

    if FreshnessStamp::is_unchanged(source.last_stamp(), current.as_ref()) {
        debug!(source = %source.name, "remote file unchanged, skipping download");
        return Ok((SourceStatus::Unchanged, current));
    }

    let source_id = source.id().to_string();
    let path = transport
        .download(source, &|read, total| {
            let ratio = match total {
                Some(total) if total > 0 => read as f64 / total as f64,
                _ => 0.0,
            };
            report_progress(tracker, observer, &source_id, ImportPhase::Download, ratio);
        })
        .await
        .map_err(ImportError::Transport)?;

    let records = parser.parse(&path).map_err(ImportError::Parse)?;

    let outcome = reconcile(snapshot, &records, source.match_nickname);
    report_progress(tracker, observer, source.id(), ImportPhase::Resolve, 1.0);

    apply(source, store, snapshot, &outcome, tracker, observer)?;

    if store.has_pending_changes() {
        store.commit().map_err(ImportError::StoreWrite)?;
    }

    // Never downgrade to "unknown": a fetch that yielded no stamp keeps the
    // previous one.
    let stamp = current.or_else(|| source.last_stamp().cloned());
    Ok((SourceStatus::from_outcome(&outcome), stamp))
}

/// Apply additions and change sets through the contact store. The first
/// rejected write aborts the remaining work for this source; fields already
/// applied stay applied.
fn apply(
    source: &Source,
    store: &dyn ContactStore,
    snapshot: &mut Vec<ExistingRecord>,
    outcome: &ReconcileOutcome,
    tracker: &Mutex<ProgressTracker>,
    observer: &dyn ImportObserver,
) -> Result<(), ImportError> {
    let total = outcome.additions.len() + outcome.changes.len();
    let mut done = 0usize;

    for record in &outcome.additions {
        let created = store.create(record).map_err(ImportError::StoreWrite)?;
        snapshot.push(created);
        done += 1;
        report_progress(
            tracker,
            observer,
            source.id(),
            ImportPhase::Apply,
            done as f64 / total as f64,
        );
    }

    for change in &outcome.changes {
        for (field, value) in &change.single_updates {
            store
                .set_single_value(&change.record_id, *field, value)
                .map_err(ImportError::StoreWrite)?;
        }
        if let Some(image) = &change.image {
            store
                .set_image(&change.record_id, image)
                .map_err(ImportError::StoreWrite)?;
        }
        for (field, values) in &change.multi_additions {
            store
                .add_multi_values(&change.record_id, *field, values)
                .map_err(ImportError::StoreWrite)?;
        }
        done += 1;
        report_progress(
            tracker,
            observer,
            source.id(),
            ImportPhase::Apply,
            done as f64 / total as f64,
        );
    }

    Ok(())
}

fn report_progress(
    tracker: &Mutex<ProgressTracker>,
    observer: &dyn ImportObserver,
    source_id: &str,
    phase: ImportPhase,
    ratio: f64,
) {
    let overall = tracker.lock().unwrap().report(source_id, phase, ratio);
    observer.notify(ImportEvent::Progress {
        source_id: source_id.to_string(),
        overall,
    });
}

/// Merge stored credentials into a copy of the source's connection
/// descriptor. The original source value, and therefore every report, never
/// carries the secret.
fn with_credentials(source: &Source, credentials: &dyn CredentialStore) -> Source {
    let mut merged = source.clone();
    if let Some(found) = credentials.lookup(source.id()) {
        merged.connection.username = Some(found.username);
        merged.connection.password = Some(found.password);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuthMethod, Connection};
    use crate::traits::Credentials;

    fn source() -> Source {
        Source::new(
            "team",
            Connection {
                url: "https://cards.example.test/team.vcf".to_string(),
                auth: AuthMethod::Basic,
                login_url: None,
                username: Some("configured".to_string()),
                password: None,
            },
        )
    }

    struct OneCredential;

    impl CredentialStore for OneCredential {
        fn lookup(&self, _source_id: &str) -> Option<Credentials> {
            Some(Credentials {
                username: "stored".to_string(),
                password: "secret".to_string(),
            })
        }
    }

    #[test]
    fn stored_credentials_override_the_descriptor() {
        let merged = with_credentials(&source(), &OneCredential);
        assert_eq!(merged.connection.username.as_deref(), Some("stored"));
        assert_eq!(merged.connection.password.as_deref(), Some("secret"));
    }

    #[test]
    fn missing_credentials_leave_the_descriptor_alone() {
        let merged = with_credentials(&source(), &crate::traits::NoCredentials);
        assert_eq!(merged.connection.username.as_deref(), Some("configured"));
        assert_eq!(merged.connection.password, None);
    }

    #[test]
    fn imported_message_hides_zero_skip_counts() {
        let status = SourceStatus::Imported {
            added: 3,
            updated: 1,
            duplicate_skips: 0,
            ambiguous_skips: 0,
        };
        assert_eq!(status.message(), "3 added, 1 updated");
    }

    #[test]
    fn imported_message_reports_non_zero_skip_counts() {
        let status = SourceStatus::Imported {
            added: 0,
            updated: 0,
            duplicate_skips: 2,
            ambiguous_skips: 4,
        };
        assert_eq!(
            status.message(),
            "0 added, 0 updated, 2 duplicates in file skipped, 4 ambiguous matches skipped"
        );
    }
}
