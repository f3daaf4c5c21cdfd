//! Collaborator contracts consumed by the import pipeline.
//!
//! The transport, the card parser, and the credential store are implemented
//! elsewhere (or mocked in tests); the pipeline depends on them only through
//! these traits. Failures cross the boundary as plain `anyhow` errors and
//! are classified by the orchestrator.

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;

use crate::freshness::FreshnessStamp;
use crate::models::{RawRecord, Source};

/// Byte-level download progress callback: `(bytes_read, total_expected)`.
/// The total is `None` when the server does not announce a length.
pub type DownloadProgress<'a> = &'a (dyn Fn(u64, Option<u64>) + Send + Sync);

/// Fetches remote contact-card files.
///
/// The freshness check and the download are the only suspension points in
/// the whole pipeline; per-request timeouts are the transport's
/// responsibility and surface as download failures.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Metadata-only fetch returning the file's current freshness stamp, or
    /// `None` when the server reports no usable validator.
    async fn check_freshness(&self, source: &Source) -> Result<Option<FreshnessStamp>>;

    /// Download the source's card file to a local path, reporting byte
    /// progress along the way. Fails on non-success status or network
    /// failure.
    async fn download(&self, source: &Source, on_progress: DownloadProgress<'_>)
        -> Result<PathBuf>;
}

/// Parses a downloaded card file into raw records.
pub trait CardParser: Send + Sync {
    /// Fails when the file is malformed or contains zero records.
    fn parse(&self, path: &Path) -> Result<Vec<RawRecord>>;
}

/// Username/password pair resolved from the credential store.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Opaque credential lookup by source id.
///
/// Looked-up credentials are merged into the connection descriptor right
/// before use; reconciliation itself never sees them.
pub trait CredentialStore: Send + Sync {
    fn lookup(&self, source_id: &str) -> Option<Credentials>;
}

/// A credential store with nothing in it.
pub struct NoCredentials;

impl CredentialStore for NoCredentials {
    fn lookup(&self, _source_id: &str) -> Option<Credentials> {
        None
    }
}
