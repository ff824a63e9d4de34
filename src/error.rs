//! Error taxonomy (§7). Only [`DiscoveryError`] ever escapes the public
//! `discover()` entry point; everything else is recorded inside a
//! [`crate::types::SourceDiscoveryResult`] or logged and absorbed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can surface synchronously from [`crate::orchestrator::Orchestrator::discover`].
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Invalid configuration or out-of-range field, or an unrecognized key
    /// in a `CUSTOM` configuration. Caller-side; raised before any I/O.
    #[error("invalid discovery configuration: {0}")]
    Configuration(String),

    /// A programmer error / broken invariant inside the core. Should never
    /// happen in correct code; if it does, it is a bug, not a runtime
    /// condition callers should branch on.
    #[error("internal invariant violated: {0}")]
    InternalInvariantViolation(String),
}

/// Per-source failure classification (§7). Recorded on the owning source's
/// [`crate::types::SourceDiscoveryResult`]; never propagated to the caller.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum SourceErrorKind {
    /// The source task did not complete before the configured deadline.
    #[error("source discovery timed out")]
    Timeout,

    /// Connection, HTTP, or authentication failure after the client's own
    /// retry budget was exhausted.
    #[error("provider unavailable: {message}")]
    ProviderUnavailable { message: String },

    /// The client parsed provider output but it violated the expected
    /// schema. Does not poison the rest of the run.
    #[error("provider returned malformed response: {message}")]
    ProviderMalformedResponse { message: String },
}

/// Failures internal to the Discovery Cache (§4.5, §7). Logged and counted;
/// read errors degrade to a miss, write errors leave the in-memory tier
/// authoritative for its TTL. Never surfaced to `discover()` callers.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache read failed: {0}")]
    ReadFailed(String),

    #[error("cache write failed: {0}")]
    WriteFailed(String),
}
