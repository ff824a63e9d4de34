//! Related-Paper Discovery Orchestrator
//!
//! Fans a source paper out to a set of bibliographic provider adapters
//! (citation graph, semantic similarity, trend/co-reading signals), merges
//! and deduplicates their results, scores them on a unified relevance scale,
//! and returns a single diversified, cached list of related papers.
//!
//! # Example
//!
//! ```rust,ignore
//! use discovery_orchestrator::config::DiscoveryConfiguration;
//! use discovery_orchestrator::orchestrator::{Orchestrator, OrchestratorSettings};
//! use discovery_orchestrator::types::SourcePaper;
//!
//! let orchestrator = Orchestrator::new(OrchestratorSettings::from_env())
//!     .with_client(citation_client)
//!     .with_client(semantic_client)
//!     .with_client(trend_client);
//!
//! let result = orchestrator
//!     .discover(source_paper, DiscoveryConfiguration::standard())
//!     .await?;
//! ```

pub mod cache;
pub mod config;
pub mod diversity;
pub mod error;
pub mod feedback;
pub mod orchestrator;
pub mod processor;
pub mod retry;
pub mod sources;
pub mod telemetry;
pub mod types;

pub use config::{DiscoveryConfiguration, DiscoveryMode, DiversityLevel};
pub use error::{CacheError, DiscoveryError, SourceErrorKind};
pub use orchestrator::{Orchestrator, OrchestratorSettings, SourceMetrics};
pub use types::{DiscoveredPaper, DiscoverySource, SourcePaper, UnifiedDiscoveryResult};
