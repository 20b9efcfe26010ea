//! # Transform Orchestrator - Pipeline Coordination Service
//!
//! ## Purpose
//!
//! Runs provider adapters as one pipeline: registry, concurrent
//! initialization, retry with exponential backoff, result validation,
//! batch and stream execution, result forwarding and bounded shutdown.
//!
//! ## Integration Points
//!
//! - **Input**: [`DiscoverySource`] producers or caller-supplied payloads
//! - **Adapters**: any [`adapter_service::TransformAdapter`], registered by name
//! - **Output**: returned [`types::TransformationResult`]s plus an optional [`ResultSink`]
//! - **Events**: [`OrchestratorEvent`] broadcast, see [`TransformationOrchestrator::subscribe`]
//! - **Caching**: [`CachingDiscovery`] in front of a discovery producer
//! - **Configuration**: [`PipelineConfig`] from TOML plus `PIPELINE__*` overrides
//!
//! ## Data Flow
//!
//! ```text
//! DiscoverySource ──► CachingDiscovery ──► transform(provider, payload)
//!                                              │
//!                        retry/backoff ◄──────┤
//!                                              ▼
//!                                   adapter.transform ──► validate_result
//!                                                              │
//!                                          ResultSink ◄────────┤
//!                                                              ▼
//!                                                   TransformationResult
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use transform_orchestrator::{OrchestratorConfig, TransformationOrchestrator};
//!
//! let orchestrator = TransformationOrchestrator::new(OrchestratorConfig::default())?;
//! orchestrator.register_builtin("kafka")?;
//! orchestrator.initialize().await?;
//!
//! let result = orchestrator.transform("kafka", &payload).await?;
//! let report = orchestrator.shutdown().await;
//! assert_eq!(report.remaining_transformations, 0);
//! ```

#![warn(clippy::all)]

pub mod batch;
pub mod config;
pub mod discovery;
pub mod error;
pub mod events;
pub mod logging;
pub mod orchestrator;
pub mod sink;

pub use batch::{BatchFailure, BatchItem, BatchResult, BatchSuccess, StreamSummary};
pub use config::{LogFormat, LoggingConfig, OrchestratorConfig, PipelineConfig};
pub use discovery::{CachingDiscovery, DiscoverySource};
pub use error::{OrchestratorError, Result};
pub use events::OrchestratorEvent;
pub use logging::init_logging;
pub use orchestrator::{
    OrchestratorHealth, ProviderHealth, ShutdownReport, TransformStats, TransformationOrchestrator,
};
pub use sink::{ChannelSink, ResultSink};
