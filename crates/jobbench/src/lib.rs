//! Job-record storage benchmark.
//!
//! Generates synthetic "job" documents from a JSON template and measures how
//! long each selected data store takes to write them and to serve randomized
//! point lookups.
//!
//! # Components
//!
//! - **Fixtures**: template loading, name pools and record generation
//! - **Backends**: one adapter per store behind the [`Backend`] trait
//! - **Selection**: which backends take part in a run
//! - **Harness**: the [`Runner`] that sequences connect, write and read phases
//! - **Report**: timing samples, reporters and the run summary
//!
//! # Example
//!
//! ```no_run
//! use jobbench::{BackendKind, BackendSet, BenchConfig, ConfiguredConnector, JobGenerator, Runner, StdoutReporter};
//!
//! # async fn run() -> jobbench::Result<()> {
//! let config = BenchConfig::new(BackendSet::only(BackendKind::NativeKv)).with_record_count(100);
//! let generator = JobGenerator::from_paths("job.json", "firstnames.txt", "lastnames.txt")?;
//! let connector = ConfiguredConnector::new(config.connections.clone());
//!
//! let summary = Runner::new(config, connector)
//!     .run(&generator, &mut StdoutReporter)
//!     .await?;
//! assert!(summary.unavailable.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod harness;
pub mod model;
pub mod report;
pub mod selection;

pub use backends::{Backend, ConfiguredConnector, Connector};
pub use config::{Args, BackendsConfig, BenchConfig};
pub use error::{Error, Result};
pub use fixtures::{JobGenerator, JobRecord, NamePools, Template};
pub use harness::{RunState, Runner};
pub use model::Job;
pub use report::{
    CollectingReporter, Phase, Reporter, RunSummary, StdoutReporter, Tally, TimingSample,
};
pub use selection::{BackendKind, BackendSet};
