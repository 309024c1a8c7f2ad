pub mod certificate;
pub mod config;
pub mod error;
pub mod health;
pub mod ledger;
pub mod matching;
pub mod registry;
pub mod schedule;
pub mod shuffle;
#[cfg(feature = "distributed")]
pub mod telemetry;
pub mod worker;

pub use certificate::*;
pub use config::{ClaimConfig, RegistrySource};
pub use error::*;
pub use health::{HealthCache, HealthStatus};
pub use ledger::{InMemoryLedger, LedgerClient};
pub use matching::{ClaimMatchingEngine, MatchReport};
pub use registry::{InMemorySubjectRegistry, SubjectRegistry};
pub use worker::{ClaimWorker, PassReport, Shutdown, WorkerState};
