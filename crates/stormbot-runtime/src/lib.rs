//! Action arbitration and safety execution.
//!
//! This crate turns untrusted advisory decisions into bounded motion. The
//! pipeline is: a producer ([`producers`]) captures a sensor snapshot, asks
//! the oracle ([`oracle`]) for a decision, the reply is repaired and clamped
//! into a strict [`stormbot_types::ActionSequence`] ([`validator`]), and the
//! sequence runs under the busy gate with hard timeouts and guaranteed motor
//! shutdown ([`executor`]). The [`obstacle::ObstacleMonitor`] watchdog can
//! preempt all of it when something gets too close.

pub mod engine;
pub mod executor;
pub mod history;
pub mod json_extract;
pub mod obstacle;
pub mod oracle;
pub mod producers;
pub mod prompt;
pub mod validator;

pub use engine::{CycleOutcome, DecisionEngine};
pub use executor::{Executor, SequenceOutcome};
pub use history::ActionHistory;
pub use obstacle::ObstacleMonitor;
pub use oracle::{DecisionOracle, GenerationSettings, OracleClient, OracleError};
