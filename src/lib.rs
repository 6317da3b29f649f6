//! `pg_schema_sync`: a declarative schema-control plane for PostgreSQL.
//!
//! Parse desired DDL (§4.2), introspect the live catalog (§4.3), diff the
//! two (§4.4), plan a lock-annotated migration (§4.5), classify its safety
//! (§4.6), and execute it against a rehearsal shadow database before the
//! primary (§4.7). The crate is a library; `pgsync` is a thin binary that
//! wires these components together end to end.

pub mod config;
pub mod desired_schema;
pub mod diagnostics;
pub mod differ;
pub mod executor;
pub mod introspect;
pub mod parser;
pub mod plan;
pub mod planner;
pub mod safety;
pub mod schema;

pub use diagnostics::Diagnostic;
pub use executor::{ApplyError, ExecutorError, RehearsalError};
pub use parser::ParseOutcome;
pub use plan::{LockMode, Plan, PlanStep, SafetyClass};
pub use planner::PlanGenerationError;
pub use schema::{Schema, SchemaDiff};

/// §6's exit-code table, as a value instead of a process exit. The core
/// never calls `std::process::exit`; `pgsync` (or any other caller) maps
/// this onto its own exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreOutcome {
    Success,
    ValidationOrParseError,
    PlanGenerationFailed,
    RehearsalFailed,
    PrimaryApplyFailed,
}

impl CoreOutcome {
    /// §6: 0 success, 1 validation/parse error, 2 plan generation failed,
    /// 3 rehearsal failed, 4 primary apply failed.
    pub fn exit_code(self) -> i32 {
        match self {
            CoreOutcome::Success => 0,
            CoreOutcome::ValidationOrParseError => 1,
            CoreOutcome::PlanGenerationFailed => 2,
            CoreOutcome::RehearsalFailed => 3,
            CoreOutcome::PrimaryApplyFailed => 4,
        }
    }

    pub fn from_parse_outcome(outcome: &ParseOutcome) -> Option<Self> {
        outcome.has_errors().then_some(CoreOutcome::ValidationOrParseError)
    }
}

impl From<&PlanGenerationError> for CoreOutcome {
    fn from(_: &PlanGenerationError) -> Self {
        CoreOutcome::PlanGenerationFailed
    }
}

impl From<&RehearsalError> for CoreOutcome {
    fn from(_: &RehearsalError) -> Self {
        CoreOutcome::RehearsalFailed
    }
}

impl From<&ExecutorError> for CoreOutcome {
    fn from(err: &ExecutorError) -> Self {
        match err {
            ExecutorError::HashMismatch(_) => CoreOutcome::ValidationOrParseError,
            ExecutorError::Rehearsal(_) => CoreOutcome::RehearsalFailed,
            ExecutorError::Apply(_) => CoreOutcome::PrimaryApplyFailed,
        }
    }
}
