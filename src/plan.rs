//! Plan value types (§3 "Plan" / "PlanStep").
//!
//! A `Plan` is immutable once returned by the Planner; executing its steps
//! in order against the state that produced `source_hash` must yield a
//! Schema equal to the desired Schema (§3 invariant). The `source_hash` is
//! recomputed on load and a mismatch is a hard error (§4.7).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LockMode {
    AccessShare,
    RowShare,
    RowExclusive,
    ShareUpdateExclusive,
    Share,
    ShareRowExclusive,
    Exclusive,
    AccessExclusive,
}

impl LockMode {
    /// Reads are blocked only by the strictest lock (§4.6).
    pub fn blocks_reads(self) -> bool {
        matches!(self, LockMode::AccessExclusive)
    }

    /// Writes are blocked by `SHARE` and anything stricter than
    /// `SHARE UPDATE EXCLUSIVE` (§4.6).
    pub fn blocks_writes(self) -> bool {
        !matches!(self, LockMode::AccessShare | LockMode::RowShare | LockMode::RowExclusive | LockMode::ShareUpdateExclusive)
    }

    /// Ordering by blocking severity, used to pick the highest-impact
    /// statement's mode for a multi-statement step (§4.6).
    fn rank(self) -> u8 {
        match self {
            LockMode::AccessShare => 0,
            LockMode::RowShare => 1,
            LockMode::RowExclusive => 2,
            LockMode::ShareUpdateExclusive => 3,
            LockMode::Share => 4,
            LockMode::ShareRowExclusive => 5,
            LockMode::Exclusive => 6,
            LockMode::AccessExclusive => 7,
        }
    }

    pub fn max(self, other: LockMode) -> LockMode {
        if self.rank() >= other.rank() { self } else { other }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SafetyClass {
    Safe,
    Review,
    Lossy,
    Dangerous,
    MultiPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepState {
    Emitted,
    Analyzed,
    Rehearsed,
    RehearseFailed,
    Committed,
    Aborted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanStep {
    pub description: String,
    /// Ordered, non-empty; executed as dependent sub-statements within one
    /// step, e.g. the up-to-three statements of a column alteration.
    pub sql: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_mode: Option<LockMode>,
    #[serde(default)]
    pub blocks_reads: bool,
    #[serde(default)]
    pub blocks_writes: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_impact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety: Option<SafetyClass>,
    #[serde(default)]
    pub rewritable: bool,
    /// False for steps whose SQL cannot run inside a transaction (e.g.
    /// `CREATE INDEX CONCURRENTLY`); see SPEC_FULL's executor expansion.
    #[serde(default = "default_transactional")]
    pub transactional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_loss_warning: Option<String>,
    #[serde(default)]
    pub state: StepState,
}

impl Default for StepState {
    fn default() -> Self {
        StepState::Emitted
    }
}

fn default_transactional() -> bool {
    true
}

impl PlanStep {
    pub fn new(description: impl Into<String>, sql: Vec<String>) -> Self {
        Self {
            description: description.into(),
            sql,
            source_file: None,
            source_line: None,
            lock_mode: None,
            blocks_reads: false,
            blocks_writes: false,
            lock_impact: None,
            safety: None,
            rewritable: false,
            transactional: true,
            data_loss_warning: None,
            state: StepState::Emitted,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    /// 64 lowercase hex characters; SHA-256 of the desired Schema's
    /// canonical JSON encoding (§3).
    pub source_hash: String,
    pub steps: Vec<PlanStep>,
}

impl Plan {
    pub fn new(source_hash: String, steps: Vec<PlanStep>) -> Self {
        Self { source_hash, steps }
    }

    pub fn max_lock_mode(&self) -> Option<LockMode> {
        self.steps.iter().filter_map(|s| s.lock_mode).reduce(LockMode::max)
    }

    pub fn dangerous_or_lossy_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.safety, Some(SafetyClass::Dangerous) | Some(SafetyClass::Lossy)))
            .count()
    }
}
