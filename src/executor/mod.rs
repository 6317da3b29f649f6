//! Executor (§4.7): applies a [`Plan`] transactionally, rehearses it on a
//! shadow connection first, and re-verifies `source_hash` before the primary
//! apply. Sequential, single-connection; see §5 for the concurrency model.

mod run;

pub use crate::introspect::{connect_and_ping, ConnectError};

use sqlx::PgConnection;
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};

use crate::plan::{Plan, PlanStep, StepState};
use crate::schema::{canonical_hash, Schema};

#[derive(Debug, Error)]
pub enum HashMismatchError {
    #[error("plan.source_hash {expected} does not match the current desired schema's hash {actual}")]
    Mismatch { expected: String, actual: String },
}

#[derive(Debug, Error)]
#[error("step {step_index} ({description}) failed: {source}")]
pub struct StepFailure {
    pub step_index: usize,
    pub description: String,
    #[source]
    pub source: sqlx::Error,
}

/// Rehearsal runs the identical execution mechanics as `apply` (§4.7
/// "behaves identically against a shadow database"), so it shares
/// [`ApplyError`]'s failure shapes rather than duplicating them.
#[derive(Debug, Error)]
pub enum RehearsalError {
    #[error(transparent)]
    Apply(#[from] ApplyError),
}

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Step(#[from] StepFailure),
    #[error("step {step_index} ({description}) failed and rollback also failed: {source}; rollback error: {rollback_source}")]
    RollbackFailed {
        step_index: usize,
        description: String,
        #[source]
        source: sqlx::Error,
        rollback_source: sqlx::Error,
    },
}

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    HashMismatch(#[from] HashMismatchError),
    #[error("rehearsal failed: {0}")]
    Rehearsal(#[from] RehearsalError),
    #[error("apply failed: {0}")]
    Apply(#[from] ApplyError),
}

/// Recomputes the desired Schema's canonical hash and compares it to
/// `plan.source_hash`. A mismatch means the on-disk desired schema has
/// changed since the plan was generated (§4.7, §3 Plan invariant).
pub fn verify_source_hash(plan: &Plan, desired: &Schema) -> Result<(), HashMismatchError> {
    let actual = canonical_hash(desired);
    if plan.source_hash == actual {
        Ok(())
    } else {
        Err(HashMismatchError::Mismatch { expected: plan.source_hash.clone(), actual })
    }
}

/// `apply(conn, plan)` (§4.7): runs all steps, transactional ones grouped
/// into transactions, non-transactional ones (`CONCURRENTLY` rewrites) run
/// outside any transaction on the same connection, all in plan order.
/// Returns a copy of the plan with each step's `state` updated to reflect
/// what actually happened.
pub async fn apply(conn: &mut PgConnection, plan: &Plan) -> Result<Plan, ApplyError> {
    let span = info_span!("executor.apply", step_count = plan.steps.len());
    async move {
        let steps = run::run_grouped(conn, &plan.steps, StepState::Committed, StepState::Aborted).await?;
        info!("apply completed");
        Ok(Plan::new(plan.source_hash.clone(), steps))
    }
    .instrument(span)
    .await
}

/// `rehearse(shadow_conn, plan)` (§4.7): identical execution against a
/// caller-supplied shadow connection. Mandatory before primary apply unless
/// the caller explicitly disables it.
pub async fn rehearse(shadow_conn: &mut PgConnection, plan: &Plan) -> Result<Plan, RehearsalError> {
    let span = info_span!("executor.rehearse", step_count = plan.steps.len());
    async move {
        match run::run_grouped(shadow_conn, &plan.steps, StepState::Rehearsed, StepState::RehearseFailed).await {
            Ok(steps) => {
                info!("rehearsal succeeded");
                Ok(Plan::new(plan.source_hash.clone(), steps))
            }
            Err(err) => {
                warn!("rehearsal failed");
                Err(RehearsalError::from(err))
            }
        }
    }
    .instrument(span)
    .await
}

#[derive(Debug, Default)]
pub struct ExecuteOptions {
    pub skip_rehearsal: bool,
}

/// Full primary-use-case flow (§2): verify hash, rehearse on shadow unless
/// disabled, then apply to primary.
pub async fn execute(
    primary_conn: &mut PgConnection,
    shadow_conn: Option<&mut PgConnection>,
    plan: &Plan,
    desired: &Schema,
    options: ExecuteOptions,
) -> Result<Plan, ExecutorError> {
    verify_source_hash(plan, desired)?;

    if !options.skip_rehearsal {
        let shadow = shadow_conn.expect("rehearsal is mandatory unless explicitly disabled");
        rehearse(shadow, plan).await?;
    }

    Ok(apply(primary_conn, plan).await?)
}

/// `reverse` entry point re-exported at the crate root for convenience; the
/// Executor runs the reversed plan under the same rules as a forward apply.
pub async fn apply_reverse(conn: &mut PgConnection, plan: &Plan, pre_migration_schema: &Schema) -> Result<Plan, ApplyError> {
    let reversed = crate::planner::reverse(plan, pre_migration_schema);
    apply(conn, &reversed).await
}

pub(crate) fn mark(step: &PlanStep, state: StepState) -> PlanStep {
    let mut s = step.clone();
    s.state = state;
    s
}
