//! Step-execution core shared by `apply` and `rehearse`: groups consecutive
//! steps by `transactional`-ness and runs each group appropriately (§4.7
//! EXPANSION "Non-transactional step carve-out").

use sqlx::{Connection, PgConnection};
use tracing::{debug, info_span, warn, Instrument};

use crate::plan::{PlanStep, StepState};

use super::{ApplyError, StepFailure};

/// Runs every step in plan order. Transactional runs (the common case) are
/// wrapped in one transaction per contiguous run; non-transactional runs
/// (steps whose SQL needs `CONCURRENTLY`) execute directly on the
/// connection, statement by statement, with no surrounding transaction.
///
/// On failure inside a transactional run, the transaction is rolled back; a
/// rollback failure is folded into [`ApplyError::RollbackFailed`] rather
/// than silently dropped, per the error-handling design's `#[source]` chain.
pub async fn run_grouped(conn: &mut PgConnection, steps: &[PlanStep], success: StepState, failure: StepState) -> Result<Vec<PlanStep>, ApplyError> {
    let mut out = Vec::with_capacity(steps.len());

    for (offset, end) in group_boundaries(steps) {
        let group = &steps[offset..end];
        if group[0].transactional {
            run_transactional_group(conn, group, offset, success, failure, &mut out).await?;
        } else {
            run_nontransactional_group(conn, group, offset, success, failure, &mut out).await?;
        }
    }

    Ok(out)
}

/// Splits `steps` into contiguous `(start, end)` runs sharing the same
/// `transactional` flag, preserving order.
fn group_boundaries(steps: &[PlanStep]) -> Vec<(usize, usize)> {
    let mut boundaries = Vec::new();
    let mut offset = 0;
    while offset < steps.len() {
        let transactional = steps[offset].transactional;
        let end = steps[offset..].iter().take_while(|s| s.transactional == transactional).count() + offset;
        boundaries.push((offset, end));
        offset = end;
    }
    boundaries
}

async fn run_transactional_group(
    conn: &mut PgConnection,
    group: &[PlanStep],
    base_index: usize,
    success: StepState,
    failure: StepState,
    out: &mut Vec<PlanStep>,
) -> Result<(), ApplyError> {
    let mut tx = conn.begin().await.map_err(|source| {
        ApplyError::Step(StepFailure {
            step_index: base_index,
            description: "BEGIN".to_string(),
            source,
        })
    })?;

    for (i, step) in group.iter().enumerate() {
        let step_index = base_index + i;
        let span = info_span!("executor.step", step_index, description = %step.description);
        let result = async {
            for stmt in &step.sql {
                debug!(sql = %stmt, "executing statement");
                sqlx::query(stmt).execute(&mut *tx).await?;
            }
            Ok::<(), sqlx::Error>(())
        }
        .instrument(span)
        .await;

        if let Err(source) = result {
            warn!(step_index, "step failed, rolling back transaction");
            if let Err(rollback_source) = tx.rollback().await {
                return Err(ApplyError::RollbackFailed {
                    step_index,
                    description: step.description.clone(),
                    source,
                    rollback_source,
                });
            }
            out.push(super::mark(step, failure));
            return Err(ApplyError::Step(StepFailure { step_index, description: step.description.clone(), source }));
        }

        out.push(super::mark(step, success));
    }

    tx.commit().await.map_err(|source| {
        ApplyError::Step(StepFailure {
            step_index: base_index + group.len().saturating_sub(1),
            description: "COMMIT".to_string(),
            source,
        })
    })?;

    Ok(())
}

async fn run_nontransactional_group(
    conn: &mut PgConnection,
    group: &[PlanStep],
    base_index: usize,
    success: StepState,
    failure: StepState,
    out: &mut Vec<PlanStep>,
) -> Result<(), ApplyError> {
    for (i, step) in group.iter().enumerate() {
        let step_index = base_index + i;
        let span = info_span!("executor.step", step_index, description = %step.description, transactional = false);
        let result = async {
            for stmt in &step.sql {
                debug!(sql = %stmt, "executing non-transactional statement");
                sqlx::query(stmt).execute(&mut *conn).await?;
            }
            Ok::<(), sqlx::Error>(())
        }
        .instrument(span)
        .await;

        match result {
            Ok(()) => out.push(super::mark(step, success)),
            Err(source) => {
                warn!(step_index, "non-transactional step failed; already-committed transactional steps are not rolled back");
                out.push(super::mark(step, failure));
                return Err(ApplyError::Step(StepFailure { step_index, description: step.description.clone(), source }));
            }
        }
    }

    Ok(())
}
