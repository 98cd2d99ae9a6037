//! Batched submission of pre-built transform plans.
//!
//! Per-submission overhead is fixed, so one submission carrying N recorded
//! operations is timed instead of N submissions of one operation each. A
//! submission walks record → submit → wait → idle; the wait blocks the
//! calling thread until the device signals completion, with no timeout.

use std::time::{Duration, Instant};

use crate::context::{GpuContext, GpuError};

/// A pre-built, immutable execution plan that can append its operation
/// into a command sequence any number of times.
///
/// Built once from a configuration and never mutated afterwards. Alternate
/// transform backends plug into the driver through this trait.
pub trait TransformPlan {
    fn append(&self, encoder: &mut wgpu::CommandEncoder);
}

/// Errors that can occur while submitting a batch.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Batch count must be nonzero")]
    EmptyBatch,
    #[error(transparent)]
    Wait(#[from] GpuError),
}

/// Wall-clock timing for one batched submission.
#[derive(Debug, Clone, Copy)]
pub struct BatchTiming {
    pub total: Duration,
    pub batch: u32,
}

impl BatchTiming {
    /// Average time per recorded iteration.
    pub fn per_iteration(&self) -> Duration {
        self.total / self.batch
    }
}

/// Record `batch` repetitions of one plan into a single command sequence,
/// submit it once, and time from submission to completion signal.
pub fn run_batched(
    ctx: &GpuContext,
    plan: &dyn TransformPlan,
    batch: u32,
) -> Result<BatchTiming, SubmitError> {
    submit_batch(ctx, &[plan], batch)
}

/// The two-plan variant: each iteration appends the forward plan then the
/// inverse plan, in program order.
pub fn run_batched_pair(
    ctx: &GpuContext,
    forward: &dyn TransformPlan,
    inverse: &dyn TransformPlan,
    batch: u32,
) -> Result<BatchTiming, SubmitError> {
    submit_batch(ctx, &[forward, inverse], batch)
}

fn submit_batch(
    ctx: &GpuContext,
    plans: &[&dyn TransformPlan],
    batch: u32,
) -> Result<BatchTiming, SubmitError> {
    if batch == 0 {
        return Err(SubmitError::EmptyBatch);
    }

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("batch_encoder"),
        });
    for _ in 0..batch {
        for plan in plans {
            plan.append(&mut encoder);
        }
    }

    let submitted = Instant::now();
    ctx.queue.submit(Some(encoder.finish()));
    ctx.wait_idle()?;
    let total = submitted.elapsed();

    let timing = BatchTiming { total, batch };
    log::info!(
        "submit execution time per batch: {:.3} ms",
        timing.per_iteration().as_secs_f64() * 1000.0
    );

    Ok(timing)
}
