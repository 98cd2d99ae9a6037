//! GPU FFT Driver
//!
//! Sample harness showing how to initialize a GPU compute context with
//! wgpu and drive pre-built transform plans through it.
//!
//! # Components
//!
//! - Device context: adapter discovery, device and queue creation
//! - Buffer allocation with an explicit memory-type selection policy
//! - Host↔device transfers through short-lived staging buffers
//! - Batched submission: many plan repetitions recorded into one command
//!   sequence, submitted once, and timed
//! - Two end-to-end sample flows (round trip, convolution)
//!
//! The transform plans themselves are opaque behind [`TransformPlan`]; a
//! built-in backend ([`plan::FftApplication`]) supplies deterministic
//! sample workloads, and a real transform library can slot in the same way.

pub mod batch;
pub mod config;
pub mod context;
pub mod memory;
pub mod plan;
pub mod scenario;
pub mod transfer;

// Re-export commonly used types
pub use batch::{run_batched, run_batched_pair, BatchTiming, SubmitError, TransformPlan};
pub use config::{ConfigError, FftConfig};
pub use context::{GpuContext, GpuError};
pub use memory::{AllocError, GpuBuffer, MemoryProperties, MemoryType, MemoryTypeTable};
pub use plan::{FftApplication, PlanError};
pub use transfer::{download, upload, TransferError};
