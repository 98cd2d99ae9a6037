//! GPU context initialization and management.

use std::sync::Arc;
use wgpu::{Adapter, Device, Instance, Queue};

use crate::memory::MemoryTypeTable;

/// Errors that can occur during GPU context setup.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("No GPU adapter found")]
    NoAdapter,
    #[error("No compute-capable GPU adapter found")]
    NoComputeQueue,
    #[error("Failed to request device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
    #[error("Device wait failed: {0}")]
    DeviceWait(String),
}

/// GPU context holding device and queue for compute work.
///
/// An explicit owned object rather than process-wide globals, so several
/// independent contexts can coexist in one process. Resources are released
/// by drop in reverse creation order.
pub struct GpuContext {
    pub instance: Instance,
    pub adapter: Arc<Adapter>,
    pub device: Arc<Device>,
    pub queue: Arc<Queue>,
    memory_types: MemoryTypeTable,
}

impl GpuContext {
    /// Create a new headless compute context.
    ///
    /// Adapter selection is a linear scan: the first adapter that supports
    /// compute shaders wins, ties broken by lowest index. Deterministic
    /// across runs on the same machine.
    ///
    /// When `debug` is set, instance validation is enabled and driver
    /// messages are forwarded through `log` to stderr. This is strictly
    /// observational.
    pub async fn new(debug: bool) -> Result<Self, GpuError> {
        let flags = if debug {
            wgpu::InstanceFlags::DEBUG | wgpu::InstanceFlags::VALIDATION
        } else {
            wgpu::InstanceFlags::empty()
        };

        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::VULKAN | wgpu::Backends::METAL | wgpu::Backends::GL,
            flags,
            ..Default::default()
        });

        let adapters = instance.enumerate_adapters(wgpu::Backends::all()).await;
        if adapters.is_empty() {
            return Err(GpuError::NoAdapter);
        }

        let adapter = adapters
            .into_iter()
            .find(|a| {
                a.get_downlevel_capabilities()
                    .flags
                    .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
            })
            .ok_or(GpuError::NoComputeQueue)?;

        // Request double-precision shader support when the adapter has it.
        let mut features = wgpu::Features::empty();
        if adapter.features().contains(wgpu::Features::SHADER_F64) {
            features |= wgpu::Features::SHADER_F64;
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("gpu-fft-driver"),
                required_features: features,
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        log::info!(
            "using adapter '{}' ({:?})",
            adapter.get_info().name,
            adapter.get_info().backend
        );

        Ok(Self {
            instance,
            adapter: Arc::new(adapter),
            device: Arc::new(device),
            queue: Arc::new(queue),
            memory_types: MemoryTypeTable::standard(),
        })
    }

    /// Create a context with validation tied to the build profile:
    /// debug builds get driver validation, release builds do not.
    pub async fn headless() -> Result<Self, GpuError> {
        Self::new(cfg!(debug_assertions)).await
    }

    /// Get info about the GPU adapter.
    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// The memory-type table consulted by buffer allocation.
    pub fn memory_types(&self) -> &MemoryTypeTable {
        &self.memory_types
    }

    /// Block the calling thread until all submitted device work completes.
    ///
    /// This is the fence analog: every transfer and batched submission
    /// waits on it before returning, so there is never more than one
    /// submission in flight per context.
    pub fn wait_idle(&self) -> Result<(), GpuError> {
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map(|_| ())
            .map_err(|e| GpuError::DeviceWait(format!("{:?}", e)))
    }
}
