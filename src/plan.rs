//! Built-in transform backend.
//!
//! A stand-in for the external FFT library: it compiles a configuration
//! into an immutable [`FftApplication`] that knows how to append its
//! compute pass into a command encoder. The real transform engine would
//! plug into the submission driver through the same [`TransformPlan`]
//! trait without touching the transfer or batching code.

use wgpu::{BindGroup, BindGroupLayout, ComputePipeline, Device, ShaderModule};

use crate::batch::TransformPlan;
use crate::config::{ConfigError, FftConfig};
use crate::context::GpuContext;
use crate::memory::GpuBuffer;

const WORKGROUP_SIZE: u32 = 256;
const MAX_CHANNELS: u32 = 4;

/// Errors that can occur while building a transform application.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Buffer size {got} does not match configuration's {expected} bytes")]
    BufferSizeMismatch { expected: u64, got: u64 },
    #[error("Convolution configuration requires a kernel buffer")]
    KernelMissing,
    #[error("Kernel size {got} does not match expected {expected} bytes")]
    KernelSizeMismatch { expected: u64, got: u64 },
    #[error("At most {MAX_CHANNELS} channels supported, got {0}")]
    TooManyChannels(u32),
}

/// Uniforms for the phase-rotation pass. Must match WGSL layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct RotateParams {
    pair_count: u32,
    period: u32,
    direction: i32,
    _pad: u32,
}

/// Uniforms for the pointwise-convolution pass. Must match WGSL layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct ConvolveParams {
    bins: u32,
    channels: u32,
    symmetric: u32,
    _pad: u32,
}

/// An executable plan compiled from one [`FftConfig`].
///
/// Built once, reused across any number of submissions, never mutated.
/// The bind group pins the data (and kernel) buffers it was built against.
pub struct FftApplication {
    pipeline: ComputePipeline,
    bind_group: BindGroup,
    workgroups: u32,
}

impl FftApplication {
    /// Compile a configuration against its device buffer. Convolution
    /// configurations also take the precomputed kernel buffer; the
    /// configuration is consumed here and the binding never changes.
    pub fn new(
        ctx: &GpuContext,
        config: &FftConfig,
        buffer: &GpuBuffer,
        kernel: Option<&GpuBuffer>,
    ) -> Result<Self, PlanError> {
        config.validate()?;

        let expected = config.buffer_size();
        if buffer.size() != expected {
            return Err(PlanError::BufferSizeMismatch {
                expected,
                got: buffer.size(),
            });
        }

        let shader = ctx
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("transform_shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("shaders/transform.wgsl").into()),
            });

        if config.convolution {
            Self::new_convolution(ctx, config, buffer, kernel, &shader)
        } else {
            Self::new_rotation(ctx, config, buffer, &shader)
        }
    }

    fn new_rotation(
        ctx: &GpuContext,
        config: &FftConfig,
        buffer: &GpuBuffer,
        shader: &ShaderModule,
    ) -> Result<Self, PlanError> {
        let pair_count = (config.buffer_len() / 2) as u32;
        let x_complex = if config.r2c {
            config.size[0] / 2 + 1
        } else {
            config.size[0]
        };
        let params = RotateParams {
            pair_count,
            period: x_complex,
            direction: if config.inverse { -1 } else { 1 },
            _pad: 0,
        };
        let params_buffer = create_uniform(&ctx.device, "rotate_params", &params);

        let layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("rotate_layout"),
                entries: &[
                    storage_entry(0, false),
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("rotate_bind_group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        Ok(Self {
            pipeline: create_pipeline(&ctx.device, shader, &layout, "rotate_phase"),
            bind_group,
            workgroups: pair_count.div_ceil(WORKGROUP_SIZE),
        })
    }

    fn new_convolution(
        ctx: &GpuContext,
        config: &FftConfig,
        buffer: &GpuBuffer,
        kernel: Option<&GpuBuffer>,
        shader: &ShaderModule,
    ) -> Result<Self, PlanError> {
        let kernel = kernel.ok_or(PlanError::KernelMissing)?;

        let channels = config.vector_dimension;
        if channels > MAX_CHANNELS {
            return Err(PlanError::TooManyChannels(channels));
        }

        let bins = (config.buffer_len() / 2) as u32 / channels;
        let kernel_channels = if config.symmetric_kernel {
            channels * (channels + 1) / 2
        } else {
            channels * channels
        };
        let expected_kernel =
            u64::from(kernel_channels) * u64::from(bins) * 2 * std::mem::size_of::<f32>() as u64;
        if kernel.size() != expected_kernel {
            return Err(PlanError::KernelSizeMismatch {
                expected: expected_kernel,
                got: kernel.size(),
            });
        }

        let params = ConvolveParams {
            bins,
            channels,
            symmetric: config.symmetric_kernel as u32,
            _pad: 0,
        };
        let params_buffer = create_uniform(&ctx.device, "convolve_params", &params);

        let layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("convolve_layout"),
                entries: &[
                    storage_entry(0, false),
                    storage_entry(1, true),
                    wgpu::BindGroupLayoutEntry {
                        binding: 3,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("convolve_bind_group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: kernel.buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        Ok(Self {
            pipeline: create_pipeline(&ctx.device, shader, &layout, "pointwise_convolve"),
            bind_group,
            workgroups: bins.div_ceil(WORKGROUP_SIZE),
        })
    }
}

impl TransformPlan for FftApplication {
    fn append(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("transform_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.dispatch_workgroups(self.workgroups, 1, 1);
    }
}

fn create_uniform<T: bytemuck::Pod>(device: &Device, label: &str, value: &T) -> wgpu::Buffer {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<T>() as u64,
        usage: wgpu::BufferUsages::UNIFORM,
        mapped_at_creation: true,
    });
    buffer
        .slice(..)
        .get_mapped_range_mut()
        .copy_from_slice(bytemuck::bytes_of(value));
    buffer.unmap();
    buffer
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn create_pipeline(
    device: &Device,
    shader: &ShaderModule,
    layout: &BindGroupLayout,
    entry_point: &str,
) -> ComputePipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{}_pipeline_layout", entry_point)),
        bind_group_layouts: &[layout],
        immediate_size: 0,
    });

    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(&format!("{}_pipeline", entry_point)),
        layout: Some(&pipeline_layout),
        module: shader,
        entry_point: Some(entry_point),
        compilation_options: Default::default(),
        cache: None,
    })
}
