//! End-to-end sample flows: configure, upload, run, download.
//!
//! Illustrative only; the extents are kept small so a demo run finishes
//! in seconds. Nothing here is reusable policy beyond configure, upload,
//! run, download.

use wgpu::BufferUsages;

use crate::batch::{run_batched, run_batched_pair, SubmitError};
use crate::config::FftConfig;
use crate::context::GpuContext;
use crate::memory::{AllocError, GpuBuffer, MemoryProperties};
use crate::plan::{FftApplication, PlanError};
use crate::transfer::{download, upload, TransferError};

/// Errors from the sample flows.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Alloc(#[from] AllocError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

const STORAGE_USAGE: BufferUsages = BufferUsages::STORAGE
    .union(BufferUsages::COPY_SRC)
    .union(BufferUsages::COPY_DST);

/// Fill host data for an R2C configuration: each x-row ramps 0..x in its
/// real positions, padding floats left at zero. The configuration must
/// satisfy [`FftConfig::validate`], which pins the even x-extent the
/// padded layout relies on.
pub fn fill_ramp(config: &FftConfig) -> Vec<f32> {
    let mut data = vec![0.0f32; config.buffer_len()];
    let [x, y, z] = config.size.map(|v| v as usize);
    let stride = config.row_stride();

    for v in 0..config.vector_dimension as usize {
        for k in 0..z {
            for j in 0..y {
                let row = v * stride * y * z + k * stride * y + j * stride;
                for (i, slot) in data[row..row + x].iter_mut().enumerate() {
                    *slot = i as f32;
                }
            }
        }
    }
    data
}

/// Fill an identity convolution kernel: diagonal channels get a constant
/// real 1 spectrum, off-diagonal channels stay zero. `channels` is the
/// data vector dimension; the kernel configuration's vector dimension is
/// its square for full storage, or `channels * (channels + 1) / 2` when
/// `symmetric` selects upper-triangle storage.
pub fn fill_identity_kernel(kernel_config: &FftConfig, channels: u32, symmetric: bool) -> Vec<f32> {
    let mut data = vec![0.0f32; kernel_config.buffer_len()];
    let vd = kernel_config.vector_dimension as usize;
    let bins = data.len() / 2 / vd;
    let n = channels as usize;

    let is_diagonal = |v: usize| {
        if symmetric {
            // Upper-triangle layout puts (r, r) at r*n - (r-1)*r/2.
            (0..n).any(|r| v == r * n - r.saturating_sub(1) * r / 2)
        } else {
            v % (n + 1) == 0
        }
    };

    for v in 0..vd {
        if !is_diagonal(v) {
            continue;
        }
        for bin in 0..bins {
            data[2 * (v * bins + bin)] = 1.0;
        }
    }
    data
}

/// Round-trip sample: forward + inverse transform batched into one
/// submission, then a download to confirm the data survived.
pub fn run_roundtrip(ctx: &GpuContext) -> Result<(), ScenarioError> {
    let config = FftConfig {
        dim: 3,
        size: [64, 64, 64],
        r2c: true,
        ..Default::default()
    };

    let buffer = GpuBuffer::new(
        ctx,
        config.buffer_size(),
        STORAGE_USAGE,
        MemoryProperties::DEVICE_LOCAL,
    )?;
    println!(
        "Total memory needed for buffer: {} MB",
        config.buffer_size() / 1024 / 1024
    );

    let input = fill_ramp(&config);
    upload(ctx, &buffer, bytemuck::cast_slice(&input))?;

    let forward = FftApplication::new(ctx, &config, &buffer, None)?;
    let inverse = FftApplication::new(ctx, &config.inverted(), &buffer, None)?;

    let timing = run_batched_pair(ctx, &forward, &inverse, 100)?;
    println!(
        "Forward+inverse, batch {}: {:.3} ms per iteration",
        timing.batch,
        timing.per_iteration().as_secs_f64() * 1000.0
    );

    let mut output = vec![0.0f32; config.buffer_len()];
    download(ctx, &buffer, bytemuck::cast_slice_mut(&mut output))?;

    let max_dev = input
        .iter()
        .zip(&output)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f32, f32::max);
    println!("Round trip max deviation: {:.6}", max_dev);

    Ok(())
}

/// Convolution sample: an identity 3x3 kernel uploaded into its own
/// buffer, referenced by a convolution-enabled configuration.
pub fn run_convolution(ctx: &GpuContext) -> Result<(), ScenarioError> {
    let kernel_config = FftConfig {
        dim: 2,
        size: [512, 512, 1],
        r2c: true,
        vector_dimension: 9,
        ..Default::default()
    };

    let kernel = GpuBuffer::with_label(
        ctx,
        kernel_config.buffer_size(),
        STORAGE_USAGE,
        MemoryProperties::DEVICE_LOCAL,
        "convolution_kernel",
    )?;
    println!(
        "Total memory needed for kernel: {} MB",
        kernel_config.buffer_size() / 1024 / 1024
    );

    let kernel_data = fill_identity_kernel(&kernel_config, 3, false);
    upload(ctx, &kernel, bytemuck::cast_slice(&kernel_data))?;

    // The kernel is treated as already transformed; a real flow would run
    // a forward transform on it first.
    let config = FftConfig {
        vector_dimension: 3,
        convolution: true,
        symmetric_kernel: false,
        ..kernel_config
    };

    let buffer = GpuBuffer::new(
        ctx,
        config.buffer_size(),
        STORAGE_USAGE,
        MemoryProperties::DEVICE_LOCAL,
    )?;
    println!(
        "Total memory needed for buffer: {} MB",
        config.buffer_size() / 1024 / 1024
    );

    let input = fill_ramp(&config);
    upload(ctx, &buffer, bytemuck::cast_slice(&input))?;

    let app = FftApplication::new(ctx, &config, &buffer, Some(&kernel))?;
    let timing = run_batched(ctx, &app, 100)?;
    println!(
        "Convolution, batch {}: {:.3} ms per iteration",
        timing.batch,
        timing.per_iteration().as_secs_f64() * 1000.0
    );

    let mut output = vec![0.0f32; config.buffer_len()];
    download(ctx, &buffer, bytemuck::cast_slice_mut(&mut output))?;

    let max_dev = input
        .iter()
        .zip(&output)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f32, f32::max);
    println!("Identity convolution max deviation: {:.6}", max_dev);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_ramp_respects_padding() {
        let config = FftConfig {
            dim: 2,
            size: [4, 2, 1],
            r2c: true,
            ..Default::default()
        };
        let data = fill_ramp(&config);
        assert_eq!(data.len(), config.buffer_len());

        // Row stride is x + 2 = 6; real positions ramp, padding stays zero.
        assert_eq!(&data[0..6], &[0.0, 1.0, 2.0, 3.0, 0.0, 0.0]);
        assert_eq!(&data[6..12], &[0.0, 1.0, 2.0, 3.0, 0.0, 0.0]);
    }

    #[test]
    fn test_identity_kernel_diagonal_channels() {
        let config = FftConfig {
            dim: 1,
            size: [4, 1, 1],
            r2c: true,
            vector_dimension: 9,
            ..Default::default()
        };
        let data = fill_identity_kernel(&config, 3, false);
        let bins = data.len() / 2 / 9;

        for v in 0..9 {
            let expected = if v % 4 == 0 { 1.0 } else { 0.0 };
            for bin in 0..bins {
                assert_eq!(data[2 * (v * bins + bin)], expected, "channel {}", v);
                assert_eq!(data[2 * (v * bins + bin) + 1], 0.0);
            }
        }
    }

    #[test]
    fn test_identity_kernel_symmetric_diagonal_channels() {
        // 3-channel upper-triangle storage: xx, xy, xz, yy, yz, zz.
        let config = FftConfig {
            dim: 1,
            size: [4, 1, 1],
            r2c: true,
            vector_dimension: 6,
            ..Default::default()
        };
        let data = fill_identity_kernel(&config, 3, true);
        let bins = data.len() / 2 / 6;

        for v in 0..6 {
            let expected = if v == 0 || v == 3 || v == 5 { 1.0 } else { 0.0 };
            for bin in 0..bins {
                assert_eq!(data[2 * (v * bins + bin)], expected, "channel {}", v);
                assert_eq!(data[2 * (v * bins + bin) + 1], 0.0);
            }
        }
    }
}
