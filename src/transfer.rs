//! Host↔device transfers through a staging buffer.
//!
//! Both directions are synchronous: the call returns only after the device
//! has signalled completion of the copy. The staging buffer lives for the
//! duration of a single call and is sized exactly to the device buffer's
//! declared size. One transfer in flight at a time per context.

use wgpu::BufferUsages;

use crate::context::{GpuContext, GpuError};
use crate::memory::{AllocError, GpuBuffer, MemoryProperties};

/// Errors that can occur during a host↔device transfer.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Host buffer too small: device buffer declares {expected} bytes, host has {got}")]
    SizeMismatch { expected: u64, got: usize },
    #[error(transparent)]
    Alloc(#[from] AllocError),
    #[error("GPU buffer mapping failed: {0}")]
    MapFailed(String),
    #[error(transparent)]
    Wait(#[from] GpuError),
}

/// Copy host bytes into a device buffer.
///
/// Allocates a host-visible staging buffer of the target's declared size,
/// fills it while mapped, records a one-shot staging→target copy, submits
/// it, and blocks until the device signals completion. Exactly
/// `dst.size()` bytes are moved; the host slice must be at least that long.
pub fn upload(ctx: &GpuContext, dst: &GpuBuffer, bytes: &[u8]) -> Result<(), TransferError> {
    let size = dst.size();
    if (bytes.len() as u64) < size {
        return Err(TransferError::SizeMismatch {
            expected: size,
            got: bytes.len(),
        });
    }

    let staging = GpuBuffer::with_label(
        ctx,
        size,
        BufferUsages::COPY_SRC,
        MemoryProperties::HOST_VISIBLE | MemoryProperties::HOST_COHERENT,
        "staging_upload",
    )?;

    {
        let slice = staging.buffer().slice(..);
        map_blocking(ctx, &slice, wgpu::MapMode::Write)?;
        slice
            .get_mapped_range_mut()
            .copy_from_slice(&bytes[..size as usize]);
        staging.buffer().unmap();
    }

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("upload_encoder"),
        });
    encoder.copy_buffer_to_buffer(staging.buffer(), 0, dst.buffer(), 0, size);
    ctx.queue.submit(Some(encoder.finish()));
    ctx.wait_idle()?;

    // Staging buffer and its memory released here.
    Ok(())
}

/// Copy a device buffer into caller-provided host memory.
///
/// The mirror of [`upload`]: device→staging copy, blocking wait, then a
/// mapped read into the host slice. Exactly `src.size()` bytes are moved.
pub fn download(ctx: &GpuContext, src: &GpuBuffer, out: &mut [u8]) -> Result<(), TransferError> {
    let size = src.size();
    if (out.len() as u64) < size {
        return Err(TransferError::SizeMismatch {
            expected: size,
            got: out.len(),
        });
    }

    let staging = GpuBuffer::with_label(
        ctx,
        size,
        BufferUsages::COPY_DST,
        MemoryProperties::HOST_VISIBLE | MemoryProperties::HOST_COHERENT,
        "staging_download",
    )?;

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("download_encoder"),
        });
    encoder.copy_buffer_to_buffer(src.buffer(), 0, staging.buffer(), 0, size);
    ctx.queue.submit(Some(encoder.finish()));
    ctx.wait_idle()?;

    {
        let slice = staging.buffer().slice(..);
        map_blocking(ctx, &slice, wgpu::MapMode::Read)?;
        out[..size as usize].copy_from_slice(&slice.get_mapped_range());
        staging.buffer().unmap();
    }

    Ok(())
}

/// Map a buffer slice and block until the mapping is ready.
fn map_blocking(
    ctx: &GpuContext,
    slice: &wgpu::BufferSlice<'_>,
    mode: wgpu::MapMode,
) -> Result<(), TransferError> {
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(mode, move |r| {
        let _ = tx.send(r);
    });
    ctx.wait_idle()?;

    rx.recv()
        .map_err(|e| TransferError::MapFailed(e.to_string()))?
        .map_err(|e| TransferError::MapFailed(format!("{:?}", e)))
}
