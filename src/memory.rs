//! GPU buffer allocation and memory-type selection.
//!
//! wgpu hides the physical memory-type table the Vulkan API exposes, but
//! the selection policy is kept explicit here: allocation scans a table of
//! memory classes in index order and takes the first match. Sample callers
//! depend on that scan being deterministic, so it is part of the contract.

use std::ops::BitOr;

use wgpu::{Buffer, BufferUsages};

use crate::context::GpuContext;

/// Errors that can occur during buffer allocation.
#[derive(Debug, thiserror::Error)]
pub enum AllocError {
    #[error("No memory type matches mask {type_bits:#b} with properties {required:?}")]
    NoMatchingMemoryType {
        type_bits: u32,
        required: MemoryProperties,
    },
    #[error("Buffer size must be nonzero")]
    ZeroSize,
}

/// Vulkan-style memory property flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryProperties(u32);

impl MemoryProperties {
    pub const DEVICE_LOCAL: Self = Self(1 << 0);
    pub const HOST_VISIBLE: Self = Self(1 << 1);
    pub const HOST_COHERENT: Self = Self(1 << 2);

    pub const fn empty() -> Self {
        Self(0)
    }

    /// True if `self` is a superset of `other`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for MemoryProperties {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// One entry of the memory-type table.
#[derive(Debug, Clone, Copy)]
pub struct MemoryType {
    pub properties: MemoryProperties,
}

/// An ordered table of memory classes available for buffer allocation.
#[derive(Debug, Clone)]
pub struct MemoryTypeTable {
    types: Vec<MemoryType>,
}

impl MemoryTypeTable {
    pub fn new(types: Vec<MemoryType>) -> Self {
        Self { types }
    }

    /// The classes wgpu exposes for buffers: device-local storage plus one
    /// host-visible class for staging traffic in either direction.
    pub fn standard() -> Self {
        Self::new(vec![
            MemoryType {
                properties: MemoryProperties::DEVICE_LOCAL,
            },
            MemoryType {
                properties: MemoryProperties::HOST_VISIBLE | MemoryProperties::HOST_COHERENT,
            },
        ])
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Select a memory type: first index whose bit is set in `type_bits`
    /// and whose property flags are a superset of `required`. Lowest index
    /// wins. No match is an unrecoverable configuration error, reported
    /// explicitly rather than returned as a sentinel.
    pub fn find(
        &self,
        type_bits: u32,
        required: MemoryProperties,
    ) -> Result<usize, AllocError> {
        self.types
            .iter()
            .enumerate()
            .find(|(i, ty)| type_bits & (1 << i) != 0 && ty.properties.contains(required))
            .map(|(i, _)| i)
            .ok_or(AllocError::NoMatchingMemoryType {
                type_bits,
                required,
            })
    }
}

/// A device buffer with its declared size and the memory class it landed in.
///
/// Owned by whichever scenario created it; the underlying allocation is
/// released on drop.
pub struct GpuBuffer {
    buffer: Buffer,
    size: u64,
    memory_type: usize,
}

impl GpuBuffer {
    /// Allocate a buffer with the given usage in a memory class satisfying
    /// `properties`.
    ///
    /// Host-visible classes gain map usage derived from the transfer
    /// direction: copy sources are mapped for writing, copy destinations
    /// for reading.
    pub fn new(
        ctx: &GpuContext,
        size: u64,
        usage: BufferUsages,
        properties: MemoryProperties,
    ) -> Result<Self, AllocError> {
        Self::with_label(ctx, size, usage, properties, "fft_buffer")
    }

    pub fn with_label(
        ctx: &GpuContext,
        size: u64,
        usage: BufferUsages,
        properties: MemoryProperties,
        label: &str,
    ) -> Result<Self, AllocError> {
        if size == 0 {
            return Err(AllocError::ZeroSize);
        }

        let table = ctx.memory_types();
        let all_types = (1u32 << table.len()) - 1;
        let memory_type = table.find(all_types, properties)?;

        let mut usage = usage;
        if properties.contains(MemoryProperties::HOST_VISIBLE) {
            if usage.contains(BufferUsages::COPY_SRC) {
                usage |= BufferUsages::MAP_WRITE;
            }
            if usage.contains(BufferUsages::COPY_DST) {
                usage |= BufferUsages::MAP_READ;
            }
        }

        let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        });

        Ok(Self {
            buffer,
            size,
            memory_type,
        })
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Declared size in bytes. Transfers always move exactly this many.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn memory_type(&self) -> usize {
        self.memory_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(props: &[MemoryProperties]) -> MemoryTypeTable {
        MemoryTypeTable::new(
            props
                .iter()
                .map(|&properties| MemoryType { properties })
                .collect(),
        )
    }

    #[test]
    fn test_first_matching_index_wins() {
        let t = table(&[
            MemoryProperties::DEVICE_LOCAL,
            MemoryProperties::HOST_VISIBLE | MemoryProperties::HOST_COHERENT,
            MemoryProperties::HOST_VISIBLE | MemoryProperties::HOST_COHERENT,
        ]);

        let idx = t.find(0b111, MemoryProperties::HOST_VISIBLE).unwrap();
        assert_eq!(idx, 1);
    }

    #[test]
    fn test_type_bits_mask_skips_entries() {
        let t = table(&[
            MemoryProperties::HOST_VISIBLE,
            MemoryProperties::HOST_VISIBLE,
        ]);

        // Index 0 matches on properties but is masked out.
        let idx = t.find(0b10, MemoryProperties::HOST_VISIBLE).unwrap();
        assert_eq!(idx, 1);
    }

    #[test]
    fn test_superset_required() {
        let t = table(&[
            MemoryProperties::HOST_VISIBLE,
            MemoryProperties::HOST_VISIBLE | MemoryProperties::HOST_COHERENT,
        ]);

        let required = MemoryProperties::HOST_VISIBLE | MemoryProperties::HOST_COHERENT;
        let idx = t.find(0b11, required).unwrap();
        assert_eq!(idx, 1);
    }

    #[test]
    fn test_no_match_is_explicit_error() {
        let t = table(&[MemoryProperties::DEVICE_LOCAL]);

        let result = t.find(0b1, MemoryProperties::HOST_VISIBLE);
        assert!(matches!(
            result,
            Err(AllocError::NoMatchingMemoryType { .. })
        ));
    }

    #[test]
    fn test_empty_mask_never_matches() {
        let t = table(&[MemoryProperties::DEVICE_LOCAL]);
        assert!(t.find(0, MemoryProperties::empty()).is_err());
    }
}
