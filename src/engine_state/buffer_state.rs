//! # Buffer State Module
//!
//! Keeps device-resident instance buffers in step with the CPU instance arrays
//! while moving as few bytes as possible.
//!
//! ## Sizing policy
//!
//! A device buffer mirrors the *capacity* of its CPU array, not its length. The
//! CPU arrays are `Vec`s with amortized growth, so the device buffer is only
//! reallocated when the `Vec` itself reallocates; every other edit becomes a
//! single-element partial upload. Draw calls are bounded by the array length,
//! so the bytes between length and capacity are never read.
//!
//! A buffer is never zero-sized: an array that has never grown gets a buffer
//! one element large, because a zero-sized buffer cannot be bound as a vertex
//! attribute source.
//!
//! ## Backends
//!
//! `DeviceBuffer` abstracts the three operations the policy needs. The wgpu
//! backend lives in `rendering::instance_buffers`; `HostBuffer` keeps the bytes
//! in host memory, which is what headless sessions and tests use.

use std::mem::size_of;

use bytemuck::Pod;
use log::{debug, error, trace};

/// A resizable block of device memory.
pub trait DeviceBuffer {
    /// Current allocation size in bytes.
    fn size(&self) -> u64;

    /// Replaces the allocation with a new one of `size` bytes. Previous
    /// contents are not preserved.
    fn reallocate(&mut self, size: u64);

    /// Uploads `data` at byte `offset`. The caller guarantees the range fits.
    fn write(&mut self, offset: u64, data: &[u8]);
}

/// Creates device buffers.
pub trait BufferAllocator {
    type Buffer: DeviceBuffer + 'static;

    fn allocate(&self, label: &'static str, size: u64) -> Self::Buffer;
}

/// Usage statistics for a device buffer
///
/// Tracks memory allocation, reallocations and write traffic to help reason
/// about how often the buffer is resized versus patched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BufferAnalytics {
    /// Total memory allocated for the buffer in bytes
    pub allocated_memory: u64,
    /// Number of times the buffer was reallocated after creation
    pub reallocations: u64,
    /// Number of upload calls issued
    pub times_written: u64,
    /// Sum of all uploaded bytes
    pub bytes_written: u64,
}

/// Requested synchronization for one CPU array.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BufferUpdate {
    /// Reallocate to the array's capacity and upload its whole length.
    Rebuild,
    /// The element at this index changed (or was appended).
    Element(usize),
    /// The array shrank from the end; nothing needs uploading.
    Shrink,
}

/// What a synchronization actually did to the device buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The array has no storage; the buffer was sized to one element.
    Reserved,
    /// The buffer was reallocated and refilled.
    Reallocated,
    /// A single element was uploaded in place.
    Patched,
    Unchanged,
}

/// A device buffer paired with its analytics.
pub struct SyncedBuffer<B: DeviceBuffer> {
    buffer: B,
    label: &'static str,
    analytics: BufferAnalytics,
}

impl<B: DeviceBuffer> SyncedBuffer<B> {
    /// Allocates a buffer holding one `T`.
    pub fn new<T: Pod, A: BufferAllocator<Buffer = B>>(allocator: &A, label: &'static str) -> Self {
        let size = size_of::<T>() as u64;
        Self {
            buffer: allocator.allocate(label, size),
            label,
            analytics: BufferAnalytics {
                allocated_memory: size,
                ..BufferAnalytics::default()
            },
        }
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    pub fn analytics(&self) -> BufferAnalytics {
        self.analytics
    }

    /// Brings the buffer in line with `data` according to `update`.
    ///
    /// Byte sizes are always derived from the live `Vec`, never cached, so a
    /// forced rebuild repairs any earlier mismatch.
    pub fn sync<T: Pod>(&mut self, data: &Vec<T>, update: BufferUpdate) -> SyncOutcome {
        let element_size = size_of::<T>() as u64;
        let capacity_bytes = data.capacity() as u64 * element_size;
        let buffer_size = self.buffer.size();

        if capacity_bytes == 0 {
            if buffer_size == element_size {
                return SyncOutcome::Unchanged;
            }
            self.reallocate(element_size);
            return SyncOutcome::Reserved;
        }

        if update == BufferUpdate::Rebuild || capacity_bytes != buffer_size {
            self.reallocate(capacity_bytes);
            self.upload(0, bytemuck::cast_slice(data.as_slice()));
            return SyncOutcome::Reallocated;
        }

        match update {
            BufferUpdate::Element(index) => match data.get(index) {
                Some(element) => {
                    trace!("{}: patching element {}", self.label, index);
                    self.upload(index as u64 * element_size, bytemuck::bytes_of(element));
                    SyncOutcome::Patched
                }
                None => {
                    error!(
                        "{}: update of element {} but the array holds {}",
                        self.label,
                        index,
                        data.len()
                    );
                    SyncOutcome::Unchanged
                }
            },
            BufferUpdate::Shrink | BufferUpdate::Rebuild => SyncOutcome::Unchanged,
        }
    }

    /// Uploads `data` over the start of the buffer, leaving the allocation alone.
    pub fn write_all<T: Pod>(&mut self, data: &[T]) {
        if data.is_empty() {
            return;
        }
        self.upload(0, bytemuck::cast_slice(data));
    }

    fn reallocate(&mut self, size: u64) {
        debug!(
            "{}: reallocating {} -> {} bytes",
            self.label,
            self.buffer.size(),
            size
        );
        self.buffer.reallocate(size);
        self.analytics.allocated_memory = size;
        self.analytics.reallocations += 1;
    }

    fn upload(&mut self, offset: u64, bytes: &[u8]) {
        let end = offset + bytes.len() as u64;
        if end > self.buffer.size() {
            error!(
                "{}: write of {} bytes at {} exceeds buffer size {}",
                self.label,
                bytes.len(),
                offset,
                self.buffer.size()
            );
            return;
        }
        self.buffer.write(offset, bytes);
        self.analytics.times_written += 1;
        self.analytics.bytes_written += bytes.len() as u64;
    }
}

/// Device buffer stand-in that keeps its bytes in host memory.
#[derive(Debug, Default, Clone)]
pub struct HostBuffer {
    bytes: Vec<u8>,
}

impl HostBuffer {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Reinterprets the first `count` elements of the buffer as `T`.
    pub fn read<T: Pod>(&self, count: usize) -> Vec<T> {
        let len = (count * size_of::<T>()).min(self.bytes.len());
        self.bytes[..len]
            .chunks_exact(size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
            .collect()
    }
}

impl DeviceBuffer for HostBuffer {
    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn reallocate(&mut self, size: u64) {
        self.bytes = vec![0; size as usize];
    }

    fn write(&mut self, offset: u64, data: &[u8]) {
        let start = offset as usize;
        self.bytes[start..start + data.len()].copy_from_slice(data);
    }
}

/// Allocates `HostBuffer`s.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostAllocator;

impl BufferAllocator for HostAllocator {
    type Buffer = HostBuffer;

    fn allocate(&self, _label: &'static str, size: u64) -> HostBuffer {
        HostBuffer {
            bytes: vec![0; size as usize],
        }
    }
}
