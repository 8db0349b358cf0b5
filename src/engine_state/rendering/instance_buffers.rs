//! wgpu backend for `DeviceBuffer`.

use std::rc::Rc;

use wgpu::{Buffer, BufferAddress, BufferUsages, Device, Queue};

use crate::engine_state::buffer_state::{BufferAllocator, DeviceBuffer};

/// A vertex buffer on the graphics device, written through the queue.
pub struct WgpuBuffer {
    device: Rc<Device>,
    queue: Rc<Queue>,
    label: &'static str,
    buffer: Buffer,
}

impl WgpuBuffer {
    /// The underlying wgpu buffer. Replaced on every reallocation, so do not
    /// hold on to it across store operations.
    pub fn raw(&self) -> &Buffer {
        &self.buffer
    }
}

fn create_vertex_buffer(device: &Device, label: &'static str, size: BufferAddress) -> Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

impl DeviceBuffer for WgpuBuffer {
    fn size(&self) -> u64 {
        self.buffer.size()
    }

    fn reallocate(&mut self, size: u64) {
        self.buffer.destroy();
        self.buffer = create_vertex_buffer(&self.device, self.label, size);
    }

    fn write(&mut self, offset: u64, data: &[u8]) {
        self.queue.write_buffer(&self.buffer, offset, data);
    }
}

/// Creates `WgpuBuffer`s on one device.
#[derive(Clone)]
pub struct WgpuAllocator {
    device: Rc<Device>,
    queue: Rc<Queue>,
}

impl WgpuAllocator {
    pub fn new(device: Device, queue: Queue) -> Self {
        Self {
            device: Rc::new(device),
            queue: Rc::new(queue),
        }
    }
}

impl BufferAllocator for WgpuAllocator {
    type Buffer = WgpuBuffer;

    fn allocate(&self, label: &'static str, size: u64) -> WgpuBuffer {
        WgpuBuffer {
            device: self.device.clone(),
            queue: self.queue.clone(),
            label,
            buffer: create_vertex_buffer(&self.device, label, size),
        }
    }
}
