// Vertex buffer that uploads only the slots a VertexBuffer marked dirty.

use std::ops::Range;

use glyphloom_text::{QuadVertex, VertexBuffer};

const MIN_CAPACITY: u64 = 64 * 1024;
const STRIDE: usize = std::mem::size_of::<QuadVertex>();

pub const QUAD_VERTEX_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: STRIDE as wgpu::BufferAddress,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &[
        // position
        wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x2,
        },
        // uv
        wgpu::VertexAttribute {
            offset: 8,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x2,
        },
    ],
};

/// Byte span of a range of vertex slots.
pub fn byte_range(slots: &Range<usize>) -> Range<usize> {
    slots.start * STRIDE..slots.end * STRIDE
}

pub struct QuadBuffer {
    buffer: wgpu::Buffer,
    capacity: u64,
    label: &'static str,
}

impl QuadBuffer {
    pub fn new(device: &wgpu::Device, label: &'static str) -> Self {
        Self {
            buffer: create(device, MIN_CAPACITY, label),
            capacity: MIN_CAPACITY,
            label,
        }
    }

    /// Push pending changes of `vertices` to the GPU and clear its dirty range.
    /// Growing the buffer uploads everything. Returns whether anything was written.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, vertices: &mut VertexBuffer) -> bool {
        let dirty = vertices.take_dirty();
        let bytes = vertices.as_bytes();
        let needed = bytes.len() as u64;

        if needed > self.capacity {
            let new_cap = needed.next_power_of_two().max(MIN_CAPACITY);
            log::debug!("{}: growing {} -> {} bytes", self.label, self.capacity, new_cap);
            self.buffer = create(device, new_cap, self.label);
            self.capacity = new_cap;
            queue.write_buffer(&self.buffer, 0, bytes);
            return true;
        }

        match dirty {
            Some(slots) if !slots.is_empty() && slots.end <= vertices.len() => {
                let span = byte_range(&slots);
                queue.write_buffer(&self.buffer, span.start as u64, &bytes[span]);
                true
            }
            _ => false,
        }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}

fn create(device: &wgpu::Device, size: u64, label: &str) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
