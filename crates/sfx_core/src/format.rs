//! Buffer Formats
//!
//! A [`BufferFormat`] describes the data flowing between two adjacent
//! transforms: element type, logical frame size, allocated capacity,
//! sampling rate and alignment offset.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Element type tag carried by every format and buffer batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Int16,
    Float32,
}

impl ElementType {
    pub fn name(self) -> &'static str {
        match self {
            ElementType::Int16 => "int16",
            ElementType::Float32 => "float32",
        }
    }

    pub fn size_in_bytes(self) -> usize {
        match self {
            ElementType::Int16 => 2,
            ElementType::Float32 => 4,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shape of every frame exchanged across one pipeline edge
///
/// `allocated_size` never shrinks when the logical size changes; only
/// [`BufferFormat::reset_allocation`] brings it back down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferFormat {
    element_type: ElementType,
    size: usize,
    allocated_size: usize,
    sampling_rate: u32,
    alignment_offset: usize,
}

impl BufferFormat {
    pub fn new(element_type: ElementType, size: usize, sampling_rate: u32) -> Self {
        Self {
            element_type,
            size,
            allocated_size: size,
            sampling_rate,
            alignment_offset: 0,
        }
    }

    pub fn with_alignment_offset(mut self, offset: usize) -> Self {
        self.alignment_offset = offset;
        self
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Logical number of elements per frame
    pub fn size(&self) -> usize {
        self.size
    }

    /// Elements reserved per frame (always `>= size()`)
    pub fn allocated_size(&self) -> usize {
        self.allocated_size
    }

    pub fn sampling_rate(&self) -> u32 {
        self.sampling_rate
    }

    pub fn alignment_offset(&self) -> usize {
        self.alignment_offset
    }

    /// Change the logical size, growing the allocation when it no longer fits
    pub fn set_size(&mut self, size: usize) {
        self.size = size;
        if size > self.allocated_size {
            self.allocated_size = size;
        }
    }

    /// Reserve at least `capacity` elements per frame
    pub fn reserve(&mut self, capacity: usize) {
        self.allocated_size = self.allocated_size.max(capacity);
    }

    /// Drop any spare capacity beyond the logical size
    pub fn reset_allocation(&mut self) {
        self.allocated_size = self.size;
    }

    pub fn set_sampling_rate(&mut self, sampling_rate: u32) {
        self.sampling_rate = sampling_rate;
    }

    pub fn set_alignment_offset(&mut self, offset: usize) {
        self.alignment_offset = offset;
    }

    /// Bytes occupied by one frame's logical content
    pub fn frame_bytes(&self) -> usize {
        self.size * self.element_type.size_in_bytes()
    }

    /// Frame duration in milliseconds
    pub fn duration_ms(&self) -> f32 {
        if self.sampling_rate == 0 {
            return 0.0;
        }
        (self.size as f32 / self.sampling_rate as f32) * 1000.0
    }
}

impl fmt::Display for BufferFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}/{}] @ {}Hz",
            self.element_type, self.size, self.allocated_size, self.sampling_rate
        )
    }
}
