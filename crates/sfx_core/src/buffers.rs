//! Frame Buffers
//!
//! [`Frames`] is a fixed-count batch of equally sized frames of one element
//! type. [`Buffers`] is the tagged, type-erased form passed through the
//! object-safe [`Transform`](crate::Transform) interface; typed views are
//! only handed out after the tag has been checked.

use std::fmt::Debug;
use std::ops::{Index, IndexMut};

use crate::format::{BufferFormat, ElementType};

/// Sample types that can flow between transforms
pub trait Element: Copy + Default + Debug + PartialEq + Send + Sync + 'static {
    const TYPE: ElementType;

    fn frames(buffers: &Buffers) -> Option<&Frames<Self>>;

    fn frames_mut(buffers: &mut Buffers) -> Option<&mut Frames<Self>>;

    fn into_buffers(frames: Frames<Self>) -> Buffers;
}

impl Element for i16 {
    const TYPE: ElementType = ElementType::Int16;

    fn frames(buffers: &Buffers) -> Option<&Frames<Self>> {
        match buffers {
            Buffers::Int16(frames) => Some(frames),
            _ => None,
        }
    }

    fn frames_mut(buffers: &mut Buffers) -> Option<&mut Frames<Self>> {
        match buffers {
            Buffers::Int16(frames) => Some(frames),
            _ => None,
        }
    }

    fn into_buffers(frames: Frames<Self>) -> Buffers {
        Buffers::Int16(frames)
    }
}

impl Element for f32 {
    const TYPE: ElementType = ElementType::Float32;

    fn frames(buffers: &Buffers) -> Option<&Frames<Self>> {
        match buffers {
            Buffers::Float32(frames) => Some(frames),
            _ => None,
        }
    }

    fn frames_mut(buffers: &mut Buffers) -> Option<&mut Frames<Self>> {
        match buffers {
            Buffers::Float32(frames) => Some(frames),
            _ => None,
        }
    }

    fn into_buffers(frames: Frames<Self>) -> Buffers {
        Buffers::Float32(frames)
    }
}

/// Batch of `count` frames, each `frame_size` elements long
///
/// Every frame owns its storage; two batches never alias.
#[derive(Debug, Clone, PartialEq)]
pub struct Frames<T> {
    blocks: Vec<Vec<T>>,
    frame_size: usize,
    alignment_offset: usize,
}

impl<T: Element> Frames<T> {
    /// Zero-filled batch
    pub fn new(count: usize, frame_size: usize) -> Self {
        Self {
            blocks: vec![vec![T::default(); frame_size]; count],
            frame_size,
            alignment_offset: 0,
        }
    }

    /// Zero-filled batch shaped by `format`, reserving its allocated size per frame
    pub fn with_format(count: usize, format: &BufferFormat) -> Self {
        debug_assert_eq!(format.element_type(), T::TYPE, "Format element type differs");
        let blocks = (0..count)
            .map(|_| {
                let mut block = Vec::with_capacity(format.allocated_size());
                block.resize(format.size(), T::default());
                block
            })
            .collect();
        Self {
            blocks,
            frame_size: format.size(),
            alignment_offset: format.alignment_offset(),
        }
    }

    /// Wrap existing frames
    ///
    /// # Panics
    /// Panics if the frames have different lengths.
    pub fn from_blocks(blocks: Vec<Vec<T>>) -> Self {
        let frame_size = blocks.first().map_or(0, Vec::len);
        assert!(
            blocks.iter().all(|b| b.len() == frame_size),
            "All frames in a batch must have the same length"
        );
        Self {
            blocks,
            frame_size,
            alignment_offset: 0,
        }
    }

    pub fn count(&self) -> usize {
        self.blocks.len()
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn alignment_offset(&self) -> usize {
        self.alignment_offset
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[T]> {
        self.blocks.iter().map(Vec::as_slice)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut [T]> {
        self.blocks.iter_mut().map(Vec::as_mut_slice)
    }

    /// Frame storage, for parallel iteration
    pub fn blocks(&self) -> &[Vec<T>] {
        &self.blocks
    }

    /// Mutable frame storage; frame lengths must be left unchanged
    pub fn blocks_mut(&mut self) -> &mut [Vec<T>] {
        &mut self.blocks
    }

    pub fn into_blocks(self) -> Vec<Vec<T>> {
        self.blocks
    }
}

impl<T> Index<usize> for Frames<T> {
    type Output = [T];

    fn index(&self, index: usize) -> &[T] {
        &self.blocks[index]
    }
}

impl<T> IndexMut<usize> for Frames<T> {
    fn index_mut(&mut self, index: usize) -> &mut [T] {
        &mut self.blocks[index]
    }
}

/// Type-erased batch passed between transforms
#[derive(Debug, Clone, PartialEq)]
pub enum Buffers {
    Int16(Frames<i16>),
    Float32(Frames<f32>),
}

impl Buffers {
    /// One frame holding a whole PCM buffer
    pub fn from_pcm(samples: &[i16]) -> Self {
        Buffers::Int16(Frames::from_blocks(vec![samples.to_vec()]))
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            Buffers::Int16(_) => ElementType::Int16,
            Buffers::Float32(_) => ElementType::Float32,
        }
    }

    pub fn count(&self) -> usize {
        match self {
            Buffers::Int16(frames) => frames.count(),
            Buffers::Float32(frames) => frames.count(),
        }
    }

    pub fn frame_size(&self) -> usize {
        match self {
            Buffers::Int16(frames) => frames.frame_size(),
            Buffers::Float32(frames) => frames.frame_size(),
        }
    }

    /// Typed view, `None` when the tag does not match `T`
    pub fn view<T: Element>(&self) -> Option<&Frames<T>> {
        T::frames(self)
    }

    pub fn view_mut<T: Element>(&mut self) -> Option<&mut Frames<T>> {
        T::frames_mut(self)
    }
}

impl<T: Element> From<Frames<T>> for Buffers {
    fn from(frames: Frames<T>) -> Self {
        T::into_buffers(frames)
    }
}
