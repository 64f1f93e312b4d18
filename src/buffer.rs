//! CPU-side staging buffers that track what still has to reach the GPU.

use bytemuck::Pod;
use std::ops::Range;

/// Synchronization state between the CPU copy and the GPU resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirtyState {
    /// Nothing written yet, no GPU resource.
    Empty,
    /// The GPU resource must be (re)created from the whole CPU copy.
    NeedsCreate,
    Clean,
    /// The GPU resource exists; only the dirty range changed.
    NeedsUpdate,
}

/// Receiver of buffer uploads, usually a GPU buffer.
pub trait BufferSink {
    /// Replace the whole resource with `bytes`.
    fn create(&mut self, bytes: &[u8]);
    /// Overwrite `bytes.len()` bytes starting at `offset`.
    fn update(&mut self, offset: u64, bytes: &[u8]);
}

/// What a commit has to push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingUpload<'a> {
    Create(&'a [u8]),
    Update { offset: usize, bytes: &'a [u8] },
}

/// Growable typed buffer with a dirty element range.
#[derive(Debug, Clone)]
pub struct BufferObject<T: Pod> {
    data: Vec<T>,
    dirty: Option<Range<usize>>,
    state: DirtyState,
}

impl<T: Pod> BufferObject<T> {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            dirty: None,
            state: DirtyState::Empty,
        }
    }

    /// A buffer holding `len` copies of `value`, waiting for its first upload.
    pub fn filled(value: T, len: usize) -> Self {
        let mut buffer = Self::new();
        buffer.data.resize(len, value);
        buffer.state = DirtyState::NeedsCreate;
        buffer
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    pub fn state(&self) -> DirtyState {
        self.state
    }

    /// Element range written since the last commit.
    pub fn dirty_range(&self) -> Option<Range<usize>> {
        self.dirty.clone()
    }

    fn mark(&mut self, range: Range<usize>) {
        self.dirty = Some(match self.dirty.take() {
            Some(d) => d.start.min(range.start)..d.end.max(range.end),
            None => range,
        });
    }

    /// Appends `items`, returning the index of the first one.
    ///
    /// Growing the buffer always forces a full re-create on the next commit.
    pub fn append(&mut self, items: &[T]) -> usize {
        let start = self.data.len();
        self.data.extend_from_slice(items);
        self.mark(start..self.data.len());
        self.state = DirtyState::NeedsCreate;
        start
    }

    /// Overwrites `items.len()` elements starting at `index`.
    pub fn update(&mut self, index: usize, items: &[T]) {
        let end = index + items.len();
        self.data[index..end].copy_from_slice(items);
        self.touch(index..end);
    }

    /// Mutable view over `range`; the range is marked dirty.
    pub fn slice_mut(&mut self, range: Range<usize>) -> &mut [T] {
        self.touch(range.clone());
        &mut self.data[range]
    }

    fn touch(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        self.mark(range);
        self.state = match self.state {
            DirtyState::Empty => DirtyState::NeedsCreate,
            DirtyState::Clean => DirtyState::NeedsUpdate,
            s => s,
        };
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.dirty = None;
        self.state = DirtyState::NeedsCreate;
    }

    /// The upload the next commit would perform, if any.
    pub fn pending(&self) -> Option<PendingUpload<'_>> {
        let size = std::mem::size_of::<T>();
        match self.state {
            DirtyState::NeedsCreate => Some(PendingUpload::Create(self.as_bytes())),
            DirtyState::NeedsUpdate => {
                let range = self.dirty.clone()?;
                Some(PendingUpload::Update {
                    offset: range.start * size,
                    bytes: bytemuck::cast_slice(&self.data[range]),
                })
            }
            DirtyState::Empty | DirtyState::Clean => None,
        }
    }

    pub fn mark_clean(&mut self) {
        self.dirty = None;
        if self.state != DirtyState::Empty {
            self.state = DirtyState::Clean;
        }
    }

    /// Pushes pending changes to `sink`. Returns `false` when there was nothing to do.
    pub fn commit(&mut self, sink: &mut dyn BufferSink) -> bool {
        match self.pending() {
            Some(PendingUpload::Create(bytes)) => sink.create(bytes),
            Some(PendingUpload::Update { offset, bytes }) => sink.update(offset as u64, bytes),
            None => {
                log::trace!("buffer commit skipped: {:?}", self.state);
                return false;
            }
        }
        self.mark_clean();
        true
    }
}

impl<T: Pod> Default for BufferObject<T> {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests {
    use super::recording::RecordingSink;
    use super::*;

    #[test]
    fn test_state_machine() {
        let mut bo: BufferObject<u32> = BufferObject::new();
        assert_eq!(bo.state(), DirtyState::Empty);
        let mut sink = RecordingSink::default();
        assert!(!bo.commit(&mut sink));

        bo.append(&[1, 2, 3, 4]);
        assert_eq!(bo.state(), DirtyState::NeedsCreate);
        assert!(bo.commit(&mut sink));
        assert_eq!(bo.state(), DirtyState::Clean);
        assert_eq!(sink.creates, 1);
        assert!(!bo.commit(&mut sink));

        bo.update(2, &[9]);
        assert_eq!(bo.state(), DirtyState::NeedsUpdate);
        assert!(bo.commit(&mut sink));
        assert_eq!(sink.updates, vec![(8, 4)]);
        assert_eq!(sink.bytes, bytemuck::cast_slice::<u32, u8>(&[1, 2, 9, 4]));

        bo.append(&[5]);
        assert_eq!(bo.state(), DirtyState::NeedsCreate);
        bo.commit(&mut sink);
        assert_eq!(sink.creates, 2);
        assert_eq!(sink.bytes.len(), 20);

        bo.clear();
        assert_eq!(bo.state(), DirtyState::NeedsCreate);
        bo.commit(&mut sink);
        assert!(sink.bytes.is_empty());
    }

    #[test]
    fn test_dirty_range_spans_all_writes() {
        let mut bo = BufferObject::filled(0u8, 16);
        let mut sink = RecordingSink::default();
        bo.commit(&mut sink);

        bo.update(10, &[1, 1]);
        bo.slice_mut(3..5).fill(7);
        assert_eq!(bo.dirty_range(), Some(3..12));
        assert_eq!(
            bo.pending(),
            Some(PendingUpload::Update {
                offset: 3,
                bytes: &[7, 7, 0, 0, 0, 0, 0, 1, 1],
            })
        );
        bo.commit(&mut sink);
        assert_eq!(sink.bytes, bo.as_bytes());
        assert_eq!(bo.dirty_range(), None);
    }
}
