//! `Label`: an index-tagged payload riding alongside a stream, plus the visibility
//! window an input port maintains as it consumes.

use std::any::Any;
use std::sync::Arc;

/// An index-tagged metadata tag. `index` is an element offset from the port's running
/// `total_elements` baseline at the time the label was produced (or, once attached to a
/// chunk, relative to that chunk's own origin — see `BufferChunk::slice_elements`).
/// `width` defaults to 1 when unset, per the open question in the framework's design
/// notes ("some producers forget to set it"): there is no public constructor that
/// leaves it unspecified.
#[derive(Clone)]
pub struct Label {
    id: String,
    data: Arc<dyn Any + Send + Sync>,
    index: usize,
    width: usize,
}

impl Label {
    pub fn new(id: impl Into<String>, data: impl Any + Send + Sync, index: usize) -> Self {
        Self { id: id.into(), data: Arc::new(data), index, width: 1 }
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(1);
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn data(&self) -> &(dyn Any + Send + Sync) {
        self.data.as_ref()
    }

    pub fn data_downcast<T: 'static>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }

    /// Whether this label is still "alive" once `total_elements` bytes have been
    /// consumed from the baseline it was measured against: a label ages out once
    /// `index + width <= total_elements`.
    pub(crate) fn aged_out(&self, total_elements: u64) -> bool {
        (self.index as u64).saturating_add(self.width as u64) <= total_elements
    }
}

impl std::fmt::Debug for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Label").field("id", &self.id).field("index", &self.index).field("width", &self.width).finish()
    }
}

/// A visibility window over a port's pending label list: only labels whose `index` lies
/// within `[0, visible_len)` of the current front chunk are yielded. Adjusted downward
/// as the port consumes (see `InputPort::consume`).
pub struct LabelIteratorRange<'a> {
    labels: &'a [Label],
    visible_len: usize,
    pos: usize,
}

impl<'a> LabelIteratorRange<'a> {
    pub fn new(labels: &'a [Label], visible_len: usize) -> Self {
        Self { labels, visible_len, pos: 0 }
    }
}

impl<'a> Iterator for LabelIteratorRange<'a> {
    type Item = &'a Label;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.labels.len() {
            let label = &self.labels[self.pos];
            self.pos += 1;
            if label.index() < self.visible_len {
                return Some(label);
            }
        }
        None
    }
}
