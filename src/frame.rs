//! The evaluation stack: one frame per nesting level of the document
//! currently being walked.
//!
//! The backing storage is a plain `Vec`, so any push may relocate it.
//! Handlers hold the index of the frame they are working on and re-fetch it
//! after any call that can push, rather than holding a live `&mut Frame`
//! across such a call — this is what keeps a relocation from ever
//! invalidating a reference a handler is still using.

use crate::error::LoadError;
use crate::schema::{Field, Schema};

pub(crate) enum MappingSubState {
    ExpectKey,
    ExpectValue { field_index: usize },
}

pub(crate) struct MappingFrame {
    pub fields: &'static [Field],
    pub seen: Vec<bool>,
    pub sub_state: MappingSubState,
}

pub(crate) struct SequenceFrame {
    pub element: &'static Schema,
    pub count: usize,
    /// Base address of the (possibly reallocated) element storage. Null
    /// until the first element arrives.
    pub storage: *mut u8,
    /// Address and width of the count field living in the *parent*
    /// aggregate, rewritten after every append. `None` for
    /// `SequenceFixed`, whose parent has no count field to maintain.
    pub count_field: Option<(*mut u8, usize)>,
    /// Upper bound on `count` for `SequenceFixed`; `None` for a growable
    /// sequence.
    pub fixed_capacity: Option<usize>,
    /// Address of the pointer slot in the parent that must be rewritten
    /// whenever `storage` moves. `None` when elements are embedded inline
    /// (a `SequenceFixed` array that is not itself `OWNING_POINTER`).
    pub pointer_slot: Option<*mut u8>,
}

pub(crate) enum FrameState {
    Start,
    InStream,
    InDoc,
    InMapping(MappingFrame),
    InSequence(SequenceFrame),
}

pub(crate) struct Frame {
    pub state: FrameState,
    pub schema: &'static Schema,
    /// Base address this frame writes into.
    pub data: *mut u8,
}

pub(crate) struct Stack {
    frames: Vec<Frame>,
}

const MIN_GROWTH: usize = 16;

impl Stack {
    pub(crate) fn new() -> Self {
        Self {
            frames: Vec::with_capacity(MIN_GROWTH),
        }
    }

    pub(crate) fn push(&mut self, frame: Frame) {
        if self.frames.len() == self.frames.capacity() {
            self.frames.reserve(MIN_GROWTH);
        }
        self.frames.push(frame);
    }

    pub(crate) fn pop(&mut self) -> Result<Frame, LoadError> {
        self.frames
            .pop()
            .ok_or(LoadError::Internal("popped an empty stack"))
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn top_index(&self) -> Result<usize, LoadError> {
        self.frames
            .len()
            .checked_sub(1)
            .ok_or(LoadError::Internal("stack is empty"))
    }

    pub(crate) fn get(&self, index: usize) -> &Frame {
        &self.frames[index]
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> &mut Frame {
        &mut self.frames[index]
    }
}
