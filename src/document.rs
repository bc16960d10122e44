//! The handle returned on a successful load, and the schema-directed free
//! walk that replaces the original's separate "free this tree" routine.
//!
//! There is no public function that frees a `Document` by hand: dropping it
//! is the only way, which rules out the double-free and wrong-schema bugs a
//! caller-invoked free routine is exposed to.

use std::marker::PhantomData;

use crate::placement;
use crate::schema::{Schema, SchemaFlags, SchemaKind};

/// Owns a tree built by [`crate::load_str`] or [`crate::load_reader`].
///
/// `T` is the Rust type the caller expects the root mapping's layout to
/// match; `Document` does not itself check that `T`'s layout agrees with
/// the schema used to build it; that is the caller's responsibility when
/// choosing a schema for a given `T` (see `DESIGN.md`).
pub struct Document<T> {
    root: *mut u8,
    schema: &'static Schema,
    _marker: PhantomData<T>,
}

impl<T> Document<T> {
    /// # Safety
    /// `root` must be a live allocation of `schema.size` bytes laid out
    /// according to `schema`, exclusively owned by the caller of this
    /// function.
    pub(crate) unsafe fn new(root: *mut u8, schema: &'static Schema) -> Self {
        Self {
            root,
            schema,
            _marker: PhantomData,
        }
    }
}

impl<T> core::ops::Deref for Document<T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.root.cast::<T>() }
    }
}

impl<T> Drop for Document<T> {
    fn drop(&mut self) {
        unsafe { free_tree(self.root, self.schema) };
    }
}

/// Releases a whole tree rooted at `root`, including `root` itself. Used
/// both by [`Document`]'s `Drop` and by the load entry points to clean up a
/// partially built tree after a failed load.
///
/// # Safety
/// `root` must be a live allocation of `schema.size` bytes laid out
/// according to `schema`, not aliased elsewhere.
pub(crate) unsafe fn free_tree(root: *mut u8, schema: &Schema) {
    unsafe {
        free_aggregate(root, schema);
        placement::dealloc_block(root, schema.size);
    }
}

/// Releases every owned allocation reachable from `base`, laid out
/// according to `schema`, without freeing `base` itself.
///
/// # Safety
/// `base` must be valid for `schema.size` readable/writable bytes, laid out
/// exactly as `schema` describes, with every `OWNING_POINTER` slot either
/// null or pointing at a live allocation this module created.
unsafe fn free_aggregate(base: *mut u8, schema: &Schema) {
    let SchemaKind::Mapping { fields } = &schema.kind else {
        return;
    };
    for field in *fields {
        unsafe {
            free_field(base.add(field.offset), base, field.schema);
        }
    }
}

/// `field_addr` is the slot for `schema` itself; `parent_base` is the
/// enclosing aggregate, needed only to locate a sequence's count field.
unsafe fn free_field(field_addr: *mut u8, parent_base: *mut u8, schema: &Schema) {
    match &schema.kind {
        // The allocation's size is the scalar's own width, not
        // `schema.size` — for a sequence's element schema, `size` instead
        // holds the array's per-slot stride (see `place_owning_scalar`).
        SchemaKind::Int { width } | SchemaKind::UInt { width } => unsafe {
            free_owning_scalar(field_addr, schema, *width);
        },
        SchemaKind::Bool => unsafe { free_owning_scalar(field_addr, schema, 1) },
        SchemaKind::Enum { width, .. } => unsafe { free_owning_scalar(field_addr, schema, *width) },

        SchemaKind::Flags | SchemaKind::Ignore => {}

        SchemaKind::String => {
            if schema.flags.contains(SchemaFlags::OWNING_POINTER) {
                let ptr = unsafe { placement::read_pointer(field_addr) };
                if !ptr.is_null() {
                    let len = unsafe { placement::cstr_len(ptr) } + 1;
                    unsafe { placement::dealloc_block(ptr, len) };
                }
            }
        }

        SchemaKind::Mapping { .. } => {
            if schema.flags.contains(SchemaFlags::OWNING_POINTER) {
                let ptr = unsafe { placement::read_pointer(field_addr) };
                if !ptr.is_null() {
                    unsafe {
                        free_aggregate(ptr, schema);
                        placement::dealloc_block(ptr, schema.size);
                    }
                }
            } else {
                unsafe { free_aggregate(field_addr, schema) };
            }
        }

        SchemaKind::Sequence {
            element,
            count_offset,
            count_width,
        } => {
            let ptr = unsafe { placement::read_pointer(field_addr) };
            if ptr.is_null() {
                return;
            }
            let count = unsafe {
                placement::read_uint(parent_base.add(*count_offset), *count_width)
            } as usize;
            unsafe {
                free_sequence_elements(ptr, element, count);
                placement::dealloc_block(ptr, element.size * count);
            }
        }

        SchemaKind::SequenceFixed { element, count } => {
            if schema.flags.contains(SchemaFlags::OWNING_POINTER) {
                let ptr = unsafe { placement::read_pointer(field_addr) };
                if !ptr.is_null() {
                    unsafe {
                        free_sequence_elements(ptr, element, *count);
                        placement::dealloc_block(ptr, element.size * count);
                    }
                }
            } else {
                unsafe { free_sequence_elements(field_addr, element, *count) };
            }
        }
    }
}

/// Releases the owning allocation of a single non-string, non-aggregate
/// scalar field, if any. `width` is the scalar's own width (see
/// `place_owning_scalar` in `state_machine.rs`), not `schema.size`.
///
/// # Safety
/// `field_addr` must be valid for `size_of::<*mut u8>()` readable bytes,
/// holding either null or a live allocation of `width` bytes this module
/// created.
unsafe fn free_owning_scalar(field_addr: *mut u8, schema: &Schema, width: usize) {
    if !schema.flags.contains(SchemaFlags::OWNING_POINTER) {
        return;
    }
    let ptr = unsafe { placement::read_pointer(field_addr) };
    if !ptr.is_null() {
        unsafe { placement::dealloc_block(ptr, width) };
    }
}

/// `storage` has no enclosing aggregate of its own (it *is* the array), but
/// every element kind [`free_field`] treats specially (`Mapping`, `String`,
/// and an owning-pointer scalar) ignores its `parent_base` argument, so
/// passing `storage` again is safe.
unsafe fn free_sequence_elements(storage: *mut u8, element: &Schema, count: usize) {
    let is_owning_scalar = matches!(
        element.kind,
        SchemaKind::Int { .. } | SchemaKind::UInt { .. } | SchemaKind::Bool | SchemaKind::Enum { .. }
    ) && element.flags.contains(SchemaFlags::OWNING_POINTER);
    let needs_free =
        matches!(element.kind, SchemaKind::Mapping { .. } | SchemaKind::String) || is_owning_scalar;
    if !needs_free {
        return;
    }
    for i in 0..count {
        let elem_addr = unsafe { storage.add(i * element.size) };
        unsafe { free_field(elem_addr, storage, element) };
    }
}
