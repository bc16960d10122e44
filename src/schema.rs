//! The schema surface: the caller-declared description of where parsed
//! values go. A `Schema` tree is built once, usually as `static` data, and
//! shared by every load that uses it.

/// Bits describing how a field's storage is owned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaFlags(u8);

impl SchemaFlags {
    pub const NONE: Self = Self(0);
    /// The field holds a pointer to a heap block the loader allocates (and
    /// the returned [`crate::Document`] later frees).
    pub const OWNING_POINTER: Self = Self(1 << 0);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl core::ops::BitOr for SchemaFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// One named, offset-addressed slot inside a [`SchemaKind::Mapping`].
#[derive(Debug)]
pub struct Field {
    pub key: &'static str,
    pub offset: usize,
    pub schema: &'static Schema,
}

/// A node in the schema tree. Mirrors the shape of the data the loader is
/// expected to produce at a given address: scalars, a keyed aggregate, or a
/// homogeneous run of elements.
#[derive(Debug)]
pub enum SchemaKind {
    Int { width: usize },
    UInt { width: usize },
    Bool,
    Enum { width: usize, values: &'static [(&'static str, i64)] },
    String,
    /// Declared but not implemented by this loader; always rejected with
    /// [`crate::LoadError::BadTypeInSchema`].
    Flags,
    /// Declared but not implemented by this loader; always rejected with
    /// [`crate::LoadError::BadTypeInSchema`].
    Ignore,
    Mapping { fields: &'static [Field] },
    Sequence {
        element: &'static Schema,
        count_offset: usize,
        count_width: usize,
    },
    SequenceFixed {
        element: &'static Schema,
        count: usize,
    },
}

/// A schema node together with the size of the value it describes and its
/// ownership flags.
#[derive(Debug)]
pub struct Schema {
    pub kind: SchemaKind,
    /// Size in bytes of one value of this kind when stored inline (for
    /// `OWNING_POINTER` fields, the size of the pointer itself is
    /// `size_of::<*mut u8>()`, tracked separately by the placement engine;
    /// this field is the size of the pointee).
    pub size: usize,
    pub flags: SchemaFlags,
}

impl Schema {
    pub const fn new(kind: SchemaKind, size: usize) -> Self {
        Self { kind, size, flags: SchemaFlags::NONE }
    }

    pub const fn owning(kind: SchemaKind, size: usize) -> Self {
        Self { kind, size, flags: SchemaFlags::OWNING_POINTER }
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self.kind {
            SchemaKind::Int { .. } => "int",
            SchemaKind::UInt { .. } => "uint",
            SchemaKind::Bool => "bool",
            SchemaKind::Enum { .. } => "enum",
            SchemaKind::String => "string",
            SchemaKind::Flags => "flags",
            SchemaKind::Ignore => "ignore",
            SchemaKind::Mapping { .. } => "mapping",
            SchemaKind::Sequence { .. } => "sequence",
            SchemaKind::SequenceFixed { .. } => "sequence_fixed",
        }
    }
}
