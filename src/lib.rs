#![doc = include_str!("../README.md")]
#![doc(html_root_url = "https://docs.rs/cyaml-schema")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod config;
mod document;
mod engine;
mod error;
mod event_pump;
mod frame;
mod placement;
mod scalar;
mod schema;
mod state_machine;

pub use config::{Config, LogLevel};
pub use document::Document;
pub use engine::{load_reader, load_reader_with_config, load_str, load_str_with_config};
pub use error::LoadError;
pub use schema::{Field, Schema, SchemaFlags, SchemaKind};

#[cfg(test)]
mod tests {
    use std::mem::size_of;

    use pretty_assertions::assert_eq;

    use super::*;

    static INT4: Schema = Schema::new(SchemaKind::Int { width: 4 }, 4);
    static INT2: Schema = Schema::new(SchemaKind::Int { width: 2 }, 2);

    #[repr(C)]
    struct Flat {
        a: i32,
    }
    static FLAT_FIELDS: [Field; 1] = [Field {
        key: "a",
        offset: 0,
        schema: &INT4,
    }];
    static FLAT_SCHEMA: Schema = Schema::new(
        SchemaKind::Mapping {
            fields: &FLAT_FIELDS,
        },
        size_of::<Flat>(),
    );

    #[test]
    fn flat_mapping_of_one_int() {
        let doc: Document<Flat> = load_str("a: 7\n", &FLAT_SCHEMA).unwrap();
        assert_eq!(doc.a, 7);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = load_str::<Flat>("a: 1\nb: 2\n", &FLAT_SCHEMA).unwrap_err();
        assert!(matches!(err, LoadError::InvalidKey(_)));
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let err = load_str::<Flat>("a: 1\na: 2\n", &FLAT_SCHEMA).unwrap_err();
        assert!(matches!(err, LoadError::InvalidKey(_)));
    }

    #[test]
    fn top_level_scalar_is_rejected() {
        let err = load_str::<i32>("42\n", &INT4).unwrap_err();
        assert!(matches!(err, LoadError::BadTopLevelType));
    }

    #[repr(C)]
    struct FlatI16 {
        a: i16,
    }
    static FLAT_I16_FIELDS: [Field; 1] = [Field {
        key: "a",
        offset: 0,
        schema: &INT2,
    }];
    static FLAT_I16_SCHEMA: Schema = Schema::new(
        SchemaKind::Mapping {
            fields: &FLAT_I16_FIELDS,
        },
        size_of::<FlatI16>(),
    );

    #[test]
    fn integer_overflow_is_rejected() {
        let err = load_str::<FlatI16>("a: 40000\n", &FLAT_I16_SCHEMA).unwrap_err();
        assert!(matches!(err, LoadError::InvalidValue(_)));
    }

    // `xs_ptr` (8 bytes) followed by `count: u32` lands `count` at offset 8
    // on a 64-bit target, with 4 bytes of trailing padding to keep the
    // struct 8-byte aligned.
    #[repr(C)]
    struct WithSeq {
        xs_ptr: *mut u16,
        count: u32,
    }
    static U16_ELEMENT: Schema = Schema::new(SchemaKind::UInt { width: 2 }, 2);
    static SEQ_SCHEMA: Schema = Schema::owning(
        SchemaKind::Sequence {
            element: &U16_ELEMENT,
            count_offset: 8,
            count_width: 4,
        },
        0,
    );
    static WITH_SEQ_FIELDS: [Field; 1] = [Field {
        key: "xs",
        offset: 0,
        schema: &SEQ_SCHEMA,
    }];
    static WITH_SEQ_SCHEMA: Schema = Schema::new(
        SchemaKind::Mapping {
            fields: &WITH_SEQ_FIELDS,
        },
        size_of::<WithSeq>(),
    );

    #[test]
    fn sequence_of_u16_with_owning_storage() {
        let doc: Document<WithSeq> = load_str("xs: [1, 2, 3]\n", &WITH_SEQ_SCHEMA).unwrap();
        assert_eq!(doc.count, 3);
        let values = unsafe { std::slice::from_raw_parts(doc.xs_ptr.cast_const(), 3) };
        assert_eq!(values, &[1, 2, 3]);
    }

    // `names_ptr` (8 bytes) followed by `count: u32` holds an array of
    // individually heap-allocated, NUL-terminated strings (`*mut u8` slots),
    // exercising both the per-element string allocation in the placement
    // engine and the per-element free in the `Drop` walk.
    #[repr(C)]
    struct WithStringSeq {
        names_ptr: *mut *mut u8,
        count: u32,
    }
    static STRING_ELEMENT: Schema = Schema::owning(SchemaKind::String, size_of::<*mut u8>());
    static STRING_SEQ_SCHEMA: Schema = Schema::owning(
        SchemaKind::Sequence {
            element: &STRING_ELEMENT,
            count_offset: 8,
            count_width: 4,
        },
        0,
    );
    static WITH_STRING_SEQ_FIELDS: [Field; 1] = [Field {
        key: "names",
        offset: 0,
        schema: &STRING_SEQ_SCHEMA,
    }];
    static WITH_STRING_SEQ_SCHEMA: Schema = Schema::new(
        SchemaKind::Mapping {
            fields: &WITH_STRING_SEQ_FIELDS,
        },
        size_of::<WithStringSeq>(),
    );

    #[test]
    fn sequence_of_owning_strings() {
        let doc: Document<WithStringSeq> =
            load_str("names: [alice, bob, carol]\n", &WITH_STRING_SEQ_SCHEMA).unwrap();
        assert_eq!(doc.count, 3);
        let ptrs = unsafe { std::slice::from_raw_parts(doc.names_ptr.cast_const(), 3) };
        let expect = ["alice", "bob", "carol"];
        for (ptr, want) in ptrs.iter().zip(expect) {
            let cstr = unsafe { std::ffi::CStr::from_ptr((*ptr).cast()) };
            assert_eq!(cstr.to_str().unwrap(), want);
        }
        // Dropping `doc` here walks the schema and frees both the pointer
        // array and each individually-allocated string; an interposing
        // allocator test would catch a leak if the per-element free in
        // `document::free_sequence_elements` were ever skipped again.
    }

    #[test]
    fn alias_is_unsupported() {
        let err = load_str::<WithSeq>("xs: [1, *x]\n", &WITH_SEQ_SCHEMA).unwrap_err();
        assert!(matches!(err, LoadError::Alias));
    }

    #[repr(C)]
    struct FlagStruct {
        flag: u8,
    }
    static BOOL_SCHEMA: Schema = Schema::new(SchemaKind::Bool, 1);
    static FLAG_FIELDS: [Field; 1] = [Field {
        key: "flag",
        offset: 0,
        schema: &BOOL_SCHEMA,
    }];
    static FLAG_SCHEMA: Schema = Schema::new(
        SchemaKind::Mapping {
            fields: &FLAG_FIELDS,
        },
        size_of::<FlagStruct>(),
    );

    #[test]
    fn bool_scalar() {
        let doc: Document<FlagStruct> = load_str("flag: yes\n", &FLAG_SCHEMA).unwrap();
        assert_eq!(doc.flag, 1);
    }

    #[repr(C)]
    struct ColorStruct {
        color: i32,
    }
    static COLOR_VALUES: [(&str, i64); 2] = [("RED", 1), ("GREEN", 2)];
    static ENUM_SCHEMA: Schema = Schema::new(
        SchemaKind::Enum {
            width: 4,
            values: &COLOR_VALUES,
        },
        4,
    );
    static COLOR_FIELDS: [Field; 1] = [Field {
        key: "color",
        offset: 0,
        schema: &ENUM_SCHEMA,
    }];
    static COLOR_SCHEMA: Schema = Schema::new(
        SchemaKind::Mapping {
            fields: &COLOR_FIELDS,
        },
        size_of::<ColorStruct>(),
    );

    #[test]
    fn enum_scalar() {
        let doc: Document<ColorStruct> = load_str("color: RED\n", &COLOR_SCHEMA).unwrap();
        assert_eq!(doc.color, 1);

        let err = load_str::<ColorStruct>("color: BLUE\n", &COLOR_SCHEMA).unwrap_err();
        assert!(matches!(err, LoadError::InvalidValue(_)));
    }

    #[repr(C)]
    struct Inner {
        inner: i32,
    }
    static INNER_FIELDS: [Field; 1] = [Field {
        key: "inner",
        offset: 0,
        schema: &INT4,
    }];
    static OWNING_INNER_SCHEMA: Schema = Schema::owning(
        SchemaKind::Mapping {
            fields: &INNER_FIELDS,
        },
        size_of::<Inner>(),
    );

    #[repr(C)]
    struct Outer {
        outer_ptr: *mut Inner,
    }
    static OUTER_FIELDS: [Field; 1] = [Field {
        key: "outer",
        offset: 0,
        schema: &OWNING_INNER_SCHEMA,
    }];
    static OUTER_SCHEMA: Schema = Schema::new(
        SchemaKind::Mapping {
            fields: &OUTER_FIELDS,
        },
        size_of::<Outer>(),
    );

    #[test]
    fn nested_mapping_with_owning_pointer_child() {
        let doc: Document<Outer> = load_str("outer: {inner: 9}\n", &OUTER_SCHEMA).unwrap();
        assert!(!doc.outer_ptr.is_null());
        let inner = unsafe { &*doc.outer_ptr };
        assert_eq!(inner.inner, 9);
    }

    #[repr(C)]
    struct OwningScalarStruct {
        count_ptr: *mut i32,
    }
    static OWNING_INT4: Schema = Schema::owning(SchemaKind::Int { width: 4 }, 4);
    static OWNING_SCALAR_FIELDS: [Field; 1] = [Field {
        key: "count",
        offset: 0,
        schema: &OWNING_INT4,
    }];
    static OWNING_SCALAR_SCHEMA: Schema = Schema::new(
        SchemaKind::Mapping {
            fields: &OWNING_SCALAR_FIELDS,
        },
        size_of::<OwningScalarStruct>(),
    );

    #[test]
    fn owning_pointer_scalar_is_allocated_and_linked() {
        let doc: Document<OwningScalarStruct> =
            load_str("count: 9\n", &OWNING_SCALAR_SCHEMA).unwrap();
        assert!(!doc.count_ptr.is_null());
        // Dropping `doc` frees this allocation via `free_owning_scalar`; a
        // leaked allocation here previously went unnoticed because
        // `write_scalar` never allocated it in the first place.
        assert_eq!(unsafe { *doc.count_ptr }, 9);
    }

    #[test]
    fn reader_entry_point_matches_str_entry_point() {
        let doc: Document<Flat> = load_reader("a: 9\n".as_bytes(), &FLAT_SCHEMA).unwrap();
        assert_eq!(doc.a, 9);
    }

    #[test]
    fn config_log_sink_receives_error() {
        use std::cell::RefCell;
        let messages: RefCell<Vec<String>> = RefCell::new(Vec::new());
        let config = Config {
            log_sink: Some(Box::new(|_level, msg| messages.borrow_mut().push(msg.to_string()))),
            log_level: LogLevel::Error,
        };
        let err = load_str_with_config::<Flat>("a: 1\nb: 2\n", &FLAT_SCHEMA, &config).unwrap_err();
        assert!(matches!(err, LoadError::InvalidKey(_)));
        assert_eq!(messages.borrow().len(), 1);
    }
}
