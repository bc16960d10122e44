#![no_main]

use cyaml_schema::{load_str, Field, Schema, SchemaKind};
use libfuzzer_sys::fuzz_target;

#[repr(C)]
struct Leaf {
    n: i32,
    s_ptr: *mut u8,
}

static N_SCHEMA: Schema = Schema::new(SchemaKind::Int { width: 4 }, 4);
static S_SCHEMA: Schema = Schema::owning(SchemaKind::String, 0);
static LEAF_FIELDS: [Field; 2] = [
    Field {
        key: "n",
        offset: 0,
        schema: &N_SCHEMA,
    },
    Field {
        key: "s",
        offset: 8,
        schema: &S_SCHEMA,
    },
];
static LEAF_SCHEMA: Schema = Schema::new(
    SchemaKind::Mapping {
        fields: &LEAF_FIELDS,
    },
    std::mem::size_of::<Leaf>(),
);

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let _ = load_str::<Leaf>(text, &LEAF_SCHEMA);
});
