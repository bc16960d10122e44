//! Entry points: parameter validation, parser construction, and the
//! drive-loop invocation with cleanup-on-failure.

use std::io::Read;

use crate::config::Config;
use crate::document::{self, Document};
use crate::error::LoadError;
use crate::event_pump::EventPump;
use crate::placement;
use crate::schema::{Schema, SchemaKind};
use crate::state_machine;

/// Loads `input` against `schema` with default configuration (no logging).
///
/// `schema`'s top-level node must be a [`crate::SchemaKind::Mapping`].
pub fn load_str<T>(input: &str, schema: &'static Schema) -> Result<Document<T>, LoadError> {
    load_str_with_config(input, schema, &Config::default())
}

/// Loads `input` against `schema`, routing log messages through `config`.
pub fn load_str_with_config<T>(
    input: &str,
    schema: &'static Schema,
    config: &Config,
) -> Result<Document<T>, LoadError> {
    if !matches!(schema.kind, SchemaKind::Mapping { .. }) {
        return Err(LoadError::BadTopLevelType);
    }

    let root = placement::alloc_zeroed_block(schema.size)?;

    let mut pump = EventPump::new(input);
    match state_machine::drive(schema, root, &mut pump, config) {
        Ok(()) => Ok(unsafe { Document::new(root, schema) }),
        Err(err) => {
            unsafe { document::free_tree(root, schema) };
            Err(err)
        }
    }
}

/// Reads all of `reader` into memory, then loads it against `schema` with
/// default configuration.
pub fn load_reader<T>(reader: impl Read, schema: &'static Schema) -> Result<Document<T>, LoadError> {
    load_reader_with_config(reader, schema, &Config::default())
}

/// Reads all of `reader` into memory, then loads it against `schema`,
/// routing log messages through `config`.
pub fn load_reader_with_config<T>(
    mut reader: impl Read,
    schema: &'static Schema,
    config: &Config,
) -> Result<Document<T>, LoadError> {
    let mut buf = String::new();
    reader
        .read_to_string(&mut buf)
        .map_err(LoadError::FileOpen)?;
    load_str_with_config(&buf, schema, config)
}
