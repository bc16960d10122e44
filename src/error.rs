use thiserror::Error;

/// Everything that can keep a load from producing a tree.
///
/// Every variant is terminal: the drive loop never retries or degrades, it
/// returns the first error a handler produces.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Kept for taxonomy parity with schema-optional loaders; this crate's
    /// schema parameter is a non-optional reference, so this variant is
    /// never constructed (see `DESIGN.md`).
    #[error("schema must not be null")]
    BadParamNullSchema,

    #[error("schema's top-level node must be a mapping")]
    BadTopLevelType,

    #[error("could not read input")]
    FileOpen(#[source] std::io::Error),

    #[error("could not initialize the yaml parser")]
    LibyamlParserInit,

    #[error("yaml parser error: {0}")]
    LibyamlParser(#[from] saphyr_parser::ScanError),

    #[error("unexpected event: expected {expected}, found {found}")]
    UnexpectedEvent {
        expected: &'static str,
        found: &'static str,
    },

    #[error("YAML aliases are not supported")]
    Alias,

    #[error("mapping key {0:?} has no matching schema field, or repeats a key already seen in this mapping")]
    InvalidKey(String),

    #[error("value does not match schema: {0}")]
    InvalidValue(String),

    #[error("schema node kind {0:?} is not implemented by the loader")]
    BadTypeInSchema(&'static str),

    #[error("allocation failed")]
    Oom,

    #[error("internal loader invariant violated: {0}")]
    Internal(&'static str),
}

pub type Result<T> = core::result::Result<T, LoadError>;
