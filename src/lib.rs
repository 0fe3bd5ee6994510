//! Streaming and in-memory tabular models over delimiter-separated text.
//!
//! - Streaming path: [`StreamingTabularModel`], forward-only, memory bounded by
//!   the configured chunk size whatever the input length.
//! - Materialized path: [`TabularDataModel`] / [`TypedTabularModel`], random
//!   access over fully buffered rows.
//! - Fast local line count: feature `fast_local`, uncompressed local files only.
//!
//! Data shape:
//! - Column names come from `header_rows` leading rows (merged with `_` when
//!   there are several) or are synthesized as `column_<index>`.
//! - Rows are padded to the schema width; wider rows widen the schema.
//!   Width mismatches are never errors.
#![cfg_attr(docsrs, feature(doc_cfg))]
//
mod codec;
#[cfg(feature = "fast_local")]
mod fast;
mod infer;
mod io;
mod options;
mod schema;
mod source;
mod streaming;
mod table;
pub mod text_file;
mod tokenizer;

#[cfg(feature = "fast_local")]
pub use crate::fast::fast_line_count;
pub use crate::infer::{coerce, infer_type, profile_values, DataType, TypeInference, TypedValue, ValueProfiler};
pub use crate::io::{
    build_text_reader, csv_record_stream, line_stream, meta_for_path, reader_from_path, tokenized_rows,
    SourceMeta, TextReader,
};
pub use crate::options::DsvOptions;
pub use crate::schema::{
    dedupe, is_blank, normalize_row, placeholder, placeholder_names, resolve_header, Record, Row, Schema,
};
pub use crate::source::{ChunkedRows, ChunkingOptions, FooterWindow, RowStream, MIN_CHUNK_SIZE};
pub use crate::streaming::{ModelState, StreamingTabularModel, Traversal};
pub use crate::table::{TabularDataModel, TypedTabularModel};
pub use crate::tokenizer::{parse, Tokenizer};

use thiserror::Error;

/// Error type returned by this crate.
#[derive(Debug, Error)]
pub enum DsvError {
    /// Invalid constructor-time settings.
    #[error("Invalid configuration: {0}")]
    Config(String),
    /// Operation not valid in the model's current state.
    #[error("Invalid state: {0}")]
    State(String),
    #[error("Row index {index} out of range (row count {len})")]
    RowOutOfRange { index: usize, len: usize },
    #[error("Column index {index} out of range (column count {len})")]
    ColumnOutOfRange { index: usize, len: usize },
    #[error("Unknown column: {0}")]
    UnknownColumn(String),
    /// Failures from the underlying reader, passed through unchanged.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type DsvResult<T> = std::result::Result<T, DsvError>;
