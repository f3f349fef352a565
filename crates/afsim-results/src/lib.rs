//! Result-file engine for AFSIM simulation output.
//!
//! A run leaves a directory of heterogeneous files behind. This crate finds
//! them ([`list_result_files`]), parses each supported format into
//! normalized [`ResultRecord`](afsim_core::ResultRecord)s, and answers
//! queries, summaries and JSON exports over them.
//!
//! # Architecture
//!
//! - [`CsvSource`], [`EvtSource`] and [`AerSource`] implement
//!   [`RecordSource`], a restartable lazy stream of records
//! - [`query_results`] and the per-format `query_*` functions filter and
//!   paginate any source
//! - [`get_results_summary`] and [`export_results_to_json`] share the same
//!   stream and never hold more than one record at a time
//! - [`AerWriter`] produces the binary format, for fixtures and tools
//!
//! Parsers are tolerant: malformed rows and records are skipped and
//! counted, a trailing partial binary record marks the result truncated.
//!
//! # AER format
//!
//! ```text
//! [MAGIC "WAER"] [VERSION u16] [FLAGS u16]
//! [Record 1] [Record 2] ... [Record N]
//!
//! Record: [TYPE u16] [FLAGS u16] [TIME f64] [BODY_LEN u32] [BODY]
//! Body:   [FIELD_COUNT u16] { [NAME u16-prefixed] [TAG u8] [VALUE] }*
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod csv;
pub mod discover;
pub mod error;
pub mod evt;
pub mod export;
pub mod query;
pub mod reader;
pub mod source;
pub mod summary;
pub mod value;
pub mod writer;

pub use csv::CsvSource;
pub use discover::{detect_format, list_result_files, ResultFileInfo};
pub use error::ResultError;
pub use evt::EvtSource;
pub use export::{default_export_path, export_results_to_json, read_json_export, JsonExport};
pub use query::{
    query_aer_results, query_csv_results, query_evt_results, query_results, run_query, Filter,
    Predicate, QueryOptions, QueryResult, DEFAULT_MAX_ROWS,
};
pub use reader::{AerReader, AerSource};
pub use source::{open_source, ReadItem, RecordSource, RecordStream, SkipReason, SourceLocation};
pub use summary::{
    get_results_summary, summarize_directory, DirectorySummary, FieldStats, ResultSummary,
};
pub use writer::AerWriter;

/// Magic bytes at the start of every AER file.
pub const MAGIC: [u8; 4] = *b"WAER";

/// Newest AER version this build understands. Newer files are still read.
pub const FORMAT_VERSION: u16 = 1;

/// Largest accepted AER record body. Anything bigger is a corrupt tail.
pub const MAX_BODY_LEN: u32 = 16 * 1024 * 1024;
