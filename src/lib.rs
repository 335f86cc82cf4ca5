//! SNUG parser and encoder.
//!
//! SNUG is an indentation-based configuration format: significant leading
//! spaces instead of braces, typed scalars (numbers, booleans, null and
//! undefined, dates, strings), inline and multi-line arrays, triple-quoted
//! block strings, repeated-key merging with an explicit `[]key` force-array
//! marker, and file imports via `@"path"` and `@@"path"`.
//!
//! # Decoding Pipeline
//!
//! Decoding runs in two phases:
//!
//! 1. **Scanner**: Frames source text into lines, trimming CRLF endings and
//!    counting indentation.
//!
//! 2. **Parser**: A single forward pass over the line table with an
//!    indent-keyed stack of open objects, dispatching each line's value as
//!    a scalar, inline array, multi-line array, or block string, and
//!    resolving import directives as it goes.
//!
//! # Example
//!
//! ```
//! use libsnug::decode;
//!
//! let tree = decode("name \"John\"\nage 30\nactive true\n").unwrap();
//! let obj = tree.as_object().unwrap();
//! assert_eq!(obj.get("name").and_then(|v| v.as_str()), Some("John"));
//! assert_eq!(obj.get("age").and_then(|v| v.as_number()), Some(30.0));
//! ```

mod encode;
mod error;
mod import;
mod parser;
mod scanner;
mod value;

pub use encode::encode;
pub use error::{DecodeError, EncodeError, ErrorKind, Result};
pub use import::{FileSource, FsSource};
pub use value::Value;

use import::Importer;
use std::path::PathBuf;

/// Options for a decode call.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Directory against which relative import paths resolve. Defaults to
    /// the process working directory.
    pub base_dir: PathBuf,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            base_dir: std::env::current_dir().unwrap_or_default(),
        }
    }
}

/// Decode a SNUG document into a value tree.
///
/// The root of a decode is always an object; empty input yields an empty
/// object. Imports resolve relative to the process working directory.
///
/// # Example
///
/// ```
/// use libsnug::{decode, Value};
///
/// let tree = decode("item \"first\"\nitem \"second\"\n").unwrap();
/// let items = tree.as_object().unwrap().get("item").unwrap();
/// assert_eq!(
///     items,
///     &Value::Array(vec![Value::from("first"), Value::from("second")])
/// );
/// ```
pub fn decode(input: &str) -> Result<Value> {
    decode_with_options(input, DecodeOptions::default())
}

/// Decode a SNUG document with explicit options.
pub fn decode_with_options(input: &str, options: DecodeOptions) -> Result<Value> {
    decode_with_source(input, options, &FsSource)
}

/// Decode a SNUG document reading imports through the given [`FileSource`].
///
/// This is the injection point for embedders and tests that want imports
/// served from somewhere other than the filesystem.
pub fn decode_with_source(
    input: &str,
    options: DecodeOptions,
    source: &dyn FileSource,
) -> Result<Value> {
    let lines = scanner::scan(input);
    let mut importer = Importer::new(source);
    parser::Parser::new(&lines, options.base_dir, &mut importer).parse()
}
