//! Import resolution.
//!
//! A scalar token beginning with `@` names another file whose decoded tree
//! replaces the token at decode time. The `@@` form additionally requires
//! the imported root to hold exactly one key whose value is an array, and
//! yields that array.
//!
//! File access goes through the [`FileSource`] capability so embedders and
//! tests can supply an in-memory source instead of the filesystem.

use crate::error::ErrorKind;
use crate::parser::Parser;
use crate::scanner;
use crate::value::Value;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Capability for reading imported files.
pub trait FileSource {
    /// Read the file at `path` as UTF-8 text.
    fn read_file(&self, path: &Path) -> io::Result<String>;
}

/// Reads imports through the process filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSource;

impl FileSource for FsSource {
    fn read_file(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

/// Resolves import directives during a decode.
///
/// Tracks the chain of files currently being decoded so a self-referential
/// import fails instead of recursing forever. Only the active chain is
/// tracked: two siblings importing the same file is legal.
pub(crate) struct Importer<'s> {
    source: &'s dyn FileSource,
    active: HashSet<PathBuf>,
}

impl<'s> Importer<'s> {
    pub fn new(source: &'s dyn FileSource) -> Self {
        Importer {
            source,
            active: HashSet::new(),
        }
    }

    /// Resolve an import directive against `base_dir`.
    ///
    /// Absolute paths are used verbatim; relative paths resolve against the
    /// directory of the importing file. The imported file decodes with its
    /// own parent directory as the new base, so its imports resolve relative
    /// to itself.
    pub fn resolve(
        &mut self,
        path: &str,
        unwrap: bool,
        base_dir: &Path,
    ) -> std::result::Result<Value, ErrorKind> {
        let resolved = if Path::new(path).is_absolute() {
            PathBuf::from(path)
        } else {
            base_dir.join(path)
        };

        if self.active.contains(&resolved) {
            return Err(ErrorKind::ImportCycle {
                path: path.to_string(),
            });
        }

        let text = self
            .source
            .read_file(&resolved)
            .map_err(|e| ErrorKind::Import {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        let child_base = resolved.parent().map(Path::to_path_buf).unwrap_or_default();
        let lines = scanner::scan(&text);

        self.active.insert(resolved.clone());
        let parsed = Parser::new(&lines, child_base, self).parse();
        self.active.remove(&resolved);

        let tree = parsed.map_err(|e| ErrorKind::Import {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        if unwrap {
            unwrap_single_array(tree, path)
        } else {
            Ok(tree)
        }
    }
}

/// Apply the `@@` shape rule: the imported root must be an object with
/// exactly one key whose value is an array.
fn unwrap_single_array(tree: Value, path: &str) -> std::result::Result<Value, ErrorKind> {
    if let Value::Object(map) = tree {
        if map.len() == 1 {
            let mut entries = map.into_iter();
            if let Some((_, value @ Value::Array(_))) = entries.next() {
                return Ok(value);
            }
        }
    }
    Err(ErrorKind::ImportShape {
        path: path.to_string(),
    })
}
