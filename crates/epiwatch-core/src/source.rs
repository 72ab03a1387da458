//! The `SourceStore` trait: the file listing and open capability the
//! transformers receive from their caller.
//!
//! Paths are `/`-separated and relative to the store's root, in the manner of
//! blob-storage object keys. The transformers never touch the filesystem
//! directly; local directories, in-memory fixtures and blob containers are
//! all just implementations of this trait.

use std::io::Read;

use crate::Result;

pub trait SourceStore: Send + Sync {
  /// Whether `path` names an existing file or directory. The empty path is
  /// the root.
  fn exists(&self, path: &str) -> Result<bool>;

  /// Every file below `prefix`, recursively, as root-relative paths.
  ///
  /// Order is unspecified. Returns [`crate::Error::SourceFileMissing`] if the
  /// prefix itself does not exist.
  fn list(&self, prefix: &str) -> Result<Vec<String>>;

  /// Open a file for reading.
  fn open(&self, path: &str) -> Result<Box<dyn Read + Send + '_>>;

  /// A human-readable location for log lines, e.g. a directory path.
  fn describe(&self) -> String;
}

/// The final `/`-separated component of `path`.
pub fn file_name(path: &str) -> &str {
  path.rsplit('/').next().unwrap_or(path)
}

/// Join two `/`-separated path fragments, ignoring empty ones.
pub fn join(prefix: &str, rest: &str) -> String {
  let prefix = prefix.trim_end_matches('/');
  let rest = rest.trim_start_matches('/');
  match (prefix.is_empty(), rest.is_empty()) {
    (true, _) => rest.to_owned(),
    (_, true) => prefix.to_owned(),
    _ => format!("{prefix}/{rest}"),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn file_name_takes_last_component() {
    assert_eq!(file_name("IL/20250601-120000_IL_bob.csv"), "20250601-120000_IL_bob.csv");
    assert_eq!(file_name("plain.csv"), "plain.csv");
  }

  #[test]
  fn join_skips_empty_sides() {
    assert_eq!(join("", "a.csv"), "a.csv");
    assert_eq!(join("IL/", "/a.csv"), "IL/a.csv");
    assert_eq!(join("IL", ""), "IL");
  }
}
