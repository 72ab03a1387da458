//! [`SourceStore`] implementations: a local directory and an in-memory file
//! map.

use std::{
  collections::BTreeMap,
  fs::File,
  io::{self, Read},
  path::{Path, PathBuf},
};

use epiwatch_core::{Error, Result, source::SourceStore};

// ─── LocalSource ─────────────────────────────────────────────────────────────

/// Files under a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalSource {
  root: PathBuf,
}

impl LocalSource {
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  pub fn root(&self) -> &Path { &self.root }

  fn resolve(&self, path: &str) -> PathBuf {
    path
      .split('/')
      .filter(|part| !part.is_empty())
      .fold(self.root.clone(), |acc, part| acc.join(part))
  }
}

fn io_error(path: &Path, source: io::Error) -> Error {
  if source.kind() == io::ErrorKind::NotFound {
    Error::SourceFileMissing(path.display().to_string())
  } else {
    Error::Io { path: path.display().to_string(), source }
  }
}

impl SourceStore for LocalSource {
  fn exists(&self, path: &str) -> Result<bool> { Ok(self.resolve(path).exists()) }

  fn list(&self, prefix: &str) -> Result<Vec<String>> {
    let start = self.resolve(prefix);
    if !start.is_dir() {
      return Err(Error::SourceFileMissing(start.display().to_string()));
    }

    let mut files = Vec::new();
    let mut pending = vec![start];

    while let Some(dir) = pending.pop() {
      let entries = std::fs::read_dir(&dir).map_err(|e| io_error(&dir, e))?;
      for entry in entries {
        let entry = entry.map_err(|e| io_error(&dir, e))?;
        let path = entry.path();
        // `file_type` does not follow symlinks; linked directories are not
        // walked, so a link back up the tree cannot loop.
        let file_type = entry.file_type().map_err(|e| io_error(&path, e))?;
        if file_type.is_dir() {
          pending.push(path);
          continue;
        }
        if file_type.is_symlink() && path.is_dir() {
          continue;
        }
        let Ok(relative) = path.strip_prefix(&self.root) else {
          continue;
        };
        let key = relative
          .components()
          .map(|c| c.as_os_str().to_string_lossy())
          .collect::<Vec<_>>()
          .join("/");
        files.push(key);
      }
    }

    files.sort();
    Ok(files)
  }

  fn open(&self, path: &str) -> Result<Box<dyn Read + Send + '_>> {
    let full = self.resolve(path);
    let file = File::open(&full).map_err(|e| io_error(&full, e))?;
    Ok(Box::new(file))
  }

  fn describe(&self) -> String { self.root.display().to_string() }
}

// ─── MemorySource ────────────────────────────────────────────────────────────

/// An in-memory file tree keyed by `/`-separated path. Used by tests and by
/// callers that fetch source files from somewhere other than a local disk.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
  files: BTreeMap<String, Vec<u8>>,
}

impl MemorySource {
  pub fn new() -> Self { Self::default() }

  pub fn insert(&mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) {
    self.files.insert(path.into(), contents.into());
  }

  /// Builder-style [`MemorySource::insert`].
  pub fn with_file(mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
    self.insert(path, contents);
    self
  }

  fn is_dir(&self, prefix: &str) -> bool {
    if prefix.is_empty() {
      return true;
    }
    let dir = format!("{prefix}/");
    self.files.keys().any(|k| k.starts_with(&dir))
  }
}

impl SourceStore for MemorySource {
  fn exists(&self, path: &str) -> Result<bool> {
    let path = path.trim_matches('/');
    Ok(self.files.contains_key(path) || self.is_dir(path))
  }

  fn list(&self, prefix: &str) -> Result<Vec<String>> {
    let prefix = prefix.trim_matches('/');
    if !self.is_dir(prefix) {
      return Err(Error::SourceFileMissing(format!("memory:/{prefix}")));
    }
    let dir = if prefix.is_empty() { String::new() } else { format!("{prefix}/") };
    Ok(
      self
        .files
        .keys()
        .filter(|k| k.starts_with(&dir))
        .cloned()
        .collect(),
    )
  }

  fn open(&self, path: &str) -> Result<Box<dyn Read + Send + '_>> {
    let path = path.trim_matches('/');
    let bytes = self
      .files
      .get(path)
      .ok_or_else(|| Error::SourceFileMissing(format!("memory:/{path}")))?;
    Ok(Box::new(bytes.as_slice()))
  }

  fn describe(&self) -> String { format!("memory ({} files)", self.files.len()) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn memory_listing_is_recursive_and_scoped() {
    let src = MemorySource::new()
      .with_file("IL/a.csv", "x")
      .with_file("IL/old/b.csv", "y")
      .with_file("TX/c.csv", "z");

    assert_eq!(src.list("").unwrap().len(), 3);
    assert_eq!(src.list("IL").unwrap(), vec!["IL/a.csv", "IL/old/b.csv"]);
    assert!(src.exists("TX").unwrap());
    assert!(!src.exists("CA").unwrap());
  }

  #[test]
  fn memory_missing_paths() {
    let src = MemorySource::new().with_file("IL/a.csv", "x");
    assert!(matches!(src.list("CA"), Err(Error::SourceFileMissing(_))));
    assert!(matches!(src.open("IL/b.csv"), Err(Error::SourceFileMissing(_))));

    let mut buf = String::new();
    src.open("IL/a.csv").unwrap().read_to_string(&mut buf).unwrap();
    assert_eq!(buf, "x");
  }

  #[test]
  fn local_source_lists_relative_keys() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("IL")).unwrap();
    std::fs::write(dir.path().join("IL/20250101-000000_IL_a.csv"), "h\n").unwrap();
    std::fs::write(dir.path().join("top.csv"), "h\n").unwrap();

    let src = LocalSource::new(dir.path());
    assert_eq!(src.list("").unwrap(), vec!["IL/20250101-000000_IL_a.csv", "top.csv"]);
    assert_eq!(src.list("IL").unwrap(), vec!["IL/20250101-000000_IL_a.csv"]);
    assert!(src.exists("IL/20250101-000000_IL_a.csv").unwrap());
  }

  #[cfg(unix)]
  #[test]
  fn local_source_does_not_follow_directory_links() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("IL")).unwrap();
    std::fs::write(dir.path().join("IL/a.csv"), "h\n").unwrap();
    std::os::unix::fs::symlink(dir.path(), dir.path().join("IL/loop")).unwrap();
    std::os::unix::fs::symlink(dir.path().join("IL/a.csv"), dir.path().join("IL/linked.csv"))
      .unwrap();

    let src = LocalSource::new(dir.path());
    assert_eq!(src.list("").unwrap(), vec!["IL/a.csv", "IL/linked.csv"]);
  }

  #[test]
  fn local_source_missing_root() {
    let dir = tempfile::tempdir().unwrap();
    let src = LocalSource::new(dir.path().join("nope"));
    assert!(matches!(src.list(""), Err(Error::SourceFileMissing(_))));
    assert!(matches!(src.open("x.csv"), Err(Error::SourceFileMissing(_))));
  }
}
