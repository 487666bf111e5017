// ==============================================================================
// IDL Discovery: Expand Path Specifications into IDL Files
// ==============================================================================
//
// The input is a comma-separated list of files and directories. Files named
// explicitly are taken as-is, whatever their name. Directories are walked
// recursively for `*.idl` files, skipping any whose bare name is in the
// exclusion set. Exclusions never apply to explicitly named files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use walkdir::WalkDir;

use crate::error::{BuildError, Result};
use crate::log::LogSink;

const IDL_SUFFIX: &str = ".idl";

/// One input IDL file, identified by its absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdlFile {
    path: PathBuf,
}

impl IdlFile {
    /// Build an `IdlFile` for `path`, made absolute against the current
    /// directory. Symlinks are not resolved.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path = std::path::absolute(path)
            .map_err(|e| BuildError::io(format!("resolve {}", path.display()), e))?;
        Ok(IdlFile { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The bare file name, e.g. `calc.idl`.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The directory containing this file.
    #[must_use]
    pub fn parent(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("/"))
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

/// Bare file names skipped during directory traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    names: HashSet<String>,
}

impl ExclusionSet {
    /// Parse a comma-separated list of file names. Surrounding whitespace is
    /// trimmed and empty entries are ignored.
    #[must_use]
    pub fn parse(list: &str) -> Self {
        ExclusionSet {
            names: split_list(list).map(str::to_string).collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, file_name: &str) -> bool {
        self.names.contains(file_name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        ExclusionSet {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub(crate) fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Expand a comma-separated path specification into the set of IDL files to
/// process.
///
/// Fails with [`BuildError::PathNotFound`] at the first entry that does not
/// exist. The result is deduplicated by absolute path and keeps first-seen
/// order; an empty result is not an error.
pub fn discover(
    path_spec: &str,
    exclusions: &ExclusionSet,
    log: &dyn LogSink,
) -> Result<IndexSet<IdlFile>> {
    log.debug(&format!("Tokenizing idl-files={path_spec}"));

    let mut found = IndexSet::new();
    for fragment in split_list(path_spec) {
        let path = Path::new(fragment);
        if !path.exists() {
            return Err(BuildError::PathNotFound {
                path: path.to_path_buf(),
            });
        }

        if path.is_dir() {
            walk_directory(path, exclusions, log, &mut found)?;
        } else {
            found.insert(IdlFile::new(path)?);
        }
    }
    Ok(found)
}

fn walk_directory(
    dir: &Path,
    exclusions: &ExclusionSet,
    log: &dyn LogSink,
    found: &mut IndexSet<IdlFile>,
) -> Result<()> {
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // Includes symlink loops, which walkdir detects for us.
                log.warn(&format!("Skipping unreadable entry under {}: {e}", dir.display()));
                continue;
            }
        };
        if entry.file_type().is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if !name.ends_with(IDL_SUFFIX) {
            continue;
        }
        if exclusions.contains(&name) {
            log.debug(&format!("Excluding file: {}", entry.path().display()));
            continue;
        }
        found.insert(IdlFile::new(entry.path())?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{MemorySink, Severity};
    use pretty_assertions::assert_eq;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directory");
        }
        fs::write(path, "struct Empty {}\n").expect("write test file");
    }

    fn names(files: &IndexSet<IdlFile>) -> Vec<String> {
        files.iter().map(IdlFile::file_name).collect()
    }

    fn path_list(parts: &[&Path]) -> String {
        parts
            .iter()
            .map(|p| p.to_str().expect("temp paths are UTF-8"))
            .collect::<Vec<_>>()
            .join(",")
    }

    #[test]
    fn exclusion_set_parsing() {
        let set = ExclusionSet::parse("a.idl, b.idl,,");
        assert!(set.contains("a.idl"));
        assert!(set.contains("b.idl"));
        assert!(!set.contains(""));
        assert!(ExclusionSet::parse("").is_empty());
    }

    #[test]
    fn directory_with_exclusion_and_explicit_file() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let dir_a = tmp.path().join("dirA");
        touch(&dir_a.join("f1.idl"));
        touch(&dir_a.join("f2.idl"));
        touch(&dir_a.join("f2.txt"));
        let x = tmp.path().join("dirB").join("x.idl");
        touch(&x);

        let sink = MemorySink::new();
        let found = discover(
            &path_list(&[dir_a.as_path(), x.as_path()]),
            &ExclusionSet::parse("f2.idl"),
            &sink,
        )
        .expect("discovery should succeed");

        let f1 = dir_a.join("f1.idl");
        let paths: Vec<&Path> = found.iter().map(IdlFile::path).collect();
        assert_eq!(paths, vec![f1.as_path(), x.as_path()]);
        assert!(sink.contains(Severity::Debug, "Excluding file"));
    }

    #[test]
    fn explicit_file_ignores_exclusions_and_suffix() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let excluded = tmp.path().join("skip.idl");
        let notes = tmp.path().join("notes.txt");
        touch(&excluded);
        touch(&notes);

        let found = discover(
            &path_list(&[excluded.as_path(), notes.as_path()]),
            &ExclusionSet::parse("skip.idl,notes.txt"),
            &MemorySink::new(),
        )
        .expect("discovery should succeed");
        assert_eq!(names(&found), vec!["skip.idl", "notes.txt"]);
    }

    #[test]
    fn recurses_into_nested_directories() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        touch(&tmp.path().join("b.idl"));
        touch(&tmp.path().join("nested").join("deeper").join("a.idl"));
        touch(&tmp.path().join("nested").join("readme.md"));
        touch(&tmp.path().join("nested").join("idl"));

        let found = discover(&path_list(&[tmp.path()]), &ExclusionSet::default(), &MemorySink::new())
            .expect("discovery should succeed");
        assert_eq!(names(&found), vec!["b.idl", "a.idl"]);
    }

    #[test]
    fn exclusion_applies_at_any_depth() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        touch(&tmp.path().join("common.idl"));
        touch(&tmp.path().join("sub").join("common.idl"));
        touch(&tmp.path().join("sub").join("kept.idl"));

        let found = discover(
            &path_list(&[tmp.path()]),
            &ExclusionSet::parse("common.idl"),
            &MemorySink::new(),
        )
        .expect("discovery should succeed");
        assert_eq!(names(&found), vec!["kept.idl"]);
    }

    #[test]
    fn duplicates_collapse_by_path() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let f = tmp.path().join("one.idl");
        touch(&f);

        let found = discover(&path_list(&[tmp.path(), f.as_path(), tmp.path()]), &ExclusionSet::default(), &MemorySink::new())
            .expect("discovery should succeed");
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn missing_path_fails_fast() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let missing = tmp.path().join("missing");
        let err = discover(&path_list(&[missing.as_path(), tmp.path()]), &ExclusionSet::default(), &MemorySink::new())
            .expect_err("missing path must fail");
        match err {
            BuildError::PathNotFound { path } => assert_eq!(path, missing),
            other => panic!("expected PathNotFound, got {other:?}"),
        }
    }

    #[test]
    fn empty_directory_yields_empty_set() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        touch(&tmp.path().join("only.txt"));
        let found = discover(&path_list(&[tmp.path()]), &ExclusionSet::default(), &MemorySink::new())
            .expect("discovery should succeed");
        assert!(found.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_loop_is_skipped_with_warning() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        touch(&tmp.path().join("real.idl"));
        std::os::unix::fs::symlink(tmp.path(), tmp.path().join("loop"))
            .expect("create looping symlink");

        let sink = MemorySink::new();
        let found = discover(&path_list(&[tmp.path()]), &ExclusionSet::default(), &sink)
            .expect("loops must not abort discovery");
        assert_eq!(names(&found), vec!["real.idl"]);
        assert!(sink.contains(Severity::Warn, "Skipping unreadable entry"));
    }
}
