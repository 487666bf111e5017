// ==============================================================================
// Output Path Manager: Resolve, Wipe, and Create the Output Directory
// ==============================================================================
//
// Generated code for a base package `com.example.gen` lands under
// `<output root>/com/example/gen`. That directory can be wiped before a build so
// stale files from removed IDL definitions do not linger. Wiping is
// destructive: everything under the directory goes, not only files this tool
// wrote.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{BuildError, Result};
use crate::package::{idl_stem, package_dir, sanitize};

/// Where one run writes its JSON files and generated sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLocation {
    /// Source root handed to the generator.
    pub root: PathBuf,
    /// Sanitized dotted base package.
    pub base_package: String,
    /// `root` joined with the base package as directories.
    pub dir: PathBuf,
}

impl OutputLocation {
    /// Resolve the output directory for `base_package` under `root`. The
    /// package is sanitized before use.
    #[must_use]
    pub fn resolve(root: impl Into<PathBuf>, base_package: &str) -> Self {
        let root = root.into();
        let base_package = sanitize(base_package);
        let dir = root.join(package_dir(&base_package));
        OutputLocation {
            root,
            base_package,
            dir,
        }
    }

    /// The intermediate JSON file for an IDL file: its stem plus `.json`,
    /// directly inside [`dir`](Self::dir).
    #[must_use]
    pub fn json_path(&self, idl_file_name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", idl_stem(idl_file_name)))
    }
}

/// Resolve the output directory, optionally wipe it, and make sure it exists.
///
/// Returns the resolved directory.
pub fn prepare(output_root: &Path, base_package: &str, wipe_existing: bool) -> Result<PathBuf> {
    let location = OutputLocation::resolve(output_root, base_package);
    if wipe_existing {
        wipe(&location.dir)?;
    }
    ensure_dir(&location.dir)?;
    Ok(location.dir)
}

/// Recursively delete `dir` and everything below it, children before parents
/// and siblings in file-name order.
///
/// A missing `dir` is not an error. The first path that cannot be removed
/// aborts the wipe with [`BuildError::DeleteFailure`]; paths deleted before it
/// stay deleted. Symlinks are removed as links, never followed.
pub fn wipe(dir: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(dir) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(source) => {
            return Err(BuildError::DeleteFailure {
                path: dir.to_path_buf(),
                source,
            });
        }
    };

    if !meta.is_dir() {
        return remove_entry(dir, false);
    }

    for entry in WalkDir::new(dir).contents_first(true).sort_by_file_name() {
        let entry = entry.map_err(|e| BuildError::DeleteFailure {
            path: e.path().map_or_else(|| dir.to_path_buf(), Path::to_path_buf),
            source: e.into(),
        })?;
        remove_entry(entry.path(), entry.file_type().is_dir())?;
    }
    Ok(())
}

fn remove_entry(path: &Path, is_dir: bool) -> Result<()> {
    let removed = if is_dir {
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    };
    removed.map_err(|source| BuildError::DeleteFailure {
        path: path.to_path_buf(),
        source,
    })
}

/// Create `dir` and any missing parents.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    match fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        // Lost a race with another creator; the directory is there.
        Err(_) if dir.is_dir() => Ok(()),
        Err(source) => Err(BuildError::DirectoryCreateFailure {
            path: dir.to_path_buf(),
            source,
        }),
    }
}
