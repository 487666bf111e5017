// ==============================================================================
// Package Names: Sanitization and Directory Mapping
// ==============================================================================
//
// Package identifiers come from user configuration (the base package) and from
// IDL file names (the per-file sub-package). Both are reduced to the characters
// `[A-Za-z0-9_.]` before they are used as a package or turned into a path.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^A-Za-z0-9_.]").expect("static sanitization pattern is valid")
});

/// Strip every character outside `[A-Za-z0-9_.]`.
///
/// ```
/// assert_eq!(idl2src::sanitize("a/b;c.d"), "abc.d");
/// ```
#[must_use]
pub fn sanitize(s: &str) -> String {
    DISALLOWED.replace_all(s, "").into_owned()
}

/// Convert a dotted package into a relative directory path, one component per
/// segment. Empty segments (from `a..b` or a leading dot) are skipped.
#[must_use]
pub fn package_dir(package: &str) -> PathBuf {
    package.split('.').filter(|s| !s.is_empty()).collect()
}

/// The stem an IDL file contributes to its package and JSON file name: the
/// name with a trailing `.idl` removed, or up to the last extension for files
/// named explicitly with some other suffix.
#[must_use]
pub fn idl_stem(file_name: &str) -> &str {
    if let Some(stem) = file_name.strip_suffix(".idl") {
        return stem;
    }
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
}

/// The package a single IDL file is generated into: `base.<sanitized stem>`,
/// or just the stem when there is no base package.
#[must_use]
pub fn file_package(base_package: &str, idl_file_name: &str) -> String {
    let stem = sanitize(idl_stem(idl_file_name));
    if base_package.is_empty() {
        stem
    } else {
        format!("{base_package}.{stem}")
    }
}
