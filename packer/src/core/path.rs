//! Lexical helpers for root-relative module paths.

use std::path::{Component, Path, PathBuf};

/// Lexically normalize a root-relative path, folding `.` and `..` components.
///
/// Returns `None` if the path is absolute or climbs above the root.
pub fn normalize(path: &Path) -> Option<PathBuf> {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::Normal(part) => parts.push(part),
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(parts.iter().collect())
}

/// Render a root-relative path as a `/`-separated change log key.
pub fn log_key(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether the last component of `path` is `node_modules`.
pub fn is_node_modules(path: &Path) -> bool {
    path.file_name().is_some_and(|name| name == "node_modules")
}
