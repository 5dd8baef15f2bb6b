//! Path normalization and manipulation for in-tree paths
//!
//! All paths inside the tree are absolute, `/`-separated and NFC-normalized.
//! The root is `/` and has depth 0.

use unicode_normalization::UnicodeNormalization;

pub const SEPARATOR: char = '/';
pub const ROOT: &str = "/";

/// Normalize a path string for hashing and lookup
///
/// This function:
/// 1. Normalizes Unicode to NFC
/// 2. Collapses repeated separators and drops `.` components
/// 3. Forces a leading slash and removes trailing slashes (except root)
pub fn clean(path: &str) -> String {
    let normalized: String = path.nfc().collect();
    let parts: Vec<&str> = normalized
        .split(SEPARATOR)
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();

    if parts.is_empty() {
        return ROOT.to_string();
    }

    let mut result = String::with_capacity(normalized.len() + 1);
    for part in parts {
        result.push(SEPARATOR);
        result.push_str(part);
    }
    result
}

/// Join a parent path and a child name.
pub fn join(parent: &str, name: &str) -> String {
    if name.is_empty() {
        return clean(parent);
    }
    if parent.is_empty() || parent == ROOT {
        return clean(&format!("/{}", name));
    }
    clean(&format!("{}/{}", parent, name))
}

/// Parent path of `path`; `None` for the root.
pub fn parent_of(path: &str) -> Option<String> {
    let path = clean(path);
    if path == ROOT {
        return None;
    }
    match path.rfind(SEPARATOR) {
        Some(0) => Some(ROOT.to_string()),
        Some(idx) => Some(path[..idx].to_string()),
        None => Some(ROOT.to_string()),
    }
}

/// Last component of `path`; empty for the root.
pub fn base_name(path: &str) -> String {
    let path = clean(path);
    match path.rfind(SEPARATOR) {
        Some(idx) => path[idx + 1..].to_string(),
        None => path,
    }
}

/// Number of separators below the root; the root has depth 0.
pub fn depth(path: &str) -> usize {
    let path = clean(path);
    if path == ROOT {
        0
    } else {
        path.matches(SEPARATOR).count()
    }
}

/// Components of `path` below the root, in order.
pub fn split(path: &str) -> Vec<String> {
    clean(path)
        .split(SEPARATOR)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
