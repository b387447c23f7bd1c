//! Namespace path splitting
//!
//! Read paths accept dotted or slashed notation; write paths are slash-only.

/// Split a read path into segments.
///
/// Dotted notation wins when a dot is present anywhere in the path,
/// otherwise the path splits on slashes.
pub fn read_segments(path: &str) -> Vec<&str> {
    if path.contains('.') {
        path.split('.').collect()
    } else {
        path.split('/').collect()
    }
}

/// Split a write path into segments. Always slash-separated.
pub fn write_segments(path: &str) -> Vec<&str> {
    path.split('/').collect()
}

/// Split a dependency specifier into its target key and pull chain.
///
/// The grammar is `targetKey[:sub1[:sub2...]]`. Returns `None` for
/// specifiers with no usable key; empty pull segments are dropped.
pub fn split_specifier(spec: &str) -> Option<(String, Vec<String>)> {
    let mut parts = spec.split(':');
    let key = parts.next().unwrap_or_default();
    if key.is_empty() {
        return None;
    }
    let pull = parts
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect();
    Some((key.to_string(), pull))
}
