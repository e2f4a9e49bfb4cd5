/*!
Storage path utilities: validation, sanitization, joining and splitting.

Grounded in the scheme-stripping regexes of the teacher's `util.rs`, generalized to the
full set of path operations a metadata tree needs when it builds manifest, manifest-list
and metadata blob keys.
*/
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{IcebergError, Result};

lazy_static! {
    static ref SCHEME: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").unwrap();
}

/// Rejects paths containing `..` traversal segments, in raw, percent-encoded, or
/// double-percent-encoded form (`%252e` decodes to `%2e` decodes to `.`).
pub fn validate(path: &str) -> Result<()> {
    let lowered = path.to_ascii_lowercase();
    let mut stages = vec![path.to_string(), lowered.clone()];
    let mut decoded = lowered;
    loop {
        let next = percent_decode_dots_and_slashes(&decoded);
        if next == decoded {
            break;
        }
        decoded = next;
        stages.push(decoded.clone());
    }
    for candidate in &stages {
        if candidate
            .split(['/', '\\'])
            .any(|segment| segment == "..")
        {
            return Err(IcebergError::PathTraversal(path.to_string()));
        }
    }
    Ok(())
}

/// Decodes one layer of `%25` → `%`, `%2e` → `.`, and `%2f` → `/`, in that order, so a
/// subsequent pass can unwrap nested encodings like `%252e` (`%25` → `%`, leaving `%2e`).
/// Strictly shortens the string (each 3-byte escape collapses to 1 byte), so repeated
/// application always reaches a fixed point.
fn percent_decode_dots_and_slashes(s: &str) -> String {
    s.replace("%25", "%").replace("%2e", ".").replace("%2f", "/")
}

/// True if `path` starts with a URI scheme (`s3://`, `gs://`, ...) or a single leading slash.
pub fn is_absolute(path: &str) -> bool {
    SCHEME.is_match(path) || path.starts_with('/')
}

fn scheme_prefix(path: &str) -> Option<&str> {
    SCHEME.find(path).map(|m| m.as_str())
}

/// Normalizes a path: backslashes become slashes, `./` and `../` segments are resolved,
/// duplicate slashes collapse, and a trailing slash is stripped unless the remainder is a
/// scheme root or `/`.
pub fn sanitize(path: &str) -> Result<String> {
    validate(path)?;
    let normalized = path.replace('\\', "/");
    let (prefix, rest) = match scheme_prefix(&normalized) {
        Some(scheme) => (scheme.to_string(), &normalized[scheme.len()..]),
        None => {
            if let Some(stripped) = normalized.strip_prefix('/') {
                ("/".to_string(), stripped)
            } else {
                (String::new(), normalized.as_str())
            }
        }
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    let result = format!("{prefix}{joined}");
    if result.is_empty() {
        Ok("/".to_string())
    } else {
        Ok(result)
    }
}

/// Joins path parts. An absolute part resets the accumulator rather than being appended.
pub fn join(parts: &[&str]) -> Result<String> {
    let mut acc = String::new();
    for part in parts {
        validate(part)?;
        if is_absolute(part) || acc.is_empty() {
            acc = part.to_string();
        } else {
            if !acc.ends_with('/') {
                acc.push('/');
            }
            acc.push_str(part.trim_start_matches('/'));
        }
    }
    sanitize(&acc)
}

/// Returns the parent path, preserving a scheme root or `/`.
pub fn parent(path: &str) -> Result<String> {
    let sanitized = sanitize(path)?;
    let prefix = scheme_prefix(&sanitized).map(|s| s.to_string());
    let rest = match &prefix {
        Some(scheme) => &sanitized[scheme.len()..],
        None => sanitized.trim_start_matches('/'),
    };
    let mut segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    segments.pop();
    let joined = segments.join("/");
    Ok(match prefix {
        Some(scheme) => format!("{scheme}{joined}"),
        None => {
            if sanitized.starts_with('/') {
                format!("/{joined}")
            } else {
                joined
            }
        }
    })
}

/// Returns the final `/`-separated segment of a path.
pub fn basename(path: &str) -> Result<String> {
    let sanitized = sanitize(path)?;
    Ok(sanitized
        .rsplit('/')
        .next()
        .unwrap_or(&sanitized)
        .to_string())
}

/// Removes a known object-store URI scheme prefix (`s3a://`, `s3://`, `gs://`), matching the
/// teacher's original `strip_prefix` helper.
pub fn strip_prefix(path: &str) -> String {
    if let Some(m) = SCHEME.find(path) {
        path[m.end()..].to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_traversal() {
        assert!(validate("a/../b").is_err());
        assert!(validate("a/%2e%2e/b").is_err());
        assert!(validate("a/%252e%252e/b").is_err());
        assert!(validate("a/b").is_ok());
    }

    #[test]
    fn sanitizes_dot_segments() {
        assert_eq!(sanitize("s3://bucket/a/./b/../c").unwrap(), "s3://bucket/a/c");
        assert_eq!(sanitize("/a//b/").unwrap(), "/a/b");
    }

    #[test]
    fn joins_parts_resetting_on_absolute() {
        assert_eq!(
            join(&["warehouse/db/t", "metadata", "v1.metadata.json"]).unwrap(),
            "warehouse/db/t/metadata/v1.metadata.json"
        );
        assert_eq!(
            join(&["warehouse/db/t", "s3://other/bucket"]).unwrap(),
            "s3://other/bucket"
        );
    }

    #[test]
    fn parent_and_basename_roundtrip() {
        let p = "s3://bucket/db/t/metadata/v1.metadata.json";
        assert_eq!(basename(p).unwrap(), "v1.metadata.json");
        assert_eq!(parent(p).unwrap(), "s3://bucket/db/t/metadata");
    }

    #[test]
    fn strips_known_schemes() {
        assert_eq!(strip_prefix("s3://bucket/key"), "bucket/key");
        assert_eq!(strip_prefix("gs://bucket/key"), "bucket/key");
        assert_eq!(strip_prefix("plain/key"), "plain/key");
    }

    #[test]
    fn is_absolute_detects_scheme_and_root() {
        assert!(is_absolute("/foo"));
        assert!(is_absolute("s3://foo"));
        assert!(!is_absolute("foo/bar"));
    }
}
