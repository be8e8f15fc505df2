//! Path converters for route-style constraints.
//!
//! A converter defines how one `<type:name>` placeholder in a route matches
//! and validates a path segment. Converters operate purely on text: the
//! engine captures and substitutes strings, and a converter's job is to
//! bound which strings are acceptable on both the matching and the
//! construction side.
//!
//! # Built-in converters
//!
//! | Name   | Pattern                                |
//! |--------|----------------------------------------|
//! | `int`  | `[0-9]+`                               |
//! | `str`  | `[^/]+`                                |
//! | `slug` | `[-a-zA-Z0-9_]+`                       |
//! | `uuid` | `[0-9a-f]{8}-...-[0-9a-f]{12}`         |
//! | `path` | `.+`                                   |

use std::fmt;

use waypoint_core::{WaypointError, WaypointResult};

/// A segment-level matching rule usable inside a route pattern.
///
/// `pattern` is the regex fragment compiled into the surrounding route's
/// matcher; `check` re-validates a text value during reverse construction,
/// so that a value substituted into a URL would also have been accepted by
/// the forward match.
pub trait Converter: Send + Sync + fmt::Debug {
    /// Returns the regex fragment that matches valid values.
    fn pattern(&self) -> &'static str;

    /// Returns whether `value` is acceptable for this converter.
    fn check(&self, value: &str) -> bool;
}

/// Matches one or more decimal digits.
#[derive(Debug, Clone, Copy)]
pub struct IntConverter;

impl Converter for IntConverter {
    fn pattern(&self) -> &'static str {
        "[0-9]+"
    }

    fn check(&self, value: &str) -> bool {
        !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
    }
}

/// Matches any non-empty text without a slash.
#[derive(Debug, Clone, Copy)]
pub struct StrConverter;

impl Converter for StrConverter {
    fn pattern(&self) -> &'static str {
        "[^/]+"
    }

    fn check(&self, value: &str) -> bool {
        !value.is_empty() && !value.contains('/')
    }
}

/// Matches ASCII letters, digits, hyphens, and underscores.
#[derive(Debug, Clone, Copy)]
pub struct SlugConverter;

impl Converter for SlugConverter {
    fn pattern(&self) -> &'static str {
        "[-a-zA-Z0-9_]+"
    }

    fn check(&self, value: &str) -> bool {
        !value.is_empty()
            && value
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    }
}

/// Matches a canonically formatted (lowercase, hyphenated) UUID.
#[derive(Debug, Clone, Copy)]
pub struct UuidConverter;

impl Converter for UuidConverter {
    fn pattern(&self) -> &'static str {
        "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}"
    }

    fn check(&self, value: &str) -> bool {
        // Parsing alone accepts variant spellings; require the canonical
        // hyphenated lowercase form so matching and construction agree.
        value
            .parse::<uuid::Uuid>()
            .is_ok_and(|parsed| parsed.to_string() == value)
    }
}

/// Matches any non-empty remainder, slashes included.
#[derive(Debug, Clone, Copy)]
pub struct PathSegmentConverter;

impl Converter for PathSegmentConverter {
    fn pattern(&self) -> &'static str {
        ".+"
    }

    fn check(&self, value: &str) -> bool {
        !value.is_empty()
    }
}

/// Looks up a built-in converter by its route type name.
///
/// # Errors
///
/// Returns [`WaypointError::ImproperlyConfigured`] for an unknown name.
pub fn converter(type_name: &str) -> WaypointResult<&'static dyn Converter> {
    match type_name {
        "int" => Ok(&IntConverter),
        "str" => Ok(&StrConverter),
        "slug" => Ok(&SlugConverter),
        "uuid" => Ok(&UuidConverter),
        "path" => Ok(&PathSegmentConverter),
        _ => Err(WaypointError::config(format!(
            "unknown path converter '{type_name}'"
        ))),
    }
}
