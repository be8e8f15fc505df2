//! Constraints: the atomic matchable/constructible units of a URL path.
//!
//! A [`Constraint`] consumes a prefix of an incoming path during forward
//! resolution and, inversely, appends text to a URL under construction
//! during reverse resolution. Two implementations are provided:
//!
//! - [`RoutePattern`]: route syntax with `<type:name>` placeholders backed
//!   by [converters](crate::converters) (e.g. `articles/<int:year>/`).
//! - [`RegexPattern`]: a raw regular expression with named capture groups.
//!
//! Matching and construction are inverse-compatible for simple character
//! classes; an arbitrary regex can accept text whose reconstruction differs,
//! which remains a constraint-authoring responsibility (see
//! [`RegexPattern`]).

use std::collections::HashMap;
use std::fmt;
use std::fmt::Write as _;
use std::iter::Peekable;
use std::str::Chars;

use regex::Regex;

use waypoint_core::{WaypointError, WaypointResult};

use crate::converters::{self, Converter};

/// The URL being built during one reverse-resolution attempt.
///
/// A plain path accumulator; it exists only for the duration of a single
/// candidate-chain construction.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Url {
    path: String,
}

impl Url {
    /// Creates an empty URL accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a piece of text to the path under construction.
    pub fn append(&mut self, text: &str) {
        self.path.push_str(text);
    }

    /// Returns the path built so far.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Consumes the accumulator, yielding the built path.
    pub fn into_path(self) -> String {
        self.path
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// A per-candidate rejection during reverse construction.
///
/// This is an expected-failure value, not an error: the dispatcher absorbs
/// it and advances to the next candidate chain. It never crosses the public
/// API boundary.
#[derive(Debug, Clone)]
pub struct ReverseMismatch {
    reason: String,
}

impl ReverseMismatch {
    /// Creates a mismatch with a human-readable reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Returns the reason this candidate was rejected.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// The result of one successful constraint match.
pub struct ConstraintMatch<'p> {
    /// Positional captures, in group order.
    pub args: Vec<String>,
    /// Named captures.
    pub kwargs: HashMap<String, String>,
    /// The unconsumed suffix of the path.
    pub remainder: &'p str,
}

/// State threaded through a candidate chain during reverse construction:
/// the URL built so far and the not-yet-consumed positional and keyword
/// arguments.
pub type ConstructState = (Url, Vec<String>, HashMap<String, String>);

/// One matchable/constructible unit of a URL path.
///
/// Implementations are immutable once compiled and shared read-only across
/// arbitrarily many concurrent resolve/reverse calls.
pub trait Constraint: Send + Sync + fmt::Debug {
    /// Attempts to consume a prefix of `path`.
    ///
    /// Returns `None` on no-match; never fails otherwise. Consumption is
    /// deterministic: the same path always yields the same prefix.
    fn matches<'p>(&self, path: &'p str) -> Option<ConstraintMatch<'p>>;

    /// Appends this constraint's contribution to the URL under
    /// construction, consuming arguments for its placeholders.
    ///
    /// Named placeholders are filled from `kwargs`; remaining placeholders
    /// consume `args` in declaration order. Every substituted value is
    /// re-validated against the placeholder's own pattern. Unconsumed
    /// arguments are returned for the next constraint in the chain.
    ///
    /// # Errors
    ///
    /// Returns [`ReverseMismatch`] when a required argument is missing or a
    /// supplied value fails the placeholder's pattern.
    fn construct(
        &self,
        url: Url,
        args: Vec<String>,
        kwargs: HashMap<String, String>,
    ) -> Result<ConstructState, ReverseMismatch>;

    /// A stable human-readable description, used only for diagnostics.
    fn describe(&self) -> String;
}

// ── Route-syntax constraints ─────────────────────────────────────────

enum RoutePart {
    Literal(String),
    Param {
        name: String,
        converter: &'static dyn Converter,
    },
}

/// A constraint written in route syntax, e.g. `articles/<int:year>/`.
///
/// Placeholders take the form `<type:name>` (or `<name>`, which defaults
/// to the `str` converter). The route is compiled into a prefix-anchored
/// regex for matching; construction replays the route parts, substituting
/// and validating placeholder values.
pub struct RoutePattern {
    route: String,
    regex: Regex,
    parts: Vec<RoutePart>,
}

impl fmt::Debug for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutePattern")
            .field("route", &self.route)
            .field("regex", &self.regex.as_str())
            .finish_non_exhaustive()
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl RoutePattern {
    /// Compiles a route string into a constraint.
    ///
    /// # Errors
    ///
    /// Returns [`WaypointError::ImproperlyConfigured`] for an unclosed
    /// placeholder, an invalid parameter name, or an unknown converter.
    pub fn parse(route: &str) -> WaypointResult<Self> {
        let mut pattern = String::from("^");
        let mut parts = Vec::new();
        let mut remaining = route;

        while let Some(start) = remaining.find('<') {
            let literal = &remaining[..start];
            if !literal.is_empty() {
                pattern.push_str(&regex::escape(literal));
                parts.push(RoutePart::Literal(literal.to_string()));
            }

            let close = remaining[start..].find('>').ok_or_else(|| {
                WaypointError::config(format!("unclosed angle bracket in route '{route}'"))
            })? + start;
            let inner = &remaining[start + 1..close];
            let (type_name, param_name) = inner
                .find(':')
                .map_or(("str", inner), |pos| (&inner[..pos], &inner[pos + 1..]));
            if !is_identifier(param_name) {
                return Err(WaypointError::config(format!(
                    "invalid parameter name '{param_name}' in route '{route}'"
                )));
            }

            let converter = converters::converter(type_name)?;
            write!(pattern, "(?P<{param_name}>{})", converter.pattern()).ok();
            parts.push(RoutePart::Param {
                name: param_name.to_string(),
                converter,
            });

            remaining = &remaining[close + 1..];
        }
        if !remaining.is_empty() {
            pattern.push_str(&regex::escape(remaining));
            parts.push(RoutePart::Literal(remaining.to_string()));
        }

        let regex = Regex::new(&pattern)
            .map_err(|e| WaypointError::config(format!("invalid route '{route}': {e}")))?;

        Ok(Self {
            route: route.to_string(),
            regex,
            parts,
        })
    }

    /// Returns the original route string.
    pub fn route(&self) -> &str {
        &self.route
    }
}

impl Constraint for RoutePattern {
    fn matches<'p>(&self, path: &'p str) -> Option<ConstraintMatch<'p>> {
        let captures = self.regex.captures(path)?;
        let end = captures.get(0)?.end();

        let mut kwargs = HashMap::new();
        for part in &self.parts {
            if let RoutePart::Param { name, converter } = part {
                let value = captures.name(name)?.as_str();
                if !converter.check(value) {
                    return None;
                }
                kwargs.insert(name.clone(), value.to_string());
            }
        }

        Some(ConstraintMatch {
            args: Vec::new(),
            kwargs,
            remainder: &path[end..],
        })
    }

    fn construct(
        &self,
        mut url: Url,
        mut args: Vec<String>,
        mut kwargs: HashMap<String, String>,
    ) -> Result<ConstructState, ReverseMismatch> {
        for part in &self.parts {
            match part {
                RoutePart::Literal(text) => url.append(text),
                RoutePart::Param { name, converter } => {
                    let value = if let Some(value) = kwargs.remove(name) {
                        value
                    } else if args.is_empty() {
                        return Err(ReverseMismatch::new(format!(
                            "missing argument '{name}' for '{}'",
                            self.route
                        )));
                    } else {
                        args.remove(0)
                    };
                    if !converter.check(&value) {
                        return Err(ReverseMismatch::new(format!(
                            "value '{value}' rejected for parameter '{name}' in '{}'",
                            self.route
                        )));
                    }
                    url.append(&value);
                }
            }
        }
        Ok((url, args, kwargs))
    }

    fn describe(&self) -> String {
        self.route.clone()
    }
}

// ── Regex constraints ────────────────────────────────────────────────

enum TemplatePart {
    Literal(String),
    Group {
        name: Option<String>,
        validator: Regex,
    },
}

/// A raw regular-expression constraint with named capture groups,
/// e.g. `^articles/(?P<year>[0-9]{4})/`.
///
/// For reverse construction the pattern source is normalized into a
/// sequence of literals and placeholders. Sources that use regex operators
/// outside of capture groups (alternation, repetition, character classes
/// at the top level) remain fully matchable but are not reversible:
/// `construct` rejects them with a [`ReverseMismatch`]. Note also that a
/// group's regex can accept text that, when substituted back, produces a
/// different path than was matched; keeping groups round-trippable is the
/// pattern author's responsibility.
pub struct RegexPattern {
    source: String,
    regex: Regex,
    template: Option<Vec<TemplatePart>>,
}

impl fmt::Debug for RegexPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegexPattern")
            .field("source", &self.source)
            .field("reversible", &self.template.is_some())
            .finish_non_exhaustive()
    }
}

impl RegexPattern {
    /// Compiles a regex constraint. The pattern is anchored to the start
    /// of the remaining path; a leading `^` is accepted and implied.
    ///
    /// # Errors
    ///
    /// Returns [`WaypointError::ImproperlyConfigured`] if the regex is
    /// invalid.
    pub fn new(pattern: &str) -> WaypointResult<Self> {
        let body = pattern.strip_prefix('^').unwrap_or(pattern);
        let regex = Regex::new(&format!("^{body}")).map_err(|e| {
            WaypointError::config(format!("invalid regex pattern '{pattern}': {e}"))
        })?;
        let template = normalize(body);

        Ok(Self {
            source: pattern.to_string(),
            regex,
            template,
        })
    }

    /// Returns whether this pattern can be used for reverse construction.
    pub const fn is_reversible(&self) -> bool {
        self.template.is_some()
    }
}

impl Constraint for RegexPattern {
    fn matches<'p>(&self, path: &'p str) -> Option<ConstraintMatch<'p>> {
        let captures = self.regex.captures(path)?;
        let end = captures.get(0)?.end();

        let mut kwargs = HashMap::new();
        for name in self.regex.capture_names().flatten() {
            if let Some(capture) = captures.name(name) {
                kwargs.insert(name.to_string(), capture.as_str().to_string());
            }
        }
        // Positional captures only apply when no group is named.
        let args = if kwargs.is_empty() {
            captures
                .iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str().to_string())
                .collect()
        } else {
            Vec::new()
        };

        Some(ConstraintMatch {
            args,
            kwargs,
            remainder: &path[end..],
        })
    }

    fn construct(
        &self,
        mut url: Url,
        mut args: Vec<String>,
        mut kwargs: HashMap<String, String>,
    ) -> Result<ConstructState, ReverseMismatch> {
        let Some(template) = &self.template else {
            return Err(ReverseMismatch::new(format!(
                "pattern '{}' is not reversible",
                self.source
            )));
        };

        for part in template {
            match part {
                TemplatePart::Literal(text) => url.append(text),
                TemplatePart::Group { name, validator } => {
                    let value = match name {
                        Some(name) => {
                            if let Some(value) = kwargs.remove(name) {
                                value
                            } else if args.is_empty() {
                                return Err(ReverseMismatch::new(format!(
                                    "missing argument '{name}' for '{}'",
                                    self.source
                                )));
                            } else {
                                args.remove(0)
                            }
                        }
                        None => {
                            if args.is_empty() {
                                return Err(ReverseMismatch::new(format!(
                                    "missing positional argument for '{}'",
                                    self.source
                                )));
                            }
                            args.remove(0)
                        }
                    };
                    if !validator.is_match(&value) {
                        return Err(ReverseMismatch::new(format!(
                            "value '{value}' rejected by '{}'",
                            self.source
                        )));
                    }
                    url.append(&value);
                }
            }
        }
        Ok((url, args, kwargs))
    }

    fn describe(&self) -> String {
        self.source.clone()
    }
}

/// Normalizes a regex body into literals and group placeholders, or
/// `None` when the pattern uses constructs with no unique text form.
fn normalize(body: &str) -> Option<Vec<TemplatePart>> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars.next()?;
                if escaped.is_ascii_alphanumeric() {
                    // \d, \w and friends have no single literal form.
                    return None;
                }
                literal.push(escaped);
            }
            '(' => {
                if !literal.is_empty() {
                    parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                }
                let group = take_group(&mut chars)?;
                let (name, inner) = if let Some(rest) = group.strip_prefix("?P<") {
                    let close = rest.find('>')?;
                    (Some(rest[..close].to_string()), rest[close + 1..].to_string())
                } else if group.starts_with('?') {
                    // Non-capturing and lookaround groups are not
                    // constructible.
                    return None;
                } else {
                    (None, group)
                };
                let validator = Regex::new(&format!("^(?:{inner})$")).ok()?;
                parts.push(TemplatePart::Group { name, validator });
            }
            '$' if chars.peek().is_none() => {}
            '^' | ')' | '*' | '+' | '?' | '{' | '}' | '[' | ']' | '|' | '.' => return None,
            _ => literal.push(c),
        }
    }
    if !literal.is_empty() {
        parts.push(TemplatePart::Literal(literal));
    }
    Some(parts)
}

/// Consumes a parenthesized group body (the opening paren already read),
/// returning its contents with nesting, escapes, and classes intact.
fn take_group(chars: &mut Peekable<Chars<'_>>) -> Option<String> {
    let mut depth = 1usize;
    let mut out = String::new();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                out.push(chars.next()?);
            }
            '(' => {
                depth += 1;
                out.push(c);
            }
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(out);
                }
                out.push(c);
            }
            '[' => {
                out.push(c);
                while let Some(inner) = chars.next() {
                    out.push(inner);
                    if inner == '\\' {
                        out.push(chars.next()?);
                    } else if inner == ']' {
                        break;
                    }
                }
            }
            _ => out.push(c),
        }
    }
    None
}
