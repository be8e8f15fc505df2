//! Pattern tables and the hierarchical URL resolver.
//!
//! A routing table is an ordered list of [`UrlEntry`] values: leaves
//! ([`UrlPattern`]) pairing constraints with a view, and internal nodes
//! ([`SubResolver`]) pairing a prefix constraint with a nested [`Table`]
//! and optional namespaces. A [`Resolver`] owns one compiled table and
//! offers forward matching ([`Resolver::resolve`]), namespace lookup
//! ([`Resolver::resolve_namespace`]), and reverse candidate enumeration
//! ([`Resolver::search`]).
//!
//! Tables are immutable once built and shared read-only across concurrent
//! calls; deferred sub-tables and dotted view references are forced at
//! most once, on first traversal.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use waypoint_core::{WaypointError, WaypointResult};

use crate::constraints::{Constraint, ConstraintMatch, RegexPattern, RoutePattern};

/// Resolves a dotted view path (e.g. `"blog.views.detail"`) to a handler.
///
/// Used for late-bound view references; a failing load surfaces as
/// [`WaypointError::ImproperlyConfigured`] at the point of first use.
pub trait ViewLoader<V>: Send + Sync {
    /// Loads the handler behind a dotted path.
    ///
    /// # Errors
    ///
    /// Returns [`WaypointError::ImproperlyConfigured`] when the path does
    /// not name a known handler.
    fn load(&self, path: &str) -> WaypointResult<V>;
}

/// A view reference carried by a leaf: either a directly bound handler or
/// a dotted path resolved lazily through a [`ViewLoader`].
pub enum ViewRef<V> {
    /// A handler bound at table-definition time.
    Handler(V),
    /// A dotted path, resolved once on first use and cached.
    Dotted {
        /// The dotted path to resolve.
        path: String,
        cell: OnceCell<V>,
    },
}

impl<V> ViewRef<V> {
    /// Creates a late-bound view reference from a dotted path.
    pub fn dotted(path: impl Into<String>) -> Self {
        Self::Dotted {
            path: path.into(),
            cell: OnceCell::new(),
        }
    }

    /// Returns the dotted path when this reference is late-bound.
    pub fn dotted_path(&self) -> Option<&str> {
        match self {
            Self::Handler(_) => None,
            Self::Dotted { path, .. } => Some(path),
        }
    }
}

impl<V: Clone> ViewRef<V> {
    /// Resolves the reference to a handler, loading a dotted path on
    /// first use.
    fn resolve(&self, loader: Option<&dyn ViewLoader<V>>) -> WaypointResult<V> {
        match self {
            Self::Handler(view) => Ok(view.clone()),
            Self::Dotted { path, cell } => cell
                .get_or_try_init(|| {
                    loader
                        .ok_or_else(|| {
                            WaypointError::config(format!(
                                "cannot resolve view '{path}': no view loader installed"
                            ))
                        })?
                        .load(path)
                })
                .cloned(),
        }
    }
}

impl<V> fmt::Debug for ViewRef<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handler(_) => f.write_str("ViewRef::Handler(..)"),
            Self::Dotted { path, .. } => f.debug_tuple("ViewRef::Dotted").field(path).finish(),
        }
    }
}

impl<V> From<V> for ViewRef<V> {
    fn from(view: V) -> Self {
        Self::Handler(view)
    }
}

/// A leaf entry: an ordered constraint sequence paired with a view,
/// default keyword arguments, and an optional name for reverse lookup.
pub struct UrlPattern<V> {
    constraints: Vec<Arc<dyn Constraint>>,
    view: ViewRef<V>,
    default_kwargs: HashMap<String, String>,
    name: Option<String>,
}

impl<V> UrlPattern<V> {
    /// Creates a leaf from its constraint chain and view.
    pub fn new(
        constraints: Vec<Arc<dyn Constraint>>,
        view: impl Into<ViewRef<V>>,
        name: Option<&str>,
    ) -> Self {
        Self {
            constraints,
            view: view.into(),
            default_kwargs: HashMap::new(),
            name: name.map(String::from),
        }
    }

    /// Attaches fixed default keyword arguments to this leaf.
    ///
    /// Defaults are merged under captured values on forward resolution and
    /// pin reverse lookups: a caller-supplied keyword for a defaulted key
    /// must equal the default.
    #[must_use]
    pub fn with_defaults(mut self, defaults: &[(&str, &str)]) -> Self {
        for (key, value) in defaults {
            self.default_kwargs
                .insert((*key).to_string(), (*value).to_string());
        }
        self
    }

    /// Returns the leaf's constraint chain.
    pub fn constraints(&self) -> &[Arc<dyn Constraint>] {
        &self.constraints
    }

    /// Returns the optional pattern name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the fixed default keyword arguments.
    pub const fn default_kwargs(&self) -> &HashMap<String, String> {
        &self.default_kwargs
    }

    /// Returns the view reference.
    pub const fn view(&self) -> &ViewRef<V> {
        &self.view
    }
}

impl<V> fmt::Debug for UrlPattern<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlPattern")
            .field("constraints", &self.constraints)
            .field("name", &self.name)
            .field("default_kwargs", &self.default_kwargs)
            .finish_non_exhaustive()
    }
}

type TableThunk<V> = Box<dyn Fn() -> WaypointResult<Vec<UrlEntry<V>>> + Send + Sync>;

/// A compiled pattern table, possibly deferred.
///
/// A deferred table's thunk runs the first time the table is traversed;
/// the produced entries are cached for the process lifetime. This permits
/// circular or late-bound routing references without recursing at
/// definition time. A failing thunk is reported at the point of first use
/// and retried on the next traversal.
pub struct Table<V> {
    cell: OnceCell<Vec<UrlEntry<V>>>,
    thunk: Option<TableThunk<V>>,
}

impl<V> Table<V> {
    /// Builds an already-materialized table.
    pub fn eager(entries: Vec<UrlEntry<V>>) -> Self {
        Self {
            cell: OnceCell::with_value(entries),
            thunk: None,
        }
    }

    /// Builds a table whose entries are produced on first traversal.
    pub fn deferred(
        thunk: impl Fn() -> WaypointResult<Vec<UrlEntry<V>>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            cell: OnceCell::new(),
            thunk: Some(Box::new(thunk)),
        }
    }

    /// Returns the table's entries, forcing a deferred thunk if needed.
    ///
    /// # Errors
    ///
    /// Returns [`WaypointError::ImproperlyConfigured`] when the deferred
    /// thunk fails.
    pub fn entries(&self) -> WaypointResult<&[UrlEntry<V>]> {
        self.cell
            .get_or_try_init(|| match &self.thunk {
                Some(thunk) => thunk(),
                None => Ok(Vec::new()),
            })
            .map(Vec::as_slice)
    }
}

impl<V: fmt::Debug> fmt::Debug for Table<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(entries) => f.debug_tuple("Table").field(entries).finish(),
            None => f.write_str("Table(<deferred>)"),
        }
    }
}

/// An internal node: a prefix constraint guarding a nested table, with
/// optional instance and application namespaces inherited by the leaves
/// beneath it.
pub struct SubResolver<V> {
    constraint: Arc<dyn Constraint>,
    table: Table<V>,
    namespace: Option<String>,
    app_name: Option<String>,
}

impl<V> SubResolver<V> {
    /// Creates an internal node.
    pub fn new(
        constraint: Arc<dyn Constraint>,
        table: Table<V>,
        namespace: Option<&str>,
        app_name: Option<&str>,
    ) -> Self {
        Self {
            constraint,
            table,
            namespace: namespace.map(String::from),
            app_name: app_name.map(String::from),
        }
    }

    /// Returns the prefix constraint.
    pub const fn constraint(&self) -> &Arc<dyn Constraint> {
        &self.constraint
    }

    /// Returns the nested table.
    pub const fn table(&self) -> &Table<V> {
        &self.table
    }

    /// Returns the instance namespace, if set.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Returns the application namespace, if set.
    pub fn app_name(&self) -> Option<&str> {
        self.app_name.as_deref()
    }
}

impl<V: fmt::Debug> fmt::Debug for SubResolver<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubResolver")
            .field("constraint", &self.constraint)
            .field("namespace", &self.namespace)
            .field("app_name", &self.app_name)
            .field("table", &self.table)
            .finish()
    }
}

/// One entry in a routing table.
#[derive(Debug)]
pub enum UrlEntry<V> {
    /// A leaf mapping constraints to a view.
    Pattern(UrlPattern<V>),
    /// A nested sub-table behind a prefix constraint.
    Include(SubResolver<V>),
}

impl<V> UrlEntry<V> {
    /// Attaches default keyword arguments when this entry is a leaf;
    /// no-op for includes.
    #[must_use]
    pub fn with_defaults(self, defaults: &[(&str, &str)]) -> Self {
        match self {
            Self::Pattern(pattern) => Self::Pattern(pattern.with_defaults(defaults)),
            Self::Include(_) => self,
        }
    }
}

/// The result of a successful forward resolution.
#[derive(Clone)]
pub struct ResolvedMatch<V> {
    /// The matched view handler.
    pub view: V,
    /// Positional arguments captured from the path. Empty whenever any
    /// keyword argument (captured or defaulted) is present.
    pub args: Vec<String>,
    /// Keyword arguments: captures merged over the leaf's defaults, with
    /// an empty capture never overriding a default.
    pub kwargs: HashMap<String, String>,
    /// The name of the matched pattern, if any.
    pub url_name: Option<String>,
    /// Application namespaces along the resolution chain, outermost first.
    pub app_names: Vec<String>,
    /// Instance namespaces along the resolution chain, outermost first.
    pub namespaces: Vec<String>,
}

impl<V> fmt::Debug for ResolvedMatch<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedMatch")
            .field("args", &self.args)
            .field("kwargs", &self.kwargs)
            .field("url_name", &self.url_name)
            .field("app_names", &self.app_names)
            .field("namespaces", &self.namespaces)
            .finish_non_exhaustive()
    }
}

impl<V> ResolvedMatch<V> {
    /// Returns the fully-qualified view name, namespaces included
    /// (e.g. `"shop:item"`).
    pub fn view_name(&self) -> String {
        let mut parts: Vec<&str> = self.namespaces.iter().map(String::as_str).collect();
        if let Some(name) = &self.url_name {
            parts.push(name);
        }
        parts.join(":")
    }
}

/// The terminal segment of a reverse lookup.
#[derive(Debug, Clone)]
pub enum ViewLookup<V> {
    /// Lookup by pattern name.
    Name(String),
    /// Lookup by handler identity.
    View(V),
}

/// One resolved namespace segment: the instance namespace requested and
/// the application namespace of the instance chosen for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceChoice {
    /// The instance namespace named in the lookup.
    pub namespace: String,
    /// The application namespace of the chosen instance.
    pub app_name: Option<String>,
}

/// A fully namespace-resolved reverse lookup.
#[derive(Debug, Clone)]
pub struct Lookup<V> {
    /// The resolved namespace path, outermost first.
    pub namespaces: Vec<NamespaceChoice>,
    /// The terminal view reference.
    pub view: ViewLookup<V>,
}

/// One reverse candidate: a root-to-leaf constraint chain plus the leaf's
/// fixed default keyword arguments.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Constraints in application order, root anchors included.
    pub constraints: Vec<Arc<dyn Constraint>>,
    /// The leaf's default keyword arguments.
    pub default_kwargs: HashMap<String, String>,
}

/// A resolver for one routing root.
///
/// Owns optional root-level constraints (typically the leading-slash
/// anchor) and the root table.
pub struct Resolver<V> {
    constraints: Vec<Arc<dyn Constraint>>,
    table: Table<V>,
    loader: Option<Arc<dyn ViewLoader<V>>>,
}

impl<V: fmt::Debug> fmt::Debug for Resolver<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("constraints", &self.constraints)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

fn absorb<'p>(
    found: ConstraintMatch<'p>,
    args: &mut Vec<String>,
    kwargs: &mut HashMap<String, String>,
) -> &'p str {
    args.extend(found.args);
    kwargs.extend(found.kwargs);
    found.remainder
}

impl<V: Clone> Resolver<V> {
    /// Creates a resolver with no root-level constraints.
    pub fn new(table: Table<V>) -> Self {
        Self::with_constraints(table, Vec::new())
    }

    /// Creates a resolver anchored at a leading slash, the conventional
    /// root for absolute request paths.
    pub fn with_root_slash(table: Table<V>) -> WaypointResult<Self> {
        let anchor: Arc<dyn Constraint> = Arc::new(RegexPattern::new("^/")?);
        Ok(Self::with_constraints(table, vec![anchor]))
    }

    /// Creates a resolver with explicit root-level constraints.
    pub fn with_constraints(table: Table<V>, constraints: Vec<Arc<dyn Constraint>>) -> Self {
        Self {
            constraints,
            table,
            loader: None,
        }
    }

    /// Installs a loader for dotted view references.
    #[must_use]
    pub fn with_view_loader(mut self, loader: Arc<dyn ViewLoader<V>>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Returns the root-level constraints.
    pub fn root_constraints(&self) -> &[Arc<dyn Constraint>] {
        &self.constraints
    }

    /// Resolves a path to a view, depth-first in declaration order.
    ///
    /// A leaf matches only when the entire remaining path is consumed; a
    /// node whose prefix does not match prunes its whole subtree.
    ///
    /// # Errors
    ///
    /// Returns [`WaypointError::NotFound`] when no leaf consumes the path,
    /// or [`WaypointError::ImproperlyConfigured`] when a deferred table or
    /// dotted view on the matching branch fails to load.
    pub fn resolve(&self, path: &str) -> WaypointResult<ResolvedMatch<V>> {
        let mut remaining = path;
        let mut args = Vec::new();
        let mut kwargs = HashMap::new();
        for constraint in &self.constraints {
            let Some(found) = constraint.matches(remaining) else {
                return Err(WaypointError::NotFound {
                    path: path.to_string(),
                    tried: Vec::new(),
                });
            };
            remaining = absorb(found, &mut args, &mut kwargs);
        }

        let mut tried = Vec::new();
        let found = self.resolve_entries(
            self.table.entries()?,
            remaining,
            &args,
            &kwargs,
            &mut tried,
            "",
        )?;
        found.ok_or_else(|| WaypointError::NotFound {
            path: path.to_string(),
            tried,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_entries(
        &self,
        entries: &[UrlEntry<V>],
        remaining: &str,
        args: &[String],
        kwargs: &HashMap<String, String>,
        tried: &mut Vec<String>,
        prefix_desc: &str,
    ) -> WaypointResult<Option<ResolvedMatch<V>>> {
        for entry in entries {
            match entry {
                UrlEntry::Pattern(leaf) => {
                    let mut rest = remaining;
                    let mut leaf_args = args.to_vec();
                    let mut leaf_kwargs = kwargs.clone();
                    let mut matched = true;
                    for constraint in leaf.constraints() {
                        match constraint.matches(rest) {
                            Some(found) => {
                                rest = absorb(found, &mut leaf_args, &mut leaf_kwargs);
                            }
                            None => {
                                matched = false;
                                break;
                            }
                        }
                    }
                    // Partial consumption at a leaf is a no-match.
                    if matched && rest.is_empty() {
                        let mut final_kwargs = leaf.default_kwargs().clone();
                        for (key, value) in leaf_kwargs {
                            if value.is_empty() && final_kwargs.contains_key(&key) {
                                continue;
                            }
                            final_kwargs.insert(key, value);
                        }
                        let view = leaf.view().resolve(self.loader.as_deref())?;
                        let final_args = if final_kwargs.is_empty() {
                            leaf_args
                        } else {
                            Vec::new()
                        };
                        return Ok(Some(ResolvedMatch {
                            view,
                            args: final_args,
                            kwargs: final_kwargs,
                            url_name: leaf.name().map(String::from),
                            app_names: Vec::new(),
                            namespaces: Vec::new(),
                        }));
                    }
                    let chain: String =
                        leaf.constraints().iter().map(|c| c.describe()).collect();
                    tried.push(format!("{prefix_desc}{chain}"));
                }
                UrlEntry::Include(sub) => match sub.constraint().matches(remaining) {
                    Some(found) => {
                        let mut inner_args = args.to_vec();
                        let mut inner_kwargs = kwargs.clone();
                        let rest = absorb(found, &mut inner_args, &mut inner_kwargs);
                        let child_desc =
                            format!("{prefix_desc}{}", sub.constraint().describe());
                        if let Some(mut found) = self.resolve_entries(
                            sub.table().entries()?,
                            rest,
                            &inner_args,
                            &inner_kwargs,
                            tried,
                            &child_desc,
                        )? {
                            if let Some(ns) = sub.namespace() {
                                found.namespaces.insert(0, ns.to_string());
                            }
                            if let Some(app) = sub.app_name() {
                                found.app_names.insert(0, app.to_string());
                            }
                            return Ok(Some(found));
                        }
                    }
                    None => {
                        tried.push(format!(
                            "{prefix_desc}{}",
                            sub.constraint().describe()
                        ));
                    }
                },
            }
        }
        Ok(None)
    }

    /// Resolves the namespace segments of a reverse lookup against the
    /// table, applying current-application stickiness.
    ///
    /// For each segment, the instances carrying that namespace are
    /// gathered in declaration order (descending transparently through
    /// includes without a namespace); the instance whose application
    /// namespace equals the corresponding `current_app` segment is
    /// preferred, falling back to the first declared.
    ///
    /// # Errors
    ///
    /// Returns [`WaypointError::NoReverseMatch`] when a segment is not a
    /// registered namespace at its level.
    pub fn resolve_namespace(
        &self,
        namespaces: &[&str],
        current_app: &[&str],
    ) -> WaypointResult<Vec<NamespaceChoice>> {
        let mut choices = Vec::with_capacity(namespaces.len());
        let mut level = self.table.entries()?;
        for (depth, segment) in namespaces.iter().enumerate() {
            let mut instances = Vec::new();
            Self::collect_instances(level, segment, &mut instances)?;
            let current = current_app.get(depth).copied();
            let chosen = current
                .and_then(|app| {
                    instances
                        .iter()
                        .copied()
                        .find(|sub| sub.app_name() == Some(app))
                })
                .or_else(|| instances.first().copied())
                .ok_or_else(|| {
                    WaypointError::NoReverseMatch(format!(
                        "'{segment}' is not a registered namespace"
                    ))
                })?;
            choices.push(NamespaceChoice {
                namespace: (*segment).to_string(),
                app_name: chosen.app_name().map(String::from),
            });
            level = chosen.table().entries()?;
        }
        Ok(choices)
    }

    fn collect_instances<'s>(
        entries: &'s [UrlEntry<V>],
        segment: &str,
        out: &mut Vec<&'s SubResolver<V>>,
    ) -> WaypointResult<()> {
        for entry in entries {
            if let UrlEntry::Include(sub) = entry {
                if sub.namespace() == Some(segment) {
                    out.push(sub);
                } else if sub.namespace().is_none() {
                    Self::collect_instances(sub.table().entries()?, segment, out)?;
                }
            }
        }
        Ok(())
    }

    /// Enumerates reverse candidates for a resolved lookup, lazily and in
    /// declaration order.
    ///
    /// Each call produces a fresh, restartable iterator. Candidates are a
    /// pure structural enumeration: argument compatibility is evaluated by
    /// the caller during construction.
    ///
    /// # Errors
    ///
    /// Returns [`WaypointError::ImproperlyConfigured`] when the root table
    /// cannot be loaded; deferred sub-table failures surface as `Err`
    /// items during iteration.
    pub fn search<'r>(&'r self, lookup: &'r Lookup<V>) -> WaypointResult<Search<'r, V>> {
        let root = Frame {
            entries: self.table.entries()?,
            index: 0,
            prefix: self.constraints.clone(),
            depth: 0,
        };
        Ok(Search {
            stack: vec![root],
            lookup,
            loader: self.loader.as_deref(),
        })
    }
}

struct Frame<'r, V> {
    entries: &'r [UrlEntry<V>],
    index: usize,
    prefix: Vec<Arc<dyn Constraint>>,
    depth: usize,
}

/// Lazy depth-first enumeration of reverse candidates.
pub struct Search<'r, V> {
    stack: Vec<Frame<'r, V>>,
    lookup: &'r Lookup<V>,
    loader: Option<&'r dyn ViewLoader<V>>,
}

impl<V: Clone + PartialEq> Search<'_, V> {
    fn leaf_matches(&self, leaf: &UrlPattern<V>) -> bool {
        match &self.lookup.view {
            ViewLookup::Name(name) => leaf.name() == Some(name.as_str()),
            ViewLookup::View(target) => leaf
                .view()
                .resolve(self.loader)
                .is_ok_and(|view| view == *target),
        }
    }
}

impl<'r, V: Clone + PartialEq> Iterator for Search<'r, V> {
    type Item = WaypointResult<Candidate>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            if frame.index >= frame.entries.len() {
                self.stack.pop();
                continue;
            }
            let entry: &'r UrlEntry<V> = &frame.entries[frame.index];
            frame.index += 1;
            let depth = frame.depth;
            let prefix = frame.prefix.clone();

            match entry {
                UrlEntry::Pattern(leaf) => {
                    if depth == self.lookup.namespaces.len() && self.leaf_matches(leaf) {
                        let mut constraints = prefix;
                        constraints.extend(leaf.constraints().iter().cloned());
                        return Some(Ok(Candidate {
                            constraints,
                            default_kwargs: leaf.default_kwargs().clone(),
                        }));
                    }
                }
                UrlEntry::Include(sub) => {
                    let next_depth = if sub.namespace().is_none() {
                        // Transparent include: same namespace level.
                        Some(depth)
                    } else if let Some(choice) = self.lookup.namespaces.get(depth) {
                        (sub.namespace() == Some(choice.namespace.as_str())
                            && sub.app_name() == choice.app_name.as_deref())
                        .then_some(depth + 1)
                    } else {
                        None
                    };
                    if let Some(next_depth) = next_depth {
                        match sub.table().entries() {
                            Ok(entries) => {
                                let mut child_prefix = prefix;
                                child_prefix.push(sub.constraint().clone());
                                self.stack.push(Frame {
                                    entries,
                                    index: 0,
                                    prefix: child_prefix,
                                    depth: next_depth,
                                });
                            }
                            Err(err) => return Some(Err(err)),
                        }
                    }
                }
            }
        }
    }
}

// ── Table-definition helpers ─────────────────────────────────────────

/// Creates a leaf entry from a route string (e.g. `articles/<int:year>/`).
///
/// # Errors
///
/// Returns [`WaypointError::ImproperlyConfigured`] for an invalid route.
pub fn path<V>(
    route: &str,
    view: impl Into<ViewRef<V>>,
    name: Option<&str>,
) -> WaypointResult<UrlEntry<V>> {
    let constraint: Arc<dyn Constraint> = Arc::new(RoutePattern::parse(route)?);
    Ok(UrlEntry::Pattern(UrlPattern::new(
        vec![constraint],
        view,
        name,
    )))
}

/// Creates a leaf entry from a raw regex pattern.
///
/// # Errors
///
/// Returns [`WaypointError::ImproperlyConfigured`] for an invalid regex.
pub fn re_path<V>(
    pattern: &str,
    view: impl Into<ViewRef<V>>,
    name: Option<&str>,
) -> WaypointResult<UrlEntry<V>> {
    let constraint: Arc<dyn Constraint> = Arc::new(RegexPattern::new(pattern)?);
    Ok(UrlEntry::Pattern(UrlPattern::new(
        vec![constraint],
        view,
        name,
    )))
}

/// Creates an internal node mounting `table` under a route prefix, with
/// optional instance and application namespaces.
///
/// # Errors
///
/// Returns [`WaypointError::ImproperlyConfigured`] for an invalid route.
pub fn include<V>(
    route: &str,
    table: Table<V>,
    namespace: Option<&str>,
    app_name: Option<&str>,
) -> WaypointResult<UrlEntry<V>> {
    let constraint: Arc<dyn Constraint> = Arc::new(RoutePattern::parse(route)?);
    Ok(UrlEntry::Include(SubResolver::new(
        constraint, table, namespace, app_name,
    )))
}

/// Like [`include`], but the nested table is produced lazily on first
/// traversal, permitting late-bound or circular routing references.
///
/// # Errors
///
/// Returns [`WaypointError::ImproperlyConfigured`] for an invalid route.
pub fn include_deferred<V>(
    route: &str,
    thunk: impl Fn() -> WaypointResult<Vec<UrlEntry<V>>> + Send + Sync + 'static,
    namespace: Option<&str>,
    app_name: Option<&str>,
) -> WaypointResult<UrlEntry<V>> {
    let constraint: Arc<dyn Constraint> = Arc::new(RoutePattern::parse(route)?);
    Ok(UrlEntry::Include(SubResolver::new(
        constraint,
        Table::deferred(thunk),
        namespace,
        app_name,
    )))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    type View = &'static str;

    fn root(entries: Vec<UrlEntry<View>>) -> Resolver<View> {
        Resolver::with_root_slash(Table::eager(entries)).unwrap()
    }

    #[test]
    fn test_resolve_simple_pattern() {
        let resolver = root(vec![path("articles/", "articles", Some("articles")).unwrap()]);
        let m = resolver.resolve("/articles/").unwrap();
        assert_eq!(m.view, "articles");
        assert_eq!(m.url_name.as_deref(), Some("articles"));
        assert!(m.kwargs.is_empty());
    }

    #[test]
    fn test_resolve_pattern_with_params() {
        let resolver = root(vec![
            path("articles/<int:year>/", "article_year", Some("article-year")).unwrap(),
        ]);
        let m = resolver.resolve("/articles/2024/").unwrap();
        assert_eq!(m.kwargs.get("year").unwrap(), "2024");
        assert_eq!(m.url_name.as_deref(), Some("article-year"));
    }

    #[test]
    fn test_resolve_requires_leading_slash() {
        let resolver = root(vec![path("articles/", "articles", None).unwrap()]);
        assert!(resolver.resolve("articles/").is_err());
    }

    #[test]
    fn test_resolve_partial_leaf_match_is_no_match() {
        let resolver = root(vec![path("articles/", "articles", None).unwrap()]);
        let err = resolver.resolve("/articles/extra/").unwrap_err();
        match err {
            WaypointError::NotFound { path, tried } => {
                assert_eq!(path, "/articles/extra/");
                assert_eq!(tried, vec!["articles/".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_resolve_first_match_wins() {
        let resolver = root(vec![
            path("articles/", "first", Some("first")).unwrap(),
            path("articles/", "second", Some("second")).unwrap(),
        ]);
        let m = resolver.resolve("/articles/").unwrap();
        assert_eq!(m.view, "first");
    }

    #[test]
    fn test_resolve_nested_include() {
        let users = Table::eager(vec![
            path("", "user_list", Some("user-list")).unwrap(),
            path("<int:id>/", "user_detail", Some("user-detail")).unwrap(),
        ]);
        let resolver = root(vec![
            include("users/", users, Some("users"), Some("users")).unwrap(),
        ]);

        let m = resolver.resolve("/users/").unwrap();
        assert_eq!(m.url_name.as_deref(), Some("user-list"));
        assert_eq!(m.namespaces, vec!["users"]);

        let m = resolver.resolve("/users/42/").unwrap();
        assert_eq!(m.url_name.as_deref(), Some("user-detail"));
        assert_eq!(m.kwargs.get("id").unwrap(), "42");
        assert_eq!(m.view_name(), "users:user-detail");
    }

    #[test]
    fn test_resolve_prefix_captures_merge() {
        let posts = Table::eager(vec![path("posts/", "posts", Some("posts")).unwrap()]);
        let resolver = root(vec![
            include("api/<str:version>/", posts, Some("api"), Some("api")).unwrap(),
        ]);
        let m = resolver.resolve("/api/v2/posts/").unwrap();
        assert_eq!(m.kwargs.get("version").unwrap(), "v2");
        assert_eq!(m.url_name.as_deref(), Some("posts"));
    }

    #[test]
    fn test_resolve_deeply_nested_namespaces() {
        let info = Table::eager(vec![path("info/", "info", Some("info")).unwrap()]);
        let detail = Table::eager(vec![
            include("<int:id>/", info, Some("detail"), Some("detail")).unwrap(),
        ]);
        let resolver = root(vec![
            include("users/", detail, Some("users"), Some("users")).unwrap(),
        ]);

        let m = resolver.resolve("/users/42/info/").unwrap();
        assert_eq!(m.kwargs.get("id").unwrap(), "42");
        assert_eq!(m.namespaces, vec!["users", "detail"]);
        assert_eq!(m.app_names, vec!["users", "detail"]);
    }

    #[test]
    fn test_resolve_prunes_non_matching_subtrees() {
        // The include prefix does not match, so its (deferred, failing)
        // table must never be forced.
        let resolver = root(vec![
            include_deferred(
                "admin/",
                || Err(WaypointError::config("must not be forced")),
                None,
                None,
            )
            .unwrap(),
            path("articles/", "articles", Some("articles")).unwrap(),
        ]);
        let m = resolver.resolve("/articles/").unwrap();
        assert_eq!(m.view, "articles");
    }

    #[test]
    fn test_resolve_empty_capture_keeps_default() {
        let entry = re_path(r"^articles/(?P<page>[0-9]*)$", "archive", Some("archive"))
            .unwrap()
            .with_defaults(&[("page", "1")]);
        let resolver = root(vec![entry]);
        let m = resolver.resolve("/articles/").unwrap();
        assert_eq!(m.kwargs.get("page").unwrap(), "1");

        let m = resolver.resolve("/articles/7").unwrap();
        assert_eq!(m.kwargs.get("page").unwrap(), "7");
    }

    #[test]
    fn test_resolve_defaults_merge_under_captures() {
        let entry = path("about/", "about", Some("about"))
            .unwrap()
            .with_defaults(&[("lang", "en")]);
        let resolver = root(vec![entry]);
        let m = resolver.resolve("/about/").unwrap();
        assert_eq!(m.kwargs.get("lang").unwrap(), "en");
        // Keyword arguments present, so positional args are dropped.
        assert!(m.args.is_empty());
    }

    #[test]
    fn test_deferred_table_forced_once() {
        static FORCED: AtomicUsize = AtomicUsize::new(0);
        let resolver = root(vec![
            include_deferred(
                "blog/",
                || {
                    FORCED.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![path("posts/", "posts", Some("posts")).unwrap()])
                },
                None,
                None,
            )
            .unwrap(),
        ]);
        resolver.resolve("/blog/posts/").unwrap();
        resolver.resolve("/blog/posts/").unwrap();
        assert_eq!(FORCED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_deferred_table_failure_is_configuration_error() {
        let resolver = root(vec![
            include_deferred(
                "blog/",
                || Err(WaypointError::config("table 'blog.urls' cannot be loaded")),
                None,
                None,
            )
            .unwrap(),
        ]);
        let err = resolver.resolve("/blog/posts/").unwrap_err();
        assert!(matches!(err, WaypointError::ImproperlyConfigured(_)));
    }

    struct StaticLoader;

    impl ViewLoader<View> for StaticLoader {
        fn load(&self, path: &str) -> WaypointResult<View> {
            match path {
                "blog.views.detail" => Ok("detail_view"),
                other => Err(WaypointError::config(format!("cannot import '{other}'"))),
            }
        }
    }

    #[test]
    fn test_dotted_view_resolution() {
        let resolver = root(vec![
            path("detail/", ViewRef::dotted("blog.views.detail"), Some("detail")).unwrap(),
        ])
        .with_view_loader(Arc::new(StaticLoader));
        let m = resolver.resolve("/detail/").unwrap();
        assert_eq!(m.view, "detail_view");
    }

    #[test]
    fn test_dotted_view_unresolvable() {
        let resolver = root(vec![
            path("broken/", ViewRef::dotted("no.such.view"), Some("broken")).unwrap(),
        ])
        .with_view_loader(Arc::new(StaticLoader));
        let err = resolver.resolve("/broken/").unwrap_err();
        assert!(matches!(err, WaypointError::ImproperlyConfigured(_)));
    }

    #[test]
    fn test_dotted_view_without_loader() {
        let resolver = root(vec![
            path("detail/", ViewRef::dotted("blog.views.detail"), None).unwrap(),
        ]);
        let err = resolver.resolve("/detail/").unwrap_err();
        assert!(matches!(err, WaypointError::ImproperlyConfigured(_)));
    }

    fn lookup_by_name(resolver: &Resolver<View>, name: &str) -> Lookup<View> {
        let mut segments: Vec<&str> = name.split(':').collect();
        let view = segments.pop().unwrap_or("");
        Lookup {
            namespaces: resolver.resolve_namespace(&segments, &[]).unwrap(),
            view: ViewLookup::Name(view.to_string()),
        }
    }

    #[test]
    fn test_search_yields_declaration_order() {
        let resolver = root(vec![
            path("a/<int:x>/", "a", Some("thing")).unwrap(),
            path("b/<int:x>/", "b", Some("thing")).unwrap(),
        ]);
        let lookup = lookup_by_name(&resolver, "thing");
        let candidates: Vec<Candidate> = resolver
            .search(&lookup)
            .unwrap()
            .collect::<WaypointResult<_>>()
            .unwrap();
        assert_eq!(candidates.len(), 2);
        // Root anchor plus the leaf constraint per candidate.
        assert_eq!(candidates[0].constraints.len(), 2);
        assert_eq!(candidates[0].constraints[1].describe(), "a/<int:x>/");
        assert_eq!(candidates[1].constraints[1].describe(), "b/<int:x>/");
    }

    #[test]
    fn test_search_is_restartable() {
        let resolver = root(vec![path("a/", "a", Some("a")).unwrap()]);
        let lookup = lookup_by_name(&resolver, "a");
        assert_eq!(resolver.search(&lookup).unwrap().count(), 1);
        assert_eq!(resolver.search(&lookup).unwrap().count(), 1);
    }

    #[test]
    fn test_search_respects_namespaces() {
        let shop = Table::eager(vec![path("item/", "item", Some("item")).unwrap()]);
        let resolver = root(vec![
            path("item/", "top_item", Some("item")).unwrap(),
            include("shop/", shop, Some("shop"), None).unwrap(),
        ]);

        let lookup = lookup_by_name(&resolver, "item");
        let candidates: Vec<Candidate> = resolver
            .search(&lookup)
            .unwrap()
            .collect::<WaypointResult<_>>()
            .unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].constraints[1].describe(), "item/");

        let lookup = lookup_by_name(&resolver, "shop:item");
        let candidates: Vec<Candidate> = resolver
            .search(&lookup)
            .unwrap()
            .collect::<WaypointResult<_>>()
            .unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].constraints[1].describe(), "shop/");
    }

    #[test]
    fn test_search_descends_transparent_includes() {
        let inner = Table::eager(vec![path("page/", "page", Some("page")).unwrap()]);
        let resolver = root(vec![include("docs/", inner, None, None).unwrap()]);
        let lookup = lookup_by_name(&resolver, "page");
        let candidates: Vec<Candidate> = resolver
            .search(&lookup)
            .unwrap()
            .collect::<WaypointResult<_>>()
            .unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].constraints.len(), 3);
    }

    #[test]
    fn test_search_by_view_identity() {
        let resolver = root(vec![path("x/", "target", Some("x")).unwrap()]);
        let lookup = Lookup {
            namespaces: Vec::new(),
            view: ViewLookup::View("target"),
        };
        assert_eq!(resolver.search(&lookup).unwrap().count(), 1);
    }

    #[test]
    fn test_resolve_namespace_prefers_current_app() {
        let shop_a = Table::eager(vec![path("item/", "a_item", Some("item")).unwrap()]);
        let shop_b = Table::eager(vec![path("item/", "b_item", Some("item")).unwrap()]);
        let resolver = root(vec![
            include("a/", shop_a, Some("shop"), Some("shopA")).unwrap(),
            include("b/", shop_b, Some("shop"), Some("shopB")).unwrap(),
        ]);

        let choices = resolver.resolve_namespace(&["shop"], &["shopB"]).unwrap();
        assert_eq!(
            choices,
            vec![NamespaceChoice {
                namespace: "shop".to_string(),
                app_name: Some("shopB".to_string()),
            }]
        );

        // Without a current app, the first declared instance wins.
        let choices = resolver.resolve_namespace(&["shop"], &[]).unwrap();
        assert_eq!(choices[0].app_name.as_deref(), Some("shopA"));
    }

    #[test]
    fn test_resolve_namespace_unknown_segment() {
        let resolver = root(vec![path("a/", "a", Some("a")).unwrap()]);
        let err = resolver.resolve_namespace(&["blog"], &[]).unwrap_err();
        assert!(err.to_string().contains("'blog' is not a registered namespace"));
    }

    #[test]
    fn test_resolved_match_view_name_without_namespace() {
        let resolver = root(vec![path("a/", "a", Some("a")).unwrap()]);
        let m = resolver.resolve("/a/").unwrap();
        assert_eq!(m.view_name(), "a");
    }

    #[test]
    fn test_resolved_match_debug_omits_view() {
        let resolver = root(vec![path("a/", "a", Some("a")).unwrap()]);
        let m = resolver.resolve("/a/").unwrap();
        let debug = format!("{m:?}");
        assert!(debug.contains("url_name"));
        assert!(debug.contains(".."));
    }
}
