//! The dispatcher facade: cached resolvers, `resolve`, `reverse`, and
//! `reverse_lazy`.
//!
//! [`UrlDispatcher`] is the application-facing entry point. It loads
//! routing tables through a [`TableLoader`], caches one compiled
//! [`Resolver`] per table identity in an injectable [`ResolverCache`],
//! and exposes forward resolution and reverse URL construction on top.
//! Every dispatcher instance carries its own cache; nothing in this
//! module is process-global.

use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasher;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::OnceCell;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use waypoint_core::logging::resolution_span;
use waypoint_core::{Settings, WaypointError, WaypointResult};

use crate::constraints::Url;
use crate::resolver::{
    Candidate, Lookup, ResolvedMatch, Resolver, Table, UrlEntry, ViewLoader, ViewLookup,
};

/// Characters left verbatim when encoding a reversed URL: RFC 3986
/// unreserved and sub-delims, plus `/`, `:` and `@`.
const PATH_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b'/')
    .remove(b':')
    .remove(b'@');

/// Loads a routing table by its configured identity (e.g. `"root"` or
/// `"blog.urls"`).
pub trait TableLoader<V>: Send + Sync {
    /// Produces the entries of the named table.
    ///
    /// # Errors
    ///
    /// Returns [`WaypointError::ImproperlyConfigured`] when the identity
    /// does not name a known table.
    fn load(&self, table: &str) -> WaypointResult<Vec<UrlEntry<V>>>;
}

/// A keyed cache of compiled resolvers.
///
/// Each table identity maps to at most one [`Resolver`], built on first
/// use and shared thereafter. The cache is a plain component owned by its
/// dispatcher, so independent dispatchers never share compiled state.
pub struct ResolverCache<V> {
    inner: RwLock<HashMap<String, Arc<Resolver<V>>>>,
}

impl<V> Default for ResolverCache<V> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<V> fmt::Debug for ResolverCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        f.debug_tuple("ResolverCache").field(&keys).finish()
    }
}

impl<V> ResolverCache<V> {
    /// Returns the cached resolver for `key`, building it with `build`
    /// under the write lock when absent.
    pub fn get_or_create(
        &self,
        key: &str,
        build: impl FnOnce() -> WaypointResult<Resolver<V>>,
    ) -> WaypointResult<Arc<Resolver<V>>> {
        if let Some(found) = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Ok(Arc::clone(found));
        }
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have built it between the locks.
        if let Some(found) = guard.get(key) {
            return Ok(Arc::clone(found));
        }
        let resolver = Arc::new(build()?);
        guard.insert(key.to_string(), Arc::clone(&resolver));
        Ok(resolver)
    }

    /// Drops every cached resolver.
    pub fn clear(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// How a reverse lookup names its target.
///
/// The variant is chosen by the caller; the dispatcher never inspects a
/// name to guess which kind it is.
#[derive(Debug, Clone, Copy)]
pub enum NameRef<'a, V> {
    /// A pattern name, possibly namespace-qualified (`"shop:item"`).
    Name(&'a str),
    /// A dotted view path, resolved through the view loader. Deprecated
    /// in favor of named patterns; a `warn` event is emitted on use.
    Dotted(&'a str),
    /// A handler compared by identity against each leaf's view.
    View(&'a V),
}

impl<'a, V> From<&'a str> for NameRef<'a, V> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

/// The routing facade: per-table resolver cache, forward resolution, and
/// reverse URL construction.
pub struct UrlDispatcher<V> {
    tables: Arc<dyn TableLoader<V>>,
    views: Option<Arc<dyn ViewLoader<V>>>,
    cache: ResolverCache<V>,
    default_table: String,
    script_prefix: RwLock<String>,
}

impl<V> fmt::Debug for UrlDispatcher<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlDispatcher")
            .field("default_table", &self.default_table)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl<V: Clone> UrlDispatcher<V> {
    /// Creates a dispatcher with a default table identity and the
    /// conventional `/` script prefix.
    pub fn new(tables: Arc<dyn TableLoader<V>>, default_table: &str) -> Self {
        Self {
            tables,
            views: None,
            cache: ResolverCache::default(),
            default_table: default_table.to_string(),
            script_prefix: RwLock::new("/".to_string()),
        }
    }

    /// Creates a dispatcher configured from [`Settings`].
    pub fn from_settings(tables: Arc<dyn TableLoader<V>>, settings: &Settings) -> Self {
        Self {
            tables,
            views: None,
            cache: ResolverCache::default(),
            default_table: settings.root_table.clone(),
            script_prefix: RwLock::new(settings.normalized_script_prefix()),
        }
    }

    /// Installs a loader for dotted view references.
    #[must_use]
    pub fn with_view_loader(mut self, views: Arc<dyn ViewLoader<V>>) -> Self {
        self.views = Some(views);
        self
    }

    /// Sets the prefix prepended to every reversed URL, normalized to
    /// start and end with `/`.
    pub fn set_script_prefix(&self, prefix: &str) {
        let mut normalized = prefix.to_string();
        if !normalized.starts_with('/') {
            normalized.insert(0, '/');
        }
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        *self
            .script_prefix
            .write()
            .unwrap_or_else(PoisonError::into_inner) = normalized;
    }

    /// Returns the current script prefix.
    pub fn script_prefix(&self) -> String {
        self.script_prefix
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drops all cached resolvers, forcing tables to be reloaded and
    /// recompiled on next use.
    pub fn invalidate(&self) {
        self.cache.clear();
    }

    /// Returns the compiled resolver for a table, building and caching it
    /// on first use. `None` selects the default table.
    ///
    /// # Errors
    ///
    /// Returns [`WaypointError::ImproperlyConfigured`] when the table
    /// cannot be loaded or contains an invalid pattern.
    pub fn resolver(&self, table: Option<&str>) -> WaypointResult<Arc<Resolver<V>>> {
        let key = table.unwrap_or(&self.default_table);
        self.cache.get_or_create(key, || {
            tracing::debug!(table = key, "compiling routing table");
            let entries = self.tables.load(key)?;
            let mut resolver = Resolver::with_root_slash(Table::eager(entries))?;
            if let Some(views) = &self.views {
                resolver = resolver.with_view_loader(Arc::clone(views));
            }
            Ok(resolver)
        })
    }

    /// Resolves a request path against a table. `None` selects the
    /// default table.
    ///
    /// # Errors
    ///
    /// Returns [`WaypointError::NotFound`] when no pattern consumes the
    /// path, or [`WaypointError::ImproperlyConfigured`] for table and
    /// view loading failures.
    pub fn resolve(&self, path: &str, table: Option<&str>) -> WaypointResult<ResolvedMatch<V>> {
        let span = resolution_span("resolve", path);
        let _guard = span.enter();
        self.resolver(table)?.resolve(path)
    }
}

impl<V: Clone + PartialEq> UrlDispatcher<V> {
    /// Builds the URL that would resolve to the named target with the
    /// given arguments.
    ///
    /// Candidates are tried in declaration order; the first whose
    /// constraints accept the arguments wins. The result is the script
    /// prefix joined with the constructed path, percent-encoded, with a
    /// double leading slash collapsed to `/%2F` so the URL cannot be
    /// mistaken for a scheme-relative reference.
    ///
    /// `current_app` steers namespace instance selection: each `:`
    /// separated segment prefers the instance whose application namespace
    /// matches.
    ///
    /// # Errors
    ///
    /// Returns [`WaypointError::NoReverseMatch`] listing every pattern
    /// tried when no candidate accepts the arguments.
    pub fn reverse<S: BuildHasher>(
        &self,
        name: NameRef<'_, V>,
        table: Option<&str>,
        args: &[&str],
        kwargs: &HashMap<&str, &str, S>,
        current_app: Option<&str>,
    ) -> WaypointResult<String> {
        let display_name = match &name {
            NameRef::Name(name) | NameRef::Dotted(name) => (*name).to_string(),
            NameRef::View(_) => "<view>".to_string(),
        };
        let span = resolution_span("reverse", &display_name);
        let _guard = span.enter();

        let resolver = self.resolver(table)?;
        let current_app: Vec<&str> = current_app
            .map(|app| app.split(':').collect())
            .unwrap_or_default();

        let lookup = match name {
            NameRef::Name(name) => {
                let mut segments: Vec<&str> = name.split(':').collect();
                let view = segments.pop().unwrap_or_default();
                Lookup {
                    namespaces: resolver.resolve_namespace(&segments, &current_app)?,
                    view: ViewLookup::Name(view.to_string()),
                }
            }
            NameRef::Dotted(path) => {
                tracing::warn!(view = path, "reversing by dotted view path is deprecated");
                let views = self.views.as_deref().ok_or_else(|| {
                    WaypointError::NoReverseMatch(format!(
                        "error importing '{path}': no view loader installed"
                    ))
                })?;
                let view = views.load(path).map_err(|err| {
                    WaypointError::NoReverseMatch(format!("error importing '{path}': {err}"))
                })?;
                Lookup {
                    namespaces: Vec::new(),
                    view: ViewLookup::View(view),
                }
            }
            NameRef::View(view) => Lookup {
                namespaces: Vec::new(),
                view: ViewLookup::View(view.clone()),
            },
        };

        let text_args: Vec<String> = args.iter().map(|a| (*a).to_string()).collect();
        let text_kwargs: HashMap<String, String> = kwargs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();

        let prefix = self.script_prefix();
        let prefix = prefix.trim_end_matches('/');
        let skip = resolver.root_constraints().len();

        let mut tried = Vec::new();
        for candidate in resolver.search(&lookup)? {
            let candidate = candidate?;
            if let Some(path) = try_construct(&candidate, &text_args, &text_kwargs) {
                return Ok(finalize_url(prefix, &path));
            }
            let chain: String = candidate
                .constraints
                .iter()
                .skip(skip)
                .map(|c| c.describe())
                .collect();
            tried.push(chain);
        }
        Err(WaypointError::NoReverseMatch(format!(
            "Reverse for '{display_name}' with arguments '{args:?}' and keyword arguments \
             '{kwargs:?}' not found. {} pattern(s) tried: {tried:?}",
            tried.len()
        )))
    }
}

/// Threads the argument pool through a candidate's constraint chain and
/// applies the leaf's default-keyword checks. `None` means the candidate
/// does not accept these arguments and the search moves on.
fn try_construct(
    candidate: &Candidate,
    args: &[String],
    kwargs: &HashMap<String, String>,
) -> Option<String> {
    let mut url = Url::new();
    let mut rem_args = args.to_vec();
    let mut rem_kwargs = kwargs.clone();
    for constraint in &candidate.constraints {
        match constraint.construct(url, rem_args, rem_kwargs) {
            Ok(state) => (url, rem_args, rem_kwargs) = state,
            Err(_) => return None,
        }
    }
    // Leftover keywords are acceptable only when the leaf declares them as
    // defaults, and a caller-supplied value for a default key must equal
    // the default.
    if rem_kwargs
        .keys()
        .any(|key| !candidate.default_kwargs.contains_key(key))
    {
        return None;
    }
    for (key, default) in &candidate.default_kwargs {
        if let Some(supplied) = kwargs.get(key) {
            if supplied != default {
                return None;
            }
        }
    }
    if !rem_args.is_empty() {
        return None;
    }
    Some(url.into_path())
}

fn finalize_url(prefix: &str, path: &str) -> String {
    let joined = format!("{prefix}{path}");
    let encoded = utf8_percent_encode(&joined, PATH_SAFE).to_string();
    match encoded.strip_prefix("//") {
        Some(rest) => format!("/%2F{rest}"),
        None => encoded,
    }
}

/// A deferred reverse lookup, evaluated at most once on first access.
///
/// Useful for URLs referenced from definitions that run before the
/// routing tables are fully wired, such as redirect targets in static
/// configuration.
pub struct LazyUrl<V> {
    dispatcher: Arc<UrlDispatcher<V>>,
    name: String,
    table: Option<String>,
    args: Vec<String>,
    kwargs: HashMap<String, String>,
    current_app: Option<String>,
    cell: OnceCell<WaypointResult<String>>,
}

impl<V> fmt::Debug for LazyUrl<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyUrl")
            .field("name", &self.name)
            .field("resolved", &self.cell.get().is_some())
            .finish_non_exhaustive()
    }
}

impl<V: Clone + PartialEq> LazyUrl<V> {
    /// Returns the reversed URL, performing the lookup on first call and
    /// caching the outcome.
    ///
    /// # Errors
    ///
    /// Returns the [`WaypointError::NoReverseMatch`] the underlying
    /// lookup produced; the failure is cached like a success.
    pub fn get(&self) -> WaypointResult<&str> {
        let outcome = self.cell.get_or_init(|| {
            let args: Vec<&str> = self.args.iter().map(String::as_str).collect();
            let kwargs: HashMap<&str, &str> = self
                .kwargs
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            self.dispatcher.reverse(
                NameRef::Name(&self.name),
                self.table.as_deref(),
                &args,
                &kwargs,
                self.current_app.as_deref(),
            )
        });
        match outcome {
            Ok(url) => Ok(url.as_str()),
            Err(err) => Err(err.clone()),
        }
    }
}

impl<V: Clone + PartialEq> UrlDispatcher<V> {
    /// Creates a deferred reverse lookup by pattern name.
    pub fn reverse_lazy(
        self: &Arc<Self>,
        name: &str,
        table: Option<&str>,
        args: &[&str],
        kwargs: &[(&str, &str)],
        current_app: Option<&str>,
    ) -> LazyUrl<V> {
        LazyUrl {
            dispatcher: Arc::clone(self),
            name: name.to_string(),
            table: table.map(String::from),
            args: args.iter().map(|a| (*a).to_string()).collect(),
            kwargs: kwargs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            current_app: current_app.map(String::from),
            cell: OnceCell::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{include, path, re_path};

    type View = &'static str;

    struct FixtureTables;

    impl TableLoader<View> for FixtureTables {
        fn load(&self, table: &str) -> WaypointResult<Vec<UrlEntry<View>>> {
            match table {
                "root" => Ok(vec![
                    path("articles/<int:year>/", "article_year", Some("article-year"))?,
                    path("articles/<int:year>/<slug:slug>/", "article", Some("article"))?,
                    path("about/", "about", Some("about"))?
                        .with_defaults(&[("lang", "en")]),
                    re_path(r"^legacy/(?P<id>[0-9]+)/$", "legacy", Some("legacy"))?,
                    include(
                        "shop/",
                        Table::eager(vec![path("item/<int:id>/", "item", Some("item"))?]),
                        Some("shop"),
                        Some("shopA"),
                    )?,
                ]),
                "tiny" => Ok(vec![path("only/", "only", Some("only"))?]),
                other => Err(WaypointError::config(format!("unknown table '{other}'"))),
            }
        }
    }

    fn dispatcher() -> UrlDispatcher<View> {
        UrlDispatcher::new(Arc::new(FixtureTables), "root")
    }

    fn no_kwargs() -> HashMap<&'static str, &'static str> {
        HashMap::new()
    }

    #[test]
    fn test_reverse_by_name() {
        let d = dispatcher();
        let kwargs = HashMap::from([("year", "2024")]);
        let url = d
            .reverse(NameRef::Name("article-year"), None, &[], &kwargs, None)
            .unwrap();
        assert_eq!(url, "/articles/2024/");
    }

    #[test]
    fn test_reverse_with_positional_args() {
        let d = dispatcher();
        let url = d
            .reverse(
                NameRef::Name("legacy"),
                None,
                &["7"],
                &no_kwargs(),
                None,
            )
            .unwrap();
        assert_eq!(url, "/legacy/7/");
    }

    #[test]
    fn test_reverse_namespaced() {
        let d = dispatcher();
        let kwargs = HashMap::from([("id", "3")]);
        let url = d
            .reverse(NameRef::Name("shop:item"), None, &[], &kwargs, None)
            .unwrap();
        assert_eq!(url, "/shop/item/3/");
    }

    #[test]
    fn test_reverse_rejects_wrong_arg_type() {
        let d = dispatcher();
        let kwargs = HashMap::from([("year", "not-a-year")]);
        let err = d
            .reverse(NameRef::Name("article-year"), None, &[], &kwargs, None)
            .unwrap_err();
        match err {
            WaypointError::NoReverseMatch(message) => {
                assert!(message.contains("Reverse for 'article-year'"));
                assert!(message.contains("1 pattern(s) tried"));
                assert!(message.contains("articles/<int:year>/"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_reverse_unknown_name() {
        let d = dispatcher();
        let err = d
            .reverse(
                NameRef::Name("no-such-name"),
                None,
                &[],
                &no_kwargs(),
                None,
            )
            .unwrap_err();
        assert!(err.to_string().contains("0 pattern(s) tried"));
    }

    #[test]
    fn test_reverse_default_kwarg_must_match() {
        let d = dispatcher();
        let kwargs = HashMap::from([("lang", "en")]);
        let url = d
            .reverse(NameRef::Name("about"), None, &[], &kwargs, None)
            .unwrap();
        assert_eq!(url, "/about/");

        let kwargs = HashMap::from([("lang", "fr")]);
        assert!(d
            .reverse(NameRef::Name("about"), None, &[], &kwargs, None)
            .is_err());
    }

    #[test]
    fn test_reverse_extra_kwarg_rejected() {
        let d = dispatcher();
        let kwargs = HashMap::from([("year", "2024"), ("page", "2")]);
        assert!(d
            .reverse(NameRef::Name("article-year"), None, &[], &kwargs, None)
            .is_err());
    }

    #[test]
    fn test_reverse_leftover_positional_rejected() {
        let d = dispatcher();
        assert!(d
            .reverse(
                NameRef::Name("about"),
                None,
                &["stray"],
                &no_kwargs(),
                None,
            )
            .is_err());
    }

    #[test]
    fn test_reverse_by_view_identity() {
        let d = dispatcher();
        let kwargs = HashMap::from([("year", "2024"), ("slug", "hello")]);
        let url = d
            .reverse(NameRef::View(&"article"), None, &[], &kwargs, None)
            .unwrap();
        assert_eq!(url, "/articles/2024/hello/");
    }

    #[test]
    fn test_reverse_percent_encodes() {
        let d = dispatcher();
        let kwargs = HashMap::from([("year", "2024"), ("slug", "a_b")]);
        let url = d
            .reverse(NameRef::View(&"article"), None, &[], &kwargs, None)
            .unwrap();
        assert_eq!(url, "/articles/2024/a_b/");
    }

    #[test]
    fn test_reverse_with_script_prefix() {
        let d = dispatcher();
        d.set_script_prefix("/app");
        let kwargs = HashMap::from([("year", "2024")]);
        let url = d
            .reverse(NameRef::Name("article-year"), None, &[], &kwargs, None)
            .unwrap();
        assert_eq!(url, "/app/articles/2024/");
    }

    #[test]
    fn test_finalize_url_escapes_double_slash() {
        assert_eq!(finalize_url("", "//evil.example/"), "/%2Fevil.example/");
        assert_eq!(finalize_url("", "/fine/"), "/fine/");
    }

    #[test]
    fn test_finalize_url_keeps_safe_characters() {
        assert_eq!(finalize_url("", "/a@b:c/~d/"), "/a@b:c/~d/");
        assert_eq!(finalize_url("", "/sp ace/"), "/sp%20ace/");
    }

    #[test]
    fn test_resolve_via_dispatcher() {
        let d = dispatcher();
        let m = d.resolve("/articles/2024/", None).unwrap();
        assert_eq!(m.view, "article_year");
        assert_eq!(m.kwargs.get("year").unwrap(), "2024");
    }

    #[test]
    fn test_named_table_selection() {
        let d = dispatcher();
        let m = d.resolve("/only/", Some("tiny")).unwrap();
        assert_eq!(m.view, "only");
        assert!(d.resolve("/only/", None).is_err());
    }

    #[test]
    fn test_unknown_table() {
        let d = dispatcher();
        let err = d.resolve("/x/", Some("missing")).unwrap_err();
        assert!(matches!(err, WaypointError::ImproperlyConfigured(_)));
    }

    #[test]
    fn test_resolver_cache_reuses_instances() {
        let d = dispatcher();
        let first = d.resolver(None).unwrap();
        let second = d.resolver(None).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        d.invalidate();
        let third = d.resolver(None).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn test_from_settings() {
        let settings = Settings {
            root_table: "tiny".to_string(),
            script_prefix: "/app".to_string(),
            ..Settings::default()
        };
        let d = UrlDispatcher::from_settings(Arc::new(FixtureTables), &settings);
        assert_eq!(d.script_prefix(), "/app/");
        let url = d
            .reverse(NameRef::Name("only"), None, &[], &no_kwargs(), None)
            .unwrap();
        assert_eq!(url, "/app/only/");
    }

    #[test]
    fn test_reverse_lazy_defers_and_caches() {
        let d = Arc::new(dispatcher());
        let lazy = d.reverse_lazy("article-year", None, &[], &[("year", "2024")], None);
        assert_eq!(lazy.get().unwrap(), "/articles/2024/");
        // The cached outcome is stable across calls.
        assert_eq!(lazy.get().unwrap(), "/articles/2024/");
    }

    #[test]
    fn test_reverse_lazy_failure_is_cached() {
        let d = Arc::new(dispatcher());
        let lazy = d.reverse_lazy("no-such-name", None, &[], &[], None);
        assert!(lazy.get().is_err());
        assert!(lazy.get().is_err());
    }

    struct DottedViews;

    impl ViewLoader<View> for DottedViews {
        fn load(&self, path: &str) -> WaypointResult<View> {
            match path {
                "site.views.about" => Ok("about"),
                other => Err(WaypointError::config(format!("cannot import '{other}'"))),
            }
        }
    }

    #[test]
    fn test_reverse_by_dotted_path() {
        let d = UrlDispatcher::new(Arc::new(FixtureTables), "root")
            .with_view_loader(Arc::new(DottedViews));
        let kwargs = HashMap::from([("lang", "en")]);
        let url = d
            .reverse(
                NameRef::Dotted("site.views.about"),
                None,
                &[],
                &kwargs,
                None,
            )
            .unwrap();
        assert_eq!(url, "/about/");
    }

    #[test]
    fn test_reverse_by_dotted_path_import_failure() {
        let d = UrlDispatcher::new(Arc::new(FixtureTables), "root")
            .with_view_loader(Arc::new(DottedViews));
        let err = d
            .reverse(
                NameRef::<View>::Dotted("no.such.view"),
                None,
                &[],
                &no_kwargs(),
                None,
            )
            .unwrap_err();
        assert!(err.to_string().contains("error importing 'no.such.view'"));
    }

    #[test]
    fn test_reverse_by_dotted_path_without_loader() {
        let d = dispatcher();
        let err = d
            .reverse(
                NameRef::<View>::Dotted("site.views.about"),
                None,
                &[],
                &no_kwargs(),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, WaypointError::NoReverseMatch(_)));
    }
}
