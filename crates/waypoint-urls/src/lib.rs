//! # waypoint-urls
//!
//! URL resolution and reverse routing over hierarchical pattern tables.
//!
//! Routing tables are ordered lists of entries built with [`path`],
//! [`re_path`], and [`include`]; a [`UrlDispatcher`] loads them by name
//! through a [`TableLoader`], compiles each table once, and answers two
//! questions: which view handles a request path ([`UrlDispatcher::resolve`])
//! and which URL reaches a named view with given arguments
//! ([`UrlDispatcher::reverse`]).
//!
//! The view type is generic: any `Clone` value works as a handler, and
//! reverse lookup by handler identity additionally needs `PartialEq`.
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use waypoint_core::WaypointResult;
//! use waypoint_urls::{path, NameRef, TableLoader, UrlDispatcher, UrlEntry};
//!
//! struct SiteTables;
//!
//! impl TableLoader<&'static str> for SiteTables {
//!     fn load(&self, table: &str) -> WaypointResult<Vec<UrlEntry<&'static str>>> {
//!         assert_eq!(table, "root");
//!         Ok(vec![
//!             path("articles/<int:year>/", "year_archive", Some("article-year"))?,
//!         ])
//!     }
//! }
//!
//! # fn main() -> WaypointResult<()> {
//! let dispatcher = UrlDispatcher::new(Arc::new(SiteTables), "root");
//!
//! let found = dispatcher.resolve("/articles/2024/", None)?;
//! assert_eq!(found.view, "year_archive");
//! assert_eq!(found.kwargs.get("year").map(String::as_str), Some("2024"));
//!
//! let kwargs = HashMap::from([("year", "2024")]);
//! let url = dispatcher.reverse(NameRef::Name("article-year"), None, &[], &kwargs, None)?;
//! assert_eq!(url, "/articles/2024/");
//! # Ok(())
//! # }
//! ```

pub mod base;
pub mod constraints;
pub mod converters;
pub mod resolver;

pub use base::{LazyUrl, NameRef, ResolverCache, TableLoader, UrlDispatcher};
pub use constraints::{Constraint, ConstraintMatch, RegexPattern, ReverseMismatch, RoutePattern, Url};
pub use converters::{converter, Converter};
pub use resolver::{
    include, include_deferred, path, re_path, Candidate, Lookup, NamespaceChoice, ResolvedMatch,
    Resolver, Search, SubResolver, Table, UrlEntry, UrlPattern, ViewLoader, ViewLookup, ViewRef,
};
