//! Request routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route registration (at startup):
//!     add(method, pattern, handler)
//!         → per-method radix tree (tree.rs)
//!
//! Incoming request:
//!     resolve(method, path)
//!         → tree walk, parameter binding (params.rs)
//!         → (handler, PathParams, trailing-slash recommendation)
//! ```
//!
//! # Design Decisions
//! - One radix tree per HTTP method; conflict detection is per-method
//! - Trees are immutable after startup, lookups share them without locks
//! - No regex in the hot path; a single byte-indexed child scan per node

mod dot;
mod params;
mod tree;

use dot::TreeDotWriter;
pub use params::{PathParam, PathParams};
pub use tree::InsertError;

use std::collections::HashMap;
use std::io;

use tree::Node;

/// A method-dispatching radix-tree router.
///
/// Handlers are stored by value; callers that need shared ownership
/// register an `Arc`. The router is built once, then read concurrently.
pub struct Router<T> {
    trees: HashMap<String, Node<T>>,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self {
            trees: HashMap::new(),
        }
    }
}

impl<T> Router<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `pattern` under the given HTTP method.
    /// The method is normalized to uppercase.
    ///
    /// Pattern grammar: slash-prefixed segments, `:name` matching one
    /// segment, `*name` matching the rest of the path (terminal only).
    pub fn add(&mut self, method: &str, pattern: &str, handler: T) -> Result<(), InsertError> {
        self.trees
            .entry(method.to_ascii_uppercase())
            .or_default()
            .add_route(pattern, handler)
    }

    /// Resolves a request to `(handler, params, tsr)`.
    ///
    /// A missing handler with `tsr == true` means the same path with
    /// the trailing slash toggled names a registered route; callers
    /// typically answer with a redirect.
    pub fn resolve<'r, 'p>(
        &'r self,
        method: &str,
        path: &'p str,
    ) -> (Option<&'r T>, Option<PathParams<'r, 'p>>, bool) {
        match self.trees.get(method) {
            Some(root) => root.resolve(path),
            None => (None, None, false),
        }
    }

    /// Case-insensitive lookup of `path` under `method`, returning the
    /// registered-case path when exactly one route matches. With
    /// `fix_trailing_slash` the lookup also repairs a missing or
    /// superfluous trailing `/`.
    pub fn find_case_insensitive(
        &self,
        method: &str,
        path: &str,
        fix_trailing_slash: bool,
    ) -> Option<String> {
        self.trees
            .get(method)?
            .find_case_insensitive(path, fix_trailing_slash)
    }

    /// The methods that have at least one registered route.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.trees.keys().map(String::as_str)
    }

    /// Dumps the tree for `method` as a Graphviz DOT digraph.
    pub fn write_dot<W: io::Write>(&self, method: &str, writer: &mut W) -> io::Result<()> {
        let Some(root) = self.trees.get(method) else {
            return Ok(());
        };
        TreeDotWriter::default().write(writer, root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_by_method() {
        let mut router = Router::new();
        router.add("GET", "/users/:id", "get-user").unwrap();
        router.add("POST", "/users", "create-user").unwrap();

        let (handler, params, _) = router.resolve("GET", "/users/42");
        assert_eq!(handler, Some(&"get-user"));
        assert_eq!(params.unwrap().get("id"), Some("42"));

        let (handler, _, _) = router.resolve("POST", "/users");
        assert_eq!(handler, Some(&"create-user"));

        let (handler, params, tsr) = router.resolve("DELETE", "/users/42");
        assert!(handler.is_none());
        assert!(params.is_none());
        assert!(!tsr);
    }

    #[test]
    fn method_is_normalized_on_registration() {
        let mut router = Router::new();
        router.add("get", "/hi", "hi").unwrap();

        let (handler, _, _) = router.resolve("GET", "/hi");
        assert_eq!(handler, Some(&"hi"));
    }

    #[test]
    fn same_pattern_allowed_across_methods() {
        let mut router = Router::new();
        router.add("GET", "/users/:id", "get").unwrap();
        router.add("PUT", "/users/:id", "put").unwrap();

        assert!(router.add("GET", "/users/:id", "again").is_err());
    }

    #[test]
    fn case_insensitive_goes_through_method_tree() {
        let mut router = Router::new();
        router.add("GET", "/ABC/", "abc").unwrap();

        assert_eq!(
            router.find_case_insensitive("GET", "/abc", true),
            Some("/ABC/".to_string())
        );
        assert_eq!(
            router.find_case_insensitive("GET", "/abc/", false),
            Some("/ABC/".to_string())
        );
        assert_eq!(router.find_case_insensitive("POST", "/abc", true), None);
    }
}
