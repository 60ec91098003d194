//! Path parameter bindings produced by route resolution.

use std::collections::HashMap;

/// A single binding of a wildcard segment name to a slice of the request
/// path.
///
/// The name borrows from the routing tree, the value from the request
/// path handed to [`resolve`](crate::router::Router::resolve).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathParam<'k, 'v> {
    pub name: &'k str,
    pub value: &'v str,
}

/// The ordered list of path parameters extracted while resolving a
/// request path, plus the route pattern that produced them.
///
/// Order is insertion order, which equals left-to-right pattern order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathParams<'k, 'v> {
    route: &'k str,
    params: Vec<PathParam<'k, 'v>>,
}

impl<'k, 'v> PathParams<'k, 'v> {
    /// The capacity comes from the tree's `max_parameters` hint so the
    /// hot path never reallocates.
    pub(crate) fn new(route: &'k str, capacity: u8) -> Self {
        Self {
            route,
            params: Vec::with_capacity(capacity as usize),
        }
    }

    pub(crate) fn push(&mut self, name: &'k str, value: &'v str) {
        self.params.push(PathParam { name, value });
    }

    pub(crate) fn set_route(&mut self, route: &'k str) {
        self.route = route;
    }

    /// The registered pattern that matched, e.g. `/users/:id/about`.
    pub fn route(&self) -> &'k str {
        self.route
    }

    /// All bindings in pattern order. Duplicate names are preserved.
    pub fn entries(&self) -> &[PathParam<'k, 'v>] {
        &self.params
    }

    /// The value bound to `name`, if any.
    pub fn get(&self, name: &str) -> Option<&'v str> {
        self.params
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value)
    }

    /// Bindings as a map. Duplicate names collapse to the last binding.
    pub fn as_map(&self) -> HashMap<&'k str, &'v str> {
        self.params.iter().map(|p| (p.name, p.value)).collect()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_keep_insertion_order() {
        let mut params = PathParams::new("/files/:dir/*filepath", 2);
        params.push("dir", "js");
        params.push("filepath", "/inc/framework.js");

        let entries = params.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "dir");
        assert_eq!(entries[0].value, "js");
        assert_eq!(entries[1].name, "filepath");
        assert_eq!(entries[1].value, "/inc/framework.js");
        assert_eq!(params.route(), "/files/:dir/*filepath");
    }

    #[test]
    fn get_returns_first_match() {
        let mut params = PathParams::new("/a/:x/:y", 2);
        params.push("x", "1");
        params.push("y", "2");

        assert_eq!(params.get("x"), Some("1"));
        assert_eq!(params.get("y"), Some("2"));
        assert_eq!(params.get("z"), None);
    }

    #[test]
    fn map_collapses_duplicates_to_last_write() {
        let mut params = PathParams::new("/a/:x/:x", 2);
        params.push("x", "first");
        params.push("x", "second");

        // All entries survive, the map keeps the last write.
        assert_eq!(params.entries().len(), 2);
        assert_eq!(params.as_map().get("x"), Some(&"second"));
    }
}
