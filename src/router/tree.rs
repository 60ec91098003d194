//! Radix tree of route patterns.
//!
//! Each node owns a byte segment of one or more registered patterns;
//! sibling order is maintained by a per-node priority counter so that
//! segments shared by many routes are scanned first. Wildcard segments
//! (`:name`, `*name`) are stored as dedicated node kinds and bind path
//! parameters during resolution.
//!
//! Segments are byte strings, not `str`: splitting two patterns at
//! their longest common prefix may cut a multi-byte rune in half.
//!
//! The tree is built once at configuration time and never mutated
//! afterwards, so lookups need no synchronization.

use std::mem;
use std::str;

use thiserror::Error;

use crate::router::params::PathParams;

/// Configuration-time route registration failures.
///
/// Every variant names the offending pattern (or the remaining part of
/// it at the point of conflict).
#[derive(Debug, Error)]
pub enum InsertError {
    #[error("a handler already exists for path '{pattern}'")]
    DuplicateRoute { pattern: String },

    #[error("conflicting wildcard path '{pattern}' in path segment '{segment}'")]
    WildcardConflict { pattern: String, segment: String },

    #[error("wildcard segment conflicts with an existing child in path '{pattern}'")]
    WildcardOverExistingChild { pattern: String },

    #[error("multiple wildcards in path '{pattern}'")]
    MultipleWildcards { pattern: String },

    #[error("wildcards must be named with a non-empty name in path '{pattern}'")]
    UnnamedWildcard { pattern: String },

    #[error("catch-all routes are only allowed at the end of the path '{pattern}'")]
    CatchAllNotTerminal { pattern: String },

    #[error("catch-all conflicts with existing handler for the path segment root in '{pattern}'")]
    CatchAllShadowsSlashHandler { pattern: String },

    #[error("no / before catch-all in path '{pattern}'")]
    CatchAllWithoutSlash { pattern: String },
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Wildcard names and values are always cut on rune boundaries, so the
/// conversion back to `str` cannot fail in practice.
fn param_str(bytes: &[u8]) -> &str {
    str::from_utf8(bytes).unwrap_or("")
}

/// Counts wildcard markers in a pattern, saturating at 255 so the count
/// fits the `max_parameters` hint.
fn count_wildcards(pattern: &str) -> u8 {
    let n = pattern
        .bytes()
        .filter(|&b| b == b':' || b == b'*')
        .count();
    n.min(255) as u8
}

/// Length of the longest common prefix of two byte strings.
fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Static,
    Root,
    Param,
    CatchAll,
}

/// A vertex of the radix tree.
///
/// `children` and `child_indices` are kept in sync by index: the first
/// byte of `children[i].segment` is `child_indices[i]` (the catch-all
/// separator node, whose segment is empty, is indexed under `/`). Both
/// are ordered by child priority, descending.
#[derive(Debug)]
pub(crate) struct Node<T> {
    /// The part of a route pattern this node owns.
    pub(crate) segment: Vec<u8>,

    /// The full pattern of the route this node terminates, or the route
    /// that created this wildcard node. Empty otherwise.
    pub(crate) route_pattern: String,

    pub(crate) kind: NodeKind,

    /// First byte of each child's segment, parallel to `children`.
    pub(crate) child_indices: Vec<u8>,

    pub(crate) children: Vec<Node<T>>,

    /// Set when the single child is a param or catch-all node.
    pub(crate) has_wild_child: bool,

    /// Number of registered routes passing through this node; siblings
    /// are sorted by it so hot branches front-load.
    pub(crate) priority: u32,

    /// Upper bound on wildcard segments on any path through this
    /// subtree; sizes the params list on lookup.
    pub(crate) max_parameters: u8,

    pub(crate) handler: Option<T>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            segment: Vec::new(),
            route_pattern: String::new(),
            kind: NodeKind::Static,
            child_indices: Vec::new(),
            children: Vec::new(),
            has_wild_child: false,
            priority: 0,
            max_parameters: 0,
            handler: None,
        }
    }
}

impl<T> Node<T> {
    /// Registers `pattern` in the subtree rooted at this node, splitting
    /// and extending nodes as needed.
    pub(crate) fn add_route(&mut self, pattern: &str, handler: T) -> Result<(), InsertError> {
        self.priority += 1;
        let mut params_left = count_wildcards(pattern);
        let route_pattern = pattern;

        // Empty tree: emit the whole pattern below the root.
        if self.segment.is_empty() && self.children.is_empty() {
            let result = self.insert_child(params_left, route_pattern, pattern.as_bytes(), handler);
            self.kind = NodeKind::Root;
            return result;
        }

        let mut n: &mut Node<T> = self;
        let mut path: &[u8] = pattern.as_bytes();

        'walk: loop {
            if params_left > n.max_parameters {
                n.max_parameters = params_left;
            }

            let pos = common_prefix_len(path, &n.segment);

            // The pattern diverges inside this node's segment: split the
            // node, pushing its tail (and everything attached to it)
            // down into a new child.
            if pos < n.segment.len() {
                let mut child = Node {
                    segment: n.segment[pos..].to_vec(),
                    route_pattern: String::new(),
                    kind: NodeKind::Static,
                    child_indices: mem::take(&mut n.child_indices),
                    children: mem::take(&mut n.children),
                    has_wild_child: n.has_wild_child,
                    priority: n.priority - 1,
                    max_parameters: 0,
                    handler: n.handler.take(),
                };

                for grandchild in &child.children {
                    if grandchild.max_parameters > child.max_parameters {
                        child.max_parameters = grandchild.max_parameters;
                    }
                }

                let index_byte = n.segment[pos];
                n.segment.truncate(pos);
                n.has_wild_child = false;
                n.child_indices = vec![index_byte];
                n.children = vec![child];
            }

            if pos < path.len() {
                path = &path[pos..];

                if n.has_wild_child {
                    n = &mut n.children[0];
                    n.priority += 1;
                    if params_left > n.max_parameters {
                        n.max_parameters = params_left;
                    }
                    params_left = params_left.saturating_sub(1);

                    // The pattern must repeat the wildcard verbatim,
                    // terminated by a slash or the pattern end.
                    if path.len() >= n.segment.len()
                        && n.segment == path[..n.segment.len()]
                        && (n.segment.len() >= path.len() || path[n.segment.len()] == b'/')
                    {
                        continue 'walk;
                    }

                    return Err(InsertError::WildcardConflict {
                        pattern: lossy(path),
                        segment: lossy(&n.segment),
                    });
                }

                let first = path[0];

                // Slash after a param node: descend into its only child.
                if n.kind == NodeKind::Param && first == b'/' && n.children.len() == 1 {
                    n = &mut n.children[0];
                    n.priority += 1;
                    continue 'walk;
                }

                // An existing child starts with the same byte.
                if let Some(i) = n.child_indices.iter().position(|&c| c == first) {
                    let i = n.bump_child_priority(i);
                    n = &mut n.children[i];
                    continue 'walk;
                }

                if first != b':' && first != b'*' {
                    n.child_indices.push(first);
                    n.children.push(Node {
                        route_pattern: route_pattern.to_string(),
                        max_parameters: params_left,
                        ..Node::default()
                    });
                    let i = n.bump_child_priority(n.children.len() - 1);
                    n = &mut n.children[i];
                }

                return n.insert_child(params_left, route_pattern, path, handler);
            }

            // The pattern ends exactly here: this node becomes terminal.
            if n.handler.is_some() {
                return Err(InsertError::DuplicateRoute {
                    pattern: lossy(path),
                });
            }
            n.route_pattern = route_pattern.to_string();
            n.handler = Some(handler);
            return Ok(());
        }
    }

    /// Emits the remainder of a pattern below this node, splicing in
    /// param and catch-all nodes for each wildcard segment.
    fn insert_child(
        &mut self,
        mut params_left: u8,
        route_pattern: &str,
        path: &[u8],
        handler: T,
    ) -> Result<(), InsertError> {
        let mut n: &mut Node<T> = self;
        let max = path.len();
        let mut offset = 0usize;
        let mut i = 0usize;

        while params_left > 0 && i < max {
            let c = path[i];
            if c != b':' && c != b'*' {
                i += 1;
                continue;
            }

            if !n.children.is_empty() {
                return Err(InsertError::WildcardOverExistingChild {
                    pattern: lossy(path),
                });
            }

            // Delimit the wildcard name, up to the next '/' or the end.
            let mut end = i + 1;
            while end < max && path[end] != b'/' {
                match path[end] {
                    b':' | b'*' => {
                        return Err(InsertError::MultipleWildcards {
                            pattern: lossy(path),
                        })
                    }
                    _ => end += 1,
                }
            }

            if end - i < 2 {
                return Err(InsertError::UnnamedWildcard {
                    pattern: lossy(path),
                });
            }

            if c == b':' {
                if i > 0 {
                    n.segment = path[offset..i].to_vec();
                    offset = i;
                }

                n.children = vec![Node {
                    route_pattern: route_pattern.to_string(),
                    kind: NodeKind::Param,
                    max_parameters: params_left,
                    ..Node::default()
                }];
                n.child_indices = vec![b':'];
                n.has_wild_child = true;
                n = &mut n.children[0];
                n.priority += 1;
                params_left -= 1;

                // More pattern follows the param: the param node keeps
                // the ':name' segment and gets an empty child for the
                // rest, starting at the separator.
                if end < max {
                    n.segment = path[offset..end].to_vec();
                    offset = end;

                    n.children = vec![Node {
                        max_parameters: params_left,
                        priority: 1,
                        ..Node::default()
                    }];
                    n.child_indices = vec![b'/'];
                    n = &mut n.children[0];
                }

                i += 1;
            } else {
                if end != max || params_left > 1 {
                    return Err(InsertError::CatchAllNotTerminal {
                        pattern: lossy(path),
                    });
                }

                if n.segment.last() == Some(&b'/') {
                    return Err(InsertError::CatchAllShadowsSlashHandler {
                        pattern: lossy(path),
                    });
                }

                let slash = i - 1;
                if path[slash] != b'/' {
                    return Err(InsertError::CatchAllWithoutSlash {
                        pattern: lossy(path),
                    });
                }

                n.segment = path[offset..slash].to_vec();

                // Splice a separator node (indexed under '/') holding
                // the terminal '/*name' leaf.
                n.children = vec![Node {
                    kind: NodeKind::CatchAll,
                    has_wild_child: true,
                    max_parameters: 1,
                    ..Node::default()
                }];
                n.child_indices = vec![path[slash]];
                n = &mut n.children[0];
                n.priority += 1;

                n.children = vec![Node {
                    segment: path[slash..].to_vec(),
                    route_pattern: route_pattern.to_string(),
                    kind: NodeKind::CatchAll,
                    max_parameters: 1,
                    priority: 1,
                    handler: Some(handler),
                    ..Node::default()
                }];
                n.child_indices = vec![b'/'];
                return Ok(());
            }
        }

        // No wildcard left: the rest of the pattern is one static
        // segment ending at this node.
        n.segment = path[offset..].to_vec();
        n.handler = Some(handler);
        Ok(())
    }

    /// Bumps the priority of the child at `pos` and bubbles it leftward
    /// past lower-priority siblings, keeping `child_indices` in lockstep.
    /// Returns the child's new position.
    fn bump_child_priority(&mut self, pos: usize) -> usize {
        self.children[pos].priority += 1;
        let priority = self.children[pos].priority;

        let mut new_pos = pos;
        while new_pos > 0 && self.children[new_pos - 1].priority < priority {
            self.children.swap(new_pos - 1, new_pos);
            self.child_indices.swap(new_pos - 1, new_pos);
            new_pos -= 1;
        }
        new_pos
    }

    /// Resolves a request path to `(handler, params, tsr)`.
    ///
    /// `tsr` recommends a redirect to the same path with the trailing
    /// slash toggled when that path has a handler and this one does not.
    pub(crate) fn resolve<'n, 'p>(
        &'n self,
        path: &'p str,
    ) -> (Option<&'n T>, Option<PathParams<'n, 'p>>, bool) {
        let mut n = self;
        let mut path: &'p [u8] = path.as_bytes();
        let mut params: Option<PathParams<'n, 'p>> = None;

        loop {
            if path.len() > n.segment.len() {
                if path[..n.segment.len()] == n.segment[..] {
                    path = &path[n.segment.len()..];

                    if !n.has_wild_child {
                        let first = path[0];
                        if let Some(i) = n.child_indices.iter().position(|&c| c == first) {
                            n = &n.children[i];
                            continue;
                        }

                        let tsr = path == b"/" && n.handler.is_some();
                        return (None, params, tsr);
                    }

                    n = &n.children[0];
                    match n.kind {
                        NodeKind::Param => {
                            let end = path
                                .iter()
                                .position(|&b| b == b'/')
                                .unwrap_or(path.len());

                            let ps = params.get_or_insert_with(|| {
                                PathParams::new(&n.route_pattern, n.max_parameters)
                            });
                            ps.push(param_str(&n.segment[1..]), param_str(&path[..end]));

                            if end < path.len() {
                                if !n.children.is_empty() {
                                    path = &path[end..];
                                    n = &n.children[0];
                                    continue;
                                }

                                let tsr = path.len() == end + 1;
                                return (None, params, tsr);
                            }

                            if n.handler.is_some() {
                                if !n.route_pattern.is_empty() {
                                    ps.set_route(&n.route_pattern);
                                }
                                return (n.handler.as_ref(), params, false);
                            }

                            if n.children.len() == 1 {
                                let child = &n.children[0];
                                let tsr = child.segment == b"/" && child.handler.is_some();
                                return (None, params, tsr);
                            }
                            return (None, params, false);
                        }

                        NodeKind::CatchAll => {
                            let ps = params.get_or_insert_with(|| {
                                PathParams::new(&n.route_pattern, n.max_parameters)
                            });
                            ps.push(param_str(&n.segment[2..]), param_str(path));

                            return (n.handler.as_ref(), params, false);
                        }

                        kind => unreachable!("invalid node kind {kind:?} below a wild child"),
                    }
                }
            } else if path == n.segment.as_slice() {
                if n.handler.is_some() {
                    if !n.route_pattern.is_empty() {
                        if let Some(ps) = params.as_mut() {
                            ps.set_route(&n.route_pattern);
                        }
                    }
                    return (n.handler.as_ref(), params, false);
                }

                // No handler here; a '/' child (or a catch-all below
                // one) would be reachable with a trailing slash.
                if let Some(i) = n.child_indices.iter().position(|&c| c == b'/') {
                    let child = &n.children[i];
                    let tsr = (child.segment == b"/" && child.handler.is_some())
                        || (child.kind == NodeKind::CatchAll
                            && child.children.first().is_some_and(|c| c.handler.is_some()));
                    if let Some(ps) = params.as_mut() {
                        ps.set_route(&child.route_pattern);
                    }
                    return (None, params, tsr);
                }
                return (None, params, false);
            }

            // Nothing matched; recommend toggling the trailing slash if
            // the registered segment differs from the path only by one.
            let tsr = path == b"/"
                || (n.segment.len() == path.len() + 1
                    && n.segment[path.len()] == b'/'
                    && path == &n.segment[..path.len()]
                    && n.handler.is_some());
            return (None, params, tsr);
        }
    }

    /// Case-insensitive lookup returning the registered-case path, with
    /// parameter values taken verbatim from the request. Optionally also
    /// repairs a missing or superfluous trailing slash.
    pub(crate) fn find_case_insensitive(
        &self,
        path: &str,
        fix_trailing_slash: bool,
    ) -> Option<String> {
        const STACK_BUF_SIZE: usize = 128;

        let buf = Vec::with_capacity(STACK_BUF_SIZE.max(path.len() + 1));
        let fixed = self.find_ci_rec(path.as_bytes(), buf, [0u8; 4], fix_trailing_slash)?;

        // Rejoined from stored segments and request slices cut at
        // positions both sides matched, so this cannot fail.
        String::from_utf8(fixed).ok()
    }

    /// Recursive worker for [`find_case_insensitive`].
    ///
    /// `rb` is a lookahead buffer holding the still-unconsumed bytes of
    /// the case-folded rune currently being matched; it survives node
    /// boundaries that split a multi-byte rune.
    fn find_ci_rec(
        &self,
        path: &[u8],
        ci_path: Vec<u8>,
        rb: [u8; 4],
        fix_trailing_slash: bool,
    ) -> Option<Vec<u8>> {
        let mut n = self;
        let mut np_len = n.segment.len();
        let mut path = path;
        let mut ci_path = ci_path;
        let mut rb = rb;

        'walk: while path.len() >= np_len
            && (np_len == 0 || eq_fold(&path[1..np_len], &n.segment[1..]))
        {
            let old_path = path;
            path = &path[np_len..];
            ci_path.extend_from_slice(&n.segment);

            if !path.is_empty() {
                if !n.has_wild_child {
                    // Skip rune bytes already consumed by this segment.
                    rb = shift_rune_bytes(rb, np_len);

                    if rb[0] != 0 {
                        // Still inside the previous rune.
                        let first = rb[0];
                        for (i, &index) in n.child_indices.iter().enumerate() {
                            if index == first {
                                n = &n.children[i];
                                np_len = n.segment.len();
                                continue 'walk;
                            }
                        }
                    } else {
                        // Decode the rune straddling the boundary; it
                        // may start up to three bytes back.
                        let mut rune = '\0';
                        let mut off = 0usize;
                        let max_off = np_len.min(3);
                        while off < max_off {
                            let start = np_len - off;
                            if rune_start(old_path[start]) {
                                rune = decode_rune(&old_path[start..]).0;
                                break;
                            }
                            off += 1;
                        }

                        let lower = fold_lower(rune);
                        rb = shift_rune_bytes(encode_rune(lower), off);

                        let first = rb[0];
                        for (i, &index) in n.child_indices.iter().enumerate() {
                            if index == first {
                                // Both cases may exist as children, so
                                // try lowercase in a branch first.
                                if let Some(out) = n.children[i].find_ci_rec(
                                    path,
                                    ci_path.clone(),
                                    rb,
                                    fix_trailing_slash,
                                ) {
                                    return Some(out);
                                }
                                break;
                            }
                        }

                        let upper = fold_upper(rune);
                        if upper != lower {
                            rb = shift_rune_bytes(encode_rune(upper), off);

                            let first = rb[0];
                            for (i, &index) in n.child_indices.iter().enumerate() {
                                if index == first {
                                    n = &n.children[i];
                                    np_len = n.segment.len();
                                    continue 'walk;
                                }
                            }
                        }
                    }

                    // Dead end; the path minus its trailing slash may
                    // still name a registered route.
                    if fix_trailing_slash && path == b"/" && n.handler.is_some() {
                        return Some(ci_path);
                    }
                    return None;
                }

                n = &n.children[0];
                match n.kind {
                    NodeKind::Param => {
                        let end = path
                            .iter()
                            .position(|&b| b == b'/')
                            .unwrap_or(path.len());

                        // Parameter values keep the request's own case.
                        ci_path.extend_from_slice(&path[..end]);

                        if end < path.len() {
                            if !n.children.is_empty() {
                                n = &n.children[0];
                                np_len = n.segment.len();
                                path = &path[end..];
                                continue 'walk;
                            }

                            if fix_trailing_slash && path.len() == end + 1 {
                                return Some(ci_path);
                            }
                            return None;
                        }

                        if n.handler.is_some() {
                            return Some(ci_path);
                        }

                        if fix_trailing_slash && n.children.len() == 1 {
                            let child = &n.children[0];
                            if child.segment == b"/" && child.handler.is_some() {
                                ci_path.push(b'/');
                                return Some(ci_path);
                            }
                        }
                        return None;
                    }

                    NodeKind::CatchAll => {
                        ci_path.extend_from_slice(path);
                        return Some(ci_path);
                    }

                    kind => unreachable!("invalid node kind {kind:?} below a wild child"),
                }
            }

            // Path exhausted at this node.
            if n.handler.is_some() {
                return Some(ci_path);
            }

            if fix_trailing_slash {
                for (i, &index) in n.child_indices.iter().enumerate() {
                    if index == b'/' {
                        let child = &n.children[i];
                        if (child.segment.len() == 1 && child.handler.is_some())
                            || (child.kind == NodeKind::CatchAll
                                && child.children.first().is_some_and(|c| c.handler.is_some()))
                        {
                            ci_path.push(b'/');
                            return Some(ci_path);
                        }
                        return None;
                    }
                }
            }
            return None;
        }

        // Nothing matched the walk; only trailing-slash repair remains.
        if !fix_trailing_slash {
            return None;
        }

        if path == b"/" {
            return Some(ci_path);
        }

        if n.handler.is_none() {
            return None;
        }

        if path.len() + 1 != np_len {
            return None;
        }

        if n.segment[path.len()] != b'/' {
            return None;
        }

        if !path.is_empty() && eq_fold(&path[1..], &n.segment[1..path.len()]) {
            ci_path.extend_from_slice(&n.segment);
            return Some(ci_path);
        }

        None
    }
}

/// Shifts the rune buffer left by `n` consumed bytes.
fn shift_rune_bytes(rb: [u8; 4], n: usize) -> [u8; 4] {
    match n {
        0 => rb,
        1 => [rb[1], rb[2], rb[3], 0],
        2 => [rb[2], rb[3], 0, 0],
        3 => [rb[3], 0, 0, 0],
        _ => [0; 4],
    }
}

/// True iff `b` is not a UTF-8 continuation byte.
fn rune_start(b: u8) -> bool {
    (b & 0xC0) != 0x80
}

/// Decodes the leading rune of a byte sequence; malformed input yields
/// the replacement character over one byte.
fn decode_rune(bytes: &[u8]) -> (char, usize) {
    for take in 1..=bytes.len().min(4) {
        if let Ok(s) = str::from_utf8(&bytes[..take]) {
            if let Some(c) = s.chars().next() {
                return (c, take);
            }
        }
    }
    (char::REPLACEMENT_CHARACTER, 1)
}

fn encode_rune(c: char) -> [u8; 4] {
    let mut buf = [0u8; 4];
    c.encode_utf8(&mut buf);
    buf
}

fn fold_lower(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn fold_upper(c: char) -> char {
    c.to_uppercase().next().unwrap_or(c)
}

/// Case-folding byte equality: rune-wise comparison that lowercases
/// both sides, decoding multi-byte runes where they occur.
fn eq_fold(a: &[u8], b: &[u8]) -> bool {
    let (mut i, mut j) = (0usize, 0usize);
    while i < a.len() && j < b.len() {
        let (ca, la) = decode_rune(&a[i..]);
        let (cb, lb) = decode_rune(&b[j..]);
        if ca != cb && fold_lower(ca) != fold_lower(cb) {
            return false;
        }
        i += la;
        j += lb;
    }
    i == a.len() && j == b.len()
}
