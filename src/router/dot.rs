//! Graphviz DOT dump of a routing tree, for debugging route sets.

use std::io::{self, Write};

use crate::router::tree::Node;

/// Writes the structure of a routing tree in the DOT graph-description
/// language. Node labels carry the owned segment and priority; colors
/// distinguish the root, static segments and wildcard segments.
pub(crate) struct TreeDotWriter {
    pub(crate) color_scheme: String,
    pub(crate) base_color_root: u32,
    pub(crate) base_color_wildcard: u32,
    pub(crate) base_color_static: u32,
}

impl Default for TreeDotWriter {
    fn default() -> Self {
        Self {
            color_scheme: "set312".to_string(),
            base_color_root: 1,
            base_color_wildcard: 2,
            base_color_static: 6,
        }
    }
}

impl TreeDotWriter {
    pub(crate) fn write<T, W: Write>(&self, writer: &mut W, root: &Node<T>) -> io::Result<()> {
        writeln!(writer, "digraph G {{")?;

        let root_label = format!("{}[t=root]", segment_str(root));
        writeln!(
            writer,
            "  \"{}\" [color=\"{}\", colorscheme=\"{}\", style=\"filled\", shape=\"polygon\"];",
            escape(&root_label),
            self.base_color_root,
            self.color_scheme,
        )?;

        for child in &root.children {
            self.write_node(writer, child)?;
            self.write_edge(writer, &root_label, child)?;
            self.write_subtree(writer, child)?;
        }

        writeln!(writer, "}}")
    }

    fn write_subtree<T, W: Write>(&self, writer: &mut W, node: &Node<T>) -> io::Result<()> {
        if node.segment.is_empty() {
            return Ok(());
        }

        for child in &node.children {
            if child.segment.is_empty() {
                continue;
            }

            self.write_node(writer, child)?;
            self.write_edge(writer, &label(node), child)?;

            if !child.children.is_empty() {
                self.write_subtree(writer, child)?;
            }
        }
        Ok(())
    }

    fn write_node<T, W: Write>(&self, writer: &mut W, node: &Node<T>) -> io::Result<()> {
        let base = if matches!(node.segment.first(), Some(&b':') | Some(&b'*')) {
            self.base_color_wildcard
        } else {
            self.base_color_static
        };

        write!(
            writer,
            "  \"{}\" [color=\"{}\", colorscheme=\"{}\", style=\"filled\"",
            escape(&label(node)),
            base + node.priority,
            self.color_scheme,
        )?;
        if node.children.is_empty() {
            write!(writer, ", shape=\"box\"")?;
        }
        writeln!(writer, "];")
    }

    fn write_edge<T, W: Write>(
        &self,
        writer: &mut W,
        parent_label: &str,
        child: &Node<T>,
    ) -> io::Result<()> {
        writeln!(
            writer,
            "  \"{}\" -> \"{}\";",
            escape(parent_label),
            escape(&label(child)),
        )
    }
}

fn segment_str<T>(node: &Node<T>) -> String {
    String::from_utf8_lossy(&node.segment).into_owned()
}

fn label<T>(node: &Node<T>) -> String {
    format!("{}[p={}]", segment_str(node), node.priority)
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::Router;

    #[test]
    fn dumps_nodes_and_edges() {
        let mut router = Router::new();
        router.add("GET", "/hi", "hi").unwrap();
        router.add("GET", "/hello/:name", "hello").unwrap();

        let mut out = Vec::new();
        router.write_dot("GET", &mut out).unwrap();
        let dot = String::from_utf8(out).unwrap();

        assert!(dot.starts_with("digraph G {"));
        assert!(dot.contains("[t=root]"));
        assert!(dot.contains(":name"));
        assert!(dot.contains(" -> "));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn unknown_method_writes_nothing() {
        let router: Router<&str> = Router::new();
        let mut out = Vec::new();
        router.write_dot("GET", &mut out).unwrap();
        assert!(out.is_empty());
    }
}
