//! Roadmap tree parser and tree helpers.
//!
//! Roadmap outlines arrive as depth-marked lines:
//!
//! ```text
//! | Basics
//! || Variables
//! | Control Flow
//! ```
//!
//! The count of leading `|` is the depth (a line with none sits at depth 1).
//! Every line hangs under the most recent line one level up, which is how
//! siblings and children are told apart in a single left-to-right scan.

use std::collections::HashMap;

use tracing::{debug, instrument};

use roadmapper_shared::{NodeId, Result, RoadmapError, RoadmapNode};

/// Character whose leading run encodes depth.
pub const DEPTH_MARKER: char = '|';

/// Parse a depth-marked outline into a tree rooted at `root_name`.
///
/// Fails with a format error when the text has no marker at all. Lines whose
/// parent depth has not been seen yet are dropped. An empty child list is not
/// an error here; callers decide how many topics they need.
#[instrument(skip_all, fields(root = root_name, bytes = text.len()))]
pub fn parse(text: &str, root_name: &str) -> Result<RoadmapNode> {
    if !text.contains(DEPTH_MARKER) {
        return Err(RoadmapError::format(
            "roadmap text contains no depth markers",
        ));
    }

    // Flat arena: index 0 is the synthetic root.
    let mut names: Vec<String> = vec![root_name.trim().to_string()];
    let mut children: Vec<Vec<usize>> = vec![Vec::new()];
    let mut latest_at_depth: HashMap<usize, usize> = HashMap::from([(0, 0)]);
    let mut dropped = 0usize;

    for line in text.trim().lines() {
        let Some((depth, name)) = split_line(line) else {
            continue;
        };

        let Some(&parent) = latest_at_depth.get(&(depth - 1)) else {
            dropped += 1;
            continue;
        };

        let index = names.len();
        names.push(name);
        children.push(Vec::new());
        children[parent].push(index);
        latest_at_depth.insert(depth, index);
    }

    debug!(nodes = names.len(), dropped, "roadmap text parsed");

    Ok(materialize(0, &mut names, &children))
}

/// Depth and cleaned name of a line, or `None` for blank content.
///
/// Only markers at the very start of the line count, so an indented
/// `  || B` sits at depth 1.
fn split_line(line: &str) -> Option<(usize, String)> {
    let depth = line.chars().take_while(|&c| c == DEPTH_MARKER).count().max(1);
    let name: String = line.chars().filter(|&c| c != DEPTH_MARKER).collect();
    let name = name.trim();
    (!name.is_empty()).then(|| (depth, name.to_string()))
}

fn materialize(index: usize, names: &mut [String], children: &[Vec<usize>]) -> RoadmapNode {
    let mut node = RoadmapNode::new(std::mem::take(&mut names[index]));
    node.children = children[index]
        .iter()
        .map(|&child| materialize(child, names, children))
        .collect();
    node
}

// ---------------------------------------------------------------------------
// Traversal helpers
// ---------------------------------------------------------------------------

/// All nodes in pre-order, root first.
pub fn flatten(root: &RoadmapNode) -> Vec<&RoadmapNode> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        out.push(node);
        stack.extend(node.children.iter().rev());
    }
    out
}

/// Number of nodes including the root.
pub fn node_count(root: &RoadmapNode) -> usize {
    1 + root.children.iter().map(node_count).sum::<usize>()
}

/// Depth of the deepest node (a lone root has depth 0).
pub fn max_depth(root: &RoadmapNode) -> usize {
    root.children
        .iter()
        .map(|c| 1 + max_depth(c))
        .max()
        .unwrap_or(0)
}

pub fn find(root: &RoadmapNode, id: NodeId) -> Option<&RoadmapNode> {
    if root.id == id {
        return Some(root);
    }
    root.children.iter().find_map(|c| find(c, id))
}

pub fn find_mut(root: &mut RoadmapNode, id: NodeId) -> Option<&mut RoadmapNode> {
    if root.id == id {
        return Some(root);
    }
    root.children.iter_mut().find_map(|c| find_mut(c, id))
}

/// First node in pre-order whose name matches, ignoring ASCII case.
pub fn find_by_name<'a>(root: &'a RoadmapNode, name: &str) -> Option<&'a RoadmapNode> {
    flatten(root)
        .into_iter()
        .find(|n| n.name.eq_ignore_ascii_case(name.trim()))
}

/// Visit every node mutably, parents before children.
pub fn for_each_mut(root: &mut RoadmapNode, f: &mut impl FnMut(&mut RoadmapNode)) {
    f(root);
    for child in &mut root.children {
        for_each_mut(child, f);
    }
}

/// Graft `overlay`'s children under the node `target`.
///
/// Returns `false` (and leaves the tree alone) if `target` is not in the tree.
pub fn attach_overlay(root: &mut RoadmapNode, target: NodeId, overlay: RoadmapNode) -> bool {
    match find_mut(root, target) {
        Some(node) => {
            node.children.extend(overlay.children);
            true
        }
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render the tree back into the depth-marker grammar (root omitted).
pub fn to_marker_text(root: &RoadmapNode) -> String {
    fn walk(node: &RoadmapNode, depth: usize, out: &mut Vec<String>) {
        for child in &node.children {
            out.push(format!(
                "{} {}",
                DEPTH_MARKER.to_string().repeat(depth),
                child.name
            ));
            walk(child, depth + 1, out);
        }
    }

    let mut lines = Vec::new();
    walk(root, 1, &mut lines);
    lines.join("\n")
}

/// Indented, human-readable outline. With `details`, descriptions and links
/// are printed under each topic.
pub fn render_outline(root: &RoadmapNode, details: bool) -> String {
    fn walk(node: &RoadmapNode, depth: usize, details: bool, out: &mut String) {
        let indent = "  ".repeat(depth);
        let bullet = if depth == 0 { "" } else { "- " };
        out.push_str(&format!("{indent}{bullet}{}\n", node.name));
        if details {
            let pad = "  ".repeat(depth + 1);
            if let Some(description) = &node.description {
                out.push_str(&format!("{pad}{description}\n"));
            }
            if let Some(link) = &node.reference_link {
                out.push_str(&format!("{pad}<{link}>\n"));
            }
        }
        for child in &node.children {
            walk(child, depth + 1, details, out);
        }
    }

    let mut out = String::new();
    walk(root, 0, details, &mut out);
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn names(nodes: &[RoadmapNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn parses_siblings_and_children() {
        let root = parse("| A\n|| B\n| C", "Root").unwrap();
        assert_eq!(root.name, "Root");
        assert_eq!(names(&root.children), ["A", "C"]);
        assert_eq!(names(&root.children[0].children), ["B"]);
        assert!(root.children[1].children.is_empty());
    }

    #[test]
    fn node_count_matches_non_blank_lines() {
        let text = "| Basics\n|| Variables\n||| Shadowing\n|| Types\n\n| Advanced\n|| Traits\n||   \n";
        let root = parse(text, "Rust").unwrap();
        assert_eq!(node_count(&root), 6 + 1);
        assert_eq!(max_depth(&root), 3);
    }

    #[test]
    fn text_without_markers_is_format_error() {
        let err = parse("Basics\nAdvanced", "Rust").unwrap_err();
        assert!(matches!(err, RoadmapError::Format { .. }));
    }

    #[test]
    fn unmarked_lines_sit_at_depth_one() {
        let root = parse("Intro\n| Basics\n|| Syntax", "Go").unwrap();
        assert_eq!(names(&root.children), ["Intro", "Basics"]);
        assert_eq!(names(&root.children[1].children), ["Syntax"]);
    }

    #[test]
    fn indented_markers_do_not_add_depth() {
        let root = parse("  | A\n  || B\n|| C", "Root").unwrap();
        let names: Vec<&str> = root.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
        assert!(root.children[0].children.is_empty());
        assert_eq!(root.children[1].children[0].name, "C");
    }

    #[test]
    fn orphaned_depth_is_dropped() {
        let root = parse("||| Too deep\n| Basics\n||| Still too deep\n|| Ok", "Go").unwrap();
        assert_eq!(names(&root.children), ["Basics"]);
        assert_eq!(names(&root.children[0].children), ["Ok"]);
        assert_eq!(node_count(&root), 3);
    }

    #[test]
    fn later_sibling_becomes_insertion_point() {
        let root = parse("| A\n|| A1\n| B\n|| B1\n|| B2", "Root").unwrap();
        assert_eq!(names(&root.children[0].children), ["A1"]);
        assert_eq!(names(&root.children[1].children), ["B1", "B2"]);
    }

    #[test]
    fn markers_inside_names_are_stripped() {
        let root = parse("|  Pipes | and | bars  ", "Shell").unwrap();
        assert_eq!(root.children[0].name, "Pipes  and  bars");
    }

    #[test]
    fn marker_only_text_yields_empty_root() {
        let root = parse("|||\n|", "Empty").unwrap();
        assert!(root.children.is_empty());
    }

    #[test]
    fn every_node_gets_a_distinct_id() {
        let root = parse("| Loops\n|| Loops\n| Loops", "Rust").unwrap();
        let mut ids: Vec<_> = flatten(&root).iter().map(|n| n.id).collect();
        ids.sort_by_key(|id| id.0);
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn flatten_is_pre_order() {
        let root = parse("| A\n|| A1\n||| A1a\n| B", "R").unwrap();
        let order: Vec<&str> = flatten(&root).iter().map(|n| n.name.as_str()).collect();
        assert_eq!(order, ["R", "A", "A1", "A1a", "B"]);
    }

    #[test]
    fn find_and_attach_overlay() {
        let mut root = parse("| Basics\n| Loops", "Rust").unwrap();
        let loops = find_by_name(&root, "loops").unwrap().id;
        let overlay = parse("| For\n| While", "Loops").unwrap();

        assert!(attach_overlay(&mut root, loops, overlay.clone()));
        let loops_node = find(&root, loops).unwrap();
        assert_eq!(names(&loops_node.children), ["For", "While"]);

        assert!(!attach_overlay(&mut root, NodeId::new(), overlay));
    }

    #[test]
    fn marker_text_reparses_to_same_shape() {
        let root = parse("| A\n|| B\n||| C\n| D", "R").unwrap();
        let again = parse(&to_marker_text(&root), "R").unwrap();
        assert_eq!(render_outline(&root, false), render_outline(&again, false));
    }

    #[test]
    fn outline_includes_details_when_asked() {
        let mut root = parse("| Basics", "Rust").unwrap();
        root.children[0].description = Some("Start here".into());
        root.children[0].reference_link = Some("https://example.com/v".into());

        let plain = render_outline(&root, false);
        assert_eq!(plain, "Rust\n  - Basics\n");

        let detailed = render_outline(&root, true);
        assert!(detailed.contains("    Start here\n"));
        assert!(detailed.contains("<https://example.com/v>"));
    }
}
