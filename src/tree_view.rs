use std::collections::HashSet;

use crate::models::Node;

/// One line of the rendered tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeRow<'a> {
    pub node: &'a Node,
    pub depth: usize,
    pub is_expanded: bool,
    pub has_children: bool,
}

/// Rows in display order: each node followed by its children when expanded.
pub fn visible_rows<'a>(forest: &'a [Node], expanded_ids: &[String]) -> Vec<TreeRow<'a>> {
    let expanded: HashSet<&str> = expanded_ids.iter().map(String::as_str).collect();
    let mut rows = Vec::new();
    let mut stack: Vec<(&Node, usize)> = forest.iter().rev().map(|node| (node, 0)).collect();

    while let Some((node, depth)) = stack.pop() {
        let is_expanded = expanded.contains(node.id.as_str());
        rows.push(TreeRow {
            node,
            depth,
            is_expanded,
            has_children: node.has_children(),
        });
        if is_expanded {
            stack.extend(node.children().iter().rev().map(|child| (child, depth + 1)));
        }
    }
    rows
}

pub fn row_index(rows: &[TreeRow<'_>], id: &str) -> Option<usize> {
    rows.iter().position(|row| row.node.id == id)
}

/// Id of the row `offset` steps away from `id`, clamped to the list.
pub fn neighbour_id(rows: &[TreeRow<'_>], id: Option<&str>, offset: isize) -> Option<String> {
    if rows.is_empty() {
        return None;
    }
    let current = id.and_then(|id| row_index(rows, id)).unwrap_or(0) as isize;
    let target = (current + offset).clamp(0, rows.len() as isize - 1) as usize;
    Some(rows[target].node.id.clone())
}
