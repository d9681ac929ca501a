/* Computes nullable, firstpos and lastpos bottom up over the syntax tree and derives the
 * followpos relation between leaf positions. */

use crate::positions::PositionSet;
use crate::syntax_tree::{NodeKind, SyntaxNode, SyntaxTree};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

/// Annotate every node below and including `node`, children before parents
pub(crate) fn annotate(node: &mut SyntaxNode) {
    if let Some(left) = node.left.as_deref_mut() {
        annotate(left);
    }
    if let Some(right) = node.right.as_deref_mut() {
        annotate(right);
    }

    let children = (node.left.as_deref(), node.right.as_deref());
    let (nullable, firstpos, lastpos) = match (node.kind, children.0, children.1) {
        (NodeKind::Leaf(_), _, _) => {
            let position = node.position.map(PositionSet::singleton).unwrap_or_default();
            (false, position.clone(), position)
        }
        (NodeKind::Star, Some(child), _) => (true, child.firstpos.clone(), child.lastpos.clone()),
        (NodeKind::Alternate, Some(left), Some(right)) => (
            left.nullable || right.nullable,
            left.firstpos.union(&right.firstpos),
            left.lastpos.union(&right.lastpos),
        ),
        (NodeKind::Concat, Some(left), Some(right)) => {
            let firstpos = if left.nullable {
                left.firstpos.union(&right.firstpos)
            } else {
                left.firstpos.clone()
            };
            let lastpos = if right.nullable {
                left.lastpos.union(&right.lastpos)
            } else {
                right.lastpos.clone()
            };
            (left.nullable && right.nullable, firstpos, lastpos)
        }
        // The parser never builds an operator without its operands
        _ => (false, PositionSet::new(), PositionSet::new()),
    };

    node.nullable = nullable;
    node.firstpos = firstpos;
    node.lastpos = lastpos;
}

/// Recompute the annotations of a whole tree. Running it on an annotated tree changes nothing.
pub fn annotate_tree(tree: &mut SyntaxTree) {
    annotate(&mut tree.root);
}

/// For every leaf position, the positions that can follow it in a matched string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowposTable {
    follows: BTreeMap<usize, PositionSet>,
}

impl FollowposTable {
    fn new(num_positions: usize) -> Self {
        let follows = (1..=num_positions)
            .map(|position| (position, PositionSet::new()))
            .collect();
        FollowposTable { follows }
    }

    pub fn get(&self, position: usize) -> Option<&PositionSet> {
        self.follows.get(&position)
    }

    pub fn len(&self) -> usize {
        self.follows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.follows.is_empty()
    }

    /// Entries in ascending position order
    pub fn iter(&self) -> btree_map::Iter<'_, usize, PositionSet> {
        self.follows.iter()
    }

    fn add_follows(&mut self, from: &PositionSet, to: &PositionSet) {
        for position in from.iter() {
            self.follows.entry(position).or_default().union_with(to);
        }
    }

    /// Render the table with the symbol of every position
    pub fn display<'a>(&'a self, tree: &'a SyntaxTree) -> FollowposDisplay<'a> {
        FollowposDisplay { table: self, tree }
    }
}

pub struct FollowposDisplay<'a> {
    table: &'a FollowposTable,
    tree: &'a SyntaxTree,
}

impl fmt::Display for FollowposDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<10}{:<8}followpos", "position", "symbol")?;
        for (position, follows) in self.table.iter() {
            let symbol = match self.tree.symbol_at(*position) {
                Some(symbol) => symbol.to_string(),
                None => "?".to_string(),
            };
            writeln!(f, "{:<10}{:<8}{}", position, symbol, follows)?;
        }
        Ok(())
    }
}

/// Build the followpos table of an annotated tree
pub fn build_followpos_table(tree: &SyntaxTree) -> FollowposTable {
    let mut table = FollowposTable::new(tree.get_num_positions());
    let mut nodes: Vec<&SyntaxNode> = vec![tree.get_root()];

    while let Some(node) = nodes.pop() {
        match (node.get_kind(), node.get_left(), node.get_right()) {
            (NodeKind::Concat, Some(left), Some(right)) => {
                table.add_follows(left.get_lastpos(), right.get_firstpos());
            }
            (NodeKind::Star, Some(child), _) => {
                table.add_follows(child.get_lastpos(), child.get_firstpos());
            }
            _ => {}
        }

        if let Some(left) = node.get_left() {
            nodes.push(left);
        }
        if let Some(right) = node.get_right() {
            nodes.push(right);
        }
    }

    log::debug!(
        "Built followpos table for {:?} with {} entries",
        tree.get_regex(),
        table.len()
    );

    table
}

#[cfg(test)]
mod annotator_tests {
    use super::*;
    use crate::syntax_tree::build_syntax_tree;

    fn positions(set: &PositionSet) -> Vec<usize> {
        set.to_vec()
    }

    fn collect_annotations(node: &SyntaxNode, out: &mut Vec<(bool, Vec<usize>, Vec<usize>)>) {
        out.push((
            node.is_nullable(),
            positions(node.get_firstpos()),
            positions(node.get_lastpos()),
        ));
        if let Some(left) = node.get_left() {
            collect_annotations(left, out);
        }
        if let Some(right) = node.get_right() {
            collect_annotations(right, out);
        }
    }

    fn check_leaves(node: &SyntaxNode) {
        if let NodeKind::Leaf(_) = node.get_kind() {
            let position = node.get_position().unwrap();
            assert_eq!(positions(node.get_firstpos()), vec![position]);
            assert_eq!(positions(node.get_lastpos()), vec![position]);
            assert!(!node.is_nullable());
        }
        if let Some(left) = node.get_left() {
            check_leaves(left);
        }
        if let Some(right) = node.get_right() {
            check_leaves(right);
        }
    }

    #[test]
    fn test_leaf_annotations() {
        let tree = build_syntax_tree("a(b|c)*d+").unwrap();
        check_leaves(tree.get_root());
    }

    #[test]
    fn test_classic_example() {
        // (a|b)*abb# with a:1 b:2 a:3 b:4 b:5 #:6
        let tree = build_syntax_tree("(a|b)*abb").unwrap();
        let root = tree.get_root();
        assert!(!root.is_nullable());
        assert_eq!(positions(root.get_firstpos()), vec![1, 2, 3]);
        assert_eq!(positions(root.get_lastpos()), vec![6]);

        let table = build_followpos_table(&tree);
        assert_eq!(positions(table.get(1).unwrap()), vec![1, 2, 3]);
        assert_eq!(positions(table.get(2).unwrap()), vec![1, 2, 3]);
        assert_eq!(positions(table.get(3).unwrap()), vec![4]);
        assert_eq!(positions(table.get(4).unwrap()), vec![5]);
        assert_eq!(positions(table.get(5).unwrap()), vec![6]);
        assert!(table.get(6).unwrap().is_empty());
    }

    #[test]
    fn test_star_is_nullable() {
        let tree = build_syntax_tree("a*").unwrap();
        let star = tree.get_root().get_left().unwrap();
        assert_eq!(star.get_kind(), NodeKind::Star);
        assert!(star.is_nullable());
        // Concatenation with a nullable left side starts at either operand
        assert_eq!(positions(tree.get_root().get_firstpos()), vec![1, 2]);
    }

    #[test]
    fn test_alternation_nullable_when_either_side_is() {
        let tree = build_syntax_tree("a*|b").unwrap();
        let alternation = tree.get_root().get_left().unwrap();
        assert_eq!(alternation.get_kind(), NodeKind::Alternate);
        assert!(alternation.is_nullable());
        assert_eq!(positions(alternation.get_firstpos()), vec![1, 2]);
        assert_eq!(positions(alternation.get_lastpos()), vec![1, 2]);
    }

    #[test]
    fn test_concat_lastpos_with_nullable_right() {
        let tree = build_syntax_tree("ab*").unwrap();
        let concat = tree.get_root().get_left().unwrap();
        assert_eq!(concat.get_kind(), NodeKind::Concat);
        assert!(!concat.is_nullable());
        assert_eq!(positions(concat.get_firstpos()), vec![1]);
        assert_eq!(positions(concat.get_lastpos()), vec![1, 2]);
    }

    #[test]
    fn test_annotation_is_idempotent() {
        let mut tree = build_syntax_tree("a*((bc)+|(c|d)*|aa)+").unwrap();
        let mut before = Vec::new();
        collect_annotations(tree.get_root(), &mut before);

        annotate_tree(&mut tree);

        let mut after = Vec::new();
        collect_annotations(tree.get_root(), &mut after);
        assert_eq!(before, after);
    }

    #[test]
    fn test_followpos_has_every_position() {
        for regex in ["a", "a|b|c", "(ab|c)+d*", "a*((b)+|a)+"] {
            let tree = build_syntax_tree(regex).unwrap();
            let table = build_followpos_table(&tree);
            assert_eq!(table.len(), tree.get_num_positions());
            for position in 1..=tree.get_num_positions() {
                assert!(table.get(position).is_some(), "{} misses {}", regex, position);
            }
        }
    }

    #[test]
    fn test_terminator_has_no_follows() {
        let tree = build_syntax_tree("(a|b)*c").unwrap();
        let table = build_followpos_table(&tree);
        assert!(table.get(tree.get_end_position()).unwrap().is_empty());
    }

    #[test]
    fn test_display_table() {
        let tree = build_syntax_tree("ab").unwrap();
        let table = build_followpos_table(&tree);
        let rendered = table.display(&tree).to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "1         a       {2}");
        assert_eq!(lines[3], "3         #       {}");
    }
}
