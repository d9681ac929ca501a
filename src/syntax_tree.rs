/* Recursive descent parser turning a normalized pattern into a binary syntax tree whose leaves
 * are numbered with unique positions. The parser works on substrings and picks the operator
 * with the lowest precedence that is not nested inside parentheses:
 *
 *   alternation < concatenation < kleene star < group / symbol
 *
 * Both binary operators are located by scanning from the right so that chains of them bind to
 * the left. */

use crate::annotator;
use crate::error::ParseError;
use crate::fa::{Symbol, TERMINATOR};
use crate::normalizer::{self, ALTERNATE, CONCAT, LPAREN, RPAREN, STAR};
use crate::positions::PositionSet;
use color_eyre::eyre::{Report, Result, WrapErr};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Leaf(Symbol),
    Concat,
    Alternate,
    Star,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Leaf(symbol) => write!(f, "{}", symbol),
            NodeKind::Concat => write!(f, "{}", CONCAT),
            NodeKind::Alternate => write!(f, "{}", ALTERNATE),
            NodeKind::Star => write!(f, "{}", STAR),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub(crate) kind: NodeKind,
    pub(crate) left: Option<Box<SyntaxNode>>,
    pub(crate) right: Option<Box<SyntaxNode>>,
    pub(crate) position: Option<usize>,
    pub(crate) nullable: bool,
    pub(crate) firstpos: PositionSet,
    pub(crate) lastpos: PositionSet,
}

impl SyntaxNode {
    fn new(kind: NodeKind, left: Option<SyntaxNode>, right: Option<SyntaxNode>) -> Self {
        SyntaxNode {
            kind,
            left: left.map(Box::new),
            right: right.map(Box::new),
            position: None,
            nullable: false,
            firstpos: PositionSet::new(),
            lastpos: PositionSet::new(),
        }
    }

    fn leaf(symbol: Symbol) -> Self {
        SyntaxNode::new(NodeKind::Leaf(symbol), None, None)
    }

    fn binary(kind: NodeKind, left: SyntaxNode, right: SyntaxNode) -> Self {
        SyntaxNode::new(kind, Some(left), Some(right))
    }

    fn star(child: SyntaxNode) -> Self {
        SyntaxNode::new(NodeKind::Star, Some(child), None)
    }

    pub fn get_kind(&self) -> NodeKind {
        self.kind
    }

    /// The only child of a star node, or the left operand of a binary node
    pub fn get_left(&self) -> Option<&SyntaxNode> {
        self.left.as_deref()
    }

    pub fn get_right(&self) -> Option<&SyntaxNode> {
        self.right.as_deref()
    }

    /// Position of a leaf. Operator nodes have none.
    pub fn get_position(&self) -> Option<usize> {
        self.position
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn get_firstpos(&self) -> &PositionSet {
        &self.firstpos
    }

    pub fn get_lastpos(&self) -> &PositionSet {
        &self.lastpos
    }

    fn count_leaves(&self) -> usize {
        match self.kind {
            NodeKind::Leaf(_) => 1,
            _ => {
                self.left.as_ref().map_or(0, |left| left.count_leaves())
                    + self.right.as_ref().map_or(0, |right| right.count_leaves())
            }
        }
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}{}", "", self.kind, indent = depth * 2)?;
        if let Some(position) = self.position {
            write!(f, " [{}]", position)?;
        }
        writeln!(
            f,
            " nullable={} firstpos={} lastpos={}",
            self.nullable, self.firstpos, self.lastpos
        )?;
        if let Some(left) = &self.left {
            left.fmt_indented(f, depth + 1)?;
        }
        if let Some(right) = &self.right {
            right.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

/// A numbered and annotated syntax tree together with the index from symbols to the positions
/// of the leaves carrying them.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    regex: String,
    normalized: String,
    pub(crate) root: SyntaxNode,
    num_positions: usize,
    end_position: usize,
    symbol_positions: BTreeMap<Symbol, PositionSet>,
}

impl SyntaxTree {
    pub fn get_root(&self) -> &SyntaxNode {
        &self.root
    }

    /// The pattern as it was provided
    pub fn get_regex(&self) -> &str {
        &self.regex
    }

    pub fn get_normalized(&self) -> &str {
        &self.normalized
    }

    /// Number of leaves in the tree, terminator included
    pub fn get_num_positions(&self) -> usize {
        self.num_positions
    }

    /// Position of the terminator leaf
    pub fn get_end_position(&self) -> usize {
        self.end_position
    }

    pub fn get_symbol_positions(&self) -> &BTreeMap<Symbol, PositionSet> {
        &self.symbol_positions
    }

    pub fn positions_of(&self, symbol: Symbol) -> Option<&PositionSet> {
        self.symbol_positions.get(&symbol)
    }

    /// Input symbols used by the pattern in sorted order. The terminator is not part of it.
    pub fn get_alphabet(&self) -> BTreeSet<char> {
        self.symbol_positions
            .keys()
            .filter_map(|symbol| match symbol {
                Symbol::Char(ch) => Some(*ch),
                Symbol::End => None,
            })
            .collect()
    }

    pub fn symbol_at(&self, position: usize) -> Option<Symbol> {
        self.symbol_positions
            .iter()
            .find(|(_, positions)| positions.contains(position))
            .map(|(symbol, _)| *symbol)
    }

    /// Render the tree in graphviz dot format
    pub fn to_dot(&self) -> String {
        let mut graph: DiGraph<String, String> = DiGraph::new();
        let mut stack: Vec<(&SyntaxNode, Option<NodeIndex>)> = vec![(&self.root, None)];

        while let Some((node, parent)) = stack.pop() {
            let mut label = node.kind.to_string();
            if let Some(position) = node.position {
                label = format!("{} ({})", label, position);
            }
            let label = format!(
                "{}\nfirstpos {}\nlastpos {}{}",
                label,
                node.firstpos,
                node.lastpos,
                if node.nullable { "\nnullable" } else { "" }
            );

            let idx = graph.add_node(label);
            if let Some(parent) = parent {
                graph.add_edge(parent, idx, String::new());
            }

            // Pushed right first so the left child gets the lower node index
            if let Some(right) = &node.right {
                stack.push((right, Some(idx)));
            }
            if let Some(left) = &node.left {
                stack.push((left, Some(idx)));
            }
        }

        format!("{}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
    }

    /// Save the syntax tree as `<filename>.dot` and render it to `<filename>.jpg` with graphviz
    pub fn show_tree(&self, filename: &str) -> Result<()> {
        let dot_filename = format!("{}.dot", filename);
        let mut dot_file = File::create(&dot_filename)
            .wrap_err_with(|| format!("Failed to create {}", dot_filename))?;
        dot_file.write_all(self.to_dot().as_bytes())?;

        Command::new("dot")
            .args(["-Tjpg", &dot_filename, "-o", &format!("{}.jpg", filename)])
            .output()
            .wrap_err("Failed to execute Graphviz")?;

        println!("Syntax tree vizualization saved as {}.jpg", filename);
        Ok(())
    }
}

impl fmt::Display for SyntaxTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.fmt_indented(f, 0)
    }
}

fn as_string(pattern: &[char]) -> String {
    pattern.iter().collect()
}

// Index of the parenthesis matching the closing one at `close`, searching leftwards.
fn matching_open(pattern: &[char], close: usize) -> Option<usize> {
    if pattern[close] != RPAREN {
        return None;
    }
    let mut depth = 0usize;
    for idx in (0..=close).rev() {
        match pattern[idx] {
            RPAREN => depth += 1,
            LPAREN => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

// Index of the rightmost occurrence of `operator` outside all parentheses.
fn find_unnested(pattern: &[char], operator: char) -> Result<Option<usize>, ParseError> {
    let mut depth = 0usize;
    for (idx, &ch) in pattern.iter().enumerate().rev() {
        match ch {
            RPAREN => depth += 1,
            LPAREN => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| ParseError::UnbalancedParentheses(as_string(pattern)))?;
            }
            _ if ch == operator && depth == 0 => return Ok(Some(idx)),
            _ => {}
        }
    }
    Ok(None)
}

fn parse_binary(pattern: &[char], split: usize, kind: NodeKind) -> Result<SyntaxNode, ParseError> {
    if split == 0 || split == pattern.len() - 1 {
        return Err(ParseError::MissingOperand(as_string(pattern)));
    }
    let left = parse_pattern(&pattern[..split])?;
    let right = parse_pattern(&pattern[split + 1..])?;
    Ok(SyntaxNode::binary(kind, left, right))
}

fn parse_pattern(pattern: &[char]) -> Result<SyntaxNode, ParseError> {
    log::trace!("Parsing {:?}", as_string(pattern));

    let len = pattern.len();

    if len == 0 {
        return Err(ParseError::MissingOperand(String::new()));
    }

    if len == 1 {
        let ch = pattern[0];
        if normalizer::is_metacharacter(ch) {
            return Err(ParseError::InvalidLeafCharacter(ch));
        }
        return Ok(SyntaxNode::leaf(Symbol::Char(ch)));
    }

    if let Some(split) = find_unnested(pattern, ALTERNATE)? {
        return parse_binary(pattern, split, NodeKind::Alternate);
    }

    if pattern[len - 1] == STAR {
        if len == 2 {
            return Ok(SyntaxNode::star(parse_pattern(&pattern[..1])?));
        }
        // A single group followed by a star, e.g. (a|b)*
        if pattern[len - 2] == RPAREN && matching_open(pattern, len - 2) == Some(0) {
            return Ok(SyntaxNode::star(parse_pattern(&pattern[1..len - 2])?));
        }
    }

    if pattern[0] == LPAREN && matching_open(pattern, len - 1) == Some(0) {
        return parse_pattern(&pattern[1..len - 1]);
    }

    if let Some(split) = find_unnested(pattern, CONCAT)? {
        return parse_binary(pattern, split, NodeKind::Concat);
    }

    Err(ParseError::NoGrammarRuleApplies(as_string(pattern)))
}

/// Parse a normalized pattern. The trailing `.#` becomes the root concatenation with the
/// terminator leaf as its right child.
pub(crate) fn parse_normalized(normalized: &str) -> Result<SyntaxNode, ParseError> {
    let chars: Vec<char> = normalized.chars().collect();

    let body = match chars.as_slice() {
        [body @ .., CONCAT, TERMINATOR] if !body.is_empty() => body,
        _ => {
            let body: String = normalized.chars().filter(|&ch| ch != TERMINATOR).collect();
            return Err(ParseError::MissingOperand(body));
        }
    };
    let body = parse_pattern(body)?;
    Ok(SyntaxNode::binary(
        NodeKind::Concat,
        body,
        SyntaxNode::leaf(Symbol::End),
    ))
}

/// Number the leaves from `next` downwards, visiting right subtrees before left ones, and record
/// every leaf in the symbol index. Returns the next unused number.
fn number_leaves(
    node: &mut SyntaxNode,
    mut next: usize,
    symbol_positions: &mut BTreeMap<Symbol, PositionSet>,
) -> usize {
    if let NodeKind::Leaf(symbol) = node.kind {
        node.position = Some(next);
        symbol_positions.entry(symbol).or_default().insert(next);
        return next - 1;
    }
    if let Some(right) = node.right.as_deref_mut() {
        next = number_leaves(right, next, symbol_positions);
    }
    if let Some(left) = node.left.as_deref_mut() {
        next = number_leaves(left, next, symbol_positions);
    }
    next
}

fn find_end_position(node: &SyntaxNode) -> Option<usize> {
    match node.kind {
        NodeKind::Leaf(Symbol::End) => node.position,
        NodeKind::Leaf(_) => None,
        _ => node
            .right
            .as_deref()
            .and_then(find_end_position)
            .or_else(|| node.left.as_deref().and_then(find_end_position)),
    }
}

/// Normalize and parse the pattern, number its leaves and compute nullable, firstpos and lastpos
/// for every node.
pub fn build_syntax_tree(regex: &str) -> Result<SyntaxTree> {
    let normalized = normalizer::normalize(regex)?;
    let mut root = parse_normalized(&normalized)?;

    let num_positions = root.count_leaves();
    let mut symbol_positions = BTreeMap::new();
    number_leaves(&mut root, num_positions, &mut symbol_positions);

    let end_position = match find_end_position(&root) {
        Some(position) => position,
        None => {
            let err = Report::new(ParseError::MissingOperand(regex.to_string()));
            return Err(err);
        }
    };

    annotator::annotate(&mut root);

    log::debug!(
        "Built syntax tree for {:?} with {} positions",
        regex,
        num_positions
    );

    Ok(SyntaxTree {
        regex: regex.to_string(),
        normalized,
        root,
        num_positions,
        end_position,
        symbol_positions,
    })
}
