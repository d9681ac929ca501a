//! # dfaviz
//!
//! Builds a DFA directly from a regular expression with the syntax tree construction described
//! in "Compilers: Principles, Techniques, and Tools" by Aho, Sethi and Ullman, without going
//! through an NFA.
//!
//! This library provides functionality to:
//! - Normalize a pattern into an explicit, terminated form
//! - Parse the pattern into a syntax tree with numbered leaf positions
//! - Compute nullable, firstpos, lastpos and followpos
//! - Construct the DFA whose states are sets of positions
//! - Render the syntax tree and the DFA, and visualize the DFA state machine

pub mod annotator;
pub mod dfa;
pub mod error;
pub mod fa;
pub mod normalizer;
pub mod positions;
pub mod syntax_tree;
pub mod visualizer;

// Re-export commonly used functions for convenience
pub use annotator::{annotate_tree, build_followpos_table, FollowposTable};
pub use dfa::{construct_dfa, load_dfa, regex_to_dfa, save_dfa, DFA};
pub use error::ParseError;
pub use normalizer::normalize;
pub use syntax_tree::{build_syntax_tree, SyntaxTree};
pub use visualizer::visualize;
