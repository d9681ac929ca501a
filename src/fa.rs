use bitvec::prelude::BitVec;
use color_eyre::eyre::Result;
use std::collections::BTreeSet;
use std::fmt;

/// Character appended to every normalized pattern to mark the end of input.
pub const TERMINATOR: char = '#';

/// The symbol carried by a leaf of the syntax tree.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub enum Symbol {
    Char(char),
    End,
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Char(ch) => write!(f, "{}", ch),
            Symbol::End => write!(f, "{}", TERMINATOR),
        }
    }
}

pub trait FA {
    fn show_fa(&self, file_name: &str) -> Result<()>;
    fn get_num_states(&self) -> usize;
    fn get_start_state(&self) -> usize;
    fn get_alphabet(&self) -> &BTreeSet<char>;
    fn get_acceptor_states(&self) -> &BitVec<u8>;
    fn get_state_transitions(&self, state_id: usize) -> Vec<(char, usize)>;
    fn get_state_label(&self, state_id: usize) -> String;
}
