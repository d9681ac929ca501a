/* Build a DFA straight from the annotated syntax tree. Every DFA state stands for a set of leaf
 * positions; the start state is firstpos of the root and the state reached from S on symbol a
 * is the union of followpos(p) over the positions p in S that carry a. */

use crate::annotator::{build_followpos_table, FollowposTable};
use crate::fa::{Symbol, FA};
use crate::positions::PositionSet;
use crate::syntax_tree::{build_syntax_tree, SyntaxTree};
use bitvec::prelude::*;
use color_eyre::eyre::{bail, Result, WrapErr};
use petgraph::dot::Dot;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::prelude::StableGraph;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::{BufReader, Write};
use std::process::Command;

/// A position set and its hash stored together so looking up a state by its positions does not
/// rehash the set each time.
#[derive(Clone)]
struct HashedPositions {
    positions: PositionSet,
    hash: u64,
}

impl HashedPositions {
    fn new(positions: PositionSet) -> Self {
        let mut hasher = DefaultHasher::new();
        positions.hash(&mut hasher);
        let hash = hasher.finish();
        Self { positions, hash }
    }
}

impl Hash for HashedPositions {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialEq for HashedPositions {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.positions == other.positions
    }
}

impl Eq for HashedPositions {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DFA {
    states: Vec<DFAState>,
    start_state: usize,
    accept_states: BitVec<u8>,
    alphabet: BTreeSet<char>,
    regex: String,
}

/// A DFA state is identified by its set of positions: no two states of a DFA share one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DFAState {
    id: usize,
    positions: PositionSet,
    transitions: BTreeMap<char, usize>,
    is_start: bool,
    is_final: bool,
}

impl FA for DFA {
    fn show_fa(&self, filename: &str) -> Result<()> {
        let dot_filename = format!("{}.dot", filename);
        let mut dot_file = File::create(&dot_filename)
            .wrap_err_with(|| format!("Failed to create {}", dot_filename))?;

        dot_file.write_all(self.to_dot().as_bytes())?;

        Command::new("dot")
            .args(["-Tjpg", &dot_filename, "-o", &format!("{}.jpg", filename)])
            .output()
            .wrap_err("Failed to execute Graphviz")?;

        println!("DFA vizualization saved as {}.jpg", filename);
        Ok(())
    }

    fn get_num_states(&self) -> usize {
        self.states.len()
    }

    fn get_start_state(&self) -> usize {
        self.start_state
    }

    fn get_alphabet(&self) -> &BTreeSet<char> {
        &self.alphabet
    }

    fn get_acceptor_states(&self) -> &BitVec<u8> {
        &self.accept_states
    }

    fn get_state_transitions(&self, state_id: usize) -> Vec<(char, usize)> {
        match self.states.get(state_id) {
            Some(state) => state
                .transitions
                .iter()
                .map(|(symbol, target)| (*symbol, *target))
                .collect(),
            None => Vec::new(),
        }
    }

    fn get_state_label(&self, state_id: usize) -> String {
        match self.states.get(state_id) {
            Some(state) => format!("State {}\n{}", state_id, state.positions),
            None => format!("State {}", state_id),
        }
    }
}

impl DFAState {
    fn new(id: usize, positions: PositionSet, is_start: bool, is_final: bool) -> Self {
        DFAState {
            id,
            positions,
            transitions: BTreeMap::new(),
            is_start,
            is_final,
        }
    }

    pub fn get_id(&self) -> usize {
        self.id
    }

    /// The leaf positions this state stands for
    pub fn get_positions(&self) -> &PositionSet {
        &self.positions
    }

    /// Get a list of all outgoing transitions for the given state
    pub fn get_transitions(&self) -> &BTreeMap<char, usize> {
        &self.transitions
    }

    pub fn is_start(&self) -> bool {
        self.is_start
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }
}

impl DFA {
    fn new() -> Self {
        DFA {
            states: Vec::new(),
            start_state: 0,
            accept_states: BitVec::new(),
            alphabet: BTreeSet::new(),
            regex: String::new(),
        }
    }

    fn add_state(&mut self, positions: PositionSet, is_final: bool) -> usize {
        let state_id = self.states.len();
        let is_start = state_id == self.start_state;
        self.states.push(DFAState::new(state_id, positions, is_start, is_final));
        self.accept_states.push(is_final);
        state_id
    }

    /// Returns a reference to the DFA state whose id is provided
    pub fn get_state(&self, id: usize) -> Option<&DFAState> {
        self.states.get(id)
    }

    /// Returns all states in creation order
    pub fn get_states(&self) -> &[DFAState] {
        &self.states
    }

    pub fn get_regex(&self) -> &str {
        &self.regex
    }

    /// Run the DFA over `input`. A missing transition rejects.
    pub fn accepts(&self, input: &str) -> bool {
        let mut current = self.start_state;
        for ch in input.chars() {
            let next = self
                .states
                .get(current)
                .and_then(|state| state.transitions.get(&ch));
            current = match next {
                Some(&next) => next,
                None => return false,
            };
        }
        self.states
            .get(current)
            .is_some_and(|state| state.is_final)
    }

    /// Transition table with one row per state. `->` marks the start state and `*` the final
    /// ones; `-` stands for a missing transition.
    pub fn transition_table(&self) -> String {
        TransitionTable { dfa: self }.to_string()
    }

    /// Print the transition table to stdout
    pub fn print_transition_table(&self) {
        print!("{}", self.transition_table());
    }

    /// Render the DFA in graphviz dot format. Transitions between the same pair of states are
    /// drawn as a single edge.
    pub fn to_dot(&self) -> String {
        let mut stable_graph = StableGraph::new();

        let num_states = self.states.len();

        let mut edge_map: HashMap<(NodeIndex, NodeIndex), EdgeIndex> = HashMap::new();

        for state in &self.states {
            let mut label = format!("State {}\n{}", state.id, state.positions);
            if state.is_start {
                label = format!("Start\n{}", label);
            }
            if state.is_final {
                label = format!("Accept\n{}", label);
            }
            stable_graph.add_node(label);
        }

        for state_idx in 0..num_states {
            for (symbol, target) in &self.states[state_idx].transitions {
                let key = (NodeIndex::new(state_idx), NodeIndex::new(*target));
                match edge_map.get(&key) {
                    Some(&edge_idx) => {
                        let label = format!("{}, {}", stable_graph[edge_idx], symbol);
                        stable_graph[edge_idx] = label;
                    }
                    None => {
                        let edge_idx = stable_graph.add_edge(key.0, key.1, symbol.to_string());
                        edge_map.insert(key, edge_idx);
                    }
                }
            }
        }

        format!("{}", Dot::new(&stable_graph))
    }
}

struct TransitionTable<'a> {
    dfa: &'a DFA,
}

impl fmt::Display for TransitionTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let position_width = self
            .dfa
            .states
            .iter()
            .map(|state| state.positions.to_string().len())
            .max()
            .unwrap_or(0)
            .max("positions".len())
            + 2;

        write!(f, "{:<8}{:<width$}", "state", "positions", width = position_width)?;
        for symbol in &self.dfa.alphabet {
            write!(f, "{:<6}", symbol)?;
        }
        writeln!(f)?;

        for state in &self.dfa.states {
            let marker = match (state.is_start, state.is_final) {
                (true, true) => "->*",
                (true, false) => "->",
                (false, true) => "*",
                (false, false) => "",
            };
            let name = format!("{}{}", marker, state.id);
            write!(
                f,
                "{:<8}{:<width$}",
                name,
                state.positions.to_string(),
                width = position_width
            )?;
            for symbol in &self.dfa.alphabet {
                match state.transitions.get(symbol) {
                    Some(target) => write!(f, "{:<6}", target)?,
                    None => write!(f, "{:<6}", "-")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

// A deserialized DFA is only usable when every state id it refers to exists.
fn check_consistency(dfa: &DFA) -> Result<()> {
    let num_states = dfa.states.len();
    if dfa.start_state >= num_states {
        bail!(
            "Start state {} is not one of the {} states",
            dfa.start_state,
            num_states
        );
    }
    if dfa.accept_states.len() != num_states {
        bail!(
            "Accept states cover {} states but the DFA has {}",
            dfa.accept_states.len(),
            num_states
        );
    }
    for (idx, state) in dfa.states.iter().enumerate() {
        if state.id != idx {
            bail!("State at index {} has id {}", idx, state.id);
        }
        for (symbol, target) in &state.transitions {
            if *target >= num_states {
                bail!(
                    "Transition from state {} on {} leads to missing state {}",
                    idx,
                    symbol,
                    target
                );
            }
        }
    }
    Ok(())
}

fn is_final(positions: &PositionSet, tree: &SyntaxTree) -> bool {
    positions.contains(tree.get_end_position())
}

// Union of followpos(p) over the positions p in `positions` that carry `symbol`.
fn delta(
    positions: &PositionSet,
    symbol_positions: &PositionSet,
    followpos: &FollowposTable,
) -> PositionSet {
    let mut result = PositionSet::new();
    for position in positions.intersection(symbol_positions) {
        if let Some(follows) = followpos.get(position) {
            result.union_with(follows);
        }
    }
    result
}

/// Build the DFA of an annotated syntax tree using its followpos table. States are created in
/// breadth first order starting at firstpos of the root, and symbols are tried in sorted order,
/// so state ids only depend on the pattern.
pub fn construct_dfa(tree: &SyntaxTree, followpos: &FollowposTable) -> DFA {
    let mut result = DFA::new();
    result.alphabet = tree.get_alphabet();
    result.regex = tree.get_regex().to_string();

    let symbol_positions: Vec<(char, PositionSet)> = result
        .alphabet
        .iter()
        .map(|&symbol| {
            let positions = tree
                .positions_of(Symbol::Char(symbol))
                .cloned()
                .unwrap_or_default();
            (symbol, positions)
        })
        .collect();

    let mut q_list: HashMap<HashedPositions, usize> = HashMap::new(); // Position set to DFA state
    let mut work_list: VecDeque<usize> = VecDeque::new();

    let q0 = tree.get_root().get_firstpos().clone();
    let q0_final = is_final(&q0, tree);
    let d0 = result.add_state(q0.clone(), q0_final);
    result.start_state = d0;
    q_list.insert(HashedPositions::new(q0), d0);
    work_list.push_back(d0);

    while let Some(dq) = work_list.pop_front() {
        let q = result.states[dq].positions.clone();
        for (symbol, positions) in &symbol_positions {
            let t = delta(&q, positions, followpos);
            if t.is_empty() {
                continue;
            }

            let t = HashedPositions::new(t);
            let dt = match q_list.get(&t) {
                Some(&existing) => existing,
                None => {
                    let t_final = is_final(&t.positions, tree);
                    let dt = result.add_state(t.positions.clone(), t_final);
                    log::trace!("New state {} for positions {}", dt, t.positions);
                    q_list.insert(t, dt);
                    work_list.push_back(dt);
                    dt
                }
            };

            result.states[dq].transitions.insert(*symbol, dt);
        }
    }

    log::debug!(
        "Constructed DFA for {:?} with {} states",
        result.regex,
        result.states.len()
    );

    result
}

/// Run the whole pipeline on a pattern: build the annotated syntax tree, its followpos table and
/// finally the DFA.
pub fn regex_to_dfa(regex: &str) -> Result<DFA> {
    let tree = build_syntax_tree(regex)?;
    let followpos = build_followpos_table(&tree);
    Ok(construct_dfa(&tree, &followpos))
}

/// Save the DFA as pretty printed json
pub fn save_dfa(dfa: &DFA, file_name: &str) -> Result<()> {
    let json_string = serde_json::to_string_pretty(dfa)?;
    let mut file =
        File::create(file_name).wrap_err_with(|| format!("Failed to create {}", file_name))?;
    file.write_all(json_string.as_bytes())?;
    Ok(())
}

/// Load a DFA previously written by [`save_dfa`]
pub fn load_dfa(file_name: &str) -> Result<DFA> {
    let file = File::open(file_name).wrap_err_with(|| format!("Failed to open {}", file_name))?;
    let buf_reader = BufReader::new(file);
    let dfa: DFA = serde_json::from_reader(buf_reader)
        .wrap_err_with(|| format!("{} does not contain a valid DFA", file_name))?;
    check_consistency(&dfa)
        .wrap_err_with(|| format!("{} does not contain a valid DFA", file_name))?;
    Ok(dfa)
}
