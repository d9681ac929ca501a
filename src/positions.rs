/* A set of leaf positions stored as a bitvec indexed by position. Positions start at 1 so
 * bit 0 is never set. */

use bitvec::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Default)]
pub struct PositionSet {
    bits: BitVec<u8>,
}

impl PositionSet {
    pub fn new() -> Self {
        PositionSet {
            bits: BitVec::new(),
        }
    }

    pub fn singleton(position: usize) -> Self {
        let mut set = PositionSet::new();
        set.insert(position);
        set
    }

    pub fn insert(&mut self, position: usize) {
        if position >= self.bits.len() {
            self.bits.resize(position + 1, false);
        }
        self.bits.set(position, true);
    }

    pub fn contains(&self, position: usize) -> bool {
        self.bits.get(position).is_some_and(|bit| *bit)
    }

    /// Adds every position of `other` to this set
    pub fn union_with(&mut self, other: &PositionSet) {
        for position in other.iter() {
            self.insert(position);
        }
    }

    pub fn union(&self, other: &PositionSet) -> PositionSet {
        let mut result = self.clone();
        result.union_with(other);
        result
    }

    /// Positions present in both sets, in ascending order
    pub fn intersection<'a>(&'a self, other: &'a PositionSet) -> impl Iterator<Item = usize> + 'a {
        self.iter().filter(move |position| other.contains(*position))
    }

    /// Positions in ascending order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter_ones()
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.iter().collect()
    }
}

// Two sets are equal when they hold the same positions, regardless of how many trailing zero bits
// each one carries.
impl PartialEq for PositionSet {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Eq for PositionSet {}

impl Hash for PositionSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for position in self.iter() {
            state.write_usize(position);
        }
        state.write_usize(self.len());
    }
}

impl FromIterator<usize> for PositionSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = PositionSet::new();
        for position in iter {
            set.insert(position);
        }
        set
    }
}

impl fmt::Display for PositionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let positions: Vec<String> = self.iter().map(|position| position.to_string()).collect();
        write!(f, "{{{}}}", positions.join(", "))
    }
}

impl Serialize for PositionSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeSeq;

        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for position in self.iter() {
            seq.serialize_element(&position)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for PositionSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let positions: Vec<usize> = Vec::deserialize(deserializer)?;
        Ok(positions.into_iter().collect())
    }
}
