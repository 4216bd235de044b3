use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use derive_getters::Getters;
use itertools::Itertools;
use serde::ser::{SerializeMap, SerializeStruct, Serializer};
use serde::Serialize;

use crate::dot;
use crate::{Error, Result};

/// A transition label: a concrete input symbol or the ε marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Label {
    Empty,
    Symbol(char),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Empty => write!(f, "ε"),
            Label::Symbol(symbol) => write!(f, "{symbol}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsmKind {
    Nfa,
    Dfa,
}

impl FsmKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FsmKind::Nfa => "NFA",
            FsmKind::Dfa => "DFA",
        }
    }
}

impl fmt::Display for FsmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The canonical exported automaton, independent of how it was built.
///
/// `transitions` maps source id to destination id to the labels of that
/// edge. Keeping a label list per ordered pair makes the table lossless
/// even for parallel edges; the construction in this crate never produces
/// two labels on one pair, but the table does not rely on that.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Fsm {
    kind: FsmKind,
    state_count: usize,
    initial_state: usize,
    accept_states: BTreeSet<usize>,
    transitions: BTreeMap<usize, BTreeMap<usize, Vec<Label>>>,
}

impl Fsm {
    pub(crate) fn new(kind: FsmKind, state_count: usize, initial_state: usize) -> Self {
        Fsm {
            kind,
            state_count,
            initial_state,
            accept_states: BTreeSet::new(),
            transitions: BTreeMap::new(),
        }
    }

    pub(crate) fn add_transition(&mut self, from: usize, to: usize, label: Label) {
        let labels = self.transitions.entry(from).or_default().entry(to).or_default();
        if !labels.contains(&label) {
            labels.push(label);
        }
    }

    pub(crate) fn add_accept_state(&mut self, id: usize) {
        self.accept_states.insert(id);
    }

    pub(crate) fn set_state_count(&mut self, state_count: usize) {
        self.state_count = state_count;
    }

    /// Walk the automaton over `text` one symbol at a time. Only defined
    /// for DFA instances; a missing transition is a plain rejection, not an
    /// error.
    pub fn match_text(&self, text: &str) -> Result<bool> {
        if self.kind == FsmKind::Nfa {
            return Err(Error::NfaMatchUnsupported);
        }
        let mut current = self.initial_state;
        'symbols: for symbol in text.chars() {
            let row = match self.transitions.get(&current) {
                Some(row) => row,
                None => return Ok(false),
            };
            for (target, labels) in row {
                if labels.contains(&Label::Symbol(symbol)) {
                    current = *target;
                    continue 'symbols;
                }
            }
            return Ok(false);
        }
        Ok(self.accept_states.contains(&current))
    }

    /// Flatten the table into the formal `(Q, Σ, Δ, q0, F)` definition.
    /// Order-stable: ids and labels appear in table order, first occurrence
    /// wins.
    pub fn to_5_tuple(&self) -> FiveTuple {
        let mut states = Vec::new();
        let mut alphabet = Vec::new();
        let mut transitions = Vec::new();
        for (from, row) in &self.transitions {
            states.push(*from);
            for (to, labels) in row {
                states.push(*to);
                for label in labels {
                    transitions.push((*from, label.to_string(), *to));
                    alphabet.push(label.to_string());
                }
            }
        }
        FiveTuple {
            states: states.into_iter().unique().collect_vec(),
            alphabet: alphabet.into_iter().unique().collect_vec(),
            transitions,
            initial_state: self.initial_state,
            accept_states: self.accept_states.iter().copied().collect_vec(),
        }
    }

    /// Graph description handed to an external renderer.
    pub fn to_dot_script(&self) -> String {
        dot::to_dot_script(self)
    }
}

/// The formal definition of a finite automaton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FiveTuple {
    #[serde(rename = "Q")]
    pub states: Vec<usize>,
    #[serde(rename = "Sigma")]
    pub alphabet: Vec<String>,
    #[serde(rename = "Delta")]
    pub transitions: Vec<(usize, String, usize)>,
    #[serde(rename = "q0")]
    pub initial_state: usize,
    #[serde(rename = "F")]
    pub accept_states: Vec<usize>,
}

// The HTTP collaborator consumes ids as strings and one label string per
// edge, so serialization stringifies keys and joins parallel labels with a
// comma instead of exposing the internal label list.
impl Serialize for Fsm {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut fsm = serializer.serialize_struct("Fsm", 5)?;
        fsm.serialize_field("kind", self.kind.as_str())?;
        fsm.serialize_field("stateCount", &self.state_count)?;
        fsm.serialize_field("initialState", &self.initial_state.to_string())?;
        let accept_states = self.accept_states.iter().map(|id| id.to_string()).collect_vec();
        fsm.serialize_field("acceptStates", &accept_states)?;
        fsm.serialize_field("transitions", &TransitionTable(&self.transitions))?;
        fsm.end()
    }
}

struct TransitionTable<'a>(&'a BTreeMap<usize, BTreeMap<usize, Vec<Label>>>);

impl Serialize for TransitionTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (from, row) in self.0 {
            map.serialize_entry(&from.to_string(), &TransitionRow(row))?;
        }
        map.end()
    }
}

struct TransitionRow<'a>(&'a BTreeMap<usize, Vec<Label>>);

impl Serialize for TransitionRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (to, labels) in self.0 {
            map.serialize_entry(&to.to_string(), &labels.iter().join(","))?;
        }
        map.end()
    }
}
