use std::collections::{HashMap, HashSet, VecDeque};

use derive_getters::Getters;
use itertools::Itertools;

use crate::fsm::{Fsm, FsmKind, Label};

/// One NFA state in the construction arena. States reference each other by
/// arena index, which keeps the back-edges of `*`/`+` free of ownership
/// cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NfaState {
    is_accept: bool,
    edges: Vec<(Label, usize)>,
}

impl NfaState {
    pub fn is_accept(&self) -> bool {
        self.is_accept
    }

    pub fn edges(&self) -> &[(Label, usize)] {
        &self.edges
    }

    fn add_edge(&mut self, label: Label, target: usize) {
        self.edges.push((label, target));
    }
}

/// A subgraph with exactly one entry and one exit state. Every combinator
/// consumes and produces fragments that keep this shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters)]
pub struct Fragment {
    start: usize,
    end: usize,
}

fn new_state(states: &mut Vec<NfaState>, is_accept: bool) -> usize {
    states.push(NfaState { is_accept, edges: Vec::new() });
    states.len() - 1
}

/// A two-state fragment with a single labeled edge.
pub(crate) fn literal(states: &mut Vec<NfaState>, symbol: char) -> Fragment {
    let start = new_state(states, false);
    let end = new_state(states, true);
    states[start].add_edge(Label::Symbol(symbol), end);
    Fragment { start, end }
}

/// Expand a character class into parallel ε-wrapped branches, one per
/// member, between a fresh start/end pair.
pub(crate) fn class(states: &mut Vec<NfaState>, members: &[char]) -> Fragment {
    let start = new_state(states, false);
    let end = new_state(states, true);
    for &member in members {
        let branch_start = new_state(states, false);
        let branch_end = new_state(states, false);
        states[branch_start].add_edge(Label::Empty, branch_end);
        states[start].add_edge(Label::Symbol(member), branch_start);
        states[branch_end].add_edge(Label::Empty, end);
    }
    Fragment { start, end }
}

/// Splice `b` onto the end of `a`: `a`'s exit state loses its accept flag
/// and inherits `b`'s entry edges. `b.start` becomes unreachable and is
/// dropped at renumbering.
pub(crate) fn concatenate(states: &mut Vec<NfaState>, a: Fragment, b: Fragment) -> Fragment {
    states[a.end].is_accept = false;
    states[a.end].edges = std::mem::take(&mut states[b.start].edges);
    Fragment { start: a.start, end: b.end }
}

pub(crate) fn alternate(states: &mut Vec<NfaState>, a: Fragment, b: Fragment) -> Fragment {
    let start = new_state(states, false);
    let end = new_state(states, true);
    states[a.end].is_accept = false;
    states[b.end].is_accept = false;
    states[start].add_edge(Label::Empty, a.start);
    states[start].add_edge(Label::Empty, b.start);
    states[a.end].add_edge(Label::Empty, end);
    states[b.end].add_edge(Label::Empty, end);
    Fragment { start, end }
}

/// Zero or more repetitions: bypass edge plus repeat back-edge.
pub(crate) fn star(states: &mut Vec<NfaState>, operand: Fragment) -> Fragment {
    let start = new_state(states, false);
    let end = new_state(states, true);
    states[operand.end].is_accept = false;
    states[start].add_edge(Label::Empty, operand.start);
    states[start].add_edge(Label::Empty, end);
    states[operand.end].add_edge(Label::Empty, end);
    states[operand.end].add_edge(Label::Empty, operand.start);
    Fragment { start, end }
}

/// One or more repetitions: star without the bypass edge.
pub(crate) fn plus(states: &mut Vec<NfaState>, operand: Fragment) -> Fragment {
    let start = new_state(states, false);
    let end = new_state(states, true);
    states[operand.end].is_accept = false;
    states[start].add_edge(Label::Empty, operand.start);
    states[operand.end].add_edge(Label::Empty, operand.start);
    states[operand.end].add_edge(Label::Empty, end);
    Fragment { start, end }
}

/// Zero or one repetition: star without the repeat back-edge.
pub(crate) fn optional(states: &mut Vec<NfaState>, operand: Fragment) -> Fragment {
    let start = new_state(states, false);
    let end = new_state(states, true);
    states[operand.end].is_accept = false;
    states[start].add_edge(Label::Empty, operand.start);
    states[start].add_edge(Label::Empty, end);
    states[operand.end].add_edge(Label::Empty, end);
    Fragment { start, end }
}

/// A finished NFA: the arena plus the fragment's entry and exit ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nfa {
    states: Vec<NfaState>,
    start: usize,
    end: usize,
}

impl Nfa {
    pub(crate) fn from_parts(states: Vec<NfaState>, fragment: &Fragment) -> Self {
        Nfa { states, start: fragment.start, end: fragment.end }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn states(&self) -> &[NfaState] {
        &self.states
    }

    /// Reachable state ids in breadth-first discovery order, following edge
    /// insertion order.
    fn discovery_order(&self) -> Vec<usize> {
        let mut queue = VecDeque::from([self.start]);
        let mut visited = HashSet::from([self.start]);
        let mut ordered = Vec::new();
        while let Some(id) = queue.pop_front() {
            ordered.push(id);
            for (_, target) in self.states[id].edges() {
                if visited.insert(*target) {
                    queue.push_back(*target);
                }
            }
        }
        ordered
    }

    /// Reassign contiguous ids `0..N-1` in discovery order. States spliced
    /// out during concatenation are unreachable and disappear here, so the
    /// numbering is independent of incidental construction order.
    pub fn renumbered(&self) -> Nfa {
        let order = self.discovery_order();
        let remap: HashMap<usize, usize> =
            order.iter().enumerate().map(|(new_id, old_id)| (*old_id, new_id)).collect();

        let mut states = Vec::with_capacity(order.len());
        for old_id in &order {
            let old = &self.states[*old_id];
            let edges = old
                .edges()
                .iter()
                .map(|(label, target)| (*label, remap[target]))
                .collect_vec();
            states.push(NfaState { is_accept: old.is_accept, edges });
        }
        Nfa { states, start: remap[&self.start], end: remap[&self.end] }
    }

    /// Materialize the exported representation by walking the graph
    /// breadth-first and recording every edge in the transition table.
    pub fn to_fsm(&self) -> Fsm {
        let order = self.discovery_order();
        let mut fsm = Fsm::new(FsmKind::Nfa, order.len(), self.start);
        for id in order {
            let state = &self.states[id];
            if state.is_accept() {
                fsm.add_accept_state(id);
            }
            for (label, target) in state.edges() {
                fsm.add_transition(id, *target, *label);
            }
        }
        fsm
    }

    /// ε-closure of a set of states: stack-based flood fill over ε edges
    /// only. The result is sorted and deduplicated so it can serve as the
    /// identity key of a DFA subset-state.
    pub fn epsilon_closure(&self, seed: &[usize]) -> Vec<usize> {
        let mut closure: HashSet<usize> = seed.iter().copied().collect();
        let mut stack = seed.to_vec();
        while let Some(id) = stack.pop() {
            for (label, target) in self.states[id].edges() {
                if *label == Label::Empty && closure.insert(*target) {
                    stack.push(*target);
                }
            }
        }
        closure.into_iter().sorted().collect_vec()
    }

    /// States reachable from `members` over edges labeled exactly `symbol`.
    fn move_set(&self, members: &[usize], symbol: char) -> Vec<usize> {
        let mut moved = HashSet::new();
        for &id in members {
            for (label, target) in self.states[id].edges() {
                if *label == Label::Symbol(symbol) {
                    moved.insert(*target);
                }
            }
        }
        moved.into_iter().sorted().collect_vec()
    }

    /// Subset construction. The input NFA is not mutated; termination is
    /// bounded by the number of distinct reachable subsets. No minimization
    /// is attempted.
    pub fn to_dfa(&self) -> Fsm {
        // Alphabet in first-appearance order over the breadth-first edge walk.
        let order = self.discovery_order();
        let alphabet = order
            .iter()
            .flat_map(|id| self.states[*id].edges())
            .filter_map(|(label, _)| match label {
                Label::Symbol(symbol) => Some(*symbol),
                Label::Empty => None,
            })
            .unique()
            .collect_vec();

        let initial = self.epsilon_closure(&[self.start]);
        let mut subset_ids: HashMap<Vec<usize>, usize> = HashMap::new();
        let mut subsets: Vec<Vec<usize>> = Vec::new();
        subset_ids.insert(initial.clone(), 0);
        subsets.push(initial);

        let mut fsm = Fsm::new(FsmKind::Dfa, 0, 0);

        // Worklist in allocation order; every allocated subset-state is
        // processed exactly once.
        let mut current = 0;
        while current < subsets.len() {
            let members = subsets[current].clone();
            for &symbol in &alphabet {
                let target_set = self.epsilon_closure(&self.move_set(&members, symbol));
                if target_set.is_empty() {
                    continue;
                }
                let target = match subset_ids.get(&target_set) {
                    Some(&known) => known,
                    None => {
                        let allocated = subsets.len();
                        subset_ids.insert(target_set.clone(), allocated);
                        subsets.push(target_set);
                        allocated
                    }
                };
                fsm.add_transition(current, target, Label::Symbol(symbol));
            }
            current += 1;
        }

        for (id, members) in subsets.iter().enumerate() {
            if members.binary_search(&self.end).is_ok() {
                fsm.add_accept_state(id);
            }
        }
        fsm.set_state_count(subsets.len());
        fsm
    }

    /// Closure-stepping simulation of the NFA itself. The exported FSM
    /// refuses nondeterministic matching; this walks the live graph instead.
    pub fn simulate(&self, text: &str) -> bool {
        let mut current = self.epsilon_closure(&[self.start]);
        for symbol in text.chars() {
            current = self.epsilon_closure(&self.move_set(&current, symbol));
            if current.is_empty() {
                return false;
            }
        }
        current.binary_search(&self.end).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_fragment_shape() {
        let mut states = Vec::new();
        let fragment = literal(&mut states, 'a');
        assert_eq!(states.len(), 2);
        assert_eq!(states[*fragment.start()].edges(), &[(Label::Symbol('a'), *fragment.end())]);
        assert!(!states[*fragment.start()].is_accept());
        assert!(states[*fragment.end()].is_accept());
    }

    #[test]
    fn class_fragment_shape() {
        let mut states = Vec::new();
        let fragment = class(&mut states, &['0', '1']);
        // start/end pair plus two states per member
        assert_eq!(states.len(), 6);
        assert_eq!(states[*fragment.start()].edges().len(), 2);
        assert!(states[*fragment.end()].is_accept());
        for (label, _) in states[*fragment.start()].edges() {
            assert_ne!(*label, Label::Empty);
        }
    }

    #[test]
    fn concatenation_splices_ends() {
        let mut states = Vec::new();
        let a = literal(&mut states, 'a');
        let b = literal(&mut states, 'b');
        let joined = concatenate(&mut states, a, b);
        assert_eq!(*joined.start(), *a.start());
        assert_eq!(*joined.end(), *b.end());
        assert!(!states[*a.end()].is_accept());
        // a's old end took over b's entry edge; b's start was emptied
        assert_eq!(states[*a.end()].edges(), &[(Label::Symbol('b'), *b.end())]);
        assert!(states[*b.start()].edges().is_empty());
    }

    #[test]
    fn star_wires_bypass_and_repeat() {
        let mut states = Vec::new();
        let a = literal(&mut states, 'a');
        let wrapped = star(&mut states, a);
        let start_edges = states[*wrapped.start()].edges();
        assert_eq!(
            start_edges,
            &[(Label::Empty, *a.start()), (Label::Empty, *wrapped.end())]
        );
        let operand_end_edges = states[*a.end()].edges();
        assert_eq!(
            operand_end_edges,
            &[(Label::Empty, *wrapped.end()), (Label::Empty, *a.start())]
        );
    }

    #[test]
    fn plus_has_no_bypass() {
        let mut states = Vec::new();
        let a = literal(&mut states, 'a');
        let wrapped = plus(&mut states, a);
        assert_eq!(states[*wrapped.start()].edges(), &[(Label::Empty, *a.start())]);
    }

    #[test]
    fn optional_has_no_repeat() {
        let mut states = Vec::new();
        let a = literal(&mut states, 'a');
        let wrapped = optional(&mut states, a);
        assert_eq!(states[*a.end()].edges(), &[(Label::Empty, *wrapped.end())]);
    }

    fn sample_nfa() -> Nfa {
        // (a|b)* by hand
        let mut states = Vec::new();
        let a = literal(&mut states, 'a');
        let b = literal(&mut states, 'b');
        let alt = alternate(&mut states, a, b);
        let fragment = star(&mut states, alt);
        Nfa::from_parts(states, &fragment)
    }

    #[test]
    fn renumbering_is_contiguous_and_stable() {
        let nfa = sample_nfa().renumbered();
        assert_eq!(nfa.start(), 0);
        let reachable = nfa.discovery_order();
        assert_eq!(reachable, (0..nfa.states().len()).collect_vec());
        // a second pass changes nothing
        assert_eq!(nfa.renumbered(), nfa);
    }

    #[test]
    fn closure_is_idempotent_and_order_insensitive() {
        let nfa = sample_nfa().renumbered();
        let once = nfa.epsilon_closure(&[nfa.start()]);
        let twice = nfa.epsilon_closure(&once);
        assert_eq!(once, twice);

        let forward = nfa.epsilon_closure(&[nfa.start(), nfa.end()]);
        let backward = nfa.epsilon_closure(&[nfa.end(), nfa.start()]);
        assert_eq!(forward, backward);
        assert_eq!(forward, forward.iter().copied().sorted().dedup().collect_vec());
    }

    #[test]
    fn subset_construction_on_hand_built_nfa() {
        let nfa = sample_nfa().renumbered();
        let dfa = nfa.to_dfa();
        assert_eq!(*dfa.kind(), FsmKind::Dfa);
        assert!(dfa.match_text("").unwrap());
        assert!(dfa.match_text("abba").unwrap());
        assert!(!dfa.match_text("abc").unwrap());
    }

    #[test]
    fn simulation_agrees_with_dfa() {
        let nfa = sample_nfa().renumbered();
        let dfa = nfa.to_dfa();
        for input in ["", "a", "b", "ab", "ba", "aabba", "ax", "c"] {
            assert_eq!(nfa.simulate(input), dfa.match_text(input).unwrap(), "input {input:?}");
        }
    }

    #[test]
    fn dfa_is_deterministic_per_symbol() {
        let nfa = sample_nfa().renumbered();
        let dfa = nfa.to_dfa();
        for (_, row) in dfa.transitions() {
            let symbols = row
                .values()
                .flatten()
                .map(|label| label.to_string())
                .collect_vec();
            let distinct = symbols.iter().unique().count();
            assert_eq!(symbols.len(), distinct);
        }
    }
}
