use itertools::Itertools;

use regfsm_util::escape_label;

use crate::fsm::Fsm;

const DOT_HEADER: &str = "digraph finite_state_machine {rankdir = LR;";
const DOT_FOOTER: &str = "}";
const PALETTE: &str = "#e8cdad";

/// Render the automaton as a dot digraph: accepting states double-bordered,
/// a plaintext pseudo-node pointing at the initial state, edges labeled by
/// their escaped symbols. The caller hands this text to an external
/// renderer; only textual validity is guaranteed here.
pub(crate) fn to_dot_script(fsm: &Fsm) -> String {
    let transitions = render_transitions(fsm);
    let (initial, initial_start, accepts) = render_states(fsm);
    format!("{DOT_HEADER}\n  {initial}\n  {accepts}\n  {initial_start}\n  {transitions}\n  {DOT_FOOTER}")
}

fn render_transitions(fsm: &Fsm) -> String {
    let mut script = format!("  node [shape = circle, color=\"{PALETTE}\"];");
    for (from, row) in fsm.transitions() {
        for (to, labels) in row {
            let label = labels.iter().map(|l| escape_label(&l.to_string())).join(",");
            script.push_str(&format!(
                "  {from} -> {to} [label=\"{label}\", color=\"{PALETTE}\", fontcolor=\"{PALETTE}\"];"
            ));
        }
    }
    script
}

fn render_states(fsm: &Fsm) -> (String, String, String) {
    let mut initial = String::new();
    let mut initial_start = String::from("  node [shape = plaintext];");
    let mut accepts = String::new();

    for id in 0..*fsm.state_count() {
        let is_accept = fsm.accept_states().contains(&id);
        let is_initial = *fsm.initial_state() == id;

        if is_accept {
            accepts.push_str(&format!(
                "  node [shape = doublecircle, color=\"{PALETTE}\", fontcolor=\"{PALETTE}\"]; {id};"
            ));
        }

        if is_initial {
            initial_start.push_str(&format!(
                "  \"\" -> {id} [label=\"start\", color=\"{PALETTE}\", fontcolor=\"{PALETTE}\"];"
            ));
            if !is_accept {
                initial.push_str(&format!(
                    "  node [shape = circle, color=\"{PALETTE}\", fontcolor=\"{PALETTE}\"]; {id};"
                ));
            }
        }
    }

    (initial, initial_start, accepts)
}
