//! Inference tracing: an injected observer instead of built-in printing.
//!
//! Both engines report each step to an [`InferenceObserver`]. The engines
//! never print; a CLI or demo decides how (and whether) to show a trace.
//!
//! Three observers ship with the crate:
//! - [`NoopObserver`] ignores everything (what `prove`/`saturate` use).
//! - [`TracingObserver`] forwards every step to `tracing` at debug level.
//! - [`TraceRecorder`] keeps the events so they can be rendered as an
//!   indented narration or exported as JSON.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::atom::Atom;
use crate::rules::Rule;

/// Hooks called by the inference engines. Every method defaults to a no-op.
///
/// `depth` is the recursion depth of the backward chainer (0 for the
/// top-level goal); `pass` is the 1-based forward-chaining pass.
pub trait InferenceObserver {
    /// Backward: about to attempt `goal`.
    fn goal_attempted(&mut self, _goal: &Atom, _depth: usize) {}
    /// Backward: `goal` is already on the current proof path.
    fn cycle_detected(&mut self, _goal: &Atom, _depth: usize) {}
    /// Backward: `goal` is already a known fact.
    fn known_fact(&mut self, _goal: &Atom, _depth: usize) {}
    /// Backward: no fact and no rule concludes `goal`.
    fn no_rules(&mut self, _goal: &Atom, _depth: usize) {}
    /// Backward: trying the rule at declaration `index`.
    fn rule_attempted(&mut self, _index: usize, _rule: &Rule, _depth: usize) {}
    /// Backward: `goal` was proven by a rule and committed as a fact.
    fn goal_proven(&mut self, _goal: &Atom, _depth: usize) {}
    /// Backward: every candidate rule for `goal` failed.
    fn goal_failed(&mut self, _goal: &Atom, _depth: usize) {}
    /// Forward: a new pass over the rule base begins.
    fn pass_started(&mut self, _pass: usize) {}
    /// Forward: the rule at `index` fired and derived `atom`.
    fn fact_derived(&mut self, _atom: &Atom, _index: usize, _rule: &Rule, _pass: usize) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl InferenceObserver for NoopObserver {}

/// Observer that emits each step as a `tracing` debug event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl InferenceObserver for TracingObserver {
    fn goal_attempted(&mut self, goal: &Atom, depth: usize) {
        tracing::debug!(%goal, depth, "checking goal");
    }

    fn cycle_detected(&mut self, goal: &Atom, depth: usize) {
        tracing::debug!(%goal, depth, "goal already on proof path, treating as unprovable");
    }

    fn known_fact(&mut self, goal: &Atom, depth: usize) {
        tracing::debug!(%goal, depth, "goal is a known fact");
    }

    fn no_rules(&mut self, goal: &Atom, depth: usize) {
        tracing::debug!(%goal, depth, "no rule concludes goal");
    }

    fn rule_attempted(&mut self, index: usize, rule: &Rule, depth: usize) {
        tracing::debug!(index, %rule, depth, "attempting rule");
    }

    fn goal_proven(&mut self, goal: &Atom, depth: usize) {
        tracing::debug!(%goal, depth, "goal proven, adding to facts");
    }

    fn goal_failed(&mut self, goal: &Atom, depth: usize) {
        tracing::debug!(%goal, depth, "no candidate rule proved goal");
    }

    fn pass_started(&mut self, pass: usize) {
        tracing::debug!(pass, "forward-chaining pass");
    }

    fn fact_derived(&mut self, atom: &Atom, index: usize, rule: &Rule, pass: usize) {
        tracing::debug!(%atom, index, rule = %rule.label(), pass, "inferred new fact");
    }
}

// ---------------------------------------------------------------------------
// Recorded trace
// ---------------------------------------------------------------------------

/// A single recorded inference step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    GoalAttempted { goal: Atom, depth: usize },
    CycleDetected { goal: Atom, depth: usize },
    KnownFact { goal: Atom, depth: usize },
    NoRules { goal: Atom, depth: usize },
    RuleAttempted { index: usize, rule: String, depth: usize },
    GoalProven { goal: Atom, depth: usize },
    GoalFailed { goal: Atom, depth: usize },
    PassStarted { pass: usize },
    FactDerived { atom: Atom, index: usize, rule: String, pass: usize },
}

/// Observer that records every event for later rendering.
#[derive(Debug, Clone, Default)]
pub struct TraceRecorder {
    events: Vec<TraceEvent>,
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded events in the order they happened.
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }

    /// Render the trace as indented, human-readable lines.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for event in &self.events {
            // Writing to a String cannot fail.
            let _ = match event {
                TraceEvent::GoalAttempted { goal, depth } => {
                    writeln!(out, "{}Checking goal: {goal}", indent(*depth))
                }
                TraceEvent::CycleDetected { goal, depth } => writeln!(
                    out,
                    "{}'{goal}' depends on itself; cannot prove it this way.",
                    indent(*depth)
                ),
                TraceEvent::KnownFact { goal, depth } => {
                    writeln!(out, "{}'{goal}' is a known fact.", indent(*depth))
                }
                TraceEvent::NoRules { goal, depth } => writeln!(
                    out,
                    "{}'{goal}' is unknown. No rules conclude it.",
                    indent(*depth)
                ),
                TraceEvent::RuleAttempted { rule, depth, .. } => {
                    writeln!(out, "{}Attempting to prove rule: {rule}", indent(*depth))
                }
                TraceEvent::GoalProven { goal, depth } => writeln!(
                    out,
                    "{}All conditions for '{goal}' are proven. Adding to facts.",
                    indent(*depth)
                ),
                TraceEvent::GoalFailed { goal, depth } => writeln!(
                    out,
                    "{}Not all conditions for '{goal}' could be proven.",
                    indent(*depth)
                ),
                TraceEvent::PassStarted { pass } => writeln!(out, "Pass {pass}:"),
                TraceEvent::FactDerived { atom, rule, .. } => {
                    writeln!(out, "  Inferred new fact: {atom} ({rule})")
                }
            };
        }
        out
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

impl InferenceObserver for TraceRecorder {
    fn goal_attempted(&mut self, goal: &Atom, depth: usize) {
        self.events.push(TraceEvent::GoalAttempted {
            goal: goal.clone(),
            depth,
        });
    }

    fn cycle_detected(&mut self, goal: &Atom, depth: usize) {
        self.events.push(TraceEvent::CycleDetected {
            goal: goal.clone(),
            depth,
        });
    }

    fn known_fact(&mut self, goal: &Atom, depth: usize) {
        self.events.push(TraceEvent::KnownFact {
            goal: goal.clone(),
            depth,
        });
    }

    fn no_rules(&mut self, goal: &Atom, depth: usize) {
        self.events.push(TraceEvent::NoRules {
            goal: goal.clone(),
            depth,
        });
    }

    fn rule_attempted(&mut self, index: usize, rule: &Rule, depth: usize) {
        self.events.push(TraceEvent::RuleAttempted {
            index,
            rule: rule.to_string(),
            depth,
        });
    }

    fn goal_proven(&mut self, goal: &Atom, depth: usize) {
        self.events.push(TraceEvent::GoalProven {
            goal: goal.clone(),
            depth,
        });
    }

    fn goal_failed(&mut self, goal: &Atom, depth: usize) {
        self.events.push(TraceEvent::GoalFailed {
            goal: goal.clone(),
            depth,
        });
    }

    fn pass_started(&mut self, pass: usize) {
        self.events.push(TraceEvent::PassStarted { pass });
    }

    fn fact_derived(&mut self, atom: &Atom, index: usize, rule: &Rule, pass: usize) {
        self.events.push(TraceEvent::FactDerived {
            atom: atom.clone(),
            index,
            rule: rule.label(),
            pass,
        });
    }
}

/// Fan one event stream out to two observers.
impl<A: InferenceObserver, B: InferenceObserver> InferenceObserver for (A, B) {
    fn goal_attempted(&mut self, goal: &Atom, depth: usize) {
        self.0.goal_attempted(goal, depth);
        self.1.goal_attempted(goal, depth);
    }

    fn cycle_detected(&mut self, goal: &Atom, depth: usize) {
        self.0.cycle_detected(goal, depth);
        self.1.cycle_detected(goal, depth);
    }

    fn known_fact(&mut self, goal: &Atom, depth: usize) {
        self.0.known_fact(goal, depth);
        self.1.known_fact(goal, depth);
    }

    fn no_rules(&mut self, goal: &Atom, depth: usize) {
        self.0.no_rules(goal, depth);
        self.1.no_rules(goal, depth);
    }

    fn rule_attempted(&mut self, index: usize, rule: &Rule, depth: usize) {
        self.0.rule_attempted(index, rule, depth);
        self.1.rule_attempted(index, rule, depth);
    }

    fn goal_proven(&mut self, goal: &Atom, depth: usize) {
        self.0.goal_proven(goal, depth);
        self.1.goal_proven(goal, depth);
    }

    fn goal_failed(&mut self, goal: &Atom, depth: usize) {
        self.0.goal_failed(goal, depth);
        self.1.goal_failed(goal, depth);
    }

    fn pass_started(&mut self, pass: usize) {
        self.0.pass_started(pass);
        self.1.pass_started(pass);
    }

    fn fact_derived(&mut self, atom: &Atom, index: usize, rule: &Rule, pass: usize) {
        self.0.fact_derived(atom, index, rule, pass);
        self.1.fact_derived(atom, index, rule, pass);
    }
}

/// An absent observer ignores every event; `Some` forwards to the inner one.
impl<O: InferenceObserver> InferenceObserver for Option<O> {
    fn goal_attempted(&mut self, goal: &Atom, depth: usize) {
        if let Some(inner) = self {
            inner.goal_attempted(goal, depth);
        }
    }

    fn cycle_detected(&mut self, goal: &Atom, depth: usize) {
        if let Some(inner) = self {
            inner.cycle_detected(goal, depth);
        }
    }

    fn known_fact(&mut self, goal: &Atom, depth: usize) {
        if let Some(inner) = self {
            inner.known_fact(goal, depth);
        }
    }

    fn no_rules(&mut self, goal: &Atom, depth: usize) {
        if let Some(inner) = self {
            inner.no_rules(goal, depth);
        }
    }

    fn rule_attempted(&mut self, index: usize, rule: &Rule, depth: usize) {
        if let Some(inner) = self {
            inner.rule_attempted(index, rule, depth);
        }
    }

    fn goal_proven(&mut self, goal: &Atom, depth: usize) {
        if let Some(inner) = self {
            inner.goal_proven(goal, depth);
        }
    }

    fn goal_failed(&mut self, goal: &Atom, depth: usize) {
        if let Some(inner) = self {
            inner.goal_failed(goal, depth);
        }
    }

    fn pass_started(&mut self, pass: usize) {
        if let Some(inner) = self {
            inner.pass_started(pass);
        }
    }

    fn fact_derived(&mut self, atom: &Atom, index: usize, rule: &Rule, pass: usize) {
        if let Some(inner) = self {
            inner.fact_derived(atom, index, rule, pass);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;

    #[test]
    fn recorder_renders_indented_narration() {
        let rule = Rule::new(Condition::atom("has_fur"), "mammal").unwrap();
        let mut rec = TraceRecorder::new();
        rec.goal_attempted(&Atom::new("mammal"), 0);
        rec.rule_attempted(0, &rule, 0);
        rec.goal_attempted(&Atom::new("has_fur"), 1);
        rec.known_fact(&Atom::new("has_fur"), 1);
        rec.goal_proven(&Atom::new("mammal"), 0);

        let text = rec.render();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Checking goal: mammal");
        assert_eq!(lines[1], "Attempting to prove rule: mammal :- has_fur");
        assert_eq!(lines[2], "  Checking goal: has_fur");
        assert_eq!(lines[3], "  'has_fur' is a known fact.");
        assert_eq!(
            lines[4],
            "All conditions for 'mammal' are proven. Adding to facts."
        );
    }

    #[test]
    fn events_serialize_with_tag() {
        let event = TraceEvent::PassStarted { pass: 2 };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"event":"pass_started","pass":2}"#);
    }

    #[test]
    fn pair_observer_fans_out() {
        let mut pair = (TraceRecorder::new(), TraceRecorder::new());
        pair.pass_started(1);
        assert_eq!(pair.0.events().len(), 1);
        assert_eq!(pair.1.events().len(), 1);
    }

    #[test]
    fn optional_recorder_only_records_when_present() {
        let mut off: Option<TraceRecorder> = None;
        off.pass_started(1);
        assert!(off.is_none());

        let mut on = Some(TraceRecorder::new());
        on.pass_started(1);
        on.goal_attempted(&Atom::new("x"), 0);
        assert_eq!(on.map(|r| r.events().len()), Some(2));
    }
}
