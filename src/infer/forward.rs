//! Forward-chaining fixpoint evaluator.
//!
//! Runs full passes over the rule base in declaration order, firing every
//! rule whose antecedent holds against the current fact store, until a pass
//! derives nothing new. Facts derived earlier in a pass are visible to later
//! rules in the same pass.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::atom::Atom;
use crate::condition::satisfied;
use crate::facts::FactStore;
use crate::rules::RuleBase;
use crate::trace::{InferenceObserver, NoopObserver};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// A single derived fact with the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedFact {
    pub atom: Atom,
    /// Declaration index of the rule that fired.
    pub rule_index: usize,
    pub rule_name: String,
    /// 1-based pass in which the fact was derived.
    pub pass: usize,
}

/// Result of saturating a fact store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Saturation {
    /// Newly derived facts in derivation order.
    pub derived: Vec<DerivedFact>,
    /// Passes run, including the final pass that derived nothing.
    pub passes: usize,
    /// Derivation count per rule label.
    pub rule_stats: BTreeMap<String, usize>,
}

impl Saturation {
    /// The derived atoms in derivation order.
    pub fn atoms(&self) -> Vec<Atom> {
        self.derived.iter().map(|d| d.atom.clone()).collect()
    }

    /// Whether the run derived nothing, i.e. the store was already saturated.
    pub fn is_empty(&self) -> bool {
        self.derived.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Saturation
// ---------------------------------------------------------------------------

/// Apply `rules` to `facts` until fixpoint. Returns the newly derived atoms in
/// the order they were derived.
pub fn saturate(facts: &mut FactStore, rules: &RuleBase) -> Vec<Atom> {
    saturate_with(facts, rules, &mut NoopObserver).atoms()
}

/// [`saturate`], reporting every pass and derivation to `observer` and
/// returning the full [`Saturation`] report.
pub fn saturate_with<O: InferenceObserver + ?Sized>(
    facts: &mut FactStore,
    rules: &RuleBase,
    observer: &mut O,
) -> Saturation {
    let mut result = Saturation::default();

    loop {
        result.passes += 1;
        let pass = result.passes;
        observer.pass_started(pass);

        let mut new_this_pass = 0;
        for (index, rule) in rules.iter().enumerate() {
            if facts.contains(rule.consequent.as_str()) {
                continue;
            }
            if !satisfied(&rule.antecedent, facts) {
                continue;
            }

            facts.insert(rule.consequent.clone());
            observer.fact_derived(&rule.consequent, index, rule, pass);

            let label = rule.label();
            *result.rule_stats.entry(label.clone()).or_insert(0) += 1;
            result.derived.push(DerivedFact {
                atom: rule.consequent.clone(),
                rule_index: index,
                rule_name: label,
                pass,
            });
            new_this_pass += 1;
        }

        if new_this_pass == 0 {
            break;
        }
    }

    tracing::debug!(
        derived = result.derived.len(),
        passes = result.passes,
        facts = facts.len(),
        "forward chaining reached fixpoint"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{TraceEvent, TraceRecorder};

    fn facts(atoms: &[&str]) -> FactStore {
        atoms.iter().copied().collect()
    }

    fn rules(text: &str) -> RuleBase {
        RuleBase::parse_from_text(text).unwrap()
    }

    fn names(atoms: &[Atom]) -> Vec<&str> {
        atoms.iter().map(Atom::as_str).collect()
    }

    #[test]
    fn carnivore_not_vegetarian() {
        let base = rules("is_carnivore :- all(has_fur, eats_meat)\nvegetarian :- not(eats_meat)\n");
        let mut f = facts(&["has_fur", "eats_meat"]);
        let derived = saturate(&mut f, &base);
        assert_eq!(names(&derived), vec!["is_carnivore"]);
        assert!(f.contains("is_carnivore"));
        assert!(!f.contains("vegetarian"));
    }

    #[test]
    fn same_pass_visibility() {
        // Declared in dependency order, the whole chain lands in pass 1.
        let base = rules("b :- a\nc :- b\nd :- c\n");
        let mut f = facts(&["a"]);
        let result = saturate_with(&mut f, &base, &mut NoopObserver);
        assert_eq!(names(&result.atoms()), vec!["b", "c", "d"]);
        assert!(result.derived.iter().all(|d| d.pass == 1));
        assert_eq!(result.passes, 2);
    }

    #[test]
    fn reverse_order_needs_more_passes_same_fixpoint() {
        let forward = rules("b :- a\nc :- b\nd :- c\n");
        let backward = rules("d :- c\nc :- b\nb :- a\n");

        let mut f1 = facts(&["a"]);
        let mut f2 = facts(&["a"]);
        let r1 = saturate_with(&mut f1, &forward, &mut NoopObserver);
        let r2 = saturate_with(&mut f2, &backward, &mut NoopObserver);

        assert_eq!(f1, f2);
        assert!(r2.passes > r1.passes);
        assert_eq!(r2.passes, 4);
    }

    #[test]
    fn idempotent_once_saturated() {
        let base = rules("b :- a\nc :- or(b, z)\n");
        let mut f = facts(&["a"]);
        assert_eq!(saturate(&mut f, &base).len(), 2);
        let snapshot = f.clone();
        let again = saturate_with(&mut f, &base, &mut NoopObserver);
        assert!(again.is_empty());
        assert_eq!(again.passes, 1);
        assert_eq!(f, snapshot);
    }

    #[test]
    fn cyclic_rules_never_fire() {
        let base = rules("a :- b\nb :- a\n");
        let mut f = facts(&["unrelated"]);
        assert!(saturate(&mut f, &base).is_empty());
        assert!(!f.contains("a"));
        assert!(!f.contains("b"));
    }

    #[test]
    fn negation_reads_current_state() {
        // `quiet` fires in pass 1 before `noisy` is derived later in the same
        // pass; facts are never retracted.
        let base = rules("quiet :- not(noisy)\nnoisy :- dog\n");
        let mut f = facts(&["dog"]);
        let derived = saturate(&mut f, &base);
        assert_eq!(names(&derived), vec!["quiet", "noisy"]);
    }

    #[test]
    fn operator_names_are_plain_atoms() {
        let base = rules("matched :- OR, NOT\n");
        let mut f = facts(&["OR", "NOT"]);
        assert_eq!(names(&saturate(&mut f, &base)), vec!["matched"]);
    }

    #[test]
    fn report_and_trace() {
        let base = rules(
            "fur: is_mammal :- has_fur\n\
             is_animal :- is_mammal\n\
             tiger: is_tiger :- is_mammal, has_tawny_color, has_black_stripes\n\
             cheetah: is_cheetah :- is_mammal, has_tawny_color, has_dark_spots\n",
        );
        let mut f = facts(&["has_fur", "has_tawny_color", "has_black_stripes"]);
        let mut rec = TraceRecorder::new();
        let result = saturate_with(&mut f, &base, &mut rec);

        assert_eq!(names(&result.atoms()), vec!["is_mammal", "is_animal", "is_tiger"]);
        assert_eq!(result.rule_stats.get("fur"), Some(&1));
        assert_eq!(result.rule_stats.get("rule for is_animal"), Some(&1));
        assert!(result.rule_stats.get("cheetah").is_none());
        assert_eq!(result.derived[2].rule_index, 2);

        let derived_events = rec
            .events()
            .iter()
            .filter(|e| matches!(e, TraceEvent::FactDerived { .. }))
            .count();
        let passes = rec
            .events()
            .iter()
            .filter(|e| matches!(e, TraceEvent::PassStarted { .. }))
            .count();
        assert_eq!(derived_events, 3);
        assert_eq!(passes, result.passes);
    }

    #[test]
    fn empty_rule_base_single_quiet_pass() {
        let mut f = facts(&["a"]);
        let result = saturate_with(&mut f, &RuleBase::new(), &mut NoopObserver);
        assert!(result.is_empty());
        assert_eq!(result.passes, 1);
    }
}
