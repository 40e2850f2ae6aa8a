//! Backward chaining: reason from a goal back to known facts.
//!
//! Given a goal atom, tries every rule concluding it in declaration order and
//! recursively proves the rule's sub-goals, depth first. The first rule whose
//! sub-goals all prove wins; the goal is then committed to the fact store so
//! later proofs of it are a plain lookup.
//!
//! Cycles are cut by the proof path: a goal that is already being proved
//! further up the *same* branch is reported as unprovable. Sibling branches
//! never see each other's path, so diamond-shaped dependencies still prove.

use rayon::prelude::*;

use crate::atom::Atom;
use crate::condition::Condition;
use crate::facts::FactStore;
use crate::rules::RuleBase;
use crate::trace::{InferenceObserver, NoopObserver};

/// One link of the active proof path.
///
/// Each recursive call borrows its parent's link and pushes its own goal on
/// top, so extending the path costs nothing and siblings share only their
/// common ancestors.
#[derive(Debug, Clone, Copy)]
struct ProofPath<'p> {
    goal: &'p Atom,
    parent: Option<&'p ProofPath<'p>>,
}

impl ProofPath<'_> {
    fn contains(&self, atom: &Atom) -> bool {
        let mut link = Some(self);
        while let Some(current) = link {
            if current.goal == atom {
                return true;
            }
            link = current.parent;
        }
        false
    }
}

/// Prove `goal` against `facts` and `rules`.
///
/// Successful sub-proofs are memoized into `facts`, which only ever grows.
/// An unknown or cyclic goal is simply `false`.
pub fn prove(goal: &Atom, facts: &mut FactStore, rules: &RuleBase) -> bool {
    prove_with(goal, facts, rules, &mut NoopObserver)
}

/// [`prove`], reporting every step to `observer`.
pub fn prove_with<O: InferenceObserver + ?Sized>(
    goal: &Atom,
    facts: &mut FactStore,
    rules: &RuleBase,
    observer: &mut O,
) -> bool {
    let before = facts.len();
    let mut prover = Prover {
        facts,
        rules,
        observer,
    };
    let proven = prover.prove_goal(goal, None, 0);
    tracing::debug!(
        %goal,
        proven,
        memoized = prover.facts.len() - before,
        "backward chaining finished"
    );
    proven
}

/// Prove each goal independently, in parallel.
///
/// Every goal runs against its own clone of `base`, so no memoized fact from
/// one query leaks into another and `base` itself is left untouched. Results
/// are returned in input order.
pub fn prove_all(goals: &[Atom], base: &FactStore, rules: &RuleBase) -> Vec<(Atom, bool)> {
    let results: Vec<(Atom, bool)> = goals
        .par_iter()
        .map(|goal| {
            let mut facts = base.clone();
            let proven = prove(goal, &mut facts, rules);
            (goal.clone(), proven)
        })
        .collect();

    tracing::info!(
        goals = results.len(),
        proven = results.iter().filter(|(_, ok)| *ok).count(),
        "batch proof finished"
    );
    results
}

struct Prover<'a, O: ?Sized> {
    facts: &'a mut FactStore,
    rules: &'a RuleBase,
    observer: &'a mut O,
}

impl<O: InferenceObserver + ?Sized> Prover<'_, O> {
    fn prove_goal(&mut self, goal: &Atom, path: Option<&ProofPath<'_>>, depth: usize) -> bool {
        self.observer.goal_attempted(goal, depth);

        if path.is_some_and(|p| p.contains(goal)) {
            self.observer.cycle_detected(goal, depth);
            return false;
        }
        let path = ProofPath { goal, parent: path };

        if self.facts.contains(goal.as_str()) {
            self.observer.known_fact(goal, depth);
            return true;
        }

        let rules = self.rules;
        let mut candidates = rules.concluding(goal.as_str()).peekable();
        if candidates.peek().is_none() {
            self.observer.no_rules(goal, depth);
            return false;
        }

        for (index, rule) in candidates {
            self.observer.rule_attempted(index, rule, depth);
            let proven = rule
                .antecedent
                .subgoals()
                .iter()
                .all(|sub| self.prove_condition(sub, &path, depth + 1));
            if proven {
                self.facts.insert(goal.clone());
                self.observer.goal_proven(goal, depth);
                return true;
            }
        }

        self.observer.goal_failed(goal, depth);
        false
    }

    /// Prove one sub-goal. Atoms recurse into [`Prover::prove_goal`];
    /// compound sub-goals combine their operands' proofs, with `not` read as
    /// negation as failure.
    fn prove_condition(&mut self, condition: &Condition, path: &ProofPath<'_>, depth: usize) -> bool {
        match condition {
            Condition::Atom(atom) => self.prove_goal(atom, Some(path), depth),
            Condition::All(conditions) => conditions
                .iter()
                .all(|c| self.prove_condition(c, path, depth)),
            Condition::Or(left, right) => {
                self.prove_condition(left, path, depth) || self.prove_condition(right, path, depth)
            }
            Condition::Not(inner) => !self.prove_condition(inner, path, depth),
        }
    }
}
