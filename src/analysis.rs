//! Rule dependency analysis: which atoms feed which consequents.
//!
//! The graph has one node per atom and an edge `a -> c` for every rule with
//! consequent `c` whose antecedent mentions `a`. Edges record whether `a`
//! appears under a negation. Cycles in this graph are exactly the goals the
//! backward chainer reports as unprovable without outside support.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::atom::Atom;
use crate::rules::RuleBase;

/// How an antecedent atom is used by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    Positive,
    /// Under an odd number of `not(...)`.
    Negative,
}

/// Directed atom dependency graph of a rule base.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<Atom, Polarity>,
    nodes: HashMap<Atom, NodeIndex>,
}

impl DependencyGraph {
    /// Build the dependency graph of `rules`.
    pub fn build(rules: &RuleBase) -> Self {
        let mut dg = Self {
            graph: DiGraph::new(),
            nodes: HashMap::new(),
        };

        for rule in rules {
            let head = dg.node(&rule.consequent);
            let mut edges = Vec::new();
            rule.antecedent.visit_atoms(&mut |atom, negated| {
                let polarity = if negated {
                    Polarity::Negative
                } else {
                    Polarity::Positive
                };
                edges.push((atom, polarity));
            });
            // One edge per (atom, head); negative wins over positive.
            for (atom, polarity) in edges {
                let from = dg.node(atom);
                match dg.graph.find_edge(from, head) {
                    Some(edge) if polarity == Polarity::Negative => {
                        dg.graph[edge] = Polarity::Negative;
                    }
                    Some(_) => {}
                    None => {
                        dg.graph.add_edge(from, head, polarity);
                    }
                }
            }
        }

        dg
    }

    fn node(&mut self, atom: &Atom) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(atom) {
            return idx;
        }
        let idx = self.graph.add_node(atom.clone());
        self.nodes.insert(atom.clone(), idx);
        idx
    }

    /// Number of distinct atoms mentioned by the rules.
    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Atoms some rule concludes, sorted.
    ///
    /// Every antecedent mentions at least one atom, so these are exactly the
    /// nodes with an incoming edge.
    pub fn derivable_atoms(&self) -> Vec<&Atom> {
        let mut atoms: Vec<&Atom> = self
            .graph
            .node_indices()
            .filter(|&n| {
                self.graph
                    .neighbors_directed(n, petgraph::Direction::Incoming)
                    .next()
                    .is_some()
            })
            .map(|n| &self.graph[n])
            .collect();
        atoms.sort();
        atoms
    }

    /// Every atom mentioned by the rules, sorted.
    pub fn universe(&self) -> Vec<&Atom> {
        let mut atoms: Vec<&Atom> = self.graph.node_weights().collect();
        atoms.sort();
        atoms
    }

    /// Atoms that `atom` directly depends on, sorted.
    pub fn dependencies(&self, atom: &str) -> Vec<&Atom> {
        let Some(&idx) = self.nodes.get(atom) else {
            return Vec::new();
        };
        let mut deps: Vec<&Atom> = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .map(|n| &self.graph[n])
            .collect();
        deps.sort();
        deps.dedup();
        deps
    }

    /// Groups of atoms that depend on each other, each sorted by name.
    ///
    /// A single atom counts only if a rule makes it depend on itself.
    pub fn cycles(&self) -> Vec<Vec<Atom>> {
        let mut cycles: Vec<Vec<Atom>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| match component.as_slice() {
                [single] => self.graph.contains_edge(*single, *single),
                _ => true,
            })
            .map(|component| {
                let mut members: Vec<Atom> =
                    component.iter().map(|&n| self.graph[n].clone()).collect();
                members.sort();
                members
            })
            .collect();
        cycles.sort();
        cycles
    }

    pub fn is_acyclic(&self) -> bool {
        !petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Whether any rule reads an atom under a negation.
    pub fn uses_negation(&self) -> bool {
        self.graph
            .edge_weights()
            .any(|polarity| *polarity == Polarity::Negative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(text: &str) -> DependencyGraph {
        DependencyGraph::build(&RuleBase::parse_from_text(text).unwrap())
    }

    fn names(atoms: &[Atom]) -> Vec<&str> {
        atoms.iter().map(Atom::as_str).collect()
    }

    #[test]
    fn mutual_recursion_is_one_cycle() {
        let dg = graph("a :- b\nb :- a\nc :- a, d\n");
        let cycles = dg.cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(names(&cycles[0]), vec!["a", "b"]);
        assert!(!dg.is_acyclic());
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let dg = graph("loop :- loop, x\n");
        assert_eq!(dg.cycles(), vec![vec![Atom::new("loop")]]);
    }

    #[test]
    fn acyclic_chain() {
        let dg = graph(
            "reptile :- has_scales, lays_eggs, can_swim\n\
             crocodile :- reptile, has_sharp_teeth\n",
        );
        assert!(dg.is_acyclic());
        assert!(dg.cycles().is_empty());
        assert!(!dg.uses_negation());
        assert_eq!(dg.atom_count(), 6);
        let deps: Vec<&str> = dg
            .dependencies("crocodile")
            .into_iter()
            .map(Atom::as_str)
            .collect();
        assert_eq!(deps, vec!["has_sharp_teeth", "reptile"]);
        assert!(dg.dependencies("nothing").is_empty());

        let derivable: Vec<&str> = dg.derivable_atoms().into_iter().map(Atom::as_str).collect();
        assert_eq!(derivable, vec!["crocodile", "reptile"]);
        assert_eq!(dg.universe().len(), 6);
    }

    #[test]
    fn negation_is_recorded() {
        let dg = graph("vegetarian :- not(eats_meat)\n");
        assert!(dg.uses_negation());
        // Double negation is positive again.
        assert!(!graph("x :- not(not(y))\n").uses_negation());
        assert!(graph("x :- not(y), y\n").uses_negation());
    }
}
