//! The fact store: the set of atoms currently known to be true.
//!
//! A [`FactStore`] only ever grows during an inference run. Neither engine
//! removes facts, so after any call the store is a superset of what it held on
//! entry.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::atom::Atom;

/// Mutable set of known atoms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactStore {
    facts: HashSet<Atom>,
}

impl FactStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fact. Returns `true` if it was not already known.
    pub fn insert(&mut self, atom: impl Into<Atom>) -> bool {
        self.facts.insert(atom.into())
    }

    /// Whether `atom` is a known fact.
    pub fn contains(&self, atom: &str) -> bool {
        self.facts.contains(atom)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Iterate over the facts in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Atom> {
        self.facts.iter()
    }

    /// The facts sorted by name, for deterministic display.
    pub fn sorted(&self) -> Vec<&Atom> {
        let mut atoms: Vec<&Atom> = self.facts.iter().collect();
        atoms.sort();
        atoms
    }

    /// Whether every fact in `other` is also in `self`.
    pub fn is_superset(&self, other: &FactStore) -> bool {
        self.facts.is_superset(&other.facts)
    }
}

impl<A: Into<Atom>> FromIterator<A> for FactStore {
    fn from_iter<I: IntoIterator<Item = A>>(iter: I) -> Self {
        Self {
            facts: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<A: Into<Atom>> Extend<A> for FactStore {
    fn extend<I: IntoIterator<Item = A>>(&mut self, iter: I) {
        self.facts.extend(iter.into_iter().map(Into::into));
    }
}

impl<'a> IntoIterator for &'a FactStore {
    type Item = &'a Atom;
    type IntoIter = std::collections::hash_set::Iter<'a, Atom>;

    fn into_iter(self) -> Self::IntoIter {
        self.facts.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_are_ignored() {
        let mut facts: FactStore = ["has_fur", "eats_meat", "has_fur"].into_iter().collect();
        assert_eq!(facts.len(), 2);
        assert!(!facts.insert("eats_meat"));
        assert!(facts.insert("is_mammal"));
        assert_eq!(facts.len(), 3);
    }

    #[test]
    fn sorted_is_deterministic() {
        let facts: FactStore = ["b", "c", "a"].into_iter().collect();
        let names: Vec<&str> = facts.sorted().into_iter().map(Atom::as_str).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn superset_check() {
        let small: FactStore = ["a"].into_iter().collect();
        let mut big = small.clone();
        big.insert("b");
        assert!(big.is_superset(&small));
        assert!(!small.is_superset(&big));
    }
}
