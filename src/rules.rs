//! Rules and rule bases.
//!
//! A [`Rule`] pairs an antecedent [`Condition`] with a single consequent
//! [`Atom`]. A [`RuleBase`] is an ordered list of rules: declaration order
//! decides which candidate the backward chainer tries first and the order in
//! which the forward chainer fires rules within a pass.
//!
//! Rules are data, not code. They can be built programmatically, loaded from
//! JSON, or parsed from the text format:
//!
//! ```text
//! # comments and blank lines are ignored
//! reptile :- has_scales, lays_eggs, can_swim
//! croc-id: crocodile :- reptile, has_sharp_teeth, is_carnivore
//! vegetarian :- not(eats_meat)
//! pet :- or(is_cat, is_dog)
//! ```

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::atom::Atom;
use crate::condition::{Condition, RawCondition, check_rule_atom, write_list};
use crate::error::{RuleError, RuleResult};

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// A single rule: if `antecedent` holds, `consequent` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRule")]
pub struct Rule {
    /// Optional human-readable name, used in traces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub antecedent: Condition,
    pub consequent: Atom,
}

impl Rule {
    /// Create a rule, validating the antecedent and the consequent name.
    pub fn new(antecedent: Condition, consequent: impl Into<Atom>) -> RuleResult<Self> {
        let rule = Self {
            name: None,
            antecedent,
            consequent: consequent.into(),
        };
        rule.validate()?;
        Ok(rule)
    }

    /// Set the rule name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Check the invariants a rule must satisfy before it enters a rule base.
    pub fn validate(&self) -> RuleResult<()> {
        if self.consequent.as_str().is_empty() {
            return Err(RuleError::InvalidCondition {
                message: "rule consequent is empty".into(),
            });
        }
        check_rule_atom(&self.consequent)?;
        if let Some(name) = &self.name {
            if name.is_empty() || name.trim() != name || name.contains(':') {
                return Err(RuleError::InvalidCondition {
                    message: format!("rule name '{name}' must be non-empty, trimmed and free of ':'"),
                });
            }
        }
        self.antecedent.validate()
    }

    /// Parse one line of the text format: `[name:] consequent :- condition`.
    pub fn parse(line: &str) -> RuleResult<Self> {
        let (head, body) = line.split_once(":-").ok_or_else(|| RuleError::Parse {
            line: 0,
            message: format!("missing ':-' in rule '{}'", line.trim()),
        })?;

        let (name, consequent) = match head.split_once(':') {
            Some((name, consequent)) => (Some(name.trim()), consequent.trim()),
            None => (None, head.trim()),
        };
        if consequent.is_empty() || consequent.contains(char::is_whitespace) {
            return Err(RuleError::Parse {
                line: 0,
                message: format!("rule head must be a single atom, got '{}'", head.trim()),
            });
        }

        let mut rule = Self::new(Condition::parse(body)?, consequent)?;
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            rule = rule.with_name(name);
        }
        Ok(rule)
    }

    /// The name if set, otherwise a label derived from the consequent.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("rule for {}", self.consequent),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{name}: ")?;
        }
        write!(f, "{} :- ", self.consequent)?;
        match &self.antecedent {
            // A one-operand list would read back as the bare operand.
            Condition::All(conditions) if conditions.len() > 1 => write_list(f, conditions),
            other => write!(f, "{other}"),
        }
    }
}

/// Serialized shape of a rule before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRule {
    #[serde(default)]
    pub name: Option<String>,
    pub antecedent: RawCondition,
    pub consequent: String,
}

impl TryFrom<RawRule> for Rule {
    type Error = RuleError;

    fn try_from(raw: RawRule) -> RuleResult<Self> {
        let rule = Self {
            name: raw.name,
            antecedent: Condition::try_from(raw.antecedent)?,
            consequent: Atom::new(raw.consequent),
        };
        rule.validate()?;
        Ok(rule)
    }
}

// ---------------------------------------------------------------------------
// Rule base
// ---------------------------------------------------------------------------

/// An ordered, validated collection of rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Rule>", into = "Vec<Rule>")]
pub struct RuleBase {
    rules: Vec<Rule>,
}

impl RuleBase {
    /// An empty rule base.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a rule base from rules, validating each one.
    pub fn from_rules(rules: impl IntoIterator<Item = Rule>) -> RuleResult<Self> {
        let mut base = Self::new();
        for rule in rules {
            base.push(rule)?;
        }
        Ok(base)
    }

    /// Append a rule after validating it.
    pub fn push(&mut self, rule: Rule) -> RuleResult<()> {
        rule.validate()?;
        self.rules.push(rule);
        Ok(())
    }

    /// Builder-style [`RuleBase::push`].
    pub fn with_rule(mut self, rule: Rule) -> RuleResult<Self> {
        self.push(rule)?;
        Ok(self)
    }

    /// Parse rules from the text format, one rule per line.
    ///
    /// Blank lines and lines starting with `#` are skipped. Errors carry the
    /// 1-based line number.
    pub fn parse_from_text(text: &str) -> RuleResult<Self> {
        let mut base = Self::new();
        for (idx, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let rule = Rule::parse(trimmed).map_err(|e| e.at_line(idx + 1))?;
            base.rules.push(rule);
        }
        Ok(base)
    }

    /// Parse a JSON array of rules.
    ///
    /// Malformed JSON is a `KnowledgeParse` error; a well-formed rule with a
    /// bad condition keeps its `InvalidCondition` kind, tagged with the
    /// rule's 1-based position.
    pub fn from_json(json: &str) -> RuleResult<Self> {
        let raw: Vec<RawRule> = serde_json::from_str(json).map_err(|e| RuleError::KnowledgeParse {
            path: "<json>".into(),
            message: e.to_string(),
        })?;
        Self::from_raw(raw, 0)
    }

    /// Validate and append raw rules; positions in errors start after
    /// `offset` rules.
    pub(crate) fn from_raw(raw: Vec<RawRule>, offset: usize) -> RuleResult<Self> {
        let mut base = Self::new();
        base.extend_raw(raw, offset)?;
        Ok(base)
    }

    pub(crate) fn extend_raw(&mut self, raw: Vec<RawRule>, offset: usize) -> RuleResult<()> {
        for (idx, raw) in raw.into_iter().enumerate() {
            let rule = Rule::try_from(raw).map_err(|e| e.at_rule(offset + idx + 1))?;
            self.rules.push(rule);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Rule> {
        self.rules.get(index)
    }

    /// Iterate over rules in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    /// Rules concluding `goal`, with their declaration index, in order.
    pub fn concluding<'a>(&'a self, goal: &'a str) -> impl Iterator<Item = (usize, &'a Rule)> + 'a {
        self.rules
            .iter()
            .enumerate()
            .filter(move |(_, rule)| rule.consequent.as_str() == goal)
    }

    /// Every distinct consequent, in first-declaration order.
    pub fn consequents(&self) -> Vec<&Atom> {
        let mut seen = HashSet::new();
        self.rules
            .iter()
            .map(|r| &r.consequent)
            .filter(|a| seen.insert(*a))
            .collect()
    }

    /// Every distinct atom mentioned anywhere in the rule base, in
    /// first-mention order (antecedent atoms before their consequent).
    pub fn atoms(&self) -> Vec<&Atom> {
        let mut seen = HashSet::new();
        let mut atoms = Vec::new();
        for rule in &self.rules {
            for atom in rule.antecedent.atoms() {
                if seen.insert(atom) {
                    atoms.push(atom);
                }
            }
            if seen.insert(&rule.consequent) {
                atoms.push(&rule.consequent);
            }
        }
        atoms
    }
}

impl TryFrom<Vec<Rule>> for RuleBase {
    type Error = RuleError;

    fn try_from(rules: Vec<Rule>) -> RuleResult<Self> {
        Self::from_rules(rules)
    }
}

impl From<RuleBase> for Vec<Rule> {
    fn from(base: RuleBase) -> Self {
        base.rules
    }
}

impl<'a> IntoIterator for &'a RuleBase {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

impl fmt::Display for RuleBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "{rule}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_and_named_rules() {
        let rule = Rule::parse("reptile :- has_scales, lays_eggs, can_swim").unwrap();
        assert_eq!(rule.consequent.as_str(), "reptile");
        assert_eq!(rule.antecedent.subgoals().len(), 3);
        assert!(rule.name.is_none());

        let named = Rule::parse("croc-id: crocodile :- reptile").unwrap();
        assert_eq!(named.name.as_deref(), Some("croc-id"));
        assert_eq!(named.consequent.as_str(), "crocodile");
        assert_eq!(named.antecedent, Condition::atom("reptile"));
    }

    #[test]
    fn parse_rejects_bad_heads() {
        assert!(matches!(Rule::parse("reptile has_scales"), Err(RuleError::Parse { .. })));
        assert!(matches!(Rule::parse(" :- a"), Err(RuleError::Parse { .. })));
        assert!(matches!(Rule::parse("two atoms :- a"), Err(RuleError::Parse { .. })));
    }

    #[test]
    fn display_round_trips_through_parse() {
        let text = "pet-rule: pet :- or(is_cat, is_dog), not(is_wild)";
        let rule = Rule::parse(text).unwrap();
        assert_eq!(rule.to_string(), text);
        assert_eq!(Rule::parse(&rule.to_string()).unwrap(), rule);
    }

    #[test]
    fn text_format_skips_comments_and_reports_lines() {
        let text = "\
# animals
reptile :- has_scales, lays_eggs

crocodile :- reptile, has_sharp_teeth
";
        let base = RuleBase::parse_from_text(text).unwrap();
        assert_eq!(base.len(), 2);

        let err = RuleBase::parse_from_text("a :- b\nbroken line\n").unwrap_err();
        assert!(matches!(err, RuleError::Parse { line: 2, .. }));

        let err = RuleBase::parse_from_text("a :- b\n\nc :- or(a)\n").unwrap_err();
        match err {
            RuleError::InvalidCondition { message } => assert!(message.starts_with("line 3")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn concluding_preserves_declaration_order() {
        let base = RuleBase::parse_from_text(
            "first: c :- a\nother :- b\nsecond: c :- b\n",
        )
        .unwrap();
        let names: Vec<(usize, &str)> = base
            .concluding("c")
            .map(|(i, r)| (i, r.name.as_deref().unwrap_or("")))
            .collect();
        assert_eq!(names, vec![(0, "first"), (2, "second")]);
        assert_eq!(base.concluding("missing").count(), 0);
    }

    #[test]
    fn atoms_and_consequents() {
        let base = RuleBase::parse_from_text("b :- a\nc :- b, not(d)\nb :- e\n").unwrap();
        let atoms: Vec<&str> = base.atoms().into_iter().map(Atom::as_str).collect();
        assert_eq!(atoms, vec!["a", "b", "d", "c", "e"]);
        let heads: Vec<&str> = base.consequents().into_iter().map(Atom::as_str).collect();
        assert_eq!(heads, vec!["b", "c"]);
    }

    #[test]
    fn push_validates() {
        let mut base = RuleBase::new();
        let bad = Rule {
            name: None,
            antecedent: Condition::All(Vec::new()),
            consequent: Atom::new("x"),
        };
        assert!(matches!(base.push(bad), Err(RuleError::InvalidCondition { .. })));
        assert!(Rule::new(Condition::atom("a"), "").is_err());
        assert!(base.is_empty());
    }

    #[test]
    fn json_parsing_validates() {
        let base = RuleBase::new()
            .with_rule(
                Rule::new(Condition::all_atoms(["has_fur", "eats_meat"]).unwrap(), "is_carnivore")
                    .unwrap()
                    .with_name("carnivore"),
            )
            .unwrap();
        let json = serde_json::to_string(&base).unwrap();
        let back = RuleBase::from_json(&json).unwrap();
        assert_eq!(back, base);

        let bad = r#"[{"antecedent":{"all":[]},"consequent":"x"}]"#;
        match RuleBase::from_json(bad) {
            Err(RuleError::InvalidCondition { message }) => {
                assert!(message.starts_with("rule 1: all(...)"), "{message}");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let three = r#"[{"antecedent":{"atom":"a"},"consequent":"ok"},
            {"antecedent":{"or":[{"atom":"a"},{"atom":"b"},{"atom":"c"}]},"consequent":"x"}]"#;
        match RuleBase::from_json(three) {
            Err(RuleError::InvalidCondition { message }) => {
                assert_eq!(message, "rule 2: or(...) takes exactly two operands, got 3");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        assert!(matches!(
            RuleBase::from_json("[{"),
            Err(RuleError::KnowledgeParse { .. })
        ));
    }

    #[test]
    fn display_reparses_single_operand_lists_and_rejects_untextable_atoms() {
        let single = Rule::new(Condition::all_atoms(["has_fur"]).unwrap(), "mammal").unwrap();
        assert_eq!(single.to_string(), "mammal :- all(has_fur)");
        assert_eq!(Rule::parse(&single.to_string()).unwrap(), single);

        for bad in ["has fur", "a,b", "f(x)", "ns:atom"] {
            assert!(
                matches!(
                    Rule::new(Condition::atom(bad), "x"),
                    Err(RuleError::InvalidCondition { .. })
                ),
                "{bad}"
            );
            assert!(Rule::new(Condition::atom("a"), bad).is_err(), "{bad}");
        }
        assert!(Rule::new(Condition::atom("a"), "x").unwrap().with_name("bad:name").validate().is_err());

        let json = r#"[{"antecedent":{"atom":"has fur"},"consequent":"x"}]"#;
        assert!(matches!(
            RuleBase::from_json(json),
            Err(RuleError::InvalidCondition { .. })
        ));
    }
}
