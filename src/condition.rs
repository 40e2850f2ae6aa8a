//! Rule antecedents: a closed tagged tree of atoms, conjunctions,
//! binary disjunctions and negations, plus the pure evaluator that decides
//! whether a condition holds against a [`FactStore`].
//!
//! Conditions are validated once when they are built (or deserialized and
//! then checked with [`Condition::validate`]); evaluation never fails.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::atom::Atom;
use crate::error::{RuleError, RuleResult};
use crate::facts::FactStore;

// ---------------------------------------------------------------------------
// Condition tree
// ---------------------------------------------------------------------------

/// What must hold for a rule to fire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "RawCondition")]
pub enum Condition {
    /// Satisfied iff the atom is a known fact.
    Atom(Atom),
    /// Conjunction; satisfied iff every operand is. Never empty.
    All(Vec<Condition>),
    /// Binary disjunction.
    Or(Box<Condition>, Box<Condition>),
    /// Negation: satisfied iff the operand is not.
    Not(Box<Condition>),
}

impl Condition {
    /// A single-atom condition.
    pub fn atom(name: impl Into<Atom>) -> Self {
        Self::Atom(name.into())
    }

    /// A conjunction of `conditions`. Rejects an empty list.
    pub fn all(conditions: impl IntoIterator<Item = Condition>) -> RuleResult<Self> {
        let conditions: Vec<Condition> = conditions.into_iter().collect();
        if conditions.is_empty() {
            return Err(RuleError::InvalidCondition {
                message: "all(...) needs at least one operand".into(),
            });
        }
        Ok(Self::All(conditions))
    }

    /// A conjunction of plain atoms, the common shape of expert-system rules.
    pub fn all_atoms<A: Into<Atom>>(atoms: impl IntoIterator<Item = A>) -> RuleResult<Self> {
        Self::all(atoms.into_iter().map(|a| Self::Atom(a.into())))
    }

    /// Disjunction of exactly two conditions.
    pub fn or(left: Condition, right: Condition) -> Self {
        Self::Or(Box::new(left), Box::new(right))
    }

    /// Disjunction from an operand list; anything but two operands is
    /// rejected.
    pub fn or_from(operands: Vec<Condition>) -> RuleResult<Self> {
        let count = operands.len();
        match <[Condition; 2]>::try_from(operands) {
            Ok([left, right]) => Ok(Self::or(left, right)),
            Err(_) => Err(RuleError::InvalidCondition {
                message: format!("or(...) takes exactly two operands, got {count}"),
            }),
        }
    }

    /// Negation of `inner`.
    pub fn not(inner: Condition) -> Self {
        Self::Not(Box::new(inner))
    }

    /// Check structural invariants of a tree that was not built through the
    /// constructors: no empty conjunction anywhere, and every atom a valid
    /// rule atom (see [`check_rule_atom`]).
    pub fn validate(&self) -> RuleResult<()> {
        match self {
            Self::Atom(atom) => check_rule_atom(atom),
            Self::All(conditions) if conditions.is_empty() => Err(RuleError::InvalidCondition {
                message: "all(...) needs at least one operand".into(),
            }),
            Self::All(conditions) => conditions.iter().try_for_each(Self::validate),
            Self::Or(left, right) => {
                left.validate()?;
                right.validate()
            }
            Self::Not(inner) => inner.validate(),
        }
    }

    /// Decide whether this condition holds against `facts`.
    pub fn satisfied(&self, facts: &FactStore) -> bool {
        satisfied(self, facts)
    }

    /// The ordered sub-goals the backward chainer proves for this antecedent:
    /// the operands of a top-level conjunction, otherwise the whole condition.
    pub fn subgoals(&self) -> &[Condition] {
        match self {
            Self::All(conditions) => conditions,
            other => std::slice::from_ref(other),
        }
    }

    /// Visit every atom in the tree together with whether it sits under an
    /// odd number of negations.
    pub fn visit_atoms<'a>(&'a self, visit: &mut impl FnMut(&'a Atom, bool)) {
        self.visit_atoms_inner(false, visit);
    }

    fn visit_atoms_inner<'a>(&'a self, negated: bool, visit: &mut impl FnMut(&'a Atom, bool)) {
        match self {
            Self::Atom(atom) => visit(atom, negated),
            Self::All(conditions) => {
                for c in conditions {
                    c.visit_atoms_inner(negated, visit);
                }
            }
            Self::Or(left, right) => {
                left.visit_atoms_inner(negated, visit);
                right.visit_atoms_inner(negated, visit);
            }
            Self::Not(inner) => inner.visit_atoms_inner(!negated, visit),
        }
    }

    /// All atoms mentioned by this condition, in first-mention order.
    pub fn atoms(&self) -> Vec<&Atom> {
        let mut atoms: Vec<&Atom> = Vec::new();
        self.visit_atoms(&mut |atom, _| {
            if !atoms.contains(&atom) {
                atoms.push(atom);
            }
        });
        atoms
    }

    /// Whether a `Not` appears anywhere in the tree.
    pub fn has_negation(&self) -> bool {
        match self {
            Self::Atom(_) => false,
            Self::All(conditions) => conditions.iter().any(Self::has_negation),
            Self::Or(left, right) => left.has_negation() || right.has_negation(),
            Self::Not(_) => true,
        }
    }

    /// Parse a condition from the text rule syntax:
    /// `a, b` (conjunction), `or(a, b)`, `not(a)`, `all(a, b)` and `( ... )`.
    ///
    /// `or`, `not` and `all` are operators only when immediately followed by
    /// `(`; otherwise they are ordinary atom names.
    pub fn parse(text: &str) -> RuleResult<Self> {
        let mut parser = ConditionParser::new(text);
        let condition = parser.condition()?;
        parser.skip_ws();
        if let Some(ch) = parser.peek() {
            return Err(parse_error(format!(
                "unexpected '{ch}' at column {}",
                parser.pos + 1
            )));
        }
        Ok(condition)
    }
}

impl From<Atom> for Condition {
    fn from(atom: Atom) -> Self {
        Self::Atom(atom)
    }
}

impl From<&str> for Condition {
    fn from(name: &str) -> Self {
        Self::Atom(Atom::new(name))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atom(atom) => write!(f, "{atom}"),
            Self::All(conditions) => {
                f.write_str("all(")?;
                write_list(f, conditions)?;
                f.write_str(")")
            }
            Self::Or(left, right) => write!(f, "or({left}, {right})"),
            Self::Not(inner) => write!(f, "not({inner})"),
        }
    }
}

/// Write conditions separated by `, `.
pub(crate) fn write_list(f: &mut fmt::Formatter<'_>, conditions: &[Condition]) -> fmt::Result {
    for (i, c) in conditions.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{c}")?;
    }
    Ok(())
}

/// Reject atoms that the text rule format cannot carry: empty names and
/// names containing whitespace, `,`, `(`, `)` or `:`.
pub fn check_rule_atom(atom: &Atom) -> RuleResult<()> {
    let name = atom.as_str();
    if name.is_empty() {
        return Err(RuleError::InvalidCondition {
            message: "atom name is empty".into(),
        });
    }
    if let Some(bad) = name
        .chars()
        .find(|ch| ch.is_whitespace() || matches!(ch, ',' | '(' | ')' | ':'))
    {
        return Err(RuleError::InvalidCondition {
            message: format!("atom '{name}' contains {bad:?}"),
        });
    }
    Ok(())
}

/// Serialized shape of a condition before validation. `or` takes a list so
/// that a wrong operand count is reported as an invalid condition rather
/// than a syntax error.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawCondition {
    Atom(String),
    All(Vec<RawCondition>),
    Or(Vec<RawCondition>),
    Not(Box<RawCondition>),
}

impl TryFrom<RawCondition> for Condition {
    type Error = RuleError;

    fn try_from(raw: RawCondition) -> RuleResult<Self> {
        match raw {
            RawCondition::Atom(name) => {
                let atom = Atom::new(name);
                check_rule_atom(&atom)?;
                Ok(Self::Atom(atom))
            }
            RawCondition::All(operands) => Self::all(
                operands
                    .into_iter()
                    .map(Self::try_from)
                    .collect::<RuleResult<Vec<_>>>()?,
            ),
            RawCondition::Or(operands) => Self::or_from(
                operands
                    .into_iter()
                    .map(Self::try_from)
                    .collect::<RuleResult<Vec<_>>>()?,
            ),
            RawCondition::Not(inner) => Ok(Self::not(Self::try_from(*inner)?)),
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

/// Decide whether `condition` holds against `facts`.
///
/// Pure and total: unknown atoms are simply false.
pub fn satisfied(condition: &Condition, facts: &FactStore) -> bool {
    match condition {
        Condition::Atom(atom) => facts.contains(atom.as_str()),
        Condition::All(conditions) => conditions.iter().all(|c| satisfied(c, facts)),
        Condition::Or(left, right) => satisfied(left, facts) || satisfied(right, facts),
        Condition::Not(inner) => !satisfied(inner, facts),
    }
}

// ---------------------------------------------------------------------------
// Text syntax
// ---------------------------------------------------------------------------

fn parse_error(message: String) -> RuleError {
    RuleError::Parse { line: 0, message }
}

/// Deepest `( ... )` / `name( ... )` nesting the text parser accepts.
pub const MAX_NESTING: usize = 128;

struct ConditionParser<'a> {
    text: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> ConditionParser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            depth: 0,
        }
    }

    /// Run `parse` one nesting level deeper, failing past [`MAX_NESTING`].
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> RuleResult<T>) -> RuleResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(parse_error(format!(
                "conditions nested deeper than {MAX_NESTING} levels at column {}",
                self.pos + 1
            )));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(ch) = self.peek() {
            self.pos += ch.len_utf8();
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn expect(&mut self, want: char) -> RuleResult<()> {
        self.skip_ws();
        match self.peek() {
            Some(ch) if ch == want => {
                self.bump();
                Ok(())
            }
            Some(ch) => Err(parse_error(format!(
                "expected '{want}' but found '{ch}' at column {}",
                self.pos + 1
            ))),
            None => Err(parse_error(format!("expected '{want}' but input ended"))),
        }
    }

    /// `term ("," term)*`; more than one term becomes a conjunction.
    fn condition(&mut self) -> RuleResult<Condition> {
        let mut terms = self.terms()?;
        if terms.len() == 1 {
            Ok(terms.remove(0))
        } else {
            Condition::all(terms)
        }
    }

    fn terms(&mut self) -> RuleResult<Vec<Condition>> {
        let mut terms = vec![self.term()?];
        loop {
            self.skip_ws();
            if self.peek() == Some(',') {
                self.bump();
                terms.push(self.term()?);
            } else {
                return Ok(terms);
            }
        }
    }

    fn term(&mut self) -> RuleResult<Condition> {
        self.skip_ws();
        match self.peek() {
            Some('(') => {
                self.bump();
                self.nested(|p| {
                    let inner = p.condition()?;
                    p.expect(')')?;
                    Ok(inner)
                })
            }
            Some(_) => {
                let name = self.ident();
                if name.is_empty() {
                    return Err(RuleError::InvalidCondition {
                        message: format!("missing atom at column {}", self.pos + 1),
                    });
                }
                if self.peek() == Some('(') {
                    self.bump();
                    self.nested(|p| p.operator(name))
                } else {
                    Ok(Condition::atom(name))
                }
            }
            None => Err(RuleError::InvalidCondition {
                message: "missing atom at end of condition".into(),
            }),
        }
    }

    /// Body of `name(...)`; the opening parenthesis is already consumed.
    fn operator(&mut self, name: &str) -> RuleResult<Condition> {
        self.skip_ws();
        let operands = if self.peek() == Some(')') {
            Vec::new()
        } else {
            self.terms()?
        };
        self.expect(')')?;

        match name {
            "all" => Condition::all(operands),
            "not" => {
                let mut operands = operands;
                match operands.len() {
                    0 => Err(RuleError::InvalidCondition {
                        message: "not(...) needs an operand".into(),
                    }),
                    1 => Ok(Condition::not(operands.remove(0))),
                    _ => Ok(Condition::not(Condition::all(operands)?)),
                }
            }
            "or" => Condition::or_from(operands),
            other => Err(parse_error(format!(
                "unknown operator '{other}(': expected all, or or not"
            ))),
        }
    }

    fn ident(&mut self) -> &'a str {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|ch| !ch.is_whitespace() && !matches!(ch, '(' | ')' | ','))
        {
            self.bump();
        }
        &self.text[start..self.pos]
    }
}
