// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # rulebase
//!
//! A small rule-based inference core: atoms, a monotone fact store, rules with
//! compound (all/or/not) conditions, and two chaining engines over them.
//!
//! ## Architecture
//!
//! - **Data model** (`atom`, `facts`, `condition`, `rules`): atoms, the fact
//!   store, the closed condition tree with its pure evaluator, ordered rule bases
//! - **Backward chaining** (`infer::backward`): goal-directed proof with a
//!   per-branch cycle guard and memoization into the fact store
//! - **Forward chaining** (`infer::forward`): saturation to a fixpoint
//! - **Tracing** (`trace`): injected observers instead of built-in printing
//! - **Analysis** (`analysis`): rule dependency graph and cycle detection
//! - **Inputs** (`knowledge`, `seeds`): TOML/JSON knowledge bases and bundled demos
//!
//! ## Library usage
//!
//! ```
//! use rulebase::atom::Atom;
//! use rulebase::facts::FactStore;
//! use rulebase::infer::{prove, saturate};
//! use rulebase::rules::RuleBase;
//!
//! let rules = RuleBase::parse_from_text(
//!     "reptile :- has_scales, lays_eggs, can_swim\n\
//!      crocodile :- reptile, has_sharp_teeth, is_carnivore\n",
//! )
//! .unwrap();
//! let base: FactStore = ["has_scales", "lays_eggs", "can_swim", "has_sharp_teeth", "is_carnivore"]
//!     .into_iter()
//!     .collect();
//!
//! let mut facts = base.clone();
//! assert!(prove(&Atom::new("crocodile"), &mut facts, &rules));
//!
//! let mut facts = base.clone();
//! let derived = saturate(&mut facts, &rules);
//! assert_eq!(derived, vec![Atom::new("reptile"), Atom::new("crocodile")]);
//! ```

pub mod analysis;
pub mod atom;
pub mod condition;
pub mod error;
pub mod facts;
pub mod infer;
pub mod knowledge;
pub mod rules;
pub mod seeds;
pub mod trace;
