//! The two chaining engines.
//!
//! Both engines borrow a caller-owned [`FactStore`](crate::facts::FactStore)
//! and a [`RuleBase`](crate::rules::RuleBase) for the duration of one call and
//! leave the store a superset of what it held on entry.
//!
//! - [`backward`]: goal-directed, depth-first proof with a cycle guard.
//! - [`forward`]: data-directed saturation to a fixpoint.

pub mod backward;
pub mod forward;

pub use backward::{prove, prove_all, prove_with};
pub use forward::{DerivedFact, Saturation, saturate, saturate_with};
