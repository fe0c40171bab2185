// src/task/mod.rs

//! Tasks and the actions they wrap.
//!
//! - [`action`] defines the opaque [`Action`] boundary plus closure and
//!   fallback-chain implementations.
//! - [`guard`] holds the optionality predicates evaluated at scheduling time.
//! - [`node`] defines [`TaskNode`], the unit the resolver and executors see.

pub mod action;
pub mod guard;
pub mod node;

pub use action::{Action, ActionFuture, ActionOutput, FallbackAction, FnAction};
pub use guard::Guard;
pub use node::{Location, TaskNode};
