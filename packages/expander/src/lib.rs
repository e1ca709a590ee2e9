//! # KIR Expander
//!
//! Expands a parsed `.kry` document into a concrete component tree plus the reactive
//! manifest that describes its runtime variables.
//!
//! ## Purpose
//!
//! Component definitions are instantiated with their arguments, inheritance chains are
//! flattened, slots are filled, and `static` directives are resolved at compile time.
//! Runtime `if`/`for` directives are materialized once with initial values and recorded
//! in the manifest so a runtime can re-evaluate them.
//!
//! ## Determinism Contract
//!
//! **INVARIANT: Expansion is fully deterministic.**
//!
//! For any source and options, `compile()` produces an identical tree and manifest:
//!
//! - Same document → same component ids (CRC-32 of identity paths, probing in path order)
//! - Same document → same variable ids (declaration order, starting at 1)
//! - All maps are ordered (`BTreeMap`), so custom-data JSON is byte-stable
//! - No time, randomness or environment dependence
//!
//! **Tests**: See `tests/test_determinism.rs`.
//!
//! ## Recursion Protection
//!
//! Component instantiation keeps a call stack. A component that (directly or indirectly)
//! instantiates itself is rejected with [`CompileError::RecursiveComponent`]:
//! ```text
//! component A { Column { A() } }   // error: A → A
//! ```
//! Inheritance cycles (`A extends B`, `B extends A`) are rejected with
//! [`CompileError::CircularInheritance`] before any expansion happens.
//!
//! ## Identity
//!
//! Every node's id is derived from its path in the expanded tree: type or component
//! names with sibling ordinals, an explicit `id` property, or a loop item key. Editing
//! one part of a document leaves ids elsewhere unchanged, which is what lets a runtime
//! reconcile a hot-reloaded manifest against the old one.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kir_expander::{compile, ExpandOptions};
//!
//! let expansion = compile(source, ExpandOptions::default())?;
//! println!("{} nodes", expansion.tree.node_count());
//! ```

pub mod colors;
pub mod error;
pub mod eval;
pub mod expander;
pub mod identity;
pub mod properties;
pub mod value;

#[cfg(test)]
mod tests_components;
#[cfg(test)]
mod tests_directives;
#[cfg(test)]
mod tests_properties;

pub use error::{CompileError, ExpandResult, LineIndex, SourceLocation};
pub use eval::{evaluate, Binding, Evaluated, Scope};
pub use expander::{
    compile, compile_with_registry, parse_constant, ExpandOptions, Expander, Expansion, APP_ROOT,
};
pub use identity::IdAllocator;
pub use value::Value;
