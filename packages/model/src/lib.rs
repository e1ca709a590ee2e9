//! # KIR Model
//!
//! In-memory form of a compiled UI: the component tree, its style and layout
//! descriptions, and the reactive manifest that tracks runtime variables.
//!
//! Trees are plain owned data. Every traversal here is iterative, so the depth of a
//! tree is bounded only by [`Limits`], never by the call stack.

pub mod component;
pub mod diagnostics;
pub mod ids;
pub mod limits;
pub mod manifest;
pub mod reconcile;
pub mod registry;
pub mod style;
pub mod tags;
pub mod validate;

#[cfg(test)]
mod tests_manifest;
#[cfg(test)]
mod tests_tree;

pub use component::{
    Component, ComponentType, DepthPreorder, EventHandler, EventType, ExtensionId, ParentIndex,
    Preorder,
};
pub use diagnostics::{Severity, ValidationWarning, WarningCode};
pub use ids::{ComponentId, VariableId};
pub use limits::{LimitKind, Limits, ResourceLimitExceeded};
pub use manifest::{
    BindingKind, ComponentBinding, ManifestError, ReactiveConditional, ReactiveForLoop,
    ReactiveManifest, VarType, VarValue, VariableDescriptor, MANIFEST_FORMAT_VERSION,
};
pub use reconcile::{LoopDiff, ReconcileReport};
pub use registry::{ComponentHandler, HandlerRegistry};
pub use style::*;
pub use tags::Tagged;
pub use validate::{validate_tree, StructuralError, TreeStats};
