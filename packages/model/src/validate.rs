use crate::component::Component;
use crate::ids::ComponentId;
use crate::limits::{Limits, ResourceLimitExceeded};
use crate::style::STYLE_ARRAY_CAP;
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("component id 0 is reserved (node at depth {depth})")]
    ZeroId { depth: usize },

    #[error("component id {id} appears more than once")]
    DuplicateId { id: ComponentId },

    #[error("component {component}: {field} holds {count} entries, cap is {cap}")]
    CapExceeded {
        component: ComponentId,
        field: &'static str,
        count: usize,
        cap: usize,
    },

    #[error(transparent)]
    ResourceLimit(#[from] ResourceLimitExceeded),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TreeStats {
    pub node_count: usize,
    pub max_depth: usize,
    /// Total bytes of text payloads.
    pub text_bytes: usize,
}

impl TreeStats {
    /// Measure a tree without checking any invariant.
    pub fn measure(root: &Component) -> Self {
        root.iter_with_depth()
            .fold(TreeStats::default(), |mut stats, (depth, node)| {
                stats.node_count += 1;
                stats.max_depth = stats.max_depth.max(depth);
                stats.text_bytes += node.text.as_ref().map_or(0, String::len);
                stats
            })
    }
}

/// Check the structural invariants of a tree without recursing.
///
/// Fails on the first violation. Resource caps are checked before anything
/// else at each node, so an oversized tree is rejected as soon as a cap is crossed.
pub fn validate_tree(root: &Component, limits: &Limits) -> Result<TreeStats, StructuralError> {
    let mut seen = HashSet::new();
    let mut stats = TreeStats::default();

    for (depth, node) in root.iter_with_depth() {
        limits.check_depth(depth)?;
        stats.node_count += 1;
        limits.check_components(stats.node_count)?;
        stats.max_depth = stats.max_depth.max(depth);

        for s in node.strings() {
            limits.check_string(s.len())?;
        }
        stats.text_bytes += node.text.as_ref().map_or(0, String::len);

        if !node.id.is_valid() {
            return Err(StructuralError::ZeroId { depth });
        }
        if !seen.insert(node.id) {
            return Err(StructuralError::DuplicateId { id: node.id });
        }

        if let Some((field, count)) = node.style.as_ref().and_then(|s| s.first_over_cap()) {
            return Err(StructuralError::CapExceeded {
                component: node.id,
                field,
                count,
                cap: STYLE_ARRAY_CAP,
            });
        }
    }

    Ok(stats)
}
