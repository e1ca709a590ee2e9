//! Hot-reload reconciliation of a live manifest against a freshly expanded one.

use crate::component::Component;
use crate::ids::{ComponentId, VariableId};
use crate::manifest::{ReactiveManifest, VariableDescriptor};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument};

/// Child-level diff of one reactive loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoopDiff {
    pub parent_id: ComponentId,
    /// Present before and after, in new order.
    pub reused: Vec<ComponentId>,
    pub created: Vec<ComponentId>,
    pub removed: Vec<ComponentId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ReconcileReport {
    /// Kept their live value and version.
    pub preserved: Vec<VariableId>,
    /// Changed type, so the fresh initial value replaced the live one.
    pub reset: Vec<VariableId>,
    pub added: Vec<VariableId>,
    pub removed: Vec<String>,
    /// `(fresh id, final id)` for every fresh variable whose id changed.
    pub id_remap: Vec<(VariableId, VariableId)>,
    /// Fresh bindings that pointed at components or variables that do not exist.
    pub dropped_bindings: usize,
    /// Conditionals whose in-flight transition carries over.
    pub resumed_conditionals: Vec<ComponentId>,
    pub loops: Vec<LoopDiff>,
}

impl ReactiveManifest {
    /// Bring `self` (the live manifest) in line with `fresh`, produced by re-expanding
    /// the edited source into `tree`.
    ///
    /// Variables match by id when the name agrees and by name otherwise, so a declaration
    /// inserted or removed above a variable does not lose its state. A matched variable
    /// keeps its live id, value and version (unless the type changed); new declarations
    /// get ids no live variable holds. Every fresh id that changed is listed in
    /// [`ReconcileReport::id_remap`], and bindings, conditionals and loops are rewritten to
    /// the final ids. Bindings always come from `fresh`, filtered to ids that exist in `tree`.
    #[instrument(skip_all, fields(live = self.variables.len(), fresh = fresh.variables.len()))]
    pub fn reconcile(&mut self, fresh: ReactiveManifest, tree: &Component) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let mut live_vars = std::mem::take(&mut self.variables);
        let ReactiveManifest {
            format_version,
            variables: fresh_vars,
            bindings: fresh_bindings,
            conditionals: fresh_conditionals,
            loops: fresh_loops,
        } = fresh;

        let matches: Vec<(VariableDescriptor, Option<VariableDescriptor>)> = fresh_vars
            .into_iter()
            .map(|fresh_var| {
                let matched = live_vars
                    .iter()
                    .position(|v| v.id == fresh_var.id && v.name == fresh_var.name)
                    .or_else(|| live_vars.iter().position(|v| v.name == fresh_var.name))
                    .map(|index| live_vars.swap_remove(index));
                (fresh_var, matched)
            })
            .collect();
        report.removed = live_vars.into_iter().map(|v| v.name).collect();

        let mut taken: HashSet<VariableId> = matches
            .iter()
            .filter_map(|(_, live)| live.as_ref().map(|v| v.id))
            .collect();
        let mut colliding = Vec::new();
        for (fresh_var, live) in &matches {
            if live.is_none() && !taken.insert(fresh_var.id) {
                colliding.push(fresh_var.id);
            }
        }
        let mut next = taken.iter().map(|id| id.get()).max().unwrap_or(0);
        let mut remap: HashMap<VariableId, VariableId> = HashMap::new();
        for id in colliding {
            next += 1;
            remap.insert(id, VariableId(next));
        }

        let mut variables = Vec::with_capacity(matches.len());
        for (fresh_var, matched) in matches {
            let fresh_id = fresh_var.id;
            let id = match &matched {
                Some(live) => live.id,
                None => remap.get(&fresh_id).copied().unwrap_or(fresh_id),
            };
            if id != fresh_id {
                remap.insert(fresh_id, id);
                report.id_remap.push((fresh_id, id));
            }

            variables.push(match matched {
                Some(live) if live.var_type() == fresh_var.var_type() => {
                    report.preserved.push(id);
                    VariableDescriptor {
                        id,
                        value: live.value,
                        version: live.version,
                        ..fresh_var
                    }
                }
                Some(live) => {
                    debug!(
                        "variable '{}' changed type {:?} -> {:?}, resetting",
                        fresh_var.name,
                        live.var_type(),
                        fresh_var.var_type()
                    );
                    report.reset.push(id);
                    VariableDescriptor {
                        id,
                        version: live.version.wrapping_add(1),
                        ..fresh_var
                    }
                }
                None => {
                    report.added.push(id);
                    VariableDescriptor { id, ..fresh_var }
                }
            });
        }
        self.variables = variables;
        let resolve = |id: VariableId| remap.get(&id).copied().unwrap_or(id);

        let tree_ids: HashSet<ComponentId> = tree.iter().map(|node| node.id).collect();
        let var_ids: HashSet<VariableId> = self.variables.iter().map(|v| v.id).collect();
        let total_bindings = fresh_bindings.len();
        self.bindings = fresh_bindings
            .into_iter()
            .map(|mut binding| {
                binding.variable_id = resolve(binding.variable_id);
                binding
            })
            .filter(|b| tree_ids.contains(&b.component_id) && var_ids.contains(&b.variable_id))
            .collect();
        report.dropped_bindings = total_bindings - self.bindings.len();
        self.recount_bindings();

        let live_conditionals = std::mem::take(&mut self.conditionals);
        self.conditionals = fresh_conditionals
            .into_iter()
            .map(|mut cond| {
                for dep in &mut cond.dependencies {
                    *dep = resolve(*dep);
                }
                if let Some(live) = live_conditionals
                    .iter()
                    .find(|c| c.component_id == cond.component_id)
                {
                    cond.last_result = live.last_result;
                    cond.suspended = live.suspended;
                    if live.suspended {
                        report.resumed_conditionals.push(cond.component_id);
                    }
                }
                cond
            })
            .collect();

        let live_loops = std::mem::take(&mut self.loops);
        let mut fresh_loops = fresh_loops;
        for fresh_loop in &mut fresh_loops {
            fresh_loop.collection_var = fresh_loop.collection_var.map(resolve);
            let previous: &[ComponentId] = live_loops
                .iter()
                .find(|l| l.parent_id == fresh_loop.parent_id)
                .map(|l| l.children.as_slice())
                .unwrap_or(&[]);
            report.loops.push(diff_children(fresh_loop.parent_id, previous, &fresh_loop.children));
        }
        self.loops = fresh_loops;
        self.format_version = format_version;

        info!(
            "reconciled manifest: {} preserved, {} reset, {} added, {} removed",
            report.preserved.len(),
            report.reset.len(),
            report.added.len(),
            report.removed.len()
        );
        report
    }
}

fn diff_children(parent_id: ComponentId, before: &[ComponentId], after: &[ComponentId]) -> LoopDiff {
    let before_set: HashSet<_> = before.iter().copied().collect();
    let after_set: HashSet<_> = after.iter().copied().collect();
    let (reused, created) = after.iter().copied().partition(|id| before_set.contains(id));
    LoopDiff {
        parent_id,
        reused,
        created,
        removed: before
            .iter()
            .copied()
            .filter(|id| !after_set.contains(id))
            .collect(),
    }
}
