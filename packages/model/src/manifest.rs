//! Reactive manifest: the side table of runtime variables and the components bound to them.

use crate::ids::{ComponentId, VariableId};
use crate::tags::tagged_enum;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use thiserror::Error;
use tracing::debug;

pub const MANIFEST_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarType {
    Int,
    Float,
    String,
    Bool,
    /// JSON-encoded structured value.
    Opaque,
}

tagged_enum!(VarType { Int = 0, Float = 1, String = 2, Bool = 3, Opaque = 4 });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VarValue {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Opaque(String),
}

impl VarValue {
    pub fn var_type(&self) -> VarType {
        match self {
            VarValue::Int(_) => VarType::Int,
            VarValue::Float(_) => VarType::Float,
            VarValue::String(_) => VarType::String,
            VarValue::Bool(_) => VarType::Bool,
            VarValue::Opaque(_) => VarType::Opaque,
        }
    }

    /// Value equality where two NaN floats with the same bits count as equal.
    pub fn same_as(&self, other: &VarValue) -> bool {
        match (self, other) {
            (VarValue::Float(a), VarValue::Float(b)) => a.to_bits() == b.to_bits(),
            (a, b) => a == b,
        }
    }

    /// Text form used when a value is interpolated into a string.
    pub fn display_string(&self) -> String {
        match self {
            VarValue::Int(v) => v.to_string(),
            VarValue::Float(v) => v.to_string(),
            VarValue::String(v) => v.clone(),
            VarValue::Bool(v) => v.to_string(),
            VarValue::Opaque(v) => v.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDescriptor {
    pub id: VariableId,
    pub name: String,
    pub value: VarValue,
    /// Bumped on every change of `value`.
    pub version: u32,
    /// `file:line:col` of the declaration.
    pub source_location: Option<String>,
    pub binding_count: u32,
}

impl VariableDescriptor {
    pub fn var_type(&self) -> VarType {
        self.value.var_type()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindingKind {
    Text,
    Conditional,
    Attribute,
    Loop,
}

tagged_enum!(BindingKind { Text = 0, Conditional = 1, Attribute = 2, Loop = 3 });

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentBinding {
    pub component_id: ComponentId,
    pub variable_id: VariableId,
    pub kind: BindingKind,
    pub expression: Option<String>,
    pub update_code: Option<String>,
}

impl ComponentBinding {
    pub fn new(component_id: ComponentId, variable_id: VariableId, kind: BindingKind) -> Self {
        Self {
            component_id,
            variable_id,
            kind,
            expression: None,
            update_code: None,
        }
    }

    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactiveConditional {
    pub component_id: ComponentId,
    pub condition: String,
    pub last_result: bool,
    /// Set while a transition between branches is in flight.
    pub suspended: bool,
    pub dependencies: Vec<VariableId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactiveForLoop {
    pub parent_id: ComponentId,
    pub collection_expr: Option<String>,
    pub collection_var: Option<VariableId>,
    /// Source text of the loop body, re-expanded by the runtime per item.
    pub item_template: Option<String>,
    /// Currently materialized children, in order.
    pub children: Vec<ComponentId>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("unknown variable {0}")]
    UnknownVariable(VariableId),

    #[error("variable '{0}' is already declared")]
    DuplicateName(String),

    #[error("variable {id} holds {expected:?}, cannot assign {found:?}")]
    TypeMismatch {
        id: VariableId,
        expected: VarType,
        found: VarType,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactiveManifest {
    pub format_version: u32,
    pub variables: Vec<VariableDescriptor>,
    pub bindings: Vec<ComponentBinding>,
    pub conditionals: Vec<ReactiveConditional>,
    pub loops: Vec<ReactiveForLoop>,
}

impl Default for ReactiveManifest {
    fn default() -> Self {
        Self::new()
    }
}

impl ReactiveManifest {
    pub fn new() -> Self {
        Self {
            format_version: MANIFEST_FORMAT_VERSION,
            variables: Vec::new(),
            bindings: Vec::new(),
            conditionals: Vec::new(),
            loops: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
            && self.bindings.is_empty()
            && self.conditionals.is_empty()
            && self.loops.is_empty()
    }

    /// Declare a variable. Ids are handed out in declaration order starting at 1.
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        value: VarValue,
        source_location: Option<String>,
    ) -> Result<VariableId, ManifestError> {
        let name = name.into();
        if self.variable_by_name(&name).is_some() {
            return Err(ManifestError::DuplicateName(name));
        }
        let next = self.variables.iter().map(|v| v.id.get()).max().unwrap_or(0) + 1;
        let id = VariableId(next);
        debug!("declared reactive variable {} = {:?} as {}", name, value, id);
        self.variables.push(VariableDescriptor {
            id,
            name,
            value,
            version: 0,
            source_location,
            binding_count: 0,
        });
        Ok(id)
    }

    pub fn variable(&self, id: VariableId) -> Option<&VariableDescriptor> {
        self.variables.iter().find(|v| v.id == id)
    }

    pub fn variable_by_name(&self, name: &str) -> Option<&VariableDescriptor> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Assign a new value. Returns whether the value changed; only a change bumps the version.
    pub fn set_value(&mut self, id: VariableId, value: VarValue) -> Result<bool, ManifestError> {
        let var = self
            .variables
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or(ManifestError::UnknownVariable(id))?;

        if var.var_type() != value.var_type() {
            return Err(ManifestError::TypeMismatch {
                id,
                expected: var.var_type(),
                found: value.var_type(),
            });
        }
        if var.value.same_as(&value) {
            return Ok(false);
        }
        var.value = value;
        var.version = var.version.wrapping_add(1);
        Ok(true)
    }

    pub fn add_binding(&mut self, binding: ComponentBinding) -> Result<(), ManifestError> {
        let var = self
            .variables
            .iter_mut()
            .find(|v| v.id == binding.variable_id)
            .ok_or(ManifestError::UnknownVariable(binding.variable_id))?;
        var.binding_count += 1;
        self.bindings.push(binding);
        Ok(())
    }

    pub fn add_conditional(&mut self, conditional: ReactiveConditional) {
        self.conditionals.push(conditional);
    }

    pub fn add_loop(&mut self, for_loop: ReactiveForLoop) {
        self.loops.push(for_loop);
    }

    pub fn bindings_for(&self, component: ComponentId) -> impl Iterator<Item = &ComponentBinding> {
        self.bindings
            .iter()
            .filter(move |b| b.component_id == component)
    }

    pub fn conditional_for(&self, component: ComponentId) -> Option<&ReactiveConditional> {
        self.conditionals.iter().find(|c| c.component_id == component)
    }

    pub fn loop_for(&self, parent: ComponentId) -> Option<&ReactiveForLoop> {
        self.loops.iter().find(|l| l.parent_id == parent)
    }

    /// Recompute every variable's binding count from the binding table.
    pub fn recount_bindings(&mut self) {
        for var in &mut self.variables {
            var.binding_count = self
                .bindings
                .iter()
                .filter(|b| b.variable_id == var.id)
                .count() as u32;
        }
    }

    /// Human-readable listing for tooling.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "manifest v{}: {} variables, {} bindings, {} conditionals, {} loops",
            self.format_version,
            self.variables.len(),
            self.bindings.len(),
            self.conditionals.len(),
            self.loops.len()
        );
        for var in &self.variables {
            let _ = writeln!(
                out,
                "  {} {}: {:?} = {} (v{}, {} bindings)",
                var.id,
                var.name,
                var.var_type(),
                var.value.display_string(),
                var.version,
                var.binding_count
            );
        }
        for binding in &self.bindings {
            let _ = writeln!(
                out,
                "  bind {} -> {} [{:?}] {}",
                binding.component_id,
                binding.variable_id,
                binding.kind,
                binding.expression.as_deref().unwrap_or("")
            );
        }
        for cond in &self.conditionals {
            let _ = writeln!(
                out,
                "  if {} on {} (last={}, suspended={})",
                cond.condition, cond.component_id, cond.last_result, cond.suspended
            );
        }
        for l in &self.loops {
            let _ = writeln!(
                out,
                "  for {} on {} ({} children)",
                l.collection_expr.as_deref().unwrap_or("?"),
                l.parent_id,
                l.children.len()
            );
        }
        out
    }
}
