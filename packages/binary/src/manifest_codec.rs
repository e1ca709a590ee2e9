//! Byte form of the [`ReactiveManifest`], stored after the tree when header flag bit 0 is set.

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::ReadResult;
use kir_model::{
    BindingKind, ComponentBinding, ComponentId, ReactiveConditional, ReactiveForLoop,
    ReactiveManifest, ResourceLimitExceeded, Tagged, VarType, VarValue, VariableDescriptor,
    VariableId, WarningCode,
};
use tracing::debug;

// Smallest encoded entry of each table, used to reject impossible counts up front.
const MIN_VARIABLE_SIZE: usize = 4 + 4 + 1 + 1 + 4 + 4 + 4;
const MIN_BINDING_SIZE: usize = 4 + 4 + 1 + 4 + 4;
const MIN_CONDITIONAL_SIZE: usize = 4 + 4 + 1 + 1 + 4;
const MIN_LOOP_SIZE: usize = 4 + 4 + 4 + 4 + 4;

pub(crate) fn encode(enc: &mut Encoder, manifest: &ReactiveManifest) -> Result<(), ResourceLimitExceeded> {
    enc.put_u32(manifest.format_version);
    enc.put_u32(manifest.variables.len() as u32);
    enc.put_u32(manifest.bindings.len() as u32);
    enc.put_u32(manifest.conditionals.len() as u32);
    enc.put_u32(manifest.loops.len() as u32);

    for var in &manifest.variables {
        enc.put_u32(var.id.get());
        enc.put_str(&var.name)?;
        enc.put_tag(var.var_type());
        match &var.value {
            VarValue::Int(v) => enc.put_i64(*v),
            VarValue::Float(v) => enc.put_f64(*v),
            VarValue::String(v) | VarValue::Opaque(v) => enc.put_str(v)?,
            VarValue::Bool(v) => enc.put_bool(*v),
        }
        enc.put_u32(var.version);
        enc.put_string(var.source_location.as_deref())?;
        enc.put_u32(var.binding_count);
    }

    for binding in &manifest.bindings {
        enc.put_u32(binding.component_id.get());
        enc.put_u32(binding.variable_id.get());
        enc.put_tag(binding.kind);
        enc.put_string(binding.expression.as_deref())?;
        enc.put_string(binding.update_code.as_deref())?;
    }

    for cond in &manifest.conditionals {
        enc.put_u32(cond.component_id.get());
        enc.put_str(&cond.condition)?;
        enc.put_bool(cond.last_result);
        enc.put_bool(cond.suspended);
        enc.put_u32(cond.dependencies.len() as u32);
        for dep in &cond.dependencies {
            enc.put_u32(dep.get());
        }
    }

    for for_loop in &manifest.loops {
        enc.put_u32(for_loop.parent_id.get());
        enc.put_string(for_loop.collection_expr.as_deref())?;
        // 0 is never a valid variable id
        enc.put_u32(for_loop.collection_var.map_or(0, VariableId::get));
        enc.put_string(for_loop.item_template.as_deref())?;
        enc.put_u32(for_loop.children.len() as u32);
        for child in &for_loop.children {
            enc.put_u32(child.get());
        }
    }

    Ok(())
}

pub(crate) fn decode(dec: &mut Decoder<'_>) -> ReadResult<ReactiveManifest> {
    dec.set_component(None);
    let format_version = dec.get_u32()?;
    let var_count = dec.get_u32()? as usize;
    let binding_count = dec.get_u32()? as usize;
    let conditional_count = dec.get_u32()? as usize;
    let loop_count = dec.get_u32()? as usize;

    let needed = var_count
        .saturating_mul(MIN_VARIABLE_SIZE)
        .saturating_add(binding_count.saturating_mul(MIN_BINDING_SIZE))
        .saturating_add(conditional_count.saturating_mul(MIN_CONDITIONAL_SIZE))
        .saturating_add(loop_count.saturating_mul(MIN_LOOP_SIZE));
    if needed > dec.remaining() {
        return Err(dec
            .invalid(format!(
                "manifest declares {} variables, {} bindings, {} conditionals and {} loops, \
                 which cannot fit in {} bytes",
                var_count,
                binding_count,
                conditional_count,
                loop_count,
                dec.remaining()
            ))
            .into());
    }

    let mut manifest = ReactiveManifest {
        format_version,
        ..ReactiveManifest::new()
    };

    for _ in 0..var_count {
        manifest.variables.push(decode_variable(dec)?);
    }

    for _ in 0..binding_count {
        let component_id = ComponentId(dec.get_u32()?);
        let variable_id = VariableId(dec.get_u32()?);
        let tag = dec.get_u8()?;
        let expression = dec.get_string("binding expression")?;
        let update_code = dec.get_string("binding update code")?;
        match BindingKind::from_tag(tag) {
            Some(kind) => manifest.bindings.push(ComponentBinding {
                component_id,
                variable_id,
                kind,
                expression,
                update_code,
            }),
            None => dec.warn(
                WarningCode::DroppedEntry,
                format!(
                    "dropped binding of {} to {} with unknown kind {}",
                    component_id, variable_id, tag
                ),
            ),
        }
    }

    for _ in 0..conditional_count {
        let component_id = ComponentId(dec.get_u32()?);
        let condition = dec.get_required_string("condition")?;
        let last_result = dec.get_bool()?;
        let suspended = dec.get_bool()?;
        let dependencies = (0..dec.get_count("conditional dependencies", 4)?)
            .map(|_| dec.get_u32().map(VariableId))
            .collect::<ReadResult<Vec<_>>>()?;
        manifest.conditionals.push(ReactiveConditional {
            component_id,
            condition,
            last_result,
            suspended,
            dependencies,
        });
    }

    for _ in 0..loop_count {
        let parent_id = ComponentId(dec.get_u32()?);
        let collection_expr = dec.get_string("loop collection")?;
        let collection_var = Some(dec.get_u32()?)
            .filter(|id| *id != 0)
            .map(VariableId);
        let item_template = dec.get_string("loop item template")?;
        let children = (0..dec.get_count("loop children", 4)?)
            .map(|_| dec.get_u32().map(ComponentId))
            .collect::<ReadResult<Vec<_>>>()?;
        manifest.loops.push(ReactiveForLoop {
            parent_id,
            collection_expr,
            collection_var,
            item_template,
            children,
        });
    }

    debug!(
        "decoded manifest: {} variables, {} bindings",
        manifest.variables.len(),
        manifest.bindings.len()
    );
    Ok(manifest)
}

fn decode_variable(dec: &mut Decoder<'_>) -> ReadResult<VariableDescriptor> {
    let id = VariableId(dec.get_u32()?);
    let name = dec.get_required_string("variable name")?;
    let tag = dec.get_u8()?;
    // The value encoding depends on the type, so an unknown type cannot be skipped.
    let Some(var_type) = VarType::from_tag(tag) else {
        return Err(dec
            .invalid(format!("variable '{}' has unknown type tag {}", name, tag))
            .into());
    };
    let value = match var_type {
        VarType::Int => VarValue::Int(dec.get_i64()?),
        VarType::Float => VarValue::Float(dec.get_f64()?),
        VarType::String => VarValue::String(dec.get_required_string("variable value")?),
        VarType::Bool => VarValue::Bool(dec.get_bool()?),
        VarType::Opaque => VarValue::Opaque(dec.get_required_string("variable value")?),
    };
    Ok(VariableDescriptor {
        id,
        name,
        value,
        version: dec.get_u32()?,
        source_location: dec.get_string("source location")?,
        binding_count: dec.get_u32()?,
    })
}
