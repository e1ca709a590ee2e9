//! Compile-time expression evaluation.
//!
//! Expressions are folded against a lexical [`Scope`]. Names bound to runtime `state`
//! variables still evaluate (to the variable's initial value) but are recorded as
//! dependencies, which is how the expander decides what becomes a reactive binding.

use crate::colors;
use crate::error::{CompileError, ExpandResult, LineIndex};
use crate::value::Value;
use kir_model::{Color, Dimension, DimensionKind, VariableId};
use kir_parser::ast::{BinaryOp, Expression, Span, TemplatePart, UnaryOp, Unit};
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Const(Value),
    /// Depends on runtime variables; `value` is the initial value.
    Reactive { value: Value, deps: Vec<VariableId> },
}

/// Stack of lexical frames. Inner frames shadow outer ones.
#[derive(Debug, Clone)]
pub struct Scope {
    frames: Vec<BTreeMap<String, Binding>>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    pub fn new() -> Self {
        Self {
            frames: vec![BTreeMap::new()],
        }
    }

    pub fn push(&mut self) {
        self.frames.push(BTreeMap::new());
    }

    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn define(&mut self, name: impl Into<String>, binding: Binding) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), binding);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }
}

/// Result of evaluating one expression
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluated {
    pub value: Value,
    /// Runtime variables read, in first-use order
    pub deps: Vec<VariableId>,
    /// Names with no binding in scope, in first-use order
    pub unresolved: Vec<String>,
}

impl Evaluated {
    pub fn is_reactive(&self) -> bool {
        !self.deps.is_empty()
    }

    /// Free of runtime variables and unresolved names
    pub fn is_static(&self) -> bool {
        self.deps.is_empty() && self.unresolved.is_empty()
    }

    /// First unresolved name that was folded into something other than a bare
    /// identifier, e.g. interpolated into a string. Bare identifiers are left for
    /// keyword-like properties to accept or reject.
    pub fn lost_reference(&self) -> Option<&str> {
        self.unresolved
            .iter()
            .find(|name| !self.value.has_symbol(name))
            .map(String::as_str)
    }

    pub fn into_binding(self) -> Binding {
        if self.deps.is_empty() {
            Binding::Const(self.value)
        } else {
            Binding::Reactive {
                value: self.value,
                deps: self.deps,
            }
        }
    }
}

pub fn evaluate(expr: &Expression, scope: &Scope, lines: &LineIndex) -> ExpandResult<Evaluated> {
    let mut evaluator = ExprEvaluator {
        scope,
        lines,
        deps: Vec::new(),
        unresolved: Vec::new(),
    };
    let value = evaluator.eval(expr)?;
    Ok(Evaluated {
        value,
        deps: evaluator.deps,
        unresolved: evaluator.unresolved,
    })
}

struct ExprEvaluator<'a> {
    scope: &'a Scope,
    lines: &'a LineIndex,
    deps: Vec<VariableId>,
    unresolved: Vec<String>,
}

impl ExprEvaluator<'_> {
    fn eval(&mut self, expr: &Expression) -> ExpandResult<Value> {
        match expr {
            Expression::Null { .. } => Ok(Value::Null),
            Expression::Literal { value, .. } => Ok(Value::String(value.clone())),
            Expression::Number { value, .. } => Ok(Value::Number(*value)),
            Expression::Boolean { value, .. } => Ok(Value::Bool(*value)),
            Expression::Dimension { value, unit, .. } => {
                let value = *value as f32;
                Ok(Value::Dimension(match unit {
                    Unit::Px => Dimension::px(value),
                    Unit::Percent => Dimension::percent(value),
                    Unit::Fr => Dimension::flex(value),
                }))
            }
            Expression::Color { hex, span } => colors::parse_hex(hex)
                .map(|rgba| Value::Color(Color::Solid(rgba)))
                .ok_or_else(|| self.error(*span, format!("invalid color '#{}'", hex))),
            Expression::Array { items, .. } => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<ExpandResult<Vec<_>>>()
                .map(Value::Array),
            Expression::Variable { name, .. } => Ok(self.lookup(name)),
            Expression::Member {
                object,
                property,
                span,
            } => {
                let object = self.eval(object)?;
                self.member(object, property, *span)
            }
            Expression::Unary {
                operator,
                operand,
                span,
            } => {
                let operand = self.eval(operand)?;
                match operator {
                    UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
                    UnaryOp::Negate => match operand {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        Value::Dimension(d) => Ok(Value::Dimension(Dimension {
                            kind: d.kind,
                            value: -d.value,
                        })),
                        other => Err(self.error(
                            *span,
                            format!("cannot negate {}", other.type_name()),
                        )),
                    },
                }
            }
            Expression::Binary {
                left,
                operator,
                right,
                span,
            } => {
                // Both sides are always evaluated so dependencies are complete
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                self.binary(left, *operator, right, *span)
            }
            Expression::Call {
                function,
                arguments,
                span,
            } => {
                let arguments = arguments
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<ExpandResult<Vec<_>>>()?;
                self.call(function, arguments, *span)
            }
            Expression::Template { parts, .. } => {
                let mut text = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Literal(literal) => text.push_str(literal),
                        TemplatePart::Expression(inner) => {
                            text.push_str(&self.eval(inner)?.display_string())
                        }
                    }
                }
                Ok(Value::String(text))
            }
        }
    }

    fn lookup(&mut self, name: &str) -> Value {
        match self.scope.lookup(name) {
            Some(Binding::Const(value)) => value.clone(),
            Some(Binding::Reactive { value, deps }) => {
                for dep in deps {
                    if !self.deps.contains(dep) {
                        self.deps.push(*dep);
                    }
                }
                value.clone()
            }
            None => {
                if !self.unresolved.iter().any(|n| n == name) {
                    self.unresolved.push(name.to_string());
                }
                Value::Symbol(name.to_string())
            }
        }
    }

    fn member(&self, object: Value, property: &str, span: Span) -> ExpandResult<Value> {
        match (object, property) {
            (Value::Object(mut fields), _) => Ok(fields.remove(property).unwrap_or(Value::Null)),
            (Value::Array(items), "length") => Ok(Value::Number(items.len() as f64)),
            (Value::String(s), "length") => Ok(Value::Number(s.chars().count() as f64)),
            (Value::Symbol(name), _) => Ok(Value::Symbol(format!("{}.{}", name, property))),
            (Value::Null, _) => Ok(Value::Null),
            (other, _) => Err(self.error(
                span,
                format!("cannot read '{}' of {}", property, other.type_name()),
            )),
        }
    }

    fn binary(&self, left: Value, op: BinaryOp, right: Value, span: Span) -> ExpandResult<Value> {
        match op {
            BinaryOp::And => Ok(if left.is_truthy() { right } else { left }),
            BinaryOp::Or => Ok(if left.is_truthy() { left } else { right }),
            BinaryOp::Equals => Ok(Value::Bool(values_equal(&left, &right))),
            BinaryOp::NotEquals => Ok(Value::Bool(!values_equal(&left, &right))),
            BinaryOp::LessThan
            | BinaryOp::LessThanOrEqual
            | BinaryOp::GreaterThan
            | BinaryOp::GreaterThanOrEqual => {
                let ordering = compare(&left, &right).ok_or_else(|| {
                    self.operand_error(op, &left, &right, span)
                })?;
                Ok(Value::Bool(match op {
                    BinaryOp::LessThan => ordering == Ordering::Less,
                    BinaryOp::LessThanOrEqual => ordering != Ordering::Greater,
                    BinaryOp::GreaterThan => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                }))
            }
            BinaryOp::Add
                if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) =>
            {
                Ok(Value::String(left.display_string() + &right.display_string()))
            }
            BinaryOp::Divide if right.as_number() == Some(0.0) => {
                Err(self.error(span, "division by zero"))
            }
            _ => arithmetic(op, &left, &right)
                .ok_or_else(|| self.operand_error(op, &left, &right, span)),
        }
    }

    fn call(&self, function: &str, arguments: Vec<Value>, span: Span) -> ExpandResult<Value> {
        let numbers: Option<Vec<f64>> = arguments.iter().map(Value::as_number).collect();
        let folded = match (function, numbers.as_deref()) {
            ("rgb", Some(&[r, g, b])) => Some(Color::Solid(colors::rgba(r, g, b, 1.0))),
            ("rgba", Some(&[r, g, b, a])) => Some(Color::Solid(colors::rgba(r, g, b, a))),
            ("var", Some(&[id])) if id >= 0.0 => Some(Color::Variable(id as u32)),
            ("gradient", Some(&[id])) if id >= 0.0 => Some(Color::Gradient(id as u32)),
            ("rgb" | "rgba" | "var" | "gradient", _) => {
                return Err(self.error(
                    span,
                    format!("{}() takes numeric arguments", function),
                ))
            }
            _ => None,
        };

        Ok(match folded {
            Some(color) => Value::Color(color),
            None => Value::Call {
                function: function.to_string(),
                arguments,
            },
        })
    }

    fn operand_error(&self, op: BinaryOp, left: &Value, right: &Value, span: Span) -> CompileError {
        self.error(
            span,
            format!(
                "invalid operands for '{}': {} and {}",
                op.symbol(),
                left.type_name(),
                right.type_name()
            ),
        )
    }

    /// Type errors caused by a missing name are reported as that name
    fn error(&self, span: Span, message: impl Into<String>) -> CompileError {
        let location = self.lines.locate(span.start);
        match self.unresolved.first() {
            Some(name) => CompileError::UnresolvedReference {
                name: name.clone(),
                location,
                hint: None,
            },
            None => CompileError::invalid_expression(message, location),
        }
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::String(a) | Value::Symbol(a), Value::String(b) | Value::Symbol(b)) => a == b,
        (a, b) => match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => left.as_number()?.partial_cmp(&right.as_number()?),
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Option<Value> {
    let apply = |a: f64, b: f64| match op {
        BinaryOp::Add => Some(a + b),
        BinaryOp::Subtract => Some(a - b),
        BinaryOp::Multiply => Some(a * b),
        BinaryOp::Divide => Some(a / b),
        _ => None,
    };

    match (left, right) {
        (Value::Number(a), Value::Number(b)) => apply(*a, *b).map(Value::Number),
        (Value::Dimension(d), Value::Number(n)) if d.kind != DimensionKind::Auto => {
            let value = apply(d.value as f64, *n)? as f32;
            Some(Value::Dimension(Dimension { kind: d.kind, value }))
        }
        (Value::Number(n), Value::Dimension(d))
            if d.kind != DimensionKind::Auto && matches!(op, BinaryOp::Add | BinaryOp::Multiply) =>
        {
            let value = apply(*n, d.value as f64)? as f32;
            Some(Value::Dimension(Dimension { kind: d.kind, value }))
        }
        (Value::Dimension(a), Value::Dimension(b))
            if a.kind == b.kind && matches!(op, BinaryOp::Add | BinaryOp::Subtract) =>
        {
            let value = apply(a.value as f64, b.value as f64)? as f32;
            Some(Value::Dimension(Dimension { kind: a.kind, value }))
        }
        _ => None,
    }
}
