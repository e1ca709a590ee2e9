use kir_model::{Color, Dimension, DimensionKind, VarType, VarValue};
use serde_json::{Map, Number as JsonNumber, Value as Json};
use std::collections::BTreeMap;
use std::fmt;

/// Compile-time value of an expression
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// Bare identifier with no binding in scope, e.g. `center` or `red`.
    /// Only keyword-like properties accept it.
    Symbol(String),
    Color(Color),
    Dimension(Dimension),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
    /// Call of a function the evaluator does not fold, e.g. `blur(4)`.
    /// Property mapping interprets these.
    Call {
        function: String,
        arguments: Vec<Value>,
    },
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Symbol(_) => "identifier",
            Value::Color(_) => "color",
            Value::Dimension(_) => "dimension",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Call { .. } => "call",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            _ => true,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Dimension(d) if d.kind == DimensionKind::Px => Some(d.value as f64),
            _ => None,
        }
    }

    /// String or bare identifier
    pub fn as_word(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Does the bare identifier `name` survive somewhere inside this value?
    pub fn has_symbol(&self, name: &str) -> bool {
        match self {
            Value::Symbol(symbol) => symbol == name,
            Value::Array(items) => items.iter().any(|item| item.has_symbol(name)),
            Value::Object(fields) => fields.values().any(|v| v.has_symbol(name)),
            Value::Call { arguments, .. } => arguments.iter().any(|arg| arg.has_symbol(name)),
            _ => false,
        }
    }

    /// Text used when the value is interpolated or assigned to `text`
    pub fn display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::String(s) | Value::Symbol(s) => s.clone(),
            other => other.to_string(),
        }
    }

    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) | Value::Symbol(s) => Json::String(s.clone()),
            Value::Color(_) | Value::Dimension(_) | Value::Call { .. } => {
                Json::String(self.to_string())
            }
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(fields) => Json::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, Json>>(),
            ),
        }
    }

    pub fn from_json(json: &Json) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => Value::Array(items.iter().map(Value::from_json).collect()),
            Json::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Initial value of a `state` declaration. `type_name` is the optional annotation.
    pub fn to_var_value(&self, type_name: Option<&str>) -> Result<VarValue, String> {
        let declared = match type_name {
            None => None,
            Some("int") => Some(VarType::Int),
            Some("float") => Some(VarType::Float),
            Some("string") => Some(VarType::String),
            Some("bool") => Some(VarType::Bool),
            Some("json" | "array" | "object") => Some(VarType::Opaque),
            Some(other) => return Err(format!("unknown state type '{}'", other)),
        };

        let value = match (declared, self) {
            (Some(VarType::Int) | None, Value::Number(n)) if n.fract() == 0.0 && n.abs() < 9.0e15 => {
                VarValue::Int(*n as i64)
            }
            (Some(VarType::Float) | None, Value::Number(n)) => VarValue::Float(*n),
            (Some(VarType::String) | None, Value::String(s)) => VarValue::String(s.clone()),
            (Some(VarType::Bool) | None, Value::Bool(b)) => VarValue::Bool(*b),
            (Some(VarType::Opaque) | None, value) => VarValue::Opaque(value.to_json().to_string()),
            (Some(expected), found) => {
                return Err(format!(
                    "expected {:?} initial value, found {}",
                    expected,
                    found.type_name()
                ))
            }
        };
        Ok(value)
    }

    pub fn from_var_value(value: &VarValue) -> Value {
        match value {
            VarValue::Int(i) => Value::Number(*i as f64),
            VarValue::Float(f) => Value::Number(*f),
            VarValue::String(s) => Value::String(s.clone()),
            VarValue::Bool(b) => Value::Bool(*b),
            VarValue::Opaque(json) => serde_json::from_str::<Json>(json)
                .map(|parsed| Value::from_json(&parsed))
                .unwrap_or_else(|_| Value::String(json.clone())),
        }
    }
}

fn number_to_json(n: f64) -> Json {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Json::Number(JsonNumber::from(n as i64))
    } else {
        JsonNumber::from_f64(n).map(Json::Number).unwrap_or(Json::Null)
    }
}

fn fmt_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => fmt_number(f, *n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Symbol(s) => f.write_str(s),
            Value::Color(color) => match color {
                Color::Transparent => f.write_str("transparent"),
                Color::Solid(c) => write!(f, "#{:02x}{:02x}{:02x}{:02x}", c.r, c.g, c.b, c.a),
                Color::Gradient(id) => write!(f, "gradient({})", id),
                Color::Variable(id) => write!(f, "var({})", id),
            },
            Value::Dimension(d) => {
                let suffix = match d.kind {
                    DimensionKind::Auto => return f.write_str("auto"),
                    DimensionKind::Px => "px",
                    DimensionKind::Percent => "%",
                    DimensionKind::Flex => "fr",
                };
                fmt_number(f, d.value as f64)?;
                f.write_str(suffix)
            }
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Object(fields) => {
                f.write_str("{")?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str("}")
            }
            Value::Call {
                function,
                arguments,
            } => {
                write!(f, "{}(", function)?;
                for (i, arg) in arguments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}
