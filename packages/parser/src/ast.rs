use serde::{Deserialize, Serialize};
use std::fmt;

/// Byte range in the source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Span covering both `self` and `other`
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn range(self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// Root document node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    pub consts: Vec<ConstDecl>,
    pub components: Vec<ComponentDef>,
    /// Top-level element instances. Normally exactly one.
    pub roots: Vec<Element>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn component(&self, name: &str) -> Option<&ComponentDef> {
        self.components.iter().find(|c| c.name == name)
    }
}

/// `const name = value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstDecl {
    pub name: String,
    pub value: Expression,
    pub span: Span,
}

/// Component parameter with optional default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub default: Option<Expression>,
    pub span: Span,
}

/// `component Name(params) extends Base { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDef {
    pub name: String,
    pub params: Vec<Param>,
    pub extends: Option<String>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    pub items: Vec<Item>,
    pub span: Span,
}

impl Block {
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.items.iter().filter_map(|item| match item {
            Item::Property(p) => Some(p),
            _ => None,
        })
    }

    pub fn states(&self) -> impl Iterator<Item = &StateDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::State(s) => Some(s),
            _ => None,
        })
    }
}

/// Anything that can appear inside braces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Item {
    Property(Property),
    State(StateDecl),
    Element(Element),
    If(IfBlock),
    For(ForBlock),
    Slot(SlotDecl),
    Insert(Insert),
    Pseudo(PseudoBlock),
    Breakpoint(BreakpointBlock),
}

/// `name = value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: Expression,
    pub span: Span,
}

/// `state name: type = initial`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDecl {
    pub name: String,
    pub type_name: Option<String>,
    pub value: Expression,
    pub span: Span,
}

/// Element or component instance: `Name(args) { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    pub args: Vec<Property>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfBlock {
    /// `static if` is resolved at compile time; plain `if` stays reactive
    pub is_static: bool,
    pub condition: Expression,
    pub then_block: Block,
    pub else_block: Option<Block>,
    /// Raw source of each branch, kept for runtime re-expansion
    pub then_template: String,
    pub else_template: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForBlock {
    pub is_static: bool,
    pub item: String,
    pub collection: Expression,
    pub body: Block,
    /// Raw source of the body, kept for runtime re-expansion
    pub template: String,
    pub span: Span,
}

/// `slot` or `slot name { fallback }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotDecl {
    pub name: Option<String>,
    pub fallback: Option<Block>,
    pub span: Span,
}

/// `insert name { ... }` inside a component instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insert {
    pub slot: String,
    pub body: Block,
    pub span: Span,
}

/// `@hover { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PseudoBlock {
    pub state: String,
    pub properties: Vec<Property>,
    pub span: Span,
}

/// `@breakpoint(min, max) { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakpointBlock {
    pub min: Expression,
    pub max: Expression,
    pub properties: Vec<Property>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    Px,
    Percent,
    Fr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Null { span: Span },

    /// String literal without interpolation
    Literal { value: String, span: Span },

    Number { value: f64, span: Span },

    /// Number with a unit (`10px`, `50%`, `1fr`)
    Dimension { value: f64, unit: Unit, span: Span },

    /// Hex color without the leading `#`
    Color { hex: String, span: Span },

    Boolean { value: bool, span: Span },

    Array { items: Vec<Expression>, span: Span },

    /// Variable reference
    Variable { name: String, span: Span },

    /// Member access (obj.prop)
    Member {
        object: Box<Expression>,
        property: String,
        span: Span,
    },

    Unary {
        operator: UnaryOp,
        operand: Box<Expression>,
        span: Span,
    },

    /// Binary operation (a + b)
    Binary {
        left: Box<Expression>,
        operator: BinaryOp,
        right: Box<Expression>,
        span: Span,
    },

    /// Function call
    Call {
        function: String,
        arguments: Vec<Expression>,
        span: Span,
    },

    /// String with `{expr}` interpolation
    Template {
        parts: Vec<TemplatePart>,
        span: Span,
    },
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::Null { span }
            | Expression::Literal { span, .. }
            | Expression::Number { span, .. }
            | Expression::Dimension { span, .. }
            | Expression::Color { span, .. }
            | Expression::Boolean { span, .. }
            | Expression::Array { span, .. }
            | Expression::Variable { span, .. }
            | Expression::Member { span, .. }
            | Expression::Unary { span, .. }
            | Expression::Binary { span, .. }
            | Expression::Call { span, .. }
            | Expression::Template { span, .. } => *span,
        }
    }

    /// Every variable name referenced, in first-occurrence order
    pub fn free_variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expression::Variable { name, .. } => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Expression::Member { object, .. } => object.collect_variables(names),
            Expression::Unary { operand, .. } => operand.collect_variables(names),
            Expression::Binary { left, right, .. } => {
                left.collect_variables(names);
                right.collect_variables(names);
            }
            Expression::Call { arguments, .. } => {
                for arg in arguments {
                    arg.collect_variables(names);
                }
            }
            Expression::Array { items, .. } => {
                for item in items {
                    item.collect_variables(names);
                }
            }
            Expression::Template { parts, .. } => {
                for part in parts {
                    if let TemplatePart::Expression(expr) = part {
                        expr.collect_variables(names);
                    }
                }
            }
            Expression::Null { .. }
            | Expression::Literal { .. }
            | Expression::Number { .. }
            | Expression::Dimension { .. }
            | Expression::Color { .. }
            | Expression::Boolean { .. } => {}
        }
    }
}

/// Renders the expression back to source form
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Null { .. } => f.write_str("null"),
            Expression::Literal { value, .. } => write!(f, "{:?}", value),
            Expression::Number { value, .. } => write!(f, "{}", value),
            Expression::Dimension { value, unit, .. } => {
                let suffix = match unit {
                    Unit::Px => "px",
                    Unit::Percent => "%",
                    Unit::Fr => "fr",
                };
                write!(f, "{}{}", value, suffix)
            }
            Expression::Color { hex, .. } => write!(f, "#{}", hex),
            Expression::Boolean { value, .. } => write!(f, "{}", value),
            Expression::Array { items, .. } => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Expression::Variable { name, .. } => f.write_str(name),
            Expression::Member { object, property, .. } => write!(f, "{}.{}", object, property),
            Expression::Unary { operator, operand, .. } => {
                let symbol = match operator {
                    UnaryOp::Not => "!",
                    UnaryOp::Negate => "-",
                };
                if matches!(**operand, Expression::Binary { .. }) {
                    write!(f, "{}({})", symbol, operand)
                } else {
                    write!(f, "{}{}", symbol, operand)
                }
            }
            Expression::Binary {
                left,
                operator,
                right,
                ..
            } => {
                let wrap = |e: &Expression| matches!(e, Expression::Binary { .. });
                if wrap(left) {
                    write!(f, "({})", left)?;
                } else {
                    write!(f, "{}", left)?;
                }
                write!(f, " {} ", operator.symbol())?;
                if wrap(right) {
                    write!(f, "({})", right)
                } else {
                    write!(f, "{}", right)
                }
            }
            Expression::Call {
                function,
                arguments,
                ..
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
            Expression::Template { parts, .. } => {
                f.write_str("\"")?;
                for part in parts {
                    match part {
                        TemplatePart::Literal(text) => {
                            for ch in text.chars() {
                                match ch {
                                    '"' | '\\' | '{' | '}' => write!(f, "\\{}", ch)?,
                                    '\n' => f.write_str("\\n")?,
                                    other => write!(f, "{}", other)?,
                                }
                            }
                        }
                        TemplatePart::Expression(expr) => write!(f, "{{{}}}", expr)?,
                    }
                }
                f.write_str("\"")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Negate,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Equals => "==",
            BinaryOp::NotEquals => "!=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

/// Template string parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemplatePart {
    Literal(String),
    Expression(Expression),
}
