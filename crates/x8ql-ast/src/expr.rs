//! Expression AST nodes

use serde::{Deserialize, Serialize};
use crate::{Ident, Span};

/// A boolean/comparison expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    /// Bare operand: `is_defined(str)`, `true`
    Operand(Operand),

    /// Parenthesized expression: `(a = 1 OR b = 2)`
    Paren(Box<Expr>),

    /// Comparison: `a = 1`, `score >= @min`
    Comparison {
        op: CompareOp,
        lhs: Operand,
        rhs: Operand,
    },

    /// Range test: `x BETWEEN 1 AND 10`
    Between {
        lhs: Operand,
        low: Operand,
        high: Operand,
    },

    /// Membership test: `x IN (1, 2)`, `x NOT IN (1, 2)`
    In {
        lhs: Operand,
        negated: bool,
        set: Vec<Operand>,
    },

    /// Negation: `NOT expr`
    Not(Box<Expr>),

    /// Conjunction: `lhs AND rhs`
    And {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// Disjunction: `lhs OR rhs`
    Or {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }
}

/// An atomic expression constituent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operand {
    pub kind: OperandKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OperandKind {
    Value(Value),
    Field(Field),
    Parameter(Parameter),
    Ref(Ref),
    Function(Function),
}

/// A literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    True,
    False,
    String(String),
    /// Signed integer literal, up to 128 bits
    Integer(i128),
    Decimal(f64),
    /// Embedded JSON object, carried opaquely
    Json(serde_json::Value),
    /// `[1, 'two', {"three": 3}]`
    Array(Vec<Value>),
}

/// A document field with an optional access path: `a.b[0].c[-]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: Ident,
    pub path: Vec<PathSegment>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PathSegment {
    /// `[0]`, `['key']`
    Index(Value),
    /// `[-]`: append a new element
    Append,
    /// `.member`
    Dot(Ident),
}

/// Function call: `contains(tags, 'x')`, `ns.vector_search(vector=@v)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub namespace: Option<Ident>,
    pub name: Ident,
    pub args: FunctionArgs,
    pub span: Span,
}

/// Positional and named arguments never mix within one call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FunctionArgs {
    None,
    Positional(Vec<Operand>),
    Named(Vec<NamedArg>),
}

impl FunctionArgs {
    pub fn len(&self) -> usize {
        match self {
            FunctionArgs::None => 0,
            FunctionArgs::Positional(args) => args.len(),
            FunctionArgs::Named(args) => args.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedArg {
    pub name: Ident,
    pub value: Operand,
    pub span: Span,
}

/// Cross-collection reference: `{{ns://collection.field}}`
///
/// Resolution happens at execution time; the parser only records the parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ref {
    pub namespace: Option<Ident>,
    pub collection: Ident,
    pub field: Field,
    pub span: Span,
}

/// Externally bound placeholder: `@name`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: Ident,
    pub span: Span,
}
