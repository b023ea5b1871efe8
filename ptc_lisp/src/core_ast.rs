// Core AST: the analyzed program the evaluator walks.
// Special forms are explicit variants and every call head is resolved, so no
// unexpanded list survives analysis.

use crate::runtime::stdlib::Builtin;
use crate::runtime::values::Value;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum CoreNode {
    /// Literal constants (nil, booleans, numbers, strings, keywords).
    Const(Value),
    Vector(Vec<CoreNode>),
    Map(Vec<(CoreNode, CoreNode)>),
    Set(Vec<CoreNode>),

    /// Lexically bound name (let, fn params, def/defn).
    Local(String),
    /// Builtin resolved at analysis time.
    Builtin(&'static Builtin),
    /// Bare symbol with no lexical or builtin binding; resolved at runtime
    /// against the ctx/, data/ and memory/ maps.
    Global(String),
    /// `ctx/name` or `data/name` read.
    CtxGet { name: String },
    DataGet { name: String },
    /// `memory/name` read, or `(memory/get key)`.
    MemoryGet { key: Box<CoreNode> },
    MemoryPut { key: Box<CoreNode>, expr: Box<CoreNode> },
    /// `budget/remaining`
    BudgetQuery,

    Do(Vec<CoreNode>),
    /// Only valid as a direct child of `Do`; extends the scope of later siblings.
    Def {
        name: String,
        value: Box<CoreNode>,
    },
    Let {
        bindings: Vec<(Pattern, CoreNode)>,
        body: Box<CoreNode>,
    },
    If {
        cond: Box<CoreNode>,
        then: Box<CoreNode>,
        otherwise: Box<CoreNode>,
    },
    And(Vec<CoreNode>),
    Or(Vec<CoreNode>),
    Fn(Arc<FnDef>),
    Call {
        target: Box<CoreNode>,
        args: Vec<CoreNode>,
    },
    /// Tool invocation: `(tool/name ...)`, `(ctx/name ...)` or `(call "name" ...)`.
    CtxCall { name: String, args: Vec<CoreNode> },
    /// `(where field op value)` predicate builder.
    Where {
        path: Vec<Value>,
        op: WhereOp,
        operand: Option<Box<CoreNode>>,
    },
    /// `all-of` / `any-of` / `none-of` over predicate expressions.
    Combine {
        kind: Combinator,
        preds: Vec<CoreNode>,
    },
}

impl CoreNode {
    pub fn nil() -> CoreNode {
        CoreNode::Const(Value::Nil)
    }
}

/// A user function definition: the code half of a closure.
#[derive(Debug, Clone, PartialEq)]
pub struct FnDef {
    pub params: Vec<Pattern>,
    pub rest: Option<Pattern>,
    pub body: CoreNode,
    pub meta: FnMeta,
}

impl FnDef {
    pub fn arity_description(&self) -> String {
        if self.rest.is_some() {
            format!("at least {}", self.params.len())
        } else {
            self.params.len().to_string()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FnMeta {
    /// Name from `defn` (or a named `fn`); bound to the closure itself on call.
    pub name: Option<String>,
    pub docstring: Option<String>,
    pub return_type: Option<String>,
}

/// Binding patterns used by `let` and function parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Bind(String),
    Ignore,
    Seq {
        items: Vec<Pattern>,
        rest: Option<Box<Pattern>>,
        as_name: Option<String>,
    },
    Map {
        entries: Vec<(Pattern, Value)>,
        defaults: Vec<(String, CoreNode)>,
        as_name: Option<String>,
    },
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Bind(name) => f.write_str(name),
            Pattern::Ignore => f.write_str("_"),
            Pattern::Seq { items, rest, as_name } => {
                let mut parts: Vec<String> = items.iter().map(|p| p.to_string()).collect();
                if let Some(rest) = rest {
                    parts.push(format!("& {}", rest));
                }
                if let Some(name) = as_name {
                    parts.push(format!(":as {}", name));
                }
                write!(f, "[{}]", parts.join(" "))
            }
            Pattern::Map { entries, as_name, .. } => {
                let mut parts: Vec<String> = entries
                    .iter()
                    .map(|(p, key)| format!("{} {}", p, key))
                    .collect();
                if let Some(name) = as_name {
                    parts.push(format!(":as {}", name));
                }
                write!(f, "{{{}}}", parts.join(" "))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhereOp {
    Eq,
    NotEq,
    Gt,
    Lt,
    Gte,
    Lte,
    Includes,
    In,
    Truthy,
}

impl WhereOp {
    pub fn parse(symbol: &str) -> Option<WhereOp> {
        match symbol {
            "=" => Some(WhereOp::Eq),
            "not=" => Some(WhereOp::NotEq),
            ">" => Some(WhereOp::Gt),
            "<" => Some(WhereOp::Lt),
            ">=" => Some(WhereOp::Gte),
            "<=" => Some(WhereOp::Lte),
            "includes" => Some(WhereOp::Includes),
            "in" => Some(WhereOp::In),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WhereOp::Eq => "=",
            WhereOp::NotEq => "not=",
            WhereOp::Gt => ">",
            WhereOp::Lt => "<",
            WhereOp::Gte => ">=",
            WhereOp::Lte => "<=",
            WhereOp::Includes => "includes",
            WhereOp::In => "in",
            WhereOp::Truthy => "truthy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    AllOf,
    AnyOf,
    NoneOf,
}

impl Combinator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Combinator::AllOf => "all-of",
            Combinator::AnyOf => "any-of",
            Combinator::NoneOf => "none-of",
        }
    }
}
