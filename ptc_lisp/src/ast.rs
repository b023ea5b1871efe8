// Raw syntax tree for PTC-Lisp
// Produced once by the parser, immutable afterwards. Carries no semantic knowledge:
// special forms are still plain lists until the analyzer rewrites them.

use std::fmt;

/// Namespaces a qualified symbol (`ns/name`) may refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Ctx,
    Memory,
    Data,
    Tool,
    Budget,
}

impl Namespace {
    pub const ALL: [Namespace; 5] = [
        Namespace::Ctx,
        Namespace::Memory,
        Namespace::Data,
        Namespace::Tool,
        Namespace::Budget,
    ];

    pub fn parse(prefix: &str) -> Option<Namespace> {
        match prefix {
            "ctx" => Some(Namespace::Ctx),
            "memory" => Some(Namespace::Memory),
            "data" => Some(Namespace::Data),
            "tool" => Some(Namespace::Tool),
            "budget" => Some(Namespace::Budget),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Ctx => "ctx",
            Namespace::Memory => "memory",
            Namespace::Data => "data",
            Namespace::Tool => "tool",
            Namespace::Budget => "budget",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawNode {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Keyword(String),
    Symbol(String),
    NsSymbol(Namespace, String),
    Vector(Vec<RawNode>),
    Map(Vec<(RawNode, RawNode)>),
    Set(Vec<RawNode>),
    /// A call or special form before expansion.
    List(Vec<RawNode>),
    /// `#(...)` shorthand; the elements form the body call.
    ShortFn(Vec<RawNode>),
}

impl RawNode {
    pub fn symbol(name: &str) -> RawNode {
        RawNode::Symbol(name.to_string())
    }

    /// Name of the head symbol when this node is a list like `(head ...)`.
    pub fn head_symbol(&self) -> Option<&str> {
        match self {
            RawNode::List(items) => match items.first() {
                Some(RawNode::Symbol(name)) => Some(name.as_str()),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            RawNode::Symbol(name) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Short human description used in analyzer error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RawNode::Nil => "nil",
            RawNode::Bool(_) => "boolean",
            RawNode::Int(_) => "integer",
            RawNode::Float(_) => "float",
            RawNode::Str(_) => "string",
            RawNode::Keyword(_) => "keyword",
            RawNode::Symbol(_) => "symbol",
            RawNode::NsSymbol(_, _) => "namespaced symbol",
            RawNode::Vector(_) => "vector",
            RawNode::Map(_) => "map",
            RawNode::Set(_) => "set",
            RawNode::List(_) => "list",
            RawNode::ShortFn(_) => "anonymous function",
        }
    }
}

/// Render a float so that it reads back as a float (`1.0`, not `1`).
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{:?}", value)
    }
}

pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

fn write_seq(f: &mut fmt::Formatter<'_>, open: &str, items: &[RawNode], close: &str) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{}", item)?;
    }
    f.write_str(close)
}

/// Formats the node back into PTC-Lisp source. `parse(node.to_string())`
/// yields a structurally equivalent node.
impl fmt::Display for RawNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawNode::Nil => f.write_str("nil"),
            RawNode::Bool(b) => write!(f, "{}", b),
            RawNode::Int(i) => write!(f, "{}", i),
            RawNode::Float(x) => f.write_str(&format_float(*x)),
            RawNode::Str(s) => write!(f, "\"{}\"", escape_string(s)),
            RawNode::Keyword(k) => write!(f, ":{}", k),
            RawNode::Symbol(s) => f.write_str(s),
            RawNode::NsSymbol(ns, name) => write!(f, "{}/{}", ns, name),
            RawNode::Vector(items) => write_seq(f, "[", items, "]"),
            RawNode::List(items) => write_seq(f, "(", items, ")"),
            RawNode::Set(items) => write_seq(f, "#{", items, "}"),
            RawNode::ShortFn(items) => write_seq(f, "#(", items, ")"),
            RawNode::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{} {}", k, v)?;
                }
                f.write_str("}")
            }
        }
    }
}
