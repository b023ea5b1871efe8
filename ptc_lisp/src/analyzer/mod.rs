//! Analyzer: raw syntax tree to core AST.
//!
//! Expands special forms and threading macros, resolves namespace prefixes
//! and call heads, and rejects structurally invalid programs before anything
//! runs.

use crate::ast::{Namespace, RawNode};
use crate::core_ast::{CoreNode, Pattern};
use crate::error_reporting::did_you_mean;
use crate::parser::MAX_NESTING_DEPTH;
use crate::runtime::stdlib;
use crate::runtime::values::Value;
use thiserror::Error;

mod expander;
mod special_forms;

pub use expander::expand_threading;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyzeError {
    #[error("unknown function '{name}'{hint} (available functions: {available})")]
    UnknownFunction {
        name: String,
        hint: String,
        available: String,
    },

    #[error("invalid {form} form: {message}")]
    InvalidForm { form: String, message: String },

    #[error("invalid binding pattern: {0}")]
    InvalidPattern(String),

    #[error("'{0}' is only allowed at the top level or directly inside a do, let or fn body")]
    MisplacedDefinition(String),

    #[error("cannot call a {0} value")]
    NotCallable(String),

    #[error("'{0}' is a special form and cannot be used as a value")]
    SpecialFormAsValue(String),

    #[error("expression nests deeper than {0} levels once threading forms are expanded")]
    TooDeep(usize),
}

pub type AnalyzeResult<T> = Result<T, AnalyzeError>;

pub(crate) fn invalid(form: &str, message: impl Into<String>) -> AnalyzeError {
    AnalyzeError::InvalidForm {
        form: form.to_string(),
        message: message.into(),
    }
}

pub const SPECIAL_FORMS: &[&str] = &[
    "do", "if", "if-not", "when", "when-not", "if-let", "when-let", "cond", "let", "fn", "defn",
    "def", "and", "or", "->", "->>", "where", "all-of", "any-of", "none-of", "call",
];

/// Bound on nesting after `->`/`->>` expansion. The parser already caps the
/// source at [`MAX_NESTING_DEPTH`]; expansion may add up to that many levels
/// per threading form.
pub const MAX_EXPANDED_DEPTH: usize = 4 * MAX_NESTING_DEPTH;

pub fn is_special_form(name: &str) -> bool {
    SPECIAL_FORMS.contains(&name)
}

/// Analyzes a whole program. The root is in body position, so it may be a
/// `def`/`defn` or a `do` containing them.
pub fn analyze(node: &RawNode) -> AnalyzeResult<CoreNode> {
    let mut analyzer = Analyzer::new();
    let body = analyzer.analyze_body(std::slice::from_ref(node))?;
    Ok(body_node(body))
}

/// Collapses an analyzed body into one node. A lone definition keeps its `Do`
/// wrapper so it still evaluates to the defined value.
pub(crate) fn body_node(mut body: Vec<CoreNode>) -> CoreNode {
    match body.len() {
        0 => CoreNode::nil(),
        1 if !matches!(body[0], CoreNode::Def { .. }) => body.remove(0),
        _ => CoreNode::Do(body),
    }
}

/// Lexical scope tracking during analysis.
pub struct Analyzer {
    scope: Vec<String>,
    depth: usize,
}

impl Default for Analyzer {
    fn default() -> Self {
        Analyzer::new()
    }
}

impl Analyzer {
    pub fn new() -> Self {
        Analyzer {
            scope: Vec::new(),
            depth: 0,
        }
    }

    pub(crate) fn in_scope(&self, name: &str) -> bool {
        self.scope.iter().rev().any(|n| n == name)
    }

    pub(crate) fn push_names(&mut self, names: impl IntoIterator<Item = String>) {
        self.scope.extend(names);
    }

    pub(crate) fn scope_mark(&self) -> usize {
        self.scope.len()
    }

    pub(crate) fn restore_scope(&mut self, mark: usize) {
        self.scope.truncate(mark);
    }

    /// Forms in body position: definitions are allowed and extend the scope of
    /// the forms after them. The caller restores the scope.
    pub(crate) fn analyze_body(&mut self, forms: &[RawNode]) -> AnalyzeResult<Vec<CoreNode>> {
        let mut out = Vec::with_capacity(forms.len());
        for form in forms {
            match form.head_symbol() {
                Some(head @ ("def" | "defn")) if !self.in_scope(head) => {
                    let items = list_items(form);
                    let (name, node) = if head == "def" {
                        self.analyze_def(&items[1..])?
                    } else {
                        self.analyze_defn(&items[1..])?
                    };
                    self.push_names([name.clone()]);
                    out.push(CoreNode::Def {
                        name,
                        value: Box::new(node),
                    });
                }
                Some("do") if !self.in_scope("do") => {
                    // a nested do shares the enclosing body's scope
                    let items = list_items(form);
                    let mark = self.scope_mark();
                    let inner = self.analyze_body(&items[1..])?;
                    self.restore_scope(mark);
                    out.push(CoreNode::Do(inner));
                }
                _ => out.push(self.analyze_expr(form)?),
            }
        }
        Ok(out)
    }

    pub fn analyze_expr(&mut self, node: &RawNode) -> AnalyzeResult<CoreNode> {
        if self.depth >= MAX_EXPANDED_DEPTH {
            return Err(AnalyzeError::TooDeep(MAX_EXPANDED_DEPTH));
        }
        self.depth += 1;
        let result = self.analyze_node(node);
        self.depth -= 1;
        result
    }

    fn analyze_node(&mut self, node: &RawNode) -> AnalyzeResult<CoreNode> {
        match node {
            RawNode::Nil => Ok(CoreNode::nil()),
            RawNode::Bool(b) => Ok(CoreNode::Const(Value::Boolean(*b))),
            RawNode::Int(i) => Ok(CoreNode::Const(Value::Integer(*i))),
            RawNode::Float(x) => Ok(CoreNode::Const(Value::Float(*x))),
            RawNode::Str(s) => Ok(CoreNode::Const(Value::string(s.as_str()))),
            RawNode::Keyword(k) => Ok(CoreNode::Const(Value::keyword(k))),
            RawNode::Symbol(name) => self.resolve_symbol(name),
            RawNode::NsSymbol(ns, name) => self.resolve_namespaced(*ns, name),
            RawNode::Vector(items) => Ok(CoreNode::Vector(self.analyze_all(items)?)),
            RawNode::Set(items) => Ok(CoreNode::Set(self.analyze_all(items)?)),
            RawNode::Map(entries) => {
                let mut pairs = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    pairs.push((self.analyze_expr(k)?, self.analyze_expr(v)?));
                }
                Ok(CoreNode::Map(pairs))
            }
            RawNode::ShortFn(items) => self.analyze_short_fn(items),
            RawNode::List(items) if items.is_empty() => Ok(CoreNode::Const(Value::empty_vector())),
            RawNode::List(items) => self.analyze_list(items),
        }
    }

    pub(crate) fn analyze_all(&mut self, nodes: &[RawNode]) -> AnalyzeResult<Vec<CoreNode>> {
        nodes.iter().map(|n| self.analyze_expr(n)).collect()
    }

    fn resolve_symbol(&self, name: &str) -> AnalyzeResult<CoreNode> {
        if self.in_scope(name) {
            return Ok(CoreNode::Local(name.to_string()));
        }
        if let Some(builtin) = stdlib::builtin(name) {
            return Ok(CoreNode::Builtin(builtin));
        }
        if is_special_form(name) {
            return Err(AnalyzeError::SpecialFormAsValue(name.to_string()));
        }
        Ok(CoreNode::Global(name.to_string()))
    }

    fn resolve_namespaced(&self, ns: Namespace, name: &str) -> AnalyzeResult<CoreNode> {
        match ns {
            Namespace::Ctx => Ok(CoreNode::CtxGet {
                name: name.to_string(),
            }),
            Namespace::Data => Ok(CoreNode::DataGet {
                name: name.to_string(),
            }),
            Namespace::Memory => Ok(CoreNode::MemoryGet {
                key: Box::new(CoreNode::Const(Value::keyword(name))),
            }),
            Namespace::Budget if name == "remaining" => Ok(CoreNode::BudgetQuery),
            Namespace::Budget => Err(invalid(
                "budget",
                format!("unknown budget query 'budget/{}'; only budget/remaining exists", name),
            )),
            Namespace::Tool => Err(invalid(
                "tool",
                format!("'tool/{}' must be called, e.g. (tool/{} {{...}})", name, name),
            )),
        }
    }

    fn analyze_list(&mut self, items: &[RawNode]) -> AnalyzeResult<CoreNode> {
        let head = &items[0];
        let args = &items[1..];
        match head {
            RawNode::Symbol(name) if !self.in_scope(name) && is_special_form(name) => {
                self.analyze_special_form(name, args)
            }
            RawNode::Symbol(name) => {
                let target = if self.in_scope(name) {
                    CoreNode::Local(name.clone())
                } else if let Some(builtin) = stdlib::builtin(name) {
                    CoreNode::Builtin(builtin)
                } else {
                    return Err(self.unknown_function(name));
                };
                Ok(CoreNode::Call {
                    target: Box::new(target),
                    args: self.analyze_all(args)?,
                })
            }
            RawNode::NsSymbol(ns, name) => self.analyze_namespaced_call(*ns, name, args),
            RawNode::Keyword(k) => {
                if args.is_empty() || args.len() > 2 {
                    return Err(invalid(
                        "keyword lookup",
                        format!("(:{} map) takes 1 or 2 arguments, got {}", k, args.len()),
                    ));
                }
                Ok(CoreNode::Call {
                    target: Box::new(CoreNode::Const(Value::keyword(k))),
                    args: self.analyze_all(args)?,
                })
            }
            RawNode::List(_)
            | RawNode::ShortFn(_)
            | RawNode::Map(_)
            | RawNode::Set(_)
            | RawNode::Vector(_) => Ok(CoreNode::Call {
                target: Box::new(self.analyze_expr(head)?),
                args: self.analyze_all(args)?,
            }),
            other => Err(AnalyzeError::NotCallable(other.kind().to_string())),
        }
    }

    fn analyze_namespaced_call(
        &mut self,
        ns: Namespace,
        name: &str,
        args: &[RawNode],
    ) -> AnalyzeResult<CoreNode> {
        match (ns, name) {
            (Namespace::Tool, _) | (Namespace::Ctx, _) => Ok(CoreNode::CtxCall {
                name: name.to_string(),
                args: self.analyze_all(args)?,
            }),
            (Namespace::Memory, "put") => match args {
                [key, expr] => Ok(CoreNode::MemoryPut {
                    key: Box::new(self.analyze_expr(key)?),
                    expr: Box::new(self.analyze_expr(expr)?),
                }),
                _ => Err(invalid(
                    "memory/put",
                    format!("expected (memory/put key value), got {} argument(s)", args.len()),
                )),
            },
            (Namespace::Memory, "get") => match args {
                [key] => Ok(CoreNode::MemoryGet {
                    key: Box::new(self.analyze_expr(key)?),
                }),
                _ => Err(invalid(
                    "memory/get",
                    format!("expected (memory/get key), got {} argument(s)", args.len()),
                )),
            },
            (Namespace::Budget, "remaining") if args.is_empty() => Ok(CoreNode::BudgetQuery),
            _ => Ok(CoreNode::Call {
                target: Box::new(self.resolve_namespaced(ns, name)?),
                args: self.analyze_all(args)?,
            }),
        }
    }

    fn unknown_function(&self, name: &str) -> AnalyzeError {
        let mut available: Vec<String> = stdlib::names().into_iter().map(str::to_string).collect();
        available.extend(SPECIAL_FORMS.iter().map(|s| s.to_string()));
        let mut candidates = available.clone();
        candidates.extend(self.scope.iter().cloned());
        available.sort();
        AnalyzeError::UnknownFunction {
            name: name.to_string(),
            hint: did_you_mean(name, &candidates),
            available: available.join(" "),
        }
    }

    /// Parses a binding pattern and returns it with the names it introduces.
    pub(crate) fn analyze_pattern(&mut self, node: &RawNode) -> AnalyzeResult<Pattern> {
        match node {
            RawNode::Symbol(name) if name == "_" => Ok(Pattern::Ignore),
            RawNode::Symbol(name) if name == "&" => Err(AnalyzeError::InvalidPattern(
                "'&' must be followed by exactly one pattern inside a vector".to_string(),
            )),
            RawNode::Symbol(name) => Ok(Pattern::Bind(name.clone())),
            RawNode::Vector(items) => self.analyze_seq_pattern(items),
            RawNode::Map(entries) => self.analyze_map_pattern(entries),
            other => Err(AnalyzeError::InvalidPattern(format!(
                "expected a symbol, vector or map, got {} {}",
                other.kind(),
                other
            ))),
        }
    }

    fn analyze_seq_pattern(&mut self, items: &[RawNode]) -> AnalyzeResult<Pattern> {
        let mut patterns = Vec::new();
        let mut rest = None;
        let mut as_name = None;
        let mut i = 0;
        while i < items.len() {
            match &items[i] {
                RawNode::Symbol(s) if s == "&" => {
                    if rest.is_some() {
                        return Err(AnalyzeError::InvalidPattern("more than one '&' in vector pattern".into()));
                    }
                    let target = items.get(i + 1).ok_or_else(|| {
                        AnalyzeError::InvalidPattern("'&' must be followed by a pattern".into())
                    })?;
                    rest = Some(Box::new(self.analyze_pattern(target)?));
                    i += 2;
                }
                RawNode::Keyword(k) if k == "as" => {
                    match items.get(i + 1) {
                        Some(RawNode::Symbol(name)) => as_name = Some(name.clone()),
                        _ => return Err(AnalyzeError::InvalidPattern(":as must be followed by a symbol".into())),
                    }
                    i += 2;
                }
                item => {
                    if rest.is_some() {
                        return Err(AnalyzeError::InvalidPattern(
                            "only :as may follow the '&' pattern".into(),
                        ));
                    }
                    patterns.push(self.analyze_pattern(item)?);
                    i += 1;
                }
            }
        }
        Ok(Pattern::Seq {
            items: patterns,
            rest,
            as_name,
        })
    }

    fn analyze_map_pattern(&mut self, entries: &[(RawNode, RawNode)]) -> AnalyzeResult<Pattern> {
        let mut bindings = Vec::new();
        let mut defaults = Vec::new();
        let mut as_name = None;
        for (k, v) in entries {
            match (k, v) {
                (RawNode::Keyword(kw), RawNode::Vector(names)) if kw == "keys" || kw == "strs" => {
                    for name in names {
                        let name = name.as_symbol().ok_or_else(|| {
                            AnalyzeError::InvalidPattern(format!(":{} expects symbols, got {}", kw, name))
                        })?;
                        let key = if kw == "keys" {
                            Value::keyword(name)
                        } else {
                            Value::string(name)
                        };
                        bindings.push((Pattern::Bind(name.to_string()), key));
                    }
                }
                (RawNode::Keyword(kw), RawNode::Map(pairs)) if kw == "or" => {
                    for (name, expr) in pairs {
                        let name = name.as_symbol().ok_or_else(|| {
                            AnalyzeError::InvalidPattern(format!(":or expects symbol keys, got {}", name))
                        })?;
                        defaults.push((name.to_string(), self.analyze_expr(expr)?));
                    }
                }
                (RawNode::Keyword(kw), RawNode::Symbol(name)) if kw == "as" => {
                    as_name = Some(name.clone());
                }
                (RawNode::Keyword(kw), _) if kw == "keys" || kw == "strs" || kw == "or" || kw == "as" => {
                    return Err(AnalyzeError::InvalidPattern(format!(
                        "malformed :{} entry in map pattern",
                        kw
                    )));
                }
                (pattern, key) => {
                    let key = literal_key(key).ok_or_else(|| {
                        AnalyzeError::InvalidPattern(format!("map pattern key must be a literal, got {}", key))
                    })?;
                    bindings.push((self.analyze_pattern(pattern)?, key));
                }
            }
        }
        for (name, _) in &defaults {
            let bound = bindings
                .iter()
                .any(|(p, _)| matches!(p, Pattern::Bind(n) if n == name));
            if !bound {
                return Err(AnalyzeError::InvalidPattern(format!(
                    ":or default for '{}' which the pattern does not bind",
                    name
                )));
            }
        }
        Ok(Pattern::Map {
            entries: bindings,
            defaults,
            as_name,
        })
    }
}

fn literal_key(node: &RawNode) -> Option<Value> {
    match node {
        RawNode::Keyword(k) => Some(Value::keyword(k)),
        RawNode::Str(s) => Some(Value::string(s.as_str())),
        RawNode::Int(i) => Some(Value::Integer(*i)),
        RawNode::Bool(b) => Some(Value::Boolean(*b)),
        RawNode::Nil => Some(Value::Nil),
        _ => None,
    }
}

pub(crate) fn list_items(node: &RawNode) -> &[RawNode] {
    match node {
        RawNode::List(items) => items,
        _ => &[],
    }
}

/// Names a pattern introduces, in binding order.
pub(crate) fn pattern_names(pattern: &Pattern, out: &mut Vec<String>) {
    match pattern {
        Pattern::Bind(name) => out.push(name.clone()),
        Pattern::Ignore => {}
        Pattern::Seq { items, rest, as_name } => {
            out.extend(as_name.iter().cloned());
            for item in items {
                pattern_names(item, out);
            }
            if let Some(rest) = rest {
                pattern_names(rest, out);
            }
        }
        Pattern::Map { entries, as_name, .. } => {
            out.extend(as_name.iter().cloned());
            for (item, _) in entries {
                pattern_names(item, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn analyze_src(src: &str) -> AnalyzeResult<CoreNode> {
        analyze(&parse(src).expect("parse"))
    }

    #[test]
    fn expanded_depth_is_bounded() {
        let nest = |depth: usize| {
            (0..depth).fold(RawNode::Int(1), |inner, _| RawNode::Vector(vec![inner]))
        };
        assert!(analyze(&nest(MAX_EXPANDED_DEPTH - 1)).is_ok());
        assert_eq!(
            analyze(&nest(MAX_EXPANDED_DEPTH + 10)),
            Err(AnalyzeError::TooDeep(MAX_EXPANDED_DEPTH))
        );
        // the counter unwinds with the recursion
        let mut analyzer = Analyzer::new();
        assert!(analyzer.analyze_expr(&nest(MAX_EXPANDED_DEPTH + 10)).is_err());
        assert!(analyzer.analyze_expr(&nest(10)).is_ok());
    }

    #[test]
    fn resolves_locals_builtins_and_globals() {
        let node = analyze_src("(let [x 1] [x count total])").unwrap();
        match node {
            CoreNode::Let { body, .. } => match *body {
                CoreNode::Vector(items) => {
                    assert_eq!(items[0], CoreNode::Local("x".into()));
                    assert!(matches!(items[1], CoreNode::Builtin(b) if b.name == "count"));
                    assert_eq!(items[2], CoreNode::Global("total".into()));
                }
                other => panic!("unexpected body {:?}", other),
            },
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn unknown_call_head_suggests_alternatives() {
        let err = analyze_src("(fiter odd? [1 2])").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("unknown function 'fiter'"));
        assert!(message.contains("Did you mean `filter`?"));
        assert!(message.contains("available functions:"));
    }

    #[test]
    fn namespaces_resolve() {
        assert_eq!(
            analyze_src("ctx/user").unwrap(),
            CoreNode::CtxGet { name: "user".into() }
        );
        assert_eq!(analyze_src("(budget/remaining)").unwrap(), CoreNode::BudgetQuery);
        assert!(matches!(
            analyze_src("(tool/search {:q 1})").unwrap(),
            CoreNode::CtxCall { ref name, .. } if name == "search"
        ));
        assert!(analyze_src("tool/search").is_err());
    }

    #[test]
    fn map_pattern_with_keys_and_defaults() {
        let mut analyzer = Analyzer::new();
        let raw = parse("{:keys [a b] :or {b 2} :as m}").unwrap();
        let pattern = analyzer.analyze_pattern(&raw).unwrap();
        let mut names = Vec::new();
        pattern_names(&pattern, &mut names);
        assert_eq!(names, vec!["m", "a", "b"]);
    }

    #[test]
    fn rejects_bad_patterns() {
        let mut analyzer = Analyzer::new();
        assert!(analyzer.analyze_pattern(&parse("[a &]").unwrap()).is_err());
        assert!(analyzer.analyze_pattern(&parse("42").unwrap()).is_err());
        assert!(analyzer.analyze_pattern(&parse("{:or {z 1}}").unwrap()).is_err());
    }
}
