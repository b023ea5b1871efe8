// Special form expansion into core nodes.

use super::{body_node, invalid, pattern_names, AnalyzeError, AnalyzeResult, Analyzer};
use crate::ast::RawNode;
use crate::core_ast::{Combinator, CoreNode, FnDef, FnMeta, Pattern, WhereOp};
use crate::runtime::values::Value;
use std::sync::Arc;

// Contains a space, so no source symbol can name it.
const IF_LET_TEMP: &str = "if-let value";
const SHORT_FN_REST: &str = "%&";

impl Analyzer {
    pub(super) fn analyze_special_form(&mut self, name: &str, args: &[RawNode]) -> AnalyzeResult<CoreNode> {
        match name {
            "do" => {
                let mark = self.scope_mark();
                let body = self.analyze_body(args);
                self.restore_scope(mark);
                Ok(CoreNode::Do(body?))
            }
            "if" | "if-not" => self.analyze_if(name, args),
            "when" | "when-not" => self.analyze_when(name, args),
            "if-let" | "when-let" => self.analyze_if_let(name, args),
            "cond" => self.analyze_cond(args),
            "let" => self.analyze_let(args),
            "fn" => Ok(CoreNode::Fn(Arc::new(self.analyze_fn(args, None)?))),
            "def" | "defn" => Err(AnalyzeError::MisplacedDefinition(name.to_string())),
            "and" => Ok(CoreNode::And(self.analyze_all(args)?)),
            "or" => Ok(CoreNode::Or(self.analyze_all(args)?)),
            "->" | "->>" => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(RawNode::symbol(name));
                items.extend_from_slice(args);
                let expanded = super::expand_threading(&RawNode::List(items))?;
                self.analyze_expr(&expanded)
            }
            "where" => self.analyze_where(args),
            "all-of" => self.analyze_combinator(Combinator::AllOf, args),
            "any-of" => self.analyze_combinator(Combinator::AnyOf, args),
            "none-of" => self.analyze_combinator(Combinator::NoneOf, args),
            "call" => self.analyze_call(args),
            other => Err(invalid(other, "unsupported special form")),
        }
    }

    /// A body with its own scope, collapsed into a single node.
    fn scoped_body(&mut self, forms: &[RawNode]) -> AnalyzeResult<CoreNode> {
        let mark = self.scope_mark();
        let body = self.analyze_body(forms);
        self.restore_scope(mark);
        Ok(body_node(body?))
    }

    fn analyze_if(&mut self, name: &str, args: &[RawNode]) -> AnalyzeResult<CoreNode> {
        let (cond, then, otherwise) = match args {
            [c, t] => (c, t, None),
            [c, t, e] => (c, t, Some(e)),
            _ => {
                return Err(invalid(
                    name,
                    format!("expected ({} test then else?), got {} argument(s)", name, args.len()),
                ))
            }
        };
        let cond = self.analyze_expr(cond)?;
        let then = self.analyze_expr(then)?;
        let otherwise = match otherwise {
            Some(e) => self.analyze_expr(e)?,
            None => CoreNode::nil(),
        };
        let (then, otherwise) = if name == "if-not" {
            (otherwise, then)
        } else {
            (then, otherwise)
        };
        Ok(CoreNode::If {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn analyze_when(&mut self, name: &str, args: &[RawNode]) -> AnalyzeResult<CoreNode> {
        let (cond, body) = args
            .split_first()
            .ok_or_else(|| invalid(name, format!("expected ({} test body...)", name)))?;
        let cond = self.analyze_expr(cond)?;
        let body = self.scoped_body(body)?;
        let (then, otherwise) = if name == "when-not" {
            (CoreNode::nil(), body)
        } else {
            (body, CoreNode::nil())
        };
        Ok(CoreNode::If {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    /// `(if-let [pattern expr] then else?)`: the value is computed once and
    /// only destructured when truthy.
    fn analyze_if_let(&mut self, name: &str, args: &[RawNode]) -> AnalyzeResult<CoreNode> {
        let (binding, rest) = match args.split_first() {
            Some((RawNode::Vector(binding), rest)) if binding.len() == 2 => (binding, rest),
            _ => {
                return Err(invalid(
                    name,
                    format!("expected ({} [name expr] ...) with exactly one binding pair", name),
                ))
            }
        };
        if name == "if-let" && !(1..=2).contains(&rest.len()) {
            return Err(invalid(name, "expected a then branch and an optional else branch"));
        }
        let value = self.analyze_expr(&binding[1])?;

        let mark = self.scope_mark();
        let pattern = self.analyze_pattern(&binding[0])?;
        let mut names = Vec::new();
        pattern_names(&pattern, &mut names);
        self.push_names(names);
        let then = if name == "if-let" {
            self.analyze_expr(&rest[0])
        } else {
            self.scoped_body(rest)
        };
        self.restore_scope(mark);
        let then = then?;

        let otherwise = match rest.get(1) {
            Some(e) if name == "if-let" => self.analyze_expr(e)?,
            _ => CoreNode::nil(),
        };
        Ok(CoreNode::Let {
            bindings: vec![(Pattern::Bind(IF_LET_TEMP.to_string()), value)],
            body: Box::new(CoreNode::If {
                cond: Box::new(CoreNode::Local(IF_LET_TEMP.to_string())),
                then: Box::new(CoreNode::Let {
                    bindings: vec![(pattern, CoreNode::Local(IF_LET_TEMP.to_string()))],
                    body: Box::new(then),
                }),
                otherwise: Box::new(otherwise),
            }),
        })
    }

    fn analyze_cond(&mut self, args: &[RawNode]) -> AnalyzeResult<CoreNode> {
        if args.len() % 2 != 0 {
            return Err(invalid("cond", "expected an even number of test/expression forms"));
        }
        let mut clauses = Vec::with_capacity(args.len() / 2);
        for pair in args.chunks(2) {
            let test = match &pair[0] {
                RawNode::Keyword(k) if k == "else" => CoreNode::Const(Value::Boolean(true)),
                other => self.analyze_expr(other)?,
            };
            clauses.push((test, self.analyze_expr(&pair[1])?));
        }
        // no clause matched: nil
        Ok(clauses
            .into_iter()
            .rev()
            .fold(CoreNode::nil(), |otherwise, (test, then)| CoreNode::If {
                cond: Box::new(test),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            }))
    }

    fn analyze_let(&mut self, args: &[RawNode]) -> AnalyzeResult<CoreNode> {
        let (bindings, body) = match args.split_first() {
            Some((RawNode::Vector(bindings), body)) => (bindings, body),
            _ => return Err(invalid("let", "expected (let [name value ...] body...)")),
        };
        if bindings.len() % 2 != 0 {
            return Err(invalid(
                "let",
                format!("binding vector needs an even number of forms, got {}", bindings.len()),
            ));
        }
        let mark = self.scope_mark();
        let result = self.analyze_let_inner(bindings, body);
        self.restore_scope(mark);
        result
    }

    fn analyze_let_inner(&mut self, bindings: &[RawNode], body: &[RawNode]) -> AnalyzeResult<CoreNode> {
        let mut core_bindings = Vec::with_capacity(bindings.len() / 2);
        for pair in bindings.chunks(2) {
            let value = self.analyze_expr(&pair[1])?;
            let pattern = self.analyze_pattern(&pair[0])?;
            let mut names = Vec::new();
            pattern_names(&pattern, &mut names);
            self.push_names(names);
            core_bindings.push((pattern, value));
        }
        let body = self.analyze_body(body)?;
        Ok(CoreNode::Let {
            bindings: core_bindings,
            body: Box::new(body_node(body)),
        })
    }

    /// `(fn name? [params] body...)`. `self_name` comes from `defn`.
    pub(super) fn analyze_fn(&mut self, args: &[RawNode], self_name: Option<(String, Option<String>)>) -> AnalyzeResult<FnDef> {
        let (named, args) = match args.split_first() {
            Some((RawNode::Symbol(name), rest)) => (Some(name.clone()), rest),
            _ => (None, args),
        };
        let (params, body) = match args.split_first() {
            Some((RawNode::Vector(params), body)) => (params, body),
            Some((RawNode::List(_), _)) => {
                return Err(invalid("fn", "multi-arity functions are not supported"))
            }
            _ => return Err(invalid("fn", "expected a parameter vector")),
        };
        let (name, docstring) = match self_name {
            Some((name, doc)) => (Some(name), doc),
            None => (named, None),
        };

        // a named function may refer to itself
        let mark = self.scope_mark();
        self.push_names(name.iter().cloned());
        let result = self.analyze_fn_inner(params, body);
        self.restore_scope(mark);
        let (params, rest, body) = result?;
        Ok(FnDef {
            params,
            rest,
            body,
            meta: FnMeta {
                name,
                docstring,
                return_type: None,
            },
        })
    }

    fn analyze_fn_inner(
        &mut self,
        params: &[RawNode],
        body: &[RawNode],
    ) -> AnalyzeResult<(Vec<Pattern>, Option<Pattern>, CoreNode)> {
        let mut fixed = Vec::new();
        let mut rest = None;
        let mut iter = params.iter();
        while let Some(param) = iter.next() {
            if param.as_symbol() == Some("&") {
                let target = iter
                    .next()
                    .ok_or_else(|| invalid("fn", "'&' must be followed by a parameter"))?;
                rest = Some(self.analyze_pattern(target)?);
                if iter.next().is_some() {
                    return Err(invalid("fn", "only one parameter may follow '&'"));
                }
                break;
            }
            fixed.push(self.analyze_pattern(param)?);
        }
        let mut names = Vec::new();
        for p in fixed.iter().chain(rest.iter()) {
            pattern_names(p, &mut names);
        }
        self.push_names(names);
        let body = self.analyze_body(body)?;
        Ok((fixed, rest, body_node(body)))
    }

    /// `(def name "doc"? value)`
    pub(super) fn analyze_def(&mut self, args: &[RawNode]) -> AnalyzeResult<(String, CoreNode)> {
        let (name, doc, value) = match args {
            [RawNode::Symbol(name), value] => (name, None, value),
            [RawNode::Symbol(name), RawNode::Str(doc), value] => (name, Some(doc.clone()), value),
            _ => return Err(invalid("def", "expected (def name value) or (def name \"doc\" value)")),
        };
        let mut node = self.analyze_expr(value)?;
        if let Some(doc) = doc {
            match &mut node {
                CoreNode::Fn(def) => Arc::make_mut(def).meta.docstring = Some(doc),
                _ => {
                    return Err(invalid(
                        "def",
                        format!("docstring for '{}' needs a fn value to attach to", name),
                    ))
                }
            }
        }
        Ok((name.clone(), node))
    }

    /// `(defn name "doc"? [params] body...)`
    pub(super) fn analyze_defn(&mut self, args: &[RawNode]) -> AnalyzeResult<(String, CoreNode)> {
        let (name, rest) = match args.split_first() {
            Some((RawNode::Symbol(name), rest)) => (name.clone(), rest),
            _ => return Err(invalid("defn", "expected (defn name [params] body...)")),
        };
        let (doc, rest) = match rest {
            [RawNode::Str(doc), rest @ ..] if !rest.is_empty() => (Some(doc.clone()), rest),
            _ => (None, rest),
        };
        let def = self.analyze_fn(rest, Some((name.clone(), doc)))?;
        Ok((name, CoreNode::Fn(Arc::new(def))))
    }

    fn analyze_where(&mut self, args: &[RawNode]) -> AnalyzeResult<CoreNode> {
        let (field, rest) = args
            .split_first()
            .ok_or_else(|| invalid("where", "expected (where field) or (where field op value)"))?;
        let path = where_path(field)?;
        match rest {
            [] => Ok(CoreNode::Where {
                path,
                op: WhereOp::Truthy,
                operand: None,
            }),
            [op, value] => {
                let op = op
                    .as_symbol()
                    .and_then(WhereOp::parse)
                    .ok_or_else(|| {
                        invalid(
                            "where",
                            format!(
                                "unknown operator {}; expected one of = not= > < >= <= includes in",
                                op
                            ),
                        )
                    })?;
                Ok(CoreNode::Where {
                    path,
                    op,
                    operand: Some(Box::new(self.analyze_expr(value)?)),
                })
            }
            _ => Err(invalid(
                "where",
                format!("expected (where field) or (where field op value), got {} argument(s)", args.len()),
            )),
        }
    }

    fn analyze_combinator(&mut self, kind: Combinator, args: &[RawNode]) -> AnalyzeResult<CoreNode> {
        Ok(CoreNode::Combine {
            kind,
            preds: self.analyze_all(args)?,
        })
    }

    /// `(call "tool-name" args...)`
    fn analyze_call(&mut self, args: &[RawNode]) -> AnalyzeResult<CoreNode> {
        match args.split_first() {
            Some((RawNode::Str(name), rest)) => Ok(CoreNode::CtxCall {
                name: name.clone(),
                args: self.analyze_all(rest)?,
            }),
            _ => Err(invalid("call", "expected (call \"tool-name\" args...)")),
        }
    }

    /// `#(...)`: `%`/`%1`..`%9` become positional parameters and `%&` the rest.
    pub(super) fn analyze_short_fn(&mut self, items: &[RawNode]) -> AnalyzeResult<CoreNode> {
        let mut max_index = 0;
        let mut uses_bare = false;
        let mut uses_rest = false;
        for item in items {
            scan_placeholders(item, &mut max_index, &mut uses_bare, &mut uses_rest)?;
        }
        if uses_bare {
            max_index = max_index.max(1);
        }
        let params: Vec<Pattern> = (1..=max_index).map(|i| Pattern::Bind(format!("%{}", i))).collect();
        let rest = uses_rest.then(|| Pattern::Bind(SHORT_FN_REST.to_string()));

        let mark = self.scope_mark();
        let mut names: Vec<String> = (1..=max_index).map(|i| format!("%{}", i)).collect();
        if uses_rest {
            names.push(SHORT_FN_REST.to_string());
        }
        if uses_bare {
            names.push("%".to_string());
        }
        self.push_names(names);
        let body = if items.is_empty() {
            Ok(CoreNode::Const(Value::empty_vector()))
        } else {
            self.analyze_expr(&RawNode::List(items.to_vec()))
        };
        self.restore_scope(mark);
        let mut body = body?;
        if uses_bare {
            body = CoreNode::Let {
                bindings: vec![(Pattern::Bind("%".to_string()), CoreNode::Local("%1".to_string()))],
                body: Box::new(body),
            };
        }
        Ok(CoreNode::Fn(Arc::new(FnDef {
            params,
            rest,
            body,
            meta: FnMeta::default(),
        })))
    }
}

fn where_path(field: &RawNode) -> AnalyzeResult<Vec<Value>> {
    let key = |node: &RawNode| match node {
        RawNode::Keyword(k) => Ok(Value::keyword(k)),
        RawNode::Str(s) => Ok(Value::string(s.as_str())),
        other => Err(invalid(
            "where",
            format!("field must be a keyword or a vector of keywords, got {}", other),
        )),
    };
    match field {
        RawNode::Vector(items) if !items.is_empty() => items.iter().map(key).collect(),
        other => Ok(vec![key(other)?]),
    }
}

fn scan_placeholders(node: &RawNode, max_index: &mut usize, bare: &mut bool, rest: &mut bool) -> AnalyzeResult<()> {
    match node {
        RawNode::Symbol(s) if s == "%" => *bare = true,
        RawNode::Symbol(s) if s == SHORT_FN_REST => *rest = true,
        RawNode::Symbol(s) if s.starts_with('%') => {
            if let Ok(i) = s[1..].parse::<usize>() {
                if !(1..=9).contains(&i) {
                    return Err(invalid("#()", format!("placeholder {} is out of range %1..%9", s)));
                }
                *max_index = (*max_index).max(i);
            }
        }
        RawNode::ShortFn(_) => return Err(invalid("#()", "nested #() forms are not allowed")),
        RawNode::List(items) | RawNode::Vector(items) | RawNode::Set(items) => {
            for item in items {
                scan_placeholders(item, max_index, bare, rest)?;
            }
        }
        RawNode::Map(entries) => {
            for (k, v) in entries {
                scan_placeholders(k, max_index, bare, rest)?;
                scan_placeholders(v, max_index, bare, rest)?;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::analyze;
    use super::*;
    use crate::parser::parse;

    fn analyze_src(src: &str) -> AnalyzeResult<CoreNode> {
        analyze(&parse(src).expect("parse"))
    }

    #[test]
    fn definitions_only_in_body_position() {
        assert!(analyze_src("(do (def x 1) (+ x 1))").is_ok());
        assert!(analyze_src("(let [a 1] (defn f [y] (+ a y)) (f 2))").is_ok());
        assert_eq!(
            analyze_src("(if true (def x 1) 2)").unwrap_err(),
            AnalyzeError::MisplacedDefinition("def".into())
        );
    }

    #[test]
    fn defn_captures_docstring_and_name() {
        match analyze_src("(defn add \"Adds.\" [a b] (+ a b))").unwrap() {
            CoreNode::Do(body) => match &body[0] {
                CoreNode::Def { name, value } => {
                    assert_eq!(name, "add");
                    match value.as_ref() {
                        CoreNode::Fn(def) => {
                            assert_eq!(def.meta.name.as_deref(), Some("add"));
                            assert_eq!(def.meta.docstring.as_deref(), Some("Adds."));
                            assert_eq!(def.params.len(), 2);
                        }
                        other => panic!("expected fn, got {:?}", other),
                    }
                }
                other => panic!("expected def, got {:?}", other),
            },
            other => panic!("expected do, got {:?}", other),
        }
    }

    #[test]
    fn def_docstrings_attach_only_to_functions() {
        match analyze_src("(def inc2 \"Adds two.\" (fn [x] (+ x 2)))").unwrap() {
            CoreNode::Do(body) => match &body[0] {
                CoreNode::Def { value, .. } => match value.as_ref() {
                    CoreNode::Fn(def) => assert_eq!(def.meta.docstring.as_deref(), Some("Adds two.")),
                    other => panic!("expected fn, got {:?}", other),
                },
                other => panic!("expected def, got {:?}", other),
            },
            other => panic!("expected do, got {:?}", other),
        }
        let err = analyze_src("(def limit \"Upper bound.\" 10)").unwrap_err();
        assert!(err.to_string().contains("docstring for 'limit'"), "{}", err);
        // a string value alone is not a docstring
        assert!(analyze_src("(def greeting \"hello\")").is_ok());
    }

    #[test]
    fn let_requires_even_bindings() {
        let err = analyze_src("(let [a 1 b] a)").unwrap_err();
        assert!(err.to_string().contains("even number"));
        assert!(analyze_src("(let [1 2] 3)").is_err());
    }

    #[test]
    fn cond_needs_pairs() {
        assert!(analyze_src("(cond true 1 false)").is_err());
        assert!(analyze_src("(cond (= 1 2) :a :else :b)").is_ok());
    }

    #[test]
    fn where_rejects_unknown_operator() {
        let err = analyze_src("(where :age >> 3)").unwrap_err();
        assert!(err.to_string().contains("unknown operator"));
        assert!(matches!(
            analyze_src("(where [:user :age] >= 18)").unwrap(),
            CoreNode::Where { ref path, op: WhereOp::Gte, .. } if path.len() == 2
        ));
    }

    #[test]
    fn short_fn_placeholders_become_params() {
        match analyze_src("#(+ %1 %2)").unwrap() {
            CoreNode::Fn(def) => assert_eq!(def.params.len(), 2),
            other => panic!("expected fn, got {:?}", other),
        }
        match analyze_src("#(* % %)").unwrap() {
            CoreNode::Fn(def) => assert_eq!(def.params.len(), 1),
            other => panic!("expected fn, got {:?}", other),
        }
        assert!(analyze_src("#(map #(inc %) %)").is_err());
    }
}
