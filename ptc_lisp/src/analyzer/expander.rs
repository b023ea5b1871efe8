// Threading macro expansion (`->` and `->>`), performed on raw nodes before
// analysis.

use super::{invalid, AnalyzeError, AnalyzeResult, MAX_EXPANDED_DEPTH};
use crate::ast::RawNode;

/// Rewrites `(-> x f (g a))` into `(g (f x) a)` and `(->> x f (g a))` into
/// `(g a (f x))`. Any other node is returned unchanged.
pub fn expand_threading(node: &RawNode) -> AnalyzeResult<RawNode> {
    let items = match node {
        RawNode::List(items) => items,
        _ => return Ok(node.clone()),
    };
    let last = match items.first().and_then(RawNode::as_symbol) {
        Some("->") => false,
        Some("->>") => true,
        _ => return Ok(node.clone()),
    };
    let form_name = if last { "->>" } else { "->" };
    let (initial, steps) = items[1..]
        .split_first()
        .ok_or_else(|| invalid(form_name, "expected an initial value"))?;
    // each step wraps the accumulated form once more
    if steps.len() > MAX_EXPANDED_DEPTH {
        return Err(AnalyzeError::TooDeep(MAX_EXPANDED_DEPTH));
    }

    Ok(steps
        .iter()
        .fold(initial.clone(), |acc, step| thread_step(acc, step, last)))
}

fn thread_step(acc: RawNode, step: &RawNode, last: bool) -> RawNode {
    match step {
        RawNode::List(items) if !items.is_empty() => {
            let mut call = items.clone();
            if last {
                call.push(acc);
            } else {
                call.insert(1, acc);
            }
            RawNode::List(call)
        }
        other => RawNode::List(vec![other.clone(), acc]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn expand(src: &str) -> String {
        expand_threading(&parse(src).unwrap()).unwrap().to_string()
    }

    #[test]
    fn thread_first_inserts_as_first_argument() {
        assert_eq!(expand("(-> m (assoc :a 1) keys count)"), "(count (keys (assoc m :a 1)))");
    }

    #[test]
    fn thread_last_appends() {
        assert_eq!(
            expand("(->> xs (filter odd?) (map inc) (reduce +))"),
            "(reduce + (map inc (filter odd? xs)))"
        );
    }

    #[test]
    fn overlong_chains_are_rejected_before_expansion() {
        let source = format!("(-> 0 {})", "inc ".repeat(MAX_EXPANDED_DEPTH + 1));
        assert_eq!(
            expand_threading(&parse(&source).unwrap()),
            Err(AnalyzeError::TooDeep(MAX_EXPANDED_DEPTH))
        );
        let source = format!("(->> 0 {})", "inc ".repeat(MAX_EXPANDED_DEPTH));
        assert!(expand_threading(&parse(&source).unwrap()).is_ok());
    }

    #[test]
    fn other_nodes_pass_through() {
        assert_eq!(expand("(+ 1 2)"), "(+ 1 2)");
        assert!(expand_threading(&parse("(->)").unwrap()).is_err());
    }
}
