use crate::ast::RawNode;
use pest::Parser;

// Declare submodules
pub mod delimiters;
pub mod errors;
pub mod expressions;

pub use delimiters::MAX_NESTING_DEPTH;
pub use errors::ParseError;
use expressions::build_form;

// Define the parser struct using the grammar file
#[derive(pest_derive::Parser)]
#[grammar = "ptc_lisp.pest"] // Path relative to src/
pub struct PtcLispParser;

// --- Main Parsing Functions ---

/// Parse every top-level form of a program.
pub fn parse_program(source: &str) -> Result<Vec<RawNode>, ParseError> {
    delimiters::check_delimiters(source)?;

    let mut pairs =
        PtcLispParser::parse(Rule::program, source).map_err(|e| ParseError::from_pest(e, source))?;
    let program = pairs
        .next()
        .ok_or_else(|| ParseError::new("empty program", 1, 1))?;

    program
        .into_inner()
        .filter(|p| p.as_rule() != Rule::EOI)
        .map(|p| build_form(p).map_err(|e| e.with_source(source)))
        .collect()
}

/// Parse a program into a single raw node. Several top-level forms are
/// wrapped in an implicit `(do ...)`.
pub fn parse(source: &str) -> Result<RawNode, ParseError> {
    let mut forms = parse_program(source)?;
    match forms.len() {
        0 => Err(ParseError::new(
            "empty program: expected at least one expression",
            1,
            1,
        )),
        1 => Ok(forms.remove(0)),
        _ => {
            let mut items = Vec::with_capacity(forms.len() + 1);
            items.push(RawNode::symbol("do"));
            items.extend(forms);
            Ok(RawNode::List(items))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Namespace;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_literals() {
        assert_eq!(parse("nil").unwrap(), RawNode::Nil);
        assert_eq!(parse("true").unwrap(), RawNode::Bool(true));
        assert_eq!(parse("-42").unwrap(), RawNode::Int(-42));
        assert_eq!(parse("3.5").unwrap(), RawNode::Float(3.5));
        assert_eq!(parse("2e3").unwrap(), RawNode::Float(2000.0));
        assert_eq!(parse(":name").unwrap(), RawNode::Keyword("name".into()));
        assert_eq!(parse("\"hi\\n\"").unwrap(), RawNode::Str("hi\n".into()));
    }

    #[test]
    fn splits_namespaced_symbols_at_parse_time() {
        assert_eq!(
            parse("ctx/users").unwrap(),
            RawNode::NsSymbol(Namespace::Ctx, "users".into())
        );
        assert_eq!(
            parse("(tool/search {:q 1})").unwrap(),
            RawNode::List(vec![
                RawNode::NsSymbol(Namespace::Tool, "search".into()),
                RawNode::Map(vec![(RawNode::Keyword("q".into()), RawNode::Int(1))]),
            ])
        );
        assert_eq!(parse("/").unwrap(), RawNode::symbol("/"));
    }

    #[test]
    fn rejects_unknown_namespace() {
        let err = parse("foo/bar").unwrap_err();
        assert!(err.message.contains("unknown namespace 'foo'"), "{}", err);
    }

    #[test]
    fn multiple_forms_become_do() {
        assert_eq!(
            parse("1 2").unwrap(),
            RawNode::List(vec![RawNode::symbol("do"), RawNode::Int(1), RawNode::Int(2)])
        );
    }

    #[test]
    fn commas_and_comments_are_whitespace() {
        assert_eq!(
            parse("[1, 2 ; trailing\n 3]").unwrap(),
            RawNode::Vector(vec![RawNode::Int(1), RawNode::Int(2), RawNode::Int(3)])
        );
    }

    #[test]
    fn odd_map_is_an_error() {
        let err = parse("{:a 1 :b}").unwrap_err();
        assert!(err.message.contains("even number"));
    }

    #[test]
    fn invalid_escape_is_reported() {
        let err = parse(r#"(str "a\qb")"#).unwrap_err();
        assert!(err.message.contains(r"\q"), "{}", err);
        assert_eq!(err.column, 6);
    }

    #[test]
    fn trailing_garbage_is_reported_with_position() {
        let err = parse("(+ 1 2) 12abc").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.column >= 9, "{}", err);
    }

    #[test]
    fn empty_program_is_an_error() {
        assert!(parse("  ; nothing\n").is_err());
    }

    #[test]
    fn sets_and_short_fns() {
        assert_eq!(
            parse("#{1}").unwrap(),
            RawNode::Set(vec![RawNode::Int(1)])
        );
        assert_eq!(
            parse("#(inc %)").unwrap(),
            RawNode::ShortFn(vec![RawNode::symbol("inc"), RawNode::symbol("%")])
        );
    }
}
