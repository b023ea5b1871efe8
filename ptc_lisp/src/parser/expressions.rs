use super::errors::ParseError;
use super::Rule;
use crate::ast::{Namespace, RawNode};
use pest::iterators::Pair;

pub(super) fn build_form(pair: Pair<Rule>) -> Result<RawNode, ParseError> {
    match pair.as_rule() {
        Rule::number => build_number(pair),
        Rule::string => build_string(pair),
        Rule::keyword => Ok(RawNode::Keyword(pair.as_str()[1..].to_string())),
        Rule::symbol => build_symbol(pair),
        Rule::list => Ok(RawNode::List(build_children(pair)?)),
        Rule::vector => Ok(RawNode::Vector(build_children(pair)?)),
        Rule::set => Ok(RawNode::Set(build_children(pair)?)),
        Rule::short_fn => Ok(RawNode::ShortFn(build_children(pair)?)),
        Rule::map => build_map(pair),
        rule => Err(ParseError::at_pair(
            format!("unexpected {:?} in form position", rule),
            &pair,
        )),
    }
}

/// Builds the inner forms of a collection, skipping the closing delimiter token.
fn build_children(pair: Pair<Rule>) -> Result<Vec<RawNode>, ParseError> {
    pair.into_inner()
        .filter(|p| {
            !matches!(
                p.as_rule(),
                Rule::close_paren | Rule::close_bracket | Rule::close_brace
            )
        })
        .map(build_form)
        .collect()
}

fn build_map(pair: Pair<Rule>) -> Result<RawNode, ParseError> {
    let span_pair = pair.clone();
    let items = build_children(pair)?;
    if items.len() % 2 != 0 {
        return Err(ParseError::at_pair(
            format!(
                "map literal must contain an even number of forms (key/value pairs), found {}",
                items.len()
            ),
            &span_pair,
        ));
    }
    let mut entries = Vec::with_capacity(items.len() / 2);
    let mut iter = items.into_iter();
    while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
        entries.push((k, v));
    }
    Ok(RawNode::Map(entries))
}

fn build_number(pair: Pair<Rule>) -> Result<RawNode, ParseError> {
    let text = pair.as_str();
    if text.contains(&['.', 'e', 'E'][..]) {
        text.parse::<f64>()
            .map(RawNode::Float)
            .map_err(|_| ParseError::at_pair(format!("invalid float literal: {}", text), &pair))
    } else {
        text.parse::<i64>().map(RawNode::Int).map_err(|_| {
            ParseError::at_pair(
                format!("integer literal out of range (64-bit): {}", text),
                &pair,
            )
        })
    }
}

fn build_string(pair: Pair<Rule>) -> Result<RawNode, ParseError> {
    let (line, column) = pair.as_span().start_pos().line_col();
    let raw = pair
        .into_inner()
        .next()
        .map(|inner| inner.as_str())
        .unwrap_or("");
    unescape(raw)
        .map(RawNode::Str)
        .map_err(|sequence| {
            ParseError::new(
                format!(
                    "invalid escape sequence '{}' in string (supported: \\\\ \\\" \\n \\t \\r)",
                    sequence
                ),
                line,
                column,
            )
        })
}

/// Resolves `\\ \" \n \t \r`; anything else is reported back as the bad sequence.
pub(crate) fn unescape(s: &str) -> Result<String, String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some(other) => return Err(format!("\\{}", other)),
                None => return Err("\\".to_string()),
            }
        } else {
            result.push(c);
        }
    }
    Ok(result)
}

fn build_symbol(pair: Pair<Rule>) -> Result<RawNode, ParseError> {
    let text = pair.as_str();
    match text {
        "nil" => return Ok(RawNode::Nil),
        "true" => return Ok(RawNode::Bool(true)),
        "false" => return Ok(RawNode::Bool(false)),
        "/" => return Ok(RawNode::symbol("/")),
        _ => {}
    }
    let Some((prefix, name)) = text.split_once('/') else {
        return Ok(RawNode::symbol(text));
    };
    if prefix.is_empty() || name.is_empty() || name.contains('/') {
        return Err(ParseError::at_pair(
            format!("malformed qualified symbol '{}': expected namespace/name", text),
            &pair,
        ));
    }
    match Namespace::parse(prefix) {
        Some(ns) => Ok(RawNode::NsSymbol(ns, name.to_string())),
        None => {
            let valid: Vec<&str> = Namespace::ALL.iter().map(|ns| ns.as_str()).collect();
            Err(ParseError::at_pair(
                format!(
                    "unknown namespace '{}' in '{}'; valid namespaces are {}",
                    prefix,
                    text,
                    valid.join(", ")
                ),
                &pair,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::unescape;

    #[test]
    fn unescape_supported_sequences() {
        assert_eq!(unescape(r#"a\nb\t\"c\"\\"#).unwrap(), "a\nb\t\"c\"\\");
    }

    #[test]
    fn unescape_rejects_unknown_sequence() {
        assert_eq!(unescape(r"bad \q").unwrap_err(), r"\q");
    }
}
