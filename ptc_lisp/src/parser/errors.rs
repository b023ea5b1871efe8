use super::Rule;
use pest::error::{Error as PestError, LineColLocation};
use pest::iterators::Pair;
use std::fmt;

/// A parse failure, positioned in the source. The message is shown to the
/// program author (usually an LLM) so it has to say what was expected and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    /// The offending source line, when available.
    pub source_line: Option<String>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        ParseError {
            message: message.into(),
            line,
            column,
            source_line: None,
        }
    }

    pub fn at_pair(message: impl Into<String>, pair: &Pair<Rule>) -> Self {
        let (line, column) = pair.as_span().start_pos().line_col();
        ParseError::new(message, line, column)
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source_line = source
            .lines()
            .nth(self.line.saturating_sub(1))
            .map(|l| l.to_string());
        self
    }

    pub fn from_pest(err: PestError<Rule>, source: &str) -> Self {
        let (line, column) = match err.line_col {
            LineColLocation::Pos((l, c)) => (l, c),
            LineColLocation::Span((l, c), _) => (l, c),
        };
        let renamed = err.renamed_rules(|rule| rule_description(rule).to_string());
        let message = renamed.variant.message().to_string();
        ParseError::new(message, line, column).with_source(source)
    }
}

fn rule_description(rule: &Rule) -> &'static str {
    match rule {
        Rule::EOI => "end of input",
        Rule::program => "program",
        Rule::list => "'('",
        Rule::vector => "'['",
        Rule::map => "'{'",
        Rule::set => "'#{'",
        Rule::short_fn => "'#('",
        Rule::close_paren => "')'",
        Rule::close_bracket => "']'",
        Rule::close_brace => "'}'",
        Rule::string | Rule::string_inner => "string",
        Rule::keyword => "keyword",
        Rule::number | Rule::float | Rule::integer | Rule::exponent => "number",
        Rule::symbol => "symbol",
        _ => "form",
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parse error at line {}, column {}: {}",
            self.line, self.column, self.message
        )?;
        if let Some(src) = &self.source_line {
            write!(f, "\n  | {}\n  | {}^", src, " ".repeat(self.column.saturating_sub(1)))?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}
