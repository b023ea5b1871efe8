//! Delimiter pre-scan.
//!
//! Runs before the grammar so that unbalanced or mismatched brackets, unterminated
//! strings and excessive nesting produce precise messages instead of a generic
//! "expected ..." from the grammar, and so that pathological nesting is rejected
//! before any recursive descent happens.

use super::errors::ParseError;

/// Maximum nesting of lists, vectors, maps and sets.
pub const MAX_NESTING_DEPTH: usize = 50;

struct Open {
    close: char,
    text: &'static str,
    line: usize,
    column: usize,
}

pub fn check_delimiters(source: &str) -> Result<(), ParseError> {
    let mut stack: Vec<Open> = Vec::new();
    let mut chars = source.chars().peekable();
    let (mut line, mut column) = (1usize, 0usize);

    while let Some(c) = chars.next() {
        if c == '\n' {
            line += 1;
            column = 0;
            continue;
        }
        column += 1;
        match c {
            ';' => {
                // comment runs to end of line
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '"' => {
                let (start_line, start_column) = (line, column);
                let mut closed = false;
                while let Some(s) = chars.next() {
                    if s == '\n' {
                        line += 1;
                        column = 0;
                        continue;
                    }
                    column += 1;
                    if s == '\\' {
                        if let Some(escaped) = chars.next() {
                            if escaped == '\n' {
                                line += 1;
                                column = 0;
                            } else {
                                column += 1;
                            }
                        }
                    } else if s == '"' {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(ParseError::new(
                        "unterminated string literal (missing closing '\"')",
                        start_line,
                        start_column,
                    )
                    .with_source(source));
                }
            }
            '#' if matches!(chars.peek(), Some(&'{') | Some(&'(')) => {
                let opener = chars.next();
                let (close, text) = if opener == Some('{') { ('}', "#{") } else { (')', "#(") };
                push(&mut stack, Open { close, text, line, column }, source)?;
                column += 1;
            }
            '(' => push(&mut stack, Open { close: ')', text: "(", line, column }, source)?,
            '[' => push(&mut stack, Open { close: ']', text: "[", line, column }, source)?,
            '{' => push(&mut stack, Open { close: '}', text: "{", line, column }, source)?,
            ')' | ']' | '}' => match stack.pop() {
                None => {
                    return Err(ParseError::new(
                        format!("unexpected '{}' with no matching opening bracket", c),
                        line,
                        column,
                    )
                    .with_source(source))
                }
                Some(open) if open.close != c => {
                    return Err(ParseError::new(
                        format!(
                            "mismatched '{}': expected '{}' to close '{}' opened at line {}, column {}",
                            c, open.close, open.text, open.line, open.column
                        ),
                        line,
                        column,
                    )
                    .with_source(source))
                }
                Some(_) => {}
            },
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(ParseError::new(
            format!(
                "unclosed '{}': missing '{}' before end of input",
                open.text, open.close
            ),
            open.line,
            open.column,
        )
        .with_source(source));
    }
    Ok(())
}

fn push(stack: &mut Vec<Open>, open: Open, source: &str) -> Result<(), ParseError> {
    if stack.len() >= MAX_NESTING_DEPTH {
        return Err(ParseError::new(
            format!(
                "nesting depth exceeds the maximum of {} levels",
                MAX_NESTING_DEPTH
            ),
            open.line,
            open.column,
        )
        .with_source(source));
    }
    stack.push(open);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_source_passes() {
        assert!(check_delimiters("(let [x {:a #{1 2}}] (str \"(\" x))").is_ok());
    }

    #[test]
    fn reports_unclosed_opener_position() {
        let err = check_delimiters("(+ 1\n  (* 2 3)").unwrap_err();
        assert_eq!((err.line, err.column), (1, 1));
        assert!(err.message.contains("unclosed '('"));
    }

    #[test]
    fn reports_mismatch() {
        let err = check_delimiters("(get [1 2) 0)").unwrap_err();
        assert!(err.message.contains("mismatched ')'"));
        assert_eq!(err.column, 10);
    }

    #[test]
    fn rejects_deep_nesting() {
        let source = format!("{}1{}", "[".repeat(51), "]".repeat(51));
        let err = check_delimiters(&source).unwrap_err();
        assert!(err.message.contains("maximum of 50"));
        let ok = format!("{}1{}", "[".repeat(50), "]".repeat(50));
        assert!(check_delimiters(&ok).is_ok());
    }

    #[test]
    fn brackets_inside_strings_and_comments_are_ignored() {
        assert!(check_delimiters("; (((\n\"]]\"").is_ok());
    }
}
