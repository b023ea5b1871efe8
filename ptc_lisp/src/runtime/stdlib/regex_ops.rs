use super::{expect_str, BuiltinTable};
use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::values::Value;
use regex::{Captures, Regex, RegexBuilder};

// Compiled program size cap; keeps hostile patterns from ballooning memory.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

fn compile_regex(pattern: &str, operation: &str) -> EvalResult<Regex> {
    RegexBuilder::new(pattern)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .map_err(|e| EvalError::invalid_argument(operation, format!("invalid regex: {}", e)))
}

/// The whole match when the pattern has no groups, otherwise
/// `[whole group1 group2 ...]` with `nil` for groups that did not take part.
fn match_value(caps: &Captures) -> Value {
    if caps.len() == 1 {
        return caps
            .get(0)
            .map(|m| Value::string(m.as_str()))
            .unwrap_or(Value::Nil);
    }
    Value::Vector(
        caps.iter()
            .map(|m| m.map(|m| Value::string(m.as_str())).unwrap_or(Value::Nil))
            .collect(),
    )
}

fn re_find(args: &[Value]) -> EvalResult<Value> {
    let re = compile_regex(expect_str(&args[0], "re-find")?, "re-find")?;
    let text = expect_str(&args[1], "re-find")?;
    Ok(re.captures(text).map(|c| match_value(&c)).unwrap_or(Value::Nil))
}

fn re_matches(args: &[Value]) -> EvalResult<Value> {
    let pattern = expect_str(&args[0], "re-matches")?;
    let re = compile_regex(&format!("^(?:{})$", pattern), "re-matches")?;
    let text = expect_str(&args[1], "re-matches")?;
    Ok(re.captures(text).map(|c| match_value(&c)).unwrap_or(Value::Nil))
}

fn re_seq(args: &[Value]) -> EvalResult<Value> {
    let re = compile_regex(expect_str(&args[0], "re-seq")?, "re-seq")?;
    let text = expect_str(&args[1], "re-seq")?;
    Ok(Value::Vector(
        re.captures_iter(text).map(|c| match_value(&c)).collect(),
    ))
}

pub fn load_regex_functions(table: &mut BuiltinTable) {
    table.define_pure("re-find", 2, re_find);
    table.define_pure("re-matches", 2, re_matches);
    table.define_pure("re-seq", 2, re_seq);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_returns_groups_when_present() {
        assert_eq!(
            re_find(&[Value::string(r"\d+"), Value::string("ab 12 cd")]).unwrap(),
            Value::string("12")
        );
        assert_eq!(
            re_find(&[Value::string(r"(\w+)@(\w+)"), Value::string("x ada@host")]).unwrap(),
            Value::vector(vec![
                Value::string("ada@host"),
                Value::string("ada"),
                Value::string("host")
            ])
        );
    }

    #[test]
    fn matches_requires_whole_string() {
        assert_eq!(
            re_matches(&[Value::string(r"\d+"), Value::string("12a")]).unwrap(),
            Value::Nil
        );
        assert_eq!(
            re_matches(&[Value::string(r"\d+"), Value::string("12")]).unwrap(),
            Value::string("12")
        );
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = re_seq(&[Value::string("("), Value::string("x")]).unwrap_err();
        assert!(err.to_string().contains("invalid regex"));
    }
}
