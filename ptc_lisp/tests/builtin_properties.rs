use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;
use ptc_lisp::{run, ExecutionRequest, Value};
use std::collections::HashSet;

fn eval(source: &str) -> Result<Value, TestCaseError> {
    run(source, ExecutionRequest::new())
        .map(|output| output.value)
        .map_err(|e| TestCaseError::fail(format!("{}: {}", source, e)))
}

fn vector_literal(items: &[i64]) -> String {
    let parts: Vec<String> = items.iter().map(i64::to_string).collect();
    format!("[{}]", parts.join(" "))
}

fn ints(items: impl IntoIterator<Item = i64>) -> Value {
    Value::Vector(items.into_iter().map(Value::Integer).collect())
}

fn small_ints() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(-50i64..50, 0..24)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn sort_orders_and_keeps_every_element(xs in small_ints()) {
        let sorted = eval(&format!("(sort {})", vector_literal(&xs)))?;
        let mut expected = xs.clone();
        expected.sort();
        prop_assert_eq!(sorted, ints(expected));
    }

    #[test]
    fn sort_with_comparator_reverses(xs in small_ints()) {
        let sorted = eval(&format!("(sort > {})", vector_literal(&xs)))?;
        let mut expected = xs.clone();
        expected.sort_by(|a, b| b.cmp(a));
        prop_assert_eq!(sorted, ints(expected));
    }

    #[test]
    fn reverse_is_an_involution(xs in small_ints()) {
        let literal = vector_literal(&xs);
        prop_assert_eq!(eval(&format!("(reverse (reverse {}))", literal))?, eval(&literal)?);
    }

    #[test]
    fn sum_and_reduce_agree(xs in small_ints()) {
        let literal = vector_literal(&xs);
        let expected = Value::Integer(xs.iter().sum());
        prop_assert_eq!(eval(&format!("(sum {})", literal))?, expected.clone());
        prop_assert_eq!(eval(&format!("(reduce + 0 {})", literal))?, expected.clone());
        prop_assert_eq!(eval(&format!("(apply + {})", literal))?, expected);
    }

    #[test]
    fn distinct_keeps_first_occurrences(xs in small_ints()) {
        let mut seen = HashSet::new();
        let expected: Vec<i64> = xs.iter().copied().filter(|x| seen.insert(*x)).collect();
        prop_assert_eq!(eval(&format!("(distinct {})", vector_literal(&xs)))?, ints(expected));
    }

    #[test]
    fn take_and_drop_partition_the_input(xs in small_ints(), n in 0i64..30) {
        let literal = vector_literal(&xs);
        let joined = eval(&format!("(concat (take {n} {l}) (drop {n} {l}))", n = n, l = literal))?;
        prop_assert_eq!(joined, eval(&literal)?);
    }

    #[test]
    fn filter_and_remove_split_the_input(xs in small_ints()) {
        let literal = vector_literal(&xs);
        let evens = xs.iter().filter(|x| *x % 2 == 0).count() as i64;
        let counts = eval(&format!(
            "[(count (filter even? {l})) (count (remove even? {l}))]",
            l = literal
        ))?;
        prop_assert_eq!(counts, ints([evens, xs.len() as i64 - evens]));
    }

    #[test]
    fn frequencies_count_every_element(xs in small_ints()) {
        let total = eval(&format!("(sum (vals (frequencies {})))", vector_literal(&xs)))?;
        prop_assert_eq!(total, Value::Integer(xs.len() as i64));
    }

    #[test]
    fn group_by_loses_nothing(xs in small_ints()) {
        let total = eval(&format!(
            "(reduce + 0 (map count (vals (group-by #(mod % 3) {}))))",
            vector_literal(&xs)
        ))?;
        prop_assert_eq!(total, Value::Integer(xs.len() as i64));
    }

    #[test]
    fn map_preserves_length_and_order(xs in small_ints()) {
        let doubled = eval(&format!("(map #(* 2 %) {})", vector_literal(&xs)))?;
        prop_assert_eq!(doubled, ints(xs.iter().map(|x| x * 2)));
    }

    #[test]
    fn min_and_max_match_the_input(xs in prop::collection::vec(-50i64..50, 1..24)) {
        let literal = vector_literal(&xs);
        let expected = ints([
            *xs.iter().min().unwrap_or(&0),
            *xs.iter().max().unwrap_or(&0),
        ]);
        prop_assert_eq!(eval(&format!("[(apply min {l}) (apply max {l})]", l = literal))?, expected);
    }

    #[test]
    fn assoc_then_get(key in "[a-z]{1,6}", value in -1000i64..1000) {
        let got = eval(&format!("(get (assoc {{}} :{k} {v}) :{k})", k = key, v = value))?;
        prop_assert_eq!(got, Value::Integer(value));
    }

    #[test]
    fn arithmetic_identities(x in -1_000_000i64..1_000_000, f in -1000.0f64..1000.0) {
        prop_assert_eq!(eval(&format!("(+ {} 0)", x))?, Value::Integer(x));
        prop_assert_eq!(eval(&format!("(* {} 1)", x))?, Value::Integer(x));
        prop_assert_eq!(eval(&format!("(- {x} {x})", x = x))?, Value::Integer(0));
        let literal = format!("{:.3}", f);
        prop_assert_eq!(eval(&format!("(= (+ {} 0) {})", literal, literal))?, Value::Boolean(true));
    }

    #[test]
    fn exactly_one_primitive_type_predicate_holds(
        literal in prop_oneof![
            Just("nil".to_string()),
            any::<bool>().prop_map(|b| b.to_string()),
            (-1000i64..1000).prop_map(|i| i.to_string()),
            (-1000i64..1000).prop_map(|i| format!("{}.5", i)),
            "[a-z ]{0,8}".prop_map(|s| format!("\"{}\"", s)),
        ]
    ) {
        let flags = eval(&format!(
            "(let [v {}] (count (filter identity [(nil? v) (boolean? v) (number? v) (string? v)])))",
            literal
        ))?;
        prop_assert_eq!(flags, Value::Integer(1));
    }
}

#[test]
fn memory_put_returns_the_value_and_leaves_the_input_alone() {
    let first = run("(memory/put :count 42)", ExecutionRequest::new()).unwrap();
    assert_eq!(first.value, Value::Integer(42));
    assert_eq!(first.memory.get("count"), Some(&Value::Integer(42)));

    let second = run(
        "(memory/get :count)",
        ExecutionRequest::new().with_memory(first.memory.clone()),
    )
    .unwrap();
    assert_eq!(second.value, Value::Integer(42));
    assert_eq!(second.memory, first.memory);
}
