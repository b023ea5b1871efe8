use ptc_lisp::{compile, ErrorKind, PtcError};

fn analyze_err(source: &str) -> PtcError {
    match compile(source) {
        Ok(node) => panic!("{} unexpectedly analyzed to {:?}", source, node),
        Err(e) => e,
    }
}

fn assert_rejected(source: &str, fragment: &str) {
    let err = analyze_err(source);
    assert_eq!(err.kind, ErrorKind::AnalyzeError, "{}: {}", source, err);
    assert!(
        err.message.contains(fragment),
        "{}: expected {:?} in {:?}",
        source,
        fragment,
        err.message
    );
}

#[test]
fn unknown_functions_list_alternatives() {
    let err = analyze_err("(fitler even? [1 2])");
    assert!(err.message.contains("unknown function 'fitler'"), "{}", err.message);
    assert!(err.message.contains("Did you mean"), "{}", err.message);
    assert!(err.message.contains("filter"), "{}", err.message);
    assert!(err.message.contains("available functions:"), "{}", err.message);
}

#[test]
fn malformed_special_forms() {
    assert_rejected("(if)", "invalid if form");
    assert_rejected("(if true 1 2 3)", "invalid if form");
    assert_rejected("(let [x] x)", "invalid let form");
    assert_rejected("(let x 1)", "invalid let form");
    assert_rejected("(cond true)", "even number");
    assert_rejected("(fn x)", "parameter vector");
    assert_rejected("(fn ([x] x) ([x y] y))", "multi-arity");
    assert_rejected("(where)", "invalid where form");
    assert_rejected("(where :a like 1)", "unknown operator like");
    assert_rejected("(->)", "initial value");
    assert_rejected("(call undefined-name 1)", "invalid call form");
}

#[test]
fn bad_patterns() {
    assert_rejected("(let [1 2] 3)", "invalid binding pattern");
    assert_rejected("(let [[a & b c] [1]] a)", "invalid binding pattern");
    assert_rejected("(let [{:keys [:a]} {}] 1)", "invalid binding pattern");
}

#[test]
fn definitions_only_in_body_position() {
    assert_rejected("(+ 1 (def x 2))", "only allowed at the top level");
    assert_rejected("[(defn f [] 1)]", "only allowed at the top level");
    assert!(compile("(let [y 1] (def x y) x)").is_ok());
    assert!(compile("(do (def x 1) (do (def y x)) x)").is_ok());
}

#[test]
fn def_docstrings_need_a_function() {
    assert_rejected("(def limit \"Upper bound.\" 10)", "docstring for 'limit'");
    assert!(compile("(def double \"Twice x.\" (fn [x] (* 2 x))) (double 4)").is_ok());
}

#[test]
fn special_forms_are_not_values() {
    assert_rejected("(map if [1 2])", "special form");
    assert_rejected("[let]", "special form");
}

#[test]
fn literal_heads_are_not_callable() {
    assert_rejected("(\"str\" 1)", "cannot call a");
    assert_rejected("(nil)", "cannot call a");
}

#[test]
fn namespace_misuse() {
    assert_rejected("tool/search", "invalid tool form");
    assert_rejected("budget/spent", "only budget/remaining");
    assert_rejected("(memory/put :a)", "expected (memory/put key value)");
    assert_rejected("(memory/get)", "expected (memory/get key)");
}

#[test]
fn short_fn_limits() {
    assert_rejected("#(map #(inc %) %)", "nested #()");
}

#[test]
fn keyword_heads_take_one_or_two_arguments() {
    assert!(compile("(:a {:a 1})").is_ok());
    assert!(compile("(:a {} 0)").is_ok());
    assert_eq!(analyze_err("(:a)").kind, ErrorKind::AnalyzeError);
    assert_eq!(analyze_err("(:a {} 0 1)").kind, ErrorKind::AnalyzeError);
}

#[test]
fn scope_is_lexical() {
    // x is only bound inside the let, so outside it is a global lookup, not an error
    assert!(compile("(do (let [x 1] x) x)").is_ok());
    // but a call head has to be known when the program is analyzed
    assert_rejected("(do (let [f inc] (f 1)) (f 2))", "unknown function 'f'");
}
