use pretty_assertions::assert_eq;
use ptc_lisp::{run, ErrorKind, ExecutionRequest, PtcError, Value};
use serde_json::json;

fn eval(source: &str) -> Value {
    eval_with(source, ExecutionRequest::new())
}

fn eval_with(source: &str, request: ExecutionRequest) -> Value {
    match run(source, request) {
        Ok(output) => output.value,
        Err(e) => panic!("{} failed: {}", source, e),
    }
}

fn eval_err(source: &str) -> PtcError {
    match run(source, ExecutionRequest::new()) {
        Ok(output) => panic!("{} unexpectedly returned {}", source, output.value),
        Err(e) => e,
    }
}

#[test]
fn literals_and_collections() {
    assert_eq!(eval("nil"), Value::Nil);
    assert_eq!(eval("42"), Value::Integer(42));
    assert_eq!(eval("\"hi\""), Value::string("hi"));
    assert_eq!(eval(":done"), Value::keyword("done"));
    assert_eq!(
        eval("[1 (+ 1 1) :three]"),
        Value::vector(vec![Value::Integer(1), Value::Integer(2), Value::keyword("three")])
    );
    assert_eq!(eval("{:a (* 2 3)}"), Value::keyword_map([("a", Value::Integer(6))]));
    assert_eq!(eval("(count #{1 2 2 3})"), Value::Integer(3));
}

#[test]
fn truthiness_only_nil_and_false_are_falsy() {
    assert_eq!(eval("(if 0 :t :f)"), Value::keyword("t"));
    assert_eq!(eval("(if \"\" :t :f)"), Value::keyword("t"));
    assert_eq!(eval("(if [] :t :f)"), Value::keyword("t"));
    assert_eq!(eval("(if nil :t :f)"), Value::keyword("f"));
    assert_eq!(eval("(if false :t :f)"), Value::keyword("f"));
    assert_eq!(eval("(if false :t)"), Value::Nil);
}

#[test]
fn and_or_return_the_deciding_value() {
    assert_eq!(eval("(and 1 2 3)"), Value::Integer(3));
    assert_eq!(eval("(and 1 nil 3)"), Value::Nil);
    assert_eq!(eval("(and)"), Value::Boolean(true));
    assert_eq!(eval("(or nil false 7)"), Value::Integer(7));
    assert_eq!(eval("(or nil false)"), Value::Boolean(false));
    assert_eq!(eval("(or)"), Value::Nil);
}

#[test]
fn let_binds_sequentially_and_destructures() {
    assert_eq!(eval("(let [a 1 b (+ a 1)] (* a b))"), Value::Integer(2));
    assert_eq!(eval("(let [[x _ z] [1 2 3]] [x z])"), eval("[1 3]"));
    assert_eq!(eval("(let [[h & t] [1 2 3]] t)"), eval("[2 3]"));
    assert_eq!(eval("(let [[h & t] [1]] t)"), Value::Nil);
    assert_eq!(
        eval("(let [{:keys [name age] :or {age 0}} {:name \"Ada\"}] [name age])"),
        eval("[\"Ada\" 0]")
    );
    assert_eq!(eval("(let [{n :n :as all} {:n 5}] [n (count all)])"), eval("[5 1]"));
    assert_eq!(eval("(let [{:strs [id]} {\"id\" 9}] id)"), Value::Integer(9));
}

#[test]
fn destructuring_mismatch_is_reported_clearly() {
    let err = eval_err("(let [{:keys [a]} [1 2]] a)");
    assert_eq!(err.kind, ErrorKind::ExecutionError);
    assert!(err.message.contains("destructuring failed"), "{}", err.message);
    assert!(err.message.contains("expected a map, got vector"), "{}", err.message);

    let err = eval_err("((fn [[a b]] a) {:x 1})");
    assert!(err.message.contains("expected a vector, got map"), "{}", err.message);
}

#[test]
fn closures_capture_their_defining_scope() {
    assert_eq!(
        eval("(let [n 10 add-n (fn [x] (+ x n)) n 99] (add-n 1))"),
        Value::Integer(11)
    );
    assert_eq!(
        eval("(let [make (fn [k] (fn [m] (get m k)))] ((make :a) {:a 3}))"),
        Value::Integer(3)
    );
}

#[test]
fn defn_supports_recursion_and_last_definition_wins() {
    assert_eq!(
        eval("(defn fact [n] (if (<= n 1) 1 (* n (fact (dec n))))) (fact 10)"),
        Value::Integer(3_628_800)
    );
    assert_eq!(eval("(def x 1) (def x 2) x"), Value::Integer(2));
    assert_eq!(eval("(def limit 3)"), Value::Integer(3));
}

#[test]
fn rest_parameters() {
    assert_eq!(eval("((fn [a & more] [a more]) 1 2 3)"), eval("[1 [2 3]]"));
    assert_eq!(eval("((fn [a & more] more) 1)"), Value::Nil);
}

#[test]
fn arity_errors_name_the_function() {
    let err = eval_err("(defn pair [a b] [a b]) (pair 1)");
    assert!(err.message.contains("'pair'"), "{}", err.message);
    assert!(err.message.contains("expected 2"), "{}", err.message);

    let err = eval_err("(get {:a 1})");
    assert!(err.message.contains("arity mismatch in 'get': expected 2 or 3"), "{}", err.message);

    let err = eval_err("(/)");
    assert!(err.message.contains("at least 1"), "{}", err.message);
}

#[test]
fn conditional_forms() {
    assert_eq!(eval("(cond (> 1 2) :a (> 2 1) :b :else :c)"), Value::keyword("b"));
    assert_eq!(eval("(cond false :a)"), Value::Nil);
    assert_eq!(eval("(when true 1 2)"), Value::Integer(2));
    assert_eq!(eval("(when-not true 1)"), Value::Nil);
    assert_eq!(eval("(if-not false :yes :no)"), Value::keyword("yes"));
    assert_eq!(eval("(if-let [x (get {:a 5} :a)] (inc x) :none)"), Value::Integer(6));
    assert_eq!(eval("(if-let [x (get {:a 5} :b)] (inc x) :none)"), Value::keyword("none"));
    assert_eq!(eval("(when-let [[a] [7]] (* a 2))"), Value::Integer(14));
}

#[test]
fn threading_macros() {
    assert_eq!(eval("(-> {:a 1} (assoc :b 2) (get :b))"), Value::Integer(2));
    assert_eq!(
        eval("(->> [1 2 3 4] (filter even?) (map inc) (reduce +))"),
        Value::Integer(8)
    );
}

#[test]
fn keywords_maps_and_sets_are_callable() {
    assert_eq!(eval("(:a {:a 1})"), Value::Integer(1));
    assert_eq!(eval("(:b {:a 1} :missing)"), Value::keyword("missing"));
    assert_eq!(eval("({:a 1} :a)"), Value::Integer(1));
    assert_eq!(eval("(#{1 2} 2)"), Value::Integer(2));
    assert_eq!(eval("(#{1 2} 3)"), Value::Nil);
    assert_eq!(eval("(map :id [{:id 1} {:id 2}])"), eval("[1 2]"));
}

#[test]
fn short_anonymous_functions() {
    assert_eq!(eval("(map #(* % %) [1 2 3])"), eval("[1 4 9]"));
    assert_eq!(eval("(#(+ %1 %2) 3 4)"), Value::Integer(7));
    assert_eq!(eval("(#(count %&) 1 2 3)"), Value::Integer(3));
}

#[test]
fn where_predicates_and_combinators() {
    let users = "[{:name \"a\" :age 30 :tags [\"admin\"]} {:name \"b\" :age 17 :tags []} {:name \"c\" :age nil :active true}]";
    assert_eq!(
        eval(&format!("(map :name (filter (where :age > 18) {}))", users)),
        eval("[\"a\"]")
    );
    assert_eq!(
        eval(&format!("(map :name (filter (where :age < 18) {}))", users)),
        eval("[\"b\"]")
    );
    assert_eq!(
        eval(&format!("(map :name (filter (where :active) {}))", users)),
        eval("[\"c\"]")
    );
    assert_eq!(
        eval(&format!("(map :name (filter (where :tags includes \"admin\") {}))", users)),
        eval("[\"a\"]")
    );
    assert_eq!(
        eval(&format!("(map :name (filter (where :name in [\"b\" \"c\"]) {}))", users)),
        eval("[\"b\" \"c\"]")
    );
    assert_eq!(
        eval(&format!(
            "(map :name (filter (any-of (where :age > 20) (where :active)) {}))",
            users
        )),
        eval("[\"a\" \"c\"]")
    );
    assert_eq!(
        eval(&format!(
            "(map :name (filter (none-of (where :age > 20) (where :active)) {}))",
            users
        )),
        eval("[\"b\"]")
    );
    assert_eq!(
        eval("(count (filter (all-of (where :x = 1) (where :y not= 2)) [{:x 1 :y 3} {:x 1 :y 2}]))"),
        Value::Integer(1)
    );
    assert_eq!(
        eval("(find (where [:user :id] = 2) [{:user {:id 1}} {:user {:id 2}}])"),
        eval("{:user {:id 2}}")
    );
}

#[test]
fn context_and_data_namespaces() {
    let request = ExecutionRequest::new()
        .with_context(json!({"user": {"name": "Ada"}, "limit": 2}))
        .with_data(json!({"rows": [1, 2, 3]}));
    assert_eq!(
        eval_with("[(:name ctx/user) (take ctx/limit data/rows) ctx/missing]", request),
        eval("[\"Ada\" [1 2] nil]")
    );
}

#[test]
fn bare_names_fall_back_to_context_data_and_memory() {
    let request = ExecutionRequest::new()
        .with_context(json!({"threshold": 5}))
        .with_data(json!({"items": [3, 6, 9]}));
    assert_eq!(
        eval_with("(count (filter #(> % threshold) items))", request),
        Value::Integer(2)
    );
    assert_eq!(eval("(do (memory/put :seen 4) (inc seen))"), Value::Integer(5));
}

#[test]
fn ambiguous_bare_names_are_rejected() {
    let request = ExecutionRequest::new()
        .with_context(json!({"items": [1]}))
        .with_data(json!({"items": [2]}));
    let err = run("(count items)", request).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ExecutionError);
    assert!(err.message.contains("ambiguous reference 'items'"), "{}", err.message);
    assert!(err.message.contains("ctx/items"), "{}", err.message);
}

#[test]
fn unbound_names_suggest_alternatives() {
    let request = ExecutionRequest::new().with_context(json!({"orders": []}));
    let err = run("(count ordrs)", request).unwrap_err();
    assert!(err.message.contains("unbound symbol 'ordrs'"), "{}", err.message);
    assert!(err.message.contains("Did you mean"), "{}", err.message);
    assert!(err.message.contains("orders"), "{}", err.message);
}

#[test]
fn budget_is_whatever_the_caller_injected() {
    assert_eq!(eval("budget/remaining"), Value::empty_map());
    let request = ExecutionRequest::new().with_budget(json!({"turns": 3}));
    assert_eq!(eval_with("(:turns (budget/remaining))", request), Value::Integer(3));
}

#[test]
fn numeric_equality_is_loose_but_keys_are_strict() {
    assert_eq!(eval("(= 1 1.0)"), Value::Boolean(true));
    assert_eq!(eval("(= [1 2] [1.0 2])"), Value::Boolean(true));
    assert_eq!(eval("(= {:a 1 :b 2} {:b 2 :a 1})"), Value::Boolean(true));
    assert_eq!(eval("(get {1 :int} 1.0)"), Value::Nil);
}

#[test]
fn runtime_errors_name_the_operation() {
    let err = eval_err("(+ 1 \"two\")");
    assert!(err.message.contains("'+'"), "{}", err.message);
    let err = eval_err("(nth [1 2] 5)");
    assert!(err.message.contains("out of bounds"), "{}", err.message);
    let err = eval_err("(1 2)");
    assert_eq!(err.kind, ErrorKind::AnalyzeError);
}
