use std::collections::BTreeMap;

use serde_json::{Value, json};

use form_spec::{Answers, EvalContext, Expression, answers_or_empty, is_truthy};

fn expression(value: Value) -> Expression {
    serde_json::from_value(value).expect("expression")
}

fn truthy(expr: Value, answers: Value) -> bool {
    let answers: Answers = answers_or_empty(&answers);
    let conditions = BTreeMap::new();
    is_truthy(&expression(expr), &EvalContext::new(&answers, &conditions))
}

fn value(id: &str) -> Value {
    json!({ "type": "value", "id": id })
}

#[test]
fn equality_follows_loose_coercion() {
    let cases = [
        (json!({ "a": "1" }), json!(1), true),
        (json!({ "a": 0 }), json!(false), true),
        (json!({ "a": "" }), json!(0), true),
        (json!({ "a": null }), json!(0), false),
        (json!({}), Value::Null, true),
        (json!({ "a": "abc" }), json!("abc"), true),
        (json!({ "a": "abc" }), json!("ABC"), false),
    ];
    for (answers, right, expected) in cases {
        let expr = json!({ "type": "eq", "left": value("a"), "right": right });
        assert_eq!(truthy(expr, answers.clone()), expected, "{answers} == {right}");
    }
}

#[test]
fn relational_operators_compare_numerically() {
    let answers = json!({ "age": "21", "limit": 18 });
    let gt = json!({ "type": "gt", "left": value("age"), "right": value("limit") });
    let le = json!({ "type": "le", "left": value("age"), "right": 20 });
    let missing = json!({ "type": "lt", "left": value("nothing"), "right": 1 });
    assert!(truthy(gt, answers.clone()));
    assert!(!truthy(le, answers.clone()));
    assert!(!truthy(missing, answers));
}

#[test]
fn logical_operators_combine_truthiness() {
    let answers = json!({ "name": "Ada", "count": 0, "tags": [] });
    let and = json!({ "type": "and", "left": value("name"), "right": value("tags") });
    let or = json!({ "type": "or", "left": value("count"), "right": value("missing") });
    let not = json!({ "type": "not", "expression": value("count") });
    assert!(truthy(and, answers.clone()));
    assert!(!truthy(or, answers.clone()));
    assert!(truthy(not, answers));
}

#[test]
fn malformed_nodes_are_falsy_not_errors() {
    for raw in [
        json!({ "type": "between", "left": 1, "right": 2 }),
        json!({ "type": "value" }),
        json!({ "id": "a" }),
        json!([1, 2]),
    ] {
        assert!(!truthy(raw.clone(), json!({ "a": true })), "{raw}");
    }
}

#[test]
fn named_conditions_resolve_through_refs() {
    let answers: Answers = answers_or_empty(&json!({ "country": "nl", "age": 17 }));
    let mut conditions = BTreeMap::new();
    conditions.insert(
        "dutch".to_string(),
        expression(json!({ "type": "eq", "left": value("country"), "right": "nl" })),
    );
    conditions.insert(
        "adult_dutch".to_string(),
        expression(json!({
            "type": "and",
            "left": { "type": "ref", "id": "dutch" },
            "right": { "type": "ge", "left": value("age"), "right": 18 }
        })),
    );
    let ctx = EvalContext::new(&answers, &conditions);
    assert!(Expression::reference("dutch").is_truthy(&ctx));
    assert!(!Expression::reference("adult_dutch").is_truthy(&ctx));
    assert!(!Expression::reference("unknown").is_truthy(&ctx));
}
