use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};
use tracing::warn;

use crate::answers::Answers;
use crate::coerce::Evaluated;
use crate::config::EngineConfig;
use crate::spec::FormSchema;

/// Node `type` tags understood by the evaluator.
pub const NODE_TYPES: &[&str] = &[
    "value", "ref", "not", "and", "or", "eq", "ne", "lt", "le", "gt", "ge",
];

/// Condition expression attached to effects and validation rules.
///
/// A leaf is either a bare primitive or a typed node. Anything else found in a
/// schema document is kept verbatim as `Unrecognized` and evaluates to `false`,
/// so half-authored schemas still render.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum Expression {
    Literal(Literal),
    Node(Node),
    Unrecognized(Value),
}

/// Self-evaluating primitive.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    /// Answer lookup.
    Value { id: String },
    /// Named condition declared under `refs.conditions`.
    Ref { id: String },
    Not {
        #[serde(
            default,
            deserialize_with = "present_operand",
            skip_serializing_if = "Option::is_none"
        )]
        #[schemars(with = "Option<Expression>")]
        expression: Option<Box<Expression>>,
    },
    And(Binary),
    Or(Binary),
    Eq(Binary),
    Ne(Binary),
    Lt(Binary),
    Le(Binary),
    Gt(Binary),
    Ge(Binary),
}

/// Operands of a binary node. A missing operand evaluates to undefined.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Binary {
    #[serde(
        default,
        deserialize_with = "present_operand",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<Expression>")]
    pub left: Option<Box<Expression>>,
    #[serde(
        default,
        deserialize_with = "present_operand",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<Expression>")]
    pub right: Option<Box<Expression>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

// An explicit `null` operand is a literal, not an absent one.
fn present_operand<'de, D>(deserializer: D) -> Result<Option<Box<Expression>>, D::Error>
where
    D: Deserializer<'de>,
{
    Expression::deserialize(deserializer).map(|expr| Some(Box::new(expr)))
}

impl<'de> Deserialize<'de> for Expression {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Expression::from_value)
    }
}

impl Expression {
    /// Classify a raw JSON value. Never fails.
    pub fn from_value(raw: Value) -> Self {
        let known_node = raw
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|kind| NODE_TYPES.contains(&kind));

        match raw {
            Value::Null => Expression::Literal(Literal::Null),
            Value::Bool(flag) => Expression::Literal(Literal::Bool(flag)),
            Value::Number(number) => Expression::Literal(Literal::Number(number)),
            Value::String(text) => Expression::Literal(Literal::String(text)),
            Value::Object(_) if known_node => match serde_json::from_value::<Node>(raw.clone()) {
                Ok(node) => Expression::Node(node),
                Err(_) => Expression::Unrecognized(raw),
            },
            other => Expression::Unrecognized(other),
        }
    }

    pub fn value(id: impl Into<String>) -> Self {
        Expression::Node(Node::Value { id: id.into() })
    }

    pub fn reference(id: impl Into<String>) -> Self {
        Expression::Node(Node::Ref { id: id.into() })
    }

    pub fn not(expression: impl Into<Expression>) -> Self {
        Expression::Node(Node::Not {
            expression: Some(Box::new(expression.into())),
        })
    }

    pub fn binary(op: BinaryOp, left: impl Into<Expression>, right: impl Into<Expression>) -> Self {
        let operands = Binary {
            left: Some(Box::new(left.into())),
            right: Some(Box::new(right.into())),
        };
        Expression::Node(match op {
            BinaryOp::And => Node::And(operands),
            BinaryOp::Or => Node::Or(operands),
            BinaryOp::Eq => Node::Eq(operands),
            BinaryOp::Ne => Node::Ne(operands),
            BinaryOp::Lt => Node::Lt(operands),
            BinaryOp::Le => Node::Le(operands),
            BinaryOp::Gt => Node::Gt(operands),
            BinaryOp::Ge => Node::Ge(operands),
        })
    }

    pub fn and(left: impl Into<Expression>, right: impl Into<Expression>) -> Self {
        Self::binary(BinaryOp::And, left, right)
    }

    pub fn or(left: impl Into<Expression>, right: impl Into<Expression>) -> Self {
        Self::binary(BinaryOp::Or, left, right)
    }

    pub fn eq(left: impl Into<Expression>, right: impl Into<Expression>) -> Self {
        Self::binary(BinaryOp::Eq, left, right)
    }

    pub fn ne(left: impl Into<Expression>, right: impl Into<Expression>) -> Self {
        Self::binary(BinaryOp::Ne, left, right)
    }

    pub fn lt(left: impl Into<Expression>, right: impl Into<Expression>) -> Self {
        Self::binary(BinaryOp::Lt, left, right)
    }

    pub fn le(left: impl Into<Expression>, right: impl Into<Expression>) -> Self {
        Self::binary(BinaryOp::Le, left, right)
    }

    pub fn gt(left: impl Into<Expression>, right: impl Into<Expression>) -> Self {
        Self::binary(BinaryOp::Gt, left, right)
    }

    pub fn ge(left: impl Into<Expression>, right: impl Into<Expression>) -> Self {
        Self::binary(BinaryOp::Ge, left, right)
    }

    /// Evaluates the expression against the answers in `ctx`.
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> Evaluated {
        let mut resolution = Resolution::default();
        self.eval_with(ctx, &mut resolution)
    }

    pub fn is_truthy(&self, ctx: &EvalContext<'_>) -> bool {
        self.evaluate(ctx).is_truthy()
    }

    fn eval_with(&self, ctx: &EvalContext<'_>, resolution: &mut Resolution) -> Evaluated {
        match self {
            Expression::Literal(literal) => Evaluated::Value(literal.to_value()),
            Expression::Unrecognized(_) => Evaluated::bool(false),
            Expression::Node(node) => node.eval_with(ctx, resolution),
        }
    }

    /// Visits this expression and every nested operand, depth first.
    /// Named conditions behind `ref` nodes are not followed.
    pub fn walk<'e>(&'e self, visit: &mut impl FnMut(&'e Expression)) {
        visit(self);
        if let Expression::Node(node) = self {
            match node {
                Node::Value { .. } | Node::Ref { .. } => {}
                Node::Not { expression } => {
                    if let Some(expression) = expression {
                        expression.walk(visit);
                    }
                }
                _ => {
                    if let Some((_, operands)) = node.as_binary() {
                        for operand in [&operands.left, &operands.right].into_iter().flatten() {
                            operand.walk(visit);
                        }
                    }
                }
            }
        }
    }

    /// Names of every named condition this expression refers to directly.
    pub fn referenced_conditions(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.walk(&mut |expr| {
            if let Expression::Node(Node::Ref { id }) = expr {
                names.push(id.as_str());
            }
        });
        names
    }
}

impl Node {
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Value { .. } => "value",
            Node::Ref { .. } => "ref",
            Node::Not { .. } => "not",
            Node::And(_) => "and",
            Node::Or(_) => "or",
            Node::Eq(_) => "eq",
            Node::Ne(_) => "ne",
            Node::Lt(_) => "lt",
            Node::Le(_) => "le",
            Node::Gt(_) => "gt",
            Node::Ge(_) => "ge",
        }
    }

    pub fn as_binary(&self) -> Option<(BinaryOp, &Binary)> {
        match self {
            Node::And(operands) => Some((BinaryOp::And, operands)),
            Node::Or(operands) => Some((BinaryOp::Or, operands)),
            Node::Eq(operands) => Some((BinaryOp::Eq, operands)),
            Node::Ne(operands) => Some((BinaryOp::Ne, operands)),
            Node::Lt(operands) => Some((BinaryOp::Lt, operands)),
            Node::Le(operands) => Some((BinaryOp::Le, operands)),
            Node::Gt(operands) => Some((BinaryOp::Gt, operands)),
            Node::Ge(operands) => Some((BinaryOp::Ge, operands)),
            Node::Value { .. } | Node::Ref { .. } | Node::Not { .. } => None,
        }
    }

    fn eval_with(&self, ctx: &EvalContext<'_>, resolution: &mut Resolution) -> Evaluated {
        match self {
            Node::Value { id } => ctx.answers.get(id).cloned().into(),
            Node::Ref { id } => ctx.resolve(id, resolution),
            Node::Not { expression } => {
                Evaluated::bool(!eval_operand(expression, ctx, resolution).is_truthy())
            }
            _ => match self.as_binary() {
                Some((op, operands)) => {
                    // Both sides are always evaluated.
                    let left = eval_operand(&operands.left, ctx, resolution);
                    let right = eval_operand(&operands.right, ctx, resolution);
                    Evaluated::bool(apply_binary(op, &left, &right))
                }
                None => Evaluated::bool(false),
            },
        }
    }
}

fn eval_operand(
    operand: &Option<Box<Expression>>,
    ctx: &EvalContext<'_>,
    resolution: &mut Resolution,
) -> Evaluated {
    match operand {
        Some(expression) => expression.eval_with(ctx, resolution),
        None => Evaluated::Undefined,
    }
}

fn apply_binary(op: BinaryOp, left: &Evaluated, right: &Evaluated) -> bool {
    match op {
        BinaryOp::And => left.is_truthy() && right.is_truthy(),
        BinaryOp::Or => left.is_truthy() || right.is_truthy(),
        BinaryOp::Eq => left.loose_eq(right),
        BinaryOp::Ne => !left.loose_eq(right),
        BinaryOp::Lt => left.to_number() < right.to_number(),
        BinaryOp::Le => left.to_number() <= right.to_number(),
        BinaryOp::Gt => left.to_number() > right.to_number(),
        BinaryOp::Ge => left.to_number() >= right.to_number(),
    }
}

impl Literal {
    pub fn to_value(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Bool(flag) => Value::Bool(*flag),
            Literal::Number(number) => Value::Number(number.clone()),
            Literal::String(text) => Value::String(text.clone()),
        }
    }
}

impl From<bool> for Expression {
    fn from(value: bool) -> Self {
        Expression::Literal(Literal::Bool(value))
    }
}

impl From<i64> for Expression {
    fn from(value: i64) -> Self {
        Expression::Literal(Literal::Number(value.into()))
    }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Self {
        Number::from_f64(value)
            .map(|number| Expression::Literal(Literal::Number(number)))
            .unwrap_or(Expression::Literal(Literal::Null))
    }
}

impl From<&str> for Expression {
    fn from(value: &str) -> Self {
        Expression::Literal(Literal::String(value.to_string()))
    }
}

impl From<String> for Expression {
    fn from(value: String) -> Self {
        Expression::Literal(Literal::String(value))
    }
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Expression::from_value(value)
    }
}

/// Everything an expression can look at while evaluating.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub answers: &'a Answers,
    pub conditions: &'a BTreeMap<String, Expression>,
    pub max_ref_depth: usize,
    pub max_ref_evaluations: usize,
}

/// Named condition currently being resolved.
#[derive(Debug)]
struct Frame {
    id: String,
    /// Tallest chain of refs resolved beneath this one.
    height: usize,
    /// A cycle, depth or budget cut happened beneath this one.
    cut_off: bool,
}

/// Per-evaluation ref bookkeeping: the resolution stack and the results
/// of refs already resolved without hitting a cut.
#[derive(Debug, Default)]
struct Resolution {
    stack: Vec<Frame>,
    resolved: BTreeMap<String, (Evaluated, usize)>,
    evaluations: usize,
    exhausted: bool,
}

impl Resolution {
    fn mark_cut_off(&mut self) {
        if let Some(frame) = self.stack.last_mut() {
            frame.cut_off = true;
        }
    }

    fn record_child(&mut self, height: usize, cut_off: bool) {
        if let Some(frame) = self.stack.last_mut() {
            frame.height = frame.height.max(height);
            frame.cut_off |= cut_off;
        }
    }
}

impl<'a> EvalContext<'a> {
    pub fn new(answers: &'a Answers, conditions: &'a BTreeMap<String, Expression>) -> Self {
        let defaults = EngineConfig::default();
        Self {
            answers,
            conditions,
            max_ref_depth: defaults.max_ref_depth,
            max_ref_evaluations: defaults.max_ref_evaluations,
        }
    }

    pub fn for_schema(schema: &'a FormSchema, answers: &'a Answers, config: &EngineConfig) -> Self {
        Self {
            answers,
            conditions: &schema.refs.conditions,
            max_ref_depth: config.max_ref_depth,
            max_ref_evaluations: config.max_ref_evaluations,
        }
    }

    fn resolve(&self, id: &str, resolution: &mut Resolution) -> Evaluated {
        let depth = resolution.stack.len();
        if resolution.stack.iter().any(|frame| frame.id == id) {
            let chain: Vec<&str> = resolution
                .stack
                .iter()
                .map(|frame| frame.id.as_str())
                .collect();
            warn!(reference = %id, ?chain, "cyclic condition reference");
            resolution.mark_cut_off();
            return Evaluated::Undefined;
        }
        // Ref graphs are walked in full, so a cut-free result only depends on
        // the answers. It stays valid wherever the remaining depth covers it.
        if let Some((value, height)) = resolution.resolved.get(id)
            && depth + height <= self.max_ref_depth
        {
            let (value, height) = (value.clone(), *height);
            resolution.record_child(height, false);
            return value;
        }
        if depth >= self.max_ref_depth {
            warn!(reference = %id, depth, "condition reference depth exceeded");
            resolution.mark_cut_off();
            return Evaluated::Undefined;
        }
        let Some(condition) = self.conditions.get(id) else {
            warn!(reference = %id, "unresolved condition reference");
            return Evaluated::Undefined;
        };
        if resolution.evaluations >= self.max_ref_evaluations {
            if !resolution.exhausted {
                warn!(
                    reference = %id,
                    budget = self.max_ref_evaluations,
                    "condition reference budget exhausted"
                );
                resolution.exhausted = true;
            }
            resolution.mark_cut_off();
            return Evaluated::Undefined;
        }
        resolution.evaluations += 1;

        resolution.stack.push(Frame {
            id: id.to_string(),
            height: 0,
            cut_off: false,
        });
        let value = condition.eval_with(self, resolution);
        let Some(frame) = resolution.stack.pop() else {
            return value;
        };
        let height = frame.height + 1;
        if !frame.cut_off {
            resolution.resolved.insert(frame.id, (value.clone(), height));
        }
        resolution.record_child(height, frame.cut_off);
        value
    }
}

/// Evaluates `expr` against the answers in `ctx`.
pub fn evaluate(expr: &Expression, ctx: &EvalContext<'_>) -> Evaluated {
    expr.evaluate(ctx)
}

pub fn is_truthy(expr: &Expression, ctx: &EvalContext<'_>) -> bool {
    expr.is_truthy(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn answers(value: Value) -> Answers {
        value.as_object().cloned().unwrap_or_default()
    }

    fn eval_in(expr: &Expression, answers: &Answers) -> Evaluated {
        let conditions = BTreeMap::new();
        expr.evaluate(&EvalContext::new(answers, &conditions))
    }

    #[test]
    fn primitives_evaluate_to_themselves() {
        let empty = Answers::new();
        assert_eq!(eval_in(&5.into(), &empty), json!(5).into());
        assert_eq!(eval_in(&"x".into(), &empty), json!("x").into());
        assert_eq!(eval_in(&true.into(), &empty), json!(true).into());
        assert_eq!(eval_in(&Value::Null.into(), &empty), json!(null).into());
    }

    #[test]
    fn value_lookup_returns_answer_or_undefined() {
        let state = answers(json!({ "a": 42 }));
        assert_eq!(eval_in(&Expression::value("a"), &state), json!(42).into());
        assert!(eval_in(&Expression::value("b"), &state).is_undefined());
    }

    #[test]
    fn parses_nodes_and_literals_from_json() {
        let expr: Expression = serde_json::from_value(json!({
            "type": "and",
            "left": { "type": "value", "id": "a" },
            "right": { "type": "not", "expression": false }
        }))
        .expect("expression");
        let state = answers(json!({ "a": "yes" }));
        assert_eq!(eval_in(&expr, &state), Evaluated::bool(true));
        assert_eq!(
            serde_json::to_value(&expr).expect("serialize")["right"]["expression"],
            json!(false)
        );
    }

    #[test]
    fn unknown_node_type_is_false_and_round_trips() {
        let raw = json!({ "type": "matches", "left": "a", "right": "b" });
        let expr: Expression = serde_json::from_value(raw.clone()).expect("expression");
        assert!(matches!(expr, Expression::Unrecognized(_)));
        assert_eq!(eval_in(&expr, &Answers::new()), Evaluated::bool(false));
        assert_eq!(serde_json::to_value(&expr).expect("serialize"), raw);

        let malformed: Expression =
            serde_json::from_value(json!({ "type": "value" })).expect("expression");
        assert!(matches!(malformed, Expression::Unrecognized(_)));
    }

    #[test]
    fn explicit_null_operand_differs_from_missing_operand() {
        let with_null: Expression =
            serde_json::from_value(json!({ "type": "lt", "left": null, "right": 1 }))
                .expect("expression");
        let missing: Expression =
            serde_json::from_value(json!({ "type": "lt", "right": 1 })).expect("expression");
        let empty = Answers::new();
        assert_eq!(eval_in(&with_null, &empty), Evaluated::bool(true));
        assert_eq!(eval_in(&missing, &empty), Evaluated::bool(false));
    }

    #[test]
    fn comparisons_coerce_numbers() {
        let expr = Expression::gt(Expression::value("a"), 10);
        assert!(eval_in(&expr, &answers(json!({ "a": "15" }))).is_truthy());
        assert!(!eval_in(&expr, &answers(json!({ "a": "abc" }))).is_truthy());
        let expr = Expression::le(Expression::value("a"), "3");
        assert!(eval_in(&expr, &answers(json!({ "a": 3 }))).is_truthy());
    }

    #[test]
    fn loose_equality_against_literals() {
        let expr = Expression::eq(Expression::value("a"), "1");
        assert_eq!(eval_in(&expr, &answers(json!({ "a": 1 }))), Evaluated::bool(true));
        let expr = Expression::ne(Expression::value("a"), true);
        assert_eq!(eval_in(&expr, &answers(json!({ "a": 1 }))), Evaluated::bool(false));
    }

    #[test]
    fn refs_resolve_and_guard_cycles() {
        let mut conditions = BTreeMap::new();
        conditions.insert(
            "adult".to_string(),
            Expression::ge(Expression::value("age"), 18),
        );
        conditions.insert("loop_a".to_string(), Expression::reference("loop_b"));
        conditions.insert("loop_b".to_string(), Expression::not(Expression::reference("loop_a")));

        let state = answers(json!({ "age": 21 }));
        let ctx = EvalContext::new(&state, &conditions);
        assert!(Expression::reference("adult").is_truthy(&ctx));
        assert!(Expression::reference("missing").evaluate(&ctx).is_undefined());
        // loop_a -> loop_b -> not(loop_a): the inner loop_a is cut to undefined.
        assert!(Expression::reference("loop_a").is_truthy(&ctx));
    }

    #[test]
    fn ref_depth_is_bounded() {
        let mut conditions = BTreeMap::new();
        for level in 0..5 {
            conditions.insert(
                format!("c{level}"),
                Expression::reference(format!("c{}", level + 1)),
            );
        }
        conditions.insert("c5".to_string(), true.into());
        let state = Answers::new();
        let mut ctx = EvalContext::new(&state, &conditions);
        assert!(Expression::reference("c0").is_truthy(&ctx));
        ctx.max_ref_depth = 3;
        assert!(!Expression::reference("c0").is_truthy(&ctx));
    }

    fn diamond(levels: usize) -> BTreeMap<String, Expression> {
        let mut conditions = BTreeMap::new();
        for level in 0..levels {
            let next = format!("c{}", level + 1);
            conditions.insert(
                format!("c{level}"),
                Expression::and(
                    Expression::reference(next.clone()),
                    Expression::reference(next),
                ),
            );
        }
        conditions.insert(
            format!("c{levels}"),
            Expression::eq(Expression::value("ready"), true),
        );
        conditions
    }

    #[test]
    fn shared_conditions_resolve_once_per_evaluation() {
        let conditions = diamond(30);
        let state = answers(json!({ "ready": true }));
        let ctx = EvalContext::new(&state, &conditions);
        let mut resolution = Resolution::default();
        let value = Expression::reference("c0").eval_with(&ctx, &mut resolution);
        assert_eq!(value, Evaluated::bool(true));
        assert_eq!(resolution.evaluations, 31);
        assert!(!resolution.exhausted);

        let idle = answers(json!({ "ready": false }));
        assert!(!Expression::reference("c0").is_truthy(&EvalContext::new(&idle, &conditions)));
    }

    #[test]
    fn cached_refs_still_respect_depth() {
        let mut conditions = diamond(2);
        // c2 is resolved at depth 1 first, then needed again at depth 3.
        conditions.insert(
            "top".to_string(),
            Expression::and(Expression::reference("c2"), Expression::reference("c0")),
        );
        let state = answers(json!({ "ready": true }));
        let mut ctx = EvalContext::new(&state, &conditions);
        assert!(Expression::reference("top").is_truthy(&ctx));
        ctx.max_ref_depth = 3;
        assert!(!Expression::reference("top").is_truthy(&ctx));
        assert!(Expression::reference("c0").is_truthy(&ctx));
    }

    #[test]
    fn cyclic_diamond_stops_at_budget() {
        let mut conditions = diamond(40);
        conditions.insert("c40".to_string(), Expression::reference("c0"));
        let state = Answers::new();
        let mut ctx = EvalContext::new(&state, &conditions);
        ctx.max_ref_depth = 64;
        let mut resolution = Resolution::default();
        let value = Expression::reference("c0").eval_with(&ctx, &mut resolution);
        assert_eq!(value, Evaluated::bool(false));
        assert!(resolution.exhausted);
        assert_eq!(resolution.evaluations, ctx.max_ref_evaluations);
    }

    #[test]
    fn collects_referenced_conditions() {
        let expr = Expression::and(
            Expression::reference("a"),
            Expression::not(Expression::or(Expression::reference("b"), false)),
        );
        assert_eq!(expr.referenced_conditions(), vec!["a", "b"]);
    }
}
