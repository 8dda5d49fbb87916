//! Side-effect-free expression evaluation.
//!
//! Given an expression and an evaluation context (rule-local bindings, the
//! bound signal payload if any, and the agent's state), produce a value.
//! Faults never throw: they are pushed onto the fault list and the
//! expression evaluates to `Null`, the bottom value.
//!
//! Name resolution order: rule locals (innermost first), then the signal
//! binding identifier, then the payload's own fields, then agent state.
//! Unresolved identifiers evaluate to `Null` without raising.

use crate::error::{raise, FaultKind, Faults};
use crate::value::Value;
use indexmap::IndexMap;
use mycelia_dsl::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use std::time::{SystemTime, UNIX_EPOCH};

/// Evaluation context: read-only views of everything an expression may
/// reference.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub state: &'a IndexMap<String, Value>,
    /// `(binding identifier, payload)` when the rule's trigger bound one
    pub binding: Option<(&'a str, &'a IndexMap<String, Value>)>,
    /// Scope stack of `let` bindings, outermost first
    pub locals: &'a [IndexMap<String, Value>],
}

impl<'a> EvalContext<'a> {
    fn resolve(&self, name: &str) -> Option<Value> {
        for scope in self.locals.iter().rev() {
            if let Some(value) = scope.get(name) {
                return Some(value.clone());
            }
        }
        if let Some((binding, payload)) = self.binding {
            if name == binding {
                return Some(Value::Record {
                    tag: String::new(),
                    fields: (*payload).clone(),
                });
            }
            if let Some(value) = payload.get(name) {
                return Some(value.clone());
            }
        }
        self.state.get(name).cloned()
    }
}

pub fn eval(expr: &Expr, ctx: &EvalContext, faults: &mut Faults) -> Value {
    match &expr.kind {
        ExprKind::Integer(v) => Value::Integer(*v),
        ExprKind::Float(v) => Value::Float(*v),
        ExprKind::Bool(b) => Value::Bool(*b),
        ExprKind::Str(s) => Value::Str(s.clone()),
        ExprKind::Identifier(name) => ctx.resolve(name).unwrap_or(Value::Null),
        ExprKind::FieldAccess { object, field } => {
            let object = eval(object, ctx, faults);
            match object {
                Value::Record { fields, .. } => fields.get(field).cloned().unwrap_or(Value::Null),
                Value::Map(entries) => entries.get(field).cloned().unwrap_or(Value::Null),
                Value::Null => Value::Null,
                other => raise(
                    faults,
                    FaultKind::TypeError,
                    format!("cannot access field `{}` on {}", field, other.type_name()),
                ),
            }
        }
        ExprKind::Binary { op, left, right } => eval_binary(*op, left, right, ctx, faults),
        ExprKind::Unary { op, operand } => {
            let value = eval(operand, ctx, faults);
            match op {
                UnaryOp::Not => Value::Bool(!value.is_truthy()),
                UnaryOp::Neg => match value {
                    Value::Integer(v) => Value::Integer(v.wrapping_neg()),
                    Value::Float(v) => Value::Float(-v),
                    Value::Null => Value::Null,
                    other => raise(
                        faults,
                        FaultKind::TypeError,
                        format!("cannot negate {}", other.type_name()),
                    ),
                },
            }
        }
        ExprKind::Call { name, args } => {
            let values: Vec<Value> = args.iter().map(|a| eval(a, ctx, faults)).collect();
            call_builtin(name, &values, faults)
        }
        ExprKind::Object { tag, fields } => {
            let mut record = IndexMap::new();
            for (name, value_expr) in fields {
                record.insert(name.clone(), eval(value_expr, ctx, faults));
            }
            Value::Record {
                tag: tag.clone(),
                fields: record,
            }
        }
    }
}

fn eval_binary(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    ctx: &EvalContext,
    faults: &mut Faults,
) -> Value {
    // Short-circuit forms evaluate the right side only when needed.
    match op {
        BinaryOp::And => {
            let lhs = eval(left, ctx, faults);
            if !lhs.is_truthy() {
                return Value::Bool(false);
            }
            return Value::Bool(eval(right, ctx, faults).is_truthy());
        }
        BinaryOp::Or => {
            let lhs = eval(left, ctx, faults);
            if lhs.is_truthy() {
                return Value::Bool(true);
            }
            return Value::Bool(eval(right, ctx, faults).is_truthy());
        }
        _ => {}
    }

    let lhs = eval(left, ctx, faults);
    let rhs = eval(right, ctx, faults);
    match op {
        BinaryOp::Eq => Value::Bool(lhs == rhs),
        BinaryOp::Ne => Value::Bool(lhs != rhs),
        BinaryOp::Add => match (&lhs, &rhs) {
            (Value::Str(a), Value::Str(b)) => Value::Str(format!("{}{}", a, b)),
            _ => arithmetic(op, &lhs, &rhs, faults),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            arithmetic(op, &lhs, &rhs, faults)
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let (Some(a), Some(b)) = (lhs.as_f64(), rhs.as_f64()) else {
                return raise(
                    faults,
                    FaultKind::TypeError,
                    format!(
                        "cannot compare {} and {}",
                        lhs.type_name(),
                        rhs.type_name()
                    ),
                );
            };
            Value::Bool(match op {
                BinaryOp::Lt => a < b,
                BinaryOp::Le => a <= b,
                BinaryOp::Gt => a > b,
                BinaryOp::Ge => a >= b,
                _ => unreachable!(),
            })
        }
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    }
}

/// `+ - * / %` with widening: float dominates integer. Division and
/// remainder by zero yield bottom plus a fault.
fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value, faults: &mut Faults) -> Value {
    match (lhs, rhs) {
        (Value::Integer(a), Value::Integer(b)) => {
            let (a, b) = (*a, *b);
            match op {
                BinaryOp::Add => Value::Integer(a.wrapping_add(b)),
                BinaryOp::Sub => Value::Integer(a.wrapping_sub(b)),
                BinaryOp::Mul => Value::Integer(a.wrapping_mul(b)),
                BinaryOp::Div if b == 0 => {
                    raise(faults, FaultKind::DivideByZero, "division by zero")
                }
                BinaryOp::Div => Value::Integer(a.wrapping_div(b)),
                BinaryOp::Rem if b == 0 => {
                    raise(faults, FaultKind::DivideByZero, "remainder by zero")
                }
                BinaryOp::Rem => Value::Integer(a.wrapping_rem(b)),
                _ => unreachable!(),
            }
        }
        _ => {
            let (Some(a), Some(b)) = (lhs.as_f64(), rhs.as_f64()) else {
                return raise(
                    faults,
                    FaultKind::TypeError,
                    format!(
                        "operator has no meaning for {} and {}",
                        lhs.type_name(),
                        rhs.type_name()
                    ),
                );
            };
            match op {
                BinaryOp::Add => Value::Float(a + b),
                BinaryOp::Sub => Value::Float(a - b),
                BinaryOp::Mul => Value::Float(a * b),
                BinaryOp::Div if b == 0.0 => {
                    raise(faults, FaultKind::DivideByZero, "division by zero")
                }
                BinaryOp::Div => Value::Float(a / b),
                BinaryOp::Rem if b == 0.0 => {
                    raise(faults, FaultKind::DivideByZero, "remainder by zero")
                }
                BinaryOp::Rem => Value::Float(a % b),
                _ => unreachable!(),
            }
        }
    }
}

/// Builtin registry. Unknown names yield bottom plus a fault.
fn call_builtin(name: &str, args: &[Value], faults: &mut Faults) -> Value {
    match name {
        "format" => builtin_format(args, faults),
        "len" => builtin_len(args, faults),
        "sum" => builtin_sum(args, faults),
        "mean" => builtin_mean(args, faults),
        "now" => {
            let millis = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as i64)
                .unwrap_or(0);
            Value::Integer(millis)
        }
        other => raise(
            faults,
            FaultKind::UnknownFunction,
            format!("unknown function `{}`", other),
        ),
    }
}

/// `format(fmt, ...)` substitutes `{}` placeholders left to right.
fn builtin_format(args: &[Value], faults: &mut Faults) -> Value {
    let Some(Value::Str(template)) = args.first() else {
        return raise(
            faults,
            FaultKind::TypeError,
            "format() takes a string template as its first argument",
        );
    };
    let mut out = String::with_capacity(template.len());
    let mut rest = template.as_str();
    let mut next = 1;
    while let Some(idx) = rest.find("{}") {
        out.push_str(&rest[..idx]);
        match args.get(next) {
            Some(value) => {
                out.push_str(&value.to_string());
                next += 1;
            }
            None => out.push_str("{}"),
        }
        rest = &rest[idx + 2..];
    }
    out.push_str(rest);
    Value::Str(out)
}

fn builtin_len(args: &[Value], faults: &mut Faults) -> Value {
    match args.first() {
        Some(Value::Str(s)) => Value::Integer(s.chars().count() as i64),
        Some(Value::Bytes(b)) => Value::Integer(b.len() as i64),
        Some(Value::List(v)) => Value::Integer(v.len() as i64),
        Some(Value::Queue(q)) => Value::Integer(q.len() as i64),
        Some(Value::Map(m)) => Value::Integer(m.len() as i64),
        Some(other) => raise(
            faults,
            FaultKind::TypeError,
            format!("len() has no meaning for {}", other.type_name()),
        ),
        None => raise(faults, FaultKind::TypeError, "len() takes one argument"),
    }
}

fn numeric_items(value: Option<&Value>) -> Option<Vec<f64>> {
    match value {
        Some(Value::List(items)) => Some(items.iter().filter_map(|v| v.as_f64()).collect()),
        Some(Value::Queue(items)) => Some(items.iter().filter_map(|v| v.as_f64()).collect()),
        _ => None,
    }
}

fn builtin_sum(args: &[Value], faults: &mut Faults) -> Value {
    match numeric_items(args.first()) {
        Some(items) => Value::Float(items.iter().sum()),
        None => raise(faults, FaultKind::TypeError, "sum() takes a vec or queue"),
    }
}

/// Numeric average; an empty collection yields 0.
fn builtin_mean(args: &[Value], faults: &mut Faults) -> Value {
    match numeric_items(args.first()) {
        Some(items) if items.is_empty() => Value::Float(0.0),
        Some(items) => Value::Float(items.iter().sum::<f64>() / items.len() as f64),
        None => raise(faults, FaultKind::TypeError, "mean() takes a vec or queue"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mycelia_dsl::lexer::lex;
    use mycelia_dsl::parser::parse_expr;

    fn eval_with(source: &str, state: IndexMap<String, Value>) -> (Value, Faults) {
        let (tokens, _) = lex(source, 0);
        let expr = parse_expr(&tokens, 0).expect("parse failed");
        let ctx = EvalContext {
            state: &state,
            binding: None,
            locals: &[],
        };
        let mut faults = Vec::new();
        let value = eval(&expr, &ctx, &mut faults);
        (value, faults)
    }

    fn eval_str(source: &str) -> Value {
        eval_with(source, IndexMap::new()).0
    }

    #[test]
    fn test_integer_arithmetic_stays_integer() {
        assert_eq!(eval_str("2 + 3 * 4"), Value::Integer(14));
        assert_eq!(eval_str("7 / 2"), Value::Integer(3));
        assert_eq!(eval_str("7 % 2"), Value::Integer(1));
    }

    #[test]
    fn test_mixed_arithmetic_widens_to_float() {
        assert_eq!(eval_str("1 + 0.5"), Value::Float(1.5));
        assert_eq!(eval_str("3.0 * 2"), Value::Float(6.0));
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(eval_str("\"ab\" + \"cd\""), Value::Str("abcd".into()));
    }

    #[test]
    fn test_divide_by_zero_is_bottom_plus_fault() {
        let (value, faults) = eval_with("1 / 0", IndexMap::new());
        assert_eq!(value, Value::Null);
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].kind, FaultKind::DivideByZero);
    }

    #[test]
    fn test_unresolved_identifier_is_silent_bottom() {
        let (value, faults) = eval_with("missing", IndexMap::new());
        assert_eq!(value, Value::Null);
        assert!(faults.is_empty());
    }

    #[test]
    fn test_state_lookup() {
        let mut state = IndexMap::new();
        state.insert("count".to_string(), Value::Integer(4));
        let (value, _) = eval_with("count + 1", state);
        assert_eq!(value, Value::Integer(5));
    }

    #[test]
    fn test_payload_shadows_state() {
        let mut state = IndexMap::new();
        state.insert("n".to_string(), Value::Integer(1));
        let mut payload = IndexMap::new();
        payload.insert("n".to_string(), Value::Integer(9));

        let (tokens, _) = lex("n", 0);
        let expr = parse_expr(&tokens, 0).unwrap();
        let ctx = EvalContext {
            state: &state,
            binding: Some(("sig", &payload)),
            locals: &[],
        };
        let mut faults = Vec::new();
        assert_eq!(eval(&expr, &ctx, &mut faults), Value::Integer(9));
    }

    #[test]
    fn test_binding_field_access() {
        let state = IndexMap::new();
        let mut payload = IndexMap::new();
        payload.insert("name".to_string(), Value::Str("world".into()));

        let (tokens, _) = lex("g.name", 0);
        let expr = parse_expr(&tokens, 0).unwrap();
        let ctx = EvalContext {
            state: &state,
            binding: Some(("g", &payload)),
            locals: &[],
        };
        let mut faults = Vec::new();
        assert_eq!(
            eval(&expr, &ctx, &mut faults),
            Value::Str("world".into())
        );
    }

    #[test]
    fn test_short_circuit_suppresses_rhs_faults() {
        let (value, faults) = eval_with("false && 1 / 0 == 1", IndexMap::new());
        assert_eq!(value, Value::Bool(false));
        assert!(faults.is_empty());

        let (value, faults) = eval_with("true || 1 / 0 == 1", IndexMap::new());
        assert_eq!(value, Value::Bool(true));
        assert!(faults.is_empty());
    }

    #[test]
    fn test_strict_equality() {
        assert_eq!(eval_str("1 == 1.0"), Value::Bool(false));
        assert_eq!(eval_str("1 != 1.0"), Value::Bool(true));
        assert_eq!(eval_str("\"a\" == \"a\""), Value::Bool(true));
    }

    #[test]
    fn test_relational_coerces_numerics() {
        assert_eq!(eval_str("1 < 1.5"), Value::Bool(true));
        assert_eq!(eval_str("2 >= 2"), Value::Bool(true));
    }

    #[test]
    fn test_format_substitutes_left_to_right() {
        assert_eq!(
            eval_str("format(\"{} + {} = {}\", 1, 2, 3)"),
            Value::Str("1 + 2 = 3".into())
        );
        // placeholders beyond the argument list survive
        assert_eq!(
            eval_str("format(\"{} {}\", \"only\")"),
            Value::Str("only {}".into())
        );
    }

    #[test]
    fn test_unknown_function_is_bottom_plus_fault() {
        let (value, faults) = eval_with("mystery(1)", IndexMap::new());
        assert_eq!(value, Value::Null);
        assert_eq!(faults[0].kind, FaultKind::UnknownFunction);
    }

    #[test]
    fn test_len_and_sum_and_mean() {
        let mut state = IndexMap::new();
        state.insert(
            "xs".to_string(),
            Value::List(vec![
                Value::Integer(1),
                Value::Integer(2),
                Value::Integer(3),
            ]),
        );
        state.insert("empty".to_string(), Value::List(Vec::new()));
        assert_eq!(eval_with("len(xs)", state.clone()).0, Value::Integer(3));
        assert_eq!(eval_with("sum(xs)", state.clone()).0, Value::Float(6.0));
        assert_eq!(eval_with("mean(xs)", state.clone()).0, Value::Float(2.0));
        assert_eq!(eval_with("mean(empty)", state).0, Value::Float(0.0));
        assert_eq!(eval_str("len(\"abcd\")"), Value::Integer(4));
    }

    #[test]
    fn test_object_construction_evaluates_fields_in_order() {
        let (value, _) = eval_with("task { p: 1 + 1, label: \"t\" }", IndexMap::new());
        match value {
            Value::Record { tag, fields } => {
                assert_eq!(tag, "task");
                assert_eq!(fields.get("p"), Some(&Value::Integer(2)));
                assert_eq!(
                    fields.keys().collect::<Vec<_>>(),
                    vec!["p", "label"]
                );
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_field_access_on_null_stays_silent() {
        let (value, faults) = eval_with("ghost.field", IndexMap::new());
        assert_eq!(value, Value::Null);
        assert!(faults.is_empty());
    }
}
