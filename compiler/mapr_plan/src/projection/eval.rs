//! In-memory evaluation of projection expressions.
//!
//! Plays the role of a query provider over objects: a projection evaluated
//! here must produce the same destination as the compiled transform.

use smallvec::SmallVec;

use mapr_convert::convert_scalar;
use mapr_ir::{ensure_sufficient_stack, MapError, MapResult, Value};
use mapr_types::{SeqKind, TypePool};

use super::Expr;
use crate::collections::collect_seq;

type Env = SmallVec<[(u32, Value); 4]>;

impl Expr {
    /// Evaluate against `source`.
    pub fn evaluate(&self, pool: &TypePool, source: &Value) -> MapResult<Value> {
        let mut env = Env::new();
        eval(self, pool, source, &mut env)
    }
}

fn not_a_record(pool: &TypePool, value: &Value) -> MapError {
    let from = value
        .runtime_type()
        .map_or_else(|| "null".to_owned(), |t| pool.format_type(t));
    MapError::conversion(from, "record", format!("{value:?}"), "member access on a non-record value")
}

fn truthy(pool: &TypePool, value: &Value) -> MapResult<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Null => Ok(false),
        other => Err(MapError::conversion(
            other
                .runtime_type()
                .map_or_else(|| "null".to_owned(), |t| pool.format_type(t)),
            "bool",
            format!("{other:?}"),
            "condition is not boolean",
        )),
    }
}

fn eval(expr: &Expr, pool: &TypePool, source: &Value, env: &mut Env) -> MapResult<Value> {
    ensure_sufficient_stack(|| match expr {
        Expr::Source => Ok(source.clone()),
        Expr::Element(var) => env
            .iter()
            .rev()
            .find(|(bound, _)| bound == var)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| MapError::configuration("projection", format!("element {var} is not bound"))),
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Member { of, index, .. } => match eval(of, pool, source, env)? {
            Value::Null => Ok(Value::Null),
            Value::Object(obj) => Ok(obj.get(*index)),
            other => Err(not_a_record(pool, &other)),
        },
        Expr::Call { of, method } => match eval(of, pool, source, env)? {
            Value::Null => Ok(Value::Null),
            Value::Object(obj) => Ok(method.call(&obj)),
            other => Err(not_a_record(pool, &other)),
        },
        Expr::Convert { value, to } => convert_scalar(pool, &eval(value, pool, source, env)?, *to),
        Expr::IsNull(e) => Ok(Value::Bool(eval(e, pool, source, env)?.is_null())),
        Expr::Not(e) => Ok(Value::Bool(!truthy(pool, &eval(e, pool, source, env)?)?)),
        Expr::Conditional {
            test,
            then,
            otherwise,
        } => {
            if truthy(pool, &eval(test, pool, source, env)?)? {
                eval(then, pool, source, env)
            } else {
                eval(otherwise, pool, source, env)
            }
        }
        Expr::Coalesce(a, b) => match eval(a, pool, source, env)? {
            Value::Null => eval(b, pool, source, env),
            value => Ok(value),
        },
        Expr::New { ty, ctor, inits } => {
            let obj = pool.new_object(*ty)?;
            for init in ctor.iter().chain(inits) {
                let value = eval(&init.value, pool, source, env)?;
                obj.set(init.index, value);
            }
            Ok(Value::Object(obj))
        }
        Expr::Select {
            source: items,
            var,
            body,
            into,
        } => {
            let seq = match eval(items, pool, source, env)? {
                Value::Null => return Ok(Value::Null),
                Value::Seq(seq) => seq,
                other => {
                    return Err(MapError::conversion(
                        other
                            .runtime_type()
                            .map_or_else(|| "null".to_owned(), |t| pool.format_type(t)),
                        pool.format_type(*into),
                        format!("{other:?}"),
                        "select over a non-sequence value",
                    ))
                }
            };
            let mut out = Vec::with_capacity(seq.len());
            for item in seq.iter() {
                env.push((*var, item.clone()));
                let mapped = eval(body, pool, source, env);
                env.pop();
                out.push(mapped?);
            }
            let kind = pool.seq_elem(*into).map_or(SeqKind::List, |(kind, _)| kind);
            Ok(collect_seq(kind, *into, out))
        }
    })
}
