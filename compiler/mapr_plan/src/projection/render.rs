//! Human-readable rendering of projection expressions.
//!
//! ```text
//! new OrderDto { Id = src.Id, CustomerName = src.Customer.Name,
//!   Lines = (src.Lines.select(e0 => new LineDto { ... }) ?? []) }
//! ```

#![allow(clippy::format_push_string)]

use mapr_ir::Value;
use mapr_types::TypePool;

use super::{Expr, FieldInit};

impl Expr {
    pub fn render(&self, pool: &TypePool) -> String {
        let mut buf = String::new();
        self.render_into(pool, &mut buf);
        buf
    }

    fn render_into(&self, pool: &TypePool, buf: &mut String) {
        match self {
            Expr::Source => buf.push_str("src"),
            Expr::Element(var) => buf.push_str(&format!("e{var}")),
            Expr::Literal(value) => render_literal(pool, value, buf),
            Expr::Member { of, name, .. } => {
                of.render_into(pool, buf);
                buf.push('.');
                buf.push_str(pool.lookup_name(*name));
            }
            Expr::Call { of, method } => {
                of.render_into(pool, buf);
                buf.push('.');
                buf.push_str(pool.lookup_name(method.name));
                buf.push_str("()");
            }
            Expr::Convert { value, to } => {
                buf.push('(');
                pool.format_type_into(*to, buf);
                buf.push_str(") ");
                value.render_into(pool, buf);
            }
            Expr::IsNull(e) => {
                buf.push('(');
                e.render_into(pool, buf);
                buf.push_str(" == null)");
            }
            Expr::Not(e) => {
                buf.push('!');
                e.render_into(pool, buf);
            }
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => {
                buf.push('(');
                test.render_into(pool, buf);
                buf.push_str(" ? ");
                then.render_into(pool, buf);
                buf.push_str(" : ");
                otherwise.render_into(pool, buf);
                buf.push(')');
            }
            Expr::Coalesce(a, b) => {
                buf.push('(');
                a.render_into(pool, buf);
                buf.push_str(" ?? ");
                b.render_into(pool, buf);
                buf.push(')');
            }
            Expr::New { ty, ctor, inits } => {
                buf.push_str("new ");
                pool.format_type_into(*ty, buf);
                if !ctor.is_empty() {
                    buf.push('(');
                    for (i, init) in ctor.iter().enumerate() {
                        if i > 0 {
                            buf.push_str(", ");
                        }
                        init.value.render_into(pool, buf);
                    }
                    buf.push(')');
                }
                buf.push_str(" {");
                render_inits(pool, inits, buf);
                buf.push_str(" }");
            }
            Expr::Select {
                source, var, body, ..
            } => {
                source.render_into(pool, buf);
                buf.push_str(&format!(".select(e{var} => "));
                body.render_into(pool, buf);
                buf.push(')');
            }
        }
    }
}

fn render_inits(pool: &TypePool, inits: &[FieldInit], buf: &mut String) {
    for (i, init) in inits.iter().enumerate() {
        buf.push_str(if i == 0 { " " } else { ", " });
        buf.push_str(pool.lookup_name(init.name));
        buf.push_str(" = ");
        init.value.render_into(pool, buf);
    }
}

fn render_literal(pool: &TypePool, value: &Value, buf: &mut String) {
    match value {
        Value::Null => buf.push_str("null"),
        Value::Str(s) => buf.push_str(&format!("{s:?}")),
        Value::Char(c) => buf.push_str(&format!("{c:?}")),
        Value::Bool(b) => buf.push_str(&b.to_string()),
        Value::F32(n) => buf.push_str(&n.to_string()),
        Value::F64(n) => buf.push_str(&n.to_string()),
        Value::U64(n) => buf.push_str(&n.to_string()),
        Value::Enum { ty, bits } => {
            pool.format_type_into(*ty, buf);
            buf.push_str(&format!("({bits})"));
        }
        Value::Seq(seq) if seq.is_empty() => buf.push_str("[]"),
        Value::Map(map) if map.is_empty() => buf.push_str("{}"),
        Value::Seq(seq) => buf.push_str(&format!("[{} items]", seq.len())),
        Value::Map(map) => buf.push_str(&format!("{{{} entries}}", map.len())),
        Value::Object(obj) => {
            buf.push_str("<");
            pool.format_type_into(obj.ty(), buf);
            buf.push('>');
        }
        other => match other.as_i64() {
            Some(n) => buf.push_str(&n.to_string()),
            None => buf.push('?'),
        },
    }
}
