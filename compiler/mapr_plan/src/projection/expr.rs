//! Pure expression trees.

use mapr_ir::{MapError, MapResult, Name, TypeId, Value};
use mapr_types::{MemberKind, MethodDef, TypePool};

/// A side-effect-free expression over a projection's source.
///
/// No locals, loops or statements: the only branching is `Conditional` and
/// `Coalesce`, and collections are mapped with `Select`.
#[derive(Clone, Debug)]
pub enum Expr {
    /// The projection's source parameter.
    Source,
    /// Element bound by the enclosing `Select` with this variable id.
    Element(u32),
    Literal(Value),
    /// Field read. Reading from `Null` yields `Null`.
    Member {
        of: Box<Expr>,
        name: Name,
        index: usize,
    },
    /// Zero-argument method call. Calling on `Null` yields `Null`.
    Call { of: Box<Expr>, method: MethodDef },
    /// Scalar conversion.
    Convert { value: Box<Expr>, to: TypeId },
    IsNull(Box<Expr>),
    Not(Box<Expr>),
    Conditional {
        test: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// First operand unless it is `Null`.
    Coalesce(Box<Expr>, Box<Expr>),
    /// Record construction: constructor arguments, then member initializers.
    New {
        ty: TypeId,
        ctor: Vec<FieldInit>,
        inits: Vec<FieldInit>,
    },
    /// Map each element of a sequence, binding it to `Element(var)`.
    Select {
        source: Box<Expr>,
        var: u32,
        body: Box<Expr>,
        into: TypeId,
    },
}

/// One field assignment inside `Expr::New`.
#[derive(Clone, Debug)]
pub struct FieldInit {
    pub name: Name,
    pub index: usize,
    pub value: Expr,
}

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    #[must_use]
    pub fn is_null(self) -> Self {
        Expr::IsNull(Box::new(self))
    }

    #[must_use]
    pub fn negate(self) -> Self {
        Expr::Not(Box::new(self))
    }

    #[must_use]
    pub fn convert(self, to: TypeId) -> Self {
        Expr::Convert {
            value: Box::new(self),
            to,
        }
    }

    #[must_use]
    pub fn coalesce(self, fallback: Expr) -> Self {
        Expr::Coalesce(Box::new(self), Box::new(fallback))
    }

    pub fn conditional(test: Expr, then: Expr, otherwise: Expr) -> Self {
        Expr::Conditional {
            test: Box::new(test),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    /// `Source.A.B...` resolved against record `root`.
    ///
    /// Segments name fields or zero-argument methods, ignoring ASCII case.
    pub fn path(pool: &TypePool, root: TypeId, path: &str) -> MapResult<Expr> {
        let mut expr = Expr::Source;
        let mut ty = root;
        for segment in path.split('.').map(str::trim) {
            let owner = pool.strip_nullable(ty);
            let Some(def) = pool.record_def(owner) else {
                return Err(MapError::configuration(
                    pool.format_type(owner),
                    format!("path `{path}`: `{segment}` is read from a non-record type"),
                ));
            };
            let matches = |name: Name| pool.lookup_name(name).eq_ignore_ascii_case(segment);
            let member = def
                .fields
                .iter()
                .position(|f| matches(f.name))
                .map(MemberKind::Field)
                .or_else(|| def.methods.iter().position(|m| matches(m.name)).map(MemberKind::Method));
            expr = match member {
                Some(MemberKind::Field(index)) => {
                    let field = &def.fields[index];
                    ty = field.ty;
                    Expr::Member {
                        of: Box::new(expr),
                        name: field.name,
                        index,
                    }
                }
                Some(MemberKind::Method(index)) => {
                    let method = def.methods[index].clone();
                    ty = method.ret;
                    Expr::Call {
                        of: Box::new(expr),
                        method,
                    }
                }
                _ => {
                    return Err(MapError::configuration(
                        pool.format_type(owner),
                        format!("path `{path}`: no member named `{segment}`"),
                    ))
                }
            };
        }
        Ok(expr)
    }

    /// Copy of `self` with every `Source` replaced by `replacement`.
    ///
    /// Element variables are unique per compilation, so substitution cannot
    /// capture.
    #[must_use]
    pub fn with_source(&self, replacement: &Expr) -> Expr {
        let sub = |e: &Expr| Box::new(e.with_source(replacement));
        match self {
            Expr::Source => replacement.clone(),
            Expr::Element(_) | Expr::Literal(_) => self.clone(),
            Expr::Member { of, name, index } => Expr::Member {
                of: sub(of),
                name: *name,
                index: *index,
            },
            Expr::Call { of, method } => Expr::Call {
                of: sub(of),
                method: method.clone(),
            },
            Expr::Convert { value, to } => Expr::Convert {
                value: sub(value),
                to: *to,
            },
            Expr::IsNull(e) => Expr::IsNull(sub(e)),
            Expr::Not(e) => Expr::Not(sub(e)),
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => Expr::Conditional {
                test: sub(test),
                then: sub(then),
                otherwise: sub(otherwise),
            },
            Expr::Coalesce(a, b) => Expr::Coalesce(sub(a), sub(b)),
            Expr::New { ty, ctor, inits } => {
                let init = |i: &FieldInit| FieldInit {
                    name: i.name,
                    index: i.index,
                    value: i.value.with_source(replacement),
                };
                Expr::New {
                    ty: *ty,
                    ctor: ctor.iter().map(init).collect(),
                    inits: inits.iter().map(init).collect(),
                }
            }
            Expr::Select {
                source,
                var,
                body,
                into,
            } => Expr::Select {
                source: sub(source),
                var: *var,
                body: sub(body),
                into: *into,
            },
        }
    }

    /// Number of nodes; a rough size measure for logging.
    pub fn node_count(&self) -> usize {
        1 + match self {
            Expr::Source | Expr::Element(_) | Expr::Literal(_) => 0,
            Expr::Member { of, .. } | Expr::Call { of, .. } => of.node_count(),
            Expr::Convert { value, .. } => value.node_count(),
            Expr::IsNull(e) | Expr::Not(e) => e.node_count(),
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => test.node_count() + then.node_count() + otherwise.node_count(),
            Expr::Coalesce(a, b) => a.node_count() + b.node_count(),
            Expr::New { ctor, inits, .. } => ctor
                .iter()
                .chain(inits)
                .map(|i| i.value.node_count())
                .sum(),
            Expr::Select { source, body, .. } => source.node_count() + body.node_count(),
        }
    }
}
