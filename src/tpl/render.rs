use crate::error::RenderError;
use crate::tpl::ast::{Expression, Node, Template};
use crate::tpl::expr::{CmpOp, Expr};
use crate::tpl::render_context::{Context, Scope};
use crate::value::Value;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt::Write;

fn undefined(expr: &Expr, fallback: &str) -> RenderError {
    RenderError::Undefined {
        name: expr.path().unwrap_or_else(|| fallback.to_string()),
    }
}

fn list_index(len: usize, i: i64) -> Result<usize, RenderError> {
    usize::try_from(i)
        .ok()
        .filter(|idx| *idx < len)
        .ok_or(RenderError::IndexOutOfBounds { index: i, len })
}

fn eval_index<'s>(target: Cow<'s, Value>, index: &Value) -> Result<Cow<'s, Value>, RenderError> {
    match (target, index) {
        (Cow::Borrowed(Value::List(items)), Value::Int(i)) => {
            let idx = list_index(items.len(), *i)?;
            Ok(Cow::Borrowed(&items[idx]))
        }
        (Cow::Owned(Value::List(mut items)), Value::Int(i)) => {
            let idx = list_index(items.len(), *i)?;
            Ok(Cow::Owned(items.swap_remove(idx)))
        }
        (Cow::Borrowed(Value::Map(m)), Value::Str(key)) => m
            .get(key)
            .map(Cow::Borrowed)
            .ok_or_else(|| RenderError::Undefined { name: key.clone() }),
        (Cow::Owned(Value::Map(mut m)), Value::Str(key)) => m
            .remove(key)
            .map(Cow::Owned)
            .ok_or_else(|| RenderError::Undefined { name: key.clone() }),
        (other, key) => Err(RenderError::InvalidAccess {
            key: key.to_string(),
            target: other.type_name(),
        }),
    }
}

fn eval_attribute<'s>(
    expr: &Expr,
    target: Cow<'s, Value>,
    attr: &str,
) -> Result<Cow<'s, Value>, RenderError> {
    match target {
        Cow::Borrowed(Value::Map(m)) => m
            .get(attr)
            .map(Cow::Borrowed)
            .ok_or_else(|| undefined(expr, attr)),
        Cow::Owned(Value::Map(mut m)) => m
            .remove(attr)
            .map(Cow::Owned)
            .ok_or_else(|| undefined(expr, attr)),
        other => Err(RenderError::InvalidAccess {
            key: attr.to_string(),
            target: other.type_name(),
        }),
    }
}

fn eval_compare(lhs: &Value, op: CmpOp, rhs: &Value) -> Result<bool, RenderError> {
    let ordering = || {
        lhs.compare(rhs).ok_or(RenderError::TypeMismatch {
            op: op.as_str(),
            left: lhs.type_name(),
            right: rhs.type_name(),
        })
    };
    Ok(match op {
        CmpOp::Eq => lhs.loose_eq(rhs),
        CmpOp::Ne => !lhs.loose_eq(rhs),
        CmpOp::Lt => ordering()? == Ordering::Less,
        CmpOp::Le => ordering()? != Ordering::Greater,
        CmpOp::Gt => ordering()? == Ordering::Greater,
        CmpOp::Ge => ordering()? != Ordering::Less,
    })
}

/// 在作用域中求值表达式，变量引用尽量以借用形式返回
pub fn eval_expr<'s>(expr: &Expr, scope: &Scope<'s>) -> Result<Cow<'s, Value>, RenderError> {
    match expr {
        Expr::Literal(v) => Ok(Cow::Owned(v.clone())),
        Expr::Var(name) => scope
            .lookup(name)
            .map(Cow::Borrowed)
            .ok_or_else(|| RenderError::Undefined { name: name.clone() }),
        Expr::Attribute(obj, attr) => {
            let target = eval_expr(obj, scope)?;
            eval_attribute(expr, target, attr)
        }
        Expr::Index(obj, idx) => {
            let target = eval_expr(obj, scope)?;
            let index = eval_expr(idx, scope)?;
            eval_index(target, &index)
        }
        Expr::Not(inner) => Ok(Cow::Owned(Value::Bool(!eval_expr(inner, scope)?.is_truthy()))),
        Expr::And(lhs, rhs) => {
            let result = eval_expr(lhs, scope)?.is_truthy() && eval_expr(rhs, scope)?.is_truthy();
            Ok(Cow::Owned(Value::Bool(result)))
        }
        Expr::Or(lhs, rhs) => {
            let result = eval_expr(lhs, scope)?.is_truthy() || eval_expr(rhs, scope)?.is_truthy();
            Ok(Cow::Owned(Value::Bool(result)))
        }
        Expr::Compare(lhs, op, rhs) => {
            let l = eval_expr(lhs, scope)?;
            let r = eval_expr(rhs, scope)?;
            Ok(Cow::Owned(Value::Bool(eval_compare(&l, *op, &r)?)))
        }
    }
}

fn eval(expression: &Expression, scope: &Scope<'_>) -> Result<bool, RenderError> {
    Ok(eval_expr(&expression.tree, scope)?.is_truthy())
}

fn render_nodes(
    nodes: &[Node],
    scope: &Scope<'_>,
    out: &mut String,
) -> Result<(), RenderError> {
    for node in nodes {
        match node {
            Node::Emit(text) => out.push_str(text),
            Node::Interpolate(expr) => {
                let value = eval_expr(&expr.tree, scope)?;
                // 写入 String 不会失败
                let _ = write!(out, "{}", value);
            }
            Node::Condition { test, body } => {
                if eval(test, scope)? {
                    render_nodes(body, scope, out)?;
                }
            }
            Node::Loop {
                binding,
                iterable,
                body,
            } => {
                let target = eval_expr(&iterable.tree, scope)?;
                let Value::List(items) = target.as_ref() else {
                    return Err(RenderError::NotIterable {
                        expr: iterable.source.clone(),
                        found: target.type_name(),
                    });
                };
                for item in items {
                    let child = scope.child(binding, item);
                    render_nodes(body, &child, out)?;
                }
            }
        }
    }
    Ok(())
}

/// 基于上下文渲染模板；出错时不返回部分输出
pub fn render(template: &Template, context: &Context) -> Result<String, RenderError> {
    let mut out = String::new();
    let scope = Scope::new(context);
    render_nodes(template.nodes(), &scope, &mut out)?;
    Ok(out)
}

impl Template {
    pub fn render(&self, context: &Context) -> Result<String, RenderError> {
        render(self, context)
    }
}
