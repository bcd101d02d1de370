//! Typed SQL expression IR.
//!
//! The compiler never concatenates user values into SQL text directly. It
//! builds `SqlExpr` trees and hands them to a `SqlWriter`, which applies the
//! dialect's identifier quoting and either emits placeholders (collecting the
//! bound values in order) or inlines escaped literals.

use super::dialect::Dialect;
use super::filter::ConcatOperator;
use super::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpr {
    /// Possibly qualified identifier: `schema.table` or `column`.
    Identifier(Vec<String>),
    /// Value always rendered inline as a literal.
    Literal(Value),
    /// Value bound as a parameter, or inlined when the writer is in inline mode.
    Param(Value),
    /// Parenthesized, comma-separated list: `(a, b, c)`.
    List(Vec<SqlExpr>),
    /// `left OP right`, or `left OP` for value-less operators.
    Comparison {
        left: Box<SqlExpr>,
        op: &'static str,
        right: Option<Box<SqlExpr>>,
    },
    /// Predicates joined by AND / OR.
    Junction {
        op: ConcatOperator,
        items: Vec<SqlExpr>,
    },
    /// Trusted SQL fragment emitted verbatim.
    Raw(String),
}

impl SqlExpr {
    pub fn ident(name: impl Into<String>) -> Self {
        SqlExpr::Identifier(vec![name.into()])
    }

    /// `schema.table`, or just `table` when no schema is given.
    pub fn table(schema: Option<&str>, table: &str) -> Self {
        let mut parts = Vec::with_capacity(2);
        if let Some(schema) = schema.filter(|s| !s.is_empty()) {
            parts.push(schema.to_string());
        }
        parts.push(table.to_string());
        SqlExpr::Identifier(parts)
    }

    pub fn compare(left: SqlExpr, op: &'static str, right: Option<SqlExpr>) -> Self {
        SqlExpr::Comparison {
            left: Box::new(left),
            op,
            right: right.map(Box::new),
        }
    }
}

/// Renders `SqlExpr` trees for one dialect and collects bound parameters.
#[derive(Debug)]
pub struct SqlWriter {
    dialect: Dialect,
    inline: bool,
    params: Vec<Value>,
}

impl SqlWriter {
    /// Writer using the dialect's default binding policy.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            inline: dialect.inlines_parameters(),
            params: Vec::new(),
        }
    }

    /// Writer that inlines every value; used for display-only snippets.
    pub fn inline(dialect: Dialect) -> Self {
        Self {
            dialect,
            inline: true,
            params: Vec::new(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn render(&mut self, expr: &SqlExpr) -> String {
        match expr {
            SqlExpr::Identifier(parts) => self.dialect.quote_path(parts),
            SqlExpr::Literal(value) => self.dialect.render_literal(value),
            SqlExpr::Param(value) => {
                if self.inline {
                    self.dialect.render_literal(value)
                } else {
                    self.params.push(value.clone());
                    self.dialect.placeholder(self.params.len())
                }
            }
            SqlExpr::List(items) => {
                let rendered: Vec<String> = items.iter().map(|i| self.render(i)).collect();
                format!("({})", rendered.join(", "))
            }
            SqlExpr::Comparison { left, op, right } => {
                let left = self.render(left);
                match right {
                    Some(right) => format!("{} {} {}", left, op, self.render(right)),
                    None => format!("{} {}", left, op),
                }
            }
            SqlExpr::Junction { op, items } => {
                let rendered: Vec<String> = items
                    .iter()
                    .map(|item| match item {
                        SqlExpr::Junction { items: inner, .. } if inner.len() > 1 => {
                            format!("({})", self.render(item))
                        }
                        _ => self.render(item),
                    })
                    .collect();
                rendered.join(&format!(" {} ", op.keyword()))
            }
            SqlExpr::Raw(sql) => sql.clone(),
        }
    }

    /// Consume the writer, returning the parameters in placeholder order.
    pub fn finish(self) -> Vec<Value> {
        self.params
    }
}
