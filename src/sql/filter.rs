use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::value::Value;
use crate::error::CompileError;

/// Comparison operators offered by the table filter bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "NOT LIKE")]
    NotLike,
    #[serde(rename = "ILIKE")]
    ILike,
    #[serde(rename = "NOT ILIKE")]
    NotILike,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "NOT IN")]
    NotIn,
    #[serde(rename = "IS NULL")]
    IsNull,
    #[serde(rename = "IS NOT NULL")]
    IsNotNull,
}

impl Operator {
    pub const ALL: [Operator; 14] = [
        Operator::Eq,
        Operator::NotEq,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::Like,
        Operator::NotLike,
        Operator::ILike,
        Operator::NotILike,
        Operator::In,
        Operator::NotIn,
        Operator::IsNull,
        Operator::IsNotNull,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::ILike => "ILIKE",
            Operator::NotILike => "NOT ILIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }

    /// Value-less operators ignore the filter's values entirely.
    pub fn has_value(&self) -> bool {
        !matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    /// Array operators take the whole value list as a parenthesized operand.
    pub fn is_array(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    pub fn is_case_insensitive(&self) -> bool {
        matches!(self, Operator::ILike | Operator::NotILike)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        let normalized = match normalized.as_str() {
            "<>" => "!=",
            "==" => "=",
            other => other,
        };
        Operator::ALL
            .into_iter()
            .find(|op| op.symbol() == normalized)
            .ok_or_else(|| CompileError::UnknownOperator(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConcatOperator {
    #[default]
    And,
    Or,
}

impl ConcatOperator {
    pub fn keyword(&self) -> &'static str {
        match self {
            ConcatOperator::And => "AND",
            ConcatOperator::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One WHERE condition as chosen in the filter bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveFilter {
    pub column: String,
    pub operator: Operator,
    #[serde(default)]
    pub values: Vec<Value>,
}

impl ActiveFilter {
    pub fn new(column: impl Into<String>, operator: Operator, values: Vec<Value>) -> Self {
        Self {
            column: column.into(),
            operator,
            values,
        }
    }

    /// Build a filter from an operator string, failing on unknown operators.
    pub fn parse(
        column: impl Into<String>,
        operator: &str,
        values: Vec<Value>,
    ) -> Result<Self, CompileError> {
        Ok(Self::new(column, operator.parse()?, values))
    }

    /// Values the operator actually consumes: none for value-less operators,
    /// all of them (trimmed) for array operators, otherwise the first.
    pub fn operands(&self) -> Vec<Value> {
        if !self.operator.has_value() {
            Vec::new()
        } else if self.operator.is_array() {
            self.values.iter().map(Value::trimmed).collect()
        } else {
            self.values.iter().take(1).cloned().collect()
        }
    }
}
