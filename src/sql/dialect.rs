use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::value::Value;

/// Supported database engine families.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    #[value(name = "postgres")]
    Postgres,
    #[value(name = "mysql")]
    MySql,
    #[value(name = "mssql")]
    MsSql,
    #[value(name = "clickhouse")]
    ClickHouse,
    #[value(name = "sqlite")]
    Sqlite,
}

impl Dialect {
    pub const ALL: [Dialect; 5] = [
        Dialect::Postgres,
        Dialect::MySql,
        Dialect::MsSql,
        Dialect::ClickHouse,
        Dialect::Sqlite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::MsSql => "mssql",
            Dialect::ClickHouse => "clickhouse",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Quote one identifier, doubling any embedded closing quote character.
    pub fn quote_identifier(&self, name: &str) -> String {
        match self {
            Dialect::Postgres | Dialect::Sqlite => format!("\"{}\"", name.replace('"', "\"\"")),
            Dialect::MySql | Dialect::ClickHouse => format!("`{}`", name.replace('`', "``")),
            Dialect::MsSql => format!("[{}]", name.replace(']', "]]")),
        }
    }

    /// Quote a dotted path such as `schema.table`, skipping empty segments.
    pub fn quote_path<S: AsRef<str>>(&self, parts: &[S]) -> String {
        parts
            .iter()
            .map(AsRef::as_ref)
            .filter(|p| !p.is_empty())
            .map(|p| self.quote_identifier(p))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Bind-parameter marker for the 1-based parameter `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", index),
            Dialect::MsSql => format!("@{}", index),
            Dialect::MySql | Dialect::ClickHouse | Dialect::Sqlite => "?".to_string(),
        }
    }

    /// ClickHouse only partially supports bind parameters, so every statement
    /// sent to it carries its values inline.
    pub fn inlines_parameters(&self) -> bool {
        matches!(self, Dialect::ClickHouse)
    }

    pub fn supports_ilike(&self) -> bool {
        matches!(self, Dialect::Postgres | Dialect::ClickHouse)
    }

    /// Render a string as a single-quoted literal. MySQL and ClickHouse treat
    /// backslashes in literals as escapes.
    pub fn quote_string(&self, s: &str) -> String {
        match self {
            Dialect::MySql => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''")),
            Dialect::ClickHouse => {
                let mut out = String::with_capacity(s.len() + 2);
                out.push('\'');
                for ch in s.chars() {
                    if ch == '\\' || ch == '\'' {
                        out.push('\\');
                    }
                    out.push(ch);
                }
                out.push('\'');
                out
            }
            _ => format!("'{}'", s.replace('\'', "''")),
        }
    }

    /// Render a value as an inline SQL literal.
    pub fn render_literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => match (self, b) {
                (Dialect::MsSql, true) => "1".to_string(),
                (Dialect::MsSql, false) => "0".to_string(),
                (_, true) => "TRUE".to_string(),
                (_, false) => "FALSE".to_string(),
            },
            Value::Int(i) => i.to_string(),
            Value::Float(f) if f.is_finite() => f.to_string(),
            Value::Float(_) => "NULL".to_string(),
            Value::Text(s) if *self == Dialect::ClickHouse && looks_like_date(s) => {
                format!("parseDateTime64BestEffort({})", self.quote_string(s))
            }
            Value::Text(s) => self.quote_string(s),
            Value::Date(_) | Value::DateTime(_) => {
                let quoted = self.quote_string(&value.display());
                match self {
                    Dialect::ClickHouse => format!("parseDateTime64BestEffort({})", quoted),
                    _ => quoted,
                }
            }
            Value::Json(j) => self.quote_string(&j.to_string()),
        }
    }
}

/// ClickHouse will not coerce a plain string into a `DateTime64` column, so
/// date-shaped text is routed through its best-effort parser.
fn looks_like_date(s: &str) -> bool {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        || DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "mssql" | "sqlserver" => Ok(Dialect::MsSql),
            "clickhouse" => Ok(Dialect::ClickHouse),
            "sqlite" => Ok(Dialect::Sqlite),
            other => Err(format!("unknown dialect: {}", other)),
        }
    }
}
