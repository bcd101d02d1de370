//! Schema and query code generation.
//!
//! Every emitter reads the same `GeneratorInput` and renders it into one
//! target syntax. Emitters never fail: unusual input produces unusual text,
//! and ambiguous enum resolution is reported through `tracing`.

mod drizzle;
mod kysely;
pub mod naming;
mod prisma;
mod query;
mod sql;
pub mod types;
mod typescript;
mod zod;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CompileError;
use crate::schema::{explicit_indexes, find_enum, group_indexes, Column, EnumDef, IndexColumnRow, IndexDef};
use crate::sql::{ActiveFilter, Dialect};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorFormat {
    Sql,
    Ts,
    Zod,
    Prisma,
    Drizzle,
    Kysely,
}

impl GeneratorFormat {
    pub const ALL: [GeneratorFormat; 6] = [
        GeneratorFormat::Sql,
        GeneratorFormat::Ts,
        GeneratorFormat::Zod,
        GeneratorFormat::Prisma,
        GeneratorFormat::Drizzle,
        GeneratorFormat::Kysely,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GeneratorFormat::Sql => "sql",
            GeneratorFormat::Ts => "ts",
            GeneratorFormat::Zod => "zod",
            GeneratorFormat::Prisma => "prisma",
            GeneratorFormat::Drizzle => "drizzle",
            GeneratorFormat::Kysely => "kysely",
        }
    }
}

impl fmt::Display for GeneratorFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeneratorFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sql" => Ok(GeneratorFormat::Sql),
            "ts" | "typescript" => Ok(GeneratorFormat::Ts),
            "zod" => Ok(GeneratorFormat::Zod),
            "prisma" => Ok(GeneratorFormat::Prisma),
            "drizzle" => Ok(GeneratorFormat::Drizzle),
            "kysely" => Ok(GeneratorFormat::Kysely),
            other => Err(format!("unknown generator format: {}", other)),
        }
    }
}

/// Formats that can render a filtered `SELECT` snippet.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum QueryFormat {
    Sql,
    Prisma,
    Drizzle,
    Kysely,
}

/// One table's structure plus everything needed to resolve its enums and
/// indexes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorInput {
    pub table: String,
    pub columns: Vec<Column>,
    pub enums: Vec<EnumDef>,
    /// Raw per-column index rows; grouping happens inside the emitters.
    pub indexes: Vec<IndexColumnRow>,
    pub dialect: Dialect,
}

impl GeneratorInput {
    pub fn new(table: impl Into<String>, columns: Vec<Column>, dialect: Dialect) -> Self {
        Self {
            table: table.into(),
            columns,
            dialect,
            ..Default::default()
        }
    }

    /// The enum a column renders as, if it resolves to one with values.
    pub(crate) fn enum_for(&self, column: &Column) -> Option<&EnumDef> {
        find_enum(&self.enums, column, &self.table).filter(|e| !e.values.is_empty())
    }

    /// Indexes that need their own declaration in generated output.
    pub(crate) fn explicit_indexes(&self) -> Vec<IndexDef> {
        let grouped = group_indexes(&self.indexes, &self.table);
        explicit_indexes(&grouped, &self.columns, self.dialect)
    }
}

/// A multi-valued enum column renders as a list of its values.
pub(crate) fn is_set_column(column: &Column, matched: &EnumDef) -> bool {
    matched.is_set() || column.data_type.eq_ignore_ascii_case("set")
}

/// Render the table described by `input` in `format`.
pub fn generate(format: GeneratorFormat, input: &GeneratorInput) -> String {
    debug!(
        %format,
        dialect = %input.dialect,
        table = %input.table,
        columns = input.columns.len(),
        "generating schema"
    );
    match format {
        GeneratorFormat::Sql => sql::schema(input),
        GeneratorFormat::Ts => typescript::schema(input),
        GeneratorFormat::Zod => zod::schema(input),
        GeneratorFormat::Prisma => prisma::schema(input),
        GeneratorFormat::Drizzle => drizzle::schema(input),
        GeneratorFormat::Kysely => kysely::schema(input),
    }
}

/// Render a `SELECT *` over `table` restricted by `filters` (joined by AND).
///
/// The SQL form goes through the dialect compiler with values inlined, so it
/// fails on the same filters the compiler rejects.
pub fn generate_query(
    format: QueryFormat,
    table: &str,
    filters: &[ActiveFilter],
    dialect: Dialect,
) -> Result<String, CompileError> {
    debug!(?format, %dialect, table, filters = filters.len(), "generating query");
    match format {
        QueryFormat::Sql => query::sql(table, filters, dialect),
        QueryFormat::Prisma => Ok(query::prisma(table, filters)),
        QueryFormat::Drizzle => Ok(query::drizzle(table, filters)),
        QueryFormat::Kysely => Ok(query::kysely(table, filters)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EnumMetadata;

    fn status_input(values: &[&str]) -> GeneratorInput {
        let mut input = GeneratorInput::new(
            "orders",
            vec![
                Column::new("id", "integer").primary(),
                Column::new("status", "order_status"),
            ],
            Dialect::Postgres,
        );
        input.enums = vec![EnumDef::new("public", "order_status", values)];
        input
    }

    #[test]
    fn test_format_parse_and_display() {
        for format in GeneratorFormat::ALL {
            assert_eq!(format.to_string().parse::<GeneratorFormat>().unwrap(), format);
        }
        assert_eq!("TypeScript".parse::<GeneratorFormat>().unwrap(), GeneratorFormat::Ts);
        assert!("yaml".parse::<GeneratorFormat>().is_err());
    }

    #[test]
    fn test_enum_values_render_in_every_format() {
        let values = ["pending", "it's", "back`tick", "done"];
        let input = status_input(&values);

        for format in GeneratorFormat::ALL {
            let out = generate(format, &input);
            let mut last = 0;
            for value in values {
                let needle = match format {
                    GeneratorFormat::Sql => format!("'{}'", value.replace('\'', "''")),
                    GeneratorFormat::Prisma => naming::double_quoted(value),
                    _ => naming::js_string(value),
                };
                let needle = if format == GeneratorFormat::Prisma && naming::is_bare_safe(value) {
                    format!("  {}\n", value)
                } else {
                    needle
                };
                let pos = out[last..]
                    .find(&needle)
                    .map(|p| p + last)
                    .unwrap_or_else(|| panic!("{} output lacks {} in order:\n{}", format, needle, out));
                last = pos + needle.len();
            }
        }
    }

    /// Every single-quoted literal in `text`, unescaped. Doubled quotes
    /// collapse; `backslash` also decodes C-style escapes.
    fn single_quoted_literals(text: &str, backslash: bool) -> Vec<String> {
        let mut literals = Vec::new();
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '\'' {
                continue;
            }
            let mut literal = String::new();
            loop {
                match chars.next() {
                    None => break,
                    Some('\\') if backslash => match chars.next() {
                        Some('n') => literal.push('\n'),
                        Some('r') => literal.push('\r'),
                        Some('t') => literal.push('\t'),
                        Some(other) => literal.push(other),
                        None => break,
                    },
                    Some('\'') if chars.peek() == Some(&'\'') => {
                        chars.next();
                        literal.push('\'');
                    }
                    Some('\'') => break,
                    Some(other) => literal.push(other),
                }
            }
            literals.push(literal);
        }
        literals
    }

    fn prisma_enum_members(out: &str, name: &str) -> Vec<String> {
        let header = format!("enum {} {{", name);
        let body = out
            .split(header.as_str())
            .nth(1)
            .and_then(|rest| rest.split("\n}").next())
            .unwrap_or_else(|| panic!("no {} block in:\n{}", name, out));
        body.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| match line.split_once("@map(") {
                Some((_, mapped)) => serde_json::from_str(mapped.trim_end().trim_end_matches(')')).unwrap(),
                None => line.trim().to_string(),
            })
            .collect()
    }

    #[test]
    fn test_enum_values_survive_escaping_in_every_format() {
        let values = ["pending", "it's", "a`b", "a\\b", "say \"hi\"", "done"];

        for dialect in [Dialect::Postgres, Dialect::MySql, Dialect::ClickHouse, Dialect::Sqlite] {
            let mut input = status_input(&values);
            input.dialect = dialect;

            for format in GeneratorFormat::ALL {
                let out = generate(format, &input);
                if format == GeneratorFormat::Prisma {
                    assert_eq!(prisma_enum_members(&out, "OrderStatus"), values, "{}", dialect);
                    continue;
                }
                let backslash = format != GeneratorFormat::Sql
                    || matches!(dialect, Dialect::MySql | Dialect::ClickHouse);
                let literals = single_quoted_literals(&out, backslash);
                let mut remaining = literals.iter();
                for value in values {
                    assert!(
                        remaining.any(|l| l == value),
                        "{} / {} lost {:?}; decoded {:?} from:\n{}",
                        format,
                        dialect,
                        value,
                        literals,
                        out
                    );
                }
            }
        }
    }

    #[test]
    fn test_empty_enum_falls_back_to_scalar() {
        let input = status_input(&[]);
        let ts = generate(GeneratorFormat::Ts, &input);
        assert!(ts.contains("status: string;"));
    }

    #[test]
    fn test_input_from_json() {
        let input: GeneratorInput = serde_json::from_str(
            r#"{
                "table": "tags",
                "dialect": "mysql",
                "columns": [{"id": "kind", "type": "set"}],
                "enums": [{"schema": "app", "name": "kind", "values": ["a", "b"],
                           "metadata": {"isSet": true, "table": "tags", "column": "kind"}}]
            }"#,
        )
        .unwrap();
        assert_eq!(input.dialect, Dialect::MySql);
        let matched = input.enum_for(&input.columns[0]).unwrap();
        assert_eq!(
            matched.metadata,
            Some(EnumMetadata {
                is_set: true,
                table: Some("tags".into()),
                column: Some("kind".into()),
            })
        );
        assert!(is_set_column(&input.columns[0], matched));
    }
}
