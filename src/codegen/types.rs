//! Engine type name -> target type name, per (format, dialect).
//!
//! Matching is by case-insensitive substring so that decorated names such as
//! `Nullable(Int32)` or `character varying(255)` still resolve.

use super::GeneratorFormat;
use crate::sql::Dialect;

fn has_any(t: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| t.contains(n))
}

fn ts(t: &str) -> &'static str {
    if has_any(t, &["int", "float", "decimal", "number", "double", "numeric", "real"]) {
        "number"
    } else if has_any(t, &["bool", "bit"]) {
        "boolean"
    } else if has_any(t, &["date", "time"]) {
        "Date"
    } else if t.contains("json") {
        "unknown"
    } else {
        "string"
    }
}

fn zod(t: &str) -> &'static str {
    match ts(t) {
        "number" => "z.number()",
        "boolean" => "z.boolean()",
        "Date" => "z.date()",
        "unknown" => "z.record(z.string(), z.any())",
        _ => "z.string()",
    }
}

fn prisma(t: &str) -> &'static str {
    if has_any(t, &["decimal", "numeric"]) {
        "Decimal"
    } else if t.contains("bool") {
        "Boolean"
    } else if has_any(t, &["date", "timestamp"]) {
        "DateTime"
    } else if t.contains("json") {
        "Json"
    } else if t.contains("int") {
        "Int"
    } else if has_any(t, &["float", "double", "real"]) {
        "Float"
    } else {
        "String"
    }
}

fn drizzle(t: &str, dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Postgres => {
            if t.contains("serial") {
                "serial"
            } else if t.contains("int") {
                "integer"
            } else if t.contains("text") {
                "text"
            } else if has_any(t, &["varchar", "character varying"]) {
                "varchar"
            } else if t.contains("bool") {
                "boolean"
            } else if t.contains("timestamp") {
                "timestamp"
            } else if t.contains("date") {
                "date"
            } else if has_any(t, &["decimal", "numeric"]) {
                "decimal"
            } else if has_any(t, &["double", "float", "real"]) {
                "doublePrecision"
            } else if t.contains("json") {
                "json"
            } else {
                "text"
            }
        }
        Dialect::MySql => {
            if t.contains("serial") {
                "serial"
            } else if t.contains("tinyint") {
                "tinyint"
            } else if t.contains("int") {
                "int"
            } else if t.contains("text") {
                "text"
            } else if t.contains("varchar") {
                "varchar"
            } else if t.contains("bool") {
                "boolean"
            } else if t.contains("timestamp") {
                "timestamp"
            } else if t.contains("datetime") {
                "datetime"
            } else if t.contains("date") {
                "date"
            } else if has_any(t, &["decimal", "numeric"]) {
                "decimal"
            } else if has_any(t, &["double", "float", "real"]) {
                "double"
            } else if t.contains("json") {
                "json"
            } else {
                "text"
            }
        }
        Dialect::MsSql => {
            if t.contains("datetime2") {
                "datetime2"
            } else if t.contains("datetime") {
                "datetime"
            } else if t.contains("date") {
                "date"
            } else if t.contains("int") {
                "integer"
            } else if t.contains("bit") {
                "bit"
            } else if t.contains("bool") {
                "boolean"
            } else if t.contains("text") {
                "text"
            } else if t.contains("nvarchar") {
                "nvarchar"
            } else if t.contains("varchar") {
                "varchar"
            } else if has_any(t, &["decimal", "numeric"]) {
                "decimal"
            } else if has_any(t, &["float", "real"]) {
                "float"
            } else {
                "text"
            }
        }
        Dialect::ClickHouse => {
            if t.contains("int") {
                "integer"
            } else if t.contains("text") {
                "text"
            } else if t.contains("bool") {
                "boolean"
            } else if t.contains("date") {
                "date"
            } else if t.contains("decimal") {
                "decimal"
            } else if has_any(t, &["real", "float"]) {
                "real"
            } else if t.contains("json") {
                "json"
            } else {
                "text"
            }
        }
        Dialect::Sqlite => {
            if t.contains("int") {
                "integer"
            } else if has_any(t, &["real", "float", "double", "decimal", "numeric"]) {
                "real"
            } else if t.contains("blob") {
                "blob"
            } else {
                "text"
            }
        }
    }
}

/// DDL types pass through, except for a few MSSQL-only names that Postgres
/// spells differently.
fn sql(raw: &str, t: &str, dialect: Dialect) -> String {
    if dialect == Dialect::Postgres {
        if t.contains("datetime2") {
            return "timestamp".to_string();
        }
        if t.contains("nvarchar") {
            return "varchar".to_string();
        }
        if t.contains("int32") {
            return "integer".to_string();
        }
    }
    raw.to_string()
}

/// Map an engine-native type name for `format` under `dialect`.
///
/// Kysely interfaces use TypeScript types; ClickHouse Prisma models use the
/// generic scalar table.
pub fn map_type(format: GeneratorFormat, dialect: Dialect, raw: &str) -> String {
    let t = raw.to_ascii_lowercase();
    match format {
        GeneratorFormat::Ts | GeneratorFormat::Kysely => ts(&t).to_string(),
        GeneratorFormat::Zod => zod(&t).to_string(),
        GeneratorFormat::Prisma => {
            if dialect == Dialect::MsSql && t == "date" {
                "DateTime @db.Date".to_string()
            } else {
                prisma(&t).to_string()
            }
        }
        GeneratorFormat::Drizzle => drizzle(&t, dialect).to_string(),
        GeneratorFormat::Sql => sql(raw, &t, dialect),
    }
}
