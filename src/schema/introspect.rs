//! Catalog queries that feed the schema IR, and the mappers that turn their
//! result rows into `EnumDef`, `IndexColumnRow` and `ConstraintRow` values.
//!
//! Queries are plain `CompiledQuery` values so they go through the same
//! executor and log store as every other statement.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value as Json;

use super::ir::{ConstraintKind, ConstraintRow, EnumDef, EnumMetadata, IndexColumnRow};
use crate::sql::{CompiledQuery, Dialect, Row};

static CLICKHOUSE_ENUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Enum\d+\((.*)\)$").expect("valid clickhouse enum regex"));

static CLICKHOUSE_ENUM_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'([^']+)' *= *\d+").expect("valid clickhouse enum pair regex"));

const MYSQL_SYSTEM_SCHEMAS: &str = "'mysql', 'information_schema', 'performance_schema', 'sys'";

/// Enum catalog query, or `None` for engines without enum types.
pub fn enums_query(dialect: Dialect) -> Option<CompiledQuery> {
    let sql = match dialect {
        Dialect::Postgres => {
            r#"SELECT n.nspname AS "schema", t.typname AS "name", e.enumlabel AS "value"
FROM pg_type t
INNER JOIN pg_enum e ON t.oid = e.enumtypid
INNER JOIN pg_catalog.pg_namespace n ON t.typnamespace = n.oid
WHERE n.nspname NOT IN ('pg_catalog', 'information_schema')
ORDER BY n.nspname, t.typname, e.enumsortorder"#
                .to_string()
        }
        Dialect::MySql => format!(
            "SELECT TABLE_SCHEMA AS `schema`, TABLE_NAME AS `table`, COLUMN_TYPE AS `value`, \
COLUMN_NAME AS `name`, DATA_TYPE AS `data_type`
FROM information_schema.COLUMNS
WHERE TABLE_SCHEMA NOT IN ({}) AND (DATA_TYPE = 'enum' OR DATA_TYPE = 'set')
GROUP BY TABLE_SCHEMA, TABLE_NAME, COLUMN_NAME, COLUMN_TYPE, DATA_TYPE",
            MYSQL_SYSTEM_SCHEMAS
        ),
        Dialect::MsSql => "SELECT TABLE_SCHEMA AS [schema], TABLE_NAME AS [table], DATA_TYPE AS [value], \
COLUMN_NAME AS [name], DATA_TYPE AS [data_type]
FROM information_schema.COLUMNS
WHERE TABLE_SCHEMA NOT IN ('INFORMATION_SCHEMA', 'information_schema', 'system') \
AND (DATA_TYPE = 'enum' OR DATA_TYPE = 'set')
GROUP BY TABLE_SCHEMA, TABLE_NAME, COLUMN_NAME, DATA_TYPE"
            .to_string(),
        Dialect::ClickHouse => "SELECT table_schema AS `schema`, table_name AS `table`, \
column_name AS `name`, data_type AS `type`
FROM information_schema.columns
WHERE table_schema NOT IN ('INFORMATION_SCHEMA', 'information_schema', 'system') \
AND data_type ILIKE 'Enum%'"
            .to_string(),
        Dialect::Sqlite => return None,
    };
    Some(CompiledQuery::raw(sql))
}

/// Per-column index catalog query, or `None` where indexes are not introspected.
pub fn indexes_query(dialect: Dialect) -> Option<CompiledQuery> {
    let sql = match dialect {
        Dialect::Postgres => r#"SELECT n.nspname AS "schema", t.relname AS "table", i.relname AS "name",
       a.attname AS "column", ix.indisunique AS "isUnique", ix.indisprimary AS "isPrimary"
FROM pg_class t
INNER JOIN pg_index ix ON t.oid = ix.indrelid
INNER JOIN pg_class i ON i.oid = ix.indexrelid
INNER JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey)
INNER JOIN pg_namespace n ON n.oid = t.relnamespace
WHERE n.nspname NOT IN ('pg_catalog', 'information_schema') AND t.relkind = 'r'"#
            .to_string(),
        Dialect::MySql => format!(
            "SELECT TABLE_SCHEMA AS `schema`, TABLE_NAME AS `table`, INDEX_NAME AS `name`, \
COLUMN_NAME AS `column`, NON_UNIQUE = 0 AS `isUnique`, INDEX_NAME = 'PRIMARY' AS `isPrimary`
FROM information_schema.STATISTICS
WHERE TABLE_SCHEMA NOT IN ({})
ORDER BY TABLE_SCHEMA, TABLE_NAME, INDEX_NAME, SEQ_IN_INDEX",
            MYSQL_SYSTEM_SCHEMAS
        ),
        Dialect::MsSql => "SELECT s.name AS [schema], t.name AS [table], i.name AS [name], c.name AS [column], \
i.is_unique AS [isUnique], i.is_primary_key AS [isPrimary]
FROM sys.indexes i
INNER JOIN sys.tables t ON t.object_id = i.object_id
INNER JOIN sys.schemas s ON s.schema_id = t.schema_id
INNER JOIN sys.index_columns ic ON ic.object_id = i.object_id AND ic.index_id = i.index_id
INNER JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id"
            .to_string(),
        // Only the sorting key is reported; ClickHouse has no other enforced index.
        Dialect::ClickHouse => "SELECT database AS `schema`, table AS `table`, name AS `column`
FROM system.columns
WHERE is_in_primary_key = 1 AND database NOT IN ('system', 'information_schema')"
            .to_string(),
        Dialect::Sqlite => return None,
    };
    Some(CompiledQuery::raw(sql))
}

/// Constraint catalog query for the engines whose `information_schema`
/// exposes key usage.
pub fn constraints_query(dialect: Dialect) -> Option<CompiledQuery> {
    let sql = match dialect {
        Dialect::Postgres => r#"SELECT tc.table_schema AS "schema", tc.table_name AS "table",
       tc.constraint_name AS "name", tc.constraint_type AS "type", kcu.column_name AS "column",
       ccu.table_schema AS "usage_schema", ccu.table_name AS "usage_table",
       ccu.column_name AS "usage_column"
FROM information_schema.table_constraints tc
LEFT JOIN information_schema.key_column_usage kcu ON tc.constraint_name = kcu.constraint_name
LEFT JOIN information_schema.constraint_column_usage ccu ON tc.constraint_name = ccu.constraint_name
WHERE tc.constraint_type IN ('PRIMARY KEY', 'UNIQUE', 'FOREIGN KEY')
  AND ccu.table_schema NOT LIKE 'pg_%'"#
            .to_string(),
        Dialect::MySql => format!(
            "SELECT tc.TABLE_SCHEMA AS `schema`, tc.TABLE_NAME AS `table`, tc.CONSTRAINT_NAME AS `name`, \
tc.CONSTRAINT_TYPE AS `type`, kcu.COLUMN_NAME AS `column`, \
kcu.REFERENCED_TABLE_SCHEMA AS `usage_schema`, kcu.REFERENCED_TABLE_NAME AS `usage_table`, \
kcu.REFERENCED_COLUMN_NAME AS `usage_column`
FROM information_schema.TABLE_CONSTRAINTS tc
LEFT JOIN information_schema.KEY_COLUMN_USAGE kcu ON tc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
WHERE tc.CONSTRAINT_TYPE IN ('PRIMARY KEY', 'UNIQUE', 'FOREIGN KEY') AND tc.TABLE_SCHEMA NOT IN ({})",
            MYSQL_SYSTEM_SCHEMAS
        ),
        Dialect::MsSql | Dialect::ClickHouse | Dialect::Sqlite => return None,
    };
    Some(CompiledQuery::raw(sql))
}

/// Split on commas that are not inside a single-quoted value.
fn split_quoted_list(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quote = false;
    let mut start = 0;
    for (i, ch) in list.char_indices() {
        match ch {
            '\'' => in_quote = !in_quote,
            ',' if !in_quote => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
}

/// Values of a MySQL `enum('a','b')` or `set('a','b')` column type.
pub fn parse_mysql_enum_or_set(column_type: &str) -> Vec<String> {
    let lower = column_type.to_ascii_lowercase();
    let body = if lower.starts_with("enum(") {
        &column_type[5..]
    } else if lower.starts_with("set(") {
        &column_type[4..]
    } else {
        column_type
    };
    let body = body.strip_suffix(')').unwrap_or(body);
    if body.is_empty() {
        return Vec::new();
    }

    split_quoted_list(body)
        .into_iter()
        .map(|v| {
            let v = v.trim();
            let v = v.strip_prefix('\'').unwrap_or(v);
            let v = v.strip_suffix('\'').unwrap_or(v);
            v.replace("''", "'")
        })
        .collect()
}

/// Labels of a ClickHouse `Enum8('a' = 1, 'b' = 2)` type, in declaration order.
pub fn parse_clickhouse_enum(data_type: &str) -> Vec<String> {
    let Some(body) = CLICKHOUSE_ENUM
        .captures(data_type)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
    else {
        return Vec::new();
    };

    split_quoted_list(body)
        .into_iter()
        .filter_map(|pair| {
            CLICKHOUSE_ENUM_PAIR
                .captures(pair)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        })
        .collect()
}

fn text(row: &Row, key: &str) -> Option<String> {
    match row.get(key)? {
        Json::String(s) => Some(s.clone()),
        Json::Null => None,
        other => Some(other.to_string()),
    }
}

/// Catalog booleans arrive as `true`, `1`, or `'t'` depending on the driver.
fn flag(row: &Row, key: &str) -> bool {
    match row.get(key) {
        Some(Json::Bool(b)) => *b,
        Some(Json::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Json::String(s)) => matches!(s.to_ascii_lowercase().as_str(), "t" | "true" | "1"),
        _ => false,
    }
}

pub fn enums_from_rows(dialect: Dialect, rows: &[Row]) -> Vec<EnumDef> {
    match dialect {
        Dialect::Postgres => {
            let mut grouped: Vec<EnumDef> = Vec::new();
            let mut positions: HashMap<String, usize> = HashMap::new();
            for row in rows {
                let schema = text(row, "schema").unwrap_or_default();
                let name = text(row, "name").unwrap_or_default();
                let value = text(row, "value").unwrap_or_default();
                let key = format!("{}.{}", schema, name);
                match positions.get(&key) {
                    Some(&pos) => grouped[pos].values.push(value),
                    None => {
                        positions.insert(key, grouped.len());
                        grouped.push(EnumDef {
                            schema,
                            name,
                            values: vec![value],
                            metadata: None,
                        });
                    }
                }
            }
            grouped
        }
        Dialect::MySql | Dialect::MsSql => rows
            .iter()
            .map(|row| {
                let name = text(row, "name").unwrap_or_default();
                EnumDef {
                    schema: text(row, "schema").unwrap_or_default(),
                    values: parse_mysql_enum_or_set(&text(row, "value").unwrap_or_default()),
                    metadata: Some(EnumMetadata {
                        is_set: text(row, "data_type").as_deref() == Some("set"),
                        table: text(row, "table"),
                        column: Some(name.clone()),
                    }),
                    name,
                }
            })
            .collect(),
        Dialect::ClickHouse => rows
            .iter()
            .map(|row| {
                let name = text(row, "name").unwrap_or_default();
                EnumDef {
                    schema: text(row, "schema").unwrap_or_default(),
                    values: parse_clickhouse_enum(&text(row, "type").unwrap_or_default()),
                    metadata: Some(EnumMetadata {
                        is_set: false,
                        table: text(row, "table"),
                        column: Some(name.clone()),
                    }),
                    name,
                }
            })
            .filter(|e| !e.values.is_empty())
            .collect(),
        Dialect::Sqlite => Vec::new(),
    }
}

pub fn index_rows_from_rows(dialect: Dialect, rows: &[Row]) -> Vec<IndexColumnRow> {
    rows.iter()
        .map(|row| {
            let mut index = IndexColumnRow {
                schema: text(row, "schema").unwrap_or_default(),
                table: text(row, "table").unwrap_or_default(),
                name: text(row, "name").unwrap_or_default(),
                column: text(row, "column").unwrap_or_default(),
                is_unique: flag(row, "isUnique"),
                is_primary: flag(row, "isPrimary"),
            };
            if dialect == Dialect::ClickHouse {
                index.name = "primary_key".to_string();
                index.is_unique = true;
                index.is_primary = true;
            }
            index
        })
        .collect()
}

/// Rows whose type is not a primary, unique or foreign key are skipped.
pub fn constraints_from_rows(rows: &[Row]) -> Vec<ConstraintRow> {
    rows.iter()
        .filter_map(|row| {
            let kind = match text(row, "type")?.to_ascii_uppercase().as_str() {
                "PRIMARY KEY" => ConstraintKind::PrimaryKey,
                "UNIQUE" => ConstraintKind::Unique,
                "FOREIGN KEY" => ConstraintKind::ForeignKey,
                _ => return None,
            };
            Some(ConstraintRow {
                schema: text(row, "schema").unwrap_or_default(),
                table: text(row, "table").unwrap_or_default(),
                name: text(row, "name").unwrap_or_default(),
                kind,
                column: text(row, "column"),
                usage_schema: text(row, "usage_schema"),
                usage_table: text(row, "usage_table"),
                usage_column: text(row, "usage_column"),
                on_delete: text(row, "on_delete"),
                on_update: text(row, "on_update"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Json) -> Row {
        match value {
            Json::Object(map) => map,
            _ => panic!("row fixture must be an object"),
        }
    }

    #[test]
    fn test_parse_mysql_enum() {
        assert_eq!(
            parse_mysql_enum_or_set("enum('draft','published','it''s, ok')"),
            vec!["draft", "published", "it's, ok"]
        );
        assert_eq!(parse_mysql_enum_or_set("SET('a', 'b')"), vec!["a", "b"]);
        assert!(parse_mysql_enum_or_set("enum()").is_empty());
    }

    #[test]
    fn test_parse_clickhouse_enum() {
        assert_eq!(
            parse_clickhouse_enum("Enum8('new' = 1, 'in, progress' = 2, 'done' = 3)"),
            vec!["new", "in, progress", "done"]
        );
        assert!(parse_clickhouse_enum("String").is_empty());
    }

    #[test]
    fn test_postgres_enum_rows_grouped_in_order() {
        let rows = vec![
            row(json!({"schema": "public", "name": "mood", "value": "sad"})),
            row(json!({"schema": "public", "name": "mood", "value": "ok"})),
            row(json!({"schema": "other", "name": "mood", "value": "x"})),
            row(json!({"schema": "public", "name": "mood", "value": "happy"})),
        ];
        let enums = enums_from_rows(Dialect::Postgres, &rows);
        assert_eq!(enums.len(), 2);
        assert_eq!(enums[0].values, vec!["sad", "ok", "happy"]);
        assert_eq!(enums[1].schema, "other");
    }

    #[test]
    fn test_mysql_enum_rows_carry_binding() {
        let rows = vec![row(json!({
            "schema": "shop", "table": "orders", "name": "tags",
            "value": "set('a','b')", "data_type": "set"
        }))];
        let enums = enums_from_rows(Dialect::MySql, &rows);
        let meta = enums[0].metadata.as_ref().unwrap();
        assert!(meta.is_set);
        assert_eq!(meta.table.as_deref(), Some("orders"));
        assert_eq!(meta.column.as_deref(), Some("tags"));
        assert_eq!(enums[0].values, vec!["a", "b"]);
    }

    #[test]
    fn test_clickhouse_enum_rows_drop_unparseable() {
        let rows = vec![
            row(json!({"schema": "db", "table": "t", "name": "s", "type": "Enum8('a' = 1)"})),
            row(json!({"schema": "db", "table": "t", "name": "n", "type": "Nullable(Enum8)"})),
        ];
        let enums = enums_from_rows(Dialect::ClickHouse, &rows);
        assert_eq!(enums.len(), 1);
        assert_eq!(enums[0].name, "s");
    }

    #[test]
    fn test_index_rows_coerce_flags() {
        let rows = vec![row(json!({
            "schema": "s", "table": "t", "name": "PRIMARY", "column": "id",
            "isUnique": 1, "isPrimary": "t"
        }))];
        let parsed = index_rows_from_rows(Dialect::MySql, &rows);
        assert!(parsed[0].is_unique);
        assert!(parsed[0].is_primary);

        let ch = vec![row(json!({"schema": "db", "table": "events", "column": "ts"}))];
        let parsed = index_rows_from_rows(Dialect::ClickHouse, &ch);
        assert_eq!(parsed[0].name, "primary_key");
        assert!(parsed[0].is_primary);
    }

    #[test]
    fn test_constraint_rows_skip_checks() {
        let rows = vec![
            row(json!({"schema": "public", "table": "posts", "name": "fk", "type": "FOREIGN KEY",
                "column": "author_id", "usage_schema": "public", "usage_table": "users",
                "usage_column": "id"})),
            row(json!({"schema": "public", "table": "posts", "name": "ck", "type": "CHECK",
                "column": null})),
        ];
        let parsed = constraints_from_rows(&rows);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].kind, ConstraintKind::ForeignKey);
        assert_eq!(parsed[0].usage_table.as_deref(), Some("users"));
    }

    #[test]
    fn test_queries_per_dialect() {
        assert!(enums_query(Dialect::Sqlite).is_none());
        assert!(indexes_query(Dialect::Sqlite).is_none());
        assert!(constraints_query(Dialect::ClickHouse).is_none());
        let pg = enums_query(Dialect::Postgres).unwrap();
        assert!(pg.sql.contains("pg_enum"));
        assert!(pg.parameters.is_empty());
        assert!(indexes_query(Dialect::MsSql).unwrap().sql.contains("sys.index_columns"));
    }
}
