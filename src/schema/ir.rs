//! Normalized table structure shared by every code generator.
//!
//! Field names serialize in camelCase so JSON emitted by introspection tools
//! can be fed in unchanged.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::sql::Dialect;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Column {
    pub id: String,
    /// Engine-native type name, e.g. `character varying` or `Nullable(String)`.
    #[serde(rename = "type")]
    pub data_type: String,
    pub is_nullable: bool,
    pub is_editable: bool,
    pub primary_key: bool,
    pub unique: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    /// Name of the enum type this column uses, when the engine reports one.
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign: Option<ForeignKey>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<Reference>,
}

impl Column {
    pub fn new(id: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data_type: data_type.into(),
            is_editable: true,
            ..Default::default()
        }
    }

    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Outgoing foreign-key edge on the owning column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    pub schema: String,
    pub table: String,
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Incoming foreign-key edge on the referenced column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub schema: String,
    pub table: String,
    pub column: String,
    #[serde(default)]
    pub is_unique: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumMetadata {
    #[serde(default)]
    pub is_set: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

/// An enum type, or a column-bound enum on engines without named enum types.
///
/// Value order is the engine's ordinal and is preserved by every emitter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumDef {
    pub schema: String,
    pub name: String,
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EnumMetadata>,
}

impl EnumDef {
    pub fn new(schema: impl Into<String>, name: impl Into<String>, values: &[&str]) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            values: values.iter().map(|v| v.to_string()).collect(),
            metadata: None,
        }
    }

    /// Multi-valued (`SET`) enums map to arrays in typed targets.
    pub fn is_set(&self) -> bool {
        self.metadata.as_ref().is_some_and(|m| m.is_set)
    }

    fn binds(&self, table: &str, column: &str) -> bool {
        self.metadata.as_ref().is_some_and(|m| {
            m.table.as_deref() == Some(table) && m.column.as_deref() == Some(column)
        })
    }

    fn matches(&self, column: &Column, table: &str) -> bool {
        self.binds(table, &column.id)
            || column.enum_ref.as_deref() == Some(self.name.as_str())
            || (!column.data_type.is_empty() && column.data_type == self.name)
    }
}

/// Resolve the enum a column uses.
///
/// The first enum in list order that binds `(table, column)`, matches the
/// column's declared enum name, or matches its raw type wins. Several matches
/// are reported with a warning but the result stays first-match so generated
/// output does not change between runs.
pub fn find_enum<'a>(enums: &'a [EnumDef], column: &Column, table: &str) -> Option<&'a EnumDef> {
    let mut matches = enums.iter().filter(|e| e.matches(column, table));
    let first = matches.next()?;
    let others: Vec<String> = matches.map(|e| format!("{}.{}", e.schema, e.name)).collect();
    if !others.is_empty() {
        warn!(
            table,
            column = %column.id,
            chosen = %format!("{}.{}", first.schema, first.name),
            ignored = ?others,
            "ambiguous enum for column; using the first match"
        );
    }
    Some(first)
}

/// One row per (index, column) as returned by the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexColumnRow {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub column: String,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDef {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub is_primary: bool,
}

/// Group per-column index rows of `table` into one `IndexDef` per name,
/// keeping index and column order of first appearance.
pub fn group_indexes(rows: &[IndexColumnRow], table: &str) -> Vec<IndexDef> {
    let mut grouped: Vec<IndexDef> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for row in rows.iter().filter(|r| r.table == table) {
        match positions.get(row.name.as_str()) {
            Some(&pos) => grouped[pos].columns.push(row.column.clone()),
            None => {
                positions.insert(row.name.as_str(), grouped.len());
                grouped.push(IndexDef {
                    schema: row.schema.clone(),
                    table: row.table.clone(),
                    name: row.name.clone(),
                    columns: vec![row.column.clone()],
                    is_unique: row.is_unique,
                    is_primary: row.is_primary,
                });
            }
        }
    }

    grouped
}

/// Indexes that need their own statement: primary keys and single-column
/// unique indexes already expressed by a column's `unique` flag are dropped.
/// ClickHouse has no secondary indexes in generated DDL.
pub fn explicit_indexes(grouped: &[IndexDef], columns: &[Column], dialect: Dialect) -> Vec<IndexDef> {
    if dialect == Dialect::ClickHouse {
        return Vec::new();
    }
    grouped
        .iter()
        .filter(|idx| !idx.is_primary)
        .filter(|idx| {
            let redundant_unique = idx.is_unique
                && idx.columns.len() == 1
                && columns.iter().any(|c| c.id == idx.columns[0] && c.unique);
            !redundant_unique
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
    ForeignKey,
}

/// One row of the catalog's constraint listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintRow {
    pub schema: String,
    pub table: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ConstraintKind,
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub usage_schema: Option<String>,
    #[serde(default)]
    pub usage_table: Option<String>,
    #[serde(default)]
    pub usage_column: Option<String>,
    #[serde(default)]
    pub on_delete: Option<String>,
    #[serde(default)]
    pub on_update: Option<String>,
}

impl ConstraintRow {
    fn owns(&self, schema: &str, table: &str, column: &str) -> bool {
        self.schema == schema && self.table == table && self.column.as_deref() == Some(column)
    }

    fn targets(&self, schema: &str, table: &str, column: &str) -> bool {
        self.usage_schema.as_deref() == Some(schema)
            && self.usage_table.as_deref() == Some(table)
            && self.usage_column.as_deref() == Some(column)
    }
}

/// Fold catalog constraints into the columns of `schema.table`.
///
/// Sets primary/unique flags, the outgoing `foreign` edge, and one `references`
/// entry per foreign key elsewhere that points at a column of this table.
pub fn apply_constraints(
    schema: &str,
    table: &str,
    mut columns: Vec<Column>,
    constraints: &[ConstraintRow],
) -> Vec<Column> {
    let is_unique_column = |s: &str, t: &str, c: &str| {
        constraints.iter().any(|row| {
            matches!(row.kind, ConstraintKind::PrimaryKey | ConstraintKind::Unique)
                && row.owns(s, t, c)
        })
    };

    for column in &mut columns {
        for row in constraints {
            match row.kind {
                ConstraintKind::PrimaryKey if row.owns(schema, table, &column.id) => {
                    column.primary_key = true;
                }
                ConstraintKind::Unique if row.owns(schema, table, &column.id) => {
                    column.unique = true;
                }
                ConstraintKind::ForeignKey => {
                    if row.owns(schema, table, &column.id) {
                        if let (Some(t), Some(c)) = (&row.usage_table, &row.usage_column) {
                            column.foreign = Some(ForeignKey {
                                schema: row.usage_schema.clone().unwrap_or_else(|| schema.to_string()),
                                table: t.clone(),
                                column: c.clone(),
                                on_delete: row.on_delete.clone(),
                                on_update: row.on_update.clone(),
                                name: Some(row.name.clone()),
                            });
                        }
                    }
                    if row.targets(schema, table, &column.id) {
                        if let Some(source_column) = &row.column {
                            let reference = Reference {
                                schema: row.schema.clone(),
                                table: row.table.clone(),
                                column: source_column.clone(),
                                is_unique: is_unique_column(&row.schema, &row.table, source_column),
                            };
                            if !column.references.contains(&reference) {
                                column.references.push(reference);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx_row(table: &str, name: &str, column: &str, unique: bool, primary: bool) -> IndexColumnRow {
        IndexColumnRow {
            schema: "public".into(),
            table: table.into(),
            name: name.into(),
            column: column.into(),
            is_unique: unique,
            is_primary: primary,
        }
    }

    #[test]
    fn test_column_deserializes_from_camel_case() {
        let column: Column = serde_json::from_str(
            r#"{"id":"status","type":"order_status","isNullable":true,"enum":"order_status","maxLength":20}"#,
        )
        .unwrap();
        assert_eq!(column.data_type, "order_status");
        assert_eq!(column.enum_ref.as_deref(), Some("order_status"));
        assert!(column.is_nullable);
        assert_eq!(column.max_length, Some(20));
        assert!(column.references.is_empty());
    }

    #[test]
    fn test_find_enum_by_metadata_binding() {
        let mut bound = EnumDef::new("shop", "status", &["a", "b"]);
        bound.metadata = Some(EnumMetadata {
            is_set: false,
            table: Some("orders".into()),
            column: Some("state".into()),
        });
        let enums = vec![bound];
        let column = Column::new("state", "enum('a','b')");
        assert_eq!(find_enum(&enums, &column, "orders"), Some(&enums[0]));
        assert_eq!(find_enum(&enums, &column, "users"), None);
    }

    #[test]
    fn test_find_enum_by_declared_name_or_type() {
        let enums = vec![
            EnumDef::new("public", "mood", &["sad", "happy"]),
            EnumDef::new("public", "color", &["red"]),
        ];
        let mut by_name = Column::new("c", "USER-DEFINED");
        by_name.enum_ref = Some("color".into());
        assert_eq!(find_enum(&enums, &by_name, "t").map(|e| e.name.as_str()), Some("color"));

        let by_type = Column::new("m", "mood");
        assert_eq!(find_enum(&enums, &by_type, "t").map(|e| e.name.as_str()), Some("mood"));

        assert_eq!(find_enum(&enums, &Column::new("x", "text"), "t"), None);
    }

    #[test]
    fn test_find_enum_first_match_wins_across_schemas() {
        let enums = vec![
            EnumDef::new("a", "status", &["one"]),
            EnumDef::new("b", "status", &["two"]),
        ];
        let column = Column::new("s", "status");
        let found = find_enum(&enums, &column, "t").unwrap();
        assert_eq!(found.schema, "a");
    }

    #[test]
    fn test_group_indexes_preserves_first_seen_order() {
        let rows = vec![
            idx_row("users", "users_name_idx", "last_name", false, false),
            idx_row("posts", "posts_pkey", "id", true, true),
            idx_row("users", "users_pkey", "id", true, true),
            idx_row("users", "users_name_idx", "first_name", false, false),
        ];
        let grouped = group_indexes(&rows, "users");
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].name, "users_name_idx");
        assert_eq!(grouped[0].columns, vec!["last_name", "first_name"]);
        assert_eq!(grouped[1].name, "users_pkey");
        assert!(grouped[1].is_primary);
    }

    #[test]
    fn test_group_indexes_is_idempotent() {
        let rows = vec![
            idx_row("t", "a", "x", false, false),
            idx_row("t", "b", "y", true, false),
            idx_row("t", "a", "z", false, false),
        ];
        let first = serde_json::to_string(&group_indexes(&rows, "t")).unwrap();
        let second = serde_json::to_string(&group_indexes(&rows, "t")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_explicit_indexes_skip_redundant() {
        let rows = vec![
            idx_row("users", "users_pkey", "id", true, true),
            idx_row("users", "users_email_key", "email", true, false),
            idx_row("users", "users_slug_key", "slug", true, false),
            idx_row("users", "users_name_idx", "name", false, false),
        ];
        let columns = vec![
            Column::new("id", "integer").primary(),
            Column::new("email", "text").unique(),
            Column::new("slug", "text"),
            Column::new("name", "text"),
        ];
        let grouped = group_indexes(&rows, "users");
        let names: Vec<String> = explicit_indexes(&grouped, &columns, Dialect::Postgres)
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["users_slug_key", "users_name_idx"]);
        assert!(explicit_indexes(&grouped, &columns, Dialect::ClickHouse).is_empty());
    }

    #[test]
    fn test_apply_constraints_links_both_ends() {
        let constraints = vec![
            ConstraintRow {
                schema: "public".into(),
                table: "users".into(),
                name: "users_pkey".into(),
                kind: ConstraintKind::PrimaryKey,
                column: Some("id".into()),
                usage_schema: None,
                usage_table: None,
                usage_column: None,
                on_delete: None,
                on_update: None,
            },
            ConstraintRow {
                schema: "public".into(),
                table: "posts".into(),
                name: "posts_author_id_fkey".into(),
                kind: ConstraintKind::ForeignKey,
                column: Some("author_id".into()),
                usage_schema: Some("public".into()),
                usage_table: Some("users".into()),
                usage_column: Some("id".into()),
                on_delete: Some("CASCADE".into()),
                on_update: None,
            },
        ];

        let users = apply_constraints(
            "public",
            "users",
            vec![Column::new("id", "integer")],
            &constraints,
        );
        assert!(users[0].primary_key);
        assert_eq!(
            users[0].references,
            vec![Reference {
                schema: "public".into(),
                table: "posts".into(),
                column: "author_id".into(),
                is_unique: false,
            }]
        );

        let posts = apply_constraints(
            "public",
            "posts",
            vec![Column::new("author_id", "integer")],
            &constraints,
        );
        let fk = posts[0].foreign.as_ref().unwrap();
        assert_eq!(fk.table, "users");
        assert_eq!(fk.column, "id");
        assert_eq!(fk.on_delete.as_deref(), Some("CASCADE"));
    }
}
