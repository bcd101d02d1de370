//! Per-dialect query compiler.
//!
//! Turns table-browsing requests (projection, filters, ordering, paging) and
//! row edits into a SQL string plus ordered parameters for one engine.

use serde::{Deserialize, Serialize};

use super::dialect::Dialect;
use super::filter::{ActiveFilter, ConcatOperator, Operator, SortDirection};
use super::types::{SqlExpr, SqlWriter};
use super::value::Value;
use crate::error::CompileError;

/// Largest LIMIT MySQL accepts; used when only an OFFSET is requested.
const MYSQL_MAX_LIMIT: &str = "18446744073709551615";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub parameters: Vec<Value>,
}

impl CompiledQuery {
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            parameters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    #[serde(default)]
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectRequest {
    pub schema: Option<String>,
    pub table: String,
    /// `None` selects `*`.
    pub columns: Option<Vec<String>>,
    pub filters: Vec<ActiveFilter>,
    pub concat: ConcatOperator,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CountRequest {
    pub schema: Option<String>,
    pub table: String,
    pub filters: Vec<ActiveFilter>,
    pub concat: ConcatOperator,
    pub exact: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub column: String,
    pub value: Value,
}

impl Assignment {
    pub fn new(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateRequest {
    pub schema: Option<String>,
    pub table: String,
    pub set: Vec<Assignment>,
    pub filters: Vec<ActiveFilter>,
    pub concat: ConcatOperator,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteRequest {
    pub schema: Option<String>,
    pub table: String,
    pub filters: Vec<ActiveFilter>,
    pub concat: ConcatOperator,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InsertRequest {
    pub schema: Option<String>,
    pub table: String,
    pub values: Vec<Assignment>,
}

/// How to obtain a table's row count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CountPlan {
    /// Try the catalog estimate first; fall back to `exact` when the estimate
    /// is missing or negative.
    Estimate {
        estimate: CompiledQuery,
        exact: CompiledQuery,
    },
    Exact { exact: CompiledQuery },
}

impl CountPlan {
    pub fn exact_query(&self) -> &CompiledQuery {
        match self {
            CountPlan::Estimate { exact, .. } | CountPlan::Exact { exact } => exact,
        }
    }

    pub fn is_estimated(&self) -> bool {
        matches!(self, CountPlan::Estimate { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compiler {
    dialect: Dialect,
    inline: bool,
}

impl Compiler {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            inline: dialect.inlines_parameters(),
        }
    }

    /// Compiler that inlines every value, for display-only SQL.
    pub fn inline(dialect: Dialect) -> Self {
        Self {
            dialect,
            inline: true,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn writer(&self) -> SqlWriter {
        if self.inline {
            SqlWriter::inline(self.dialect)
        } else {
            SqlWriter::new(self.dialect)
        }
    }

    pub fn compile_select(&self, req: &SelectRequest) -> Result<CompiledQuery, CompileError> {
        let mut w = self.writer();
        let mut parts = Vec::new();

        let projection = match &req.columns {
            Some(cols) if !cols.is_empty() => cols
                .iter()
                .map(|c| w.render(&SqlExpr::ident(c.as_str())))
                .collect::<Vec<_>>()
                .join(", "),
            _ => "*".to_string(),
        };
        parts.push(format!("SELECT {}", projection));
        parts.push(format!(
            "FROM {}",
            w.render(&SqlExpr::table(req.schema.as_deref(), &req.table))
        ));

        if let Some(clause) = self.where_clause(&req.filters, req.concat, &mut w)? {
            parts.push(clause);
        }

        let paged = req.limit.is_some() || req.offset.is_some();
        if !req.order_by.is_empty() {
            let orders: Vec<String> = req
                .order_by
                .iter()
                .map(|o| {
                    format!(
                        "{} {}",
                        w.render(&SqlExpr::ident(o.column.as_str())),
                        o.direction.keyword()
                    )
                })
                .collect();
            parts.push(format!("ORDER BY {}", orders.join(", ")));
        } else if paged && self.dialect == Dialect::MsSql {
            // OFFSET/FETCH is only valid after an ORDER BY.
            parts.push("ORDER BY (SELECT NULL)".to_string());
        }

        if let Some(paging) = self.paging(req.limit, req.offset) {
            parts.push(paging);
        }

        Ok(CompiledQuery {
            sql: parts.join(" "),
            parameters: w.finish(),
        })
    }

    fn paging(&self, limit: Option<u64>, offset: Option<u64>) -> Option<String> {
        match self.dialect {
            Dialect::MsSql => match (limit, offset) {
                (Some(l), o) => Some(format!(
                    "OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
                    o.unwrap_or(0),
                    l
                )),
                (None, Some(o)) => Some(format!("OFFSET {} ROWS", o)),
                (None, None) => None,
            },
            Dialect::Postgres | Dialect::ClickHouse | Dialect::MySql | Dialect::Sqlite => {
                let limit = match (limit, offset, self.dialect) {
                    (Some(l), _, _) => Some(l.to_string()),
                    (None, Some(_), Dialect::MySql) => Some(MYSQL_MAX_LIMIT.to_string()),
                    (None, Some(_), Dialect::Sqlite) => Some("-1".to_string()),
                    _ => None,
                };
                let mut out = Vec::new();
                if let Some(l) = limit {
                    out.push(format!("LIMIT {}", l));
                }
                if let Some(o) = offset {
                    out.push(format!("OFFSET {}", o));
                }
                if out.is_empty() {
                    None
                } else {
                    Some(out.join(" "))
                }
            }
        }
    }

    pub fn compile_count(&self, req: &CountRequest) -> Result<CountPlan, CompileError> {
        let mut w = self.writer();
        let mut sql = format!(
            "SELECT COUNT(*) AS total FROM {}",
            w.render(&SqlExpr::table(req.schema.as_deref(), &req.table))
        );
        if let Some(clause) = self.where_clause(&req.filters, req.concat, &mut w)? {
            sql.push(' ');
            sql.push_str(&clause);
        }
        let exact = CompiledQuery {
            sql,
            parameters: w.finish(),
        };

        if req.exact || !req.filters.is_empty() {
            return Ok(CountPlan::Exact { exact });
        }

        match self.estimate_query(req.schema.as_deref(), &req.table) {
            Some(estimate) => Ok(CountPlan::Estimate { estimate, exact }),
            None => Ok(CountPlan::Exact { exact }),
        }
    }

    /// Catalog-based row estimate. MSSQL and SQLite have no cheap path.
    fn estimate_query(&self, schema: Option<&str>, table: &str) -> Option<CompiledQuery> {
        let mut w = self.writer();
        let schema_expr = |fallback: &str| match schema.filter(|s| !s.is_empty()) {
            Some(s) => SqlExpr::Param(Value::from(s)),
            None => SqlExpr::Raw(fallback.to_string()),
        };
        let (select, conditions) = match self.dialect {
            Dialect::Postgres => (
                "SELECT c.reltuples AS count FROM pg_catalog.pg_class c \
                 INNER JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace",
                vec![
                    ("n.nspname", schema_expr("current_schema()")),
                    ("c.relname", SqlExpr::Param(Value::from(table))),
                ],
            ),
            Dialect::MySql => (
                "SELECT TABLE_ROWS AS count FROM information_schema.TABLES",
                vec![
                    ("TABLE_SCHEMA", schema_expr("DATABASE()")),
                    ("TABLE_NAME", SqlExpr::Param(Value::from(table))),
                ],
            ),
            Dialect::ClickHouse => (
                "SELECT sum(rows) AS count FROM system.parts",
                vec![
                    ("database", schema_expr("currentDatabase()")),
                    ("table", SqlExpr::Param(Value::from(table))),
                    ("active", SqlExpr::Literal(Value::Int(1))),
                ],
            ),
            Dialect::MsSql | Dialect::Sqlite => return None,
        };

        let predicate = SqlExpr::Junction {
            op: ConcatOperator::And,
            items: conditions
                .into_iter()
                .map(|(col, rhs)| SqlExpr::compare(SqlExpr::Raw(col.to_string()), "=", Some(rhs)))
                .collect(),
        };
        let where_sql = w.render(&predicate);
        Some(CompiledQuery {
            sql: format!("{} WHERE {}", select, where_sql),
            parameters: w.finish(),
        })
    }

    pub fn compile_update(&self, req: &UpdateRequest) -> Result<CompiledQuery, CompileError> {
        if req.set.is_empty() {
            return Err(CompileError::EmptyUpdate {
                table: req.table.clone(),
            });
        }
        let mut w = self.writer();
        let table = w.render(&SqlExpr::table(req.schema.as_deref(), &req.table));
        let assignments: Vec<String> = req
            .set
            .iter()
            .map(|a| {
                w.render(&SqlExpr::compare(
                    SqlExpr::ident(a.column.as_str()),
                    "=",
                    Some(SqlExpr::Param(a.value.clone())),
                ))
            })
            .collect();
        let mut sql = format!("UPDATE {} SET {}", table, assignments.join(", "));
        if let Some(clause) = self.where_clause(&req.filters, req.concat, &mut w)? {
            sql.push(' ');
            sql.push_str(&clause);
        }
        Ok(CompiledQuery {
            sql,
            parameters: w.finish(),
        })
    }

    pub fn compile_delete(&self, req: &DeleteRequest) -> Result<CompiledQuery, CompileError> {
        let mut w = self.writer();
        let mut sql = format!(
            "DELETE FROM {}",
            w.render(&SqlExpr::table(req.schema.as_deref(), &req.table))
        );
        if let Some(clause) = self.where_clause(&req.filters, req.concat, &mut w)? {
            sql.push(' ');
            sql.push_str(&clause);
        }
        Ok(CompiledQuery {
            sql,
            parameters: w.finish(),
        })
    }

    pub fn compile_insert(&self, req: &InsertRequest) -> Result<CompiledQuery, CompileError> {
        let mut w = self.writer();
        let table = w.render(&SqlExpr::table(req.schema.as_deref(), &req.table));

        let sql = if req.values.is_empty() {
            match self.dialect {
                Dialect::MySql | Dialect::ClickHouse => format!("INSERT INTO {} () VALUES ()", table),
                _ => format!("INSERT INTO {} DEFAULT VALUES", table),
            }
        } else {
            let columns = SqlExpr::List(
                req.values
                    .iter()
                    .map(|a| SqlExpr::ident(a.column.as_str()))
                    .collect(),
            );
            let values = SqlExpr::List(
                req.values
                    .iter()
                    .map(|a| SqlExpr::Param(a.value.clone()))
                    .collect(),
            );
            let columns = w.render(&columns);
            let values = w.render(&values);
            format!("INSERT INTO {} {} VALUES {}", table, columns, values)
        };

        Ok(CompiledQuery {
            sql,
            parameters: w.finish(),
        })
    }

    /// Render `WHERE …` for the given filters, or `None` when there are none.
    fn where_clause(
        &self,
        filters: &[ActiveFilter],
        concat: ConcatOperator,
        w: &mut SqlWriter,
    ) -> Result<Option<String>, CompileError> {
        if filters.is_empty() {
            return Ok(None);
        }
        let items = filters
            .iter()
            .map(|f| self.predicate(f))
            .collect::<Result<Vec<_>, _>>()?;
        let rendered = w.render(&SqlExpr::Junction { op: concat, items });
        Ok(Some(format!("WHERE {}", rendered)))
    }

    pub fn predicate(&self, filter: &ActiveFilter) -> Result<SqlExpr, CompileError> {
        let op = filter.operator;
        if op.is_case_insensitive() && !self.dialect.supports_ilike() {
            return Err(CompileError::UnsupportedOperator {
                operator: op,
                dialect: self.dialect,
            });
        }

        let column = SqlExpr::ident(filter.column.as_str());
        if !op.has_value() {
            return Ok(SqlExpr::compare(column, op.symbol(), None));
        }

        let operands = filter.operands();
        if op.is_array() {
            if operands.is_empty() {
                // `x IN ()` is a syntax error everywhere; keep the set semantics.
                let constant = match op {
                    Operator::NotIn => "1 = 1",
                    _ => "1 = 0",
                };
                return Ok(SqlExpr::Raw(constant.to_string()));
            }
            let list = SqlExpr::List(operands.into_iter().map(SqlExpr::Param).collect());
            return Ok(SqlExpr::compare(column, op.symbol(), Some(list)));
        }

        match operands.into_iter().next() {
            Some(value) => Ok(SqlExpr::compare(column, op.symbol(), Some(SqlExpr::Param(value)))),
            None => Err(CompileError::MissingValue {
                column: filter.column.clone(),
                operator: op,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users(limit: Option<u64>, offset: Option<u64>) -> SelectRequest {
        SelectRequest {
            schema: Some("public".into()),
            table: "users".into(),
            limit,
            offset,
            ..Default::default()
        }
    }

    #[test]
    fn test_select_all_with_paging() {
        let q = Compiler::new(Dialect::Postgres)
            .compile_select(&users(Some(10), Some(20)))
            .unwrap();
        assert_eq!(
            q.sql,
            "SELECT * FROM \"public\".\"users\" LIMIT 10 OFFSET 20"
        );
        assert!(q.parameters.is_empty());
    }

    #[test]
    fn test_paging_per_dialect() {
        let expected = [
            (Dialect::Postgres, "SELECT * FROM \"public\".\"users\" LIMIT 10 OFFSET 20"),
            (Dialect::MySql, "SELECT * FROM `public`.`users` LIMIT 10 OFFSET 20"),
            (Dialect::ClickHouse, "SELECT * FROM `public`.`users` LIMIT 10 OFFSET 20"),
            (Dialect::Sqlite, "SELECT * FROM \"public\".\"users\" LIMIT 10 OFFSET 20"),
            (
                Dialect::MsSql,
                "SELECT * FROM [public].[users] ORDER BY (SELECT NULL) OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY",
            ),
        ];
        for (dialect, sql) in expected {
            let q = Compiler::new(dialect)
                .compile_select(&users(Some(10), Some(20)))
                .unwrap();
            assert_eq!(q.sql, sql, "{}", dialect);
        }
    }

    #[test]
    fn test_mssql_limit_only_and_explicit_order() {
        let mut req = users(Some(5), None);
        let q = Compiler::new(Dialect::MsSql).compile_select(&req).unwrap();
        assert_eq!(
            q.sql,
            "SELECT * FROM [public].[users] ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY"
        );

        req.order_by = vec![OrderBy {
            column: "name".into(),
            direction: SortDirection::Desc,
        }];
        let q = Compiler::new(Dialect::MsSql).compile_select(&req).unwrap();
        assert_eq!(
            q.sql,
            "SELECT * FROM [public].[users] ORDER BY [name] DESC OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY"
        );
    }

    #[test]
    fn test_offset_only() {
        let req = users(None, Some(20));
        let mysql = Compiler::new(Dialect::MySql).compile_select(&req).unwrap();
        assert!(mysql.sql.ends_with("LIMIT 18446744073709551615 OFFSET 20"));
        let sqlite = Compiler::new(Dialect::Sqlite).compile_select(&req).unwrap();
        assert!(sqlite.sql.ends_with("LIMIT -1 OFFSET 20"));
        let pg = Compiler::new(Dialect::Postgres).compile_select(&req).unwrap();
        assert!(pg.sql.ends_with("\"users\" OFFSET 20"));
        let mssql = Compiler::new(Dialect::MsSql).compile_select(&req).unwrap();
        assert!(mssql.sql.ends_with("ORDER BY (SELECT NULL) OFFSET 20 ROWS"));
    }

    #[test]
    fn test_filters_and_placeholders() {
        let req = SelectRequest {
            table: "users".into(),
            columns: Some(vec!["id".into(), "email".into()]),
            filters: vec![
                ActiveFilter::new("age", Operator::Gte, vec![18.into()]),
                ActiveFilter::new("role", Operator::In, vec![" admin".into(), "staff ".into()]),
                ActiveFilter::new("deleted_at", Operator::IsNull, vec!["ignored".into()]),
            ],
            ..Default::default()
        };

        let q = Compiler::new(Dialect::Postgres).compile_select(&req).unwrap();
        assert_eq!(
            q.sql,
            "SELECT \"id\", \"email\" FROM \"users\" WHERE \"age\" >= $1 AND \"role\" IN ($2, $3) AND \"deleted_at\" IS NULL"
        );
        assert_eq!(
            q.parameters,
            vec![Value::Int(18), Value::from("admin"), Value::from("staff")]
        );

        let q = Compiler::new(Dialect::MsSql).compile_select(&req).unwrap();
        assert_eq!(
            q.sql,
            "SELECT [id], [email] FROM [users] WHERE [age] >= @1 AND [role] IN (@2, @3) AND [deleted_at] IS NULL"
        );

        let q = Compiler::new(Dialect::MySql).compile_select(&req).unwrap();
        assert!(q.sql.contains("`age` >= ? AND `role` IN (?, ?)"));
    }

    #[test]
    fn test_or_concat() {
        let req = SelectRequest {
            table: "t".into(),
            filters: vec![
                ActiveFilter::new("a", Operator::Eq, vec![1.into()]),
                ActiveFilter::new("b", Operator::Eq, vec![2.into()]),
            ],
            concat: ConcatOperator::Or,
            ..Default::default()
        };
        let q = Compiler::new(Dialect::Sqlite).compile_select(&req).unwrap();
        assert_eq!(q.sql, "SELECT * FROM \"t\" WHERE \"a\" = ? OR \"b\" = ?");
    }

    #[test]
    fn test_clickhouse_inlines_values() {
        let req = SelectRequest {
            table: "events".into(),
            filters: vec![ActiveFilter::new("name", Operator::Eq, vec!["it's".into()])],
            limit: Some(1),
            ..Default::default()
        };
        let q = Compiler::new(Dialect::ClickHouse).compile_select(&req).unwrap();
        assert_eq!(q.sql, "SELECT * FROM `events` WHERE `name` = 'it\\'s' LIMIT 1");
        assert!(q.parameters.is_empty());
    }

    #[test]
    fn test_ilike_support() {
        let filter = ActiveFilter::new("name", Operator::ILike, vec!["%a%".into()]);
        assert!(Compiler::new(Dialect::Postgres).predicate(&filter).is_ok());
        assert!(Compiler::new(Dialect::ClickHouse).predicate(&filter).is_ok());
        assert_eq!(
            Compiler::new(Dialect::MySql).predicate(&filter),
            Err(CompileError::UnsupportedOperator {
                operator: Operator::ILike,
                dialect: Dialect::MySql,
            })
        );
    }

    #[test]
    fn test_missing_value_fails_fast() {
        let filter = ActiveFilter::new("name", Operator::Eq, vec![]);
        assert_eq!(
            Compiler::new(Dialect::Postgres).predicate(&filter),
            Err(CompileError::MissingValue {
                column: "name".into(),
                operator: Operator::Eq,
            })
        );
    }

    #[test]
    fn test_empty_in_list() {
        let mut w = SqlWriter::new(Dialect::Postgres);
        let c = Compiler::new(Dialect::Postgres);
        let empty_in = c
            .predicate(&ActiveFilter::new("id", Operator::In, vec![]))
            .unwrap();
        assert_eq!(w.render(&empty_in), "1 = 0");
        let empty_not_in = c
            .predicate(&ActiveFilter::new("id", Operator::NotIn, vec![]))
            .unwrap();
        assert_eq!(w.render(&empty_not_in), "1 = 1");
    }

    #[test]
    fn test_count_plan() {
        let c = Compiler::new(Dialect::Postgres);
        let req = CountRequest {
            schema: Some("public".into()),
            table: "users".into(),
            ..Default::default()
        };
        match c.compile_count(&req).unwrap() {
            CountPlan::Estimate { estimate, exact } => {
                assert_eq!(
                    estimate.sql,
                    "SELECT c.reltuples AS count FROM pg_catalog.pg_class c INNER JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace WHERE n.nspname = $1 AND c.relname = $2"
                );
                assert_eq!(
                    estimate.parameters,
                    vec![Value::from("public"), Value::from("users")]
                );
                assert_eq!(exact.sql, "SELECT COUNT(*) AS total FROM \"public\".\"users\"");
            }
            other => panic!("expected estimate, got {:?}", other),
        }

        let exact_req = CountRequest {
            exact: true,
            ..req.clone()
        };
        assert!(!c.compile_count(&exact_req).unwrap().is_estimated());

        let filtered = CountRequest {
            filters: vec![ActiveFilter::new("id", Operator::Gt, vec![1.into()])],
            ..req.clone()
        };
        let plan = c.compile_count(&filtered).unwrap();
        assert!(!plan.is_estimated());
        assert_eq!(
            plan.exact_query().sql,
            "SELECT COUNT(*) AS total FROM \"public\".\"users\" WHERE \"id\" > $1"
        );

        for dialect in [Dialect::MsSql, Dialect::Sqlite] {
            assert!(!Compiler::new(dialect).compile_count(&req).unwrap().is_estimated());
        }
    }

    #[test]
    fn test_clickhouse_estimate() {
        let req = CountRequest {
            schema: Some("default".into()),
            table: "events".into(),
            ..Default::default()
        };
        let plan = Compiler::new(Dialect::ClickHouse).compile_count(&req).unwrap();
        match plan {
            CountPlan::Estimate { estimate, .. } => {
                assert_eq!(
                    estimate.sql,
                    "SELECT sum(rows) AS count FROM system.parts WHERE database = 'default' AND table = 'events' AND active = 1"
                );
                assert!(estimate.parameters.is_empty());
            }
            other => panic!("expected estimate, got {:?}", other),
        }

        let mysql = Compiler::new(Dialect::MySql)
            .compile_count(&CountRequest {
                table: "t".into(),
                ..Default::default()
            })
            .unwrap();
        match mysql {
            CountPlan::Estimate { estimate, .. } => assert_eq!(
                estimate.sql,
                "SELECT TABLE_ROWS AS count FROM information_schema.TABLES WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?"
            ),
            other => panic!("expected estimate, got {:?}", other),
        }
    }

    #[test]
    fn test_update_delete_insert() {
        let c = Compiler::new(Dialect::Postgres);
        let filters = vec![ActiveFilter::new("id", Operator::Eq, vec![7.into()])];

        let update = c
            .compile_update(&UpdateRequest {
                table: "users".into(),
                set: vec![Assignment::new("name", "Ann"), Assignment::new("active", true)],
                filters: filters.clone(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(
            update.sql,
            "UPDATE \"users\" SET \"name\" = $1, \"active\" = $2 WHERE \"id\" = $3"
        );
        assert_eq!(
            update.parameters,
            vec![Value::from("Ann"), Value::Bool(true), Value::Int(7)]
        );

        let delete = c
            .compile_delete(&DeleteRequest {
                table: "users".into(),
                filters,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(delete.sql, "DELETE FROM \"users\" WHERE \"id\" = $1");

        let insert = Compiler::new(Dialect::MsSql)
            .compile_insert(&InsertRequest {
                schema: Some("dbo".into()),
                table: "users".into(),
                values: vec![Assignment::new("name", "Ann"), Assignment::new("active", false)],
            })
            .unwrap();
        assert_eq!(
            insert.sql,
            "INSERT INTO [dbo].[users] ([name], [active]) VALUES (@1, @2)"
        );
        assert_eq!(insert.parameters.len(), 2);
    }

    #[test]
    fn test_empty_update_is_rejected() {
        let err = Compiler::new(Dialect::Postgres)
            .compile_update(&UpdateRequest {
                table: "users".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::EmptyUpdate {
                table: "users".into()
            }
        );
    }

    #[test]
    fn test_inline_compiler_for_display() {
        let req = SelectRequest {
            table: "users".into(),
            filters: vec![ActiveFilter::new("active", Operator::Eq, vec![true.into()])],
            ..Default::default()
        };
        let q = Compiler::inline(Dialect::MsSql).compile_select(&req).unwrap();
        assert_eq!(q.sql, "SELECT * FROM [users] WHERE [active] = 1");
        assert!(q.parameters.is_empty());
    }
}
