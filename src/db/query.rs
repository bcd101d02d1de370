//! Execution adapter: compile, log, dispatch.
//!
//! The transport is the only async seam. Everything an `Executor` sends goes
//! through `dispatch`, which appends a pending log entry under the connection
//! id, calls the transport and settles the entry with rows or an error.

use std::borrow::Cow;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use serde_json::Value as Json;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use super::connection::{ConnectionConfig, DriverRegistry};
use super::log::LogStore;
use crate::editor::segment;
use crate::error::{ExecuteError, TransportError};
use crate::schema::introspect;
use crate::schema::{group_indexes, ConstraintRow, EnumDef, IndexDef};
use crate::sql::{
    CompiledQuery, CountPlan, CountRequest, DeleteRequest, Dialect, InsertRequest, Row,
    SelectRequest, UpdateRequest, Value,
};

static CLICKHOUSE_UPDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^(\s*)UPDATE\s+(.+?)\s+SET\s+").expect("valid clickhouse update regex")
});

/// What a transport returns for one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportOutput {
    pub rows: Vec<Row>,
    pub duration: Duration,
}

/// Runs one statement against a live engine.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        dialect: Dialect,
        connection_string: &str,
        sql: &str,
        values: &[Value],
    ) -> Result<TransportOutput, TransportError>;
}

/// Dialect-specific rewrites applied to every statement right before it is
/// handed to the transport.
pub fn prepare_for_dispatch(dialect: Dialect, sql: &str) -> Cow<'_, str> {
    match dialect {
        Dialect::ClickHouse => CLICKHOUSE_UPDATE.replace(sql, "${1}ALTER TABLE $2 UPDATE "),
        _ => Cow::Borrowed(sql),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowCount {
    pub count: u64,
    pub is_estimated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatementOutcome {
    pub start_line: usize,
    pub end_line: usize,
    pub sql: String,
    pub output: TransportOutput,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptFailure {
    pub start_line: usize,
    pub end_line: usize,
    pub sql: String,
    pub error: TransportError,
}

/// Result of running an editor buffer. Statements after a failure are not run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptReport {
    pub completed: Vec<StatementOutcome>,
    pub failure: Option<ScriptFailure>,
}

impl ScriptReport {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

pub struct Executor<T: Transport> {
    transport: T,
    log: Arc<LogStore>,
    drivers: DriverRegistry,
}

impl<T: Transport> Executor<T> {
    pub fn new(transport: T, log: Arc<LogStore>) -> Self {
        Self {
            transport,
            log,
            drivers: DriverRegistry::new(),
        }
    }

    pub fn log(&self) -> &Arc<LogStore> {
        &self.log
    }

    pub fn drivers(&self) -> &DriverRegistry {
        &self.drivers
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn dispatch(
        &self,
        config: &ConnectionConfig,
        sql: &str,
        parameters: &[Value],
    ) -> Result<TransportOutput, TransportError> {
        let sql = prepare_for_dispatch(config.dialect, sql);
        let id = self.log.append(&config.id, &sql, parameters);
        debug!(
            connection = %config.id,
            dialect = %config.dialect,
            %id,
            parameters = parameters.len(),
            "dispatching sql"
        );

        match self
            .transport
            .execute(config.dialect, &config.connection_string, &sql, parameters)
            .await
        {
            Ok(output) => {
                debug!(
                    %id,
                    rows = output.rows.len(),
                    elapsed_ms = output.duration.as_millis() as u64,
                    "sql completed"
                );
                if !self
                    .log
                    .complete(&config.id, id, output.rows.clone(), output.duration)
                {
                    warn!(connection = %config.id, %id, "log entry vanished before it settled");
                }
                Ok(output)
            }
            Err(err) => {
                error!(
                    connection = %config.id,
                    %id,
                    category = %err.category,
                    code = err.code.as_deref().unwrap_or(""),
                    "sql failed: {}",
                    err.message
                );
                if !self.log.fail(&config.id, id, err.message.clone()) {
                    warn!(connection = %config.id, %id, "log entry vanished before it settled");
                }
                Err(err)
            }
        }
    }

    /// Send editor text as-is, without parameters.
    pub async fn execute_sql(
        &self,
        config: &ConnectionConfig,
        sql: &str,
    ) -> Result<TransportOutput, ExecuteError> {
        Ok(self.dispatch(config, sql, &[]).await?)
    }

    pub async fn execute_compiled(
        &self,
        config: &ConnectionConfig,
        query: &CompiledQuery,
    ) -> Result<TransportOutput, ExecuteError> {
        Ok(self.dispatch(config, &query.sql, &query.parameters).await?)
    }

    pub async fn select_rows(
        &self,
        config: &ConnectionConfig,
        req: &SelectRequest,
    ) -> Result<Vec<Row>, ExecuteError> {
        let query = self.drivers.driver(config).compiler.compile_select(req)?;
        Ok(self.execute_compiled(config, &query).await?.rows)
    }

    /// Row count for a table, preferring the catalog estimate when allowed.
    pub async fn count_rows(
        &self,
        config: &ConnectionConfig,
        req: &CountRequest,
    ) -> Result<RowCount, ExecuteError> {
        let plan = self.drivers.driver(config).compiler.compile_count(req)?;

        if let CountPlan::Estimate { estimate, .. } = &plan {
            match self.execute_compiled(config, estimate).await {
                Ok(output) => {
                    if let Some(count) = first_number(&output.rows, "count").filter(|n| *n >= 0.0) {
                        return Ok(RowCount {
                            count: count.round() as u64,
                            is_estimated: true,
                        });
                    }
                }
                Err(err) => warn!(table = %req.table, "row estimate failed, counting: {}", err),
            }
        }

        let output = self.execute_compiled(config, plan.exact_query()).await?;
        let count = first_number(&output.rows, "total")
            .ok_or_else(|| ExecuteError::Decode("count query returned no total".into()))?;
        Ok(RowCount {
            count: count.max(0.0).round() as u64,
            is_estimated: false,
        })
    }

    pub async fn update_rows(
        &self,
        config: &ConnectionConfig,
        req: &UpdateRequest,
    ) -> Result<TransportOutput, ExecuteError> {
        let query = self.drivers.driver(config).compiler.compile_update(req)?;
        self.execute_compiled(config, &query).await
    }

    pub async fn delete_rows(
        &self,
        config: &ConnectionConfig,
        req: &DeleteRequest,
    ) -> Result<TransportOutput, ExecuteError> {
        let query = self.drivers.driver(config).compiler.compile_delete(req)?;
        self.execute_compiled(config, &query).await
    }

    pub async fn insert_row(
        &self,
        config: &ConnectionConfig,
        req: &InsertRequest,
    ) -> Result<TransportOutput, ExecuteError> {
        let query = self.drivers.driver(config).compiler.compile_insert(req)?;
        self.execute_compiled(config, &query).await
    }

    /// Segment `text` and run every statement in order.
    pub async fn run_script(&self, config: &ConnectionConfig, text: &str) -> ScriptReport {
        let mut report = ScriptReport::default();
        for group in segment(text) {
            for sql in group.statements {
                match self.dispatch(config, &sql, &[]).await {
                    Ok(output) => report.completed.push(StatementOutcome {
                        start_line: group.start_line,
                        end_line: group.end_line,
                        sql,
                        output,
                    }),
                    Err(error) => {
                        report.failure = Some(ScriptFailure {
                            start_line: group.start_line,
                            end_line: group.end_line,
                            sql,
                            error,
                        });
                        return report;
                    }
                }
            }
        }
        report
    }

    /// Row streaming. No dialect implements it; callers page with
    /// `select_rows` instead.
    pub async fn stream(
        &self,
        config: &ConnectionConfig,
        _req: &SelectRequest,
    ) -> Result<mpsc::Receiver<Row>, ExecuteError> {
        Err(ExecuteError::StreamingUnsupported(config.dialect))
    }

    pub async fn introspect_enums(
        &self,
        config: &ConnectionConfig,
    ) -> Result<Vec<EnumDef>, ExecuteError> {
        let Some(query) = introspect::enums_query(config.dialect) else {
            return Ok(Vec::new());
        };
        let output = self.execute_compiled(config, &query).await?;
        Ok(introspect::enums_from_rows(config.dialect, &output.rows))
    }

    /// Indexes of `table`, grouped by name.
    pub async fn introspect_indexes(
        &self,
        config: &ConnectionConfig,
        table: &str,
    ) -> Result<Vec<IndexDef>, ExecuteError> {
        let Some(query) = introspect::indexes_query(config.dialect) else {
            return Ok(Vec::new());
        };
        let output = self.execute_compiled(config, &query).await?;
        let rows = introspect::index_rows_from_rows(config.dialect, &output.rows);
        Ok(group_indexes(&rows, table))
    }

    pub async fn introspect_constraints(
        &self,
        config: &ConnectionConfig,
    ) -> Result<Vec<ConstraintRow>, ExecuteError> {
        let Some(query) = introspect::constraints_query(config.dialect) else {
            return Ok(Vec::new());
        };
        let output = self.execute_compiled(config, &query).await?;
        Ok(introspect::constraints_from_rows(&output.rows))
    }
}

/// Numeric cell from the first row. Engines differ on whether 64-bit
/// aggregates arrive as numbers or strings.
fn first_number(rows: &[Row], key: &str) -> Option<f64> {
    match rows.first()?.get(key)? {
        Json::Number(n) => n.as_f64(),
        Json::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
