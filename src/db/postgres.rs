//! `Transport` over tokio-postgres.
//!
//! Each call opens its own client, so concurrent statements never share a
//! session. TLS follows the `sslmode` of the connection string.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use postgres_native_tls::MakeTlsConnector;
use rust_decimal::Decimal;
use serde_json::Value as Json;
use tokio_postgres::config::SslMode;
use tokio_postgres::types::{to_sql_checked, FromSql, IsNull, Kind, ToSql, Type};
use tokio_postgres::{Client, Config, NoTls, SimpleQueryMessage, Statement};
use tracing::{debug, warn};
use uuid::Uuid;

use super::query::{Transport, TransportOutput};
use crate::error::{ErrorCategory, TransportError};
use crate::sql::{Dialect, Row, Value};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

type Param = Box<dyn ToSql + Sync + Send>;

type BoxError = Box<dyn std::error::Error + Sync + Send>;

#[derive(Debug, Clone)]
pub struct PostgresTransport {
    connect_timeout: Duration,
    accept_invalid_certs: bool,
    ca_cert_path: Option<PathBuf>,
}

impl Default for PostgresTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl PostgresTransport {
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            accept_invalid_certs: false,
            ca_cert_path: None,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Skip certificate verification. Ignored for `verify-ca`/`verify-full`.
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// PEM bundle added to the system roots.
    pub fn with_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert_path = Some(path.into());
        self
    }

    fn tls_connector(&self, strict: bool) -> Result<MakeTlsConnector, TransportError> {
        let mut builder = native_tls::TlsConnector::builder();
        if self.accept_invalid_certs && !strict {
            builder.danger_accept_invalid_certs(true);
            builder.danger_accept_invalid_hostnames(true);
        } else if let Some(path) = &self.ca_cert_path {
            let pem = std::fs::read(path).map_err(|e| {
                connection_error(format!("failed to read CA certificate {}: {}", path.display(), e))
            })?;
            for cert in split_pem(&pem) {
                let cert = native_tls::Certificate::from_pem(cert)
                    .map_err(|e| connection_error(format!("invalid CA certificate: {}", e)))?;
                builder.add_root_certificate(cert);
            }
        }
        let connector = builder
            .build()
            .map_err(|e| connection_error(format!("failed to build TLS connector: {}", e)))?;
        Ok(MakeTlsConnector::new(connector))
    }

    async fn connect(&self, connection_string: &str) -> Result<Client, TransportError> {
        let config: Config = connection_string
            .parse()
            .map_err(|e| connection_error(format!("invalid connection string: {}", e)))?;

        let client = match config.get_ssl_mode() {
            SslMode::Disable => {
                let (client, connection) = tokio::time::timeout(self.connect_timeout, config.connect(NoTls))
                    .await
                    .map_err(|_| self.timed_out())?
                    .map_err(|e| pg_error(&e))?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        warn!("postgres connection error: {}", e);
                    }
                });
                client
            }
            mode => {
                let strict = !matches!(mode, SslMode::Prefer | SslMode::Require);
                let tls = self.tls_connector(strict)?;
                let (client, connection) = tokio::time::timeout(self.connect_timeout, config.connect(tls))
                    .await
                    .map_err(|_| self.timed_out())?
                    .map_err(|e| pg_error(&e))?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        warn!("postgres connection error: {}", e);
                    }
                });
                client
            }
        };
        Ok(client)
    }

    fn timed_out(&self) -> TransportError {
        connection_error(format!(
            "connection timed out after {}s",
            self.connect_timeout.as_secs()
        ))
    }
}

#[async_trait]
impl Transport for PostgresTransport {
    async fn execute(
        &self,
        dialect: Dialect,
        connection_string: &str,
        sql: &str,
        values: &[Value],
    ) -> Result<TransportOutput, TransportError> {
        if dialect != Dialect::Postgres {
            return Err(TransportError::with_category(
                ErrorCategory::Connection,
                format!("the postgres transport cannot reach {} connections", dialect),
            ));
        }

        let client = self.connect(connection_string).await?;
        let start = Instant::now();

        // Prepared statements accept a single command; parameterless text
        // with several goes through the simple protocol.
        let rows = if values.is_empty() && has_multiple_statements(sql) {
            debug!("running multi-statement text over the simple protocol");
            let messages = client.simple_query(sql).await.map_err(|e| pg_error(&e))?;
            simple_rows(&messages)
        } else {
            let statement = client.prepare(sql).await.map_err(|e| pg_error(&e))?;
            let undecodable = statement
                .columns()
                .iter()
                .find(|c| !has_decoder(c.type_()))
                .map(|c| c.type_().name().to_string());
            match undecodable {
                None => query(&client, &statement, values)
                    .await?
                    .iter()
                    .map(decode_row)
                    .collect(),
                Some(ty) if values.is_empty() => {
                    debug!(%ty, "no binary decoder for result column; using the simple protocol");
                    let messages = client.simple_query(sql).await.map_err(|e| pg_error(&e))?;
                    simple_rows(&messages)
                }
                Some(ty) => {
                    debug!(%ty, "no binary decoder for result column; selecting rows as json");
                    let wrapped = client
                        .prepare(&json_rows_sql(sql))
                        .await
                        .map_err(|e| pg_error(&e))?;
                    query(&client, &wrapped, values)
                        .await?
                        .iter()
                        .map(json_row)
                        .collect()
                }
            }
        };

        Ok(TransportOutput {
            rows,
            duration: start.elapsed(),
        })
    }
}

async fn query(
    client: &Client,
    statement: &Statement,
    values: &[Value],
) -> Result<Vec<tokio_postgres::Row>, TransportError> {
    let params = statement
        .params()
        .iter()
        .zip(values)
        .map(|(ty, value)| bind(value, ty))
        .collect::<Result<Vec<Param>, _>>()?;
    let refs: Vec<&(dyn ToSql + Sync)> = params
        .iter()
        .map(|p| p.as_ref() as &(dyn ToSql + Sync))
        .collect();
    client
        .query(statement, &refs)
        .await
        .map_err(|e| pg_error(&e))
}

/// Wrap a row-returning statement so each row arrives as one `json` cell.
/// Data-modifying statements with `RETURNING` are valid inside `WITH`.
fn json_rows_sql(sql: &str) -> String {
    let body = sql.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    format!(
        "WITH polysql_rows AS (\n{}\n) SELECT row_to_json(polysql_rows) AS row FROM polysql_rows",
        body
    )
}

fn json_row(row: &tokio_postgres::Row) -> Row {
    match get::<Json>(row, 0) {
        Some(Json::Object(map)) => map,
        _ => Row::new(),
    }
}

/// A value whose binary wire form is its UTF-8 text: enum labels, text
/// domains and extension types such as `citext`.
#[derive(Debug, Clone, PartialEq)]
struct Label(String);

fn is_textual(ty: &Type) -> bool {
    match ty.kind() {
        Kind::Enum(_) => true,
        Kind::Domain(inner) => is_textual(inner),
        _ => {
            matches!(
                *ty,
                Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN | Type::XML
            ) || ty.name() == "citext"
        }
    }
}

impl ToSql for Label {
    fn to_sql(&self, _ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        out.extend_from_slice(self.0.as_bytes());
        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        is_textual(ty)
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for Label {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        Ok(Label(std::str::from_utf8(raw)?.to_string()))
    }

    fn accepts(ty: &Type) -> bool {
        is_textual(ty)
    }
}

fn connection_error(message: String) -> TransportError {
    TransportError::with_category(ErrorCategory::Connection, message)
}

fn pg_error(err: &tokio_postgres::Error) -> TransportError {
    match err.as_db_error() {
        Some(db) => {
            let code = db.code().code().to_string();
            TransportError {
                category: categorize_sqlstate(&code),
                message: db.message().to_string(),
                code: Some(code),
            }
        }
        None if std::error::Error::source(err).is_some() || err.is_closed() => {
            connection_error(err.to_string())
        }
        None => TransportError::new(err.to_string()),
    }
}

/// Map a SQLSTATE code to an `ErrorCategory` by its class.
pub fn categorize_sqlstate(code: &str) -> ErrorCategory {
    let Some(class) = code.get(..2) else {
        return ErrorCategory::Unknown;
    };
    match class {
        "42" if code == "42601" || code == "42000" => ErrorCategory::Syntax,
        "42" => ErrorCategory::Semantic,
        "22" | "23" | "53" | "54" | "55" | "57" => ErrorCategory::Execution,
        "25" | "40" => ErrorCategory::Transaction,
        "08" => ErrorCategory::Connection,
        _ => ErrorCategory::Unknown,
    }
}

fn has_multiple_statements(sql: &str) -> bool {
    crate::editor::segment(sql)
        .iter()
        .map(|g| g.statements.len())
        .sum::<usize>()
        > 1
}

fn split_pem(pem: &[u8]) -> Vec<&[u8]> {
    const END: &[u8] = b"-----END CERTIFICATE-----";
    let mut certs = Vec::new();
    let mut start = 0;
    while let Some(pos) = pem[start..].windows(END.len()).position(|w| w == END) {
        let end = start + pos + END.len();
        certs.push(&pem[start..end]);
        start = end;
    }
    certs
}

/// Build a typed parameter for the column type the server inferred.
fn bind(value: &Value, ty: &Type) -> Result<Param, TransportError> {
    match *ty {
        Type::BOOL => typed(value, ty, as_bool),
        Type::INT2 => typed(value, ty, |v| as_i64(v).and_then(|i| i16::try_from(i).ok())),
        Type::INT4 => typed(value, ty, |v| as_i64(v).and_then(|i| i32::try_from(i).ok())),
        Type::INT8 => typed(value, ty, as_i64),
        Type::FLOAT4 => typed(value, ty, |v| as_f64(v).map(|f| f as f32)),
        Type::FLOAT8 => typed(value, ty, as_f64),
        Type::DATE => typed(value, ty, as_date),
        Type::TIMESTAMP => typed(value, ty, |v| as_datetime(v).map(|dt| dt.naive_utc())),
        Type::TIMESTAMPTZ => typed(value, ty, as_datetime),
        Type::UUID => typed(value, ty, |v| Uuid::parse_str(&v.display()).ok()),
        Type::JSON | Type::JSONB => typed(value, ty, |v| match v {
            Value::Text(s) => Some(serde_json::from_str(s).unwrap_or_else(|_| Json::String(s.clone()))),
            other => Some(other.to_json()),
        }),
        Type::NUMERIC => typed(value, ty, as_decimal),
        _ if is_textual(ty) => typed(value, ty, |v| Some(Label(v.display()))),
        _ => Err(TransportError::with_category(
            ErrorCategory::Execution,
            format!(
                "cannot bind parameters of type {}; cast the placeholder, e.g. $1::text",
                ty.name()
            ),
        )),
    }
}

fn typed<T>(value: &Value, ty: &Type, convert: impl Fn(&Value) -> Option<T>) -> Result<Param, TransportError>
where
    T: ToSql + Sync + Send + 'static,
{
    if value.is_null() {
        return Ok(Box::new(None::<T>));
    }
    match convert(value) {
        Some(v) => Ok(Box::new(v)),
        None => Err(TransportError::with_category(
            ErrorCategory::Execution,
            format!("cannot bind {:?} as {}", value.display(), ty.name()),
        )),
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Int(i) => Some(*i != 0),
        Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "t" | "true" | "1" | "yes" => Some(true),
            "f" | "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
        Value::Bool(b) => Some(*b as i64),
        Value::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        Value::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Int(i) => Some(Decimal::from(*i)),
        Value::Float(f) => Decimal::try_from(*f).ok(),
        Value::Text(s) => {
            let s = s.trim();
            s.parse().ok().or_else(|| Decimal::from_scientific(s).ok())
        }
        _ => None,
    }
}

fn as_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::DateTime(dt) => Some(dt.date_naive()),
        Value::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
        _ => None,
    }
}

fn as_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::DateTime(dt) => Some(*dt),
        Value::Date(d) => d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()),
        Value::Text(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
                        .iter()
                        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                        .map(|dt| dt.and_utc())
                })
                .or_else(|| as_date(&Value::Text(s.to_string()))?.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()))
        }
        _ => None,
    }
}

fn simple_rows(messages: &[SimpleQueryMessage]) -> Vec<Row> {
    messages
        .iter()
        .filter_map(|message| match message {
            SimpleQueryMessage::Row(row) => Some(
                row.columns()
                    .iter()
                    .enumerate()
                    .map(|(i, col)| {
                        let cell = row.get(i).map(|s| Json::String(s.to_string())).unwrap_or(Json::Null);
                        (col.name().to_string(), cell)
                    })
                    .collect(),
            ),
            _ => None,
        })
        .collect()
}

fn decode_row(row: &tokio_postgres::Row) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| (col.name().to_string(), decode_cell(row, i, col.type_())))
        .collect()
}

fn get<'a, T>(row: &'a tokio_postgres::Row, idx: usize) -> Option<T>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get::<_, Option<T>>(idx).ok().flatten()
}

fn number(f: Option<f64>) -> Json {
    f.and_then(serde_json::Number::from_f64)
        .map(Json::Number)
        .unwrap_or(Json::Null)
}

fn decode_cell(row: &tokio_postgres::Row, idx: usize, ty: &Type) -> Json {
    match *ty {
        Type::BOOL => get::<bool>(row, idx).map(Json::Bool).unwrap_or(Json::Null),
        Type::INT2 => get::<i16>(row, idx).map(Json::from).unwrap_or(Json::Null),
        Type::INT4 => get::<i32>(row, idx).map(Json::from).unwrap_or(Json::Null),
        Type::INT8 => get::<i64>(row, idx).map(Json::from).unwrap_or(Json::Null),
        Type::OID => get::<u32>(row, idx).map(Json::from).unwrap_or(Json::Null),
        Type::FLOAT4 => number(get::<f32>(row, idx).map(f64::from)),
        Type::FLOAT8 => number(get::<f64>(row, idx)),
        Type::DATE => get::<NaiveDate>(row, idx)
            .map(|d| Json::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Json::Null),
        Type::TIME => get::<NaiveTime>(row, idx)
            .map(|t| Json::String(t.to_string()))
            .unwrap_or(Json::Null),
        Type::TIMESTAMP => get::<NaiveDateTime>(row, idx)
            .map(|dt| Json::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
            .unwrap_or(Json::Null),
        Type::TIMESTAMPTZ => get::<DateTime<Utc>>(row, idx)
            .map(|dt| Json::String(dt.to_rfc3339()))
            .unwrap_or(Json::Null),
        Type::UUID => get::<Uuid>(row, idx)
            .map(|u| Json::String(u.to_string()))
            .unwrap_or(Json::Null),
        Type::JSON | Type::JSONB => get::<Json>(row, idx).unwrap_or(Json::Null),
        Type::BYTEA => get::<Vec<u8>>(row, idx)
            .map(|bytes| {
                let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
                Json::String(format!("\\x{}", hex))
            })
            .unwrap_or(Json::Null),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY => get::<Vec<Option<String>>>(row, idx)
            .map(|items| items.into_iter().map(|s| s.map(Json::String).unwrap_or(Json::Null)).collect())
            .unwrap_or(Json::Null),
        Type::INT4_ARRAY => get::<Vec<Option<i32>>>(row, idx)
            .map(|items| items.into_iter().map(Json::from).collect())
            .unwrap_or(Json::Null),
        Type::INT8_ARRAY => get::<Vec<Option<i64>>>(row, idx)
            .map(|items| items.into_iter().map(Json::from).collect())
            .unwrap_or(Json::Null),
        // Strings keep every digit.
        Type::NUMERIC => get::<Decimal>(row, idx)
            .map(|d| Json::String(d.to_string()))
            .unwrap_or(Json::Null),
        _ if is_textual(ty) => get::<Label>(row, idx).map(|l| Json::String(l.0)).unwrap_or(Json::Null),
        _ => Json::Null,
    }
}

/// Whether `decode_cell` understands the binary form of `ty`.
fn has_decoder(ty: &Type) -> bool {
    is_textual(ty)
        || matches!(
            *ty,
            Type::BOOL
                | Type::INT2
                | Type::INT4
                | Type::INT8
                | Type::OID
                | Type::FLOAT4
                | Type::FLOAT8
                | Type::NUMERIC
                | Type::DATE
                | Type::TIME
                | Type::TIMESTAMP
                | Type::TIMESTAMPTZ
                | Type::UUID
                | Type::JSON
                | Type::JSONB
                | Type::BYTEA
                | Type::TEXT_ARRAY
                | Type::VARCHAR_ARRAY
                | Type::INT4_ARRAY
                | Type::INT8_ARRAY
        )
}
