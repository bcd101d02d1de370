use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use polysql::codegen::{generate, generate_query, GeneratorFormat, GeneratorInput, QueryFormat};
use polysql::config::AppConfig;
use polysql::db::{ConnectionConfig, Executor, PostgresTransport, ScriptReport};
use polysql::editor::{is_dangerous, segment};
use polysql::sql::{
    ActiveFilter, Compiler, CountRequest, DeleteRequest, Dialect, InsertRequest, SelectRequest,
    UpdateRequest,
};

/// Split, compile and generate SQL for several database engines
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Split an editor buffer into statement groups (JSON)
    Split {
        /// Input file, or stdin when omitted
        file: Option<PathBuf>,
    },
    /// Report whether a buffer contains destructive statements
    Check { file: Option<PathBuf> },
    /// Compile a JSON request into dialect SQL
    Compile {
        #[arg(long, value_enum)]
        kind: RequestKind,
        #[arg(long, value_enum)]
        dialect: Option<Dialect>,
        /// Inline every value instead of using placeholders
        #[arg(long)]
        inline: bool,
        file: Option<PathBuf>,
    },
    /// Generate schema code from a JSON table description
    Generate {
        #[arg(long, value_enum)]
        format: GeneratorFormat,
        /// Overrides the dialect in the input
        #[arg(long, value_enum)]
        dialect: Option<Dialect>,
        file: Option<PathBuf>,
    },
    /// Render a filtered SELECT for a table from a JSON list of filters
    Query {
        #[arg(long, value_enum)]
        format: QueryFormat,
        #[arg(long)]
        table: String,
        #[arg(long, value_enum)]
        dialect: Option<Dialect>,
        file: Option<PathBuf>,
    },
    /// Run every statement of a buffer against a saved connection
    Run {
        /// Connection id or name from the config file
        #[arg(long)]
        connection: String,
        /// Run even if the buffer contains destructive statements
        #[arg(long)]
        yes: bool,
        file: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RequestKind {
    Select,
    Count,
    Update,
    Delete,
    Insert,
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) if p != Path::new("-") => std::fs::read_to_string(p)
            .with_context(|| format!("Failed to read {}", p.display())),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing(config_filter: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config_filter.unwrap_or("warn")))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn compile(kind: RequestKind, compiler: Compiler, input: &str) -> Result<serde_json::Value> {
    let compiled = match kind {
        RequestKind::Select => {
            let req: SelectRequest = serde_json::from_str(input).context("Invalid select request")?;
            serde_json::to_value(compiler.compile_select(&req)?)?
        }
        RequestKind::Count => {
            let req: CountRequest = serde_json::from_str(input).context("Invalid count request")?;
            serde_json::to_value(compiler.compile_count(&req)?)?
        }
        RequestKind::Update => {
            let req: UpdateRequest = serde_json::from_str(input).context("Invalid update request")?;
            serde_json::to_value(compiler.compile_update(&req)?)?
        }
        RequestKind::Delete => {
            let req: DeleteRequest = serde_json::from_str(input).context("Invalid delete request")?;
            serde_json::to_value(compiler.compile_delete(&req)?)?
        }
        RequestKind::Insert => {
            let req: InsertRequest = serde_json::from_str(input).context("Invalid insert request")?;
            serde_json::to_value(compiler.compile_insert(&req)?)?
        }
    };
    Ok(compiled)
}

fn report_json(report: &ScriptReport) -> serde_json::Value {
    let completed: Vec<serde_json::Value> = report
        .completed
        .iter()
        .map(|s| {
            json!({
                "startLine": s.start_line,
                "endLine": s.end_line,
                "sql": s.sql,
                "rows": s.output.rows,
                "durationMs": s.output.duration.as_millis() as u64,
            })
        })
        .collect();
    let failure = report.failure.as_ref().map(|f| {
        json!({
            "startLine": f.start_line,
            "endLine": f.end_line,
            "sql": f.sql,
            "error": f.error.display_full(),
        })
    });
    json!({ "completed": completed, "failure": failure })
}

async fn run_script(connection: &ConnectionConfig, config: &AppConfig, text: &str) -> Result<bool> {
    let executor = Executor::new(PostgresTransport::new(), Arc::new(config.log_store()));
    let report = executor.run_script(connection, text).await;
    print_json(&report_json(&report))?;
    Ok(report.is_success())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let config = AppConfig::load_from(&config_path);
    init_tracing(config.as_ref().ok().and_then(|c| c.log_filter.as_deref()));
    let config = config?;

    match cli.command {
        Command::Split { file } => {
            let text = read_input(file.as_deref())?;
            print_json(&segment(&text))?;
        }
        Command::Check { file } => {
            let text = read_input(file.as_deref())?;
            print_json(&json!({ "dangerous": is_dangerous(&text) }))?;
        }
        Command::Compile {
            kind,
            dialect,
            inline,
            file,
        } => {
            let dialect = dialect.unwrap_or(config.default_dialect);
            let compiler = if inline {
                Compiler::inline(dialect)
            } else {
                Compiler::new(dialect)
            };
            let input = read_input(file.as_deref())?;
            print_json(&compile(kind, compiler, &input)?)?;
        }
        Command::Generate {
            format,
            dialect,
            file,
        } => {
            let input = read_input(file.as_deref())?;
            let mut input: GeneratorInput =
                serde_json::from_str(&input).context("Invalid generator input")?;
            if let Some(dialect) = dialect {
                input.dialect = dialect;
            }
            println!("{}", generate(format, &input));
        }
        Command::Query {
            format,
            table,
            dialect,
            file,
        } => {
            let input = read_input(file.as_deref())?;
            let filters: Vec<ActiveFilter> =
                serde_json::from_str(&input).context("Invalid filter list")?;
            let dialect = dialect.unwrap_or(config.default_dialect);
            println!("{}", generate_query(format, &table, &filters, dialect)?);
        }
        Command::Run {
            connection,
            yes,
            file,
        } => {
            let Some(target) = config.connection(&connection) else {
                bail!(
                    "no saved connection named {:?} in {}",
                    connection,
                    config_path.display()
                );
            };
            let text = read_input(file.as_deref())?;
            if is_dangerous(&text) && !yes {
                bail!("buffer contains destructive statements; pass --yes to run it");
            }
            if !run_script(target, &config, &text).await? {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
