//! `odata-sql`: compiles a single query option against a metadata snapshot
//!  and prints the SQL and its arguments as JSON.
//!
//! odata-sql --metadata products.json --dialect mysql filter "Price gt 100"

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use odata_expr::{Compiler, Dialect, EntityMetadata, UnsupportedPolicy};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "odata-sql")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Entity metadata as JSON
    #[arg(long)]
    metadata: PathBuf,

    /// sqlite, postgres, mysql or sqlserver
    #[arg(long, default_value = "sqlite")]
    dialect: String,

    /// Report unsupported operations as 501 instead of 400
    #[arg(long)]
    not_implemented: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a $filter value
    Filter { expression: String },
    /// Compile a $compute value
    Compute { expression: String },
    /// Compile an $orderby value
    Orderby { expression: String },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let policy = if cli.not_implemented {
        UnsupportedPolicy::NotImplemented
    } else {
        UnsupportedPolicy::BadRequest
    };

    match run(&cli) {
        Ok(output) => println!("{output:#}"),
        Err(e) => {
            let status = e
                .downcast_ref::<odata_expr::Error>()
                .map(|e| e.status_code(policy));
            match status {
                Some(status) => eprintln!("{status}: {e}"),
                None => eprintln!("{e}"),
            }
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let dialect: Dialect = cli.dialect.parse()?;
    let source = std::fs::read_to_string(&cli.metadata)?;
    let metadata: EntityMetadata = serde_json::from_str(&source)?;
    metadata.validate()?;

    let compiler = Compiler::new(dialect);
    let output = match &cli.command {
        Command::Filter { expression } => {
            let fragment = compiler.filter(expression, &metadata)?;
            json!({ "sql": fragment.sql, "args": fragment.args })
        }
        Command::Compute { expression } => {
            let fragment = compiler.compute(expression, &metadata)?;
            let columns: Vec<_> = fragment
                .columns
                .iter()
                .map(|c| json!({ "sql": c.sql, "alias": c.alias }))
                .collect();
            json!({ "columns": columns, "args": fragment.args })
        }
        Command::Orderby { expression } => {
            let fragment = compiler.orderby(expression, &metadata)?;
            json!({ "items": fragment.items, "args": fragment.args })
        }
    };
    Ok(output)
}
