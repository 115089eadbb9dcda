//! CLI entry point for `opa2sql`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use opa2sql::compile::{compile, Decision};
use opa2sql::error::CompileError;
use opa2sql::evaluator::http::{HttpEvaluator, DEFAULT_COMPILE_URL};
use opa2sql::evaluator::process::ProcessEvaluator;
use opa2sql::evaluator::Evaluator;
use opa2sql::sql::schema::{ColumnResolver, SchemaCatalog, Unchecked};

#[derive(Parser)]
#[command(
    name = "opa2sql",
    about = "Compile OPA partial-evaluation results into SQL row-filter clauses"
)]
struct Cli {
    /// Policy query to compile, e.g. 'data.example.allow == true'
    query: String,

    /// Input document as inline JSON, or @path to a JSON file
    #[arg(long, default_value = "{}")]
    input: String,

    /// Unknown root data path (table to be filtered); repeatable
    #[arg(long = "unknown", required = true)]
    unknowns: Vec<String>,

    /// Anchor table for generated clauses
    #[arg(long)]
    from_table: String,

    /// Compile endpoint of a running OPA server
    #[arg(long, default_value = DEFAULT_COMPILE_URL, conflicts_with = "opa_bin")]
    opa_url: String,

    /// Run a local OPA binary instead of the HTTP endpoint
    #[arg(long, requires = "policies")]
    opa_bin: Option<PathBuf>,

    /// Policy source file staged for the local binary; repeatable
    #[arg(long = "policy")]
    policies: Vec<PathBuf>,

    /// DDL file used to validate generated columns against a schema
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Evaluator timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Print verbose diagnostics
    #[arg(long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let input = match read_input(&cli.input) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error reading input document: {e}");
            process::exit(2);
        }
    };

    let catalog = cli.schema.as_ref().map(|path| {
        let ddl = match std::fs::read_to_string(path) {
            Ok(ddl) => ddl,
            Err(e) => {
                eprintln!("Error reading {}: {e}", path.display());
                process::exit(2);
            }
        };
        match SchemaCatalog::from_ddl(&ddl) {
            Ok(catalog) => catalog,
            Err(e) => {
                eprintln!("Error parsing schema DDL: {e}");
                process::exit(2);
            }
        }
    });

    let timeout = cli.timeout_secs.map(Duration::from_secs);
    let decision = if let Some(binary) = &cli.opa_bin {
        let mut policies = BTreeMap::new();
        for path in &cli.policies {
            let source = match std::fs::read_to_string(path) {
                Ok(source) => source,
                Err(e) => {
                    eprintln!("Error reading {}: {e}", path.display());
                    process::exit(2);
                }
            };
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("policy.rego")
                .to_string();
            policies.insert(name, source);
        }
        let mut evaluator = ProcessEvaluator::new(binary, policies);
        if let Some(timeout) = timeout {
            evaluator = evaluator.with_timeout(timeout);
        }
        run(&cli, &input, &evaluator, catalog.as_ref())
    } else {
        let evaluator = match timeout {
            Some(timeout) => HttpEvaluator::with_timeout(&cli.opa_url, timeout),
            None => Ok(HttpEvaluator::new(&cli.opa_url)),
        };
        let evaluator = match evaluator {
            Ok(evaluator) => evaluator,
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(2);
            }
        };
        run(&cli, &input, &evaluator, catalog.as_ref())
    };

    let decision = match decision {
        Ok(decision) => decision,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    };

    match decision {
        Decision::NeverDefined => println!("never defined"),
        Decision::AlwaysDefined => println!("always defined"),
        Decision::Defined(filter) => {
            if cli.verbose {
                eprintln!("{} clause(s) generated", filter.clauses().len());
            }
            for clause in filter.clauses() {
                println!("{}", clause.sql());
            }
        }
    }
}

fn run<E: Evaluator>(
    cli: &Cli,
    input: &serde_json::Value,
    evaluator: &E,
    catalog: Option<&SchemaCatalog>,
) -> Result<Decision, CompileError> {
    match catalog {
        Some(catalog) => dispatch(cli, input, evaluator, catalog),
        None => dispatch(cli, input, evaluator, &Unchecked),
    }
}

fn dispatch<E: Evaluator, R: ColumnResolver>(
    cli: &Cli,
    input: &serde_json::Value,
    evaluator: &E,
    resolver: &R,
) -> Result<Decision, CompileError> {
    compile(
        &cli.query,
        input,
        &cli.unknowns,
        &cli.from_table,
        evaluator,
        resolver,
    )
}

fn read_input(raw: &str) -> Result<serde_json::Value, String> {
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).map_err(|e| format!("{path}: {e}"))?,
        None => raw.to_string(),
    };
    serde_json::from_str(&text).map_err(|e| e.to_string())
}
