//! Tabula CLI - interactive statement shell
//!
//! Each line is one statement (a trailing `;` is optional). Lines starting
//! with `.` are shell commands; `.help` lists them. Results print as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tabula::{DBConfig, Database, TabulaError};
use tracing_subscriber::EnvFilter;

/// Tabula - a small file-backed relational store
#[derive(Parser)]
#[command(name = "tabula-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Execute one statement and exit
    #[arg(short = 'e', long = "execute")]
    execute: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => DBConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => DBConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    let db = Database::open(config).context("failed to open data directory")?;

    match cli.execute {
        Some(sql) => {
            let ok = execute_statement(&db, &sql)?;
            if !ok {
                std::process::exit(2);
            }
            Ok(())
        }
        None => interactive_mode(&db),
    }
}

fn interactive_mode(db: &Database) -> Result<()> {
    println!("Tabula v{}", env!("CARGO_PKG_VERSION"));
    println!("Data directory: {}", db.config().data_dir.display());
    println!("Type '.help' for help, '.exit' to quit\n");

    let stdin = io::stdin();
    let mut buffer = String::new();

    loop {
        print!("tabula> ");
        io::stdout().flush()?;

        buffer.clear();
        if stdin.lock().read_line(&mut buffer)? == 0 {
            break;
        }

        let input = buffer.trim();
        if input.is_empty() {
            continue;
        }

        if input.starts_with('.') {
            if !run_command(db, input)? {
                break;
            }
            continue;
        }

        execute_statement(db, input)?;
    }

    Ok(())
}

/// Execute and print; returns false if the statement failed
fn execute_statement(db: &Database, sql: &str) -> Result<bool> {
    match db.execute(sql) {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(true)
        }
        Err(e) => {
            print_error(&e)?;
            Ok(false)
        }
    }
}

fn print_error(e: &TabulaError) -> Result<()> {
    eprintln!("{}", serde_json::to_string(&e.to_response())?);
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> tabula::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Run a dot-command; returns false on `.exit`
fn run_command(db: &Database, input: &str) -> Result<bool> {
    let parts: Vec<&str> = input.split_whitespace().collect();

    let output: tabula::Result<String> = match parts.as_slice() {
        [".exit"] | [".quit"] => return Ok(false),
        [".help"] => Ok(HELP.trim().to_string()),
        [".databases"] => db.list_databases().and_then(|names| to_json(&names)),
        [".tables", name] => db.list_tables(name).and_then(|names| to_json(&names)),
        [".backups", name, table] => db.list_backups(name, table).and_then(|ids| to_json(&ids)),
        [".restore", name, table, backup] => db
            .restore_backup(name, table, backup)
            .map(|()| format!("Restored {}.{} from {}", name, table, backup)),
        [".dropdb", name] => db
            .drop_database(name)
            .map(|()| format!("Dropped database {}", name)),
        [".stats"] => {
            let stats = db.stats();
            to_json(&stats.cache).map(|cache| {
                format!(
                    "{}\nlocks: {} databases, {} tables, {} shared / {} exclusive acquisitions",
                    cache,
                    stats.locks.database_locks,
                    stats.locks.table_locks,
                    stats.locks.shared_acquired,
                    stats.locks.exclusive_acquired
                )
            })
        }
        _ => Ok(format!(
            "Unknown command: {}\nType '.help' for available commands",
            input
        )),
    };

    match output {
        Ok(text) => println!("{}", text),
        Err(e) => print_error(&e)?,
    }
    Ok(true)
}

const HELP: &str = r#"
Statements (one per line, trailing ';' optional):
  CREATE DATABASE name
  CREATE TABLE db.table (col1, col2, ...)
  DROP TABLE db.table
  RENAME TABLE db.table TO db.new_table
  INSERT INTO db.table (c1, ...) VALUES (v1, ...)
  UPDATE db.table SET col = val WHERE col = val
  DELETE FROM db.table WHERE col = val
  SELECT * | c1, ... FROM db.table

Commands:
  .help                           Show this help
  .databases                      List databases
  .tables <db>                    List tables of a database
  .backups <db> <table>           List backups of a table, oldest first
  .restore <db> <table> <backup>  Restore a table from a backup
  .dropdb <db>                    Drop a database with its tables and backups
  .stats                          Cache and lock statistics
  .exit                           Quit
"#;
