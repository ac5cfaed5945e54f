//! memvex shell, the line-protocol driver for the versioned store.
//!
//! Two modes:
//! - **REPL mode**: `memvex` on a TTY, interactive prompt with history
//! - **Pipe mode**: `echo "begin t1" | memvex`, line-by-line from stdin

use std::io::{self, BufRead, IsTerminal};
use std::process;

use clap::Parser;
use memvex_core::{DistanceMetric, EmbedderConfig, StoreConfig};
use memvex_shell::Shell;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

/// Transactional in-memory record store with vector-similarity queries
#[derive(Parser)]
#[command(name = "memvex", version, about)]
struct Cli {
    /// Embedding dimension
    #[arg(long, default_value_t = 256)]
    dimension: usize,

    /// Distance metric: cosine, euclidean, dot_product
    #[arg(long, default_value = "cosine")]
    metric: String,

    /// Top-k for query lines
    #[arg(short, default_value_t = 2)]
    k: usize,

    /// Log filter (tracing env-filter syntax), e.g. "memvex_mvcc=debug"
    #[arg(long, default_value = "warn")]
    log: String,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cli.log))
        .with_writer(io::stderr)
        .init();

    let Some(metric) = DistanceMetric::parse(&cli.metric) else {
        eprintln!("error: unknown metric {:?}", cli.metric);
        process::exit(2);
    };
    let embedder = match EmbedderConfig::new("feature-hash-v1", cli.dimension, metric) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(2);
        }
    };
    let config = StoreConfig {
        embedder,
        query_k: cli.k,
    };
    let mut shell = match Shell::with_config(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(2);
        }
    };

    if io::stdin().is_terminal() {
        run_repl(&mut shell);
    } else {
        run_pipe(&mut shell);
    }
}

/// Interactive mode: prompt, history, `exit` / Ctrl-D to leave
fn run_repl(shell: &mut Shell) {
    println!("memvex shell. Commands:");
    println!("  begin <txn>                  start a transaction");
    println!("  insert <txn> <key> <value..> insert a record");
    println!("  update <txn> <key> <value..> update a record");
    println!("  delete <txn> <key>           delete a record");
    println!("  query <txn> <text..>         top-k similar records");
    println!("  commit <txn> | abort <txn>   finish a transaction");
    println!("  exit                         leave");

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    loop {
        match rl.readline("memvex> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed == "exit" || trimmed == "quit" {
                    break;
                }
                let _ = rl.add_history_entry(trimmed);
                println!("{}", shell.process_line(trimmed));
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("error: {}", e);
                break;
            }
        }
    }
}

/// Pipe mode: execute each stdin line, echo outputs to stdout
fn run_pipe(shell: &mut Shell) {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("error: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        println!("{}", shell.process_line(&line));
    }
}
