use std::io::{self, BufRead, Write};
use std::process;

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

use rulisp::lexer::{Scanner, TokenKind};
use rulisp::{Interpreter, InterpreterConfig};

const USAGE: &str = "usage: rulisp [FILE] [--trace] [--plugins a,b,c]";

struct Options {
    file: Option<String>,
    config: InterpreterConfig,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RULISP_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_args(std::env::args().skip(1))?;
    let interp = Interpreter::with_config(options.config).context("failed to start interpreter")?;

    match options.file {
        Some(path) => {
            interp.eval_file(&path)?;
            Ok(())
        }
        None => repl(&interp),
    }
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<Options> {
    let mut options = Options {
        file: None,
        config: InterpreterConfig::default(),
    };
    let mut args = args;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--trace" => options.config.trace_calls = true,
            "--plugins" => {
                let Some(list) = args.next() else {
                    bail!("--plugins needs a comma separated list\n{}", USAGE);
                };
                options.config.plugins = Some(
                    list.split(',')
                        .map(str::trim)
                        .filter(|name| !name.is_empty())
                        .map(String::from)
                        .collect(),
                );
            }
            "-h" | "--help" => {
                println!("{}", USAGE);
                process::exit(0);
            }
            "-v" | "--version" => {
                println!("rulisp {}", env!("CARGO_PKG_VERSION"));
                process::exit(0);
            }
            flag if flag.starts_with('-') => bail!("unknown flag {}\n{}", flag, USAGE),
            _ if options.file.is_some() => bail!("only one file may be given\n{}", USAGE),
            _ => options.file = Some(arg),
        }
    }
    Ok(options)
}

/// Read-eval-print loop; input continues over several lines until the forms balance
fn repl(interp: &Interpreter) -> Result<()> {
    println!("rulisp {} (:plugins, :functions, :quit)", env!("CARGO_PKG_VERSION"));
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut pending = String::new();

    loop {
        print!("{}", if pending.is_empty() { "rulisp> " } else { "   ...> " });
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            return Ok(());
        };
        let line = line?;

        if pending.is_empty() {
            match line.trim() {
                "" => continue,
                ":quit" | ":q" => return Ok(()),
                ":plugins" => {
                    for info in interp.plugins().list_plugins() {
                        println!("{:<12} {:<8} {}", info.name, info.version, info.description);
                    }
                    continue;
                }
                ":functions" => {
                    for category in interp.registry().categories() {
                        println!("{}: {}", category, interp.registry().list_by_category(&category).join(" "));
                    }
                    continue;
                }
                _ => {}
            }
        }

        pending.push_str(&line);
        pending.push('\n');
        if is_incomplete(&pending) {
            continue;
        }
        match interp.eval_str(&pending) {
            Ok(value) => println!("{}", value),
            Err(e) => eprintln!("Error: {}", e),
        }
        pending.clear();
    }
}

/// More openers than closers so far; scan errors are left for the evaluator to report
fn is_incomplete(source: &str) -> bool {
    let Ok(tokens) = Scanner::new(source).scan_tokens() else {
        return false;
    };
    let depth = tokens.iter().fold(0i64, |depth, token| match token.kind {
        TokenKind::LeftParen | TokenKind::LeftBracket | TokenKind::LeftBrace => depth + 1,
        TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightBrace => depth - 1,
        _ => depth,
    });
    depth > 0
}
