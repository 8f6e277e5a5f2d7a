//! X8QL CLI - Command line interface for the X8QL parser

mod logging;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use x8ql_ast::ToQl;
use x8ql_lexer::tokenize;
use x8ql_parser::{parse_fragment, Error, FragmentKind};

#[derive(Parser)]
#[command(name = "x8ql")]
#[command(about = "X8QL query language parser", long_about = None)]
struct Cli {
    /// Log level or filter directive, e.g. `debug` or `x8ql_parser=trace`
    /// (defaults to $X8QL_LOG, then `warn`)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a query and output the AST as JSON
    Parse {
        /// Input file, or `-` for stdin
        #[arg(default_value = "-")]
        file: PathBuf,
        /// Grammar root to parse from
        #[arg(short, long, default_value = "statement")]
        kind: FragmentKind,
        /// Pretty print the output
        #[arg(short, long)]
        pretty: bool,
    },
    /// Check that query files parse
    Check {
        /// Input file(s)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Grammar root to parse from
        #[arg(short, long, default_value = "statement")]
        kind: FragmentKind,
    },
    /// Show the token stream of a query
    Tokens {
        /// Input file, or `-` for stdin
        #[arg(default_value = "-")]
        file: PathBuf,
    },
    /// Print a query in canonical form
    Fmt {
        /// Input file, or `-` for stdin
        #[arg(default_value = "-")]
        file: PathBuf,
        /// Grammar root to parse from
        #[arg(short, long, default_value = "statement")]
        kind: FragmentKind,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level.as_deref());

    let ok = match cli.command {
        Commands::Parse { file, kind, pretty } => cmd_parse(&file, kind, pretty),
        Commands::Check { files, kind } => cmd_check(&files, kind),
        Commands::Tokens { file } => cmd_tokens(&file),
        Commands::Fmt { file, kind } => cmd_fmt(&file, kind),
    };

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn display_name(file: &Path) -> String {
    if file == Path::new("-") {
        "<stdin>".to_string()
    } else {
        file.display().to_string()
    }
}

fn read_source(file: &Path) -> Option<String> {
    let result = if file == Path::new("-") {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source).map(|_| source)
    } else {
        fs::read_to_string(file)
    };

    match result {
        Ok(source) => {
            debug!(file = %display_name(file), bytes = source.len(), "read input");
            Some(source)
        }
        Err(e) => {
            eprintln!("Error reading {}: {}", display_name(file), e);
            None
        }
    }
}

fn cmd_parse(file: &Path, kind: FragmentKind, pretty: bool) -> bool {
    let Some(source) = read_source(file) else {
        return false;
    };

    match parse_fragment(kind, &source) {
        Ok(fragment) => {
            let json = if pretty {
                serde_json::to_string_pretty(&fragment)
            } else {
                serde_json::to_string(&fragment)
            };
            match json {
                Ok(json) => {
                    println!("{}", json);
                    true
                }
                Err(e) => {
                    eprintln!("Error serializing AST: {}", e);
                    false
                }
            }
        }
        Err(e) => {
            report_error(&source, file, &e);
            false
        }
    }
}

fn cmd_check(files: &[PathBuf], kind: FragmentKind) -> bool {
    let mut all_ok = true;

    for file in files {
        let Some(source) = read_source(file) else {
            all_ok = false;
            continue;
        };

        match parse_fragment(kind, &source) {
            Ok(_) => println!("✓ {}", display_name(file)),
            Err(e) => {
                eprintln!("✗ {}", display_name(file));
                report_error(&source, file, &e);
                all_ok = false;
            }
        }
    }

    info!(files = files.len(), ok = all_ok, "check finished");
    all_ok
}

fn cmd_tokens(file: &Path) -> bool {
    let Some(source) = read_source(file) else {
        return false;
    };

    match tokenize(&source) {
        Ok(tokens) => {
            for token in &tokens {
                println!(
                    "{:>5}..{:<5} {:<12} {}",
                    token.span.start,
                    token.span.end,
                    format!("{:?}", token.kind),
                    token.text(&source)
                );
            }
            true
        }
        Err(e) => {
            report_error(&source, file, &Error::Lex(e));
            false
        }
    }
}

fn cmd_fmt(file: &Path, kind: FragmentKind) -> bool {
    let Some(source) = read_source(file) else {
        return false;
    };

    match parse_fragment(kind, &source) {
        Ok(fragment) => {
            println!("{}", fragment.to_ql(0));
            true
        }
        Err(e) => {
            report_error(&source, file, &e);
            false
        }
    }
}

fn report_error(source: &str, file: &Path, error: &Error) {
    let name = display_name(file);
    let span = error.span();
    let printed = Report::build(ReportKind::Error, name.clone(), span.start)
        .with_message(error.to_string())
        .with_label(
            Label::new((name.clone(), span.start..span.end))
                .with_message(error.to_string())
                .with_color(Color::Red),
        )
        .finish()
        .eprint((name, Source::from(source)));

    if let Err(e) = printed {
        eprintln!("{}", error);
        debug!(error = %e, "failed to render diagnostic");
    }
}
