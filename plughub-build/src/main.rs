use std::path::PathBuf;
use std::process::ExitCode;

use log::{error, info};

use plughub_build::{BuildOptions, build};

const USAGE: &str = "\
Usage: plughub-build [OPTIONS] <source-root>

Materialize a catalog source tree into a SQLite snapshot.

Options:
  --db-path <path>   Target database file (default: plugins.db, or $DB_PATH)
  --git-ref <ref>    Source reference recorded for provenance in error links
  --strict           Exit non-zero when any build error was collected
  -h, --help         Show this help
";

struct Args {
    source_root: PathBuf,
    db_path: PathBuf,
    git_ref: Option<String>,
    strict: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut source_root = None;
    let mut db_path = std::env::var_os("DB_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("plugins.db"));
    let mut git_ref = None;
    let mut strict = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db-path" => {
                db_path = PathBuf::from(args.next().ok_or("--db-path requires a value")?);
            }
            "--git-ref" => {
                git_ref = Some(args.next().ok_or("--git-ref requires a value")?);
            }
            "--strict" => strict = true,
            "-h" | "--help" => {
                print!("{USAGE}");
                std::process::exit(0);
            }
            other if other.starts_with('-') => {
                return Err(format!("unknown option '{other}'"));
            }
            other => {
                if source_root.replace(PathBuf::from(other)).is_some() {
                    return Err("more than one source root given".to_owned());
                }
            }
        }
    }

    Ok(Args {
        source_root: source_root.ok_or("missing <source-root> argument")?,
        db_path,
        git_ref,
        strict,
    })
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("error: {message}\n\n{USAGE}");
            return ExitCode::from(1);
        }
    };

    let options = BuildOptions {
        source_root: args.source_root,
        db_path: args.db_path,
        git_ref: args.git_ref,
    };

    let report = match build(&options) {
        Ok(report) => report,
        Err(e) => {
            error!("Build failed: {e}");
            return ExitCode::from(1);
        }
    };

    println!("{}", report.to_markdown());

    if report.has_errors() {
        info!("Collected {} build errors", report.errors.len());
        if args.strict {
            return ExitCode::from(2);
        }
    }
    ExitCode::SUCCESS
}
