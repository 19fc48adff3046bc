//! Command line front end.
//!
//! ```text
//! sqlshape list
//! sqlshape check <entry-point> [file]
//! ```
//!
//! `check` reads a JSON array of arguments from the file, or from stdin when
//! no file is given, and reports whether it conforms to the contract of the
//! entry point. Exits with status 1 when it does not.

use std::env;
use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

use serde_json::json;
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sqlshape::contracts::EntryPoint;
use sqlshape::error::{Result, SqlshapeError};
use sqlshape::registry::ValidationRegistry;
use sqlshape::settings::{ReportFormat, Settings};
use sqlshape::value::Value;

const USAGE: &str = "usage: sqlshape list | sqlshape check <entry-point> [file]";

fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn list() {
    for entry_point in EntryPoint::ALL {
        let forms = entry_point.contract().forms();
        if forms.is_empty() {
            println!("{}", entry_point);
        } else {
            println!("{} [{}]", entry_point, forms.join(", "));
        }
    }
}

fn read_arguments(file: Option<&str>) -> Result<Vec<Value>> {
    let text = match file {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| SqlshapeError::Decode(format!("cannot read {}: {}", path, e)))?,
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| SqlshapeError::Decode(format!("cannot read stdin: {}", e)))?;
            text
        }
    };
    let json: serde_json::Value = serde_json::from_str(&text)?;
    let items = json
        .as_array()
        .ok_or_else(|| SqlshapeError::Decode("arguments must be a JSON array".into()))?;
    items.iter().map(Value::from_json).collect()
}

// returns whether the arguments conformed
fn check(settings: &Settings, entry_point: &str, file: Option<&str>) -> Result<bool> {
    let entry_point: EntryPoint = entry_point.parse()?;
    let args = read_arguments(file)?;
    debug!(entry_point = %entry_point, arity = args.len(), "checking");
    // the command exists to check, so the registry is always instrumented here
    let registry = ValidationRegistry::new();
    registry.instrument();
    match registry.check(entry_point, &args) {
        Ok(conformed) => {
            let form = conformed.and_then(|c| c.label());
            match settings.report {
                ReportFormat::Text => match form {
                    Some(form) => println!("ok ({})", form),
                    None => println!("ok"),
                },
                ReportFormat::Json => {
                    println!("{}", json!({ "entry_point": entry_point, "ok": true, "form": form }))
                }
            }
            Ok(true)
        }
        Err(violation) => {
            match settings.report {
                ReportFormat::Text => println!("{}", violation),
                ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&violation)?),
            }
            Ok(false)
        }
    }
}

fn run(settings: &Settings, args: &[String]) -> Result<bool> {
    match args {
        [command] if command == "list" => {
            list();
            Ok(true)
        }
        [command, entry_point] if command == "check" => check(settings, entry_point, None),
        [command, entry_point, file] if command == "check" => check(settings, entry_point, Some(file.as_str())),
        _ => {
            eprintln!("{}", USAGE);
            Ok(false)
        }
    }
}

fn main() -> ExitCode {
    let settings = match Settings::load(None) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&settings);
    let args: Vec<String> = env::args().skip(1).collect();
    match run(&settings, &args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "check failed");
            eprintln!("{}", e);
            ExitCode::from(2)
        }
    }
}
