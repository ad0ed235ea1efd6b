//! Passmill: deterministic passwords and Bitcoin keys from one passphrase
//!
//! The passphrase is read from the first line of stdin so it never shows up
//! in the process list or shell history.
//!
//! # Usage
//!
//! ```bash
//! passmill web --user alice --site https://www.example.com/login
//! passmill app --name myapp --version 2 --json
//! passmill wallet --name savings
//! passmill --validate --config passmill.toml
//! ```
//!
//! Exit status: 0 on success, 2 when the request or passphrase is rejected,
//! 1 on any other failure.

mod config;
mod render;

use anyhow::{Context, Result};
use config::{OutputFormat, PassmillConfig};
use passmill_core::{DerivationRequest, DeriveError, Deriver, HeuristicEstimator, Mode, RequestForm};
use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use zeroize::Zeroizing;

const EXIT_REJECTED: u8 = 2;

/// What the command line asked for.
#[derive(Debug, Default, PartialEq, Eq)]
struct CliArgs {
    mode: Option<Mode>,
    identity: Option<String>,
    site: Option<String>,
    version: Option<String>,
    salt: Option<String>,
    config_path: Option<PathBuf>,
    pipeline: Option<String>,
    json: bool,
    validate_only: bool,
    help: bool,
    print_version: bool,
}

fn main() -> Result<ExitCode> {
    // Keep key material out of core files.
    passmill_core::memory::disable_core_dumps();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_args(&args)?;

    if cli.help {
        print_help();
        return Ok(ExitCode::SUCCESS);
    }
    if cli.print_version {
        println!("passmill {}", env!("CARGO_PKG_VERSION"));
        return Ok(ExitCode::SUCCESS);
    }

    // Load config
    let mut config = PassmillConfig::load(cli.config_path.as_deref()).context("Failed to load config")?;

    // Env overrides, then flags
    config.apply_env_overrides();
    if let Some(pipeline) = &cli.pipeline {
        config.derivation.pipeline = pipeline.clone();
    }
    if cli.json {
        config.output.format = "json".to_string();
    }

    config.validate().context("Configuration validation failed")?;

    env_logger::Builder::new()
        .parse_filters(&config.general.log_level)
        .init();

    if cli.validate_only {
        println!("✅ Configuration is valid.");
        println!("  Pipeline:      {}", config.pipeline()?);
        println!("  Weak terms:    {}", config.derivation.weak_terms.join(", "));
        println!("  Output:        {}", config.output.format);
        println!("  Show entropy:  {}", config.output.show_entropy);
        println!("  Log level:     {}", config.general.log_level);
        return Ok(ExitCode::SUCCESS);
    }

    let form = request_form(&cli)?;
    let passphrase = read_passphrase()?;

    let deriver = Deriver::new(
        HeuristicEstimator::with_weak_terms(&config.derivation.weak_terms),
        config.pipeline()?,
    );

    let result = form
        .into_request(&passphrase)
        .map_err(DeriveError::from)
        .and_then(|request: DerivationRequest| deriver.derive(&request));

    match result {
        Ok(result) => {
            let rendered = match config.output_format()? {
                OutputFormat::Text => render::render_text(&result, config.output.show_entropy),
                OutputFormat::Json => render::render_json(&result, config.output.show_entropy)?,
            };
            print!("{}", rendered.as_str());
            if !rendered.ends_with('\n') {
                println!();
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_rejection() => {
            eprintln!("No output: {}", e);
            Ok(ExitCode::from(EXIT_REJECTED))
        }
        Err(e) => Err(e).context("Derivation failed"),
    }
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut cli = CliArgs::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "web" | "app" | "wallet" | "btc" if cli.mode.is_none() => {
                cli.mode = Some(args[i].parse()?);
            }
            "--user" | "--name" | "-u" | "-n" => {
                cli.identity = Some(flag_value(args, &mut i)?);
            }
            "--site" | "-s" => {
                cli.site = Some(flag_value(args, &mut i)?);
            }
            "--version" => {
                cli.version = Some(flag_value(args, &mut i)?);
            }
            "--salt" => {
                cli.salt = Some(flag_value(args, &mut i)?);
            }
            "--config" | "-c" => {
                cli.config_path = Some(PathBuf::from(flag_value(args, &mut i)?));
            }
            "--pipeline" | "-p" => {
                cli.pipeline = Some(flag_value(args, &mut i)?);
            }
            "--json" => {
                cli.json = true;
            }
            "--validate" => {
                cli.validate_only = true;
            }
            "--help" | "-h" => {
                cli.help = true;
            }
            "-V" => {
                cli.print_version = true;
            }
            other => {
                anyhow::bail!("Unknown argument: {}", other);
            }
        }
        i += 1;
    }

    Ok(cli)
}

fn flag_value(args: &[String], i: &mut usize) -> Result<String> {
    let flag = &args[*i];
    *i += 1;
    match args.get(*i) {
        Some(value) => Ok(value.clone()),
        None => anyhow::bail!("{} requires a value", flag),
    }
}

/// Map parsed flags onto the core's request form.
///
/// Web and app default to version 1; wallet has no version unless given.
fn request_form(cli: &CliArgs) -> Result<RequestForm> {
    let Some(mode) = cli.mode else {
        anyhow::bail!("Missing mode: expected web, app or wallet (see --help)");
    };

    let version = match (&cli.version, mode) {
        (Some(v), _) => Some(v.clone()),
        (None, Mode::Web | Mode::App) => Some("1".to_string()),
        (None, Mode::Wallet) => None,
    };

    Ok(RequestForm {
        mode: Some(mode),
        identity: cli.identity.clone().unwrap_or_default(),
        site: cli.site.clone().unwrap_or_default(),
        version,
        salt: cli.salt.clone().unwrap_or_default(),
    })
}

fn read_passphrase() -> Result<Zeroizing<String>> {
    let mut line = Zeroizing::new(String::new());
    let read = std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read passphrase from stdin")?;
    anyhow::ensure!(read > 0, "No passphrase on stdin");

    let trimmed_len = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(trimmed_len);
    Ok(line)
}

fn print_help() {
    println!(
        r#"Passmill: deterministic passwords and Bitcoin keys

USAGE:
    passmill web    --user <NAME> --site <URI> [--version <N>] [--salt <TOKEN>]
    passmill app    --name <NAME>              [--version <N>] [--salt <TOKEN>]
    passmill wallet --name <NAME>              [--version <N>] [--salt <TOKEN>]
    passmill --validate [--config <PATH>]

The passphrase is read from the first line of stdin.

OPTIONS:
    -c, --config <PATH>     Config file (default: ~/.config/passmill/passmill.toml)
    -p, --pipeline <vN>     Pipeline version: v1, v2 or v3 (default: v3)
    --json                  Print the result as JSON
    --validate              Validate configuration and exit
    -h, --help              Show this help message
    --version <N>           Derivation version (web/app default: 1)
    -V                      Show program version

ENVIRONMENT VARIABLES (override config file):
    PASSMILL_LOG_LEVEL      Log level (off/error/warn/info/debug/trace)
    PASSMILL_PIPELINE       Pipeline version
    PASSMILL_WEAK_TERMS     Comma-separated extra weak terms
    PASSMILL_OUTPUT_FORMAT  text or json

EXIT STATUS:
    0  secrets derived
    2  request or passphrase rejected
    1  any other failure
"#
    );
}
