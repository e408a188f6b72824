//! Tessera CLI entry point.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use tessera_runtime::{Config, Console, Runtime, logging};

/// CLI options parsed from arguments, layered over the environment.
#[derive(Default)]
struct CliConfig {
    dir: Option<PathBuf>,
    in_memory: bool,
    log_filter: Option<String>,
    show_help: bool,
    show_version: bool,
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError: {e}\x1b[0m");
            ExitCode::FAILURE
        }
    }
}

fn parse_args(args: Vec<String>) -> Result<CliConfig, Box<dyn std::error::Error>> {
    let mut config = CliConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => config.show_help = true,
            "-V" | "--version" => config.show_version = true,
            "-m" | "--memory" => config.in_memory = true,
            "-d" | "--dir" => {
                i += 1;
                let dir = args.get(i).ok_or("--dir requires a value")?;
                config.dir = Some(PathBuf::from(dir));
            }
            "--log" => {
                i += 1;
                let filter = args.get(i).ok_or("--log requires a value")?;
                config.log_filter = Some(filter.clone());
            }
            arg => return Err(format!("unknown argument: {arg}").into()),
        }
        i += 1;
    }

    Ok(config)
}

fn run(args: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let cli = parse_args(args)?;

    if cli.show_help {
        print_help();
        return Ok(());
    }

    if cli.show_version {
        println!("tessera {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mut config = Config::from_env()?;
    if let Some(dir) = cli.dir {
        config = config.with_dir(dir);
    }
    if cli.in_memory {
        config = config.with_in_memory(true);
    }
    if let Some(filter) = cli.log_filter {
        config = config.with_log_filter(filter);
    }

    logging::init(&config.log_filter)?;

    let runtime = Runtime::start(config)?;
    let result = Console::new(runtime.engine().clone()).and_then(|mut console| console.run());
    runtime.shutdown()?;
    result?;
    Ok(())
}

fn print_help() {
    println!(
        "\x1b[1mTessera\x1b[0m - Entity, tag and relationship store

\x1b[1mUSAGE:\x1b[0m
    tessera [OPTIONS]

\x1b[1mOPTIONS:\x1b[0m
    -d, --dir <DIR>      Storage directory (default: .storage, or $TESSERA_DIR)
    -m, --memory         Keep the store in memory; nothing is written to disk
        --log <FILTER>   Log filter directives (default: info, or $TESSERA_LOG)
    -h, --help           Print help information
    -V, --version        Print version information

\x1b[1mENVIRONMENT:\x1b[0m
    TESSERA_MAX_TXN_ENTRIES    Keys one transaction may write
    TESSERA_SCAN_DEADLINE_MS   Deadline for select, delete-all and update-all

Type \x1b[1mhelp\x1b[0m at the prompt for console commands."
    );
}
