//! conch: an interactive shell whose command modules load on first use.
//!
//! Usage: `conch [--config PATH]`. Without `--config` the file named by
//! `CONCH_CONFIG` is used, then `./conch.toml`, then built-in defaults.
//! Type `help` at the prompt for commands and `exit` to leave.

mod modules;
mod repl;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use conch_lifecycle::{
    DirectorySource, LifecycleOptions, MappedNameResolver, ModuleLifecycle, ModuleSource,
    StaticSource,
};
use conch_shell::{Completer, Shell};
use conch_types::config::ShellConfig;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config_path = parse_args(std::env::args().skip(1))?;
    let config = ShellConfig::load(config_path.as_deref()).context("loading configuration")?;

    let source: Box<dyn ModuleSource> = match &config.core.modules_dir {
        Some(dir) => {
            log::info!("Discovering modules in {}", dir.display());
            Box::new(DirectorySource::new(dir))
        },
        None => Box::new(StaticSource::new(modules::BUILTIN_MODULES.iter().copied())),
    };
    let lifecycle = ModuleLifecycle::new(
        LifecycleOptions::from_config(&config),
        source,
        Box::new(MappedNameResolver::new(config.modules.name_mappings.clone())),
        modules::factories(),
    );

    let mut shell = Shell::new(lifecycle, Completer::from_config(&config.completion));
    let report = shell.start();
    if let Some(e) = &report.root_error {
        eprintln!("warning: root module unavailable: {e}");
    }
    for failure in &report.discovery.failures {
        eprintln!("warning: module '{}' skipped: {}", failure.module, failure.error);
    }
    for (name, e) in &report.preload_failures {
        eprintln!("warning: could not preload '{name}': {e}");
    }
    log::info!(
        "Ready: {} module(s) cataloged, {} loaded",
        shell.lifecycle().catalog().len(),
        shell.lifecycle().table().module_names().len()
    );

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let result = repl::run(&mut shell, stdin.lock(), stdout.lock());
    shell.shutdown();
    result.context("terminal I/O")
}

/// Extract `--config PATH` / `--config=PATH` from the command line.
fn parse_args<I: Iterator<Item = String>>(mut args: I) -> Result<Option<PathBuf>> {
    let mut config = None;
    while let Some(arg) = args.next() {
        if let Some(path) = arg.strip_prefix("--config=") {
            config = Some(PathBuf::from(path));
        } else if arg == "--config" {
            let Some(path) = args.next() else {
                bail!("--config needs a path");
            };
            config = Some(PathBuf::from(path));
        } else if arg == "-h" || arg == "--help" {
            println!("usage: conch [--config PATH]");
            std::process::exit(0);
        } else {
            bail!("unexpected argument: {arg}");
        }
    }
    Ok(config)
}
