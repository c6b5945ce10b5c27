#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod cli;
mod error_fmt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use align_config::Config;
use clap::Parser;
use eyre::{Result, WrapErr};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::run::{RunArgs, config_error};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    let _ = color_eyre::install();

    let code = match real_main(cli) {
        Ok(()) => 0,
        Err(e) => {
            if JSON_MODE.get().copied().unwrap_or(false) {
                println!("{}", format_error_json(&e));
            } else {
                eprintln!("{}", humanize(&e));
            }
            exit_code_for_error(&e)
        }
    };
    std::process::exit(code);
}

fn real_main(cli: Cli) -> Result<()> {
    // scan-report needs no config
    if let Commands::ScanReport { file } = &cli.cmd {
        init_logging(&cli, None)?;
        return scan_report(file, cli.json);
    }

    let cfg = load_config(&cli.config)?;
    init_logging(&cli, Some(&cfg))?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Run {
            sim,
            ticks,
            record,
            direct,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            ctrlc::set_handler(move || {
                flag.store(true, Ordering::Relaxed);
            })
            .wrap_err("install Ctrl-C handler")?;

            let args = RunArgs {
                sim,
                ticks,
                record,
                direct,
            };
            let summary = run::run_align(&cfg, &args, shutdown.clone())?;
            if cli.json {
                println!("{}", run::summary_json(&summary));
            } else {
                let pos = summary
                    .final_position
                    .map_or_else(|| "unknown".to_string(), |p| p.to_string());
                println!(
                    "alignment stopped: state={} position={pos} ticks={} moves={} samples={}",
                    summary.final_state, summary.ticks, summary.moves, summary.samples
                );
            }
            if shutdown.load(Ordering::Relaxed) {
                tracing::info!("stopped by signal");
            }
            Ok(())
        }
        Commands::SelfCheck { sim } => {
            let report = run::self_check(&cfg, sim)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "ok": true,
                        "local": run::status_json(&report.local),
                        "peer": run::status_json(&report.peer),
                    })
                );
            } else {
                println!(
                    "self-check ok: local at ({}, {}), peer state {}",
                    report.local.x, report.local.y, report.peer.alignment_state
                );
            }
            Ok(())
        }
        Commands::ScanReport { .. } => Ok(()),
    }
}

fn load_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| config_error(format!("read {}: {e}", path.display())))?;
    let cfg = align_config::load_toml(&text)
        .map_err(|e| config_error(format!("parse {}: {e}", path.display())))?;
    cfg.validate().map_err(|e| config_error(e.to_string()))?;
    Ok(cfg)
}

fn scan_report(file: &Path, json: bool) -> Result<()> {
    let report = run::scan_report(file)
        .wrap_err_with(|| format!("scan record {}", file.display()))?;
    if json {
        let best = report.best.map(|b| {
            serde_json::json!({
                "index": b.index,
                "x": b.position.x,
                "y": b.position.y,
                "local_dbm": b.local_dbm,
                "remote_dbm": b.remote_dbm,
            })
        });
        println!(
            "{}",
            serde_json::json!({ "samples": report.samples, "best": best })
        );
        return Ok(());
    }
    println!("samples: {}", report.samples);
    match report.best {
        Some(b) => println!(
            "best: index {} at {} remote {:.2} dBm local {:.2} dBm",
            b.index, b.position, b.remote_dbm, b.local_dbm
        ),
        None => println!("best: none"),
    }
    Ok(())
}

/// Console layer on stderr (pretty or JSON lines) plus an optional JSON file
/// layer from `[logging]`. `RUST_LOG` wins over `--log-level`, which wins over
/// the config level.
fn init_logging(cli: &Cli, cfg: Option<&Config>) -> Result<()> {
    let logging = cfg.map(|c| &c.logging);
    let level = cli
        .log_level
        .clone()
        .or_else(|| logging.and_then(|l| l.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console_json = cli
        .json
        .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr));
    let console_text = (!cli.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    let file_layer = match logging.and_then(|l| l.file.as_deref()) {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| config_error(format!("logging.file has no file name: {file}")))?;
            let appender = match logging.and_then(|l| l.rotation.as_deref()) {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_json)
        .with(console_text)
        .with(file_layer)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}
