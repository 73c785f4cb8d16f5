// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use localize_app::{EditorSession, SegmentId, Snapshot};
use localize_client::Client;
use runtime::EditorRuntime;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOCALIZE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    // Only fails if a subscriber is already installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `localize --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let client = Client::new(config.base_url(), config.timeout()?).with_context(|| {
        format!(
            "invalid [backend] config in {}; fix base_url/timeout values",
            options.config_path.display()
        )
    })?;

    let snapshot = match (&options.snapshot_path, config.snapshot_url()) {
        (Some(path), _) => load_snapshot_file(path)?,
        (None, Some(url)) => client
            .fetch_snapshot(url)
            .with_context(|| format!("fetch snapshot from {url}"))?,
        (None, None) => {
            bail!("no snapshot to edit; pass --snapshot <path> or set [backend].snapshot_url")
        }
    };
    let session = EditorSession::from_snapshot(&snapshot).context("invalid editor snapshot")?;
    info!(segments = session.segments().len(), "snapshot loaded");
    if options.check_only {
        return Ok(());
    }

    let timeout = client.timeout();
    let mut runtime = EditorRuntime::new(session, Arc::new(client), timeout);
    for edit in &options.edits {
        runtime.apply_edit(edit.segment_id, &edit.value)?;
    }
    runtime.finish()?;

    if options.machine_translate || config.machine_translate_missing() {
        let saved = runtime.machine_translate_missing()?;
        info!(saved, "machine translations saved");
        runtime.finish()?;
    }

    print!("{}", runtime.report());
    let errors = runtime.error_count();
    if errors > 0 {
        bail!("{errors} segment(s) failed to save");
    }
    Ok(())
}

fn load_snapshot_file(path: &Path) -> Result<Snapshot> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read snapshot file {}", path.display()))?;
    Snapshot::from_json(&raw).with_context(|| format!("in {}", path.display()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SegmentEdit {
    segment_id: SegmentId,
    value: String,
}

impl SegmentEdit {
    fn parse(raw: &str) -> Result<Self> {
        let (id, value) = raw
            .split_once('=')
            .ok_or_else(|| anyhow!("--set expects <id>=<value>, got {raw:?}"))?;
        let id: i64 = id
            .trim()
            .parse()
            .with_context(|| format!("--set segment id {id:?} is not a number"))?;
        Ok(Self {
            segment_id: SegmentId::new(id),
            value: value.to_owned(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    snapshot_path: Option<PathBuf>,
    edits: Vec<SegmentEdit>,
    machine_translate: bool,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        snapshot_path: None,
        edits: Vec::new(),
        machine_translate: false,
        print_config_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--snapshot" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--snapshot requires a file path"))?;
                options.snapshot_path = Some(PathBuf::from(value.as_ref()));
            }
            "--set" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--set requires <id>=<value>"))?;
                options.edits.push(SegmentEdit::parse(value.as_ref())?);
            }
            "--machine-translate" => {
                options.machine_translate = true;
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("localize: headless translation editor");
    println!("  --config <path>          Use a specific config path");
    println!("  --snapshot <path>        Load the editor snapshot from a JSON file");
    println!("  --set <id>=<value>       Edit and save a segment (repeatable)");
    println!("  --machine-translate      Machine translate and save untranslated strings");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --check                  Validate config + snapshot, then exit");
    println!("  --help                   Show this help");
    println!();
    println!("Set LOCALIZE_LOG (for example LOCALIZE_LOG=info) to control log output.");
}
