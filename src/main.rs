// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context};
use dagflow::graph::DagConfig;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: dagflow dot --meta <operators.json> <cluster-file> [--out <path>]";

/// Arguments of the `dot` subcommand.
#[derive(Debug, PartialEq)]
struct DotArgs {
    meta: PathBuf,
    script: PathBuf,
    out: Option<PathBuf>,
}

fn parse_dot_args(args: &[String]) -> anyhow::Result<DotArgs> {
    let mut meta: Option<PathBuf> = None;
    let mut out: Option<PathBuf> = None;
    let mut script: Option<PathBuf> = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--meta" => meta = Some(iter.next().context("--meta needs a path")?.into()),
            "--out" => out = Some(iter.next().context("--out needs a path")?.into()),
            flag if flag.starts_with("--") => bail!("unknown flag '{flag}'\n{USAGE}"),
            path => {
                if script.replace(PathBuf::from(path)).is_some() {
                    bail!("more than one cluster file given\n{USAGE}");
                }
            }
        }
    }

    Ok(DotArgs {
        meta: meta.context(USAGE)?,
        script: script.context(USAGE)?,
        out,
    })
}

fn run_dot(args: DotArgs) -> anyhow::Result<()> {
    let config = DagConfig::from_files(&args.meta, &args.script)
        .with_context(|| format!("loading '{}'", args.script.display()))?;
    let written = config.write_dot(args.out.as_deref())?;
    tracing::info!(path = %written.display(), "wrote graph rendering");
    println!("{}", written.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dagflow=info,warn")),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    match args.split_first() {
        Some((command, rest)) if command == "dot" => run_dot(parse_dot_args(rest)?),
        _ => bail!(USAGE),
    }
}
