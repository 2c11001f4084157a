// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! mro - pipeline language compiler, formatter, and pipestance launcher.

mod exit_error;
mod mrp_locate;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use exit_error::ExitError;

#[derive(Parser)]
#[command(name = "mro", version, about = "Pipeline language compiler and launcher")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a source file and report errors
    Compile(CompileArgs),
    /// Compile and run a pipeline to completion
    Run(RunArgs),
    /// Print the canonical formatting of a source file
    Fmt(FmtArgs),
}

#[derive(clap::Args)]
struct CompileArgs {
    src: PathBuf,
    #[arg(long, value_enum, default_value = "text")]
    format: ReportFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

#[derive(clap::Args)]
struct RunArgs {
    src: PathBuf,
    call_id: PathBuf,
    #[arg(long, value_enum, default_value = "local")]
    jobmode: JobModeArg,
    /// Override the generated pipestance id
    #[arg(long)]
    psid: Option<String>,
    /// Cluster submission config, required for non-local job modes
    #[arg(long)]
    cluster_config: Option<PathBuf>,
    /// Shell command invoked with (dir, state, psid, [error-file]) on completion
    #[arg(long)]
    onfinish: Option<String>,
    #[arg(long, default_value_t = 8)]
    threads: u32,
    #[arg(long, default_value_t = 16)]
    mem_gb: u32,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum JobModeArg {
    Local,
    Sge,
    Lsf,
    Slurm,
}

impl JobModeArg {
    fn as_str(self) -> &'static str {
        match self {
            JobModeArg::Local => "local",
            JobModeArg::Sge => "sge",
            JobModeArg::Lsf => "lsf",
            JobModeArg::Slurm => "slurm",
        }
    }
}

#[derive(clap::Args)]
struct FmtArgs {
    src: PathBuf,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let code = e.downcast_ref::<ExitError>().map_or(1, |c| c.code);
        let msg = format_error(&e);
        if !msg.is_empty() {
            eprintln!("Error: {}", msg);
        }
        std::process::exit(code);
    }
}

/// Format an anyhow error, deduplicating the chain: if the top-level
/// Display already contains every source message, the chain adds nothing.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();
    let chain_redundant = err.chain().skip(1).all(|cause| top.contains(&cause.to_string()));
    if chain_redundant {
        return top;
    }
    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {}: {}", i, cause));
    }
    buf
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Compile(args) => compile(args),
        Commands::Run(args) => run_pipestance(args).await,
        Commands::Fmt(args) => fmt(args),
    }
}

fn compile(args: CompileArgs) -> Result<()> {
    let search_paths = args.src.parent().map(|p| vec![p.to_path_buf()]).unwrap_or_default();
    match mro_compiler::compile_file(&args.src, &search_paths) {
        mro_compiler::CompileResult::Ok(compiled) => {
            match args.format {
                ReportFormat::Text => println!("ok: {} declarations compiled", compiled.ast.callables.len()),
                ReportFormat::Json => println!("{}", serde_json::json!({ "status": "ok" })),
            }
            Ok(())
        }
        mro_compiler::CompileResult::ParseError(e) => Err(compile_failure(&e.to_string())),
        mro_compiler::CompileResult::IncludeError(e) => Err(compile_failure(&e.to_string())),
        mro_compiler::CompileResult::CompileErrors(errors) => Err(compile_failure(&errors.to_string())),
    }
}

fn fmt(args: FmtArgs) -> Result<()> {
    let search_paths = args.src.parent().map(|p| vec![p.to_path_buf()]).unwrap_or_default();
    match mro_compiler::compile_file(&args.src, &search_paths) {
        mro_compiler::CompileResult::Ok(compiled) => {
            print!("{}", mro_compiler::format_source(&compiled));
            Ok(())
        }
        mro_compiler::CompileResult::ParseError(e) => Err(compile_failure(&e.to_string())),
        mro_compiler::CompileResult::IncludeError(e) => Err(compile_failure(&e.to_string())),
        mro_compiler::CompileResult::CompileErrors(errors) => Err(compile_failure(&errors.to_string())),
    }
}

/// Compile errors exit with a distinct code from runtime failures (§7
/// "user-visible behavior").
fn compile_failure(msg: &str) -> anyhow::Error {
    anyhow::Error::msg(msg.to_string()).context(ExitError { code: 3 })
}

async fn run_pipestance(args: RunArgs) -> Result<()> {
    let mrp = mrp_locate::find_mrp_binary();
    let mut command = tokio::process::Command::new(&mrp);
    command.arg(&args.src).arg(&args.call_id);
    command.arg("--jobmode").arg(args.jobmode.as_str());
    if let Some(psid) = &args.psid {
        command.arg("--psid").arg(psid);
    }
    if let Some(path) = &args.cluster_config {
        command.arg("--cluster-config").arg(path);
    }
    if let Some(hook) = &args.onfinish {
        command.arg("--onfinish").arg(hook);
    }
    command.arg("--threads").arg(args.threads.to_string());
    command.arg("--mem-gb").arg(args.mem_gb.to_string());

    let status = command.status().await.map_err(|e| anyhow!("launching {}: {}", mrp.display(), e))?;
    let code = status.code().unwrap_or(1);
    if code != 0 {
        return Err(anyhow!(ExitError { code }));
    }
    Ok(())
}
