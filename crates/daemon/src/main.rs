// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! mrp - compiles one source file and drives the pipestance it names to a
//! terminal state, reattaching if the directory already holds one.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use mro_daemon::{hook, lifecycle, logging};
use mro_jobmanager::JobMode;
use mro_runtime::{NodeState, RuntimeContext};
use tokio::sync::Notify;

const EXIT_USAGE: i32 = 2;
const EXIT_COMPILE: i32 = 3;
const EXIT_RUNTIME: i32 = 4;

#[derive(Parser)]
#[command(name = "mrp", version, about = "Drive one pipestance to a terminal state")]
struct Args {
    /// Source file to compile
    src: PathBuf,
    /// Pipestance directory, created if it does not already exist
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
    #[arg(long, default_value_t = 500)]
    poll_interval_ms: u64,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum JobModeArg {
    Local,
    Sge,
    Lsf,
    Slurm,
}

impl From<JobModeArg> for JobMode {
    fn from(v: JobModeArg) -> Self {
        match v {
            JobModeArg::Local => JobMode::Local,
            JobModeArg::Sge => JobMode::Sge,
            JobModeArg::Lsf => JobMode::Lsf,
            JobModeArg::Slurm => JobMode::Slurm,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let code = run(args).await;
    std::process::exit(code);
}

async fn run(args: Args) -> i32 {
    let config = lifecycle::Config {
        src: args.src,
        root_dir: args.call_id,
        job_mode: args.jobmode.into(),
        psid: args.psid,
        cluster_config: args.cluster_config,
        onfinish: args.onfinish,
        threads: args.threads,
        mem_gb: args.mem_gb,
        poll_interval_ms: args.poll_interval_ms,
    };

    let log_path = config.root_dir.join("_log");
    let _guard = match logging::init(&log_path) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: could not open log file {}: {}", log_path.display(), e);
            return EXIT_USAGE;
        }
    };

    let compiled = match lifecycle::compile(&config.src) {
        Ok(compiled) => compiled,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_COMPILE;
        }
    };

    let job_manager = match lifecycle::build_job_manager(&config) {
        Ok(jm) => jm,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_RUNTIME;
        }
    };

    let mut pipestance = match lifecycle::startup(&config, &compiled) {
        Ok(ps) => ps,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_RUNTIME;
        }
    };

    let ctx = RuntimeContext::new(job_manager);
    let shutdown = Arc::new(Notify::new());
    spawn_signal_handlers(shutdown.clone());

    let mut ticker = tokio::time::interval(Duration::from_millis(config.poll_interval_ms));
    let final_state = loop {
        tokio::select! {
            _ = shutdown.notified() => {
                tracing::info!("received shutdown signal, releasing lock");
                pipestance.release();
                return EXIT_RUNTIME;
            }
            _ = ticker.tick() => {
                match pipestance.step(&ctx).await {
                    Ok(state) => {
                        if state.is_terminal() {
                            break state;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "scheduling tick failed");
                        pipestance.release();
                        eprintln!("Error: {}", e);
                        return EXIT_RUNTIME;
                    }
                }
            }
        }
    };

    if let Err(e) = pipestance.immortalize() {
        tracing::warn!(error = %e, "immortalize failed");
    }

    let error_file = pipestance.first_error_file(&config.root_dir);
    if let Some(cmd) = &config.onfinish {
        hook::dispatch(cmd, &config.root_dir, final_state, pipestance.id.as_str(), error_file.as_deref());
    }

    pipestance.release();

    if final_state == NodeState::Complete {
        println!("{} {}", pipestance.id, final_state);
        return 0;
    }

    if let Some(node) = pipestance.graph.iter().find(|n| n.state == NodeState::Failed) {
        eprintln!("Error: node {} failed", node.fqname);
        if let Some(path) = &error_file {
            eprintln!("  error file: {}", path.display());
        }
    } else {
        eprintln!("Error: pipestance {} ended in state {}", pipestance.id, final_state);
    }
    EXIT_RUNTIME
}

fn spawn_signal_handlers(shutdown: Arc<Notify>) {
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(_) => return,
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(_) => return,
        };
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
        shutdown.notify_one();
    });
}
