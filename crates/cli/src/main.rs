//! # Conclave CLI
//!
//! Runs a team file in selector or graph mode, synthesizes the final report
//! and stores it as markdown.

mod team;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use conclave_core::report::{ArtifactSink, FileArtifactSink, ReportDocument, Synthesizer};
use conclave_core::swarm::{GraphFlow, RunCommand, RunEvent, RunOutcome, SelectorCoordinator};
use conclave_core::RunFailure;

use team::TeamFile;

#[derive(Parser, Clone)]
#[command(author, version, about = "Conclave - Multi-Actor Orchestration")]
struct Args {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Clone)]
enum CliCommand {
    /// Run a selector-driven round
    Select {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Run the team as a dependency graph
    Graph {
        #[command(flatten)]
        run: RunArgs,
    },
    /// List stored reports, newest first
    History {
        /// Report directory
        #[arg(short, long, default_value = "reports")]
        out: PathBuf,
    },
}

#[derive(clap::Args, Clone)]
struct RunArgs {
    /// Team definition (JSON)
    #[arg(long)]
    team: PathBuf,
    /// Task that seeds the transcript
    #[arg(long)]
    task: String,
    /// Report directory
    #[arg(short, long, default_value = "reports")]
    out: PathBuf,
    /// Print run events as they happen
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match args.command {
        CliCommand::Select { run } => execute(run, Mode::Select).await,
        CliCommand::Graph { run } => execute(run, Mode::Graph).await,
        CliCommand::History { out } => {
            let sink = FileArtifactSink::new(out);
            let reports = sink.history().await?;
            if reports.is_empty() {
                println!("No reports in {}", sink.dir().display());
            }
            for id in reports {
                println!("{}", sink.path_for(&id).display());
            }
            Ok(())
        }
    }
}

#[derive(Clone, Copy)]
enum Mode {
    Select,
    Graph,
}

async fn execute(args: RunArgs, mode: Mode) -> Result<()> {
    let team = TeamFile::load(&args.team)?;
    tracing::info!(team = %args.team.display(), actors = team.actors.len(), "starting run");

    let (event_tx, mut event_rx) = mpsc::channel::<RunEvent>(64);
    let (command_tx, command_rx) = mpsc::channel::<RunCommand>(1);
    let verbose = args.verbose;
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if verbose {
                eprintln!("[{:?}] {}", event.kind, event.actor);
            }
        }
    });

    // Ctrl-C requests cancellation at the next turn boundary
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = command_tx.send(RunCommand::Cancel).await;
        }
    });

    let result = match mode {
        Mode::Select => {
            let mut coordinator =
                SelectorCoordinator::new(team.participants()?, team.selector(), team.config.clone())
                    .with_event_channel(event_tx)
                    .with_command_channel(command_rx);
            coordinator.run(args.task.as_str()).await
        }
        Mode::Graph => {
            let mut flow = GraphFlow::new(team.graph()?, team.config.clone())
                .with_event_channel(event_tx)
                .with_command_channel(command_rx);
            flow.run(args.task.as_str()).await
        }
    };
    // Senders were dropped with the orchestrator
    let _ = printer.await;

    let (transcript, summary) = match result {
        Ok(RunOutcome {
            transcript,
            stop_reason,
            run_id,
            ..
        }) => {
            println!("Run {} finished: {:?}", run_id, stop_reason);
            (transcript, None)
        }
        Err(RunFailure {
            error, transcript, ..
        }) => {
            eprintln!("Run failed: {}", error);
            (transcript, Some(error))
        }
    };
    println!("   Messages: {}", transcript.len());

    let body = Synthesizer::new(team.config.report.clone()).synthesize(&transcript);
    let document = ReportDocument::new(&team.report.title, &args.task, body);
    let identifier = document.identifier(&team.report.prefix);
    let sink = FileArtifactSink::new(&args.out);
    sink.store(&identifier, &document.render())
        .await
        .context("Failed to store report")?;
    println!("   Report: {}", sink.path_for(&identifier).display());

    match summary {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}
