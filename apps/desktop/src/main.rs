use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{Completion, HttpIdentityService, PreviewStore, UploadSession, WorkflowController};
use shared::domain::WorkflowKind;
use tracing_subscriber::EnvFilter;

mod backend;
mod config;
mod files;
mod render;
mod shell;

#[derive(Parser, Debug)]
#[command(name = "faceid", about = "Register animal faces and search for matches")]
struct Args {
    /// Base URL of the identity service.
    #[arg(long)]
    service_url: Option<String>,
    /// Request timeout in seconds; 0 disables it.
    #[arg(long)]
    timeout_seconds: Option<u64>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register one image and print the issued animal ID.
    Register { image: PathBuf },
    /// Search with one image and print the matches.
    Search { image: PathBuf },
    /// Drive both workflows interactively (default).
    Shell,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = config::load_settings();
    settings.apply_overrides(args.service_url, args.timeout_seconds);
    let controller = build_controller(&settings)?;

    match args.command.unwrap_or(Command::Shell) {
        Command::Register { image } => run_once(&controller, WorkflowKind::Register, &image),
        Command::Search { image } => run_once(&controller, WorkflowKind::Search, &image),
        Command::Shell => {
            shell::run_shell(controller)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build_controller(settings: &config::Settings) -> Result<WorkflowController> {
    let service = if settings.request_timeout_seconds == 0 {
        HttpIdentityService::new(&settings.service_url)?
    } else {
        HttpIdentityService::with_timeout(
            &settings.service_url,
            Duration::from_secs(settings.request_timeout_seconds),
        )?
    };
    tracing::info!(service_url = %service.base_url(), "using identity service");
    Ok(WorkflowController::new(Arc::new(service), PreviewStore::new()))
}

fn run_once(controller: &WorkflowController, kind: WorkflowKind, image: &Path) -> Result<ExitCode> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;
    let file = files::load_image_file(image)?;

    let mut session = UploadSession::new(kind);
    if controller.select(&mut session, file).is_ok() {
        if let Completion::Applied {
            notice: Some(notice),
        } = runtime.block_on(controller.submit(&mut session))
        {
            println!("{notice}");
        }
    }
    print!("{}", render::render_session(&session));

    Ok(if session.error().is_some() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
