//! Backend worker: runs identity service requests on a tokio runtime off
//! the thread that owns the sessions.

use std::{sync::Arc, thread};

use client_core::{execute_request, CompletedRequest, IdentityService, PendingRequest};
use crossbeam_channel::{Receiver, Sender, TrySendError};

pub enum BackendCommand {
    Submit(PendingRequest),
}

impl BackendCommand {
    fn name(&self) -> &'static str {
        match self {
            Self::Submit(_) => "submit",
        }
    }
}

pub enum UiEvent {
    Input(String),
    InputClosed,
    RequestCompleted(CompletedRequest),
    BackendFailed(String),
}

pub fn spawn_backend_thread(
    service: Arc<dyn IdentityService>,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                tracing::error!("failed to build backend runtime: {err}");
                let _ = ui_tx.send(UiEvent::BackendFailed(format!(
                    "backend worker startup failure: {err}"
                )));
                return;
            }
        };

        runtime.block_on(async move {
            tracing::debug!("backend worker ready");
            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BackendCommand::Submit(request) => {
                        let service = Arc::clone(&service);
                        let ui_tx = ui_tx.clone();
                        tokio::spawn(async move {
                            let completed = execute_request(service.as_ref(), request).await;
                            if ui_tx.send(UiEvent::RequestCompleted(completed)).is_err() {
                                tracing::debug!("ui went away before request completed");
                            }
                        });
                    }
                }
            }
            tracing::debug!("backend command queue closed");
        });
    });
}

/// Hands a command to the worker. The error string is user-facing.
pub fn queue_command(cmd_tx: &Sender<BackendCommand>, cmd: BackendCommand) -> Result<(), String> {
    let cmd_name = cmd.name();
    match cmd_tx.try_send(cmd) {
        Ok(()) => {
            tracing::debug!(command = cmd_name, "queued ui->backend command");
            Ok(())
        }
        Err(TrySendError::Full(_)) => {
            tracing::warn!(command = cmd_name, "ui->backend command queue is full");
            Err("request queue is full; please retry".to_string())
        }
        Err(TrySendError::Disconnected(_)) => {
            tracing::error!(command = cmd_name, "ui->backend command queue disconnected");
            Err("backend worker is not running".to_string())
        }
    }
}
