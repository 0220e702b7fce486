//! Interactive loop driving the register and search sessions side by side.
//!
//! The loop thread owns both sessions. Requests run on the backend worker
//! and come back as [`UiEvent::RequestCompleted`], so one workflow can be
//! edited while the other is waiting on the service.

use std::{io, path::PathBuf, thread};

use anyhow::Result;
use client_core::{CompletedRequest, Completion, UploadSession, WorkflowController};
use crossbeam_channel::{bounded, Sender};
use shared::{domain::WorkflowKind, error::WorkflowError};

use crate::{
    backend::{queue_command, spawn_backend_thread, BackendCommand, UiEvent},
    files::load_image_file,
    render::render_session,
};

const HELP: &str = "\
Commands:
  register <path>    select an image to register (JPEG or PNG)
  search <path>      select an image to search with
  submit register    send the selected registration image
  submit search      send the selected search image
  reset register|search
  show               print both workflows
  help
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Select { kind: WorkflowKind, path: PathBuf },
    Submit(WorkflowKind),
    Reset(WorkflowKind),
    Show,
    Help,
    Quit,
}

/// Parses one input line; blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<ShellCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "register" | "search" => {
            let kind = parse_kind(verb)?;
            if rest.is_empty() {
                return Err(format!("usage: {verb} <path>"));
            }
            ShellCommand::Select {
                kind,
                path: PathBuf::from(rest),
            }
        }
        "submit" => ShellCommand::Submit(parse_kind(rest)?),
        "reset" => ShellCommand::Reset(parse_kind(rest)?),
        "show" => ShellCommand::Show,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" => ShellCommand::Quit,
        other => return Err(format!("unknown command '{other}'; type 'help'")),
    };
    Ok(Some(command))
}

fn parse_kind(raw: &str) -> Result<WorkflowKind, String> {
    match raw.to_ascii_lowercase().as_str() {
        "register" => Ok(WorkflowKind::Register),
        "search" => Ok(WorkflowKind::Search),
        other => Err(format!("expected 'register' or 'search', got '{other}'")),
    }
}

struct Shell {
    controller: WorkflowController,
    register: UploadSession,
    search: UploadSession,
    cmd_tx: Sender<BackendCommand>,
}

impl Shell {
    fn new(controller: WorkflowController, cmd_tx: Sender<BackendCommand>) -> Self {
        Self {
            controller,
            register: UploadSession::new(WorkflowKind::Register),
            search: UploadSession::new(WorkflowKind::Search),
            cmd_tx,
        }
    }

    fn parts(&mut self, kind: WorkflowKind) -> (&WorkflowController, &mut UploadSession) {
        match kind {
            WorkflowKind::Register => (&self.controller, &mut self.register),
            WorkflowKind::Search => (&self.controller, &mut self.search),
        }
    }

    fn session(&self, kind: WorkflowKind) -> &UploadSession {
        match kind {
            WorkflowKind::Register => &self.register,
            WorkflowKind::Search => &self.search,
        }
    }

    fn any_pending(&self) -> bool {
        self.register.is_busy() || self.search.is_busy()
    }

    fn handle_command(&mut self, command: ShellCommand) {
        match command {
            ShellCommand::Select { kind, path } => {
                match load_image_file(&path) {
                    Ok(file) => {
                        let (controller, session) = self.parts(kind);
                        // While pending the session keeps showing the request,
                        // so the rejection is reported here instead.
                        if let Err(err) = controller.select(session, file) {
                            if session.is_busy() {
                                println!("! {err}");
                            }
                        }
                    }
                    Err(err) => {
                        println!("! {err:#}");
                        return;
                    }
                }
                self.print(kind);
            }
            ShellCommand::Submit(kind) => {
                self.submit(kind);
                self.print(kind);
            }
            ShellCommand::Reset(kind) => {
                self.parts(kind).1.reset();
                self.print(kind);
            }
            ShellCommand::Show => {
                self.print(WorkflowKind::Register);
                self.print(WorkflowKind::Search);
            }
            ShellCommand::Help => println!("{HELP}"),
            ShellCommand::Quit => {}
        }
    }

    fn submit(&mut self, kind: WorkflowKind) {
        let cmd_tx = self.cmd_tx.clone();
        let (controller, session) = self.parts(kind);
        let Some(request) = controller.begin_submit(session) else {
            return;
        };
        let generation = request.generation;
        if let Err(message) = queue_command(&cmd_tx, BackendCommand::Submit(request)) {
            controller.complete(
                session,
                CompletedRequest {
                    kind,
                    generation,
                    outcome: Err(WorkflowError::Client { message }),
                },
            );
        }
    }

    fn handle_completion(&mut self, completed: CompletedRequest) {
        let kind = completed.kind;
        let (controller, session) = self.parts(kind);
        match controller.complete(session, completed) {
            Completion::Applied { notice } => {
                if let Some(notice) = notice {
                    println!("{notice}");
                }
                self.print(kind);
            }
            Completion::Discarded | Completion::Rejected => {}
        }
    }

    /// Settles every pending session with `message` once the worker is gone.
    fn fail_pending(&mut self, message: &str) {
        for kind in [WorkflowKind::Register, WorkflowKind::Search] {
            let (controller, session) = self.parts(kind);
            if !session.is_busy() {
                continue;
            }
            let generation = session.generation();
            controller.complete(
                session,
                CompletedRequest {
                    kind,
                    generation,
                    outcome: Err(WorkflowError::Client {
                        message: message.to_string(),
                    }),
                },
            );
            self.print(kind);
        }
    }

    fn print(&self, kind: WorkflowKind) {
        print!("{}", render_session(self.session(kind)));
    }
}

fn spawn_input_thread(ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        for line in io::stdin().lines() {
            match line {
                Ok(line) => {
                    if ui_tx.send(UiEvent::Input(line)).is_err() {
                        return;
                    }
                }
                Err(err) => {
                    tracing::warn!("failed to read input: {err}");
                    break;
                }
            }
        }
        let _ = ui_tx.send(UiEvent::InputClosed);
    });
}

pub fn run_shell(controller: WorkflowController) -> Result<()> {
    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(64);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(256);
    spawn_backend_thread(controller.service(), cmd_rx, ui_tx.clone());
    spawn_input_thread(ui_tx);

    let mut shell = Shell::new(controller, cmd_tx);
    println!("{HELP}");

    let mut input_closed = false;
    while let Ok(event) = ui_rx.recv() {
        match event {
            UiEvent::Input(line) => match parse_command(&line) {
                Ok(Some(ShellCommand::Quit)) => break,
                Ok(Some(command)) => shell.handle_command(command),
                Ok(None) => {}
                Err(message) => println!("{message}"),
            },
            UiEvent::InputClosed => input_closed = true,
            UiEvent::RequestCompleted(completed) => shell.handle_completion(completed),
            UiEvent::BackendFailed(message) => {
                tracing::error!("{message}");
                shell.fail_pending(&message);
            }
        }
        // Once input ends, wait for outstanding requests before leaving.
        if input_closed && !shell.any_pending() {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{env, fs, sync::Arc, time::{SystemTime, UNIX_EPOCH}};

    use async_trait::async_trait;
    use client_core::{IdentityService, PreviewStore, TransportError, UploadPayload};
    use serde_json::Value;
    use shared::domain::{SearchResult, WorkflowResult};

    use super::*;

    struct Unreachable;

    #[async_trait]
    impl IdentityService for Unreachable {
        async fn submit(
            &self,
            _kind: WorkflowKind,
            _upload: UploadPayload,
        ) -> Result<Value, TransportError> {
            Err(TransportError::Network("unreachable".to_string()))
        }
    }

    fn write_image(name: &str) -> PathBuf {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let dir = env::temp_dir().join(format!("faceid_shell_test_{suffix}"));
        fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join(name);
        fs::write(&path, b"image-bytes").expect("write image");
        path
    }

    fn shell_with_queue(capacity: usize) -> (Shell, crossbeam_channel::Receiver<BackendCommand>) {
        let (cmd_tx, cmd_rx) = bounded(capacity);
        let controller = WorkflowController::new(Arc::new(Unreachable), PreviewStore::new());
        (Shell::new(controller, cmd_tx), cmd_rx)
    }

    #[test]
    fn parses_selection_with_spaces_in_path() {
        assert_eq!(
            parse_command("register  my photos/cat.png "),
            Ok(Some(ShellCommand::Select {
                kind: WorkflowKind::Register,
                path: PathBuf::from("my photos/cat.png"),
            }))
        );
        assert_eq!(
            parse_command("SUBMIT Search"),
            Ok(Some(ShellCommand::Submit(WorkflowKind::Search)))
        );
        assert_eq!(parse_command("   "), Ok(None));
        assert_eq!(parse_command("exit"), Ok(Some(ShellCommand::Quit)));
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!(parse_command("register").is_err());
        assert!(parse_command("submit both").is_err());
        assert!(parse_command("upload cat.png").is_err());
    }

    #[test]
    fn submit_queues_request_and_completion_settles_session() {
        let (mut shell, cmd_rx) = shell_with_queue(4);
        let path = write_image("cat2.jpg");
        shell.handle_command(ShellCommand::Select {
            kind: WorkflowKind::Search,
            path: path.clone(),
        });
        shell.handle_command(ShellCommand::Submit(WorkflowKind::Search));
        assert!(shell.any_pending());

        let BackendCommand::Submit(request) = cmd_rx.try_recv().expect("queued request");
        assert_eq!(request.kind, WorkflowKind::Search);
        assert_eq!(request.upload.file_name, "cat2.jpg");

        shell.handle_completion(CompletedRequest {
            kind: WorkflowKind::Search,
            generation: request.generation,
            outcome: Ok(WorkflowResult::Matches(SearchResult::default())),
        });
        assert!(!shell.any_pending());
        assert!(shell.search.result().is_some());
        assert!(shell.register.result().is_none());

        fs::remove_dir_all(path.parent().expect("dir")).expect("cleanup");
    }

    #[test]
    fn submit_without_worker_fails_instead_of_hanging() {
        let (mut shell, cmd_rx) = shell_with_queue(1);
        drop(cmd_rx);
        let path = write_image("cat.png");
        shell.handle_command(ShellCommand::Select {
            kind: WorkflowKind::Register,
            path: path.clone(),
        });
        shell.handle_command(ShellCommand::Submit(WorkflowKind::Register));

        assert!(!shell.any_pending());
        assert_eq!(
            shell.register.error_message().as_deref(),
            Some("Error: backend worker is not running")
        );

        fs::remove_dir_all(path.parent().expect("dir")).expect("cleanup");
    }

    #[test]
    fn backend_failure_settles_pending_sessions() {
        let (mut shell, _cmd_rx) = shell_with_queue(4);
        let path = write_image("cat.png");
        shell.handle_command(ShellCommand::Select {
            kind: WorkflowKind::Register,
            path: path.clone(),
        });
        shell.handle_command(ShellCommand::Submit(WorkflowKind::Register));
        assert!(shell.register.is_busy());

        shell.fail_pending("backend worker startup failure: boom");
        assert!(!shell.any_pending());
        assert!(shell.register.error().is_some());

        fs::remove_dir_all(path.parent().expect("dir")).expect("cleanup");
    }

    #[test]
    fn selecting_unreadable_file_leaves_session_untouched() {
        let (mut shell, _cmd_rx) = shell_with_queue(4);
        shell.handle_command(ShellCommand::Select {
            kind: WorkflowKind::Search,
            path: PathBuf::from("/nonexistent/cat.png"),
        });
        assert!(shell.search.image().is_none());
        assert!(shell.search.error().is_none());
    }
}
