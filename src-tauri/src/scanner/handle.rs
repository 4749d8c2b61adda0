//! The dispatcher task and the cloneable handle used to drive it.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::{Input, ScanController, Snapshot, StartOutcome};
use crate::adapter::BleBackend;
use crate::config::AppConfig;
use crate::error::ScannerClosed;
use crate::notice::Presenter;
use crate::permissions::PermissionGate;

enum Command {
    StartScan(oneshot::Sender<StartOutcome>),
    StopScan(oneshot::Sender<bool>),
    Snapshot(oneshot::Sender<Snapshot>),
    Shutdown(oneshot::Sender<()>),
}

/// Sends commands to the scanner's dispatcher task.
///
/// The dispatcher shuts down, releasing the adapter, once every handle is
/// dropped or [`ScannerHandle::shutdown`] is called.
#[derive(Clone, Debug)]
pub struct ScannerHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Command::StartScan(_) => "StartScan",
            Command::StopScan(_) => "StopScan",
            Command::Snapshot(_) => "Snapshot",
            Command::Shutdown(_) => "Shutdown",
        };
        f.write_str(name)
    }
}

impl ScannerHandle {
    /// Takes ownership of `backend` and spawns the dispatcher on the current
    /// tokio runtime.
    pub fn spawn<B: BleBackend + 'static>(
        backend: B,
        gate: PermissionGate,
        presenter: impl Presenter + 'static,
        config: &AppConfig,
    ) -> (Self, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let controller = ScanController::new(backend, gate, presenter, config, inbox_tx);
        let task = tokio::spawn(run(controller, commands_rx, inbox_rx));
        (
            Self {
                commands: commands_tx,
            },
            task,
        )
    }

    pub async fn start_scan(&self) -> Result<StartOutcome, ScannerClosed> {
        self.request(Command::StartScan).await
    }

    pub async fn stop_scan(&self) -> Result<bool, ScannerClosed> {
        self.request(Command::StopScan).await
    }

    pub async fn snapshot(&self) -> Result<Snapshot, ScannerClosed> {
        self.request(Command::Snapshot).await
    }

    /// Stops any scan and releases the adapter. Safe to call repeatedly.
    pub async fn shutdown(&self) {
        // A closed dispatcher has already shut down.
        let _ = self.request(Command::Shutdown).await;
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ScannerClosed> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(command(reply_tx))
            .map_err(|_| ScannerClosed)?;
        reply_rx.await.map_err(|_| ScannerClosed)
    }
}

/// Single event loop: the only place the controller is touched.
async fn run<B: BleBackend + 'static>(
    mut controller: ScanController<B>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut inbox: mpsc::UnboundedReceiver<Input>,
) {
    controller.monitor_adapter().await;

    loop {
        tokio::select! {
            // Backend events already queued are applied before later commands.
            biased;

            Some(input) = inbox.recv() => controller.handle(input).await,

            command = commands.recv() => {
                let Some(command) = command else { break };
                log::debug!("dispatching {command:?}");
                match command {
                    Command::StartScan(reply) => {
                        let _ = reply.send(controller.start().await);
                    }
                    Command::StopScan(reply) => {
                        let _ = reply.send(controller.stop().await);
                    }
                    Command::Snapshot(reply) => {
                        let _ = reply.send(controller.snapshot());
                    }
                    Command::Shutdown(reply) => {
                        controller.shutdown().await;
                        let _ = reply.send(());
                        return;
                    }
                }
            }
        }
    }

    controller.shutdown().await;
}
