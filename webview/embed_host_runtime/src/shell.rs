//! Stdio transport to a native shell that owns the actual webview.
//!
//! Packets are a 4-byte big-endian length followed by a JSON body. The host
//! writes [`ShellCommand`]s to stdout and reads [`ShellEvent`]s from stdin.

use crate::config::EmbedConfig;
use crate::controller::EmbedController;
use crate::error::{EmbedError, Result};
use crate::frame::FrameSource;
use crate::lifecycle::MountId;
use crate::params::EmbedProps;
use crate::priming::PrimingClient;
use crate::state_sync::Snapshot;
use crate::{ContentFrame, EmbedEvent, run_event_loop};
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::thread;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "t")]
pub enum ShellCommand {
    #[serde(rename = "mount")]
    Mount { mount: u64, source: FrameSource },
    #[serde(rename = "inject")]
    Inject { mount: u64, script: String },
    #[serde(rename = "unmount")]
    Unmount { mount: u64 },
    #[serde(rename = "state")]
    State { snapshot: Snapshot },
    #[serde(rename = "request_close")]
    RequestClose,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "t")]
pub enum ShellEvent {
    #[serde(rename = "load")]
    Load { mount: u64 },
    #[serde(rename = "message")]
    Message { mount: u64, data: String },
    #[serde(rename = "props")]
    Props { props: EmbedProps },
    #[serde(rename = "unmount")]
    Unmount,
}

impl ShellCommand {
    pub fn kind(&self) -> &'static str {
        match self {
            ShellCommand::Mount { .. } => "mount",
            ShellCommand::Inject { .. } => "inject",
            ShellCommand::Unmount { .. } => "unmount",
            ShellCommand::State { .. } => "state",
            ShellCommand::RequestClose => "request_close",
        }
    }
}

impl From<ShellEvent> for EmbedEvent {
    fn from(event: ShellEvent) -> Self {
        match event {
            ShellEvent::Load { mount } => EmbedEvent::FrameLoaded {
                mount: MountId(mount),
            },
            ShellEvent::Message { mount, data } => EmbedEvent::FrameMessage {
                mount: MountId(mount),
                data,
            },
            ShellEvent::Props { props } => EmbedEvent::Props(props),
            ShellEvent::Unmount => EmbedEvent::Unmount,
        }
    }
}

/// [`ContentFrame`] backed by the shell's outbound packet queue.
pub struct StdioFrame {
    tx: SyncSender<ShellCommand>,
}

impl StdioFrame {
    pub fn new(tx: SyncSender<ShellCommand>) -> Self {
        Self { tx }
    }

    fn send(&self, command: ShellCommand) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| EmbedError::Frame("shell writer has shut down".to_string()))
    }
}

impl ContentFrame for StdioFrame {
    fn mount(&mut self, mount: MountId, source: &FrameSource) -> Result<()> {
        self.send(ShellCommand::Mount {
            mount: mount.0,
            source: source.clone(),
        })
    }

    fn inject_script(&mut self, mount: MountId, script: &str) -> Result<()> {
        self.send(ShellCommand::Inject {
            mount: mount.0,
            script: script.to_string(),
        })
    }

    fn unmount(&mut self, mount: MountId) {
        if let Err(err) = self.send(ShellCommand::Unmount { mount: mount.0 }) {
            tracing::warn!(%mount, error = %err, "failed to queue unmount");
        }
    }
}

/// Runs one embed against the shell on stdin/stdout until the shell unmounts
/// it or goes away.
pub fn run_stdio<P>(props: EmbedProps, config: EmbedConfig, client: P) -> Result<()>
where
    P: PrimingClient + 'static,
{
    props.validate()?;

    let (command_tx, command_rx) = mpsc::sync_channel(config.outbound_queue_cap);
    let (event_tx, event_rx) = mpsc::channel();

    let host_to_shell_cap = config.host_to_shell_cap;
    let writer_handle = thread::spawn(move || {
        let stdout = io::stdout();
        writer_loop(&mut stdout.lock(), command_rx, host_to_shell_cap)
    });

    let shell_to_host_cap = config.shell_to_host_cap;
    let reader_tx = event_tx.clone();
    let reader_handle = thread::spawn(move || {
        let stdin = io::stdin();
        let result = reader_loop(&mut stdin.lock(), shell_to_host_cap, |event| {
            let _ = reader_tx.send(event.into());
        });

        if let Err(err) = &result {
            tracing::error!(error = %err, "shell reader terminated with error");
        }
        let _ = reader_tx.send(EmbedEvent::Unmount);
        result
    });

    {
        let mut controller = build_controller(command_tx.clone(), config.outbound_queue_cap);
        event_tx
            .send(EmbedEvent::Props(props))
            .map_err(|_| EmbedError::Frame("event loop closed before start".to_string()))?;
        run_event_loop(&mut controller, Arc::new(client), event_tx, event_rx);
    }

    // Drop the controller's queue handles first so the writer can drain and exit.
    drop(command_tx);

    match writer_handle.join() {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::error!(error = %err, "shell writer returned error"),
        Err(err) => tracing::error!(error = ?err, "shell writer join failed"),
    }

    if reader_handle.is_finished() {
        match reader_handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::error!(error = %err, "shell reader returned error"),
            Err(err) => tracing::error!(error = ?err, "shell reader join failed"),
        }
    } else {
        // Avoid hanging process exit on a blocked stdin read during teardown.
        tracing::debug!("shell reader still active during shutdown; skipping join");
    }

    Ok(())
}

fn build_controller(
    tx: SyncSender<ShellCommand>,
    queue_capacity: usize,
) -> EmbedController<StdioFrame> {
    let close_tx = tx.clone();
    let mut controller = EmbedController::new(StdioFrame::new(tx.clone()), move || {
        enqueue_command(&close_tx, ShellCommand::RequestClose, queue_capacity);
    });

    controller.subscribe_state(move |snapshot| {
        enqueue_command(
            &tx,
            ShellCommand::State {
                snapshot: snapshot.clone(),
            },
            queue_capacity,
        );
    });

    controller
}

/// Queues a notification for the shell. A full queue blocks the event loop
/// until the writer drains, so notifications reach the shell in the order
/// they were produced.
fn enqueue_command(tx: &SyncSender<ShellCommand>, command: ShellCommand, queue_capacity: usize) {
    let command = match tx.try_send(command) {
        Ok(()) => return,
        Err(TrySendError::Full(command)) => command,
        Err(TrySendError::Disconnected(_command)) => {
            tracing::warn!("failed to enqueue shell notification");
            return;
        }
    };

    tracing::warn!(
        cap = queue_capacity,
        "shell outbound queue full; waiting to enqueue notification"
    );
    if tx.send(command).is_err() {
        tracing::warn!("failed to enqueue shell notification");
    }
}

/// Drains commands to the shell until every sender is gone. A command whose
/// encoding exceeds `max_payload` is dropped and the loop keeps going.
pub fn writer_loop(
    writer: &mut impl Write,
    rx: Receiver<ShellCommand>,
    max_payload: usize,
) -> io::Result<()> {
    for command in rx {
        let payload = serde_json::to_vec(&command).map_err(json_error)?;
        if payload.len() > max_payload {
            tracing::error!(
                command = command.kind(),
                size = payload.len(),
                cap = max_payload,
                "dropping shell command over the packet cap"
            );
            continue;
        }
        write_frame(writer, &payload, max_payload)?;
        writer.flush()?;
    }

    Ok(())
}

/// Reads events until EOF. Undecodable packets are skipped; framing errors
/// end the loop.
pub fn reader_loop<F>(reader: &mut impl Read, max_payload: usize, mut on_event: F) -> io::Result<()>
where
    F: FnMut(ShellEvent),
{
    loop {
        match read_frame(reader, max_payload) {
            Ok(payload) => match serde_json::from_slice::<ShellEvent>(&payload) {
                Ok(event) => on_event(event),
                Err(err) => tracing::warn!(error = %err, "skipping undecodable shell packet"),
            },
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(err) => return Err(err),
        }
    }
}

fn read_frame(reader: &mut impl Read, max_payload: usize) -> io::Result<Vec<u8>> {
    let mut len_buf = [0_u8; 4];
    reader.read_exact(&mut len_buf)?;

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_payload {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {len} > {max_payload}"),
        ));
    }

    let mut payload = vec![0_u8; len];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}

fn write_frame(writer: &mut impl Write, payload: &[u8], max_payload: usize) -> io::Result<()> {
    if payload.len() > max_payload {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {} > {}", payload.len(), max_payload),
        ));
    }

    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "payload exceeds u32"))?;

    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(payload)?;
    Ok(())
}

fn json_error(err: serde_json::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err)
}
