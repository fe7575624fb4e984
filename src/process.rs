//! Streaming subprocess execution.
//!
//! Every external stage of the pipeline (index build, search) runs through
//! [`spawn_streaming`]: the child's stdout and stderr are piped and forwarded
//! as [`ProcessEvent::Chunk`]s in arrival order, followed by exactly one
//! [`ProcessEvent::Exited`] once the child has terminated and both pipes are
//! drained. Chunk boundaries are whatever the pipe delivered — they are not
//! line-aligned.
//!
//! There is no cancellation: dropping a [`RunningProcess`] stops delivery but
//! the child keeps running to completion.

use anyhow::{Context, Result};
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;

/// One event from a spawned process.
#[derive(Debug)]
pub enum ProcessEvent {
    /// A chunk of output, in arrival order.
    Chunk(String),
    /// Sent exactly once, after every chunk, whatever the exit code.
    Exited(i32),
}

/// Handle to a spawned process. Consume events with [`RunningProcess::next_event`];
/// the stream ends after the `Exited` event.
pub struct RunningProcess {
    events: mpsc::Receiver<ProcessEvent>,
}

impl RunningProcess {
    pub async fn next_event(&mut self) -> Option<ProcessEvent> {
        self.events.recv().await
    }

    /// Wrap a raw event channel. Used by remote shells and test doubles that
    /// produce events from something other than a local child process.
    pub fn from_receiver(events: mpsc::Receiver<ProcessEvent>) -> RunningProcess {
        RunningProcess { events }
    }
}

/// Spawn `cmd` with piped output and return a handle streaming its events.
pub fn spawn_streaming(mut cmd: Command) -> Result<RunningProcess> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().context("Failed to spawn process")?;
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (tx, rx) = mpsc::channel(64);

    tokio::spawn(async move {
        // Both pipes must be drained before waiting, or a chatty child can
        // deadlock on a full pipe buffer.
        tokio::join!(drain(stdout, tx.clone()), drain(stderr, tx.clone()));

        let code = match child.wait().await {
            Ok(status) => status.code().unwrap_or(-1),
            Err(_) => -1,
        };
        let _ = tx.send(ProcessEvent::Exited(code)).await;
    });

    Ok(RunningProcess { events: rx })
}

async fn drain<R: AsyncRead + Unpin>(reader: Option<R>, tx: mpsc::Sender<ProcessEvent>) {
    let Some(mut reader) = reader else {
        return;
    };
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let text = String::from_utf8_lossy(&buf[..n]).to_string();
                if tx.send(ProcessEvent::Chunk(text)).await.is_err() {
                    break;
                }
            }
        }
    }
}
