use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::select;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::events::{HostCommand, Interaction};

/// Turn input lines into host commands.
///
/// Each non-empty line names one interaction for the hero portrait
/// (`enter`, `leave`, `click`, `enter-key`, `space`); `quit` requests
/// shutdown. Unknown lines are logged and skipped. End of input only ends
/// this task: dropping `to_host` closes the channel and the host decides,
/// via [`eof_ends_session`], whether that means shutdown.
pub async fn run<R>(reader: R, to_host: Sender<HostCommand>, cancel: CancellationToken) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        let line = select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            info!("input closed");
            break;
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let command = if trimmed.eq_ignore_ascii_case("quit") {
            HostCommand::Shutdown
        } else {
            match trimmed.parse::<Interaction>() {
                Ok(interaction) => HostCommand::Hero(interaction),
                Err(err) => {
                    warn!(input = trimmed, error = %err, "ignoring input line");
                    continue;
                }
            }
        };
        debug!(?command, "input command");
        let shutdown = command == HostCommand::Shutdown;
        if to_host.send(command).await.is_err() || shutdown {
            break;
        }
    }
    Ok(())
}

/// Whether closing the input stream should end a live session.
///
/// Only an interactive terminal without a run limit treats end of input as
/// a request to quit. Redirected stdin (`/dev/null`, a service unit, a pipe
/// that finished) or an explicit `--run-for` keeps the host running until
/// the limit or an interrupt.
#[must_use]
pub fn eof_ends_session(stdin_is_terminal: bool, run_for: Option<Duration>) -> bool {
    stdin_is_terminal && run_for.is_none()
}
