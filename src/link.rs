//! Read-loop glue between the protocol engine and the task layer.
//!
//! One dedicated worker per active connection drives `step()` in a loop.
//! The loop applies the error policy:
//!
//! - transport-level errors (`Timeout`, `Closed`, `Io`) are terminal:
//!   the loop exits and the error propagates, so the owner can release the
//!   transport and notify, never a silent hang
//! - framing and registry errors are transient: the bad frame is logged
//!   and discarded, and the next `step()` resynchronizes
//!
//! Cancellation is re-checked before every `step()`; a request arriving
//! mid-`step()` takes effect before the next one.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::engine::GnssEngine;
use crate::error::{GnssError, Result};
use crate::task::{OwnerId, TaskCategory, TaskId, TaskManager, TaskOutcome};

/// Drive the engine until the transport fails or the token fires.
///
/// Returns `Ok(())` on cancellation, `Err` with the terminal stream error
/// otherwise. Consumes the engine; the transport is released on exit.
pub async fn run_reader<R, W>(
    mut engine: GnssEngine<R, W>,
    token: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        if token.is_cancelled() {
            tracing::debug!("read loop cancelled");
            return Ok(());
        }
        match engine.step().await {
            Ok(()) => {}
            Err(error) if error.is_terminal() => {
                tracing::error!(%error, "read loop terminated");
                return Err(error);
            }
            Err(error) => {
                tracing::warn!(%error, "discarding malformed frame");
            }
        }
    }
}

/// Submit the read loop as a [`TaskCategory::READ_LOOP`] task.
///
/// `on_end` receives `Cancelled` if the owner tears the loop down, or the
/// terminal stream error when the transport dies.
pub fn spawn_reader<R, W, D>(
    manager: &TaskManager,
    owner: OwnerId,
    engine: GnssEngine<R, W>,
    on_end: D,
) -> TaskId
where
    R: AsyncRead + Send + Unpin + 'static,
    W: AsyncWrite + Send + Unpin + 'static,
    D: FnOnce(TaskOutcome<(), GnssError>) + Send + 'static,
{
    manager.submit(
        owner,
        TaskCategory::READ_LOOP,
        || {},
        move |token| run_reader(engine, token),
        on_end,
    )
}
