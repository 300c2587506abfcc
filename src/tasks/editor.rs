use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PreviewOptions;
use crate::events::{DisplayFrame, EditorCommand, RenderRequest, RenderedFrame};
use crate::processing::preview;
use crate::session::{Session, decode, encode_png};

/// Owns the [`Session`] and serialises every command against it.
///
/// Loads and parameter changes are forwarded to the render worker as they
/// arrive. Commands that read the working raster (snapshot, undo, redo, export,
/// history queries) wait until the latest render has landed, then run in the
/// order they were received. Each accepted render is scaled for display and
/// published on `to_display`, which only ever holds the newest frame.
pub async fn run(
    mut commands: Receiver<EditorCommand>,
    to_renderer: Sender<RenderRequest>,
    mut rendered: Receiver<RenderedFrame>,
    to_display: watch::Sender<Option<DisplayFrame>>,
    cancel: CancellationToken,
    mut session: Session,
    mut preview_options: PreviewOptions,
) -> Result<()> {
    let mut deferred: VecDeque<EditorCommand> = VecDeque::new();
    let mut commands_open = true;

    loop {
        select! {
            _ = cancel.cancelled() => break,

            maybe_command = commands.recv(), if commands_open => {
                let Some(command) = maybe_command else {
                    commands_open = false;
                    if session.is_settled() {
                        break;
                    }
                    continue;
                };
                if reads_working(&command) && (!session.is_settled() || !deferred.is_empty()) {
                    debug!("deferring command until render lands");
                    deferred.push_back(command);
                    continue;
                }
                if !handle(command, &mut session, &mut preview_options, &to_renderer, &to_display).await? {
                    break;
                }
            }

            maybe_frame = rendered.recv() => {
                let Some(frame) = maybe_frame else {
                    debug!("render worker stopped");
                    break;
                };
                if !session.accept_render(frame) {
                    continue;
                }
                publish(&session, &preview_options, &to_display).await?;
                while session.is_settled() {
                    let Some(command) = deferred.pop_front() else {
                        break;
                    };
                    if !handle(command, &mut session, &mut preview_options, &to_renderer, &to_display).await? {
                        return Ok(());
                    }
                }
                if !commands_open && session.is_settled() && deferred.is_empty() {
                    break;
                }
            }
        }
    }

    if !deferred.is_empty() {
        warn!(count = deferred.len(), "editor stopped with deferred commands");
    }
    Ok(())
}

fn reads_working(command: &EditorCommand) -> bool {
    matches!(
        command,
        EditorCommand::Snapshot
            | EditorCommand::Undo
            | EditorCommand::Redo
            | EditorCommand::Export { .. }
            | EditorCommand::QueryHistory { .. }
    )
}

/// Returns `false` once the render worker is gone.
async fn handle(
    command: EditorCommand,
    session: &mut Session,
    preview_options: &mut PreviewOptions,
    to_renderer: &Sender<RenderRequest>,
    to_display: &watch::Sender<Option<DisplayFrame>>,
) -> Result<bool> {
    match command {
        EditorCommand::LoadImage(image) => {
            let request = session.stage_load(image);
            return Ok(to_renderer.send(request).await.is_ok());
        }
        EditorCommand::LoadEncoded { bytes, reply } => {
            let decoded = tokio::task::spawn_blocking(move || decode(&bytes)).await?;
            match decoded {
                Ok(image) => {
                    let request = session.stage_load(image);
                    let _ = reply.send(Ok(()));
                    return Ok(to_renderer.send(request).await.is_ok());
                }
                Err(err) => {
                    warn!("failed to decode image: {err}");
                    let _ = reply.send(Err(err));
                }
            }
        }
        EditorCommand::SetParameters(update) => {
            if let Some(request) = session.stage_parameters(&update) {
                return Ok(to_renderer.send(request).await.is_ok());
            }
            debug!("parameters stored; no image loaded");
        }
        EditorCommand::SetPreview(options) => {
            *preview_options = options;
            if session.is_settled() {
                publish(session, preview_options, to_display).await?;
            }
        }
        EditorCommand::Snapshot => {
            if !session.snapshot() {
                debug!("snapshot ignored; nothing rendered");
            }
        }
        EditorCommand::Undo => {
            if session.undo().is_some() {
                publish(session, preview_options, to_display).await?;
            }
        }
        EditorCommand::Redo => {
            if session.redo().is_some() {
                publish(session, preview_options, to_display).await?;
            }
        }
        EditorCommand::Export { reply } => {
            let result = match session.working() {
                Some(working) => {
                    let working = Arc::clone(working);
                    tokio::task::spawn_blocking(move || encode_png(&working)).await?
                }
                None => session.export_png(),
            };
            if let Ok(bytes) = &result {
                info!(bytes = bytes.len(), "exported working image");
            }
            let _ = reply.send(result);
        }
        EditorCommand::QueryHistory { reply } => {
            let _ = reply.send(session.history_status());
        }
    }
    Ok(true)
}

async fn publish(
    session: &Session,
    options: &PreviewOptions,
    to_display: &watch::Sender<Option<DisplayFrame>>,
) -> Result<()> {
    let Some(working) = session.working() else {
        return Ok(());
    };
    let working = Arc::clone(working);
    let options = *options;
    let generation = session.generation();
    let scaled = tokio::task::spawn_blocking(move || preview::scale(&working, &options)).await?;
    match scaled {
        Ok(frame) => {
            debug!(
                generation,
                width = frame.width(),
                height = frame.height(),
                "display frame ready"
            );
            to_display.send_replace(Some(DisplayFrame {
                generation,
                frame: Arc::new(frame),
            }));
        }
        Err(err) => warn!("failed to scale preview: {err}"),
    }
    Ok(())
}
