//! Input sampling loop that drives one warp engine.
//!
//! `spawn_input_loop` starts a single thread (`gazewarp-input`) that owns the
//! engine. Pointer samples and fixations arrive through a bounded channel, every
//! warp is forwarded to the caller right away, and `InputLoop::stop` joins the
//! thread and hands back all decisions of the session.
//!
//! `replay_events` pushes a recorded events file through the same
//! `apply_event` function without a thread.

use std::sync::mpsc::{sync_channel, Sender, SyncSender, TrySendError};
use std::thread::JoinHandle;

use crate::algorithm::mouse_warp::{WarpConfig, WarpDecision, WarpEngine};
use crate::error::{Error, Result};
use crate::models::events::{EventsFile, InputEvent, SCHEMA_VERSION};
use crate::models::geometry::Point2D;

const CHANNEL_CAPACITY: usize = 8192;

/// Raw input passed from the sampling source to the loop thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawInput {
    Move { ts_ms: i64, x: f64, y: f64 },
    Fixation { ts_ms: i64, x: f64, y: f64 },
    Reset { ts_ms: i64 },
    /// Ends the loop; the thread returns its decisions.
    Stop,
}

impl RawInput {
    fn into_event(self) -> Option<InputEvent> {
        match self {
            RawInput::Move { ts_ms, x, y } => Some(InputEvent::Move { ts: ts_ms, x, y }),
            RawInput::Fixation { ts_ms, x, y } => Some(InputEvent::Fixation { ts: ts_ms, x, y }),
            RawInput::Reset { ts_ms } => Some(InputEvent::Reset { ts: ts_ms }),
            RawInput::Stop => None,
        }
    }
}

/// Feeds one recorded or live event to the engine.
pub fn apply_event(engine: &mut WarpEngine, event: &InputEvent) -> Option<WarpDecision> {
    match *event {
        InputEvent::Move { ts, x, y } => engine.add_sample(ts, Point2D::new(x, y)),
        InputEvent::Fixation { ts, x, y } => {
            log::trace!("input_loop: fixation ts={ts} at ({x:.1}, {y:.1})");
            engine.set_fixation(Point2D::new(x, y));
            None
        }
        InputEvent::Reset { ts } => {
            log::debug!("input_loop: reset ts={ts}");
            engine.reset();
            None
        }
    }
}

/// Replays a recorded events file and returns every warp it triggers.
pub fn replay_events(file: &EventsFile, config: WarpConfig) -> Result<Vec<WarpDecision>> {
    if file.schema_version != SCHEMA_VERSION {
        return Err(Error::UnsupportedSchema {
            path: file.recording_id.clone(),
            expected: SCHEMA_VERSION,
            got: file.schema_version,
        });
    }

    let mut engine = WarpEngine::new(config)?;
    let decisions: Vec<WarpDecision> = file
        .events
        .iter()
        .filter_map(|event| apply_event(&mut engine, event))
        .collect();

    log::info!(
        "replay_events: recording_id={} events={} warps={}",
        file.recording_id,
        file.events.len(),
        decisions.len()
    );
    Ok(decisions)
}

/// Handle to a running input loop.
pub struct InputLoop {
    tx: SyncSender<RawInput>,
    handle: JoinHandle<Vec<WarpDecision>>,
}

impl InputLoop {
    /// Sender for additional producers.
    pub fn sender(&self) -> SyncSender<RawInput> {
        self.tx.clone()
    }

    /// Queues one input; drops it when the loop is saturated or gone.
    pub fn send(&self, input: RawInput) -> bool {
        match self.tx.try_send(input) {
            Ok(()) => true,
            Err(TrySendError::Full(input)) => {
                log::warn!("input_loop: channel full, dropping {input:?}");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Stops the loop and returns every decision it made.
    pub fn stop(self) -> Vec<WarpDecision> {
        self.tx.send(RawInput::Stop).ok();
        match self.handle.join() {
            Ok(decisions) => decisions,
            Err(_) => {
                log::error!("input_loop: processor thread panicked");
                Vec::new()
            }
        }
    }
}

/// Starts the loop thread. Each decision is also sent to `decisions` when given.
pub fn spawn_input_loop(
    config: WarpConfig,
    decisions: Option<Sender<WarpDecision>>,
) -> Result<InputLoop> {
    let mut engine = WarpEngine::new(config)?;
    let (tx, rx) = sync_channel::<RawInput>(CHANNEL_CAPACITY);

    let handle = std::thread::Builder::new()
        .name("gazewarp-input".to_string())
        .spawn(move || {
            let mut made = Vec::<WarpDecision>::new();

            for raw in rx {
                let Some(event) = raw.into_event() else {
                    break;
                };
                if let Some(decision) = apply_event(&mut engine, &event) {
                    if let Some(out) = decisions.as_ref() {
                        out.send(decision).ok();
                    }
                    made.push(decision);
                }
            }

            log::info!("input_loop: stopped after {} warps", made.len());
            made
        })?;

    Ok(InputLoop { tx, handle })
}
