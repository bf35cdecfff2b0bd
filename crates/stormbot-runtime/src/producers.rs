//! The three decision producers.
//!
//! Independent polling loops that all funnel through
//! [`DecisionEngine::run_cycle`]: the autonomous scheduler fires on a
//! randomized timer, the command-queue processor consumes lines typed at the
//! terminal, and the button dispatcher reacts to the touch sensor. None of
//! them ever blocks on the busy gate — a busy cycle is skipped (or, for
//! queued commands, retried shortly) so the loop stays live for obstacle and
//! shutdown checks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use stormbot_types::DecisionContext;

use crate::engine::{CycleOutcome, DecisionEngine};
use crate::obstacle::ObstacleMonitor;
use crate::prompt;

/// Cadence of the touch-sensor poll and the idle queue poll.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Quiet period after a handled button press.
const BUTTON_DEBOUNCE: Duration = Duration::from_millis(500);

/// Retry spacing while a queued command waits for the gate.
const BUSY_RETRY: Duration = Duration::from_millis(100);

/// Fixed cue sent to the oracle when the button is pressed.
const BUTTON_PROMPT: &str = "React to the button press";

/// Timer-driven autonomous behavior. Waits a random interval between the
/// configured bounds, then runs one decision cycle with a randomly chosen
/// topic, so the robot acts on its own without dominating the actuators.
pub async fn run_autonomous_scheduler(
    engine: Arc<DecisionEngine>,
    monitor: Arc<ObstacleMonitor>,
    shutdown: Arc<AtomicBool>,
) {
    info!("autonomous scheduler running");
    while !shutdown.load(Ordering::SeqCst) {
        let (interval, topic) = {
            let mut rng = rand::rng();
            let min = engine.limits().autonomous_interval_min;
            let max = engine.limits().autonomous_interval_max.max(min);
            (
                Duration::from_secs(rng.random_range(min..=max)),
                prompt::random_autonomous_prompt(),
            )
        };
        debug!(?interval, "next autonomous cycle scheduled");
        if sleep_unless_shutdown(interval, &shutdown).await {
            break;
        }

        let outcome = engine
            .run_cycle(&monitor, DecisionContext::Autonomous, topic)
            .await;
        debug!(?outcome, "autonomous cycle finished");
    }
    debug!("autonomous scheduler stopped");
}

/// Consumes queued terminal commands one at a time, in arrival order.
///
/// A command that finds the actuators busy is retried shortly instead of
/// being dropped; every other outcome consumes the command.
pub async fn run_command_queue(
    engine: Arc<DecisionEngine>,
    monitor: Arc<ObstacleMonitor>,
    mut commands: mpsc::UnboundedReceiver<String>,
    shutdown: Arc<AtomicBool>,
) {
    info!("command queue processor running");
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        let line = match tokio::time::timeout(POLL_INTERVAL, commands.recv()).await {
            Err(_) => continue,
            Ok(None) => break,
            Ok(Some(line)) => line,
        };

        info!(command = %line, "processing queued command");
        let mut outcome = engine
            .run_cycle(&monitor, DecisionContext::Terminal, &line)
            .await;
        while outcome == CycleOutcome::SkippedBusy && !shutdown.load(Ordering::SeqCst) {
            tokio::time::sleep(BUSY_RETRY).await;
            outcome = engine
                .run_cycle(&monitor, DecisionContext::Terminal, &line)
                .await;
        }
        debug!(?outcome, "command cycle finished");
    }
    debug!("command queue processor stopped");
}

/// Polls the touch sensor and turns presses into decision cycles.
pub async fn run_button_dispatcher(
    engine: Arc<DecisionEngine>,
    monitor: Arc<ObstacleMonitor>,
    shutdown: Arc<AtomicBool>,
) {
    info!("button dispatcher running");
    while !shutdown.load(Ordering::SeqCst) {
        if engine.cache().is_pressed() {
            info!("button pressed");
            let outcome = engine
                .run_cycle(&monitor, DecisionContext::Button, BUTTON_PROMPT)
                .await;
            debug!(?outcome, "button cycle finished");
            if sleep_unless_shutdown(BUTTON_DEBOUNCE, &shutdown).await {
                break;
            }
        }
        if sleep_unless_shutdown(POLL_INTERVAL, &shutdown).await {
            break;
        }
    }
    debug!("button dispatcher stopped");
}

/// Sleep for `total`, waking early when `shutdown` fires. Returns `true` if
/// it did.
pub async fn sleep_unless_shutdown(total: Duration, shutdown: &AtomicBool) -> bool {
    const SLICE: Duration = Duration::from_millis(250);
    let start = Instant::now();
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return true;
        }
        let elapsed = start.elapsed();
        if elapsed >= total {
            return false;
        }
        tokio::time::sleep(SLICE.min(total - elapsed)).await;
    }
}
