//! [`ObstacleMonitor`] – independent watchdog over the proximity sensor.
//!
//! Polls the sensor cache continuously and, when something gets inside the
//! obstacle distance, preempts whichever producer is idle: motors are stopped
//! first, then an obstacle-specific decision is requested, validated, and
//! executed, all under the busy gate. A cooldown keeps the watchdog from
//! re-triggering while the robot is still near the obstacle during its own
//! reaction sequence.
//!
//! Producers reuse [`ObstacleMonitor::try_react`] for their safety-distance
//! redirect, so the gate and cooldown conditions hold on that path too.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::engine::DecisionEngine;

/// Minimum spacing between two obstacle reactions.
pub const OBSTACLE_COOLDOWN: Duration = Duration::from_secs(10);

/// Watchdog poll cadence.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Preempting watchdog for close obstacles.
pub struct ObstacleMonitor {
    engine: Arc<DecisionEngine>,
    cooldown: Duration,
    last_trigger: Mutex<Option<Instant>>,
}

impl ObstacleMonitor {
    pub fn new(engine: Arc<DecisionEngine>) -> Self {
        Self {
            engine,
            cooldown: OBSTACLE_COOLDOWN,
            last_trigger: Mutex::new(None),
        }
    }

    /// Override the cooldown (tests).
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Continuous watch loop; runs until `shutdown` is set.
    pub async fn run(self: Arc<Self>, shutdown: Arc<AtomicBool>) {
        info!("obstacle watchdog running");
        while !shutdown.load(Ordering::SeqCst) {
            let distance = self.engine.cache().read_distance().await;
            if distance < self.engine.limits().obstacle_distance {
                self.try_react().await;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        debug!("obstacle watchdog stopped");
    }

    /// Attempt one obstacle reaction. Returns `false` without touching the
    /// actuators when the cooldown is still running or another producer holds
    /// the gate; otherwise stops the motors, runs the obstacle decision path,
    /// records the trigger time, and releases the gate.
    pub async fn try_react(&self) -> bool {
        if self.in_cooldown() {
            debug!("obstacle reaction suppressed by cooldown");
            return false;
        }
        let Some(_guard) = self.engine.gate().acquire_guard() else {
            return false;
        };

        let executor = self.engine.executor();
        executor.all_stop();

        let snapshot = self.engine.cache().snapshot().await;
        warn!(
            distance = snapshot.ir_distance,
            "obstacle detected, requesting reaction"
        );

        let sequence = self.engine.obstacle_decision(snapshot.ir_distance).await;
        executor.execute(&sequence).await;

        *self.lock_last_trigger() = Some(Instant::now());
        true
    }

    fn in_cooldown(&self) -> bool {
        self.lock_last_trigger()
            .is_some_and(|t| t.elapsed() <= self.cooldown)
    }

    fn lock_last_trigger(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        self.last_trigger.lock().unwrap_or_else(|e| e.into_inner())
    }
}
