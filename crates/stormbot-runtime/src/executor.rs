//! [`Executor`] – runs a validated command sequence against the actuators.
//!
//! Callers must already hold the busy gate. Every motion primitive is bounded
//! by an explicit duration or timeout ceiling, and every branch — success,
//! hardware fault, obstacle abort, shutdown — ends with the motors unpowered
//! before control returns. A hardware fault aborts only the current command;
//! the rest of the sequence still runs.
//!
//! Forward motion re-checks the obstacle condition every control tick and
//! aborts the remaining sequence early, handing the situation to the obstacle
//! watchdog. Reverse motion does not: backing away from whatever is in front
//! is itself the safe direction.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use stormbot_hal::{Actuators, Side, SpeechOutput, StatusColor, StatusLights};
use stormbot_perception::SensorCache;
use stormbot_types::{ActionCommand, ActionKind, BotError, Limits};

/// Cadence of the obstacle re-check during forward motion.
const CONTROL_TICK: Duration = Duration::from_millis(100);

/// Cadence of the gyro poll during closed-loop turns.
const TURN_POLL: Duration = Duration::from_millis(10);

/// Pause inserted between sequence elements (not after the last).
const INTER_COMMAND_PAUSE: Duration = Duration::from_millis(500);

/// Open-loop fallback: seconds of differential drive per 90° of turn.
const OPEN_LOOP_UNIT: f64 = 0.8;

/// How one sequence run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceOutcome {
    /// Every command ran.
    Completed,
    /// Forward motion found an obstacle; the remaining commands were dropped
    /// so the obstacle watchdog can take over.
    ObstacleAbort,
    /// The global shutdown signal fired mid-sequence.
    ShutdownAbort,
}

enum StepOutcome {
    Done,
    ObstacleAbort,
    ShutdownAbort,
}

/// Drives the actuator bank, one validated command at a time.
pub struct Executor {
    actuators: Arc<dyn Actuators>,
    speech: Arc<dyn SpeechOutput>,
    lights: Arc<dyn StatusLights>,
    cache: Arc<SensorCache>,
    limits: Limits,
    shutdown: Arc<AtomicBool>,
}

impl Executor {
    pub fn new(
        actuators: Arc<dyn Actuators>,
        speech: Arc<dyn SpeechOutput>,
        lights: Arc<dyn StatusLights>,
        cache: Arc<SensorCache>,
        limits: Limits,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            actuators,
            speech,
            lights,
            cache,
            limits,
            shutdown,
        }
    }

    /// Immediately command every motor to idle.
    pub fn all_stop(&self) {
        info!("stopping all motors");
        self.actuators.all_off();
    }

    /// Fire-and-forget speech; failures are logged, never propagated.
    pub fn announce(&self, text: &str) {
        if let Err(e) = self.speech.announce(text) {
            warn!(error = %e, "speech output failed");
        }
    }

    /// Fire-and-forget status lights; failures are logged, never propagated.
    pub fn set_lights(&self, color: StatusColor) {
        for side in [Side::Left, Side::Right] {
            if let Err(e) = self.lights.set_status(side, color) {
                warn!(error = %e, "status light failed");
            }
        }
    }

    /// Run `sequence` in order. The caller must hold the busy gate.
    pub async fn execute(&self, sequence: &[ActionCommand]) -> SequenceOutcome {
        info!(actions = sequence.len(), "executing action sequence");

        for (index, command) in sequence.iter().enumerate() {
            if self.shutdown.load(Ordering::SeqCst) {
                self.all_stop();
                return SequenceOutcome::ShutdownAbort;
            }

            debug!(
                step = index + 1,
                total = sequence.len(),
                kind = command.kind.as_token(),
                "running action"
            );

            if !command.speech.is_empty() {
                self.announce(&command.speech);
            }

            match self.dispatch(command).await {
                Ok(StepOutcome::Done) => {}
                Ok(StepOutcome::ObstacleAbort) => {
                    info!(
                        dropped = sequence.len() - index - 1,
                        "sequence aborted for obstacle reaction"
                    );
                    return SequenceOutcome::ObstacleAbort;
                }
                Ok(StepOutcome::ShutdownAbort) => return SequenceOutcome::ShutdownAbort,
                Err(e) => {
                    warn!(error = %e, "action failed, forcing motors idle");
                    self.actuators.all_off();
                }
            }

            if index + 1 < sequence.len() && self.pause(INTER_COMMAND_PAUSE).await {
                self.all_stop();
                return SequenceOutcome::ShutdownAbort;
            }
        }

        SequenceOutcome::Completed
    }

    async fn dispatch(&self, command: &ActionCommand) -> Result<StepOutcome, BotError> {
        match command.kind {
            ActionKind::MoveForward => self.move_forward(command.speed, command.duration).await,
            ActionKind::MoveBackward => self.move_backward(command.speed, command.duration).await,
            ActionKind::TurnLeft => self.turn(Turn::Left, command.speed, command.angle).await,
            ActionKind::TurnRight => self.turn(Turn::Right, command.speed, command.angle).await,
            ActionKind::Attack => self.attack(command.speed, command.duration).await,
            ActionKind::Stop => {
                self.all_stop();
                Ok(StepOutcome::Done)
            }
            // Any speech was already issued above.
            ActionKind::Speak => Ok(StepOutcome::Done),
        }
    }

    async fn move_forward(&self, speed: i32, duration: f64) -> Result<StepOutcome, BotError> {
        let speed = speed.min(self.limits.max_motor_speed);
        let total = Duration::from_secs_f64(duration.min(self.limits.max_move_duration));
        info!(speed, ?total, "moving forward");

        let start = Instant::now();
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                self.actuators.all_off();
                return Ok(StepOutcome::ShutdownAbort);
            }
            if self.cache.read_distance().await < self.limits.obstacle_distance {
                info!("obstacle became imminent, aborting forward motion");
                self.actuators.all_off();
                return Ok(StepOutcome::ObstacleAbort);
            }
            let elapsed = start.elapsed();
            if elapsed >= total {
                break;
            }
            self.actuators.drive(Side::Left, speed)?;
            self.actuators.drive(Side::Right, speed)?;
            tokio::time::sleep(CONTROL_TICK.min(total - elapsed)).await;
        }

        self.actuators.all_off();
        Ok(StepOutcome::Done)
    }

    async fn move_backward(&self, speed: i32, duration: f64) -> Result<StepOutcome, BotError> {
        let speed = speed.min(self.limits.max_motor_speed);
        let total = Duration::from_secs_f64(duration.min(self.limits.max_move_duration));
        info!(speed, ?total, "moving backward");

        self.actuators.drive(Side::Left, -speed)?;
        self.actuators.drive(Side::Right, -speed)?;
        let interrupted = self.pause(total).await;
        self.actuators.all_off();

        Ok(if interrupted {
            StepOutcome::ShutdownAbort
        } else {
            StepOutcome::Done
        })
    }

    async fn turn(&self, direction: Turn, speed: i32, angle: i32) -> Result<StepOutcome, BotError> {
        let speed = speed.min(self.limits.max_motor_speed);
        let angle = angle.min(self.limits.max_turn_angle);
        let (left, right) = match direction {
            Turn::Left => (-speed, speed),
            Turn::Right => (speed, -speed),
        };
        info!(?direction, speed, angle, "turning");

        match self.cache.read_gyro_angle().await {
            Some(initial) => {
                let target = match direction {
                    Turn::Left => initial - angle,
                    Turn::Right => initial + angle,
                };
                self.actuators.drive(Side::Left, left)?;
                self.actuators.drive(Side::Right, right)?;

                let ceiling = Duration::from_secs_f64(self.limits.max_turn_duration);
                let start = Instant::now();
                let mut interrupted = false;
                loop {
                    if self.shutdown.load(Ordering::SeqCst) {
                        interrupted = true;
                        break;
                    }
                    if let Some(current) = self.cache.read_gyro_angle().await {
                        let reached = match direction {
                            Turn::Left => current <= target,
                            Turn::Right => current >= target,
                        };
                        if reached {
                            break;
                        }
                    }
                    if start.elapsed() >= ceiling {
                        warn!(angle, "turn timed out before reaching target angle");
                        break;
                    }
                    tokio::time::sleep(TURN_POLL).await;
                }

                self.actuators.all_off();
                Ok(if interrupted {
                    StepOutcome::ShutdownAbort
                } else {
                    StepOutcome::Done
                })
            }
            None => {
                // No orientation feedback: timed open-loop turn.
                self.actuators.drive(Side::Left, left)?;
                self.actuators.drive(Side::Right, right)?;
                let timed = Duration::from_secs_f64(f64::from(angle) / 90.0 * OPEN_LOOP_UNIT);
                let interrupted = self.pause(timed).await;
                self.actuators.all_off();
                Ok(if interrupted {
                    StepOutcome::ShutdownAbort
                } else {
                    StepOutcome::Done
                })
            }
        }
    }

    async fn attack(&self, speed: i32, duration: f64) -> Result<StepOutcome, BotError> {
        let speed = speed.min(self.limits.max_blade_speed);
        let total = Duration::from_secs_f64(duration.min(self.limits.max_attack_duration));
        info!(speed, ?total, "engaging blade");

        self.set_lights(StatusColor::Red);
        self.actuators.aux_on(speed)?;
        let interrupted = self.pause(total).await;
        self.actuators.aux_off()?;
        self.set_lights(StatusColor::Amber);

        Ok(if interrupted {
            StepOutcome::ShutdownAbort
        } else {
            StepOutcome::Done
        })
    }

    /// Sleep for `total`, waking early on shutdown. Returns `true` when the
    /// shutdown signal fired.
    async fn pause(&self, total: Duration) -> bool {
        let start = Instant::now();
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                return true;
            }
            let elapsed = start.elapsed();
            if elapsed >= total {
                return false;
            }
            tokio::time::sleep(CONTROL_TICK.min(total - elapsed)).await;
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Turn {
    Left,
    Right,
}
