//! In-process simulated drivers for tests and CI.
//!
//! Every sim driver records the commands it receives so tests can assert on
//! actuator traffic, and the sensors replay scripted readings so tests can
//! stage obstacle approaches, flaky samples, and frozen gyros without any
//! physical hardware.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use stormbot_types::{BotError, Color};

use crate::actuators::{Actuators, Side};
use crate::sensors::{ColorSense, Gyro, Proximity, Touch};
use crate::speech::{SpeechOutput, StatusColor, StatusLights};

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// ────────────────────────────────────────────────────────────────────────────
// Actuator bank
// ────────────────────────────────────────────────────────────────────────────

/// One recorded actuator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorEvent {
    Drive(Side, i32),
    DriveOff(Side),
    AuxOn(i32),
    AuxOff,
}

/// Simulated actuator bank that records every command and tracks the current
/// power state of each motor.
#[derive(Default)]
pub struct SimActuators {
    events: Mutex<Vec<MotorEvent>>,
    left: Mutex<i32>,
    right: Mutex<i32>,
    aux: Mutex<i32>,
    fail_drive: AtomicBool,
}

impl SimActuators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `drive` calls fail with a hardware fault.
    pub fn set_drive_failing(&self, failing: bool) {
        self.fail_drive.store(failing, Ordering::SeqCst);
    }

    /// Every command received so far, in order.
    pub fn events(&self) -> Vec<MotorEvent> {
        lock(&self.events).clone()
    }

    /// `true` when every motor is currently unpowered.
    pub fn is_idle(&self) -> bool {
        *lock(&self.left) == 0 && *lock(&self.right) == 0 && *lock(&self.aux) == 0
    }
}

impl Actuators for SimActuators {
    fn drive(&self, side: Side, signed_speed: i32) -> Result<(), BotError> {
        if self.fail_drive.load(Ordering::SeqCst) {
            return Err(BotError::HardwareFault {
                component: "drive_motor".to_string(),
                details: "injected fault".to_string(),
            });
        }
        lock(&self.events).push(MotorEvent::Drive(side, signed_speed));
        match side {
            Side::Left => *lock(&self.left) = signed_speed,
            Side::Right => *lock(&self.right) = signed_speed,
        }
        Ok(())
    }

    fn drive_off(&self, side: Side) -> Result<(), BotError> {
        lock(&self.events).push(MotorEvent::DriveOff(side));
        match side {
            Side::Left => *lock(&self.left) = 0,
            Side::Right => *lock(&self.right) = 0,
        }
        Ok(())
    }

    fn aux_on(&self, speed: i32) -> Result<(), BotError> {
        lock(&self.events).push(MotorEvent::AuxOn(speed));
        *lock(&self.aux) = speed;
        Ok(())
    }

    fn aux_off(&self) -> Result<(), BotError> {
        lock(&self.events).push(MotorEvent::AuxOff);
        *lock(&self.aux) = 0;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sensors
// ────────────────────────────────────────────────────────────────────────────

/// Simulated proximity sensor replaying a script of samples.
///
/// Once the script is exhausted every further read returns the fallback
/// value, which tests can change mid-run to stage an approaching obstacle.
pub struct SimProximity {
    script: Mutex<VecDeque<Result<i32, BotError>>>,
    fallback: Mutex<i32>,
    reads: AtomicUsize,
}

impl SimProximity {
    /// Sensor that always reads `value`.
    pub fn fixed(value: i32) -> Self {
        Self::scripted(Vec::new(), value)
    }

    /// Sensor that replays `samples` first, then reads `fallback` forever.
    pub fn scripted(samples: Vec<Result<i32, BotError>>, fallback: i32) -> Self {
        Self {
            script: Mutex::new(samples.into()),
            fallback: Mutex::new(fallback),
            reads: AtomicUsize::new(0),
        }
    }

    /// A failing sample for scripts.
    pub fn bad_sample() -> Result<i32, BotError> {
        Err(BotError::SensorRead {
            sensor: "ir".to_string(),
            details: "no reading".to_string(),
        })
    }

    pub fn set_fallback(&self, value: i32) {
        *lock(&self.fallback) = value;
    }

    /// Number of raw samples taken so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl Proximity for SimProximity {
    fn read_proximity(&self) -> Result<i32, BotError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        match lock(&self.script).pop_front() {
            Some(sample) => sample,
            None => Ok(*lock(&self.fallback)),
        }
    }
}

/// Simulated color sensor.
pub struct SimColor {
    color: Mutex<Color>,
    failing: AtomicBool,
}

impl SimColor {
    pub fn fixed(color: Color) -> Self {
        Self {
            color: Mutex::new(color),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_color(&self, color: Color) {
        *lock(&self.color) = color;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl ColorSense for SimColor {
    fn read_color(&self) -> Result<Color, BotError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BotError::SensorRead {
                sensor: "color".to_string(),
                details: "no reading".to_string(),
            });
        }
        Ok(*lock(&self.color))
    }
}

/// Simulated gyro replaying a script of angles; once exhausted it repeats the
/// last angle forever, so a frozen gyro is just a one-element script.
pub struct SimGyro {
    script: Mutex<VecDeque<i32>>,
    last: Mutex<i32>,
    rate: Mutex<i32>,
}

impl SimGyro {
    pub fn fixed(angle: i32) -> Self {
        Self::scripted(vec![angle])
    }

    pub fn scripted(angles: Vec<i32>) -> Self {
        let last = angles.first().copied().unwrap_or(0);
        Self {
            script: Mutex::new(angles.into()),
            last: Mutex::new(last),
            rate: Mutex::new(0),
        }
    }
}

impl Gyro for SimGyro {
    fn read_orientation_angle(&self) -> Result<i32, BotError> {
        match lock(&self.script).pop_front() {
            Some(angle) => {
                *lock(&self.last) = angle;
                Ok(angle)
            }
            None => Ok(*lock(&self.last)),
        }
    }

    fn read_rotation_rate(&self) -> Result<i32, BotError> {
        Ok(*lock(&self.rate))
    }
}

/// Simulated touch sensor.
#[derive(Default)]
pub struct SimTouch {
    pressed: AtomicBool,
}

impl SimTouch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pressed(&self, pressed: bool) {
        self.pressed.store(pressed, Ordering::SeqCst);
    }
}

impl Touch for SimTouch {
    fn is_pressed(&self) -> bool {
        self.pressed.load(Ordering::SeqCst)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Speech and lights
// ────────────────────────────────────────────────────────────────────────────

/// Records announced phrases instead of speaking them.
#[derive(Default)]
pub struct RecordingSpeech {
    phrases: Mutex<Vec<String>>,
}

impl RecordingSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phrases(&self) -> Vec<String> {
        lock(&self.phrases).clone()
    }
}

impl SpeechOutput for RecordingSpeech {
    fn announce(&self, text: &str) -> Result<(), BotError> {
        lock(&self.phrases).push(text.to_string());
        Ok(())
    }
}

/// Records status-light transitions.
#[derive(Default)]
pub struct RecordingLights {
    transitions: Mutex<Vec<(Side, StatusColor)>>,
}

impl RecordingLights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transitions(&self) -> Vec<(Side, StatusColor)> {
        lock(&self.transitions).clone()
    }
}

impl StatusLights for RecordingLights {
    fn set_status(&self, side: Side, color: StatusColor) -> Result<(), BotError> {
        lock(&self.transitions).push((side, color));
        Ok(())
    }
}
