//! Shared data model for the Stormbot stack.
//!
//! Everything that crosses a crate boundary lives here: the strict
//! [`ActionCommand`] type that the validator produces, the [`SensorSnapshot`]
//! value captured by the sensor cache, the [`Color`] palette reported by the
//! color sensor, and the [`BotError`] taxonomy.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod limits;

pub use limits::Limits;

/// Closed palette reported by the color sensor.
///
/// [`Color::from_token`] maps the raw driver token to a variant; anything the
/// driver reports outside the palette collapses to [`Color::NoColor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Color {
    #[default]
    NoColor,
    Black,
    Blue,
    Green,
    Yellow,
    Red,
    White,
    Brown,
}

impl Color {
    /// Parse the raw token the color driver reports.
    pub fn from_token(token: &str) -> Self {
        match token {
            "Black" => Color::Black,
            "Blue" => Color::Blue,
            "Green" => Color::Green,
            "Yellow" => Color::Yellow,
            "Red" => Color::Red,
            "White" => Color::White,
            "Brown" => Color::Brown,
            _ => Color::NoColor,
        }
    }

    /// Human-readable description used when building oracle prompts.
    pub fn description(&self) -> &'static str {
        match self {
            Color::NoColor => "no color",
            Color::Black => "black",
            Color::Blue => "blue",
            Color::Green => "green",
            Color::Yellow => "yellow",
            Color::Red => "red",
            Color::White => "white",
            Color::Brown => "brown",
        }
    }
}

/// The closed set of primitives the oracle is allowed to request.
///
/// Raw `action` strings outside this set are coerced to [`ActionKind::Speak`]
/// by the validator rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    MoveForward,
    MoveBackward,
    TurnLeft,
    TurnRight,
    Attack,
    Speak,
    Stop,
}

impl ActionKind {
    /// Parse the wire token (`"move_forward"`, `"turn_left"`, …).
    ///
    /// Returns `None` for unknown tokens so the validator can apply its
    /// coercion policy.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "move_forward" => Some(ActionKind::MoveForward),
            "move_backward" => Some(ActionKind::MoveBackward),
            "turn_left" => Some(ActionKind::TurnLeft),
            "turn_right" => Some(ActionKind::TurnRight),
            "attack" => Some(ActionKind::Attack),
            "speak" => Some(ActionKind::Speak),
            "stop" => Some(ActionKind::Stop),
            _ => None,
        }
    }

    /// Wire token for this kind.
    pub fn as_token(&self) -> &'static str {
        match self {
            ActionKind::MoveForward => "move_forward",
            ActionKind::MoveBackward => "move_backward",
            ActionKind::TurnLeft => "turn_left",
            ActionKind::TurnRight => "turn_right",
            ActionKind::Attack => "attack",
            ActionKind::Speak => "speak",
            ActionKind::Stop => "stop",
        }
    }
}

/// One fully-validated actuator command.
///
/// Downstream code may rely on every field being populated and within its
/// clamp range: the validator never emits a partially-specified command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCommand {
    #[serde(rename = "action")]
    pub kind: ActionKind,
    /// Motor speed, 0–100.
    pub speed: i32,
    /// Seconds, 0.1–`max_move_duration`.
    pub duration: f64,
    /// Degrees, 0–`max_turn_angle`.
    pub angle: i32,
    /// Text to announce before the motion; may be empty.
    pub speech: String,
}

/// Ordered, length-bounded list of validated commands.
///
/// Order is execution order. An empty sequence is a no-op.
pub type ActionSequence = Vec<ActionCommand>;

/// Context tag attached to every oracle request.
///
/// The validator keys its default table off this tag, and the prompt builder
/// uses it to pick the framing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionContext {
    Autonomous,
    Button,
    Terminal,
    Obstacle,
}

impl DecisionContext {
    pub fn as_tag(&self) -> &'static str {
        match self {
            DecisionContext::Autonomous => "autonomous",
            DecisionContext::Button => "button",
            DecisionContext::Terminal => "terminal",
            DecisionContext::Obstacle => "obstacle",
        }
    }
}

/// Immutable view of the sensors at one instant.
///
/// Produced by the sensor cache on refresh; consumers never mutate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorSnapshot {
    /// Proximity reading, clamped to 0–100.
    pub ir_distance: u8,
    pub color: Color,
    pub buttons_pressed: bool,
    /// Present iff a gyro is configured.
    pub gyro_angle: Option<i32>,
    /// Present iff a gyro is configured.
    pub gyro_rate: Option<i32>,
    pub captured_at: DateTime<Local>,
    /// Derived: `ir_distance < obstacle_distance`.
    pub obstacle_detected: bool,
}

impl SensorSnapshot {
    /// Local wall-clock time formatted for the oracle prompt.
    pub fn time_of_day(&self) -> String {
        self.captured_at.format("%H:%M").to_string()
    }
}

/// Error taxonomy spanning sensor reads, the oracle, and the actuators.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum BotError {
    #[error("sensor read failed on {sensor}: {details}")]
    SensorRead { sensor: String, details: String },

    #[error("oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("malformed oracle response: {0}")]
    MalformedResponse(String),

    #[error("hardware fault on {component}: {details}")]
    HardwareFault { component: String, details: String },
}
