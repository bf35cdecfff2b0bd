//! Repair-never-reject validation of oracle decisions.
//!
//! [`validate`] is a total function: whatever shape the oracle produced — a
//! single object, an over-long array, wrong-typed fields, unknown action
//! names — it returns a bounded [`ActionSequence`] with every field populated
//! and inside its clamp range. Missing or malformed fields are filled from a
//! per-context default table, never surfaced as errors.

use serde_json::Value;
use tracing::debug;

use stormbot_types::{ActionCommand, ActionKind, ActionSequence, DecisionContext, Limits};

/// Spoken acknowledgment substituted when the oracle invents an action kind.
const UNKNOWN_ACTION_ACK: &str = "Hmm, curious command...";

/// Default field values for one decision context.
#[derive(Debug, Clone, Copy)]
pub struct ContextDefaults {
    pub kind: ActionKind,
    pub speed: i32,
    pub duration: f64,
    pub angle: i32,
}

/// General-path defaults (autonomous, button, terminal).
const GENERAL_DEFAULTS: ContextDefaults = ContextDefaults {
    kind: ActionKind::Speak,
    speed: 50,
    duration: 1.0,
    angle: 90,
};

/// Obstacle-path defaults. Kept as a separate table: the obstacle path has
/// always reacted at a gentler default speed.
const OBSTACLE_DEFAULTS: ContextDefaults = ContextDefaults {
    kind: ActionKind::Speak,
    speed: 40,
    duration: 1.0,
    angle: 90,
};

/// Default table for `context`.
pub fn defaults_for(context: DecisionContext) -> &'static ContextDefaults {
    match context {
        DecisionContext::Obstacle => &OBSTACLE_DEFAULTS,
        _ => &GENERAL_DEFAULTS,
    }
}

/// Normalize an untrusted decision payload into a bounded command sequence.
///
/// Accepts a single object or an array; truncates to
/// `limits.max_sequence_actions`; fills missing fields from the context's
/// default table; clamps `speed` to 0–100, `duration` to
/// 0.1–`max_move_duration`, and `angle` to 0–`max_turn_angle`. Unknown
/// `action` values are coerced to [`ActionKind::Speak`].
pub fn validate(payload: &Value, context: DecisionContext, limits: &Limits) -> ActionSequence {
    let defaults = defaults_for(context);

    let elements: Vec<&Value> = match payload {
        Value::Array(items) => items.iter().collect(),
        single => vec![single],
    };

    if elements.len() > limits.max_sequence_actions {
        debug!(
            requested = elements.len(),
            kept = limits.max_sequence_actions,
            "truncating over-long action sequence"
        );
    }

    elements
        .into_iter()
        .take(limits.max_sequence_actions)
        .map(|element| sanitize(element, defaults, limits))
        .collect()
}

/// Repair one decision element. Total: any input yields a valid command.
fn sanitize(element: &Value, defaults: &ContextDefaults, limits: &Limits) -> ActionCommand {
    let speed = element
        .get("speed")
        .and_then(Value::as_f64)
        .map(|v| v.round() as i32)
        .unwrap_or(defaults.speed)
        .clamp(0, 100);

    let duration = element
        .get("duration")
        .and_then(Value::as_f64)
        .unwrap_or(defaults.duration)
        .clamp(0.1, limits.max_move_duration);

    let angle = element
        .get("angle")
        .and_then(Value::as_f64)
        .map(|v| v.round() as i32)
        .unwrap_or(defaults.angle)
        .clamp(0, limits.max_turn_angle);

    let mut speech = element
        .get("speech")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let kind = match element.get("action").and_then(Value::as_str) {
        None => defaults.kind,
        Some(token) => match ActionKind::from_token(token) {
            Some(kind) => kind,
            None => {
                debug!(token, "unknown action kind, coercing to speak");
                if speech.is_empty() {
                    speech = UNKNOWN_ACTION_ACK.to_string();
                }
                ActionKind::Speak
            }
        },
    };

    ActionCommand {
        kind,
        speed,
        duration,
        angle,
        speech,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn limits() -> Limits {
        Limits::default()
    }

    #[test]
    fn single_object_becomes_one_element_sequence() {
        let seq = validate(&json!({"action": "turn_left"}), DecisionContext::Terminal, &limits());
        assert_eq!(seq.len(), 1);
        assert_eq!(seq[0].kind, ActionKind::TurnLeft);
        assert_eq!(seq[0].speed, 50);
        assert_eq!(seq[0].duration, 1.0);
        assert_eq!(seq[0].angle, 90);
        assert_eq!(seq[0].speech, "");
    }

    #[test]
    fn obstacle_context_uses_its_own_speed_default() {
        let seq = validate(&json!({"action": "move_backward"}), DecisionContext::Obstacle, &limits());
        assert_eq!(seq[0].speed, 40);
    }

    #[test]
    fn over_long_array_is_truncated_to_first_five() {
        let items: Vec<Value> = (0..8).map(|i| json!({"action": "stop", "angle": i})).collect();
        let seq = validate(&Value::Array(items), DecisionContext::Autonomous, &limits());
        assert_eq!(seq.len(), 5);
        // First five in original order.
        let angles: Vec<i32> = seq.iter().map(|c| c.angle).collect();
        assert_eq!(angles, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn fields_are_clamped_into_range() {
        let seq = validate(
            &json!({"action": "move_forward", "speed": 250, "duration": 99.0, "angle": 720}),
            DecisionContext::Autonomous,
            &limits(),
        );
        assert_eq!(seq[0].speed, 100);
        assert_eq!(seq[0].duration, 3.0);
        assert_eq!(seq[0].angle, 180);
    }

    #[test]
    fn negative_values_clamp_to_lower_bounds() {
        let seq = validate(
            &json!({"action": "move_forward", "speed": -10, "duration": 0.0, "angle": -45}),
            DecisionContext::Autonomous,
            &limits(),
        );
        assert_eq!(seq[0].speed, 0);
        assert_eq!(seq[0].duration, 0.1);
        assert_eq!(seq[0].angle, 0);
    }

    #[test]
    fn wrong_typed_fields_fall_back_to_defaults_then_clamp() {
        let seq = validate(
            &json!({"action": "move_forward", "speed": "fast", "duration": true, "angle": null}),
            DecisionContext::Autonomous,
            &limits(),
        );
        assert_eq!(seq[0].speed, 50);
        assert_eq!(seq[0].duration, 1.0);
        assert_eq!(seq[0].angle, 90);
    }

    #[test]
    fn unknown_action_is_coerced_to_speak_with_acknowledgment() {
        let seq = validate(&json!({"action": "self_destruct"}), DecisionContext::Autonomous, &limits());
        assert_eq!(seq[0].kind, ActionKind::Speak);
        assert_eq!(seq[0].speech, UNKNOWN_ACTION_ACK);
    }

    #[test]
    fn unknown_action_keeps_supplied_speech() {
        let seq = validate(
            &json!({"action": "moonwalk", "speech": "watch this"}),
            DecisionContext::Autonomous,
            &limits(),
        );
        assert_eq!(seq[0].kind, ActionKind::Speak);
        assert_eq!(seq[0].speech, "watch this");
    }

    #[test]
    fn missing_action_defaults_to_speak() {
        let seq = validate(&json!({"speed": 60}), DecisionContext::Autonomous, &limits());
        assert_eq!(seq[0].kind, ActionKind::Speak);
        assert_eq!(seq[0].speed, 60);
    }

    #[test]
    fn non_object_payload_still_yields_a_default_command() {
        let seq = validate(&json!("banana"), DecisionContext::Autonomous, &limits());
        assert_eq!(seq.len(), 1);
        assert_eq!(seq[0].kind, ActionKind::Speak);
    }

    #[test]
    fn empty_array_is_an_empty_sequence() {
        let seq = validate(&json!([]), DecisionContext::Autonomous, &limits());
        assert!(seq.is_empty());
    }

    #[test]
    fn every_field_is_always_within_range() {
        // Arbitrary hostile payloads never escape the clamp ranges.
        let hostile = json!([
            {"action": "attack", "speed": 1e9, "duration": -1e9, "angle": 1e9},
            {"speed": {}, "duration": [], "speech": 12},
            "just a string",
            {"action": 42}
        ]);
        let seq = validate(&hostile, DecisionContext::Obstacle, &limits());
        for cmd in &seq {
            assert!((0..=100).contains(&cmd.speed));
            assert!((0.1..=3.0).contains(&cmd.duration));
            assert!((0..=180).contains(&cmd.angle));
        }
    }
}
