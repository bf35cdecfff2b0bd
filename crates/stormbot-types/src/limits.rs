//! Hard safety bounds for everything the robot executes.
//!
//! These ceilings apply to *validated* commands as well: no matter what the
//! oracle returns, motion never exceeds them. Loaded from the config vault;
//! the defaults match the shipped robot.

use serde::{Deserialize, Serialize};

/// Safety ceilings and pacing knobs shared across the stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    /// Longest single forward/backward motion, seconds.
    #[serde(default = "default_max_move_duration")]
    pub max_move_duration: f64,

    /// Largest single turn, degrees.
    #[serde(default = "default_max_turn_angle")]
    pub max_turn_angle: i32,

    /// Hard ceiling on one closed-loop turn, seconds. This is the fail-safe
    /// bound when gyro feedback is noisy, absent, or never converges.
    #[serde(default = "default_max_turn_duration")]
    pub max_turn_duration: f64,

    /// Longest single blade engagement, seconds.
    #[serde(default = "default_max_attack_duration")]
    pub max_attack_duration: f64,

    /// Blade motor speed cap.
    #[serde(default = "default_max_blade_speed")]
    pub max_blade_speed: i32,

    /// Drive motor speed cap applied at execution time.
    #[serde(default = "default_max_motor_speed")]
    pub max_motor_speed: i32,

    /// Proximity reading below which an obstacle reaction triggers.
    #[serde(default = "default_obstacle_distance")]
    pub obstacle_distance: u8,

    /// Proximity reading below which producers redirect to the obstacle path
    /// instead of requesting a normal decision.
    #[serde(default = "default_safety_distance")]
    pub safety_distance: u8,

    /// Longest accepted command sequence; extra elements are discarded.
    #[serde(default = "default_max_sequence_actions")]
    pub max_sequence_actions: usize,

    /// Oracle calls allowed per day.
    #[serde(default = "default_daily_request_limit")]
    pub daily_request_limit: u32,

    /// When false, the daily quota is not enforced at all.
    #[serde(default = "default_enable_request_limit")]
    pub enable_request_limit: bool,

    /// Shortest pause between autonomous cycles, seconds.
    #[serde(default = "default_autonomous_interval_min")]
    pub autonomous_interval_min: u64,

    /// Longest pause between autonomous cycles, seconds.
    #[serde(default = "default_autonomous_interval_max")]
    pub autonomous_interval_max: u64,

    /// Sensor cache freshness window, seconds.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: f64,
}

fn default_max_move_duration() -> f64 {
    3.0
}
fn default_max_turn_angle() -> i32 {
    180
}
fn default_max_turn_duration() -> f64 {
    5.0
}
fn default_max_attack_duration() -> f64 {
    2.0
}
fn default_max_blade_speed() -> i32 {
    100
}
fn default_max_motor_speed() -> i32 {
    75
}
fn default_obstacle_distance() -> u8 {
    20
}
fn default_safety_distance() -> u8 {
    30
}
fn default_max_sequence_actions() -> usize {
    5
}
fn default_daily_request_limit() -> u32 {
    14400
}
fn default_enable_request_limit() -> bool {
    true
}
fn default_autonomous_interval_min() -> u64 {
    10
}
fn default_autonomous_interval_max() -> u64 {
    300
}
fn default_cache_ttl() -> f64 {
    0.1
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_move_duration: default_max_move_duration(),
            max_turn_angle: default_max_turn_angle(),
            max_turn_duration: default_max_turn_duration(),
            max_attack_duration: default_max_attack_duration(),
            max_blade_speed: default_max_blade_speed(),
            max_motor_speed: default_max_motor_speed(),
            obstacle_distance: default_obstacle_distance(),
            safety_distance: default_safety_distance(),
            max_sequence_actions: default_max_sequence_actions(),
            daily_request_limit: default_daily_request_limit(),
            enable_request_limit: default_enable_request_limit(),
            autonomous_interval_min: default_autonomous_interval_min(),
            autonomous_interval_max: default_autonomous_interval_max(),
            cache_ttl: default_cache_ttl(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_robot() {
        let limits = Limits::default();
        assert_eq!(limits.max_move_duration, 3.0);
        assert_eq!(limits.max_turn_angle, 180);
        assert_eq!(limits.max_motor_speed, 75);
        assert_eq!(limits.obstacle_distance, 20);
        assert_eq!(limits.safety_distance, 30);
        assert_eq!(limits.max_sequence_actions, 5);
        assert!(limits.enable_request_limit);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let limits: Limits = serde_json::from_str("{}").unwrap();
        assert_eq!(limits.daily_request_limit, 14400);
        assert_eq!(limits.cache_ttl, 0.1);
    }
}
