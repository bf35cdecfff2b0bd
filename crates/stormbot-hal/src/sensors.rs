//! Sensor collaborator traits.
//!
//! One trait per physical sensor so a robot missing a device simply wires
//! `None` for it; the sensor cache substitutes defaults and disables any
//! feature that needs the missing hardware (closed-loop turns without a gyro,
//! for instance).

use stormbot_types::{BotError, Color};

/// Infrared proximity sensor. Raw readings are untrusted: they may be noisy,
/// out of range, or fail outright, which is why the cache takes a median of
/// several samples.
pub trait Proximity: Send + Sync {
    /// One raw proximity sample, nominally 0–100.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::SensorRead`] when the sample cannot be taken.
    fn read_proximity(&self) -> Result<i32, BotError>;
}

/// Surface color sensor.
pub trait ColorSense: Send + Sync {
    /// # Errors
    ///
    /// Returns [`BotError::SensorRead`] when the sample cannot be taken.
    fn read_color(&self) -> Result<Color, BotError>;
}

/// Orientation (gyro) sensor used for closed-loop turns.
pub trait Gyro: Send + Sync {
    /// Accumulated orientation angle in degrees.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::SensorRead`] when the sample cannot be taken.
    fn read_orientation_angle(&self) -> Result<i32, BotError>;

    /// Angular rate in degrees per second.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::SensorRead`] when the sample cannot be taken.
    fn read_rotation_rate(&self) -> Result<i32, BotError>;
}

/// Touch sensor / button. Reads never fail; a broken sensor reads "not
/// pressed".
pub trait Touch: Send + Sync {
    fn is_pressed(&self) -> bool;
}
