//! Generic `Actuators` trait for the drive motors and the auxiliary blade.
//!
//! Drivers implement this trait; the executor only ever talks to the trait.
//! Methods take `&self` because implementations are shared across tasks and
//! manage their own interior state.

use stormbot_types::BotError;
use tracing::warn;

/// Which drive motor a command addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

/// The actuator bank: two drive motors plus one auxiliary (blade) motor.
///
/// Correctness of actuator arbitration depends entirely on callers holding
/// the busy gate while invoking these methods; there is no hardware-level
/// lock underneath.
pub trait Actuators: Send + Sync {
    /// Run one drive motor at `signed_speed` (-100–100, negative = reverse).
    ///
    /// # Errors
    ///
    /// Returns [`BotError::HardwareFault`] if the command cannot be applied.
    fn drive(&self, side: Side, signed_speed: i32) -> Result<(), BotError>;

    /// Cut power to one drive motor.
    fn drive_off(&self, side: Side) -> Result<(), BotError>;

    /// Run the auxiliary motor at `speed` (0–100).
    fn aux_on(&self, speed: i32) -> Result<(), BotError>;

    /// Cut power to the auxiliary motor.
    fn aux_off(&self) -> Result<(), BotError>;

    /// Best-effort shutdown of every motor. Never fails: individual faults
    /// are logged and the remaining motors are still commanded off, so this
    /// is safe to call from any cleanup path.
    fn all_off(&self) {
        for (label, result) in [
            ("left_motor", self.drive_off(Side::Left)),
            ("right_motor", self.drive_off(Side::Right)),
            ("aux_motor", self.aux_off()),
        ] {
            if let Err(e) = result {
                warn!(motor = label, error = %e, "failed to cut motor power");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records which motors were commanded off, failing the left one.
    struct FlakyBank {
        offs: Mutex<Vec<&'static str>>,
    }

    impl Actuators for FlakyBank {
        fn drive(&self, _side: Side, _signed_speed: i32) -> Result<(), BotError> {
            Ok(())
        }

        fn drive_off(&self, side: Side) -> Result<(), BotError> {
            match side {
                Side::Left => Err(BotError::HardwareFault {
                    component: "left_motor".to_string(),
                    details: "bus timeout".to_string(),
                }),
                Side::Right => {
                    self.offs.lock().unwrap().push("right");
                    Ok(())
                }
            }
        }

        fn aux_on(&self, _speed: i32) -> Result<(), BotError> {
            Ok(())
        }

        fn aux_off(&self) -> Result<(), BotError> {
            self.offs.lock().unwrap().push("aux");
            Ok(())
        }
    }

    #[test]
    fn all_off_continues_past_a_faulting_motor() {
        let bank = FlakyBank {
            offs: Mutex::new(Vec::new()),
        };
        bank.all_off();
        let offs = bank.offs.lock().unwrap();
        assert_eq!(*offs, vec!["right", "aux"]);
    }
}
