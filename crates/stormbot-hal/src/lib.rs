//! Hardware abstraction layer: the traits the rest of the stack talks to.
//!
//! The arbitration and execution layers never touch device files directly.
//! They hold trait objects for the actuator bank, the individual sensors, and
//! the speech/status collaborators, so drivers can be swapped without touching
//! decision or safety logic. [`sim`] provides in-process stand-ins that record
//! every command, which is how the stack runs in tests and CI.

pub mod actuators;
pub mod sensors;
pub mod sim;
pub mod speech;

pub use actuators::{Actuators, Side};
pub use sensors::{ColorSense, Gyro, Proximity, Touch};
pub use speech::{ConsoleLights, EspeakSpeech, SpeechOutput, StatusColor, StatusLights};
