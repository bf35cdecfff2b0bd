//! Speech and status-light collaborators.
//!
//! Both are fire-and-forget: callers log failures and move on, they never let
//! a broken speaker or LED stop the robot.

use std::process::{Command, Stdio};

use stormbot_types::BotError;
use tracing::{debug, info};

use crate::actuators::Side;

/// Colors the status indicators can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusColor {
    Off,
    Green,
    Amber,
    Red,
}

/// Text-to-speech output.
pub trait SpeechOutput: Send + Sync {
    /// Speak `text`.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::HardwareFault`] when the backend fails; callers
    /// treat this as log-and-ignore.
    fn announce(&self, text: &str) -> Result<(), BotError>;
}

/// Two-sided status indicator (LED pair on the brick).
pub trait StatusLights: Send + Sync {
    /// # Errors
    ///
    /// Returns [`BotError::HardwareFault`] when the indicator cannot be set;
    /// callers treat this as log-and-ignore.
    fn set_status(&self, side: Side, color: StatusColor) -> Result<(), BotError>;
}

/// Speech via the `espeak` binary, with ALSA noise routed to /dev/null.
pub struct EspeakSpeech {
    voice: String,
    words_per_minute: u32,
}

impl EspeakSpeech {
    pub fn new(voice: impl Into<String>) -> Self {
        Self {
            voice: voice.into(),
            words_per_minute: 100,
        }
    }
}

impl SpeechOutput for EspeakSpeech {
    fn announce(&self, text: &str) -> Result<(), BotError> {
        info!(text, "announcing");
        Command::new("espeak")
            .args(["-v", &self.voice, "-s", &self.words_per_minute.to_string(), text])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| BotError::HardwareFault {
                component: "espeak".to_string(),
                details: e.to_string(),
            })?;
        Ok(())
    }
}

/// Status "lights" rendered as log lines; used when no LED hardware exists.
#[derive(Default)]
pub struct ConsoleLights;

impl StatusLights for ConsoleLights {
    fn set_status(&self, side: Side, color: StatusColor) -> Result<(), BotError> {
        debug!(?side, ?color, "status light");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_lights_never_fail() {
        let lights = ConsoleLights;
        assert!(lights.set_status(Side::Left, StatusColor::Red).is_ok());
        assert!(lights.set_status(Side::Right, StatusColor::Amber).is_ok());
    }
}
