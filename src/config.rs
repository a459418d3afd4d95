//! Input settings.
//!
//! Settings are stored as TOML and re-read on demand (e.g. after the user edits their
//! bindings). Binding lists are ordered; a later entry for the same physical code on the
//! same device overwrites an earlier one.
//!
//! ```toml
//! [input]
//! deadzone = 8000
//!
//! [[input.keyboard]]
//! input = "a"
//! physical = { key = 65 }
//!
//! [[input.controller]]
//! input = "circle_left"
//! physical = { axis = { axis = "left_x", direction = "negative" } }
//! ```

use crate::error::ConfigError;
use crate::event::{AxisHalf, ControllerAxis, ControllerButton, PhysicalCode};
use crate::machine::NativeInput;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default analog deadzone, in raw axis units.
pub const DEFAULT_DEADZONE: i16 = 8000;

/// Host key codes used by the default keyboard layout.
pub mod keys {
    pub const LEFT: u32 = 0x0100_0012;
    pub const UP: u32 = 0x0100_0013;
    pub const RIGHT: u32 = 0x0100_0014;
    pub const DOWN: u32 = 0x0100_0015;

    /// Code of an ASCII letter or digit key.
    pub const fn ascii(c: char) -> u32 {
        c as u32
    }
}

/// One `logical input → physical code` binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMapping {
    pub input: NativeInput,
    pub physical: PhysicalCode,
}

impl KeyMapping {
    pub fn new(input: NativeInput, physical: impl Into<PhysicalCode>) -> Self {
        Self {
            input,
            physical: physical.into(),
        }
    }
}

/// Input section of the settings file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    /// Analog magnitude at or below which an axis is neutral.
    pub deadzone: i16,
    /// Bindings applied to the keyboard device.
    pub keyboard: Vec<KeyMapping>,
    /// Bindings applied to every controller.
    pub controller: Vec<KeyMapping>,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            deadzone: DEFAULT_DEADZONE,
            keyboard: default_keyboard(),
            controller: default_controller(),
        }
    }
}

/// Top-level settings document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub input: InputSettings,
}

impl Settings {
    /// Read and validate settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_toml_str(&text)?;
        log::debug!(
            "loaded settings from {} ({} keyboard, {} controller bindings)",
            path.as_ref().display(),
            settings.input.keyboard.len(),
            settings.input.controller.len()
        );
        Ok(settings)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input.deadzone < 0 {
            return Err(ConfigError::Deadzone(self.input.deadzone as i32));
        }
        Ok(())
    }
}

fn default_keyboard() -> Vec<KeyMapping> {
    use keys::ascii;
    use NativeInput::*;

    [
        (A, ascii('A')),
        (B, ascii('S')),
        (X, ascii('Z')),
        (Y, ascii('X')),
        (L, ascii('Q')),
        (R, ascii('W')),
        (Zl, ascii('1')),
        (Zr, ascii('2')),
        (Start, ascii('M')),
        (Select, ascii('N')),
        (Home, ascii('B')),
        (DUp, ascii('T')),
        (DDown, ascii('G')),
        (DLeft, ascii('F')),
        (DRight, ascii('H')),
        (CircleUp, keys::UP),
        (CircleDown, keys::DOWN),
        (CircleLeft, keys::LEFT),
        (CircleRight, keys::RIGHT),
        (CStickUp, ascii('I')),
        (CStickDown, ascii('K')),
        (CStickLeft, ascii('J')),
        (CStickRight, ascii('L')),
    ]
    .into_iter()
    .map(|(input, code)| KeyMapping::new(input, PhysicalCode::Key(code)))
    .collect()
}

fn default_controller() -> Vec<KeyMapping> {
    use ControllerButton as Btn;
    use NativeInput::*;

    vec![
        KeyMapping::new(A, Btn::A),
        KeyMapping::new(B, Btn::B),
        KeyMapping::new(X, Btn::X),
        KeyMapping::new(Y, Btn::Y),
        KeyMapping::new(Start, Btn::Start),
        KeyMapping::new(Select, Btn::Back),
        KeyMapping::new(DUp, Btn::DpadUp),
        KeyMapping::new(DDown, Btn::DpadDown),
        KeyMapping::new(DLeft, Btn::DpadLeft),
        KeyMapping::new(DRight, Btn::DpadRight),
        KeyMapping::new(CircleLeft, AxisHalf::negative(ControllerAxis::LeftX)),
        KeyMapping::new(CircleRight, AxisHalf::positive(ControllerAxis::LeftX)),
        KeyMapping::new(CircleUp, AxisHalf::negative(ControllerAxis::LeftY)),
        KeyMapping::new(CircleDown, AxisHalf::positive(ControllerAxis::LeftY)),
    ]
}
