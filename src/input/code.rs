//! Symbolic input-mutator codes. These are the external contract that
//! keyboard/mouse adapters use to drive [`super::Input::set`]; the naming,
//! including the preserved misspelling of `ButtonCaptuer`, mirrors the
//! original `BUTTON_CAPTUER` string constant so callers translating from
//! the legacy key-mapping format need no renaming table.

/// One entry in the external `set(code, value)` contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputCode {
    ButtonA,
    ButtonB,
    ButtonX,
    ButtonY,
    ButtonL,
    ButtonR,
    ButtonZl,
    ButtonZr,
    ButtonHome,
    ButtonPlus,
    ButtonMinus,
    /// Spelled `CAPTUER`, not `CAPTURE`: part of the external contract.
    ButtonCaptuer,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    LstickUp,
    LstickDown,
    LstickLeft,
    LstickRight,
    LstickPress,
    RstickUp,
    RstickDown,
    RstickLeft,
    RstickRight,
    RstickPress,
}

impl InputCode {
    /// Parse the legacy `BUTTON_*`/`DPAD_*`/`*STICK_*` string form used by
    /// key-mapping configuration files. Returns `None` for unrecognized
    /// strings, including the accepted-but-undefined `BUTTON_CAPTURE`
    /// spelling (see spec's open question -- only `BUTTON_CAPTUER` is
    /// wired up).
    pub fn from_legacy_name(name: &str) -> Option<Self> {
        Some(match name {
            "BUTTON_A" => Self::ButtonA,
            "BUTTON_B" => Self::ButtonB,
            "BUTTON_X" => Self::ButtonX,
            "BUTTON_Y" => Self::ButtonY,
            "BUTTON_L" => Self::ButtonL,
            "BUTTON_R" => Self::ButtonR,
            "BUTTON_ZL" => Self::ButtonZl,
            "BUTTON_ZR" => Self::ButtonZr,
            "BUTTON_HOME" => Self::ButtonHome,
            "BUTTON_PLUS" => Self::ButtonPlus,
            "BUTTON_MINUS" => Self::ButtonMinus,
            "BUTTON_CAPTUER" => Self::ButtonCaptuer,
            "DPAD_UP" => Self::DpadUp,
            "DPAD_DOWN" => Self::DpadDown,
            "DPAD_LEFT" => Self::DpadLeft,
            "DPAD_RIGHT" => Self::DpadRight,
            "LSTICK_UP" => Self::LstickUp,
            "LSTICK_DOWN" => Self::LstickDown,
            "LSTICK_LEFT" => Self::LstickLeft,
            "LSTICK_RIGHT" => Self::LstickRight,
            "LSTICK_PRESS" => Self::LstickPress,
            "RSTICK_UP" => Self::RstickUp,
            "RSTICK_DOWN" => Self::RstickDown,
            "RSTICK_LEFT" => Self::RstickLeft,
            "RSTICK_RIGHT" => Self::RstickRight,
            "RSTICK_PRESS" => Self::RstickPress,
            _ => return None,
        })
    }

    /// Whether this code saturates a stick axis high (`*_UP`/`*_RIGHT`) when
    /// pressed and returns to neutral on release, per the keyboard-driven
    /// stick convention in `NS_ProCon_Converter.py::keybd_events`.
    pub fn saturates_high(&self) -> bool {
        matches!(
            self,
            Self::LstickUp | Self::LstickRight | Self::RstickUp | Self::RstickRight
        )
    }

    /// Whether this code saturates a stick axis low (`*_DOWN`/`*_LEFT`) when
    /// pressed and returns to neutral on release.
    pub fn saturates_low(&self) -> bool {
        matches!(
            self,
            Self::LstickDown | Self::LstickLeft | Self::RstickDown | Self::RstickLeft
        )
    }

    /// Whether this code addresses a stick axis at all (as opposed to a
    /// button/dpad/press code).
    pub fn is_stick_axis(&self) -> bool {
        self.saturates_high() || self.saturates_low()
    }
}
