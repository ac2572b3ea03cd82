//! User settings.
//!
//! One flat struct shared by the parser, the renderer, the arithmetic
//! dispatcher and the UI. Persisted through the host state store as a
//! key/value record; the hash of the serialized form invalidates the
//! stack view render cache.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Angle interpretation for trigonometry and polar complex numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AngleMode {
    /// Degrees, the power-on default.
    Degrees,
    /// Radians.
    Radians,
    /// Gradians.
    Grads,
}

/// Numeric display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DisplayMode {
    /// Shortest faithful form.
    Std,
    /// Fixed number of fractional digits.
    Fix(u8),
    /// Scientific notation with the given significant digits.
    Sci(u8),
    /// Engineering notation, exponent a multiple of three.
    Eng(u8),
}

/// User-key binding priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UserMode {
    /// Built-in bindings only.
    #[default]
    Off,
    /// User bindings for the next keystroke only.
    Once,
    /// User bindings until turned off.
    Locked,
}

/// All user-visible configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Settings {
    /// Significant digits carried by decimal arithmetic.
    pub precision: u32,
    /// Word size applied to based integers, 1..=64 bits.
    pub word_size: u8,
    /// Display base for based integers without an explicit marker.
    pub base: u8,
    /// Angle mode.
    pub angle_mode: AngleMode,
    /// Numeric display mode.
    pub display: DisplayMode,
    /// Apply the auto-simplification law table during arithmetic.
    pub auto_simplify: bool,
    /// `0^0` evaluates to `1`; otherwise it is an undefined operation.
    pub zero_power_zero_is_one: bool,
    /// Division of nonzero by zero yields a signed infinity instead of
    /// an error.
    pub infinity_result: bool,
    /// Cosmetic digit-group separator inserted by the renderer and
    /// stripped by the parser.
    pub thousands_separator: Option<char>,
    /// Allow multi-line rendering in the stack view.
    pub multi_line_stack: bool,
    /// Render stack results graphically when the rasterizer fits the
    /// budget.
    pub graphical_results: bool,
    /// Beep frequency in Hz for the error tone.
    pub beep_frequency: u16,
    /// Beep duration in milliseconds.
    pub beep_duration: u16,
    /// Sound the beep when an error is shown.
    pub error_beep: bool,
    /// Any key clears a pending error banner, not just the next edit.
    pub clear_error_on_any_key: bool,
    /// User-key binding mode.
    pub user_mode: UserMode,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            precision: 24,
            word_size: 64,
            base: 16,
            angle_mode: AngleMode::Degrees,
            display: DisplayMode::Std,
            auto_simplify: true,
            zero_power_zero_is_one: true,
            infinity_result: true,
            thousands_separator: None,
            multi_line_stack: true,
            graphical_results: false,
            beep_frequency: 4400,
            beep_duration: 50,
            error_beep: true,
            clear_error_on_any_key: false,
            user_mode: UserMode::Off,
        }
    }
}

impl Settings {
    /// Mask for the current based-integer word size.
    pub fn word_mask(&self) -> u64 {
        if self.word_size >= 64 {
            u64::MAX
        } else {
            (1u64 << self.word_size) - 1
        }
    }

    /// Hash used to invalidate render caches when anything that affects
    /// rendering changes.
    pub fn render_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.word_size.hash(&mut hasher);
        self.base.hash(&mut hasher);
        (self.angle_mode as u8).hash(&mut hasher);
        match self.display {
            DisplayMode::Std => 0u16.hash(&mut hasher),
            DisplayMode::Fix(n) => (0x100u16 | n as u16).hash(&mut hasher),
            DisplayMode::Sci(n) => (0x200u16 | n as u16).hash(&mut hasher),
            DisplayMode::Eng(n) => (0x300u16 | n as u16).hash(&mut hasher),
        }
        self.thousands_separator.hash(&mut hasher);
        self.multi_line_stack.hash(&mut hasher);
        self.graphical_results.hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_mask_covers_small_and_full_sizes() {
        let mut settings = Settings::default();
        assert_eq!(settings.word_mask(), u64::MAX);
        settings.word_size = 16;
        assert_eq!(settings.word_mask(), 0xffff);
        settings.word_size = 1;
        assert_eq!(settings.word_mask(), 1);
    }

    #[test]
    fn render_hash_tracks_display_settings() {
        let a = Settings::default();
        let mut b = a.clone();
        assert_eq!(a.render_hash(), b.render_hash());
        b.display = DisplayMode::Fix(2);
        assert_ne!(a.render_hash(), b.render_hash());
    }
}
