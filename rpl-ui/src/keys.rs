//! Shift planes and the key table.
//!
//! Three shift planes (unshifted, shift, x-shift) from a single shift
//! key: a single press toggles shift, a double press toggles x-shift,
//! a long press toggles alpha. Alpha adds lowercase/uppercase
//! subplanes; holding an arrow enables transient alpha. The key table
//! is indexed by `(key, plane, mode)` and yields an insertion, a
//! command, or a navigation action; user assignments (numbered keys in
//! the current directory) take priority in user mode.

use bitflags::bitflags;
use rpl_types::Id;

use crate::mode::EditMode;

/// Logical key codes of the 6×9 matrix.
pub mod key {
    /// Soft keys under the screen, left to right.
    pub const SOFT: [u8; 6] = [1, 2, 3, 4, 5, 6];
    /// Cursor up.
    pub const UP: u8 = 7;
    /// Cursor down.
    pub const DOWN: u8 = 8;
    /// Cursor left.
    pub const LEFT: u8 = 9;
    /// Cursor right.
    pub const RIGHT: u8 = 10;
    /// The single shift key.
    pub const SHIFT: u8 = 11;
    /// Exit/interrupt key.
    pub const EXIT: u8 = 12;
    /// Enter.
    pub const ENTER: u8 = 13;
    /// Backspace.
    pub const BKSP: u8 = 14;
    /// Digits `0`..`9` map to codes 20..=29.
    pub const DIGIT0: u8 = 20;
    /// Decimal point.
    pub const DOT: u8 = 30;
    /// `+`.
    pub const ADD: u8 = 31;
    /// `-`.
    pub const SUB: u8 = 32;
    /// `*`.
    pub const MUL: u8 = 33;
    /// `/`.
    pub const DIV: u8 = 34;
    /// `^` and roots.
    pub const POW: u8 = 35;
    /// Sin.
    pub const SIN: u8 = 36;
    /// Cos.
    pub const COS: u8 = 37;
    /// Tan.
    pub const TAN: u8 = 38;
    /// Sqrt.
    pub const SQRT: u8 = 39;
    /// Quote key.
    pub const QUOTE: u8 = 40;
    /// Program delimiters / unit underscore on shift.
    pub const PROGRAM: u8 = 41;
    /// Space / SPC.
    pub const SPACE: u8 = 42;
    /// Unit prefix cycling key.
    pub const EEX: u8 = 43;
    /// Variables menu key.
    pub const VAR: u8 = 44;
    /// First letter key; letters A..Z map to codes 50..=75.
    pub const ALPHA_A: u8 = 50;
}

bitflags! {
    /// Active shift planes, a small bitfield.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Planes: u8 {
        /// Single-shift plane.
        const SHIFT = 0b0000_0001;
        /// Alternate (x-shift) plane.
        const XSHIFT = 0b0000_0010;
        /// Alpha mode.
        const ALPHA = 0b0000_0100;
        /// Lowercase subplane of alpha.
        const LOWER = 0b0000_1000;
        /// Alpha held transiently by an arrow key.
        const TRANSIENT = 0b0001_0000;
    }
}

/// Milliseconds distinguishing a double press.
const DOUBLE_PRESS_MS: u64 = 400;
/// Milliseconds after which a held shift becomes a long press.
const LONG_PRESS_MS: u64 = 600;

/// Shift-key state machine fed with press/release timestamps.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShiftState {
    planes: Planes,
    last_press_ms: u64,
    pressed_at: Option<u64>,
}

impl ShiftState {
    /// Active planes.
    pub fn planes(&self) -> Planes {
        self.planes
    }

    /// Record a shift key press.
    pub fn press(&mut self, now_ms: u64) {
        let double = now_ms.saturating_sub(self.last_press_ms) < DOUBLE_PRESS_MS;
        self.last_press_ms = now_ms;
        self.pressed_at = Some(now_ms);
        if double {
            // The single press already toggled shift; a double press
            // means x-shift instead.
            self.planes.remove(Planes::SHIFT);
            self.planes.toggle(Planes::XSHIFT);
        } else {
            self.planes.remove(Planes::XSHIFT);
            self.planes.toggle(Planes::SHIFT);
        }
    }

    /// Record the shift key release; a long hold toggles alpha.
    pub fn release(&mut self, now_ms: u64) {
        if let Some(at) = self.pressed_at.take() {
            if now_ms.saturating_sub(at) >= LONG_PRESS_MS {
                self.planes.remove(Planes::SHIFT | Planes::XSHIFT);
                self.planes.toggle(Planes::ALPHA);
            }
        }
    }

    /// Toggle the lowercase subplane (shift while alpha is on).
    pub fn toggle_lower(&mut self) {
        self.planes.toggle(Planes::LOWER);
    }

    /// Arrow held: transient alpha.
    pub fn set_transient(&mut self, held: bool) {
        self.planes.set(Planes::TRANSIENT, held);
    }

    /// Consume the one-shot planes after a non-shift key. Transient
    /// alpha survives: it ends when the arrow is released.
    pub fn consume(&mut self) {
        self.planes.remove(Planes::SHIFT | Planes::XSHIFT);
    }

    /// Whether alpha (sticky or transient) is on.
    pub fn alpha(&self) -> bool {
        self.planes.intersects(Planes::ALPHA | Planes::TRANSIENT)
    }
}

/// What a key resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyAction {
    /// Insert text into the editor.
    Insert(String),
    /// Execute a command object.
    Cmd(Id),
    /// Commit the command line.
    Enter,
    /// Delete backwards, or drop level 1 outside an edit.
    Backspace,
    /// Cursor movement.
    Left,
    /// Cursor movement.
    Right,
    /// Cursor / stack navigation.
    Up,
    /// Cursor / stack navigation.
    Down,
    /// Soft key `n` (0-based); the menu decides.
    Soft(usize),
    /// Open the variables menu.
    VarMenu,
    /// Cycle the SI prefix on the unit word at the cursor.
    CyclePrefix,
    /// Interrupt/exit.
    Exit,
    /// Nothing bound.
    Nop,
}

/// Resolve a key through the built-in three-dimensional table.
pub fn builtin_action(code: u8, planes: Planes, mode: EditMode) -> KeyAction {
    // Alpha planes win for letter-bearing keys.
    if planes.intersects(Planes::ALPHA | Planes::TRANSIENT) {
        if let Some(letter) = alpha_letter(code) {
            let c = if planes.contains(Planes::LOWER) {
                letter.to_ascii_lowercase()
            } else {
                letter
            };
            return KeyAction::Insert(c.to_string());
        }
    }

    let shifted = planes.contains(Planes::SHIFT);
    let xshifted = planes.contains(Planes::XSHIFT);

    match code {
        c if key::SOFT.contains(&c) => KeyAction::Soft((c - key::SOFT[0]) as usize),
        key::UP => KeyAction::Up,
        key::DOWN => KeyAction::Down,
        key::LEFT => KeyAction::Left,
        key::RIGHT => KeyAction::Right,
        key::ENTER => KeyAction::Enter,
        key::BKSP => KeyAction::Backspace,
        key::EXIT => KeyAction::Exit,
        key::VAR => KeyAction::VarMenu,
        key::EEX if mode == EditMode::Unit => KeyAction::CyclePrefix,
        key::EEX => KeyAction::Insert("e".into()),
        c if (key::DIGIT0..key::DIGIT0 + 10).contains(&c) => {
            KeyAction::Insert(((b'0' + (c - key::DIGIT0)) as char).to_string())
        }
        key::DOT if shifted => KeyAction::Insert("…".into()),
        key::DOT => KeyAction::Insert(".".into()),
        key::ADD | key::SUB | key::MUL | key::DIV | key::POW => {
            operator_action(code, shifted, mode)
        }
        key::SIN | key::COS | key::TAN | key::SQRT => {
            function_action(code, xshifted, mode)
        }
        key::QUOTE if shifted => KeyAction::Insert("\"".into()),
        key::QUOTE => KeyAction::Insert("'".into()),
        key::PROGRAM if shifted => KeyAction::Insert("_".into()),
        key::PROGRAM if xshifted => KeyAction::Insert("#".into()),
        key::PROGRAM => KeyAction::Insert("«".into()),
        key::SPACE => KeyAction::Insert(" ".into()),
        c if alpha_letter(c).is_some() => KeyAction::Nop,
        _ => KeyAction::Nop,
    }
}

fn alpha_letter(code: u8) -> Option<char> {
    if (key::ALPHA_A..key::ALPHA_A + 26).contains(&code) {
        Some((b'A' + (code - key::ALPHA_A)) as char)
    } else {
        None
    }
}

fn operator_action(code: u8, shifted: bool, mode: EditMode) -> KeyAction {
    let (plain, shift_insert, id) = match code {
        key::ADD => ("+", "±", Id::Add),
        key::SUB => ("-", "∠", Id::Sub),
        key::MUL => ("*", "×", Id::Mul),
        key::DIV => ("/", "÷", Id::Div),
        _ => ("^", "√", Id::Pow),
    };
    match mode {
        // Outside an edit the operator runs at once.
        EditMode::Stack | EditMode::Direct if !shifted => KeyAction::Cmd(id),
        _ if shifted => KeyAction::Insert(shift_insert.into()),
        // Inside an algebraic the glyph is infix text.
        _ => KeyAction::Insert(plain.into()),
    }
}

fn function_action(code: u8, xshifted: bool, mode: EditMode) -> KeyAction {
    let (name, id, inverse) = match code {
        key::SIN => ("sin", Id::Sin, "exp"),
        key::COS => ("cos", Id::Cos, "ln"),
        key::TAN => ("tan", Id::Tan, "sq"),
        _ => ("sqrt", Id::Sqrt, "inv"),
    };
    let name = if xshifted { inverse } else { name };
    match mode.function_insert(name) {
        None => {
            if xshifted {
                KeyAction::Cmd(match name {
                    "exp" => Id::Exp,
                    "ln" => Id::Ln,
                    "sq" => Id::Sq,
                    _ => Id::Inv,
                })
            } else {
                KeyAction::Cmd(id)
            }
        }
        Some(text) => KeyAction::Insert(text),
    }
}
