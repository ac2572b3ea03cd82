//! The calculator session: one structure tying the runtime, the
//! editor, the key planes, the menus and the stack view together, plus
//! the cooperative main loop the host installs.
//!
//! The UI and the evaluator share one thread. Key events drain between
//! evaluator steps; during evaluation the host adapter polls the exit
//! key and the battery so long programs stay interruptible.

use rpl_core::eval::{Host, ProgramState};
use rpl_core::object::Value;
use rpl_core::runtime::Runtime;
use rpl_types::ErrorKind;
use tracing::debug;

use crate::editor::{Commit, Editor};
use crate::hal::{
    Clock, FileSys, FontRole, KeyEvent, KeyQueue, Power, Rect, Surface, LOW_BATTERY_MV,
};
use crate::keys::{self, builtin_action, KeyAction, ShiftState};
use crate::menu::{self, MenuAction, MenuState};
use crate::stack_view::StackView;

/// Pixel height reserved for the header line.
pub const HEADER_HEIGHT: u32 = 12;
/// Pixel height reserved for the soft-key menu.
pub const MENU_HEIGHT: u32 = 14;

/// The complete UI state.
pub struct Session {
    /// The runtime this session drives.
    pub rt: Runtime,
    /// Command-line editor.
    pub editor: Editor,
    /// Shift planes.
    pub shift: ShiftState,
    /// Soft-key menus.
    pub menus: MenuState,
    /// Stack view and cache.
    pub stack_view: StackView,
    /// Pending error banner.
    pub banner: Option<String>,
    /// Error tone waiting for the embedder's beeper, `(Hz, ms)`.
    pub pending_beep: Option<(u16, u16)>,
    /// Exit requested by the user.
    pub quit: bool,
    menu_plane: usize,
}

impl Default for Session {
    fn default() -> Self {
        let mut menus = MenuState::default();
        menus.open(menu::main_menu());
        Session {
            rt: Runtime::default(),
            editor: Editor::new(),
            shift: ShiftState::default(),
            menus,
            stack_view: StackView::default(),
            banner: None,
            pending_beep: None,
            quit: false,
            menu_plane: 0,
        }
    }
}

/// Adapter exposing the key queue and the power monitor to the
/// evaluator as interrupt sources.
pub struct HostAdapter<'a> {
    keys: &'a mut dyn KeyQueue,
    power: &'a mut dyn Power,
    clock: &'a mut dyn Clock,
    poll_countdown: u32,
    low_battery: bool,
}

/// How many interrupt checks pass between voltage samples.
const VOLTAGE_SAMPLE_PERIOD: u32 = 256;

impl<'a> HostAdapter<'a> {
    /// Wrap the hardware contracts.
    pub fn new(
        keys: &'a mut dyn KeyQueue,
        power: &'a mut dyn Power,
        clock: &'a mut dyn Clock,
    ) -> HostAdapter<'a> {
        HostAdapter {
            keys,
            power,
            clock,
            poll_countdown: 0,
            low_battery: false,
        }
    }
}

impl Host for HostAdapter<'_> {
    fn poll_exit(&mut self) -> bool {
        // Runs to completion for each queued sequence: only a fresh
        // exit press aborts, queued ordinary keys stay queued.
        while let Some(event) = self.keys.poll() {
            if event.code == keys::key::EXIT && !event.released {
                self.keys.flush();
                return true;
            }
        }
        false
    }

    fn battery_low(&mut self) -> bool {
        if self.poll_countdown == 0 {
            self.poll_countdown = VOLTAGE_SAMPLE_PERIOD;
            if !self.power.on_usb() && self.power.voltage() < LOW_BATTERY_MV {
                self.low_battery = true;
            }
        }
        self.poll_countdown -= 1;
        self.low_battery
    }

    fn now_ms(&mut self) -> u64 {
        self.clock.now_ms()
    }
}

impl Session {
    /// Fresh session with the main menu open.
    pub fn new() -> Session {
        Session::default()
    }

    /// Process one key event from the queue or the synthetic-key API.
    pub fn handle_event(&mut self, event: KeyEvent, host: &mut dyn Host) {
        // Any key clears a pending banner first.
        if self.banner.is_some() && !event.released {
            self.banner = None;
            if !self.rt.settings.clear_error_on_any_key {
                return;
            }
        }

        if event.code == keys::key::SHIFT {
            let now = host.now_ms();
            if event.released {
                self.shift.release(now);
            } else {
                self.shift.press(now);
            }
            return;
        }

        // Transient alpha while an arrow is held.
        if matches!(
            event.code,
            keys::key::UP | keys::key::DOWN | keys::key::LEFT | keys::key::RIGHT
        ) {
            self.shift.set_transient(!event.released);
        }

        if event.released {
            return;
        }

        // User assignments take priority when user mode is on.
        if let Some(ptr) = self.user_assignment(event.code) {
            self.shift.consume();
            match self.rt.decode(ptr) {
                Ok(Value::Text(text)) => {
                    self.editor.open();
                    self.editor.insert(&text);
                }
                _ => {
                    self.rt.save_undo();
                    if let Err(err) = self.rt.evaluate(host, ptr) {
                        self.show_error(err.kind());
                    }
                    self.stack_view.invalidate();
                }
            }
            return;
        }

        // The shift plane also selects the soft-key row.
        let planes = self.shift.planes();
        self.menu_plane = if planes.contains(keys::Planes::XSHIFT) {
            2
        } else if planes.contains(keys::Planes::SHIFT) {
            1
        } else {
            0
        };
        let action = builtin_action(event.code, planes, self.editor.mode());
        self.shift.consume();
        self.apply(action, host);
    }

    /// The user binding for a key, honoring once/locked user mode.
    fn user_assignment(&mut self, code: u8) -> Option<rpl_core::object::ObjPtr> {
        use rpl_core::dir::{Binding, VarKey};
        use rpl_core::settings::UserMode;

        let user = self.rt.settings.user_mode;
        if user == UserMode::Off {
            return None;
        }
        if user == UserMode::Once {
            self.rt.settings.user_mode = UserMode::Off;
        }
        match self.rt.dirs().recall(&VarKey::Key(code as u32)) {
            Some(Binding::Value(ptr)) => Some(ptr),
            _ => None,
        }
    }

    /// Apply a resolved action.
    pub fn apply(&mut self, action: KeyAction, host: &mut dyn Host) {
        match action {
            KeyAction::Insert(text) => {
                self.editor.open();
                self.editor.insert(&text);
            }
            KeyAction::Cmd(id) => {
                // An open command line commits first, then the command
                // runs.
                if self.editor.is_editing() {
                    if !self.commit(host) {
                        return;
                    }
                }
                self.rt.save_undo();
                let result = self
                    .rt
                    .alloc_value(&Value::Cmd(id))
                    .and_then(|ptr| {
                        self.rt
                            .enter_object(host, ptr)
                            .map_err(|e| e.kind())
                    });
                if let Err(kind) = result {
                    self.show_error(kind);
                }
                self.stack_view.invalidate();
            }
            KeyAction::Enter => {
                if self.editor.is_editing() {
                    self.commit(host);
                } else {
                    // Enter with no edit duplicates level 1.
                    self.apply(KeyAction::Cmd(rpl_types::Id::Dup), host);
                }
                self.stack_view.invalidate();
            }
            KeyAction::Backspace => {
                if self.editor.is_editing() {
                    self.editor.backspace();
                } else {
                    let _ = self.rt.pop();
                    self.stack_view.invalidate();
                }
            }
            KeyAction::Left => self.editor.left(),
            KeyAction::Right => self.editor.right(),
            KeyAction::Up => {
                if self.stack_view.interactive.is_some() {
                    self.stack_view.up(&self.rt);
                } else if !self.editor.is_editing() {
                    self.stack_view.enter_interactive();
                }
            }
            KeyAction::Down => {
                if self.stack_view.interactive == Some(1) {
                    self.stack_view.leave_interactive();
                } else {
                    self.stack_view.down();
                }
            }
            KeyAction::Soft(n) => {
                let action = self.menus.press(n, self.menu_plane);
                self.apply_menu(action, host);
            }
            KeyAction::VarMenu => {
                let menu = self.variables_menu();
                self.menus.open(menu);
            }
            KeyAction::CyclePrefix => self.cycle_prefix(),
            KeyAction::Exit => {
                if self.editor.is_editing() {
                    self.editor.clear();
                } else if self.rt.debugger().halted() {
                    self.rt.kill();
                } else {
                    self.quit = true;
                }
            }
            KeyAction::Nop => {}
        }
    }

    fn apply_menu(&mut self, action: MenuAction, host: &mut dyn Host) {
        match action {
            MenuAction::Insert(text) => {
                self.editor.open();
                self.editor.insert(&text);
            }
            MenuAction::Cmd(id) => self.apply(KeyAction::Cmd(id), host),
            MenuAction::Var(name) => {
                self.editor.open();
                self.editor.insert(&name);
            }
            MenuAction::Open(menu) => self.menus.open(menu),
            MenuAction::NextPage | MenuAction::PrevPage | MenuAction::Nop => {}
        }
    }

    /// Commit the command line; false when a syntax error kept it open.
    fn commit(&mut self, host: &mut dyn Host) -> bool {
        self.rt.save_undo();
        let settings = self.rt.settings.clone();
        match self.editor.commit(&settings) {
            Commit::Empty => true,
            Commit::Objects(objects) => {
                for obj in objects {
                    let result = self
                        .rt
                        .alloc_value(&obj)
                        .and_then(|ptr| {
                            self.rt.enter_object(host, ptr).map_err(|e| e.kind())
                        });
                    match result {
                        Ok(ProgramState::Done) => {}
                        Ok(ProgramState::Halted) => break,
                        Err(kind) => {
                            self.show_error(kind);
                            self.stack_view.invalidate();
                            return false;
                        }
                    }
                }
                self.stack_view.invalidate();
                true
            }
            Commit::SyntaxError { .. } => {
                self.show_error(ErrorKind::Syntax);
                false
            }
        }
    }

    fn show_error(&mut self, kind: ErrorKind) {
        let command = self.rt.error.take().and_then(|(_, cmd)| cmd);
        let banner = match command {
            Some(cmd) => format!("{kind} in {cmd}"),
            None => kind.to_string(),
        };
        debug!(%banner, "error banner");
        self.banner = Some(banner);
        if self.rt.settings.error_beep {
            self.pending_beep = Some((
                self.rt.settings.beep_frequency,
                self.rt.settings.beep_duration,
            ));
        }
    }

    /// Menu of the current directory's variables.
    fn variables_menu(&self) -> menu::MenuDef {
        use rpl_core::dir::VarKey;
        let entries = self
            .rt
            .dirs()
            .current_entries()
            .filter_map(|(key, _)| match key {
                VarKey::Name(name) => Some(menu::MenuEntry::new(
                    name,
                    MenuAction::Var(name.clone()),
                )),
                VarKey::Key(_) => None,
            })
            .collect();
        menu::MenuDef::new("VARS", entries)
    }

    /// Cycle the SI prefix on the unit word before the cursor,
    /// honoring a `UnitPrefixCycle` text variable.
    fn cycle_prefix(&mut self) {
        use rpl_core::dir::{Binding, VarKey};
        let override_cycle = match self.rt.dirs().recall(&VarKey::name("UnitPrefixCycle")) {
            Some(Binding::Value(ptr)) => match self.rt.decode(ptr) {
                Ok(Value::Text(text)) => {
                    Some(text.chars().map(|c| c.to_string()).collect::<Vec<_>>())
                }
                _ => None,
            },
            _ => None,
        };
        let default: Vec<String> = rpl_core::units::SI_PREFIX_CYCLE
            .iter()
            .map(|s| (*s).to_string())
            .collect();
        let cycle = override_cycle.unwrap_or(default);

        let buffer = self.editor.buffer().to_owned();
        let cursor = self.editor.cursor();
        let Some(underscore) = buffer[..cursor].rfind('_') else {
            return;
        };
        let word_start = underscore + 1;
        let word: String = buffer[word_start..cursor].to_owned();
        // Find the current prefix position in the cycle and step it.
        let (current_idx, stem) = cycle
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_empty() && word.starts_with(p.as_str()))
            .map(|(i, p)| (i, word[p.len()..].to_owned()))
            .next()
            .unwrap_or((0, word.clone()));
        let next = &cycle[(current_idx + 1) % cycle.len()];
        let replacement = format!("{next}{stem}");

        for _ in word.chars() {
            self.editor.backspace();
        }
        self.editor.insert(&replacement);
    }

    /// Send a synthetic key press+release, for automated tests and the
    /// embedder's scripting API.
    pub fn send_key(&mut self, code: u8, host: &mut dyn Host) {
        self.handle_event(
            KeyEvent {
                code,
                released: false,
                held: 0,
            },
            host,
        );
        self.handle_event(
            KeyEvent {
                code,
                released: true,
                held: 0,
            },
            host,
        );
    }

    /// Type a string through the editor, as the test harness does.
    pub fn type_text(&mut self, text: &str) {
        self.editor.open();
        self.editor.insert(text);
    }

    /// Draw the whole screen: header, stack, editor line, menu labels.
    pub fn draw(&mut self, surface: &mut dyn Surface) {
        let width = surface.width();
        let height = surface.height();
        surface.fill(Rect::new(0, 0, width, height), 0);

        // Header: directory path, shift planes, halt marker.
        let mut header = self.rt.dirs().path();
        if self.shift.planes().contains(keys::Planes::SHIFT) {
            header.push_str(" ⇧");
        }
        if self.shift.alpha() {
            header.push_str(" α");
        }
        if self.rt.debugger().halted() {
            header.push_str(" HLT");
            // Show the next object to evaluate as the stepping hint.
            if let Some(next) = self.rt.next_object() {
                if let Ok(value) = self.rt.decode(next) {
                    let hint = rpl_core::render::render(
                        &value,
                        &self.rt.settings,
                        rpl_core::render::RenderMode::Single,
                    );
                    header.push_str(" → ");
                    header.push_str(&hint);
                }
            }
        }
        surface.text(1, 1, &header, FontRole::Header);

        // Soft-key labels along the bottom.
        let visible = self.menus.visible();
        let cell_w = width / menu::SOFT_KEYS as u32;
        for (i, entry) in visible.iter().take(menu::SOFT_KEYS).enumerate() {
            let x = i as u32 * cell_w;
            surface.fill(
                Rect::new(x as i32, (height - MENU_HEIGHT) as i32, cell_w - 1, MENU_HEIGHT),
                1,
            );
            surface.text(
                x as i32 + 2,
                (height - MENU_HEIGHT) as i32 + 2,
                &entry.label,
                FontRole::Menu,
            );
        }

        // Stack between header and menu (or the error banner).
        let rows_avail = ((height - HEADER_HEIGHT - MENU_HEIGHT) / 10).max(1) as usize;
        let editing = self.editor.is_editing();
        let stack_rows = rows_avail.saturating_sub(editing as usize);
        let rows = self
            .stack_view
            .layout(&self.rt, (width / 6) as usize, stack_rows);
        for (i, row) in rows.iter().enumerate() {
            let y = (height - MENU_HEIGHT)
                .saturating_sub(10 + (i as u32 + editing as u32) * 10);
            if y < HEADER_HEIGHT {
                break;
            }
            surface.text(1, y as i32, &row.text, FontRole::Stack);
            if self.stack_view.interactive == Some(row.level) {
                surface.invert(Rect::new(0, y as i32, width, 10));
            }
        }

        if let Some(banner) = &self.banner {
            surface.invert(Rect::new(0, HEADER_HEIGHT as i32, width, 10));
            surface.text(1, HEADER_HEIGHT as i32, banner, FontRole::Result);
        }

        // Editor line just above the menu.
        if editing {
            let y = (height - MENU_HEIGHT - 10) as i32;
            surface.text(1, y, self.editor.buffer(), FontRole::Editor);
            let cursor_x = 1 + self.editor.cursor() as i32 * 6;
            surface.invert(Rect::new(cursor_x, y, 2, 10));
        }
    }

    /// Serialize the framebuffer through the filesystem: the
    /// screenshot trigger.
    pub fn screenshot(
        &mut self,
        surface: &dyn Surface,
        fs: &mut dyn FileSys,
        name: &str,
    ) -> Result<(), crate::hal::FileError> {
        let bytes = surface.snapshot();
        fs.open(name, true)?;
        let mut written = 0;
        while written < bytes.len() {
            written += fs.write(&bytes[written..])?;
        }
        fs.close();
        Ok(())
    }

    /// The main loop the host installs: drain keys, draw, sleep on the
    /// queue.
    pub fn run(
        &mut self,
        surface: &mut dyn Surface,
        keys: &mut dyn KeyQueue,
        power: &mut dyn Power,
        clock: &mut dyn Clock,
    ) {
        while !self.quit {
            let event = keys.get(50);
            if let Some(event) = event {
                let mut host = HostAdapter::new(keys, power, clock);
                self.handle_event(event, &mut host);
            }
            self.draw(surface);
        }
    }
}
