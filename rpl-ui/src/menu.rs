//! Soft-key menus.
//!
//! Six keys × three planes per page; automatic pagination claims the
//! rightmost column for `▶`/`◀` when entries overflow a page. A
//! bounded history lets Back pop to the previous menu. Entry markers
//! are hints the renderer paints (directory folders, toggles, the
//! active choice).

use rpl_types::Id;

/// Soft keys per row.
pub const SOFT_KEYS: usize = 6;
/// Rows (planes) shown per page.
pub const MENU_PLANES: usize = 3;
/// Entries on a full page.
pub const PAGE_ENTRIES: usize = SOFT_KEYS * MENU_PLANES;
/// Menu history depth.
pub const HISTORY_DEPTH: usize = 8;

/// Marker painted on a menu label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Marker {
    /// Plain entry.
    #[default]
    None,
    /// Directory-like entry (opens a submenu).
    Folder,
    /// Toggle currently off.
    Unset,
    /// Toggle currently on.
    Set,
    /// Pagination arrow.
    Pager,
}

/// What pressing an entry does.
#[derive(Debug, Clone, PartialEq)]
pub enum MenuAction {
    /// Insert text into the command line.
    Insert(String),
    /// Execute a command.
    Cmd(Id),
    /// Recall or run a variable by name.
    Var(String),
    /// Open another menu.
    Open(MenuDef),
    /// Next page of the current menu.
    NextPage,
    /// Previous page of the current menu.
    PrevPage,
    /// Nothing.
    Nop,
}

/// One soft-key entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuEntry {
    /// Label shown on the key.
    pub label: String,
    /// Action on press.
    pub action: MenuAction,
    /// Renderer hint.
    pub marker: Marker,
}

impl MenuEntry {
    /// A plain entry.
    pub fn new(label: &str, action: MenuAction) -> MenuEntry {
        MenuEntry {
            label: label.to_owned(),
            action,
            marker: Marker::None,
        }
    }

    fn pager(label: &str, action: MenuAction) -> MenuEntry {
        MenuEntry {
            label: label.to_owned(),
            action,
            marker: Marker::Pager,
        }
    }
}

/// A menu definition: a titled list of entries, paginated on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuDef {
    /// Menu title for the header.
    pub title: String,
    /// All entries, pre-pagination.
    pub entries: Vec<MenuEntry>,
}

impl MenuDef {
    /// A menu from a title and entries.
    pub fn new(title: &str, entries: Vec<MenuEntry>) -> MenuDef {
        MenuDef {
            title: title.to_owned(),
            entries,
        }
    }

    fn pages(&self) -> usize {
        if self.entries.len() <= PAGE_ENTRIES {
            1
        } else {
            // The rightmost column of every row goes to the pager keys.
            let per_page = PAGE_ENTRIES - MENU_PLANES;
            self.entries.len().div_ceil(per_page)
        }
    }
}

/// The live menu state: current definition, page, history.
#[derive(Debug, Clone, Default)]
pub struct MenuState {
    current: Option<MenuDef>,
    page: usize,
    history: Vec<(MenuDef, usize)>,
}

impl MenuState {
    /// Currently displayed menu.
    pub fn current(&self) -> Option<&MenuDef> {
        self.current.as_ref()
    }

    /// Current page index.
    pub fn page(&self) -> usize {
        self.page
    }

    /// Open a menu, pushing the current one onto the history.
    pub fn open(&mut self, menu: MenuDef) {
        if let Some(previous) = self.current.take() {
            if self.history.len() == HISTORY_DEPTH {
                self.history.remove(0);
            }
            self.history.push((previous, self.page));
        }
        self.current = Some(menu);
        self.page = 0;
    }

    /// Pop to the previous menu.
    pub fn back(&mut self) {
        if let Some((menu, page)) = self.history.pop() {
            self.current = Some(menu);
            self.page = page;
        } else {
            self.current = None;
            self.page = 0;
        }
    }

    /// The visible page, pager keys included, padded to a full grid.
    pub fn visible(&self) -> Vec<MenuEntry> {
        let Some(menu) = &self.current else {
            return Vec::new();
        };
        let pages = menu.pages();
        if pages == 1 {
            let mut out = menu.entries.clone();
            out.resize(PAGE_ENTRIES.min(out.len().div_ceil(SOFT_KEYS) * SOFT_KEYS), MenuEntry::new("", MenuAction::Nop));
            return out;
        }
        let per_row = SOFT_KEYS - 1;
        let per_page = per_row * MENU_PLANES;
        let start = self.page * per_page;
        let mut out = Vec::with_capacity(PAGE_ENTRIES);
        for row in 0..MENU_PLANES {
            let row_start = start + row * per_row;
            for i in 0..per_row {
                let entry = menu
                    .entries
                    .get(row_start + i)
                    .cloned()
                    .unwrap_or_else(|| MenuEntry::new("", MenuAction::Nop));
                out.push(entry);
            }
            // Rightmost column: forward pager on the first row,
            // backward pager on the second.
            let pager = match row {
                0 => MenuEntry::pager("▶", MenuAction::NextPage),
                1 if self.page > 0 => MenuEntry::pager("◀", MenuAction::PrevPage),
                _ => MenuEntry::new("", MenuAction::Nop),
            };
            out.push(pager);
        }
        out
    }

    /// Resolve a soft key press on the given plane to an action, and
    /// apply pagination internally.
    pub fn press(&mut self, soft: usize, plane: usize) -> MenuAction {
        let visible = self.visible();
        let index = plane * SOFT_KEYS + soft;
        let action = visible
            .get(index)
            .map(|e| e.action.clone())
            .unwrap_or(MenuAction::Nop);
        match action {
            MenuAction::NextPage => {
                let pages = self.current.as_ref().map(MenuDef::pages).unwrap_or(1);
                self.page = (self.page + 1) % pages;
                MenuAction::Nop
            }
            MenuAction::PrevPage => {
                self.page = self.page.saturating_sub(1);
                MenuAction::Nop
            }
            other => other,
        }
    }
}

/// The built-in top-level menus.
pub fn main_menu() -> MenuDef {
    MenuDef::new(
        "MAIN",
        vec![
            MenuEntry::new("MATH", MenuAction::Open(math_menu())),
            MenuEntry::new("STK", MenuAction::Open(stack_menu())),
            MenuEntry::new("BASE", MenuAction::Open(base_menu())),
            MenuEntry::new("UNIT", MenuAction::Insert("_".into())),
            MenuEntry::new("EVAL", MenuAction::Cmd(Id::Eval)),
            MenuEntry::new("UNDO", MenuAction::Cmd(Id::Undo)),
        ],
    )
}

/// Math function menu.
pub fn math_menu() -> MenuDef {
    MenuDef::new(
        "MATH",
        vec![
            MenuEntry::new("SIN", MenuAction::Cmd(Id::Sin)),
            MenuEntry::new("COS", MenuAction::Cmd(Id::Cos)),
            MenuEntry::new("TAN", MenuAction::Cmd(Id::Tan)),
            MenuEntry::new("√", MenuAction::Cmd(Id::Sqrt)),
            MenuEntry::new("EXP", MenuAction::Cmd(Id::Exp)),
            MenuEntry::new("LN", MenuAction::Cmd(Id::Ln)),
            MenuEntry::new("ABS", MenuAction::Cmd(Id::Abs)),
            MenuEntry::new("INV", MenuAction::Cmd(Id::Inv)),
            MenuEntry::new("SQ", MenuAction::Cmd(Id::Sq)),
            MenuEntry::new("HYPOT", MenuAction::Cmd(Id::Hypot)),
            MenuEntry::new("ATAN2", MenuAction::Cmd(Id::Atan2)),
            MenuEntry::new("MOD", MenuAction::Cmd(Id::Mod)),
            MenuEntry::new("REM", MenuAction::Cmd(Id::Rem)),
            MenuEntry::new("∂", MenuAction::Cmd(Id::Differentiate)),
            MenuEntry::new("∫", MenuAction::Cmd(Id::Integrate)),
            MenuEntry::new("DDAYS", MenuAction::Cmd(Id::DaysBetween)),
        ],
    )
}

/// Stack manipulation menu.
pub fn stack_menu() -> MenuDef {
    MenuDef::new(
        "STACK",
        vec![
            MenuEntry::new("DUP", MenuAction::Cmd(Id::Dup)),
            MenuEntry::new("DROP", MenuAction::Cmd(Id::Drop)),
            MenuEntry::new("SWAP", MenuAction::Cmd(Id::Swap)),
            MenuEntry::new("OVER", MenuAction::Cmd(Id::Over)),
            MenuEntry::new("ROT", MenuAction::Cmd(Id::Rot)),
            MenuEntry::new("PICK", MenuAction::Cmd(Id::Pick)),
            MenuEntry::new("ROLL", MenuAction::Cmd(Id::Roll)),
            MenuEntry::new("DEPTH", MenuAction::Cmd(Id::Depth)),
            MenuEntry::new("CLEAR", MenuAction::Cmd(Id::ClearStack)),
        ],
    )
}

/// Based-integer menu.
pub fn base_menu() -> MenuDef {
    MenuDef::new(
        "BASE",
        vec![
            MenuEntry::new("#", MenuAction::Insert("#".into())),
            MenuEntry::new("AND", MenuAction::Cmd(Id::And)),
            MenuEntry::new("OR", MenuAction::Cmd(Id::Or)),
            MenuEntry::new("XOR", MenuAction::Cmd(Id::Xor)),
            MenuEntry::new("NOT", MenuAction::Cmd(Id::BitNot)),
            MenuEntry::new("SL", MenuAction::Cmd(Id::ShiftLeft)),
            MenuEntry::new("SR", MenuAction::Cmd(Id::ShiftRight)),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big_menu(n: usize) -> MenuDef {
        let entries = (0..n)
            .map(|i| MenuEntry::new(&format!("E{i}"), MenuAction::Insert(format!("{i}"))))
            .collect();
        MenuDef::new("BIG", entries)
    }

    #[test]
    fn small_menus_fit_one_page() {
        let mut state = MenuState::default();
        state.open(stack_menu());
        let visible = state.visible();
        assert!(visible.len() <= PAGE_ENTRIES);
        assert!(visible.iter().all(|e| e.marker != Marker::Pager));
    }

    #[test]
    fn overflowing_menus_gain_pager_keys() {
        let mut state = MenuState::default();
        state.open(big_menu(40));
        let visible = state.visible();
        assert_eq!(visible.len(), PAGE_ENTRIES);
        // Rightmost key of the first row pages forward.
        assert_eq!(visible[SOFT_KEYS - 1].label, "▶");
        assert_eq!(visible[SOFT_KEYS - 1].marker, Marker::Pager);

        // Page forward, then the second row offers the way back.
        state.press(SOFT_KEYS - 1, 0);
        assert_eq!(state.page(), 1);
        let visible = state.visible();
        assert_eq!(visible[2 * SOFT_KEYS - 1].label, "◀");

        // The first entry of page two continues the sequence.
        assert_eq!(visible[0].label, "E15");
    }

    #[test]
    fn pagination_wraps_forward() {
        let mut state = MenuState::default();
        state.open(big_menu(20));
        // 15 per paginated page → 2 pages.
        state.press(SOFT_KEYS - 1, 0);
        assert_eq!(state.page(), 1);
        state.press(SOFT_KEYS - 1, 0);
        assert_eq!(state.page(), 0);
    }

    #[test]
    fn history_pops_in_order_and_is_bounded() {
        let mut state = MenuState::default();
        state.open(main_menu());
        state.open(math_menu());
        state.open(stack_menu());
        assert_eq!(state.current().unwrap().title, "STACK");
        state.back();
        assert_eq!(state.current().unwrap().title, "MATH");
        state.back();
        assert_eq!(state.current().unwrap().title, "MAIN");
        state.back();
        assert!(state.current().is_none());

        // Depth bound: the oldest entries fall off.
        for i in 0..(HISTORY_DEPTH + 3) {
            state.open(big_menu(i + 1));
        }
        let mut depth = 0;
        while state.current().is_some() {
            state.back();
            depth += 1;
        }
        assert!(depth <= HISTORY_DEPTH + 1);
    }

    #[test]
    fn press_resolves_actions_by_plane() {
        let mut state = MenuState::default();
        state.open(math_menu());
        assert_eq!(state.press(0, 0), MenuAction::Cmd(Id::Sin));
        // Second plane, first key: entry 6.
        assert_eq!(state.press(0, 1), MenuAction::Cmd(Id::Abs));
    }
}
