//! End-to-end UI flows over the simulated hardware.

use rpl_core::object::Value;
use rpl_ui::hal::Surface;
use rpl_ui::keys::key;
use rpl_ui::session::{HostAdapter, Session};
use rpl_ui::sim::{SimClock, SimFs, SimKeys, SimPower, SimSurface};
use rpl_ui::state::{keys as state_keys, StateStore};

struct Rig {
    session: Session,
    keys: SimKeys,
    power: SimPower,
    clock: SimClock,
}

impl Rig {
    fn new() -> Rig {
        Rig {
            session: Session::new(),
            keys: SimKeys::new(),
            power: SimPower::default(),
            clock: SimClock::new(1),
        }
    }

    fn tap(&mut self, code: u8) {
        let mut host = HostAdapter::new(&mut self.keys, &mut self.power, &mut self.clock);
        self.session.send_key(code, &mut host);
    }

    fn type_and_enter(&mut self, text: &str) {
        self.session.type_text(text);
        self.tap(key::ENTER);
    }

    fn top(&self) -> Value {
        let rt = &self.session.rt;
        let ptr = *rt.stack().last().expect("stack value");
        rt.decode(ptr).expect("decode")
    }
}

#[test]
fn digits_enter_and_add() {
    let mut rig = Rig::new();
    rig.tap(key::DIGIT0 + 2);
    rig.tap(key::ENTER);
    rig.tap(key::DIGIT0 + 3);
    rig.tap(key::ENTER);
    rig.tap(key::ADD);
    assert_eq!(rig.session.rt.depth(), 1);
    assert_eq!(rig.top(), Value::Int(5));
}

#[test]
fn typed_command_lines_run() {
    let mut rig = Rig::new();
    rig.type_and_enter("« dup * » 'sq2' sto 7 sq2");
    assert_eq!(rig.top(), Value::Int(49));
}

#[test]
fn errors_raise_the_banner_and_keep_the_stack() {
    let mut rig = Rig::new();
    rig.type_and_enter("1_m 1_s +");
    let banner = rig.session.banner.clone().expect("banner shown");
    assert!(banner.contains("Inconsistent units"));
    assert!(banner.contains('+'));
    assert_eq!(rig.session.rt.depth(), 2);
    assert!(rig.session.pending_beep.is_some());

    // The next key clears the banner.
    rig.tap(key::DIGIT0 + 1);
    assert!(rig.session.banner.is_none());
}

#[test]
fn syntax_errors_keep_the_editor_open() {
    let mut rig = Rig::new();
    rig.session.type_text("\"unterminated");
    // Break the auto-paired quote by removing the closer.
    rig.session.editor.backspace();
    rig.tap(key::ENTER);
    assert!(rig.session.banner.is_some());
    assert!(rig.session.editor.is_editing());
}

#[test]
fn halt_shows_in_the_header_and_exit_kills() {
    let mut rig = Rig::new();
    rig.type_and_enter("« 1 halt 2 » eval");
    assert!(rig.session.rt.debugger().halted());

    let mut surface = SimSurface::new(400, 240);
    rig.session.draw(&mut surface);
    assert!(surface.lit() > 0);

    rig.tap(key::EXIT);
    assert!(!rig.session.rt.debugger().halted());
}

#[test]
fn backspace_drops_outside_an_edit() {
    let mut rig = Rig::new();
    rig.type_and_enter("1 2 3");
    assert_eq!(rig.session.rt.depth(), 3);
    rig.tap(key::BKSP);
    assert_eq!(rig.session.rt.depth(), 2);
}

#[test]
fn interactive_stack_walks_with_the_arrows() {
    let mut rig = Rig::new();
    rig.type_and_enter("10 20 30");
    rig.tap(key::UP);
    assert_eq!(rig.session.stack_view.interactive, Some(1));
    rig.tap(key::UP);
    assert_eq!(rig.session.stack_view.interactive, Some(2));
    rig.tap(key::DOWN);
    rig.tap(key::DOWN);
    assert_eq!(rig.session.stack_view.interactive, None);
}

#[test]
fn screenshot_serializes_the_framebuffer() {
    let mut rig = Rig::new();
    rig.type_and_enter("42");
    let mut surface = SimSurface::new(400, 240);
    rig.session.draw(&mut surface);

    let mut fs = SimFs::new();
    rig.session
        .screenshot(&surface, &mut fs, "shot.simg")
        .unwrap();
    let bytes = fs.contents("shot.simg").unwrap();
    assert_eq!(&bytes[..4], b"SIMG");
    assert_eq!(bytes.len(), 12 + 400 * 240);
}

#[test]
fn persisted_state_survives_the_filesystem() {
    let mut fs = SimFs::new();
    let mut store = StateStore::new();
    store.put(state_keys::STATE_PATH, b"main.rpl".to_vec());
    store.save_file(&mut fs).unwrap();

    let loaded = StateStore::load_file(&mut fs).unwrap();
    assert_eq!(loaded.get(state_keys::STATE_PATH), Some(&b"main.rpl"[..]));

    // Corruption falls back to a cold start.
    let mut broken = fs.contents(rpl_ui::state::STATE_FILE).unwrap().to_vec();
    broken[0] ^= 0xff;
    fs.preload(rpl_ui::state::STATE_FILE, broken);
    assert!(StateStore::load_file(&mut fs).is_none());
}

#[test]
fn evaluation_polls_the_exit_key() {
    let mut rig = Rig::new();
    // Queue an exit press, then start a long computation; the adapter
    // sees the exit mid-run and aborts.
    rig.keys.tap(key::EXIT);
    rig.session.type_text("« 1 2 3 4 5 6 7 8 » eval");
    rig.tap(key::ENTER);
    assert!(rig.session.banner.is_some());
    assert!(rig.session.rt.debugger().was_aborted());
}

#[test]
fn user_key_assignments_take_priority() {
    use rpl_core::dir::VarKey;
    use rpl_core::settings::UserMode;

    let mut rig = Rig::new();
    rig.type_and_enter("\"42\"");
    let text = rig.session.rt.pop().unwrap();
    rig.session
        .rt
        .dirs_mut()
        .store(VarKey::Key(key::DIGIT0 as u32), text);
    rig.session.rt.settings.user_mode = UserMode::Locked;

    rig.tap(key::DIGIT0);
    // The assigned text inserted instead of the digit 0.
    assert_eq!(rig.session.editor.buffer(), "42");
}
