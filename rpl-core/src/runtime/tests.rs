use rpl_types::{ErrorKind, Id};

use crate::object::{ObjPtr, Value};
use crate::runtime::Runtime;

fn int(rt: &mut Runtime, v: i64) -> ObjPtr {
    rt.alloc_value(&Value::Int(v)).unwrap()
}

#[test]
fn alloc_and_decode_round_trip() {
    let mut rt = Runtime::default();
    let ptr = int(&mut rt, 42);
    assert_eq!(rt.decode(ptr).unwrap(), Value::Int(42));
    assert_eq!(rt.tag(ptr).unwrap(), Id::Integer);
}

#[test]
fn gc_reclaims_unreferenced_temporaries() {
    let mut rt = Runtime::default();
    let _dead = int(&mut rt, 1);
    let live = int(&mut rt, 2);
    rt.push(live).unwrap();
    let used_before = rt.heap().len();

    rt.gc();

    assert!(rt.heap().len() < used_before);
    let live = rt.stack()[0];
    assert_eq!(rt.decode(live).unwrap(), Value::Int(2));
    assert_eq!(rt.gc_stats().cycles, 1);
}

#[test]
fn gc_rewrites_stack_and_pinned_handles() {
    let mut rt = Runtime::default();
    let _dead = int(&mut rt, 111);
    let a = int(&mut rt, 7);
    let b = int(&mut rt, 9);
    rt.push(b).unwrap();
    let pin = rt.pin(a);

    rt.gc();

    let a = rt.pinned(&pin);
    assert_eq!(rt.decode(a).unwrap(), Value::Int(7));
    assert_eq!(rt.decode(rt.stack()[0]).unwrap(), Value::Int(9));
    rt.unpin(pin);

    // With the pin released the object is garbage.
    let live_before = rt.heap().len();
    rt.gc();
    assert!(rt.heap().len() < live_before);
}

#[test]
fn gc_keeps_directory_variables() {
    let mut rt = Runtime::default();
    let _dead = int(&mut rt, 0);
    let v = int(&mut rt, 5);
    rt.dirs_mut().store(crate::dir::VarKey::name("x"), v);

    rt.gc();

    let binding = rt.dirs().recall(&crate::dir::VarKey::name("x")).unwrap();
    match binding {
        crate::dir::Binding::Value(ptr) => {
            assert_eq!(rt.decode(ptr).unwrap(), Value::Int(5));
        }
        other => panic!("unexpected binding {other:?}"),
    }
}

#[test]
fn interior_pointers_keep_the_container_alive() {
    let mut rt = Runtime::default();
    let list = rt
        .alloc_value(&Value::List(vec![Value::Int(1), Value::Int(2)]))
        .unwrap();
    // Point at the second element, not the list header.
    let first_len = {
        let header = rt.size(list).unwrap();
        let _ = header;
        let body_at = {
            // tag + body length are one byte each for this small list
            list.index() + 2
        };
        crate::object::object_size(rt.heap(), body_at).unwrap()
    };
    let inner = ObjPtr((list.index() + 2 + first_len) as u32);
    assert_eq!(rt.decode(inner).unwrap(), Value::Int(2));

    rt.push(inner).unwrap();
    rt.gc();

    let inner = rt.stack()[0];
    assert_eq!(rt.decode(inner).unwrap(), Value::Int(2));
}

#[test]
fn allocation_fails_cleanly_when_exhausted() {
    let mut rt = Runtime::with_capacity(64);
    let mut kept = Vec::new();
    loop {
        match rt.alloc_value(&Value::Text("0123456789".into())) {
            Ok(ptr) => {
                rt.push(ptr).unwrap();
                kept.push(ptr);
            }
            Err(kind) => {
                assert_eq!(kind, ErrorKind::OutOfMemory);
                break;
            }
        }
        assert!(kept.len() < 100, "capacity never enforced");
    }
}

#[test]
fn scratch_commit_assembles_containers_in_place() {
    let mut rt = Runtime::default();
    let mark = rt.scratch_mark();
    rt.scratch_push(&Value::Int(1));
    rt.scratch_push(&Value::Sym("x".into()));
    rt.scratch_push(&Value::Cmd(Id::Add));
    let ptr = rt.scratch_commit(Id::Expression, mark).unwrap();

    assert_eq!(
        rt.decode(ptr).unwrap(),
        Value::Expr(vec![
            Value::Int(1),
            Value::Sym("x".into()),
            Value::Cmd(Id::Add)
        ])
    );
}

#[test]
fn scratch_abort_discards_partial_bodies() {
    let mut rt = Runtime::default();
    let mark = rt.scratch_mark();
    rt.scratch_push(&Value::Int(1));
    rt.scratch_abort(mark);
    assert_eq!(rt.scratch_mark(), mark);
}

#[test]
fn undo_restores_the_previous_stack() {
    let mut rt = Runtime::default();
    let a = int(&mut rt, 1);
    rt.push(a).unwrap();
    rt.save_undo();
    let b = int(&mut rt, 2);
    rt.push(b).unwrap();
    assert_eq!(rt.depth(), 2);

    rt.undo().unwrap();
    assert_eq!(rt.depth(), 1);
    assert_eq!(rt.decode(rt.stack()[0]).unwrap(), Value::Int(1));
}

#[test]
fn error_slot_keeps_the_first_failure() {
    let mut rt = Runtime::default();
    let _: Result<(), _> = rt.fail(ErrorKind::Type, Some(Id::Add));
    let _: Result<(), _> = rt.fail(ErrorKind::Value, Some(Id::Mul));
    assert_eq!(rt.error.take(), Some((ErrorKind::Type, Some(Id::Add))));
    assert_eq!(rt.error.take(), None);
}
