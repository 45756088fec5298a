//! Oracle tests: the piece chain must agree byte-for-byte with a flat
//! `Vec<u8>` subjected to the same operations, and undo/redo must restore the
//! exact states the oracle recorded.

use core_text::Text;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Insert(usize, Vec<u8>),
    Delete(usize, usize),
    Replace(usize, usize, Vec<u8>),
    Snapshot,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<usize>(), proptest::collection::vec(any::<u8>(), 1..8))
            .prop_map(|(p, d)| Op::Insert(p, d)),
        (any::<usize>(), 1usize..16).prop_map(|(p, l)| Op::Delete(p, l)),
        (
            any::<usize>(),
            0usize..8,
            proptest::collection::vec(any::<u8>(), 0..8)
        )
            .prop_map(|(p, l, d)| Op::Replace(p, l, d)),
        Just(Op::Snapshot),
    ]
}

fn apply_oracle(oracle: &mut Vec<u8>, op: &Op) {
    match op {
        Op::Insert(pos, data) => {
            let pos = pos % (oracle.len() + 1);
            oracle.splice(pos..pos, data.iter().copied());
        }
        Op::Delete(pos, len) => {
            if oracle.is_empty() {
                return;
            }
            let pos = pos % oracle.len();
            let len = (*len).min(oracle.len() - pos);
            oracle.drain(pos..pos + len);
        }
        Op::Replace(pos, len, data) => {
            let pos = pos % (oracle.len() + 1);
            let len = (*len).min(oracle.len() - pos);
            oracle.splice(pos..pos + len, data.iter().copied());
        }
        Op::Snapshot => {}
    }
}

fn apply_text(text: &mut Text, oracle_len: usize, op: &Op) {
    match op {
        Op::Insert(pos, data) => {
            let pos = pos % (oracle_len + 1);
            text.insert(pos, data).unwrap();
        }
        Op::Delete(pos, len) => {
            if oracle_len == 0 {
                return;
            }
            let pos = pos % oracle_len;
            let len = (*len).min(oracle_len - pos);
            text.delete(pos, len).unwrap();
        }
        Op::Replace(pos, len, data) => {
            let pos = pos % (oracle_len + 1);
            let len = (*len).min(oracle_len - pos);
            text.replace(pos, len, data).unwrap();
        }
        Op::Snapshot => text.snapshot(),
    }
}

proptest! {
    #[test]
    fn piece_chain_matches_flat_oracle(ops in proptest::collection::vec(op_strategy(), 1..60)) {
        let mut text = Text::new();
        let mut oracle: Vec<u8> = Vec::new();
        for op in &ops {
            let len_before = oracle.len();
            apply_text(&mut text, len_before, op);
            apply_oracle(&mut oracle, op);
            prop_assert_eq!(text.size(), oracle.len());
            prop_assert_eq!(text.bytes(), oracle.clone());
            text.check_invariants();
        }
    }

    #[test]
    fn undo_restores_every_sealed_state(ops in proptest::collection::vec(op_strategy(), 1..40)) {
        let mut text = Text::new();
        let mut oracle: Vec<u8> = Vec::new();
        // States as sealed by snapshots, oldest first, starting at empty.
        let mut states: Vec<Vec<u8>> = vec![Vec::new()];
        let mut dirty = false;
        for op in &ops {
            let len_before = oracle.len();
            apply_text(&mut text, len_before, op);
            apply_oracle(&mut oracle, op);
            match op {
                Op::Snapshot if dirty => {
                    states.push(oracle.clone());
                    dirty = false;
                }
                Op::Snapshot => {}
                _ => dirty = oracle != *states.last().unwrap() || dirty,
            }
        }
        text.snapshot();
        if dirty {
            states.push(oracle.clone());
        }
        // Walk all the way back...
        for expected in states.iter().rev().skip(1) {
            prop_assert!(text.undo().is_some());
            prop_assert_eq!(&text.bytes(), expected);
        }
        prop_assert!(text.undo().is_none());
        // ...and forward again.
        for expected in states.iter().skip(1) {
            prop_assert!(text.redo().is_some());
            prop_assert_eq!(&text.bytes(), expected);
        }
        prop_assert!(text.redo().is_none());
    }
}

#[test]
fn coalesced_typing_is_one_piece_and_one_action() {
    let mut text = Text::new();
    text.insert(0, b"seed ").unwrap();
    text.snapshot();
    let actions_before = text.action_count();
    for (i, b) in b"burst".iter().enumerate() {
        text.insert(5 + i, &[*b]).unwrap();
    }
    text.snapshot();
    assert_eq!(text.action_count(), actions_before + 1);
    assert_eq!(text.bytes(), b"seed burst");
    // A single undo drops the whole burst.
    text.undo();
    assert_eq!(text.bytes(), b"seed ");
}

#[test]
fn dfs_visits_every_action_exactly_once() {
    let mut text = Text::new();
    text.insert(0, b"a").unwrap();
    text.snapshot();
    text.insert(1, b"b").unwrap();
    text.snapshot();
    text.undo();
    text.insert(1, b"c").unwrap();
    text.snapshot();
    text.undo();
    text.insert(1, b"d").unwrap();
    text.snapshot();
    let walk = text.history_dfs();
    assert_eq!(walk.len(), text.action_count());
    let mut sorted = walk.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), walk.len(), "dfs repeated an action");
}
