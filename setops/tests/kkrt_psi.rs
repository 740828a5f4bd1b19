//! End-to-end tests for the KKRT-PSI scheme.

use seclink::unix_channel_pair;
use serde_json::{json, Value};
use setops::{
    factory::{create_psi, PsiScheme},
    Error,
};

fn params(is_sender: bool, epsilon: f64, sender_obtain_result: bool) -> Value {
    json!({
        "common": {
            "is_sender": is_sender,
            "verbose": false
        },
        "kkrt_psi_params": {
            "epsilon": epsilon,
            "fun_num": 3,
            "sender_obtain_result": sender_obtain_result
        }
    })
}

fn sender_keys() -> Vec<String> {
    ["c", "h", "e", "g", "y", "z"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn receiver_keys() -> Vec<String> {
    ["b", "c", "e", "g"].iter().map(|s| s.to_string()).collect()
}

fn expected() -> Vec<String> {
    ["c", "e", "g"].iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_intersection_forwarded_to_sender() {
    let (mut left, mut right) = unix_channel_pair();
    let handle = std::thread::spawn(move || {
        let mut psi = create_psi(PsiScheme::Kkrt).unwrap();
        psi.init(&mut left, &params(true, 1.27, true)).unwrap();
        let keys = psi.preprocess_data(&mut left, &sender_keys()).unwrap();
        psi.process(&mut left, &keys).unwrap()
    });
    let mut psi = create_psi(PsiScheme::Kkrt).unwrap();
    psi.init(&mut right, &params(false, 1.27, true)).unwrap();
    let ours = psi.process(&mut right, &receiver_keys()).unwrap();
    let theirs = handle.join().unwrap();
    assert_eq!(ours, expected());
    assert_eq!(theirs, expected());
}

#[test]
fn test_sender_opts_out() {
    let (mut left, mut right) = unix_channel_pair();
    let handle = std::thread::spawn(move || {
        let mut psi = create_psi(PsiScheme::Kkrt).unwrap();
        psi.init(&mut left, &params(true, 1.27, false)).unwrap();
        psi.process(&mut left, &sender_keys()).unwrap()
    });
    let mut psi = create_psi(PsiScheme::Kkrt).unwrap();
    psi.init(&mut right, &params(false, 1.27, false)).unwrap();
    let ours = psi.process(&mut right, &receiver_keys()).unwrap();
    let theirs = handle.join().unwrap();
    assert_eq!(ours, expected());
    assert!(theirs.is_empty());
}

#[test]
fn test_low_epsilon_aborts_with_stash_on_both_sides() {
    let (mut left, mut right) = unix_channel_pair();
    let handle = std::thread::spawn(move || {
        let mut psi = create_psi(PsiScheme::Kkrt).unwrap();
        psi.init(&mut left, &params(true, 0.27, true)).unwrap();
        psi.process(&mut left, &sender_keys())
    });
    let mut psi = create_psi(PsiScheme::Kkrt).unwrap();
    psi.init(&mut right, &params(false, 0.27, true)).unwrap();
    let ours = psi.process(&mut right, &receiver_keys());
    let theirs = handle.join().unwrap();
    for result in [ours, theirs] {
        match result {
            Err(Error::StashNonEmpty) => (),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }
}

#[test]
fn test_cardinality() {
    let (mut left, mut right) = unix_channel_pair();
    let handle = std::thread::spawn(move || {
        let mut psi = create_psi(PsiScheme::Kkrt).unwrap();
        psi.init(&mut left, &params(true, 1.27, true)).unwrap();
        psi.process_cardinality_only(&mut left, &sender_keys())
            .unwrap()
    });
    let mut psi = create_psi(PsiScheme::Kkrt).unwrap();
    psi.init(&mut right, &params(false, 1.27, true)).unwrap();
    let ours = psi
        .process_cardinality_only(&mut right, &receiver_keys())
        .unwrap();
    let theirs = handle.join().unwrap();
    assert_eq!(ours, 3);
    assert_eq!(theirs, 3);
}

#[test]
fn test_epsilon_disagreement_raises_on_both_sides() {
    let (mut left, mut right) = unix_channel_pair();
    let handle = std::thread::spawn(move || {
        let mut psi = create_psi(PsiScheme::Kkrt).unwrap();
        psi.init(&mut left, &params(true, 1.27, true))
    });
    let mut psi = create_psi(PsiScheme::Kkrt).unwrap();
    let ours = psi.init(&mut right, &params(false, 1.28, true));
    let theirs = handle.join().unwrap();
    for result in [ours, theirs] {
        match result {
            Err(Error::InconsistentParameter { label, .. }) => assert_eq!(label, "epsilon"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }
}
