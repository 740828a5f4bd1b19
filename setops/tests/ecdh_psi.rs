//! End-to-end tests for the ECDH-PSI scheme, run as two threads over a
//! unix socketpair.

use seclink::unix_channel_pair;
use serde_json::{json, Value};
use setops::{
    factory::{create_psi, PsiScheme},
    Error,
};

fn sender_params(obtain_result: bool, curve_id: i64) -> Value {
    json!({
        "common": {
            "is_sender": true,
            "verbose": false
        },
        "ecdh_params": {
            "curve_id": curve_id,
            "obtain_result": obtain_result
        }
    })
}

fn receiver_params(obtain_result: bool, curve_id: i64) -> Value {
    json!({
        "common": {
            "is_sender": false,
            "verbose": false
        },
        "ecdh_params": {
            "curve_id": curve_id,
            "obtain_result": obtain_result
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
fn test_intersection_both_obtain() {
    let (mut left, mut right) = unix_channel_pair();
    let handle = std::thread::spawn(move || {
        let mut psi = create_psi(PsiScheme::Ecdh).unwrap();
        psi.init(&mut left, &sender_params(true, 415)).unwrap();
        let keys = psi.preprocess_data(&mut left, &sender_keys()).unwrap();
        psi.process(&mut left, &keys).unwrap()
    });
    let mut psi = create_psi(PsiScheme::Ecdh).unwrap();
    psi.init(&mut right, &receiver_params(true, 415)).unwrap();
    let ours = psi.process(&mut right, &receiver_keys()).unwrap();
    let theirs = handle.join().unwrap();
    assert_eq!(ours, expected());
    assert_eq!(theirs, expected());
}

#[test]
fn test_intersection_sender_opts_out() {
    let (mut left, mut right) = unix_channel_pair();
    let handle = std::thread::spawn(move || {
        let mut psi = create_psi(PsiScheme::Ecdh).unwrap();
        psi.init(&mut left, &sender_params(false, 415)).unwrap();
        psi.process(&mut left, &sender_keys()).unwrap()
    });
    let mut psi = create_psi(PsiScheme::Ecdh).unwrap();
    psi.init(&mut right, &receiver_params(true, 415)).unwrap();
    let ours = psi.process(&mut right, &receiver_keys()).unwrap();
    let theirs = handle.join().unwrap();
    assert_eq!(ours, expected());
    assert!(theirs.is_empty());
}

#[test]
fn test_cardinality() {
    let (mut left, mut right) = unix_channel_pair();
    let handle = std::thread::spawn(move || {
        let mut psi = create_psi(PsiScheme::Ecdh).unwrap();
        psi.init(&mut left, &sender_params(true, 415)).unwrap();
        psi.process_cardinality_only(&mut left, &sender_keys())
            .unwrap()
    });
    let mut psi = create_psi(PsiScheme::Ecdh).unwrap();
    psi.init(&mut right, &receiver_params(false, 415)).unwrap();
    let ours = psi
        .process_cardinality_only(&mut right, &receiver_keys())
        .unwrap();
    let theirs = handle.join().unwrap();
    // the receiver opted out, the sender still counts
    assert_eq!(ours, 0);
    assert_eq!(theirs, 3);
}

#[test]
fn test_curve_id_disagreement_raises_on_both_sides() {
    let (mut left, mut right) = unix_channel_pair();
    let handle = std::thread::spawn(move || {
        let mut psi = create_psi(PsiScheme::Ecdh).unwrap();
        psi.init(&mut left, &sender_params(true, 415))
    });
    let mut psi = create_psi(PsiScheme::Ecdh).unwrap();
    let ours = psi.init(&mut right, &receiver_params(true, 414));
    let theirs = handle.join().unwrap();
    for result in [ours, theirs] {
        match result {
            Err(Error::InconsistentParameter { label, .. }) => assert_eq!(label, "ecc_curve_id"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }
}

#[test]
fn test_unsupported_curve_id_rejected() {
    let (mut left, mut right) = unix_channel_pair();
    let handle = std::thread::spawn(move || {
        let mut psi = create_psi(PsiScheme::Ecdh).unwrap();
        psi.init(&mut left, &sender_params(true, 414))
    });
    let mut psi = create_psi(PsiScheme::Ecdh).unwrap();
    let ours = psi.init(&mut right, &receiver_params(true, 414));
    let theirs = handle.join().unwrap();
    for result in [ours, theirs] {
        match result {
            Err(Error::InvalidArgument(_)) => (),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }
}

#[test]
fn test_disjoint_sets_yield_empty_intersection() {
    let (mut left, mut right) = unix_channel_pair();
    let handle = std::thread::spawn(move || {
        let mut psi = create_psi(PsiScheme::Ecdh).unwrap();
        psi.init(&mut left, &sender_params(true, 415)).unwrap();
        psi.process(&mut left, &["p".to_string(), "q".to_string()])
            .unwrap()
    });
    let mut psi = create_psi(PsiScheme::Ecdh).unwrap();
    psi.init(&mut right, &receiver_params(true, 415)).unwrap();
    let ours = psi
        .process(&mut right, &["r".to_string(), "s".to_string()])
        .unwrap();
    let theirs = handle.join().unwrap();
    assert!(ours.is_empty());
    assert!(theirs.is_empty());
}
