// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use proptest::prelude::*;

use super::*;

proptest! {
    /// After any sequence of distinct tokens bound to the same value, exactly
    /// one of them is live and it is the most recently set one — forward and
    /// reverse stay mutually consistent regardless of how many replacements
    /// happened first.
    #[test]
    fn replace_on_collision_keeps_forward_and_reverse_consistent(tokens in prop::collection::vec("[a-z]{4,8}", 2..12)) {
        let map: TokenMap<String> = TokenMap::new();
        let distinct: Vec<String> = tokens.into_iter().collect::<std::collections::BTreeSet<_>>().into_iter().collect();
        prop_assume!(distinct.len() >= 2);

        for token in &distinct {
            map.set(token.clone(), "same-value".to_owned(), Duration::from_secs(60));
        }

        let last = distinct.last().unwrap();
        for token in &distinct[..distinct.len() - 1] {
            prop_assert_eq!(map.get(token), None);
        }
        prop_assert_eq!(map.get(last), Some("same-value".to_owned()));

        let (reverse_token, _expiry) = map.get_by_value(&"same-value".to_owned()).expect("present");
        prop_assert_eq!(&reverse_token, last);
    }
}

#[test]
fn set_then_get_round_trips() {
    let map: TokenMap<String> = TokenMap::new();
    map.set("tok-1".to_owned(), "user-42".to_owned(), Duration::from_secs(60));
    assert_eq!(map.get("tok-1"), Some("user-42".to_owned()));
}

#[test]
fn get_by_value_reverse_lookup() {
    let map: TokenMap<String> = TokenMap::new();
    map.set("tok-1".to_owned(), "user-42".to_owned(), Duration::from_secs(60));
    let (token, _expiry) = map.get_by_value(&"user-42".to_owned()).expect("present");
    assert_eq!(token, "tok-1");
}

#[test]
fn set_replaces_prior_token_for_same_value() {
    let map: TokenMap<String> = TokenMap::new();
    map.set("tok-old".to_owned(), "user-42".to_owned(), Duration::from_secs(60));
    map.set("tok-new".to_owned(), "user-42".to_owned(), Duration::from_secs(60));

    assert_eq!(map.get("tok-old"), None, "prior token must be evicted on replace");
    assert_eq!(map.get("tok-new"), Some("user-42".to_owned()));
    let (token, _) = map.get_by_value(&"user-42".to_owned()).expect("present");
    assert_eq!(token, "tok-new");
}

#[test]
fn expired_entry_invisible_to_get() {
    let map: TokenMap<String> = TokenMap::new();
    map.set("tok-1".to_owned(), "user-1".to_owned(), Duration::from_millis(0));
    std::thread::sleep(Duration::from_millis(5));
    assert_eq!(map.get("tok-1"), None);
}

#[test]
fn expired_entry_visible_with_grace_flag() {
    let map: TokenMap<String> = TokenMap::new();
    map.set("tok-1".to_owned(), "user-1".to_owned(), Duration::from_millis(0));
    std::thread::sleep(Duration::from_millis(5));

    let (value, expired) = map.get_with_grace("tok-1").expect("within grace window");
    assert_eq!(value, "user-1");
    assert!(expired);
}

#[test]
fn remove_by_value_clears_both_directions() {
    let map: TokenMap<String> = TokenMap::new();
    map.set("tok-1".to_owned(), "user-1".to_owned(), Duration::from_secs(60));
    map.remove_by_value(&"user-1".to_owned());

    assert_eq!(map.get("tok-1"), None);
    assert!(map.get_by_value(&"user-1".to_owned()).is_none());
}
