// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide, expiring token map with reverse lookup, used for universal
//! enrolment tokens. One `Mutex` guards both the forward (token -> value) and
//! reverse (value -> token) views so replace-on-collision stays atomic.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How long past its stated expiry a token is still readable via
/// [`TokenMap::get_with_grace`], provided the caller can prove fingerprint
/// continuity. This is a deliberate usability concession, not a security
/// boundary: callers that don't need it should use [`TokenMap::get`].
const EXPIRY_GRACE: Duration = Duration::from_secs(30);

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// An in-memory `token -> (value, expiry)` map with a `value -> token`
/// reverse index, safe for concurrent use.
pub struct TokenMap<V> {
    inner: Mutex<Inner<V>>,
}

struct Inner<V> {
    forward: HashMap<String, Entry<V>>,
    reverse: HashMap<V, String>,
}

impl<V> Default for TokenMap<V>
where
    V: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> TokenMap<V>
where
    V: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner { forward: HashMap::new(), reverse: HashMap::new() }) }
    }

    /// Insert `token -> value` with the given time-to-live. Any prior entry
    /// whose value equals `value` is removed first, so a user's previous
    /// token is always replaced rather than left dangling.
    pub fn set(&self, token: String, value: V, ttl: Duration) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        reap(&mut inner);

        if let Some(old_token) = inner.reverse.remove(&value) {
            inner.forward.remove(&old_token);
        }

        let expires_at = Instant::now() + ttl;
        inner.reverse.insert(value.clone(), token.clone());
        inner.forward.insert(token, Entry { value, expires_at });
    }

    /// Look up by token. Expired entries are invisible.
    pub fn get(&self, token: &str) -> Option<V> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        reap(&mut inner);
        let entry = inner.forward.get(token)?;
        (entry.expires_at > Instant::now()).then(|| entry.value.clone())
    }

    /// Look up by token allowing a short grace window past expiry. Returns
    /// `(value, expired)` so the caller can decide whether to treat the hit
    /// as fully valid or as an already-expired-but-still-visible grace hit.
    pub fn get_with_grace(&self, token: &str) -> Option<(V, bool)> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        reap(&mut inner);
        let entry = inner.forward.get(token)?;
        let now = Instant::now();
        if entry.expires_at > now {
            Some((entry.value.clone(), false))
        } else if entry.expires_at + EXPIRY_GRACE > now {
            Some((entry.value.clone(), true))
        } else {
            None
        }
    }

    /// Reverse lookup: find the (token, expiry) pair for a given value.
    pub fn get_by_value(&self, value: &V) -> Option<(String, Instant)> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        reap(&mut inner);
        let token = inner.reverse.get(value)?.clone();
        let expires_at = inner.forward.get(&token)?.expires_at;
        Some((token, expires_at))
    }

    /// Remove any entry for the given value, if present.
    pub fn remove_by_value(&self, value: &V) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = inner.reverse.remove(value) {
            inner.forward.remove(&token);
        }
    }
}

/// Drop entries that have aged out past their grace window. Cheap relative
/// to the lock already held by every public method, so there is no separate
/// background sweeper.
fn reap<V: Eq + Hash + Clone>(inner: &mut Inner<V>) {
    let now = Instant::now();
    let stale: Vec<String> = inner
        .forward
        .iter()
        .filter(|(_, entry)| entry.expires_at + EXPIRY_GRACE <= now)
        .map(|(token, _)| token.clone())
        .collect();

    for token in stale {
        if let Some(entry) = inner.forward.remove(&token) {
            inner.reverse.remove(&entry.value);
        }
    }
}

#[cfg(test)]
#[path = "token_map_tests.rs"]
mod tests;
