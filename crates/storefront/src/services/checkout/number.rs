//! Human-readable order numbers.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use rand::Rng;

const PREFIX: &str = "CW";
const SUFFIX_LEN: usize = 6;
const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Produces candidate order numbers. Uniqueness is enforced by the store.
pub trait OrderNumberGenerator: Send + Sync {
    /// The next candidate.
    fn next_number(&self) -> String;
}

/// `CW-<base36 millisecond timestamp>-<6 random alphanumerics>`.
///
/// The timestamp part never repeats or goes backwards within one process,
/// even when two orders land in the same millisecond.
#[derive(Debug, Default)]
pub struct TimeOrderNumbers {
    last_millis: AtomicI64,
}

impl TimeOrderNumbers {
    /// Create a generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_millis(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let bump = |prev: i64| now.max(prev.saturating_add(1));
        let prev = self
            .last_millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| Some(bump(prev)))
            .unwrap_or_else(|prev| prev);
        bump(prev)
    }
}

impl OrderNumberGenerator for TimeOrderNumbers {
    fn next_number(&self) -> String {
        let millis = u64::try_from(self.next_millis()).unwrap_or_default();
        format!("{PREFIX}-{}-{}", base36(millis), random_suffix())
    }
}

fn base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_owned();
    }
    let mut digits = Vec::new();
    while n > 0 {
        let d = usize::try_from(n % 36).unwrap_or_default();
        digits.push(ALPHABET.get(d).copied().map_or('0', char::from));
        n /= 36;
    }
    digits.iter().rev().collect()
}

fn random_suffix() -> String {
    let mut rng = rand::rng();
    (0..SUFFIX_LEN)
        .map(|_| {
            let i = rng.random_range(0..ALPHABET.len());
            ALPHABET.get(i).copied().map_or('0', char::from)
        })
        .collect()
}
