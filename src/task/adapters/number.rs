//! Random task-number generator.

use crate::task::{domain::TaskNumber, ports::TaskNumberGenerator};
use chrono::{DateTime, Utc};
use uuid::Uuid;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SUFFIX_LEN: usize = 6;
/// Largest multiple of the alphabet size that fits in a byte. Bytes at or
/// above it are discarded so every symbol is equally likely.
const ACCEPT_BELOW: usize = 252;
/// Byte positions of a v4 UUID that carry version and variant bits.
const FIXED_POSITIONS: [usize; 2] = [6, 8];

/// Issues numbers of the form `<prefix><YYYYMMDD><6 x [A-Z0-9]>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomTaskNumberGenerator {
    prefix: String,
}

impl RandomTaskNumberGenerator {
    /// Creates a generator using `prefix`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for RandomTaskNumberGenerator {
    fn default() -> Self {
        Self::new("TK")
    }
}

impl TaskNumberGenerator for RandomTaskNumberGenerator {
    fn generate(&self, issued_at: DateTime<Utc>) -> TaskNumber {
        let suffix: String = random_bytes()
            .filter_map(symbol_for)
            .take(SUFFIX_LEN)
            .collect();
        TaskNumber::new(format!(
            "{}{}{suffix}",
            self.prefix,
            issued_at.format("%Y%m%d")
        ))
    }
}

fn random_bytes() -> impl Iterator<Item = u8> {
    std::iter::repeat_with(Uuid::new_v4).flat_map(|entropy| {
        entropy
            .into_bytes()
            .into_iter()
            .enumerate()
            .filter(|(position, _)| !FIXED_POSITIONS.contains(position))
            .map(|(_, byte)| byte)
    })
}

fn symbol_for(byte: u8) -> Option<char> {
    let value = usize::from(byte);
    if value >= ACCEPT_BELOW {
        return None;
    }
    ALPHABET
        .get(value.rem_euclid(ALPHABET.len()))
        .map(|symbol| char::from(*symbol))
}
