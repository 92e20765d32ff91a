//! Payment card numbers.
//!
//! The full number is kept server-side only. Everything that leaves the
//! storefront (JSON views, logs, `Debug` output) uses [`CardNumber::masked`].

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`CardNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CardNumberError {
    /// Something other than digits, spaces or dashes was supplied.
    #[error("card number may only contain digits")]
    InvalidCharacter,
    /// Too few or too many digits.
    #[error("card number must have between {min} and {max} digits")]
    InvalidLength {
        /// Minimum digit count.
        min: usize,
        /// Maximum digit count.
        max: usize,
    },
}

/// A payment card number (PAN), digits only.
///
/// `Serialize` exists for storage documents; API views must use
/// [`CardNumber::masked`] instead.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardNumber(String);

impl CardNumber {
    /// Shortest accepted number.
    pub const MIN_DIGITS: usize = 12;
    /// Longest accepted number.
    pub const MAX_DIGITS: usize = 19;

    /// Parse a card number, ignoring spaces and dashes.
    ///
    /// # Errors
    ///
    /// Returns an error if any other non-digit is present or the digit count is
    /// outside 12..=19.
    pub fn parse(s: &str) -> Result<Self, CardNumberError> {
        let mut digits = String::with_capacity(s.len());
        for c in s.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' => {}
                _ => return Err(CardNumberError::InvalidCharacter),
            }
        }

        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits.len()) {
            return Err(CardNumberError::InvalidLength {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self(digits))
    }

    /// First four digits, `*` for every interior digit, last four digits.
    ///
    /// ```
    /// use cartwright_core::CardNumber;
    /// let card = CardNumber::parse("4111 1111 1111 1234").unwrap();
    /// assert_eq!(card.masked(), "4111********1234");
    /// ```
    #[must_use]
    pub fn masked(&self) -> String {
        mask(&self.0)
    }

    /// The last four digits.
    #[must_use]
    pub fn last_four(&self) -> &str {
        self.0.get(self.0.len().saturating_sub(4)..).unwrap_or_default()
    }
}

/// Mask a digit string as `firstFour + '*' x (len - 8) + lastFour`.
///
/// Strings of eight characters or fewer are fully masked.
#[must_use]
pub fn mask(digits: &str) -> String {
    let len = digits.chars().count();
    if len <= 8 {
        return "*".repeat(len);
    }

    digits
        .chars()
        .enumerate()
        .map(|(i, c)| if i < 4 || i >= len - 4 { c } else { '*' })
        .collect()
}

impl fmt::Debug for CardNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CardNumber").field(&self.masked()).finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_sixteen_digits() {
        let card = CardNumber::parse("5555444433331111").unwrap();
        assert_eq!(card.masked(), "5555********1111");
        assert_eq!(card.last_four(), "1111");
    }

    #[test]
    fn test_mask_keeps_length() {
        for len in CardNumber::MIN_DIGITS..=CardNumber::MAX_DIGITS {
            let card = CardNumber::parse(&"4".repeat(len)).unwrap();
            let masked = card.masked();
            assert_eq!(masked.len(), len);
            assert_eq!(masked.matches('*').count(), len - 8);
        }
    }

    #[test]
    fn test_parse_strips_separators() {
        let card = CardNumber::parse("4111-1111 1111-1111").unwrap();
        assert_eq!(card.masked(), "4111********1111");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(
            CardNumber::parse("4111x1111"),
            Err(CardNumberError::InvalidCharacter)
        );
        assert!(matches!(
            CardNumber::parse("1234"),
            Err(CardNumberError::InvalidLength { .. })
        ));
    }

    #[test]
    fn test_debug_never_shows_full_number() {
        let card = CardNumber::parse("4111111111111234").unwrap();
        let debug = format!("{card:?}");
        assert!(!debug.contains("4111111111111234"));
        assert!(debug.contains("4111********1234"));
    }

    #[test]
    fn test_short_strings_fully_masked() {
        assert_eq!(mask("1234"), "****");
    }
}
