//! Payment data redaction.
//!
//! Card numbers never reach the order log or the logs in clear text:
//! persisted numbers keep only their last four digits, and card-shaped digit
//! runs typed into contact details are replaced before a booking is stored.

use std::sync::LazyLock;

use regex::Regex;

/// Placeholder for redacted free text.
pub const REDACTION_PLACEHOLDER: &str = "[REDACTED]";

const MASK_GROUP: &str = "••••";

/// Digit runs of card length, optionally grouped by spaces or dashes.
static CARD_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:\d[ -]?){12,18}\d\b").expect("Invalid regex pattern"));

/// Mask a card number down to its last four digits.
///
/// ```
/// use skydrop::privacy::mask_card_number;
///
/// assert_eq!(mask_card_number("4111 1111 1111 1234"), "•••• •••• •••• 1234");
/// ```
#[must_use]
pub fn mask_card_number(number: &str) -> String {
    let digits: Vec<char> = number.chars().filter(char::is_ascii_digit).collect();
    if digits.len() <= 4 {
        return MASK_GROUP.to_string();
    }
    let last_four: String = digits[digits.len() - 4..].iter().collect();
    format!("{MASK_GROUP} {MASK_GROUP} {MASK_GROUP} {last_four}")
}

/// Replace anything shaped like a card number with a placeholder.
#[must_use]
pub fn redact_card_numbers(text: &str) -> String {
    CARD_NUMBER
        .replace_all(text, REDACTION_PLACEHOLDER)
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_spaced_number() {
        assert_eq!(mask_card_number("4111 1111 1111 1234"), "•••• •••• •••• 1234");
    }

    #[test]
    fn test_mask_plain_number() {
        assert_eq!(mask_card_number("5500000000000004"), "•••• •••• •••• 0004");
    }

    #[test]
    fn test_mask_short_input() {
        assert_eq!(mask_card_number("123"), "••••");
        assert_eq!(mask_card_number(""), "••••");
    }

    #[test]
    fn test_redact_card_numbers() {
        let text = "card 4111111111111111 at door";
        assert_eq!(redact_card_numbers(text), "card [REDACTED] at door");
        assert_eq!(
            redact_card_numbers("pay with 4111-1111-1111-1111 please"),
            "pay with [REDACTED] please"
        );
    }

    #[test]
    fn test_redact_leaves_other_text() {
        let text = "123 Main Street, City";
        assert_eq!(redact_card_numbers(text), text);
        assert_eq!(redact_card_numbers("+91 98765 43210"), "+91 98765 43210");
    }
}
