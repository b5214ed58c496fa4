//! Correlation token generation.
//!
//! A token tags one dispatch so the resulting run can be recognised by its
//! display title. It only needs to be unlikely to collide within one process
//! lifetime; it is not a security boundary.

use relay_types::CorrelationToken;
use uuid::Uuid;

/// Number of characters in a generated token.
pub const TOKEN_LENGTH: usize = 8;

/// Produce a fresh token of [`TOKEN_LENGTH`] uppercase hexadecimal characters.
///
/// The characters come from the random bytes of a v4 UUID, so each call is
/// independent of the previous ones.
pub fn generate_token() -> CorrelationToken {
    let uuid = Uuid::new_v4();
    let encoded: String = uuid
        .as_bytes()
        .iter()
        .take(TOKEN_LENGTH / 2)
        .map(|byte| format!("{byte:02X}"))
        .collect();
    CorrelationToken::new(encoded)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn token_is_eight_uppercase_hex_characters() {
        let token = generate_token();
        assert_eq!(token.as_str().len(), TOKEN_LENGTH);
        assert!(
            token
                .as_str()
                .chars()
                .all(|ch| ch.is_ascii_digit() || ('A'..='F').contains(&ch))
        );
    }

    #[test]
    fn thousand_tokens_are_distinct() {
        let tokens: HashSet<String> = (0..1_000).map(|_| generate_token().as_str().to_string()).collect();
        assert_eq!(tokens.len(), 1_000);
    }
}
