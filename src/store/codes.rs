//! Generated 20-character codes for account numbers and customer ids.

use rand::Rng;

const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Length of every generated code.
pub const CODE_LEN: usize = 20;

/// Attempts made to find an unused code before giving up.
pub const MAX_ATTEMPTS: usize = 10;

/// Last 8 digits of the Unix time in milliseconds followed by 12 random
/// uppercase base-36 characters.
pub fn generate_code() -> String {
    let millis = chrono::Utc::now().timestamp_millis().rem_euclid(100_000_000);
    let mut rng = rand::thread_rng();
    let random: String = (0..CODE_LEN - 8)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{millis:08}{random}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_twenty_uppercase_base36_chars() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LEN);
            assert!(code.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
            assert!(code[..8].chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn codes_differ() {
        assert_ne!(generate_code(), generate_code());
    }
}
