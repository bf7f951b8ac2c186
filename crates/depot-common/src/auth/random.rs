//! Random secrets and identifiers

use depot_core::RandomSource;
use rand::rngs::OsRng;
use rand::RngCore;

/// Alphabet used for recovery codes
const RECOVERY_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a recovery code
pub const RECOVERY_CODE_LEN: usize = 8;

/// Operating system CSPRNG
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, buf: &mut [u8]) {
        OsRng.fill_bytes(buf);
    }
}

/// `len` random bytes, hex-encoded
pub fn random_hex(source: &dyn RandomSource, len: usize) -> String {
    let mut buf = vec![0u8; len];
    source.fill(&mut buf);
    hex::encode(buf)
}

/// Upper-case alphanumeric recovery code
pub fn generate_recovery_code(source: &dyn RandomSource) -> String {
    let mut buf = [0u8; RECOVERY_CODE_LEN];
    source.fill(&mut buf);
    buf.iter()
        .map(|b| RECOVERY_ALPHABET[usize::from(*b) % RECOVERY_ALPHABET.len()] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_hex_length() {
        let hex = random_hex(&OsRandom, 48);
        assert_eq!(hex.len(), 96);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_random_hex_differs() {
        assert_ne!(random_hex(&OsRandom, 16), random_hex(&OsRandom, 16));
    }

    #[test]
    fn test_recovery_code_format() {
        let code = generate_recovery_code(&OsRandom);
        assert_eq!(code.len(), RECOVERY_CODE_LEN);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}
