//! Authentication utilities

mod jwt;
mod otp;
mod password;
mod random;

pub use jwt::{AccessClaims, AccessPayload, KeyRing, SignedAccessToken, TokenIssuer};
pub use otp::TotpVerifier;
pub use password::{hash_password, validate_password_strength, verify_password, Argon2Hasher};
pub use random::{generate_recovery_code, random_hex, OsRandom, RECOVERY_CODE_LEN};
