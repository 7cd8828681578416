use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub fn new_salt() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Salted HMAC-SHA256 digest of the password, hex encoded.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(salt.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(password.as_bytes());
    mac.finalize()
        .into_bytes()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    hash_password(password, salt) == expected_hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_password_verifies() {
        let salt = new_salt();
        let hash = hash_password("hunter2", &salt);
        assert!(verify_password("hunter2", &salt, &hash));
    }

    #[test]
    fn wrong_password_fails() {
        let salt = new_salt();
        let hash = hash_password("hunter2", &salt);
        assert!(!verify_password("hunter3", &salt, &hash));
    }

    #[test]
    fn same_password_different_salts_differ() {
        let hash_a = hash_password("hunter2", &new_salt());
        let hash_b = hash_password("hunter2", &new_salt());
        assert_ne!(hash_a, hash_b);
    }
}
