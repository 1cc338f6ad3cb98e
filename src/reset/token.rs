use sha2::{Digest, Sha256};

/// Number of random bytes behind every emailed secret.
pub const SECRET_BYTES: usize = 32;

/// Fresh bearer secret from the thread-local CSPRNG, hex encoded so it can sit in a URL path.
pub fn generate_secret() -> String {
    let bytes: [u8; SECRET_BYTES] = rand::random();
    hex::encode(bytes)
}

/// One-way digest of a secret; the only form that is ever persisted.
pub fn digest(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn secrets_are_url_safe_and_fixed_length() {
        let secret = generate_secret();
        assert_eq!(secret.len(), SECRET_BYTES * 2);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn secrets_do_not_repeat() {
        let secrets: HashSet<String> = (0..256).map(|_| generate_secret()).collect();
        assert_eq!(secrets.len(), 256);
    }

    #[test]
    fn digest_is_stable_and_differs_from_secret() {
        let secret = generate_secret();
        assert_eq!(digest(&secret), digest(&secret));
        assert_ne!(digest(&secret), secret);
        assert_eq!(digest(&secret).len(), 64);
    }

    #[test]
    fn digest_matches_known_vector() {
        assert_eq!(
            digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
