use rand::Rng;

const USER_ID_PREFIX: &str = "user";
const USER_ID_BYTES: usize = 4;
const PASSWORD_BYTES: usize = 6;

/// Issues the opaque user ids and shared secrets handed out by the admin console.
///
/// Ids look like `user1a2b3c4d`; passwords are 12 lowercase hex characters.
#[derive(Debug, Default, Clone, Copy)]
pub struct CredentialGenerator;

impl CredentialGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns (user_id, raw_password)
    #[must_use]
    pub fn generate(&self) -> (String, String) {
        (self.user_id(), self.password())
    }

    #[must_use]
    pub fn user_id(&self) -> String {
        format!("{USER_ID_PREFIX}{}", random_hex(USER_ID_BYTES))
    }

    #[must_use]
    pub fn password(&self) -> String {
        random_hex(PASSWORD_BYTES)
    }
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill(bytes.as_mut_slice());
    hex::encode(bytes)
}

/// Compares a presented password with the stored one.
///
/// Passwords are stored as issued, so this is an exact match. An empty stored
/// password belongs to a stub account and never matches.
#[must_use]
pub fn verify_password(stored: &str, presented: &str) -> bool {
    !stored.is_empty() && stored == presented
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_shapes() {
        let (user_id, password) = CredentialGenerator::new().generate();

        assert!(user_id.starts_with("user"));
        assert_eq!(user_id.len(), 4 + USER_ID_BYTES * 2);
        assert!(user_id[4..].chars().all(|c| c.is_ascii_hexdigit()));

        assert_eq!(password.len(), PASSWORD_BYTES * 2);
        assert!(password.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generated_values_differ() {
        let generator = CredentialGenerator::new();
        assert_ne!(generator.password(), generator.password());
        assert_ne!(generator.user_id(), generator.user_id());
    }

    #[test]
    fn test_verify_password() {
        assert!(verify_password("abc123", "abc123"));
        assert!(!verify_password("abc123", "abc124"));
        assert!(!verify_password("abc123", ""));
        assert!(!verify_password("", ""));
    }
}
