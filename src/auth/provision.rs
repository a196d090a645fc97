use chrono::Utc;

use super::CredentialGenerator;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::User;

const MAX_RETRIES: u32 = 3;

/// Creates a user with generated credentials.
///
/// The returned `User` carries the raw password; it is not retrievable later
/// through any read path other than the admin listing.
pub fn provision_user(store: &dyn Store, generator: &CredentialGenerator) -> Result<User> {
    for _ in 0..MAX_RETRIES {
        let (user_id, password) = generator.generate();
        let user = User {
            user_id,
            password,
            name: String::new(),
            created_at: Utc::now(),
        };

        match store.create_user(&user) {
            Ok(()) => return Ok(user),
            Err(Error::AlreadyExists) => {
                tracing::warn!("Generated user id {} already taken", user.user_id);
                continue;
            }
            Err(e) => return Err(e),
        }
    }

    Err(Error::AlreadyExists)
}

/// Creates a user with credentials chosen by the admin.
pub fn add_user(store: &dyn Store, user_id: &str, password: &str) -> Result<User> {
    let user_id = user_id.trim();
    if user_id.is_empty() || password.is_empty() {
        return Err(Error::InvalidArgument(
            "User ID and password are required.".to_string(),
        ));
    }

    let user = User {
        user_id: user_id.to_string(),
        password: password.to_string(),
        name: String::new(),
        created_at: Utc::now(),
    };
    store.create_user(&user)?;
    Ok(user)
}

/// Checks a user's password. Unknown users and wrong passwords are indistinguishable.
pub fn authenticate(store: &dyn Store, user_id: &str, password: &str) -> Result<User> {
    match store.get_user(user_id)? {
        Some(user) if super::verify_password(&user.password, password) => Ok(user),
        _ => Err(Error::Unauthorized),
    }
}
