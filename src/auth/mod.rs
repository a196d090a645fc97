mod credentials;
mod provision;

pub use credentials::{CredentialGenerator, verify_password};
pub use provision::{add_user, authenticate, provision_user};
