/// Authentication module
///
/// Token pair minting/verification, password hashing, and the credential
/// service that ties them to the account store.

mod claims;
mod jwt;
mod password;
mod service;

pub use claims::Claims;
pub use jwt::{TokenCodec, TokenPair};
pub use password::hash_password;
pub use password::verify_password;
pub use service::{AuthOutcome, CredentialService};
