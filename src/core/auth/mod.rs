// Auth module - Authentication state and token decoding
pub mod store;
pub mod token;

pub use store::{AuthSnapshot, InMemorySessionStore, SessionStore, UserProfile};
pub use token::{decode_claims, encode_unsigned, TokenClaims};
