//! Identity-token verification against provider-published key sets.
//!
//! One verifier instance serves every login flow; the key cache it owns is
//! explicit state with defined invalidation, not an ambient singleton.

mod cache;
mod error;
mod jwks;
mod provider;
mod verifier;

pub use cache::{HttpKeyFetcher, JwksCache, KeyFetcher};
pub use error::Error;
pub use jwks::{Jwk, Jwks};
pub use provider::Provider;
pub use verifier::{Audience, IdentityClaims, TokenVerifier};
