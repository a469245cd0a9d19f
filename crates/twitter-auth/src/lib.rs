//! Twitter OAuth credential handling
//!
//! Covers the two ways this workspace authenticates against the Twitter API:
//!
//! - App-only (OAuth2 client credentials): the consumer key/secret are sent
//!   as HTTP Basic credentials to `TOKEN_ENDPOINT` and exchanged for a bearer
//!   token; `INVALIDATE_ENDPOINT` revokes it again.
//! - User context (OAuth1): each request carries an HMAC-SHA1 signed
//!   `Authorization: OAuth ...` header built from the consumer pair and the
//!   user's access token pair.
//!
//! Nothing here holds state. Callers pass the HTTP client and the endpoint
//! URL so that tests can point the flow at a local server.

pub mod basic;
pub mod constants;
pub mod error;
pub mod oauth1;
pub mod token;

pub use basic::{basic_authorization, encode_component};
pub use constants::*;
pub use error::{Error, Result};
pub use oauth1::UserContext;
pub use token::{TokenResponse, invalidate_token, request_bearer_token};
