//! Cookie plumbing for the auth relay.
//!
//! Names used by the upstream session framework, extraction from `Set-Cookie`
//! response headers, and serialization of outgoing `Cookie` headers.

mod builder;
mod header;
mod names;

pub use builder::CookieHeader;
pub use header::{csrf_token_from_cookie, extract_from_set_cookie_values, extract_set_cookie};
pub use names::{CookieOptions, CookieSet, CookieSpec, SameSite};
