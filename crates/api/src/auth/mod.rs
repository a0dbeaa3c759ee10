//! Authentication primitives.
//!
//! - [`jwt`] -- HS256 access-token validation (and issuing, for tooling and tests).

pub mod jwt;
