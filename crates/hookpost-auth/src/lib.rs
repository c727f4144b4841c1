//! Tenant identity boundary for the capture core
//!
//! The core never performs logins or talks to an identity provider; it only
//! consumes verified claims produced here from a bearer token.

pub mod jwt;

pub use jwt::{JwtClaims, JwtError, JwtValidator};

// Re-export useful types
pub use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Validation};
