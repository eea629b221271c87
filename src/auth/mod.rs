//! Request authentication: signed JWTs for the API and the request extractor
//! that resolves either a JWT or a legacy expiring token into a user.

pub mod extractor;
pub mod jwt;

pub use extractor::AuthUser;
pub use jwt::{Claims, JwtService, TokenType};
