//! # pathium-auth
//!
//! JWT bearer authentication for pathium applications.
//!
//! This crate provides:
//! - [`JwtAuth`] middleware validating `Authorization: Bearer <token>`
//! - [`TokenVerifier`], the seam between the middleware and key material
//! - [`HmacVerifier`] for shared-secret (HS256/384/512) tokens
//! - [`create_token`], [`create_token_with`] and [`create_expiring_token`]
//!   for issuing tokens
//!
//! ## Quick Start
//!
//! ```ignore
//! use pathium::{Failure, PathParams, Pathium, Request};
//! use pathium_auth::{create_token, JwtAuth};
//!
//! let mut app = Pathium::new();
//! app.use_middleware(JwtAuth::hmac("secret").exempt(&["/login"]));
//! app.get("/protected", |req: Request, _params: PathParams| async move {
//!     Ok::<_, Failure>(serde_json::json!({ "user": req.state("user") }))
//! })?;
//!
//! let token = create_token(&serde_json::json!({ "sub": "alice" }), "secret")?;
//! ```
//!
//! ## Rejections
//!
//! Every rejection is an HTTP 401 carrying one of three details:
//! `Missing or invalid Authorization header`, `Token expired` or
//! `Invalid token`. The cause of an invalid token is logged at debug level
//! and never returned to the client.

mod error;
mod middleware;
mod token;

pub use error::{AuthError, Result, VerifyError};
pub use middleware::{JwtAuth, USER_STATE_KEY};
pub use token::{
    create_expiring_token, create_token, create_token_with, HmacVerifier, TokenVerifier,
};
