//! Authentication gateway for voice skill requests
//!
//! Wraps the `skill-verification` crate in an axum middleware so that only
//! requests carrying a valid platform signature and a fresh timestamp reach
//! RustCare handlers.
//!
//! # Example
//!
//! ```rust,no_run
//! use auth_gateway::{router, SkillRequestGuard};
//! use skill_verification::{RequestAuthenticator, SystemClock, VerifierConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = VerifierConfig::from_env()?;
//! let clock = Arc::new(SystemClock);
//! let authenticator = Arc::new(RequestAuthenticator::http(&config, clock.clone())?);
//! let guard = SkillRequestGuard::new(authenticator, clock, config);
//!
//! let app = router(guard, "/skill");
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod middleware;
pub mod routes;

pub use error::{ApiError, ApiErrorResponse};
pub use middleware::{verify_skill_request, SkillRequestGuard, CERT_CHAIN_URL_HEADER, SIGNATURE_HEADER};
pub use routes::router;
