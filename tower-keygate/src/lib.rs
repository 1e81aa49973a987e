//! # Tower Keygate
//!
//! `tower-keygate` is the admission gateway for [`keygate`]: a
//! [Tower](https://github.com/tower-rs/tower) middleware that identifies the caller of
//! every request, consults that caller's limiter and either forwards the request
//! untouched or rejects it at once.
//!
//! ## The Stack
//!
//! 1. **Key Extraction**: A [`KeyExtractor`] derives the client key from the request.
//!    Requests without a key share the [`UNKNOWN_KEY`] limiter.
//! 2. **Admission**: [`AdmissionLayer`] asks the [`keygate::Registry`] for the key's
//!    limiter. Denied requests resolve immediately to [`KeygateError::RateLimited`]
//!    and never reach the inner service.
//! 3. **Managed Stack**: [`ManagedAdmissionLayer`] adds a deadline on the inner
//!    service and maps every failure into [`KeygateError`].
//! 4. **Reclamation**: [`spawn_sweeper`] periodically drops limiters of idle keys.
//!
//! ## Feature Flags
//!
//! - `axum`: Enables `IntoResponse` for [`KeygateError`] (429 with a JSON message,
//!   408, 500) and the [`PeerIp`] and [`RealIp`] extractors.

mod error;
mod key;
mod layer;
mod managed_layer;
mod service;
mod sweeper;


#[cfg(feature = "axum")]
pub use error::handle_error;
pub use error::KeygateError;
pub use key::KeyExtractor;
pub use key::UNKNOWN_KEY;
#[cfg(feature = "axum")]
pub use key::PeerIp;
#[cfg(feature = "axum")]
pub use key::RealIp;
pub use layer::AdmissionLayer;
pub use managed_layer::ManagedAdmissionLayer;
pub use service::AdmissionService;
pub use service::ResponseFuture;
pub use sweeper::spawn_sweeper;
