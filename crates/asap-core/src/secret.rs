//! Secret types used for private keys and minted `Authorization` headers.
//!
//! [`SecretString`] redacts itself in `Debug` output and zeroizes on drop, so
//! structs holding one can derive `Debug` without leaking key material into
//! logs. Reading the value requires an explicit [`ExposeSecret::expose_secret`].
//!
//! ```rust
//! use asap_core::secret::{ExposeSecret, SecretString};
//!
//! let header = SecretString::from("Bearer eyJ...".to_string());
//! assert!(!format!("{header:?}").contains("eyJ"));
//! assert!(header.expose_secret().starts_with("Bearer "));
//! ```

pub use secrecy::{ExposeSecret, SecretString};
