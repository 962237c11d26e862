//! Session authentication.
//!
//! Provides:
//! - Access key allow-list (case-insensitive, compiled-in or configured)
//! - Date-bound transport tokens (hex of `DD_MM_YYYY$KEY`) for URL login
//! - Single current-session record with lazy expiry (24h key / 2h demo)
//! - Local demo accounts (email/password/name)
//! - Periodic re-check publishing the authentication state
//!
//! ## Design Decisions
//! - This is a lightweight gate, not a security boundary. Tokens are
//!   obfuscated, not signed; anyone can decode one.
//! - Every failure degrades to "not authenticated". Contract operations
//!   return `bool`/`Option`, never errors.
//! - Storage, key list, and clock are explicit handles so tests can swap
//!   in fixtures.

pub mod authenticator;
pub mod clock;
pub mod demo;
pub mod keys;
pub mod monitor;
pub mod session;
pub mod token;

pub use authenticator::{AuthStatus, Authenticator, SessionLifetimes};
pub use clock::{Clock, ManualClock, SystemClock};
pub use demo::{DemoAccount, DemoAccountStore};
pub use keys::KeyRegistry;
pub use monitor::SessionMonitor;
pub use session::{Session, SessionStore, SessionSubject};
pub use token::{DecodedToken, TokenError};
