//! Board discovery and session bookkeeping.
//!
//! The [`SessionRegistry`] owns every known board: it broadcasts the
//! discovery probe, matches inbound datagrams and stream frames to
//! sessions, applies system-info messages to each board's
//! [`BoardIdentity`], expires silent boards, and delivers
//! [`BoardEvent`]s to the embedding application.

pub mod error;
pub mod event;
pub mod identity;
pub mod registry;
pub mod session;

pub use error::{Result, SessionError};
pub use event::BoardEvent;
pub use identity::{
    BoardIdentity, NetworkConfig, SYSTEM_INFO_A, SYSTEM_INFO_B, SYSTEM_INFO_PROBE,
};
pub use registry::{Outgoing, SessionConfig, SessionHandle, SessionRegistry};
pub use session::{BoardSession, SessionTransport};
