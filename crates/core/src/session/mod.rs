//! Live push-channel sessions, indexed by the URL each one displays.

mod registry;

pub use registry::{Session, SessionId, SessionRegistry, SessionSnapshot};
