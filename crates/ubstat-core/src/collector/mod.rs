//! Collectors and the seams they are tested through.
//!
//! - [`traits`]: filesystem abstraction used for native configuration
//! - [`unbound`]: Unbound resolver statistics over remote control
//! - [`mock`]: in-memory filesystem, scripted client and canned responses

pub mod mock;
pub mod traits;
pub mod unbound;

pub use traits::{FileSystem, RealFs};
pub use unbound::{
    CollectError, ControlClient, RemoteControlClient, TransportError, UnboundCollector,
};
