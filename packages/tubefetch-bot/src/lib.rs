//! Conversational front end
//!
//! A [`Coordinator`] turns inbound chat events into metadata fetches,
//! cache lookups, downloads and uploads. It talks to users only through
//! the [`Transport`] trait, so any chat backend (or a console) can sit on
//! the other side.
//!
//! ```text
//! link ──> fetch metadata ──> variant keyboard ──> selection
//!                                                     │
//!     remote handle? ──> local artifact? ──> download ┴──> upload
//! ```

mod coordinator;
mod delivery;
mod handle;
mod messages;
pub mod progress;
pub mod render;
pub mod session;
pub mod transport;

pub use coordinator::Coordinator;
pub use delivery::DeliveryError;
pub use handle::CoordinatorHandle;
pub use messages::CoordinatorSnapshot;
pub use progress::ProgressReporter;
pub use session::{Session, SessionState, SessionStore};
pub use transport::{
    Button, Inbound, Keyboard, MediaPayload, MessageRef, OutboundMedia, Transport,
    TransportError, UploadProgress, UserId,
};
