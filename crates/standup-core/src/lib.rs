pub mod attendance;
pub mod calendar;
pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod lifecycle;
pub mod paths;
pub mod reminder;
pub mod render;
pub mod session;
pub mod settings;
pub mod store;
pub mod tracker;
pub mod transport;

pub use config::{Actor, ConfigPatch, WorkspaceConfig};
pub use engine::{Engine, TickReport};
pub use error::{Result, StandupError};
pub use render::SummaryDocument;
pub use session::{EventKind, InboundEvent, SessionState, WorkspaceState};
pub use settings::Settings;
pub use store::{StandupDb, WorkspaceStore};
pub use transport::{MemoryTransport, Transport, TransportError};
