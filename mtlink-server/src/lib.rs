//! # mtlink-server
//!
//! Server-side account model for an MTProto service.
//!
//! - [`User`]: profile, 2FA password, message log and the pts counter
//! - [`Session`]: one device link, kept across disconnects
//! - [`Registry`]: the user/session tables; binds sessions on sign-in and
//!   fans each new message out to the recipient's live sessions as a single
//!   serialized `updateShortMessage`

#![deny(unsafe_code)]

mod config;
mod errors;
mod registry;
mod session;
mod user;

pub use config::ServerConfig;
pub use errors::ServerError;
pub use registry::{Registry, RegistryEvent};
pub use session::Session;
pub use user::{User, user_id_for_phone};
