#![doc = include_str!("../README.md")]
#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]

pub mod builders;
pub mod error;
pub mod ffi;
#[macro_use]
pub mod macros;
pub mod nvse;

/// A module typically glob-imported containing the typically required types
/// and macros.
pub mod prelude {
    pub use crate::builders::PluginBuilder;
    pub use crate::error::{Error, Result};
    pub use crate::export_plugin;
    pub use crate::ffi::PluginHandle;
    pub use crate::nvse::{
        Interface, InterfaceId, MessageEvent, MessageListener, MessageType, Messaging, Nvse,
    };
}

/// `nvse-rs` version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
