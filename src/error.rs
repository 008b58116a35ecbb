//! Error and result types returned from the safe interface layer.
//!
//! The failure space is small by construction: the underlying binary
//! interface can only signal "version mismatch" and "feature unavailable",
//! so everything here maps onto one of those two families.

use std::error::Error as ErrorTrait;
use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::nvse::InterfaceId;

/// The result type returned by functions throughout the safe layer.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The errors that can be produced while talking to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The host reported a runtime build the plugin was not written
    /// against. Initialization must be aborted.
    RuntimeMismatch {
        /// Packed build identifier the plugin requires.
        expected: u32,
        /// Packed build identifier the host reported.
        found: u32,
    },
    /// The plugin was loaded into the editor but does not support it.
    EditorUnsupported,
    /// The host answered an interface query with null: the interface is
    /// not provided by this host build.
    InterfaceUnavailable(InterfaceId),
    /// A function-pointer slot in a host record was null.
    MissingHostFunction(&'static str),
    /// The host refused the listener registration.
    ListenerRejected,
    /// A message listener has already been installed for this plugin.
    ListenerAlreadyRegistered,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Error::RuntimeMismatch { expected, found } => write!(
                f,
                "incompatible runtime version {found:#010x}, plugin requires {expected:#010x}"
            ),
            Error::EditorUnsupported => write!(f, "plugin does not run in the editor"),
            Error::InterfaceUnavailable(id) => {
                write!(f, "host does not provide the {id:?} interface")
            }
            Error::MissingHostFunction(name) => {
                write!(f, "host did not supply the `{name}` function")
            }
            Error::ListenerRejected => write!(f, "host rejected the listener registration"),
            Error::ListenerAlreadyRegistered => {
                write!(f, "a message listener is already registered")
            }
        }
    }
}

impl ErrorTrait for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_runtime_mismatch() {
        let err = Error::RuntimeMismatch {
            expected: 0x0104_021D,
            found: 0x0104_0200,
        };
        assert_eq!(
            err.to_string(),
            "incompatible runtime version 0x01040200, plugin requires 0x0104021d"
        );
    }

    #[test]
    fn display_interface_unavailable() {
        let err = Error::InterfaceUnavailable(InterfaceId::Messaging);
        assert_eq!(err.to_string(), "host does not provide the Messaging interface");
    }
}
