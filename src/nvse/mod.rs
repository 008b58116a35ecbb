//! Typed wrappers over the records the host hands to a plugin.
//!
//! The host's negotiation mechanism is "pass a numeric id, get back an
//! opaque pointer you must cast based on out-of-band knowledge". The cast
//! lives in exactly one place here ([`Nvse::query_interface`]) and is keyed
//! by [`InterfaceId`], so the unsafe boundary stays small and auditable.

mod messaging;

pub use messaging::{MessageEvent, MessageListener, MessageType, Messaging};

use crate::error::{Error, Result};
use crate::ffi;

/// Identifiers for the extended interfaces the host can be queried for.
///
/// The id-to-type mapping is part of the binary contract; adding a variant
/// here means adding the matching arm in [`Nvse::query_interface`].
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceId {
    /// The lifecycle publish/subscribe interface.
    Messaging = ffi::INTERFACE_MESSAGING,
}

impl InterfaceId {
    /// The numeric id passed across the binary boundary.
    #[must_use]
    pub fn as_raw(self) -> u32 {
        self as u32
    }
}

/// An extended interface returned from [`Nvse::query_interface`], already
/// cast to its concrete type.
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub enum Interface<'a> {
    /// The lifecycle publish/subscribe interface.
    Messaging(Messaging<'a>),
}

/// Borrowed view over the host's negotiation record.
///
/// Valid only for the duration of the entry-point call that supplied the
/// underlying [`ffi::NVSEInterface`]; the lifetime enforces that.
#[derive(Debug, Clone, Copy)]
pub struct Nvse<'a> {
    raw: &'a ffi::NVSEInterface,
}

impl<'a> Nvse<'a> {
    /// Wraps a host-supplied negotiation record.
    #[must_use]
    pub fn from_ref(raw: &'a ffi::NVSEInterface) -> Self {
        Self { raw }
    }

    /// Interface format version reported by the host.
    #[must_use]
    pub fn nvse_version(&self) -> u32 {
        self.raw.nvse_version
    }

    /// Packed build identifier of the running game executable.
    #[must_use]
    pub fn runtime_version(&self) -> u32 {
        self.raw.runtime_version
    }

    /// Whether the plugin was loaded into the GECK editor.
    #[must_use]
    pub fn is_editor(&self) -> bool {
        self.raw.is_editor
    }

    /// Checks the host build against a known-good version.
    ///
    /// # Errors
    ///
    /// [`Error::RuntimeMismatch`] when the versions differ; the caller must
    /// refuse to initialize in that case rather than trust host behavior.
    pub fn check_runtime(&self, expected: u32) -> Result<()> {
        let found = self.raw.runtime_version;
        if found == expected {
            Ok(())
        } else {
            Err(Error::RuntimeMismatch { expected, found })
        }
    }

    /// Returns the handle identifying this plugin to the host.
    ///
    /// # Errors
    ///
    /// [`Error::MissingHostFunction`] if the host left the slot null.
    pub fn plugin_handle(&self) -> Result<ffi::PluginHandle> {
        let get = self
            .raw
            .get_plugin_handle
            .ok_or(Error::MissingHostFunction("GetPluginHandle"))?;
        Ok(unsafe { get() })
    }

    /// Queries the host for an extended interface.
    ///
    /// This is the single site that trusts the id-to-type mapping of the
    /// binary contract and casts the returned pointer accordingly.
    ///
    /// # Errors
    ///
    /// [`Error::MissingHostFunction`] if the query slot is null, and
    /// [`Error::InterfaceUnavailable`] if the host does not support `id`.
    /// Callers should treat either as "feature unavailable" and degrade
    /// rather than abort.
    pub fn query_interface(&self, id: InterfaceId) -> Result<Interface<'a>> {
        let query = self
            .raw
            .query_interface
            .ok_or(Error::MissingHostFunction("QueryInterface"))?;
        let ptr = unsafe { query(id.as_raw()) };
        if ptr.is_null() {
            return Err(Error::InterfaceUnavailable(id));
        }
        Ok(match id {
            InterfaceId::Messaging => {
                let raw = unsafe { &*ptr.cast::<ffi::NVSEMessagingInterface>() };
                Interface::Messaging(Messaging::from_ref(raw))
            }
        })
    }

    /// Convenience accessor for the messaging interface.
    ///
    /// # Errors
    ///
    /// Same as [`Nvse::query_interface`].
    pub fn messaging(&self) -> Result<Messaging<'a>> {
        match self.query_interface(InterfaceId::Messaging)? {
            Interface::Messaging(messaging) => Ok(messaging),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::c_void;

    unsafe extern "C" fn handle_seven() -> ffi::PluginHandle {
        7
    }

    unsafe extern "C" fn query_nothing(_id: u32) -> *mut c_void {
        std::ptr::null_mut()
    }

    fn host(runtime_version: u32, is_editor: bool) -> ffi::NVSEInterface {
        ffi::NVSEInterface {
            nvse_version: ffi::NVSE_VERSION_INTEGER,
            runtime_version,
            is_editor,
            query_interface: Some(query_nothing),
            get_plugin_handle: Some(handle_seven),
        }
    }

    #[test]
    fn check_runtime_accepts_expected_build() {
        let raw = host(ffi::RUNTIME_VERSION_1_4_0_525, false);
        let nvse = Nvse::from_ref(&raw);
        assert!(nvse.check_runtime(ffi::RUNTIME_VERSION_1_4_0_525).is_ok());
    }

    #[test]
    fn check_runtime_rejects_unknown_build() {
        let raw = host(0x0104_0100, false);
        let nvse = Nvse::from_ref(&raw);
        assert_eq!(
            nvse.check_runtime(ffi::RUNTIME_VERSION_1_4_0_525),
            Err(Error::RuntimeMismatch {
                expected: ffi::RUNTIME_VERSION_1_4_0_525,
                found: 0x0104_0100,
            })
        );
    }

    #[test]
    fn plugin_handle_forwards_host_value() {
        let raw = host(ffi::RUNTIME_VERSION_1_4_0_525, false);
        assert_eq!(Nvse::from_ref(&raw).plugin_handle(), Ok(7));
    }

    #[test]
    fn plugin_handle_detects_null_slot() {
        let mut raw = host(ffi::RUNTIME_VERSION_1_4_0_525, false);
        raw.get_plugin_handle = None;
        assert_eq!(
            Nvse::from_ref(&raw).plugin_handle(),
            Err(Error::MissingHostFunction("GetPluginHandle"))
        );
    }

    #[test]
    fn query_maps_null_to_unavailable() {
        let raw = host(ffi::RUNTIME_VERSION_1_4_0_525, false);
        let nvse = Nvse::from_ref(&raw);
        assert!(matches!(
            nvse.messaging(),
            Err(Error::InterfaceUnavailable(InterfaceId::Messaging))
        ));
    }

    #[test]
    fn query_casts_by_id() {
        static MESSAGING: ffi::NVSEMessagingInterface = ffi::NVSEMessagingInterface {
            register_listener: None,
        };
        unsafe extern "C" fn query_messaging(id: u32) -> *mut c_void {
            if id == ffi::INTERFACE_MESSAGING {
                std::ptr::addr_of!(MESSAGING).cast_mut().cast()
            } else {
                std::ptr::null_mut()
            }
        }

        let mut raw = host(ffi::RUNTIME_VERSION_1_4_0_525, false);
        raw.query_interface = Some(query_messaging);
        let nvse = Nvse::from_ref(&raw);
        assert!(matches!(
            nvse.query_interface(InterfaceId::Messaging),
            Ok(Interface::Messaging(_))
        ));
    }
}
