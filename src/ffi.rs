//! Raw bindings to the NVSE plugin interface.
//!
//! NVSE ships no installable headers a binding generator could consume, so
//! unlike most `-sys`-style layers these records are declared by hand and
//! their layout is pinned by the tests at the bottom of this module. Every
//! struct here is read directly from host-owned memory; field order, widths
//! and padding must match the host's compiler exactly.
//!
//! Prefer the typed wrappers in [`crate::nvse`] over using these directly.

use std::ffi::{c_char, c_void};

/// Opaque handle identifying a plugin to the host.
pub type PluginHandle = u32;

/// Sentinel returned by the host before a plugin is registered.
pub const INVALID_PLUGIN_HANDLE: PluginHandle = 0xFFFF_FFFF;

/// Interface format version reported in [`NVSEInterface::nvse_version`].
pub const NVSE_VERSION_INTEGER: u32 = 4;

/// Packed build identifier for runtime 1.4.0.525, the only known-good host
/// build. Compared against [`NVSEInterface::runtime_version`].
pub const RUNTIME_VERSION_1_4_0_525: u32 = 0x0104_021D;

/// The single defined [`PluginInfo::info_version`] value. The host rejects
/// registrations carrying anything else.
pub const PLUGIN_INFO_VERSION: u32 = 1;

/// Numeric id passed to [`NVSEInterface::query_interface`] to obtain a
/// [`NVSEMessagingInterface`].
pub const INTERFACE_MESSAGING: u32 = 3;

/// Plugin self-description handed to the host during the query phase.
///
/// All fields are written by the plugin. `name` is non-owned and must stay
/// valid for at least the duration of the registration call; in practice
/// plugins point it at a `'static` NUL-terminated string.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct PluginInfo {
    /// Must be [`PLUGIN_INFO_VERSION`].
    pub info_version: u32,
    /// Human-readable plugin name, NUL-terminated.
    pub name: *const c_char,
    /// Plugin version, plugin-defined encoding.
    pub version: u32,
}

/// Host-provided negotiation record passed to both plugin entry points.
///
/// The function pointers are implemented by the host and are only
/// guaranteed valid for the duration of the entry-point call.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct NVSEInterface {
    /// NVSE interface format version.
    pub nvse_version: u32,
    /// Packed build identifier of the running game executable.
    pub runtime_version: u32,
    /// True when loaded into the GECK editor rather than the game.
    pub is_editor: bool,
    /// Query an extended interface by numeric id. Returns null when the id
    /// is unsupported; the pointee type is determined entirely by the id.
    pub query_interface: Option<unsafe extern "C" fn(id: u32) -> *mut c_void>,
    /// Returns the handle identifying the calling plugin.
    pub get_plugin_handle: Option<unsafe extern "C" fn() -> PluginHandle>,
}

/// Lifecycle message dispatched to registered listeners.
///
/// `data` points at `data_len` bytes of host-owned memory whose meaning is
/// determined by `ty`; the schema per type is documented out of band.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct Message {
    /// Name of the dispatching plugin (or `"NVSE"` for the host itself).
    pub sender: *const c_char,
    /// One of the `MESSAGE_*` constants, or a plugin-defined value.
    pub ty: u32,
    /// Payload length in bytes.
    pub data_len: u32,
    /// Untyped payload, valid only for the duration of the callback.
    pub data: *mut c_void,
}

/// Extended interface for lifecycle publish/subscribe, obtained by querying
/// [`INTERFACE_MESSAGING`].
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct NVSEMessagingInterface {
    /// Register `handler` to receive messages from `sender` (null for any
    /// sender). `handler` is a `MessageHandler` passed as an untyped
    /// pointer; returns false if the host refuses the registration.
    pub register_listener: Option<
        unsafe extern "C" fn(
            listener: PluginHandle,
            sender: *const c_char,
            handler: *mut c_void,
        ) -> bool,
    >,
}

/// Signature the host expects behind the untyped `handler` argument of
/// [`NVSEMessagingInterface::register_listener`].
pub type MessageHandler = unsafe extern "C" fn(msg: *mut Message);

/// All plugins are loaded.
pub const MESSAGE_POST_LOAD: u32 = 0;
/// All plugins have handled `PostLoad`; cross-plugin interfaces are up.
pub const MESSAGE_POST_POST_LOAD: u32 = 1;
/// A saved game is about to be loaded.
pub const MESSAGE_PRE_LOAD_GAME: u32 = 2;
/// A saved game finished loading.
pub const MESSAGE_POST_LOAD_GAME: u32 = 3;
/// The game is being saved.
pub const MESSAGE_SAVE_GAME: u32 = 4;
/// A save file is being deleted.
pub const MESSAGE_DELETE_GAME: u32 = 5;
/// A save file is being renamed.
pub const MESSAGE_RENAME_GAME: u32 = 6;
/// A new-game save is being renamed.
pub const MESSAGE_RENAME_NEW_GAME: u32 = 7;
/// A new game is starting.
pub const MESSAGE_NEW_GAME: u32 = 8;
/// A saved game is loading.
pub const MESSAGE_LOAD_GAME: u32 = 9;
/// The game is exiting.
pub const MESSAGE_EXIT_GAME: u32 = 10;
/// The game is returning to the main menu.
pub const MESSAGE_EXIT_TO_MAIN_MENU: u32 = 11;
/// A script is about to be compiled.
pub const MESSAGE_PRECOMPILE: u32 = 12;
/// A script raised an error at runtime.
pub const MESSAGE_RUNTIME_SCRIPT_ERROR: u32 = 13;

#[cfg(test)]
mod tests {
    use super::*;
    use cfg_if::cfg_if;
    use std::mem::{offset_of, size_of};

    // The host is a 32-bit process; the 64-bit expectations exist so the
    // layout stays self-consistent when the test suite runs on a 64-bit
    // development machine.
    cfg_if! {
        if #[cfg(target_pointer_width = "32")] {
            const PTR: usize = 4;
        } else {
            const PTR: usize = 8;
        }
    }

    #[test]
    fn layout_plugin_info() {
        assert_eq!(offset_of!(PluginInfo, info_version), 0);
        assert_eq!(offset_of!(PluginInfo, name), PTR);
        assert_eq!(offset_of!(PluginInfo, version), 2 * PTR);
        assert_eq!(size_of::<PluginInfo>(), 3 * PTR);
    }

    #[test]
    fn layout_nvse_interface() {
        assert_eq!(offset_of!(NVSEInterface, nvse_version), 0);
        assert_eq!(offset_of!(NVSEInterface, runtime_version), 4);
        assert_eq!(offset_of!(NVSEInterface, is_editor), 8);
        // bool is 1 byte; the following function pointers realign.
        cfg_if! {
            if #[cfg(target_pointer_width = "32")] {
                assert_eq!(offset_of!(NVSEInterface, query_interface), 12);
                assert_eq!(offset_of!(NVSEInterface, get_plugin_handle), 16);
                assert_eq!(size_of::<NVSEInterface>(), 20);
            } else {
                assert_eq!(offset_of!(NVSEInterface, query_interface), 16);
                assert_eq!(offset_of!(NVSEInterface, get_plugin_handle), 24);
                assert_eq!(size_of::<NVSEInterface>(), 32);
            }
        }
    }

    #[test]
    fn layout_message() {
        assert_eq!(offset_of!(Message, sender), 0);
        assert_eq!(offset_of!(Message, ty), PTR);
        assert_eq!(offset_of!(Message, data_len), PTR + 4);
        cfg_if! {
            if #[cfg(target_pointer_width = "32")] {
                assert_eq!(offset_of!(Message, data), 12);
                assert_eq!(size_of::<Message>(), 16);
            } else {
                assert_eq!(offset_of!(Message, data), 16);
                assert_eq!(size_of::<Message>(), 24);
            }
        }
    }

    #[test]
    fn layout_messaging_interface() {
        assert_eq!(offset_of!(NVSEMessagingInterface, register_listener), 0);
        assert_eq!(size_of::<NVSEMessagingInterface>(), PTR);
    }

    #[test]
    fn nullable_function_pointer_niche() {
        // Option<fn> must stay pointer-sized for the repr(C) layout to hold.
        assert_eq!(
            size_of::<Option<unsafe extern "C" fn(u32) -> *mut c_void>>(),
            PTR
        );
        assert_eq!(size_of::<Option<MessageHandler>>(), PTR);
    }

    #[test]
    fn version_constants() {
        assert_eq!(PLUGIN_INFO_VERSION, 1);
        assert_eq!(NVSE_VERSION_INTEGER, 4);
        assert_eq!(RUNTIME_VERSION_1_4_0_525, 0x0104_021D);
        assert_eq!(INTERFACE_MESSAGING, 3);
        assert_eq!(INVALID_PLUGIN_HANDLE, u32::MAX);
    }

    #[test]
    fn message_constants_are_distinct_and_dense() {
        let all = [
            MESSAGE_POST_LOAD,
            MESSAGE_POST_POST_LOAD,
            MESSAGE_PRE_LOAD_GAME,
            MESSAGE_POST_LOAD_GAME,
            MESSAGE_SAVE_GAME,
            MESSAGE_DELETE_GAME,
            MESSAGE_RENAME_GAME,
            MESSAGE_RENAME_NEW_GAME,
            MESSAGE_NEW_GAME,
            MESSAGE_LOAD_GAME,
            MESSAGE_EXIT_GAME,
            MESSAGE_EXIT_TO_MAIN_MENU,
            MESSAGE_PRECOMPILE,
            MESSAGE_RUNTIME_SCRIPT_ERROR,
        ];
        for (i, value) in all.iter().enumerate() {
            assert_eq!(*value as usize, i);
        }
    }
}
