//! Safe layer over the lifecycle publish/subscribe interface.
//!
//! The host broadcasts messages as an untyped `(type, len, data)` record.
//! [`MessageType`] closes the type tag into an enum, [`MessageEvent`] bounds
//! the payload, and [`MessageListener`] replaces the raw callback with a
//! trait carrying one hook per message. All hooks default to no-ops;
//! override only what you need.
//!
//! The host asserts nothing about delivery order beyond what the message
//! names suggest; listeners must not rely on one.

use std::ffi::{c_void, CStr};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::ptr;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::ffi;

/// The closed set of lifecycle messages the host dispatches.
///
/// Values match the host's numeric constants exactly. Unknown values can
/// legitimately appear on the wire (newer hosts, other plugins as senders),
/// which is why conversion goes through [`MessageType::from_raw`] rather
/// than a `From` impl.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// All plugins are loaded.
    PostLoad = 0,
    /// All plugins have handled [`MessageType::PostLoad`].
    PostPostLoad = 1,
    /// A saved game is about to be loaded.
    PreLoadGame = 2,
    /// A saved game finished loading.
    PostLoadGame = 3,
    /// The game is being saved.
    SaveGame = 4,
    /// A save file is being deleted.
    DeleteGame = 5,
    /// A save file is being renamed.
    RenameGame = 6,
    /// A new-game save is being renamed.
    RenameNewGame = 7,
    /// A new game is starting.
    NewGame = 8,
    /// A saved game is loading.
    LoadGame = 9,
    /// The game is exiting.
    ExitGame = 10,
    /// The game is returning to the main menu.
    ExitToMainMenu = 11,
    /// A script is about to be compiled.
    Precompile = 12,
    /// A script raised an error at runtime.
    RuntimeScriptError = 13,
}

impl MessageType {
    /// Converts a wire value into a known message type.
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            ffi::MESSAGE_POST_LOAD => Some(Self::PostLoad),
            ffi::MESSAGE_POST_POST_LOAD => Some(Self::PostPostLoad),
            ffi::MESSAGE_PRE_LOAD_GAME => Some(Self::PreLoadGame),
            ffi::MESSAGE_POST_LOAD_GAME => Some(Self::PostLoadGame),
            ffi::MESSAGE_SAVE_GAME => Some(Self::SaveGame),
            ffi::MESSAGE_DELETE_GAME => Some(Self::DeleteGame),
            ffi::MESSAGE_RENAME_GAME => Some(Self::RenameGame),
            ffi::MESSAGE_RENAME_NEW_GAME => Some(Self::RenameNewGame),
            ffi::MESSAGE_NEW_GAME => Some(Self::NewGame),
            ffi::MESSAGE_LOAD_GAME => Some(Self::LoadGame),
            ffi::MESSAGE_EXIT_GAME => Some(Self::ExitGame),
            ffi::MESSAGE_EXIT_TO_MAIN_MENU => Some(Self::ExitToMainMenu),
            ffi::MESSAGE_PRECOMPILE => Some(Self::Precompile),
            ffi::MESSAGE_RUNTIME_SCRIPT_ERROR => Some(Self::RuntimeScriptError),
            _ => None,
        }
    }

    /// The numeric wire value.
    #[must_use]
    pub fn as_raw(self) -> u32 {
        self as u32
    }
}

impl Display for MessageType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{self:?}")
    }
}

/// Read-only view over a dispatched [`ffi::Message`].
///
/// Everything behind this view is host-owned and valid only for the
/// duration of the callback that supplied it.
#[derive(Debug, Clone, Copy)]
pub struct MessageEvent<'a> {
    raw: &'a ffi::Message,
}

impl<'a> MessageEvent<'a> {
    /// # Safety
    ///
    /// `msg` must be null or point at a [`ffi::Message`] whose `sender` and
    /// `data` pointers are valid for the lifetime `'a`.
    pub(crate) unsafe fn from_raw(msg: *const ffi::Message) -> Option<Self> {
        unsafe { msg.as_ref() }.map(|raw| Self { raw })
    }

    /// The dispatching plugin's name, if present and valid UTF-8.
    #[must_use]
    pub fn sender(&self) -> Option<&'a str> {
        if self.raw.sender.is_null() {
            return None;
        }
        unsafe { CStr::from_ptr(self.raw.sender) }.to_str().ok()
    }

    /// The raw type tag, including values outside the known set.
    #[must_use]
    pub fn raw_type(&self) -> u32 {
        self.raw.ty
    }

    /// The type tag as a known message type.
    #[must_use]
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::from_raw(self.raw.ty)
    }

    /// The payload bytes. The schema is determined by the type tag and
    /// documented out of band; this view never interprets it.
    #[must_use]
    pub fn payload(&self) -> &'a [u8] {
        if self.raw.data.is_null() || self.raw.data_len == 0 {
            return &[];
        }
        unsafe {
            std::slice::from_raw_parts(self.raw.data.cast::<u8>(), self.raw.data_len as usize)
        }
    }

    /// The payload as a NUL-terminated string, for the message types that
    /// carry a path or name. `None` when no NUL appears within `data_len`
    /// bytes; the payload is never read past its declared length.
    #[must_use]
    pub fn payload_str(&self) -> Option<&'a str> {
        CStr::from_bytes_until_nul(self.payload()).ok()?.to_str().ok()
    }
}

/// Trait for observing host lifecycle messages.
///
/// One hook per message in the closed set, plus [`MessageListener::unknown`]
/// for values outside it. All hooks default to no-ops.
///
/// The listener is installed as a process-wide singleton and may be invoked
/// from whatever thread the host dispatches on, hence `Send + Sync`.
pub trait MessageListener: Send + Sync + 'static {
    /// All plugins are loaded.
    fn post_load(&self, _event: &MessageEvent) {}
    /// All plugins have handled `PostLoad`; cross-plugin interfaces are up.
    fn post_post_load(&self, _event: &MessageEvent) {}
    /// A saved game is about to be loaded.
    fn pre_load_game(&self, _event: &MessageEvent) {}
    /// A saved game finished loading.
    fn post_load_game(&self, _event: &MessageEvent) {}
    /// The game is being saved.
    fn save_game(&self, _event: &MessageEvent) {}
    /// A save file is being deleted.
    fn delete_game(&self, _event: &MessageEvent) {}
    /// A save file is being renamed.
    fn rename_game(&self, _event: &MessageEvent) {}
    /// A new-game save is being renamed.
    fn rename_new_game(&self, _event: &MessageEvent) {}
    /// A new game is starting.
    fn new_game(&self, _event: &MessageEvent) {}
    /// A saved game is loading.
    fn load_game(&self, _event: &MessageEvent) {}
    /// The game is exiting.
    fn exit_game(&self, _event: &MessageEvent) {}
    /// The game is returning to the main menu.
    fn exit_to_main_menu(&self, _event: &MessageEvent) {}
    /// A script is about to be compiled.
    fn precompile(&self, _event: &MessageEvent) {}
    /// A script raised an error at runtime.
    fn runtime_script_error(&self, _event: &MessageEvent) {}
    /// A message outside the known set was dispatched.
    fn unknown(&self, _raw: u32, _event: &MessageEvent) {}
}

static LISTENER: OnceLock<Box<dyn MessageListener>> = OnceLock::new();

/// # Safety
///
/// Called by the host with a pointer to a live message record.
unsafe extern "C" fn dispatch_message(msg: *mut ffi::Message) {
    let Some(listener) = LISTENER.get() else {
        return;
    };
    let Some(event) = (unsafe { MessageEvent::from_raw(msg) }) else {
        return;
    };
    match event.message_type() {
        Some(MessageType::PostLoad) => listener.post_load(&event),
        Some(MessageType::PostPostLoad) => listener.post_post_load(&event),
        Some(MessageType::PreLoadGame) => listener.pre_load_game(&event),
        Some(MessageType::PostLoadGame) => listener.post_load_game(&event),
        Some(MessageType::SaveGame) => listener.save_game(&event),
        Some(MessageType::DeleteGame) => listener.delete_game(&event),
        Some(MessageType::RenameGame) => listener.rename_game(&event),
        Some(MessageType::RenameNewGame) => listener.rename_new_game(&event),
        Some(MessageType::NewGame) => listener.new_game(&event),
        Some(MessageType::LoadGame) => listener.load_game(&event),
        Some(MessageType::ExitGame) => listener.exit_game(&event),
        Some(MessageType::ExitToMainMenu) => listener.exit_to_main_menu(&event),
        Some(MessageType::Precompile) => listener.precompile(&event),
        Some(MessageType::RuntimeScriptError) => listener.runtime_script_error(&event),
        None => listener.unknown(event.raw_type(), &event),
    }
}

/// Borrowed view over the host's messaging interface.
#[derive(Debug, Clone, Copy)]
pub struct Messaging<'a> {
    raw: &'a ffi::NVSEMessagingInterface,
}

impl<'a> Messaging<'a> {
    /// Wraps a host-supplied messaging record.
    #[must_use]
    pub fn from_ref(raw: &'a ffi::NVSEMessagingInterface) -> Self {
        Self { raw }
    }

    /// Installs `listener` as this plugin's message listener and registers
    /// it with the host.
    ///
    /// `sender` filters on the dispatching plugin's name; `None` subscribes
    /// to every sender. The filter must be `'static` because the host may
    /// keep the pointer for the lifetime of the process.
    ///
    /// The listener is only installed once the host accepts, so a rejected
    /// registration leaves nothing behind and may be retried. Anything the
    /// host dispatches before a successful install is dropped.
    ///
    /// # Errors
    ///
    /// [`Error::MissingHostFunction`] if the registration slot is null,
    /// [`Error::ListenerRejected`] if the host returns failure, and
    /// [`Error::ListenerAlreadyRegistered`] after a successful
    /// installation. Callers should degrade to running without messaging
    /// on the latter two.
    pub fn register<L: MessageListener>(
        &self,
        handle: ffi::PluginHandle,
        sender: Option<&'static CStr>,
        listener: L,
    ) -> Result<()> {
        let register = self
            .raw
            .register_listener
            .ok_or(Error::MissingHostFunction("RegisterListener"))?;
        if LISTENER.get().is_some() {
            return Err(Error::ListenerAlreadyRegistered);
        }
        let sender_ptr = sender.map_or(ptr::null(), CStr::as_ptr);
        let handler = dispatch_message as ffi::MessageHandler;
        let accepted = unsafe { register(handle, sender_ptr, handler as *mut c_void) };
        if !accepted {
            return Err(Error::ListenerRejected);
        }
        LISTENER
            .set(Box::new(listener))
            .map_err(|_| Error::ListenerAlreadyRegistered)
    }
}
