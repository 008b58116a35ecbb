use std::ffi::CStr;

use crate::error::{Error, Result};
use crate::ffi;
use crate::nvse::Nvse;

/// Describes the plugin to the host and decides whether the environment it
/// was loaded into is acceptable.
///
/// Built in the query entry point and consumed by [`crate::export_plugin!`],
/// which calls [`PluginBuilder::fill`] and then [`PluginBuilder::handshake`].
#[must_use]
#[derive(Debug, Clone, Copy)]
pub struct PluginBuilder {
    name: &'static CStr,
    version: u32,
    required_runtime: Option<u32>,
    allow_editor: bool,
}

impl PluginBuilder {
    /// Creates a builder for a plugin named `name` at `version`.
    ///
    /// `name` must be `'static` because the host keeps the pointer it is
    /// handed. The version encoding is plugin-defined; the host only logs
    /// it. By default no runtime build is enforced and the editor is
    /// refused.
    pub fn new(name: &'static CStr, version: u32) -> Self {
        Self {
            name,
            version,
            required_runtime: None,
            allow_editor: false,
        }
    }

    /// Requires an exact runtime build, rejecting the load on any other.
    ///
    /// Plugins that read or patch game memory must pin the build they were
    /// written against; [`ffi::RUNTIME_VERSION_1_4_0_525`] is the current
    /// retail one.
    pub fn required_runtime(mut self, version: u32) -> Self {
        self.required_runtime = Some(version);
        self
    }

    /// Sets whether the plugin accepts being loaded into the GECK editor.
    pub fn allow_editor(mut self, allow: bool) -> Self {
        self.allow_editor = allow;
        self
    }

    /// Writes the plugin's self-description into the host's record.
    pub fn fill(&self, info: &mut ffi::PluginInfo) {
        info.info_version = ffi::PLUGIN_INFO_VERSION;
        info.name = self.name.as_ptr();
        info.version = self.version;
    }

    /// Checks the environment the plugin was loaded into.
    ///
    /// The runtime build is only checked outside the editor; the editor is
    /// a different executable with its own versioning.
    ///
    /// # Errors
    ///
    /// [`Error::EditorUnsupported`] when loaded into the editor without
    /// [`PluginBuilder::allow_editor`], and [`Error::RuntimeMismatch`] when
    /// the game build differs from the required one.
    pub fn handshake(&self, nvse: &Nvse) -> Result<()> {
        if nvse.is_editor() {
            if self.allow_editor {
                return Ok(());
            }
            return Err(Error::EditorUnsupported);
        }
        if let Some(required) = self.required_runtime {
            nvse.check_runtime(required)?;
        }
        Ok(())
    }
}
