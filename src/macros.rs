//! Macros for exporting the plugin entry points.

/// Exports the two entry points the host looks up by name in the plugin
/// DLL, wiring them to a [`crate::builders::PluginBuilder`] and a load
/// function.
///
/// The query entry fills the host's [`crate::ffi::PluginInfo`] record and
/// runs the builder's compatibility handshake; the host only calls the load
/// entry when the query returned `true`. The load function receives the
/// typed [`crate::nvse::Nvse`] wrapper and reports failure through its
/// `Result`, which is translated to the `bool` the host expects.
///
/// ```rust,no_run
/// use nvse_rs::prelude::*;
/// use nvse_rs::ffi::RUNTIME_VERSION_1_4_0_525;
///
/// fn load(nvse: &Nvse) -> Result<()> {
///     let _ = nvse.plugin_handle()?;
///     Ok(())
/// }
///
/// export_plugin! {
///     builder: PluginBuilder::new(c"my-plugin", 1)
///         .required_runtime(RUNTIME_VERSION_1_4_0_525),
///     load: load,
/// }
/// ```
#[macro_export]
macro_rules! export_plugin {
    (builder: $builder:expr, load: $load:expr $(,)?) => {
        /// Entry point called by the host to identify the plugin and check
        /// compatibility before loading it.
        ///
        /// # Safety
        ///
        /// Must only be called by the host with records that outlive the
        /// call.
        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "C" fn NVSEPlugin_Query(
            nvse: Option<&$crate::ffi::NVSEInterface>,
            info: Option<&mut $crate::ffi::PluginInfo>,
        ) -> bool {
            let builder = $builder;
            let Some(info) = info else {
                return false;
            };
            builder.fill(info);
            let Some(nvse) = nvse else {
                return false;
            };
            builder
                .handshake(&$crate::nvse::Nvse::from_ref(nvse))
                .is_ok()
        }

        /// Entry point called by the host to initialize the plugin, after a
        /// successful query.
        ///
        /// # Safety
        ///
        /// Must only be called by the host with a record that outlives the
        /// call.
        #[no_mangle]
        #[allow(non_snake_case)]
        pub unsafe extern "C" fn NVSEPlugin_Load(
            nvse: Option<&$crate::ffi::NVSEInterface>,
        ) -> bool {
            let Some(nvse) = nvse else {
                return false;
            };
            let nvse = $crate::nvse::Nvse::from_ref(nvse);
            let load: fn(&$crate::nvse::Nvse) -> $crate::error::Result<()> = $load;
            load(&nvse).is_ok()
        }
    };
}
