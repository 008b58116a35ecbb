//! Builders for registering the plugin with the host.

mod plugin;

pub use plugin::PluginBuilder;
