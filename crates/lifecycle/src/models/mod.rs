//! Database models for installed plugins.

mod module;
mod plugin;

pub use module::Module;
pub use plugin::Plugin;
