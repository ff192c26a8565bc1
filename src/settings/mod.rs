//! Settings registry
//! Declarative buffer options applied through `name=value` assignments

pub mod definitions;
pub mod descriptor;
pub mod registry;


pub use definitions::{create_buffer_settings_registry, BufferOptions, LineEnding};
pub use descriptor::{SettingDescriptor, SettingError, SettingSetter, SettingType, SettingValue};
pub use registry::SettingsRegistry;
