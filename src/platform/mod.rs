// Platform-specific code module

pub mod cleanup_dirs;
pub mod elevation;
pub mod fs;
pub mod network;
pub mod process;
pub mod recycle;
pub mod registry;
pub mod services;

pub use elevation::{is_elevated, privilege_label, require_elevation};
pub use network::TcpGlobalApplier;
pub use registry::RegistryApplier;
pub use services::ServiceApplier;
