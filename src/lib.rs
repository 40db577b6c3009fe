pub mod checker;
pub mod consent;
pub mod http;
pub mod plugin;
pub mod version;
