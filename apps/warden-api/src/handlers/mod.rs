//! Handlers 模块

pub mod auth;
pub mod functions;
pub mod grants;
pub mod health;
pub mod modules;

pub use auth::*;
pub use functions::*;
pub use grants::*;
pub use health::*;
pub use modules::*;
