pub mod types;
pub mod builder;
pub mod loader;
pub mod validator;
pub mod resolved;
pub mod settings;

pub use types::*;
pub use builder::*;
pub use loader::*;
pub use validator::*;
pub use resolved::*;
pub use settings::*;
