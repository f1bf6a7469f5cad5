pub mod artifact;
pub mod config;
pub mod item;
pub mod payload;
pub mod protocol;
pub mod source;

pub use artifact::*;
pub use config::*;
pub use item::*;
pub use payload::*;
pub use protocol::*;
pub use source::*;
