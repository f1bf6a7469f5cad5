pub mod artifact;
pub mod escape;
pub mod input;
pub mod output;
pub mod store;

pub use artifact::*;
pub use escape::*;
pub use input::*;
pub use output::*;
pub use store::*;
