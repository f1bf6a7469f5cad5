pub mod ask;
pub mod client;
pub mod gateway;
pub mod prompts;
pub mod schemas;

pub use ask::*;
pub use client::*;
pub use gateway::*;
pub use prompts::*;
