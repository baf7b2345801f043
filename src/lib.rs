pub mod config;
pub mod protocol;
pub mod render;
pub mod tools;

pub use config::Config;
pub use tools::DocxTools;
