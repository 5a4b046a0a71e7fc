mod provider;
mod relay_directory;

pub use provider::*;
pub use relay_directory::*;
