mod retry;
mod room;
mod room_command;
mod room_manager;
mod room_worker;

pub use retry::*;
pub use room::*;
pub use room_command::*;
pub use room_manager::*;
pub use room_worker::*;
