mod candidate_stream;
mod handlers;
mod routes;
mod signaling_service;

pub use candidate_stream::*;
pub use handlers::*;
pub use routes::*;
pub use signaling_service::*;
