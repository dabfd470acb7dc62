pub mod client;
pub mod error;
pub mod response;

pub use response::json_response;
