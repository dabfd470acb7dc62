pub mod normalizer;
pub mod response;
pub mod session;
pub mod upstream;
pub mod writer;

pub use response::create_sse_response;
pub use session::{Session, SessionOutcome, SessionState, run_session};
pub use upstream::{UpstreamLines, open_upstream};
pub use writer::sse_channel;
