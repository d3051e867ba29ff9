pub mod session_ctx;
pub mod session_flow;
pub mod session_state;

pub use session_ctx::SessionCtx;
pub use session_flow::{SessionConfig, SessionRunner};
pub use session_state::SessionState;
