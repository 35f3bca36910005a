pub mod data;
pub mod manager;
pub mod signal;
pub mod store;

pub use data::{PayloadBuilder, RoleInfo, SessionPayload, UserProfile};
pub use manager::{generate_session_id, IssuedSession, LiveSession, SessionManager};
pub use signal::{DirtySignal, MemoryDirtySignal};
pub use store::{MemorySessionStore, SessionStore};

#[cfg(feature = "redis-session")]
pub use signal::RedisDirtySignal;
#[cfg(feature = "redis-session")]
pub use store::RedisSessionStore;
