pub mod auth;
pub mod session;

pub use auth::{
    authenticate, require_permission, satisfies, AuthContext, AuthError, AuthState, Claims,
    JwtAuth, ADMIN_WILDCARD,
};
pub use session::{
    DirtySignal, IssuedSession, LiveSession, MemoryDirtySignal, MemorySessionStore,
    PayloadBuilder, RoleInfo, SessionManager, SessionPayload, SessionStore, UserProfile,
};

#[cfg(feature = "redis-session")]
pub use session::{RedisDirtySignal, RedisSessionStore};
