pub mod context;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod permission;

pub use context::AuthContext;
pub use error::{redact, AuthError};
pub use jwt::{Claims, JwtAuth};
pub use middleware::{authenticate, require_permission, AuthState};
pub use permission::{satisfies, split_permissions, ADMIN_WILDCARD, PERMISSION_SEPARATOR};
