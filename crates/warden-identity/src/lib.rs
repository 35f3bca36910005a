pub mod backend;
pub mod credentials;
pub mod db;
pub mod error;
pub mod model;
pub mod notifier;
pub mod profile;
pub mod resolver;

pub use backend::{
    BackendAdapter, BackendOptions, IdentityStore, LegacyStore, ModeDetector, PinnedBackend,
    PrimaryStore, DEFAULT_REQUIRED_TABLES,
};
pub use credentials::{hash_password, verify_password};
pub use db::{connect, ConnectSettings};
pub use error::{IdentityError, Result};
pub use model::{AccountStatus, BackendMode, BackendStatus, MenuRow, RoleMenuRow, RoleRow, UserRow};
pub use notifier::ChangeNotifier;
pub use profile::{SessionPayloadBuilder, ADMIN_ROLE_KEY};
pub use resolver::PermissionResolver;
