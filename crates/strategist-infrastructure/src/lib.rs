pub mod config_storage;
pub mod paths;
pub mod profile_repository;
pub mod secret_storage;
pub mod session_repository;

pub use config_storage::ConfigStorage;
pub use paths::StrategistPaths;
pub use profile_repository::FileProfileRepository;
pub use secret_storage::SecretStorage;
pub use session_repository::DirSessionRepository;
