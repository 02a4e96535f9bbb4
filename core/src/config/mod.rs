mod load;
mod types;

pub use load::{
    apply_env_overrides, fill_store_path, get_sysmode_data_dir, load_default, load_from,
    STORE_FILE_NAME,
};
pub use types::{
    AppConfig, FileStoreConfig, ListenerConfig, LoggingConfig, ManagerConfig, StoreConfig,
    StoreProvider,
};
