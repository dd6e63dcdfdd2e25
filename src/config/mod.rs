pub mod load;
pub mod types;

pub use types::{
    CONFIG_ENV_VAR, Config, DEFAULT_ALLOWED_COMMANDS, DEFAULT_CONFIG_PATH, EntityFields, Field,
};
