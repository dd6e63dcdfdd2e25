use env_logger::{Builder, Env};

/// 初始化 logger；`RUST_LOG` 優先於預設等級
pub fn init(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    Builder::from_env(Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}
