/// Configuration system for pairscanner
///
/// - `macros`: the `config_struct!` macro (struct + defaults in one place)
/// - `schemas`: every config section
/// - `utils`: loading, saving and access helpers around the global CONFIG
///
/// The config file is TOML at `data/config.toml`, overridable with
/// `--config <path>`. A missing file means defaults for everything.
#[macro_use]
pub mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::{ApiConfig, BackoffMode, Config, DisplayConfig, ListsConfig, SessionConfig};
pub use utils::{
    get_config_clone, is_config_initialized, load_config, load_config_from_path, parse_config,
    read_config_file, resolve_config_path, save_config,
    with_config, CONFIG,
};
