use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "ai-teacher";

/// Directory holding `config.toml`, if one can be determined.
pub fn config_dir() -> Option<PathBuf> {
    resolve_config_dir(
        env::var_os("AI_TEACHER_HOME").map(PathBuf::from),
        env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        env::var_os("HOME").map(PathBuf::from),
    )
}

pub fn config_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

fn resolve_config_dir(
    app_home: Option<PathBuf>,
    xdg_config: Option<PathBuf>,
    home: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(base) = app_home {
        return Some(base.join("config"));
    }
    if let Some(xdg) = xdg_config {
        return Some(xdg.join(APP_DIR));
    }
    home.map(|h| h.join(".config").join(APP_DIR))
}
