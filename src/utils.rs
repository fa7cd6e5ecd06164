use dirs::{config_dir, data_dir};
use std::path::{Path, PathBuf};
use std::fs;

const APP_DIR: &str = "hcevents";

fn base_or_cwd(base: Option<PathBuf>) -> PathBuf {
    base.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

pub fn data_root() -> PathBuf {
    base_or_cwd(data_dir()).join(APP_DIR)
}

pub fn store_path() -> PathBuf {
    data_root().join("pubdates.json")
}

pub fn config_path() -> PathBuf {
    base_or_cwd(config_dir()).join(APP_DIR).join("config.json")
}

pub fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
