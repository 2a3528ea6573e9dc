use directories::ProjectDirs;

pub const ASSET_DIR_ENV: &str = "TASKFLOW_ASSET_DIR";

/// Directory holding the on-disk database and other runtime assets.
///
/// `TASKFLOW_ASSET_DIR` overrides the default (tests point this at a temp
/// directory); otherwise the platform data directory is used.
pub fn asset_dir() -> std::path::PathBuf {
    if let Ok(override_dir) = std::env::var(ASSET_DIR_ENV) {
        let override_dir = override_dir.trim();
        if !override_dir.is_empty() {
            let path = std::path::PathBuf::from(override_dir);
            if !path.exists() {
                std::fs::create_dir_all(&path).expect("Failed to create asset directory");
            }
            return path;
        }
    }

    let path = ProjectDirs::from("dev", "taskflow", "taskflow")
        .expect("OS didn't give us a home directory")
        .data_dir()
        .to_path_buf();

    if !path.exists() {
        std::fs::create_dir_all(&path).expect("Failed to create asset directory");
    }

    path
}
