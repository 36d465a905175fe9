use crate::config::Backend;
use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn data_path(backend: Backend) -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("cetlog");
            Some(state_dir.join(backend.default_file_name()))
        } else {
            ProjectDirs::from("", "", "cetlog").map(|proj_dirs| {
                proj_dirs
                    .data_local_dir()
                    .join(backend.default_file_name())
            })
        }
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "cetlog").map(|pd| pd.config_dir().join("config.json"))
    }
}
