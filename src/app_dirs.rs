use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Centralized application directory resolution. A data dir, when given,
/// holds every file.
#[derive(Debug, Clone, Default)]
pub struct AppDirs {
    data_dir: Option<PathBuf>,
}

impl AppDirs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            data_dir: Some(dir.as_ref().to_path_buf()),
        }
    }

    pub fn config_path(&self) -> Option<PathBuf> {
        match &self.data_dir {
            Some(dir) => Some(dir.join("config.json")),
            None => ProjectDirs::from("", "", "touchless")
                .map(|proj_dirs| proj_dirs.config_dir().join("config.json")),
        }
    }

    pub fn model_path(&self) -> Option<PathBuf> {
        self.state_dir().map(|dir| dir.join("model.json"))
    }

    pub fn db_path(&self) -> Option<PathBuf> {
        self.state_dir().map(|dir| dir.join("samples.db"))
    }

    fn state_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Some(dir.clone());
        }
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("touchless"),
            )
        } else {
            ProjectDirs::from("", "", "touchless")
                .map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
        }
    }
}
