use super::ImageSaver;
use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Saves downloads into a local directory.
pub struct FileSaver {
    output_dir: PathBuf,
}

impl FileSaver {
    pub fn new(output_dir: &Path) -> Result<Self> {
        fs::create_dir_all(output_dir)?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.output_dir.join(filename)
    }
}

impl ImageSaver for FileSaver {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(filename);
        fs::write(&path, bytes)?;
        tracing::info!("Saved image to {}", path.display());
        Ok(())
    }
}
