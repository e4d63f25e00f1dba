use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Isolated home directory so the user's own config is never read.
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        fs::create_dir_all(temp_dir.path().join("home/.config"))?;
        Ok(Self { temp_dir })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn home(&self) -> PathBuf {
        self.path().join("home")
    }

    pub fn config_home(&self) -> PathBuf {
        self.home().join(".config")
    }

    /// The data directory shipped with the crate.
    pub fn bundled_data_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
    }

    /// Copy the bundled data into the environment so a test can break it.
    pub fn copy_data_dir(&self) -> Result<PathBuf> {
        let dest = self.path().join("data");
        copy_dir(&Self::bundled_data_dir(), &dest)?;
        Ok(dest)
    }

    pub fn write_config(&self, contents: &str) -> Result<()> {
        let dir = self.config_home().join("pkgmap");
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("pkgmap.toml"), contents)?;
        Ok(())
    }
}

fn copy_dir(source: &Path, target: &Path) -> Result<()> {
    if !source.is_dir() {
        return Err(anyhow!(
            "Cannot copy data directory; source is not a directory: {}",
            source.display()
        ));
    }

    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(source).with_context(|| {
            format!(
                "Failed to determine relative path while copying data: {}",
                entry.path().display()
            )
        })?;
        let destination = target.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination).with_context(|| {
                format!("Failed to create directory: {}", destination.display())
            })?;
        } else {
            fs::copy(entry.path(), &destination).with_context(|| {
                format!(
                    "Failed to copy {} to {}",
                    entry.path().display(),
                    destination.display()
                )
            })?;
        }
    }
    Ok(())
}
