//! Filesystem capability
//!
//! Every component that reads or writes disk receives an `Arc<dyn Filesystem>`
//! at construction instead of calling `std::fs` directly, so tests can inject
//! failures and the working directory can be pinned.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Mode for credential files and the state document
pub const FILE_MODE: u32 = 0o600;
/// Mode for managed directories
pub const DIR_MODE: u32 = 0o700;

pub trait Filesystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Create or truncate `path`, write `contents`, fsync
    fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> io::Result<()>;

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    fn is_file(&self, path: &Path) -> bool;

    fn current_dir(&self) -> io::Result<PathBuf>;

    /// A scratch directory removed when the returned guard drops
    fn scratch_dir(&self, prefix: &str) -> io::Result<tempfile::TempDir>;
}

/// Write through a sibling `<name>.tmp` file and rename over the target
pub fn write_atomic(
    fs: &dyn Filesystem,
    path: &Path,
    contents: &[u8],
    mode: u32,
) -> io::Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs.write_file(&tmp_path, contents, mode)?;
    fs.rename(&tmp_path, path)
}

/// Remove a file, treating "already gone" as success
pub fn remove_file_if_exists(fs: &dyn Filesystem, path: &Path) -> io::Result<()> {
    match fs.remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Remove a directory tree, treating "already gone" as success
pub fn remove_dir_if_exists(fs: &dyn Filesystem, path: &Path) -> io::Result<()> {
    match fs.remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// The real operating-system filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFilesystem;

impl Filesystem for OsFilesystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> io::Result<()> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode);
        }
        let mut file = options.open(path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        set_mode(path, mode)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
        fs::create_dir_all(path)?;
        set_mode(path, mode)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn current_dir(&self) -> io::Result<PathBuf> {
        std::env::current_dir()
    }

    fn scratch_dir(&self, prefix: &str) -> io::Result<tempfile::TempDir> {
        tempfile::Builder::new().prefix(prefix).tempdir()
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}
