use crate::path::clean_path;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// File-system collaborator used for every physical access the content manager makes.
pub trait FileSystem: Send + Sync + 'static {
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;
    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    fn file_exists(&self, path: &Path) -> bool;
    fn directory_exists(&self, path: &Path) -> bool;

    /// Files directly inside `dir`. Missing directories yield an empty list.
    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
    /// Subdirectories directly inside `dir`. Missing directories yield an empty list.
    fn list_directories(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    /// Absolute, lexically cleaned form of `path`.
    fn full_path(&self, path: &Path) -> PathBuf;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl StdFileSystem {
    fn list(dir: &Path, want_dirs: bool) -> io::Result<Vec<PathBuf>> {
        let rd = match fs::read_dir(dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut out = Vec::new();
        for entry in rd {
            let entry = entry?;
            let ft = entry.file_type()?;
            if ft.is_dir() == want_dirs && (want_dirs || ft.is_file() || ft.is_symlink()) {
                out.push(entry.path());
            }
        }
        out.sort();
        Ok(out)
    }
}

impl FileSystem for StdFileSystem {
    #[inline]
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(io::BufReader::new(fs::File::open(path)?)))
    }

    #[inline]
    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(io::BufWriter::new(fs::File::create(path)?)))
    }

    #[inline]
    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    #[inline]
    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    #[inline]
    fn directory_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    #[inline]
    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        Self::list(dir, false)
    }

    #[inline]
    fn list_directories(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        Self::list(dir, true)
    }

    fn full_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return clean_path(path);
        }
        match std::env::current_dir() {
            Ok(cwd) => clean_path(&cwd.join(path)),
            Err(_) => clean_path(path),
        }
    }
}
