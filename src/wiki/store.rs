//! Page store module
//!
//! Keeps one file per page, `<title>.txt`, holding the raw body bytes.
//! There is no locking: concurrent saves of the same title race and the
//! last writer wins.

use super::Page;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Suffix appended to a title to form its file name
pub const PAGE_SUFFIX: &str = ".txt";

/// Mode for newly created page files (owner read/write)
#[cfg(unix)]
const PAGE_FILE_MODE: u32 = 0o600;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The page file is missing or unreadable
    #[error("page '{title}' not found: {source}")]
    NotFound {
        title: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to save page '{title}': {source}")]
    Write {
        title: String,
        #[source]
        source: io::Error,
    },
}

/// Directory-backed page store
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Open a store, creating its directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self::new(dir))
    }

    /// File a title is stored under
    ///
    /// Callers must validate the title first; nothing here stops `..`.
    pub fn path_for(&self, title: &str) -> PathBuf {
        self.dir.join(format!("{title}{PAGE_SUFFIX}"))
    }

    /// Write the page body, creating or truncating its file
    pub async fn save(&self, page: &Page) -> Result<(), StoreError> {
        let path = self.path_for(&page.title);
        write_file(&path, &page.body)
            .await
            .map_err(|source| StoreError::Write {
                title: page.title.clone(),
                source,
            })
    }

    /// Read a page back from disk
    pub async fn load(&self, title: &str) -> Result<Page, StoreError> {
        let path = self.path_for(title);
        match fs::read(&path).await {
            Ok(body) => Ok(Page::new(title, body)),
            Err(source) => Err(StoreError::NotFound {
                title: title.to_string(),
                source,
            }),
        }
    }
}

async fn write_file(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(PAGE_FILE_MODE);

    let mut file = options.open(path).await?;
    file.write_all(data).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let body = b"line one\nline two\n\x00\xff raw bytes".to_vec();
        store.save(&Page::new("Notes", body.clone())).await.unwrap();

        let page = store.load("Notes").await.unwrap();
        assert_eq!(page.title, "Notes");
        assert_eq!(page.body, body);
    }

    #[tokio::test]
    async fn test_file_holds_exactly_the_body() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.save(&Page::new("Test1", "hello world")).await.unwrap();

        let on_disk = std::fs::read(dir.path().join("Test1.txt")).unwrap();
        assert_eq!(on_disk, b"hello world");
    }

    #[tokio::test]
    async fn test_save_truncates_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store
            .save(&Page::new("Page", "a much longer first version"))
            .await
            .unwrap();
        store.save(&Page::new("Page", "short")).await.unwrap();

        assert_eq!(store.load("Page").await.unwrap().body, b"short");
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let err = store.load("Nowhere").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { ref title, .. } if title == "Nowhere"));
    }

    #[tokio::test]
    async fn test_save_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("gone"));

        let err = store.save(&Page::new("Page", "x")).await.unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
        assert!(err.to_string().contains("failed to save page 'Page'"));
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = FileStore::open(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(store.path_for("Home"), nested.join("Home.txt"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_new_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.save(&Page::new("Private", "x")).await.unwrap();

        let mode = std::fs::metadata(store.path_for("Private"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
