//! The standard fixture tree.
//!
//! Mirrors the layout scenario tests are written against: plain files,
//! dotfiles, files without extension, nested directories and directory
//! names full of glob metacharacters.

use copy_fs::MemoryFs;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Every file of the fixture tree with its content.
pub const FIXTURE_FILES: &[(&str, &str)] = &[
    ("file.txt", "new"),
    (".file.txt", ""),
    ("file.txt.gz", ""),
    ("binextension.bin", ""),
    ("noextension", ""),
    ("directory/directoryfile.txt", "new"),
    ("directory/.dottedfile", "dottedfile contents\n"),
    ("directory/nested/nestedfile.txt", ""),
    ("directory/nested/deep-nested/deepnested.txt", ""),
    ("dir (86)/file.txt", ""),
    ("dir (86)/nesteddir/nestedfile.txt", ""),
    ("dir (86)/nesteddir/deepnesteddir/deepnesteddir.txt", ""),
    ("[!]/hello.txt", ""),
    ("[special?directory]/directoryfile.txt", "new"),
    ("[special?directory]/(special-*file).txt", ""),
    ("[special?directory]/nested/nestedfile.txt", ""),
];

/// The fixture tree written to a temporary directory.
///
/// Names containing `?` are skipped on Windows, where they are not valid.
///
/// # Example
///
/// ```rust,no_run
/// use copy_test_utils::Fixture;
///
/// let fixture = Fixture::new();
/// fixture.assert_file_exists("directory/directoryfile.txt");
/// ```
pub struct Fixture {
    temp_dir: TempDir,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    /// Create a temporary directory holding every fixture file.
    pub fn new() -> Self {
        let fixture = Self::empty();
        for (path, content) in FIXTURE_FILES {
            if cfg!(windows) && path.contains('?') {
                continue;
            }
            fixture.write(path, content);
        }
        fixture
    }

    /// Create an empty temporary directory.
    pub fn empty() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Return the root path of the fixture.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute path of `path` inside the fixture.
    pub fn path(&self, path: &str) -> PathBuf {
        self.root().join(path)
    }

    /// Write a file, creating parent directories.
    pub fn write(&self, path: &str, content: &str) {
        let full_path = self.path(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full_path, content)
            .unwrap_or_else(|e| panic!("Could not write {}: {e}", full_path.display()));
    }

    /// Assert that `path` (relative to the root) exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, path: &str) {
        let full_path = self.path(path);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// Assert that `path` (relative to the root) does **not** exist.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_file_not_exists(&self, path: &str) {
        let full_path = self.path(path);
        assert!(
            !full_path.exists(),
            "Expected file NOT to exist: {}",
            full_path.display()
        );
    }

    /// Assert that the file at `path` has exactly `content`.
    ///
    /// # Panics
    /// Panics if the file cannot be read or differs.
    pub fn assert_file_content(&self, path: &str, content: &str) {
        let full_path = self.path(path);
        let actual = fs::read_to_string(&full_path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", full_path.display()));
        assert_eq!(
            actual,
            content,
            "Unexpected content in {}",
            full_path.display()
        );
    }
}

/// The fixture tree in memory, rooted at `root`.
pub fn memory_fixture(root: impl AsRef<Path>) -> MemoryFs {
    let fs = MemoryFs::new();
    for (path, content) in FIXTURE_FILES {
        fs.write_file(root.as_ref().join(path), content.as_bytes().to_vec());
    }
    fs
}
