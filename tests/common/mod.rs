//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_demo();
//!     fixture.command().arg("build-all").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::documents;
    #[allow(unused_imports)]
    pub use super::git_available;
    pub use super::TestFixture;
}

/// Documents of the demo config set, as the CLI writes them.
#[allow(dead_code)]
pub mod documents {
    pub const BASE_SCHEMA: &str = r#"{
  "$id": "demo-configset.schemas.base-schema",
  "$version": 1,
  "type": "object",
  "properties": {
    "some_prop": { "type": "string" }
  }
}
"#;

    pub const EXTENDED_SCHEMA: &str = r#"{
  "$id": "demo-configset.schemas.extended-schema",
  "$version": 1,
  "$inheritsFrom": "demo-configset.schemas.base-schema",
  "type": "object",
  "properties": {
    "name": { "type": "string" }
  }
}
"#;

    pub const BASE_MODEL: &str = r#"{
  "$id": "demo-configset.models.base-model",
  "$version": 1,
  "$ref": "demo-configset.schemas.base-schema",
  "some_prop": "x"
}
"#;

    pub const EXTENDED_MODEL: &str = r#"{
  "$id": "demo-configset.models.extended-model",
  "$version": 1,
  "$refs": [
    "demo-configset.schemas.extended-schema",
    "demo-configset.models.base-model"
  ],
  "name": "y"
}
"#;
}

/// Whether a usable `git` binary is on the PATH.
#[allow(dead_code)]
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// A temporary workspace root for `layercfg`.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Create an empty config set named `name`.
    pub fn with_config_set(self, name: &str) -> Self {
        for category in ["schemas", "models", "instances"] {
            self.temp_dir
                .child(name)
                .child(category)
                .create_dir_all()
                .expect("Failed to create category directory");
        }
        self
    }

    /// Lay out the demo config set by hand.
    #[allow(dead_code)]
    pub fn with_demo(self) -> Self {
        self.with_config_set("demo-configset")
            .with_file("demo-configset/schemas/base-schema.json", documents::BASE_SCHEMA)
            .with_file("demo-configset/schemas/extended-schema.json", documents::EXTENDED_SCHEMA)
            .with_file("demo-configset/models/base-model.json", documents::BASE_MODEL)
            .with_file("demo-configset/models/extended-model.json", documents::EXTENDED_MODEL)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute path of `relative` inside the fixture.
    #[allow(dead_code)]
    pub fn join(&self, relative: &str) -> PathBuf {
        self.temp_dir.path().join(relative)
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Parse a JSON file inside the fixture.
    #[allow(dead_code)]
    pub fn read_json(&self, relative: &str) -> serde_json::Value {
        let text = std::fs::read_to_string(self.join(relative)).expect("Failed to read file");
        serde_json::from_str(&text).expect("File is not valid JSON")
    }

    /// Run `git` in the fixture root and assert it succeeded.
    #[allow(dead_code)]
    pub fn git(&self, args: &[&str]) {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .output()
            .expect("Failed to run git");
        assert!(output.status.success(), "git {:?} failed: {:?}", args, output);
    }

    /// Initialise a repository and commit everything in the fixture.
    #[allow(dead_code)]
    pub fn git_init_and_commit(&self) {
        self.git(&["init", "-q"]);
        self.git(&["config", "user.email", "dev@example.com"]);
        self.git(&["config", "user.name", "Dev"]);
        self.commit_all("initial");
    }

    /// Stage and commit every file.
    #[allow(dead_code)]
    pub fn commit_all(&self, message: &str) {
        self.git(&["add", "-A"]);
        self.git(&["-c", "commit.gpgsign=false", "commit", "-q", "--allow-empty", "-m", message]);
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFixture {
    /// `layercfg` rooted at this fixture, without color.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("layercfg");
        cmd.current_dir(self.path())
            .env_remove("LAYERCFG_ROOT")
            .arg("--color")
            .arg("never");
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.path().exists());
    }

    #[test]
    fn test_fixture_with_demo() {
        let fixture = TestFixture::new().with_demo();
        assert!(fixture.join("demo-configset/instances").is_dir());
        assert!(fixture.join("demo-configset/models/extended-model.json").exists());
    }

    #[test]
    fn test_demo_documents_are_valid_json() {
        for document in [
            documents::BASE_SCHEMA,
            documents::EXTENDED_SCHEMA,
            documents::BASE_MODEL,
            documents::EXTENDED_MODEL,
        ] {
            serde_json::from_str::<serde_json::Value>(document).expect("Document should be valid JSON");
        }
    }
}
