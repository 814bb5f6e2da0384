//! Shared test utilities for creating test environments.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::api::{TestDrive, TestDriveState};
use crate::Config;
use tempfile::TempDir;
use uuid::Uuid;

/// Test environment that sets up a drive-ledger home directory with a Config whose document lives
/// in the `TestDrive`. Holds TempDir to keep the directory alive for the duration of the test.
pub struct TestEnv {
    _temp_dir: TempDir,
    config: Config,
}

impl TestEnv {
    /// Creates a test environment bound to a unique, seeded `TestDrive` document.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("drive-ledger");
        let secret_path = temp_dir.path().join("client_secret.json");

        // Create minimal client_secret.json
        let secret_content = r#"{
            "installed": {
                "client_id": "test-client-id",
                "client_secret": "test-secret",
                "redirect_uris": ["http://localhost"],
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token"
            }
        }"#;
        std::fs::write(&secret_path, secret_content).unwrap();

        let rand = Uuid::new_v4().to_string().replace('-', "");
        let document_url = format!("https://drive.google.com/file/d/{rand}/view");
        let config = Config::create(&root, &secret_path, &document_url)
            .await
            .unwrap();

        Self {
            _temp_dir: temp_dir,
            config,
        }
    }

    /// Creates a test environment whose document holds `json`.
    pub async fn with_document(json: &str) -> Self {
        let env = Self::new().await;
        env.set_state(TestDriveState::with_bytes(json));
        env
    }

    /// Returns a clone of the Config.
    pub fn config(&self) -> Config {
        self.config.clone()
    }

    /// Gets the current state of the TestDrive document associated with this environment.
    pub fn get_state(&self) -> TestDriveState {
        TestDrive::new(self.config.file_id()).get_state()
    }

    /// Sets the state of the TestDrive document associated with this environment.
    pub fn set_state(&self, state: TestDriveState) {
        TestDrive::new(self.config.file_id()).set_state(state)
    }

    /// Runs `f` on the state of the TestDrive document associated with this environment.
    pub fn update_state(&self, f: impl FnOnce(&mut TestDriveState)) {
        TestDrive::new(self.config.file_id()).update_state(f)
    }

    /// The document currently stored in the TestDrive, parsed as JSON.
    pub fn document(&self) -> serde_json::Value {
        let bytes = self.get_state().bytes.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
