//! Implements the `Drive` trait with in-memory documents for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without using Google Drive.

use crate::api::Drive;
use crate::error::Res;
use anyhow::{bail, Context};
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, MutexGuard};

/// Documents shared by every `TestDrive` in the process, keyed by file id. Each invocation of the
/// program builds a new `TestDrive`, so state has to live outside of it.
static STATE: LazyLock<Mutex<HashMap<String, TestDriveState>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// The stored state of one document in the `TestDrive`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDriveState {
    /// The document content, or `None` if the file does not exist.
    pub bytes: Option<Vec<u8>>,
    /// Incremented on every successful replace.
    pub version: u64,
    /// How many times the document was replaced.
    pub replace_count: u64,
    /// When set, the next fetch fails as if the network were down.
    pub fail_fetch: bool,
    /// When set, every replace fails as if the network were down.
    pub fail_replace: bool,
    /// When set, the next download first stores these bytes as another writer would, bumping the
    /// version.
    pub concurrent_upload: Option<Vec<u8>>,
}

impl Default for TestDriveState {
    /// Seeds the document with sample records.
    fn default() -> Self {
        Self {
            bytes: Some(SEED_DOCUMENT.as_bytes().to_vec()),
            version: 1,
            replace_count: 0,
            fail_fetch: false,
            fail_replace: false,
            concurrent_upload: None,
        }
    }
}

impl TestDriveState {
    /// A state holding `bytes` at version 1.
    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Some(bytes.into()),
            ..Default::default()
        }
    }
}

/// An implementation of the `Drive` trait that does not use Google Drive. Documents that have never
/// been written are seeded with sample data.
#[derive(Debug, Clone)]
pub struct TestDrive {
    file_id: String,
}

impl TestDrive {
    /// Creates a `TestDrive` bound to `file_id`, seeding the document if it does not exist yet.
    pub fn new(file_id: impl Into<String>) -> Self {
        let file_id = file_id.into();
        let _ = lock().entry(file_id.clone()).or_default();
        Self { file_id }
    }

    /// A copy of the current state of this drive's document.
    pub fn get_state(&self) -> TestDriveState {
        lock().entry(self.file_id.clone()).or_default().clone()
    }

    /// Replaces the state of this drive's document.
    pub fn set_state(&self, state: TestDriveState) {
        let _ = lock().insert(self.file_id.clone(), state);
    }

    /// Runs `f` on the state of this drive's document.
    pub fn update_state(&self, f: impl FnOnce(&mut TestDriveState)) {
        f(lock().entry(self.file_id.clone()).or_default())
    }

    fn check_file_id(&self, file_id: &str) -> Res<()> {
        if file_id != self.file_id {
            bail!(
                "This test drive is bound to file '{}', not '{file_id}'",
                self.file_id
            );
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Drive for TestDrive {
    async fn download(&mut self, file_id: &str) -> Res<Vec<u8>> {
        self.check_file_id(file_id)?;
        let mut map = lock();
        let state = map.entry(file_id.to_string()).or_default();
        if state.fail_fetch {
            state.fail_fetch = false;
            bail!("Simulated network failure while downloading '{file_id}'");
        }
        if let Some(bytes) = state.concurrent_upload.take() {
            state.bytes = Some(bytes);
            state.version += 1;
            state.replace_count += 1;
        }
        state
            .bytes
            .clone()
            .with_context(|| format!("File not found: '{file_id}'"))
    }

    async fn version(&mut self, file_id: &str) -> Res<Option<String>> {
        self.check_file_id(file_id)?;
        let mut map = lock();
        let state = map.entry(file_id.to_string()).or_default();
        if state.bytes.is_none() {
            bail!("File not found: '{file_id}'");
        }
        Ok(Some(state.version.to_string()))
    }

    async fn replace(&mut self, file_id: &str, bytes: &[u8]) -> Res<Option<String>> {
        self.check_file_id(file_id)?;
        let mut map = lock();
        let state = map.entry(file_id.to_string()).or_default();
        if state.fail_replace {
            bail!("Simulated network failure while uploading '{file_id}'");
        }
        if state.bytes.is_none() {
            bail!("File not found: '{file_id}'");
        }
        state.bytes = Some(bytes.to_vec());
        state.version += 1;
        state.replace_count += 1;
        Ok(Some(state.version.to_string()))
    }
}

/// A poisoned lock only means another test panicked while holding it. The map is still usable.
fn lock() -> MutexGuard<'static, HashMap<String, TestDriveState>> {
    STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Seed records.
const SEED_DOCUMENT: &str = r##"[
  {
    "id": 1,
    "Mês/Ano": "2025-09",
    "TipoOperacao": "Despesa",
    "Categoria": "Ocupação",
    "Fornecedor": "Imobiliária Horizonte",
    "Descrição": "Aluguel do escritório",
    "Categoria Financeira": "Aluguel",
    "Conta Contábil": "3.1.01 Aluguéis",
    "Valor": 4500.0
  },
  {
    "id": 2,
    "Mês/Ano": "2025-09",
    "TipoOperacao": "Despesa",
    "Categoria": "Utilidades",
    "Fornecedor": "Companhia Elétrica",
    "Descrição": "Conta de energia",
    "Categoria Financeira": "Energia",
    "Conta Contábil": "3.1.02 Utilidades",
    "Valor": 612.37
  },
  {
    "id": 3,
    "Mês/Ano": "2025-09",
    "TipoOperacao": "Receita",
    "Categoria": "Serviços",
    "Fornecedor": "Cliente Alfa Ltda",
    "Descrição": "Consultoria mensal",
    "Categoria Financeira": "Vendas",
    "Conta Contábil": "4.1.01 Receita de Serviços",
    "Valor": 18250.0
  },
  {
    "id": 4,
    "Mês/Ano": "2025-10",
    "TipoOperacao": "Despesa",
    "Categoria": "Ocupação",
    "Fornecedor": "Imobiliária Horizonte",
    "Descrição": "Aluguel do escritório",
    "Categoria Financeira": "Aluguel",
    "Conta Contábil": "3.1.01 Aluguéis",
    "Valor": 4500.0
  },
  {
    "id": 5,
    "Mês/Ano": "2025-10",
    "TipoOperacao": "Despesa",
    "Categoria": "Pessoal",
    "Fornecedor": "Folha de Pagamento",
    "Descrição": "Salários",
    "Categoria Financeira": "Folha",
    "Conta Contábil": "3.2.01 Salários",
    "Valor": "9800.00"
  },
  {
    "id": 6,
    "Mês/Ano": "2025-10",
    "TipoOperacao": "Receita",
    "Categoria": "Serviços",
    "Fornecedor": "Cliente Beta S.A.",
    "Descrição": "Projeto de implantação",
    "Categoria Financeira": "Vendas",
    "Conta Contábil": "4.1.01 Receita de Serviços",
    "Valor": 23400.5
  },
  {
    "id": 7,
    "Mês/Ano": "2025-10",
    "TipoOperacao": "Despesa",
    "Categoria": "Utilidades",
    "Fornecedor": "Companhia Elétrica",
    "Descrição": "Conta de energia",
    "Categoria Financeira": "Energia",
    "Conta Contábil": "3.1.02 Utilidades",
    "Valor": "a conferir",
    "Observação": "valor pendente de confirmação"
  }
]
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecordSet;

    fn unique_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    #[tokio::test]
    async fn test_seed_document_parses() {
        let id = unique_id();
        let mut drive = TestDrive::new(&id);
        let doc = drive.fetch(&id).await.unwrap();
        assert_eq!(doc.version.as_deref(), Some("1"));
        let set = RecordSet::parse(&doc.bytes).unwrap();
        assert_eq!(set.len(), 7);
        assert_eq!(set.available_periods(), vec!["2025-10", "2025-09"]);
    }

    #[tokio::test]
    async fn test_replace_bumps_version() {
        let id = unique_id();
        let mut drive = TestDrive::new(&id);
        let version = drive.replace(&id, b"[]").await.unwrap();
        assert_eq!(version.as_deref(), Some("2"));
        let state = drive.get_state();
        assert_eq!(state.bytes.as_deref(), Some(b"[]".as_slice()));
        assert_eq!(state.replace_count, 1);
        assert_eq!(drive.version(&id).await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_state_is_shared_between_instances() {
        let id = unique_id();
        let mut first = TestDrive::new(&id);
        first.replace(&id, b"[{\"id\": 1}]").await.unwrap();
        let mut second = TestDrive::new(&id);
        let doc = second.fetch(&id).await.unwrap();
        assert_eq!(doc.bytes, b"[{\"id\": 1}]".to_vec());
    }

    #[tokio::test]
    async fn test_simulated_failures() {
        let id = unique_id();
        let mut drive = TestDrive::new(&id);
        drive.update_state(|s| s.fail_fetch = true);
        assert!(drive.fetch(&id).await.is_err());
        assert!(drive.fetch(&id).await.is_ok());

        drive.update_state(|s| s.fail_replace = true);
        let message = drive.replace(&id, b"[]").await.unwrap_err().to_string();
        assert!(message.contains("Simulated network failure"), "{message}");
        assert_eq!(drive.get_state().replace_count, 0);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let id = unique_id();
        let mut drive = TestDrive::new(&id);
        drive.set_state(TestDriveState {
            bytes: None,
            ..Default::default()
        });
        let message = drive.fetch(&id).await.unwrap_err().to_string();
        assert!(message.contains("File not found"), "{message}");
        assert!(drive.replace(&id, b"[]").await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_reads_version_before_content() {
        let id = unique_id();
        let mut drive = TestDrive::new(&id);
        drive.set_state(TestDriveState::with_bytes("[]"));
        drive.update_state(|s| s.concurrent_upload = Some(b"[{\"id\": 1}]".to_vec()));
        let doc = drive.fetch(&id).await.unwrap();
        // The content is newer than the version we hold
        assert_eq!(doc.bytes, b"[{\"id\": 1}]".to_vec());
        assert_eq!(doc.version.as_deref(), Some("1"));
        assert_eq!(drive.version(&id).await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_wrong_file_id() {
        let id = unique_id();
        let mut drive = TestDrive::new(&id);
        assert!(drive.fetch("some-other-file").await.is_err());
    }
}
