//! Project Registry
//!
//! Maps project codes to register files under
//! `<root>/Risk_Registers/Risk_Register_<CODE>.db`.

use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use sqlx::{ConnectOptions, Connection};
use tracing::info;

use super::schema::Sheet;
use super::store::{RegisterHandle, RegisterStore};
use crate::{Error, Result};

/// Folder under the root that holds register files
pub const REGISTER_DIR: &str = "Risk_Registers";

const FILE_PREFIX: &str = "Risk_Register_";
const FILE_EXTENSION: &str = "db";

/// Current register schema version
pub const SCHEMA_VERSION: i64 = 1;

/// Locates per-project registers
#[derive(Debug, Clone)]
pub struct ProjectRegistry {
    root: PathBuf,
}

impl ProjectRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn register_dir(&self) -> PathBuf {
        self.root.join(REGISTER_DIR)
    }

    /// Conventional path for a project's register (may not exist)
    pub fn path_for(&self, project_code: &str) -> Result<PathBuf> {
        validate_project_code(project_code)?;
        Ok(self
            .register_dir()
            .join(format!("{}{}.{}", FILE_PREFIX, project_code, FILE_EXTENSION)))
    }

    /// Whether a register has been provisioned for the project
    pub fn exists(&self, project_code: &str) -> bool {
        self.path_for(project_code)
            .map(|p| p.is_file())
            .unwrap_or(false)
    }

    /// Path of an existing register
    pub fn locate(&self, project_code: &str) -> Result<PathBuf> {
        let path = self.path_for(project_code)?;
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::RegisterNotFound(path))
        }
    }

    /// Open a project's register for writing
    pub async fn open(&self, project_code: &str) -> Result<RegisterHandle> {
        RegisterStore::open(&self.locate(project_code)?).await
    }

    /// Open a project's register for reading
    pub async fn open_read_only(&self, project_code: &str) -> Result<RegisterHandle> {
        RegisterStore::open_read_only(&self.locate(project_code)?).await
    }

    /// Sorted codes of every provisioned project
    pub fn list_projects(&self) -> Result<Vec<String>> {
        let dir = self.register_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut projects = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            let code = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_prefix(FILE_PREFIX));
            if let Some(code) = code {
                if validate_project_code(code).is_ok() {
                    projects.push(code.to_string());
                }
            }
        }

        projects.sort();
        Ok(projects)
    }

    /// Create an empty register with every sheet
    ///
    /// Fails if the project already has a register.
    pub async fn provision(&self, project_code: &str) -> Result<PathBuf> {
        let path = self.path_for(project_code)?;
        if path.exists() {
            return Err(Error::InvalidInput(format!(
                "Risk Register already exists at {}",
                path.display()
            )));
        }

        std::fs::create_dir_all(self.register_dir())?;

        let mut conn = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Delete)
            .connect()
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&mut conn)
        .await?;

        for sheet in Sheet::ALL {
            sqlx::query(&sheet.create_table_sql())
                .execute(&mut conn)
                .await?;
        }

        sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
            .bind(SCHEMA_VERSION)
            .execute(&mut conn)
            .await?;

        conn.close().await?;

        info!(project = project_code, path = %path.display(), "Provisioned new Risk Register");
        Ok(path)
    }
}

/// Project codes are short identifiers used verbatim in file names
pub fn validate_project_code(project_code: &str) -> Result<()> {
    let valid = !project_code.is_empty()
        && project_code.len() <= 16
        && project_code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "Invalid project code: {:?}",
            project_code
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_project_code() {
        assert!(validate_project_code("HB").is_ok());
        assert!(validate_project_code("NSD_2").is_ok());
        assert!(validate_project_code("").is_err());
        assert!(validate_project_code("../etc").is_err());
        assert!(validate_project_code("A B").is_err());
        assert!(validate_project_code("ABCDEFGHIJKLMNOPQ").is_err());
    }

    #[test]
    fn test_path_convention() {
        let registry = ProjectRegistry::new("/data");
        let path = registry.path_for("HB").unwrap();
        assert_eq!(path, PathBuf::from("/data/Risk_Registers/Risk_Register_HB.db"));
    }

    #[test]
    fn test_locate_missing_register() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ProjectRegistry::new(dir.path());
        assert!(!registry.exists("HB"));
        assert!(matches!(registry.locate("HB"), Err(Error::RegisterNotFound(_))));
    }

    #[tokio::test]
    async fn test_provision_then_list() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ProjectRegistry::new(dir.path());

        registry.provision("RH").await.unwrap();
        registry.provision("HB").await.unwrap();
        std::fs::write(registry.register_dir().join("notes.txt"), "x").unwrap();

        assert!(registry.exists("HB"));
        assert_eq!(registry.list_projects().unwrap(), vec!["HB", "RH"]);
    }

    #[tokio::test]
    async fn test_provision_refuses_existing() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ProjectRegistry::new(dir.path());

        registry.provision("HB").await.unwrap();
        let again = registry.provision("HB").await;
        assert!(matches!(again, Err(Error::InvalidInput(_))));
    }
}
