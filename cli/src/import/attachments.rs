//! File attachments of file-typed properties.
//!
//! Inside the project, the content of a file value lives at
//! `public/files/{recordId}-{propertyId}-{fileName}`. Outside, in the
//! directory given by `--file-directory`, files are addressed by plain name.

use std::path::{Path, PathBuf};

use crate::error::{AttachmentError, AttachmentResult};
use crate::logs::log_info_indent;
use crate::models::Property;
use crate::store::Attrs;
use serde_json::Value;

/// Copies attachment files between a user directory and the project.
#[derive(Debug, Clone)]
pub struct FileAttachments {
    /// `--file-directory`
    directory: Option<PathBuf>,
    /// `<project>/public/files`
    files_dir: PathBuf,
}

impl FileAttachments {
    pub fn new(directory: Option<PathBuf>, files_dir: PathBuf) -> Self {
        Self {
            directory,
            files_dir,
        }
    }

    /// The user directory, required as soon as a file value is seen.
    pub fn directory(&self) -> AttachmentResult<&Path> {
        self.directory
            .as_deref()
            .ok_or(AttachmentError::MissingDirectory)
    }

    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    /// Name of a stored attachment inside the project.
    pub fn stored_name(record: i64, property: i64, file_name: &str) -> String {
        format!("{}-{}-{}", record, property, file_name)
    }

    /// Copy the files named by `attrs` for a freshly created record.
    ///
    /// Returns the number of files copied.
    pub async fn attach(&self, record: i64, files: &[Property], attrs: &Attrs) -> AttachmentResult<usize> {
        let mut copied = 0;
        for property in files {
            let Some(file_name) = attrs.get(&property.code).and_then(file_name) else {
                continue;
            };
            let source = self.directory()?.join(&file_name);
            let content = tokio::fs::read(&source)
                .await
                .map_err(|source_err| AttachmentError::Read {
                    path: source.clone(),
                    source: source_err,
                })?;

            let target = self
                .files_dir
                .join(Self::stored_name(record, property.id, &file_name));
            write_file(&target, &content).await?;

            log_info_indent(format!("file {} -> {}", file_name, target.display()), 1);
            copied += 1;
        }
        Ok(copied)
    }

    /// Copy a stored attachment out to the user directory as
    /// `{counter}-{fileName}`; returns the new name.
    pub async fn export(
        &self,
        record: i64,
        property: i64,
        file_name: &str,
        counter: usize,
    ) -> AttachmentResult<String> {
        let directory = self.directory()?;
        let source = self
            .files_dir
            .join(Self::stored_name(record, property, file_name));
        let content = tokio::fs::read(&source)
            .await
            .map_err(|e| AttachmentError::Read {
                path: source.clone(),
                source: e,
            })?;

        let name = format!("{}-{}", counter, file_name);
        write_file(&directory.join(&name), &content).await?;
        Ok(name)
    }
}

fn file_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

async fn write_file(path: &Path, content: &[u8]) -> AttachmentResult<()> {
    let to_err = |source| AttachmentError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(to_err)?;
    }
    tokio::fs::write(path, content).await.map_err(to_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn photo() -> Property {
        Property {
            id: 2005,
            model: 1002,
            code: "photo".into(),
            name: None,
            type_id: 5,
            order: None,
        }
    }

    #[tokio::test]
    async fn test_attach_copies_into_project() {
        let source = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        std::fs::write(source.path().join("a.png"), b"PNG").unwrap();

        let files_dir = project.path().join("public/files");
        let attachments = FileAttachments::new(Some(source.path().to_path_buf()), files_dir.clone());
        let attrs = json!({"photo": "a.png"});

        let copied = attachments
            .attach(5001, &[photo()], attrs.as_object().unwrap())
            .await
            .unwrap();

        assert_eq!(copied, 1);
        let stored = std::fs::read(files_dir.join("5001-2005-a.png")).unwrap();
        assert_eq!(stored, b"PNG");
    }

    #[tokio::test]
    async fn test_attach_without_directory_fails() {
        let project = TempDir::new().unwrap();
        let attachments = FileAttachments::new(None, project.path().to_path_buf());
        let attrs = json!({"photo": "a.png"});

        let err = attachments
            .attach(5001, &[photo()], attrs.as_object().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AttachmentError::MissingDirectory));
    }

    #[tokio::test]
    async fn test_missing_source_file() {
        let source = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let attachments = FileAttachments::new(
            Some(source.path().to_path_buf()),
            project.path().to_path_buf(),
        );
        let attrs = json!({"photo": "missing.png"});

        let err = attachments
            .attach(5001, &[photo()], attrs.as_object().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AttachmentError::Read { .. }));
    }

    #[tokio::test]
    async fn test_export_numbers_files() {
        let target = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        std::fs::write(project.path().join("5001-2005-a.png"), b"PNG").unwrap();

        let attachments = FileAttachments::new(
            Some(target.path().to_path_buf()),
            project.path().to_path_buf(),
        );
        let name = attachments.export(5001, 2005, "a.png", 1).await.unwrap();

        assert_eq!(name, "1-a.png");
        assert_eq!(std::fs::read(target.path().join("1-a.png")).unwrap(), b"PNG");
    }
}
