use std::path::{Path, PathBuf};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::database::entities::todo_attachments;
use crate::errors::{CoreError, CoreResult};

use super::todo_service::find_todo;

/// A file received from a multipart form, before it is checked and stored
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct AttachmentService {
    db: DatabaseConnection,
    uploads: UploadConfig,
}

impl AttachmentService {
    pub fn new(db: DatabaseConnection, uploads: UploadConfig) -> Self {
        Self { db, uploads }
    }

    pub async fn list(&self, wedding_id: i32, todo_id: i32) -> CoreResult<Vec<todo_attachments::Model>> {
        let todo = find_todo(&self.db, wedding_id, todo_id).await?;
        Ok(todo_attachments::Entity::find()
            .filter(todo_attachments::Column::TodoId.eq(todo.id))
            .order_by_asc(todo_attachments::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Check and store an uploaded file for a todo
    pub async fn upload(
        &self,
        wedding_id: i32,
        todo_id: i32,
        uploaded_by: i32,
        file: IncomingFile,
    ) -> CoreResult<todo_attachments::Model> {
        let todo = find_todo(&self.db, wedding_id, todo_id).await?;
        let extension = self.check_file(&file)?;

        let checksum = format!("{:x}", Sha256::digest(&file.bytes));
        let stored_name = format!("{}.{}", Uuid::new_v4(), extension);
        let path = self.uploads.dir.join(&stored_name);

        tokio::fs::create_dir_all(&self.uploads.dir).await?;
        tokio::fs::write(&path, &file.bytes).await?;

        let content_type = file
            .content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| content_type_for(&extension).to_string());

        let inserted = todo_attachments::ActiveModel {
            todo_id: Set(todo.id),
            original_name: Set(display_name(&file.file_name)),
            stored_name: Set(stored_name),
            content_type: Set(content_type),
            size_bytes: Set(file.bytes.len() as i64),
            checksum: Set(checksum),
            uploaded_by: Set(Some(uploaded_by)),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await;

        let attachment = match inserted {
            Ok(attachment) => attachment,
            Err(err) => {
                remove_file(&path).await;
                return Err(err.into());
            }
        };

        info!(
            todo_id,
            attachment_id = attachment.id,
            size = attachment.size_bytes,
            checksum = %attachment.checksum,
            "stored attachment"
        );
        Ok(attachment)
    }

    /// Attachment row and file contents
    pub async fn open(
        &self,
        wedding_id: i32,
        todo_id: i32,
        attachment_id: i32,
    ) -> CoreResult<(todo_attachments::Model, Vec<u8>)> {
        let attachment = self.find(wedding_id, todo_id, attachment_id).await?;
        let path = self.uploads.dir.join(&attachment.stored_name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!(attachment_id, path = %path.display(), "attachment file is missing");
                return Err(CoreError::not_found("Attachment file", attachment_id.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        Ok((attachment, bytes))
    }

    pub async fn delete(&self, wedding_id: i32, todo_id: i32, attachment_id: i32) -> CoreResult<()> {
        let attachment = self.find(wedding_id, todo_id, attachment_id).await?;
        todo_attachments::Entity::delete_by_id(attachment.id)
            .exec(&self.db)
            .await?;
        remove_file(&self.uploads.dir.join(&attachment.stored_name)).await;
        Ok(())
    }

    /// Remove the stored files of every attachment of a todo. Rows go away
    /// with the todo through the foreign key cascade.
    pub async fn remove_files_for_todo(&self, wedding_id: i32, todo_id: i32) -> CoreResult<()> {
        for attachment in self.list(wedding_id, todo_id).await? {
            remove_file(&self.uploads.dir.join(&attachment.stored_name)).await;
        }
        Ok(())
    }

    async fn find(&self, wedding_id: i32, todo_id: i32, attachment_id: i32) -> CoreResult<todo_attachments::Model> {
        let todo = find_todo(&self.db, wedding_id, todo_id).await?;
        todo_attachments::Entity::find_by_id(attachment_id)
            .filter(todo_attachments::Column::TodoId.eq(todo.id))
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("Attachment", attachment_id.to_string()))
    }

    /// Size and extension checks; returns the lowercase extension
    fn check_file(&self, file: &IncomingFile) -> CoreResult<String> {
        if file.bytes.is_empty() {
            return Err(CoreError::field("file", "The submitted file is empty"));
        }
        if file.bytes.len() > self.uploads.max_bytes {
            return Err(CoreError::field(
                "file",
                format!(
                    "File is too large ({} bytes, limit {} bytes)",
                    file.bytes.len(),
                    self.uploads.max_bytes
                ),
            ));
        }

        let extension = Path::new(&file.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .ok_or_else(|| CoreError::field("file", format!("'{}' has no file extension", file.file_name)))?;

        if !self.uploads.allowed_extensions.iter().any(|allowed| *allowed == extension) {
            return Err(CoreError::field(
                "file",
                format!(
                    "File type '.{}' is not allowed. Allowed: {}",
                    extension,
                    self.uploads.allowed_extensions.join(", ")
                ),
            ));
        }
        Ok(extension)
    }
}

/// Base name of a client supplied path, never empty
fn display_name(file_name: &str) -> String {
    let base = PathBuf::from(file_name.replace('\\', "/"))
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .unwrap_or_default();
    if base.trim().is_empty() {
        "attachment".to_string()
    } else {
        base.chars().take(255).collect()
    }
}

fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "txt" => "text/plain",
        "csv" => "text/csv",
        _ => "application/octet-stream",
    }
}

async fn remove_file(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await {
        if err.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %err, "failed to remove attachment file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::test_utils::setup_test_db;
    use crate::services::test_support::{create_todo, create_user, create_wedding};

    fn file(name: &str, bytes: &[u8]) -> IncomingFile {
        IncomingFile {
            file_name: name.to_string(),
            content_type: None,
            bytes: bytes.to_vec(),
        }
    }

    #[tokio::test]
    async fn stores_file_with_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let todo = create_todo(&db, wedding.id, "Contract", None, None).await;
        let config = AppConfig::for_tests(dir.path().to_path_buf());
        let service = AttachmentService::new(db.clone(), config.uploads);

        let stored = service
            .upload(wedding.id, todo.id, owner.id, file("C:\\docs\\Venue.PDF", b"hello"))
            .await
            .unwrap();
        assert_eq!(stored.original_name, "Venue.PDF");
        assert_eq!(stored.content_type, "application/pdf");
        assert_eq!(stored.size_bytes, 5);
        assert_eq!(
            stored.checksum,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert!(stored.stored_name.ends_with(".pdf"));

        let (_, bytes) = service.open(wedding.id, todo.id, stored.id).await.unwrap();
        assert_eq!(bytes, b"hello");

        service.delete(wedding.id, todo.id, stored.id).await.unwrap();
        assert!(!dir.path().join(&stored.stored_name).exists());
    }

    #[tokio::test]
    async fn rejects_bad_type_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let db = setup_test_db().await;
        let owner = create_user(&db, "owner").await;
        let wedding = create_wedding(&db, owner.id).await;
        let todo = create_todo(&db, wedding.id, "Contract", None, None).await;
        let config = AppConfig::for_tests(dir.path().to_path_buf());
        let limit = config.uploads.max_bytes;
        let service = AttachmentService::new(db.clone(), config.uploads);

        assert!(service
            .upload(wedding.id, todo.id, owner.id, file("run.exe", b"MZ"))
            .await
            .is_err());
        assert!(service
            .upload(wedding.id, todo.id, owner.id, file("empty.txt", b""))
            .await
            .is_err());
        let big = vec![0u8; limit + 1];
        assert!(service
            .upload(wedding.id, todo.id, owner.id, file("big.txt", &big))
            .await
            .is_err());
        assert!(service.list(wedding.id, todo.id).await.unwrap().is_empty());
    }
}
