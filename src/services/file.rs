use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use bytes::Bytes;
use serde_json::Value;

use crate::db::{DocumentStore, FileFilter};
use crate::error::{AppError, Result};
use crate::models::{FileRecord, FileType, NewFile, ParentId, UploadRequest};
use crate::storage::BlobStore;

/// Fixed listing page size
pub const PAGE_SIZE: u64 = 20;

/// Standard alphabet, padding optional
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Text of a JSON value that counts as present: non-empty strings, non-zero
/// numbers, `true`, arrays and objects
fn truthy_text(value: Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

/// File service
pub struct FileService;

impl FileService {
    /// Validate an upload, write its content and index it.
    /// Nothing is written unless every check passes.
    pub async fn upload(
        docs: &dyn DocumentStore,
        blobs: &dyn BlobStore,
        user_id: &str,
        req: UploadRequest,
    ) -> Result<FileRecord> {
        let name = req
            .name
            .and_then(truthy_text)
            .ok_or_else(|| AppError::bad_request("Missing name"))?;

        let file_type = req
            .file_type
            .as_ref()
            .and_then(Value::as_str)
            .and_then(FileType::from_str)
            .ok_or_else(|| AppError::bad_request("Missing or invalid type"))?;

        // Folders never get a blob, even when data was sent
        let data = if file_type.is_folder() {
            None
        } else {
            let data = req
                .data
                .as_ref()
                .and_then(Value::as_str)
                .filter(|d| !d.is_empty())
                .ok_or_else(|| AppError::bad_request("Missing data"))?;
            Some(data)
        };

        let parent_id = match req.parent_id.folder_id() {
            Some(raw) => {
                let parent = docs
                    .find_one(&FileFilter::new().id(raw))
                    .await?
                    .ok_or_else(|| AppError::bad_request("Parent not found"))?;
                if !parent.file_type.is_folder() {
                    return Err(AppError::bad_request("Parent is not a folder"));
                }
                // Store the id as the folder holds it, not as the client spelled it
                ParentId::Folder(parent.id)
            }
            None => ParentId::Root,
        };

        let local_path = match data {
            Some(data) => {
                let bytes = Self::decode_data(data)?;
                Some(blobs.put(bytes).await?)
            }
            None => None,
        };

        let doc = NewFile {
            user_id: user_id.to_string(),
            name,
            file_type,
            is_public: req.is_public.unwrap_or(false),
            parent_id,
            local_path,
        };
        let id = docs.insert_one(&doc).await?;

        tracing::info!("User {} uploaded {} '{}' as {}", user_id, file_type.as_str(), doc.name, id);
        Ok(FileRecord::from_new(id, doc))
    }

    /// Get a file owned by `user_id`; other users' files look missing
    pub async fn show(docs: &dyn DocumentStore, user_id: &str, id: &str) -> Result<FileRecord> {
        docs.find_one(&FileFilter::new().id(id).owner(user_id))
            .await?
            .ok_or(AppError::NotFound)
    }

    /// One page of the caller's files directly under `parent_id`
    pub async fn list(
        docs: &dyn DocumentStore,
        user_id: &str,
        parent_id: ParentId,
        page: u64,
    ) -> Result<Vec<FileRecord>> {
        let filter = FileFilter::new().owner(user_id).parent(parent_id);
        let files = docs
            .find(&filter, page.saturating_mul(PAGE_SIZE), PAGE_SIZE)
            .await?;

        tracing::debug!("User {} listed page {}: {} files", user_id, page, files.len());
        Ok(files)
    }

    /// Total number of file records
    pub async fn count_files(docs: &dyn DocumentStore) -> Result<u64> {
        docs.count(&FileFilter::new()).await
    }

    fn decode_data(data: &str) -> Result<Bytes> {
        let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        BASE64
            .decode(compact)
            .map(Bytes::from)
            .map_err(|_| AppError::bad_request("Invalid data"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_database, SqliteDocumentStore};
    use crate::storage::LocalStorage;
    use serde_json::json;
    use std::path::Path;
    use tempfile::TempDir;

    struct Fixture {
        docs: SqliteDocumentStore,
        blobs: LocalStorage,
        dir: TempDir,
    }

    impl Fixture {
        async fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            Self {
                docs: SqliteDocumentStore::new(test_database().await),
                blobs: LocalStorage::new(dir.path().join("files")),
                dir,
            }
        }

        async fn upload(&self, user_id: &str, req: UploadRequest) -> Result<FileRecord> {
            FileService::upload(&self.docs, &self.blobs, user_id, req).await
        }

        async fn folder(&self, user_id: &str, name: &str) -> FileRecord {
            self.upload(user_id, request(name, "folder", None)).await.unwrap()
        }

        fn blob_count(&self) -> usize {
            match std::fs::read_dir(self.dir.path().join("files")) {
                Ok(entries) => entries.count(),
                Err(_) => 0,
            }
        }

        async fn record_count(&self) -> u64 {
            FileService::count_files(&self.docs).await.unwrap()
        }
    }

    fn request(name: &str, file_type: &str, data: Option<&str>) -> UploadRequest {
        UploadRequest {
            name: Some(Value::from(name)),
            file_type: Some(Value::from(file_type)),
            data: data.map(Value::from),
            ..Default::default()
        }
    }

    fn bad_request_message(result: Result<FileRecord>) -> String {
        match result {
            Err(AppError::BadRequest(msg)) => msg,
            other => panic!("expected bad request, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_file_writes_blob() {
        let fx = Fixture::new().await;
        let record = fx
            .upload("u1", request("test.txt", "file", Some("aGVsbG8=")))
            .await
            .unwrap();

        assert_eq!(record.user_id, "u1");
        assert_eq!(record.file_type, FileType::File);
        assert!(!record.is_public);
        assert_eq!(record.parent_id, ParentId::Root);

        let path = record.local_path.as_deref().unwrap();
        assert!(Path::new(path).starts_with(fx.dir.path().join("files")));
        assert_eq!(std::fs::read(path).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_upload_folder_ignores_data() {
        let fx = Fixture::new().await;
        let record = fx
            .upload("u1", request("docs", "folder", Some("aGVsbG8=")))
            .await
            .unwrap();

        assert_eq!(record.local_path, None);
        assert_eq!(fx.blob_count(), 0);
    }

    #[tokio::test]
    async fn test_validation_order_and_messages() {
        let fx = Fixture::new().await;

        let mut req = request("", "file", Some("aGk="));
        assert_eq!(bad_request_message(fx.upload("u1", req).await), "Missing name");

        req = request("a", "video", Some("aGk="));
        assert_eq!(
            bad_request_message(fx.upload("u1", req).await),
            "Missing or invalid type"
        );

        req = UploadRequest {
            file_type: None,
            ..request("a", "", None)
        };
        assert_eq!(
            bad_request_message(fx.upload("u1", req).await),
            "Missing or invalid type"
        );

        for kind in ["file", "image"] {
            req = request("a", kind, None);
            assert_eq!(bad_request_message(fx.upload("u1", req).await), "Missing data");
            req = request("a", kind, Some(""));
            assert_eq!(bad_request_message(fx.upload("u1", req).await), "Missing data");
        }

        req = request("a", "file", Some("***"));
        assert_eq!(bad_request_message(fx.upload("u1", req).await), "Invalid data");

        for name in [json!(0), json!(false), json!(null)] {
            req = UploadRequest {
                name: Some(name),
                ..request("", "file", Some("aGk="))
            };
            assert_eq!(bad_request_message(fx.upload("u1", req).await), "Missing name");
        }

        req = UploadRequest {
            file_type: Some(json!(7)),
            ..request("a", "", Some("aGk="))
        };
        assert_eq!(
            bad_request_message(fx.upload("u1", req).await),
            "Missing or invalid type"
        );

        req = UploadRequest {
            data: Some(json!(12)),
            ..request("a", "file", None)
        };
        assert_eq!(bad_request_message(fx.upload("u1", req).await), "Missing data");

        assert_eq!(fx.record_count().await, 0);
        assert_eq!(fx.blob_count(), 0);
    }

    #[tokio::test]
    async fn test_parent_must_be_existing_folder() {
        let fx = Fixture::new().await;
        let file = fx
            .upload("u1", request("a.txt", "file", Some("aGk=")))
            .await
            .unwrap();

        let mut req = request("b.txt", "file", Some("aGk="));
        req.parent_id = ParentId::Folder(file.id.clone());
        assert_eq!(
            bad_request_message(fx.upload("u1", req).await),
            "Parent is not a folder"
        );

        for missing in [uuid::Uuid::new_v4().to_string(), "garbage".to_string()] {
            let mut req = request("b.txt", "file", Some("aGk="));
            req.parent_id = ParentId::Folder(missing);
            assert_eq!(
                bad_request_message(fx.upload("u1", req).await),
                "Parent not found"
            );
        }

        assert_eq!(fx.record_count().await, 1);
        assert_eq!(fx.blob_count(), 1);
    }

    #[tokio::test]
    async fn test_upload_into_folder() {
        let fx = Fixture::new().await;
        let folder = fx.folder("u1", "docs").await;

        let mut req = request("pic.png", "image", Some("aGk"));
        req.parent_id = ParentId::Folder(folder.id.clone());
        req.is_public = Some(true);
        let record = fx.upload("u1", req).await.unwrap();

        assert_eq!(record.parent_id, ParentId::Folder(folder.id));
        assert!(record.is_public);
        assert_eq!(std::fs::read(record.local_path.unwrap()).unwrap(), b"hi");
    }

    #[tokio::test]
    async fn test_non_string_name_is_stored_as_text() {
        let fx = Fixture::new().await;
        let req = UploadRequest {
            name: Some(json!(5)),
            ..request("", "folder", None)
        };
        let record = fx.upload("u1", req).await.unwrap();
        assert_eq!(record.name, "5");
    }

    #[tokio::test]
    async fn test_parent_id_is_stored_in_canonical_form() {
        let fx = Fixture::new().await;
        let folder = fx.folder("u1", "docs").await;

        let mut req = request("a.txt", "file", Some("aGk="));
        req.parent_id = ParentId::Folder(folder.id.to_uppercase());
        let record = fx.upload("u1", req).await.unwrap();
        assert_eq!(record.parent_id, ParentId::Folder(folder.id.clone()));

        for spelling in [folder.id.clone(), folder.id.to_uppercase()] {
            let listed = FileService::list(&fx.docs, "u1", ParentId::Folder(spelling), 0)
                .await
                .unwrap();
            assert_eq!(listed.len(), 1);
            assert_eq!(listed[0].id, record.id);
        }
    }

    #[tokio::test]
    async fn test_show_round_trip_and_isolation() {
        let fx = Fixture::new().await;
        let created = fx
            .upload("alice", request("test.txt", "file", Some("aGVsbG8=")))
            .await
            .unwrap();

        let shown = FileService::show(&fx.docs, "alice", &created.id).await.unwrap();
        assert_eq!(shown, created);

        assert!(matches!(
            FileService::show(&fx.docs, "bob", &created.id).await,
            Err(AppError::NotFound)
        ));
        assert!(matches!(
            FileService::show(&fx.docs, "alice", "not-an-id").await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_filters_by_parent_and_paginates() {
        let fx = Fixture::new().await;
        let folder = fx.folder("u1", "docs").await;
        for i in 0..25 {
            let mut req = request(&format!("f{:02}", i), "file", Some("aGk="));
            req.parent_id = ParentId::Folder(folder.id.clone());
            fx.upload("u1", req).await.unwrap();
        }
        fx.folder("u2", "not mine").await;

        let root = FileService::list(&fx.docs, "u1", ParentId::Root, 0).await.unwrap();
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].id, folder.id);

        let inside = ParentId::Folder(folder.id.clone());
        let first = FileService::list(&fx.docs, "u1", inside.clone(), 0).await.unwrap();
        let second = FileService::list(&fx.docs, "u1", inside.clone(), 1).await.unwrap();
        let third = FileService::list(&fx.docs, "u1", inside, 2).await.unwrap();
        assert_eq!(first.len(), 20);
        assert_eq!(first[0].name, "f00");
        assert_eq!(second.len(), 5);
        assert_eq!(second[0].name, "f20");
        assert!(third.is_empty());
    }

    #[tokio::test]
    async fn test_list_empty_and_huge_page() {
        let fx = Fixture::new().await;
        assert!(FileService::list(&fx.docs, "u1", ParentId::Root, 0)
            .await
            .unwrap()
            .is_empty());
        assert!(FileService::list(&fx.docs, "u1", ParentId::Root, u64::MAX)
            .await
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_decode_data_is_lenient_about_padding_and_whitespace() {
        assert_eq!(FileService::decode_data("aGVsbG8=").unwrap(), Bytes::from_static(b"hello"));
        assert_eq!(FileService::decode_data("aGVsbG8").unwrap(), Bytes::from_static(b"hello"));
        assert_eq!(FileService::decode_data("aGVs\nbG8=").unwrap(), Bytes::from_static(b"hello"));
        assert!(FileService::decode_data("a").is_err());
    }
}
