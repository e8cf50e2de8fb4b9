use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Kind of a stored entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Folder,
    File,
    Image,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Folder => "folder",
            FileType::File => "file",
            FileType::Image => "image",
        }
    }

    /// Exact, case-sensitive match
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "folder" => Some(FileType::Folder),
            "file" => Some(FileType::File),
            "image" => Some(FileType::Image),
            _ => None,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, FileType::Folder)
    }
}

/// Parent reference; serialized as `0` for root, as the id string otherwise
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParentId {
    #[default]
    Root,
    Folder(String),
}

impl ParentId {
    /// `0`, `"0"` and the empty string all mean root
    pub fn from_raw(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw == "0" {
            ParentId::Root
        } else {
            ParentId::Folder(raw.to_string())
        }
    }

    pub fn folder_id(&self) -> Option<&str> {
        match self {
            ParentId::Root => None,
            ParentId::Folder(id) => Some(id),
        }
    }

    /// Column representation
    pub fn as_key(&self) -> &str {
        self.folder_id().unwrap_or("0")
    }
}

impl Serialize for ParentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParentId::Root => serializer.serialize_u8(0),
            ParentId::Folder(id) => serializer.serialize_str(id),
        }
    }
}

impl<'de> Deserialize<'de> for ParentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        Ok(match Option::<Raw>::deserialize(deserializer)? {
            None | Some(Raw::Number(0)) => ParentId::Root,
            Some(Raw::Number(n)) => ParentId::Folder(n.to_string()),
            Some(Raw::Text(s)) => ParentId::from_raw(&s),
        })
    }
}

/// Document to be inserted; the store assigns the id
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFile {
    pub user_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub is_public: bool,
    pub parent_id: ParentId,
    pub local_path: Option<String>,
}

/// Stored file record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub is_public: bool,
    pub parent_id: ParentId,
    pub local_path: Option<String>,
}

impl FileRecord {
    pub fn from_new(id: String, doc: NewFile) -> Self {
        Self {
            id,
            user_id: doc.user_id,
            name: doc.name,
            file_type: doc.file_type,
            is_public: doc.is_public,
            parent_id: doc.parent_id,
            local_path: doc.local_path,
        }
    }
}

/// Upload request body. Fields stay loosely typed so that each missing or
/// malformed one gets its own message.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub name: Option<Value>,
    #[serde(rename = "type")]
    pub file_type: Option<Value>,
    #[serde(default)]
    pub parent_id: ParentId,
    pub is_public: Option<bool>,
    /// Base64 content, required unless the entry is a folder
    pub data: Option<Value>,
}

/// Listing query parameters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileQuery {
    pub parent_id: Option<String>,
    pub page: Option<u64>,
}
