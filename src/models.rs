use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;
use utoipa::ToSchema;

/// Airtable table names for the showcase base.
pub mod tables {
    pub const PROJECTS: &str = "Projects";
    pub const USERS: &str = "Users";
    pub const STUDENTS: &str = "Étudiants";
    pub const TECHNOLOGIES: &str = "Technologies";
}

/// Field labels as they appear in the base. The base predates this service and
/// is labelled in French; these constants are the only place the labels live.
pub mod fields {
    pub const TITLE: &str = "Titre";
    pub const DESCRIPTION: &str = "Description";
    pub const IMAGES: &str = "Images";
    pub const STUDENTS: &str = "Étudiants";
    pub const TECHNOLOGIES: &str = "Technologies";
    // Checkbox gating public visibility. Unchecked boxes are absent from the
    // fields map, not false.
    pub const PUBLISHED: &str = "Publier";
    pub const LIKES: &str = "Likes";
    pub const EMAIL: &str = "Email";
    pub const PASSWORD_HASH: &str = "Mot de passe Hash";
    pub const ROLE: &str = "Rôle";
    // Display-name field shared by the Étudiants and Technologies tables.
    pub const NAME: &str = "Nom";
}

// --- Record Store Schemas ---

/// Record
///
/// A raw record as the store returns it: an opaque identifier plus a free-form
/// fields map. Typed access goes through the helper methods below so that the
/// handlers never unwrap JSON by hand.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Record {
    pub id: String,
    #[schema(value_type = Object)]
    #[ts(type = "Record<string, unknown>")]
    pub fields: Map<String, Value>,
    #[serde(rename = "createdTime", skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub created_time: Option<String>,
}

impl Record {
    /// String field, empty when absent or not a string.
    pub fn str_field(&self, name: &str) -> &str {
        self.fields.get(name).and_then(Value::as_str).unwrap_or("")
    }

    /// Checkbox field. Airtable omits unchecked boxes, so absent means false.
    pub fn bool_field(&self, name: &str) -> bool {
        self.fields
            .get(name)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Counter field, zero when absent.
    pub fn u64_field(&self, name: &str) -> u64 {
        self.fields.get(name).and_then(Value::as_u64).unwrap_or(0)
    }

    /// Linked-record field: the list of record ids on the other side of the link.
    pub fn id_list_field(&self, name: &str) -> Vec<String> {
        self.fields
            .get(name)
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// URL of the first attachment in an attachment field, empty when there is none.
    pub fn first_attachment_url(&self, name: &str) -> String {
        self.fields
            .get(name)
            .and_then(Value::as_array)
            .and_then(|atts| atts.first())
            .and_then(|att| att.get("url"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string()
    }
}

/// Attachment
///
/// The minimal attachment shape the store accepts on write: it resolves the URL
/// and fills in the rest of the attachment metadata itself.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Attachment {
    pub url: String,
}

// --- Listing Schemas (Output) ---

/// ProjectSummary
///
/// A listing item with every linked id resolved to its display name. This is the
/// shape both the public site and the admin dashboard render; only the admin
/// variant carries the publish flag.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ProjectSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    /// First attached image URL, empty when the project has no image.
    pub image: String,
    /// Student display names, falling back to the raw id when resolution misses.
    pub students: Vec<String>,
    pub technologies: Vec<String>,
    pub likes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub published: Option<bool>,
}

// --- Request / Response Payloads ---

/// Input payload for the login endpoint (POST /auth/login).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Output of a successful login: a signed bearer token, valid for one hour.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginResponse {
    pub access_token: String,
}

/// CreateProjectRequest
///
/// Input payload for submitting a new project (POST /admin/projects). Students
/// and technologies are given by display name; records missing from the lookup
/// tables are created on the fly.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateProjectRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub students: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    /// Image URLs, stored as attachments on the created record.
    #[serde(default)]
    pub images: Vec<String>,
}

/// Input payload for the publish toggle (PATCH /admin/projects/{id}/publish).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PublishRequest {
    pub publish: bool,
}

/// Result of a publish toggle.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PublishResponse {
    pub id: String,
    pub published: bool,
}

/// Result of a like: the project id and its new counter value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LikeResponse {
    pub id: String,
    pub likes: u64,
}
