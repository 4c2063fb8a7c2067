#![cfg_attr(feature = "strict", deny(warnings))]

//! Wire types for the remote drive API.
//!
//! Responses are deserialized into these types exactly once at the HTTP
//! boundary; everything downstream works with [`ApiResponse::into_result`]
//! and never re-inspects payload shapes.

use serde::{Deserialize, Serialize};

/// Token pair returned by the auth endpoint for a refresh-token grant.
///
/// Both fields are required; a response missing either fails
/// deserialization and the caller's session state is left untouched.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Marker facet present on items that are folders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderFacet {}

/// Reference to an item's parent, used to move items between folders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentReference {
    pub id: String,
}

/// A file or folder stored in the remote drive.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DriveItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub folder: Option<FolderFacet>,
    #[serde(default, rename = "parentReference")]
    pub parent_reference: Option<ParentReference>,
}

impl DriveItem {
    pub fn is_folder(&self) -> bool {
        self.folder.is_some()
    }
}

/// Listing of a folder's children.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChildrenResponse {
    pub value: Vec<DriveItem>,
}

/// The structured error the API places under an `error` key.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "{} ({})", self.code, msg),
            None => write!(f, "{}", self.code),
        }
    }
}

/// Envelope around [`ErrorInfo`] as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorInfo,
}

/// A structured API response: either the expected payload or an error
/// envelope. Determined once when the body is parsed; the error variant is
/// tried first so that an error body is never misread as a payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ApiResponse<T> {
    Err(ErrorEnvelope),
    Ok(T),
}

impl<T> ApiResponse<T> {
    pub fn into_result(self) -> Result<T, ErrorInfo> {
        match self {
            ApiResponse::Ok(value) => Ok(value),
            ApiResponse::Err(envelope) => Err(envelope.error),
        }
    }
}

/// Request body for creating a folder. Conflicting names fail rather than
/// rename, matching the remote's `@microsoft.graph.conflictBehavior` knob.
#[derive(Debug, Clone, Serialize)]
pub struct CreateFolderRequest {
    pub name: String,
    pub folder: FolderFacet,
    #[serde(rename = "@microsoft.graph.conflictBehavior")]
    pub conflict_behavior: String,
}

impl CreateFolderRequest {
    pub fn failing_on_conflict(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            folder: FolderFacet::default(),
            conflict_behavior: "fail".to_string(),
        }
    }
}

/// Request body for re-parenting an item.
#[derive(Debug, Clone, Serialize)]
pub struct MoveItemRequest {
    #[serde(rename = "parentReference")]
    pub parent_reference: ParentReference,
}

impl MoveItemRequest {
    pub fn into_folder(folder_id: impl Into<String>) -> Self {
        Self {
            parent_reference: ParentReference {
                id: folder_id.into(),
            },
        }
    }
}
