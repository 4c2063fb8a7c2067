use std::collections::BTreeMap;

use bytes::Bytes;
use drive_types::{
    ApiResponse, ChildrenResponse, CreateFolderRequest, DriveItem, ErrorEnvelope, MoveItemRequest,
};
use reqwest_middleware::ClientWithMiddleware;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::{DriveClientError, Result};
use crate::http_client::build_auth_http_client;
use crate::session::SharedSession;
use crate::settings::ConnectionSettings;

/// Children of a folder, split the way callers consume them: name to item
/// id, files and folders apart. Sorted by name so that batch consumption
/// order is stable.
#[derive(Debug, Clone, Default)]
pub struct FolderListing {
    pub files: BTreeMap<String, String>,
    pub folders: BTreeMap<String, String>,
}

/// Issues the single-call drive API operations. Each method sends exactly
/// one request and classifies a non-2xx status or an `error` envelope in
/// the body as a remote failure; nothing here retries or aggregates.
#[derive(Debug, Clone)]
pub struct DriveClient {
    client: ClientWithMiddleware,
    endpoint: String,
}

impl DriveClient {
    pub fn new(settings: &ConnectionSettings, session: SharedSession) -> Result<Self> {
        Ok(Self {
            client: build_auth_http_client(session)?,
            endpoint: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Probes the identity endpoint. `Ok(true)` means the drive answered
    /// with a success status; transport-level failures surface as errors and
    /// count as failed attempts in the connection guard.
    pub async fn current_drive(&self) -> Result<bool> {
        let url = Url::parse(&format!("{}/me/drive", self.endpoint))?;
        debug!("probe: GET {url}");
        let response = self.client.get(url).send().await?;
        Ok(response.status().is_success())
    }

    /// Resolves a folder path to its item id.
    pub async fn folder_id(&self, remote_dir: &str) -> Result<String> {
        let remote_dir = trimmed(remote_dir);
        let url = Url::parse(&format!("{}/me/drive/root:/{remote_dir}", self.endpoint))?;
        debug!("folder id: GET {url}");
        let response = self.client.get(url).send().await?;
        let item: DriveItem =
            parse_body(&format!("could not fetch the folder ID of {remote_dir}"), response).await?;
        Ok(item.id)
    }

    /// Lists all files and folders directly under `remote_dir`.
    pub async fn list_children(&self, remote_dir: &str) -> Result<FolderListing> {
        let remote_dir = trimmed(remote_dir);
        let url = Url::parse(&format!("{}/me/drive/root:/{remote_dir}:/children", self.endpoint))?;
        debug!("list children: GET {url}");
        let response = self.client.get(url).send().await?;
        let children: ChildrenResponse =
            parse_body(&format!("could not fetch all files from {remote_dir}"), response).await?;

        let mut listing = FolderListing::default();
        for item in children.value {
            if item.is_folder() {
                listing.folders.insert(item.name, item.id);
            } else {
                listing.files.insert(item.name, item.id);
            }
        }
        Ok(listing)
    }

    /// Creates `folder_name` under `remote_dir`, failing on a name conflict.
    pub async fn create_folder(&self, remote_dir: &str, folder_name: &str) -> Result<()> {
        let remote_dir = trimmed(remote_dir);
        let url = Url::parse(&format!("{}/me/drive/root:/{remote_dir}:/children", self.endpoint))?;
        debug!("create folder: POST {url}");
        let response = self
            .client
            .post(url)
            .json(&CreateFolderRequest::failing_on_conflict(folder_name))
            .send()
            .await?;
        let _item: DriveItem =
            parse_body(&format!("could not create the directory {folder_name}"), response).await?;
        Ok(())
    }

    /// Re-parents an item (file or folder) into the destination folder.
    pub async fn move_item(&self, item_id: &str, dest_folder_id: &str) -> Result<()> {
        let url = Url::parse(&format!("{}/me/drive/items/{item_id}", self.endpoint))?;
        debug!("move item: PATCH {url}");
        let response = self
            .client
            .patch(url)
            .json(&MoveItemRequest::into_folder(dest_folder_id))
            .send()
            .await?;
        let _item: DriveItem = parse_body("move rejected", response).await?;
        Ok(())
    }

    /// Writes one remote file in a single request, named after `file_name`.
    pub async fn upload_small_file(
        &self,
        remote_dir: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<()> {
        let remote_dir = trimmed(remote_dir);
        let url = Url::parse(&format!(
            "{}/me/drive/root:/{remote_dir}/{file_name}:/content",
            self.endpoint
        ))?;
        debug!("upload: PUT {url} ({} bytes)", content.len());
        let response = self.client.put(url).body(content).send().await?;
        let _item: DriveItem = parse_body("upload rejected", response).await?;
        Ok(())
    }

    /// Reads one remote file's content in a single request.
    pub async fn download_item(&self, item_id: &str) -> Result<Bytes> {
        let url = Url::parse(&format!("{}/me/drive/items/{item_id}/content", self.endpoint))?;
        debug!("download: GET {url}");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DriveClientError::Remote(format!("download rejected: status {status}")));
        }
        Ok(response.bytes().await?)
    }
}

/// Remote paths are addressed relative to the drive root with no
/// surrounding slashes.
fn trimmed(remote_dir: &str) -> &str {
    remote_dir.trim_matches('/')
}

/// Classifies a structured response exactly once: non-2xx status or an
/// `error` envelope is a remote failure carrying `context`, anything else
/// must deserialize into the expected payload.
async fn parse_body<T: DeserializeOwned>(context: &str, response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(&body) {
            return Err(DriveClientError::Remote(format!("{context} (code: {})", envelope.error.code)));
        }
        return Err(DriveClientError::Remote(format!("{context}: status {status}")));
    }

    let parsed: ApiResponse<T> = serde_json::from_slice(&body)
        .map_err(|e| DriveClientError::Remote(format!("{context}: unexpected response body: {e}")))?;
    parsed
        .into_result()
        .map_err(|e| DriveClientError::Remote(format!("{context} (code: {})", e.code)))
}
