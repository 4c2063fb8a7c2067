use std::path::{Path, PathBuf};

use drive_client::{
    ConnectionGuard, ConnectionSettings, DriveClient, DriveClientError, FolderListing, Session,
    SharedSession, TokenLifecycle,
};
use tracing::info;

use crate::batch::run_batches;
use crate::errors::Result;

/// Handle for working against one remote drive.
///
/// Owns the single [`Session`] of this client instance together with the
/// token lifecycle, the connection guard, and the transfer client built on
/// top of it. Every public operation goes through the guard first: connect
/// if needed, refresh if stale, then do the work.
///
/// Construction only validates the settings; the first operation pays for
/// establishing the connection.
#[derive(Debug)]
pub struct DriveSession {
    settings: ConnectionSettings,
    session: SharedSession,
    guard: ConnectionGuard,
    client: DriveClient,
}

impl DriveSession {
    pub fn new(settings: ConnectionSettings) -> Result<Self> {
        settings.validate()?;

        let session = Session::new_shared(settings.refresh_token.clone());
        let lifecycle = TokenLifecycle::new(&settings, session.clone())?;
        let client = DriveClient::new(&settings, session.clone())?;
        let guard = ConnectionGuard::new(
            session.clone(),
            lifecycle,
            client.clone(),
            settings.retry_policy(),
        );

        Ok(Self {
            settings,
            session,
            guard,
            client,
        })
    }

    /// Builds a session from the caller's settings JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::new(ConnectionSettings::from_json_str(json)?)
    }

    pub fn is_connected(&self) -> bool {
        self.session
            .read()
            .map(|session| session.is_connected())
            .unwrap_or(false)
    }

    /// Lists all files and folders directly under `remote_dir`.
    pub async fn list_files(&self, remote_dir: &str) -> Result<FolderListing> {
        self.guard.ensure_connected().await?;
        Ok(self.client.list_children(remote_dir).await?)
    }

    /// Creates `folder_name` under `remote_dir`; an existing folder of the
    /// same name is an error.
    pub async fn make_dir(&self, remote_dir: &str, folder_name: &str) -> Result<()> {
        self.guard.ensure_connected().await?;
        self.client.create_folder(remote_dir, folder_name).await?;
        info!("directory {folder_name} has been created in {remote_dir}");
        Ok(())
    }

    /// Moves one file from `src_dir` into `dest_dir`. A file name absent
    /// from the source folder is an explicit error.
    pub async fn move_file(&self, dest_dir: &str, src_dir: &str, file_name: &str) -> Result<()> {
        self.guard.ensure_connected().await?;

        let listing = self.client.list_children(src_dir).await?;
        let Some(item_id) = listing.files.get(file_name) else {
            return Err(DriveClientError::Remote(format!(
                "could not move file {file_name}: not found in {src_dir}"
            ))
            .into());
        };

        let dest_id = self.client.folder_id(dest_dir).await?;
        self.client
            .move_item(item_id, &dest_id)
            .await
            .map_err(|e| DriveClientError::Remote(format!("could not move file {file_name}: {e}")))?;
        info!("file {file_name} has been moved to {dest_dir}");
        Ok(())
    }

    /// Re-parents the whole `src_dir` folder into `dest_dir`.
    pub async fn move_all_files(&self, dest_dir: &str, src_dir: &str) -> Result<()> {
        self.guard.ensure_connected().await?;

        let src_id = self.client.folder_id(src_dir).await?;
        let dest_id = self.client.folder_id(dest_dir).await?;
        self.client
            .move_item(&src_id, &dest_id)
            .await
            .map_err(|e| {
                DriveClientError::Remote(format!("could not move all files from {src_dir}: {e}"))
            })?;
        info!("all files from {src_dir} have been moved to {dest_dir}");
        Ok(())
    }

    /// Uploads the given local files into `remote_dir`, each named by its
    /// base name, in concurrent batches of at most the configured limit.
    ///
    /// Fails with one aggregated error listing every file of the failing
    /// batch that could not be transferred; files uploaded before the
    /// failing batch stay uploaded.
    pub async fn upload_files(&self, local_paths: Vec<PathBuf>, remote_dir: &str) -> Result<()> {
        self.guard.ensure_connected().await?;

        let client = self.client.clone();
        let remote_dir = remote_dir.to_string();
        run_batches(
            local_paths,
            self.settings.max_concurrency,
            "could not upload all files: ",
            move |path| upload_one(client.clone(), remote_dir.clone(), path),
        )
        .await
    }

    /// Downloads all files (or just `specific_file`) from `remote_dir` into
    /// `local_dir`, creating it first, in concurrent batches of at most the
    /// configured limit. Partial-failure semantics match
    /// [`DriveSession::upload_files`].
    pub async fn download_files(
        &self,
        remote_dir: &str,
        local_dir: impl AsRef<Path>,
        specific_file: Option<&str>,
    ) -> Result<()> {
        self.guard.ensure_connected().await?;

        let local_dir = local_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&local_dir).await?;

        let listing = self.client.list_children(remote_dir).await?;
        let mut items: Vec<(String, String)> = listing.files.into_iter().collect();
        if let Some(name) = specific_file {
            items.retain(|(item_name, _)| item_name == name);
        }

        let client = self.client.clone();
        run_batches(
            items,
            self.settings.max_concurrency,
            "could not download all files: ",
            move |(name, item_id)| {
                download_one(client.clone(), item_id, local_dir.join(&name), name)
            },
        )
        .await
    }
}

/// Per-item upload worker. Reports every failure (unreadable local file,
/// transport error, remote rejection) as a message naming the file, so the
/// batch engine's sink stays the single aggregation point.
async fn upload_one(
    client: DriveClient,
    remote_dir: String,
    path: PathBuf,
) -> std::result::Result<(), String> {
    let path_str = path.display().to_string();
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
        return Err(format!("could not upload {path_str}: not a valid file name"));
    };

    let content = tokio::fs::read(&path)
        .await
        .map_err(|e| format!("could not upload {path_str}: {e}"))?;

    client
        .upload_small_file(&remote_dir, &file_name, content)
        .await
        .map_err(|e| format!("could not upload {path_str}: {e}"))?;

    info!("file {path_str} has been uploaded");
    Ok(())
}

/// Per-item download worker; same reporting contract as [`upload_one`].
async fn download_one(
    client: DriveClient,
    item_id: String,
    target: PathBuf,
    name: String,
) -> std::result::Result<(), String> {
    let content = client
        .download_item(&item_id)
        .await
        .map_err(|e| format!("could not download {name}: {e}"))?;

    tokio::fs::write(&target, &content)
        .await
        .map_err(|e| format!("could not write {} to disk: {e}", target.display()))?;

    info!("file {name} has been downloaded");
    Ok(())
}
