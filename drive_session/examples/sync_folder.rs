//! End-to-end walkthrough: list a remote folder, download its files,
//! upload a local folder, create a directory, and move files around.
//!
//! Expects a settings JSON (see `ConnectionSettings`) at the path given by
//! `DRIVE_SETTINGS`, defaulting to `Settings.json`.

use std::path::PathBuf;

use drive_session::DriveSession;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings_path =
        std::env::var("DRIVE_SETTINGS").unwrap_or_else(|_| "Settings.json".to_string());
    let settings_json = std::fs::read_to_string(&settings_path)?;
    let session = DriveSession::from_json_str(&settings_json)?;

    // Fetching
    let remote_dir = "Test/download_test";
    let listing = session.list_files(remote_dir).await?;
    println!("found files in {remote_dir}: {:?}", listing.files.keys().collect::<Vec<_>>());
    println!("found folders in {remote_dir}: {:?}", listing.folders.keys().collect::<Vec<_>>());

    // Downloading (all files in the remote folder)
    session.download_files(remote_dir, "download_test", None).await?;

    // Uploading
    let local_files: Vec<PathBuf> = std::fs::read_dir("upload_test")?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()?;
    session.upload_files(local_files, "Test/upload_test").await?;

    // Creating directories
    session.make_dir("Test", "move_test").await?;

    // Moving files
    session.move_all_files("Test/move_test", "Test/download_test").await?;

    Ok(())
}
