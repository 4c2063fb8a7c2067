#![cfg_attr(feature = "strict", deny(warnings))]

//! HTTP plumbing for the remote drive API: validated connection settings,
//! the per-instance [`Session`] with its token lifecycle and connection
//! guard, and the single-call operations everything else is built from.

pub use crate::client::{DriveClient, FolderListing};
pub use crate::connection::ConnectionGuard;
pub use crate::error::{DriveClientError, Result};
pub use crate::http_client::build_auth_http_client;
pub use crate::session::{Session, SharedSession, TokenLifecycle};
pub use crate::settings::{
    ConnectionSettings, RetryPolicy, CONNECT_RETRY_DELAY, DEFAULT_CONNECT_RETRY_ATTEMPTS,
    DEFAULT_REFRESH_INTERVAL_SECS,
};

mod client;
mod connection;
mod error;
mod http_client;
mod session;
mod settings;
