use http::Extensions;
use reqwest::header::AUTHORIZATION;
use reqwest::{Request, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware, Next};

use crate::error::Result;
use crate::session::SharedSession;

/// Builds the client used for all drive API requests, with the session's
/// bearer header attached to every outbound request.
pub fn build_auth_http_client(session: SharedSession) -> Result<ClientWithMiddleware> {
    let reqwest_client = reqwest::Client::builder().build()?;
    Ok(ClientBuilder::new(reqwest_client)
        .with(AuthMiddleware { session })
        .build())
}

/// AuthMiddleware is a thread-safe middleware that attaches the session's
/// current auth header to outbound requests.
///
/// It only ever takes a read lock: refreshing is the token lifecycle's job
/// and happens between public operations, never underneath a running batch,
/// so every worker of one batch sees the same header.
struct AuthMiddleware {
    session: SharedSession,
}

#[async_trait::async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let auth_header = self
            .session
            .read()
            .map_err(|e| reqwest_middleware::Error::Middleware(anyhow::anyhow!("session lock poisoned: {e}")))?
            .auth_header();

        req.headers_mut().insert(AUTHORIZATION, auth_header);
        next.run(req, extensions).await
    }
}
