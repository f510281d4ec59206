use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::Client;
use url::Url;

use super::errors::TransportError;

/// Response body as a stream of chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Status line and streaming body of an HTTP GET.
pub struct HttpResponse {
    pub status: u16,
    pub content_length: Option<u64>,
    pub body: ByteStream,
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// HTTP GET capability used by the downloader.
///
/// Implementations report transport failures as errors and every HTTP
/// status, including non-2xx, as a response.
pub trait HttpTransport: Send + Sync + 'static {
    fn get(&self, url: &Url) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// [`HttpTransport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Returns an error if the HTTP client cannot be initialized
    pub fn new(connect_timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("pki-revocation/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::with_client(Client::new())
    }
}

impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status().as_u16();
        let content_length = response.content_length();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(TransportError::from))
            .boxed();

        Ok(HttpResponse {
            status,
            content_length,
            body,
        })
    }
}
