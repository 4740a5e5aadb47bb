//! Client seam to the upload service.
//!
//! The session controller hands finished artifacts to a [`ShareGateway`]
//! and gets back a public link plus a QR payload. In deployment that
//! service is the booth's own upload endpoint; tests substitute fakes.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;

use crate::{BoothError, BoothResult};

/// Uploads one artifact and returns its public link plus QR payload
#[async_trait]
pub trait ShareGateway: Send + Sync {
    async fn upload(&self, bytes: Bytes, filename: &str, is_gif: bool) -> BoothResult<PreparedShare>;
}

/// Result of sharing one artifact
#[derive(Debug, Clone)]
pub struct PreparedShare {
    pub direct_url: String,
    /// PNG data URL
    pub qr_code: String,
}

/// Configuration for the HTTP share gateway
#[derive(Debug, Clone)]
pub struct ShareGatewayConfig {
    /// Upload endpoint, e.g. `http://127.0.0.1:3001/api/upload`
    pub endpoint: String,
    pub timeout: Duration,
}

impl ShareGatewayConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// reqwest-backed [`ShareGateway`] posting `multipart/form-data` uploads
pub struct HttpShareGateway {
    client: reqwest::Client,
    config: ShareGatewayConfig,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    success: bool,
    direct_link: String,
    qr_code: Option<String>,
}

impl HttpShareGateway {
    pub fn new(config: ShareGatewayConfig) -> BoothResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BoothError::share(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl ShareGateway for HttpShareGateway {
    async fn upload(&self, bytes: Bytes, filename: &str, is_gif: bool) -> BoothResult<PreparedShare> {
        tracing::debug!(filename, size = bytes.len(), "uploading artifact for sharing");

        let mime = if is_gif { "image/gif" } else { "image/jpeg" };
        let part = reqwest::multipart::Part::bytes(bytes.to_vec())
            .file_name(filename.to_string())
            .mime_str(mime)
            .map_err(|e| BoothError::share(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("name", filename.to_string());

        let response = self
            .client
            .post(&self.config.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| BoothError::share(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BoothError::share(format!(
                "upload service returned {}",
                response.status()
            )));
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| BoothError::share(e.to_string()))?;

        if !parsed.success {
            return Err(BoothError::share("upload service reported failure"));
        }
        let qr_code = parsed
            .qr_code
            .ok_or_else(|| BoothError::share("upload response carries no QR code"))?;

        Ok(PreparedShare {
            direct_url: parsed.direct_link,
            qr_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves exactly one upload request with a canned JSON body and hands
    /// the raw request text back for inspection.
    async fn spawn_upload_server(body: &'static str) -> (SocketAddr, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 256 * 1024];
            let mut read = 0;
            loop {
                let n = socket.read(&mut buf[read..]).await.unwrap();
                read += n;
                let text = String::from_utf8_lossy(&buf[..read]);
                // The closing multipart boundary marks the end of the body.
                if n == 0 || text.contains("--\r\n") {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&buf[..read]).into_owned()
        });
        (addr, handle)
    }

    #[tokio::test]
    async fn http_gateway_posts_multipart_and_parses_links() {
        let (addr, server) = spawn_upload_server(
            r#"{"success":true,"directLink":"https://share.example/snap.jpg","qrCode":"data:image/png;base64,QQ=="}"#,
        )
        .await;

        let gateway =
            HttpShareGateway::new(ShareGatewayConfig::new(format!("http://{addr}/api/upload")))
                .unwrap();
        let share = gateway
            .upload(Bytes::from_static(b"jpeg-bytes"), "snap.jpg", false)
            .await
            .unwrap();

        assert_eq!(share.direct_url, "https://share.example/snap.jpg");
        assert!(share.qr_code.starts_with("data:image/png"));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/upload"));
        assert!(request.contains("name=\"file\""));
        assert!(request.contains("filename=\"snap.jpg\""));
        assert!(request.contains("name=\"name\""));
        assert!(request.contains("image/jpeg"));
    }

    #[tokio::test]
    async fn http_gateway_rejects_a_response_without_qr_code() {
        let (addr, server) = spawn_upload_server(
            r#"{"success":true,"directLink":"https://share.example/a.gif"}"#,
        )
        .await;

        let gateway =
            HttpShareGateway::new(ShareGatewayConfig::new(format!("http://{addr}/api/upload")))
                .unwrap();
        let result = gateway
            .upload(Bytes::from_static(b"GIF89a"), "a.gif", true)
            .await;

        assert!(result.is_err());
        server.await.unwrap();
    }
}
