use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("request to {url} failed")]
    Request {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP {status}")]
    Status { url: Url, status: u16 },
    #[error("failed to build the probe HTTP client")]
    Client(#[source] reqwest::Error),
}

/// A single bounded liveness check. Retry policy belongs to the caller.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, url: &Url, timeout: Duration) -> Result<(), ProbeError>;
}

#[derive(Debug, Clone)]
pub struct HttpHealthProbe {
    client: reqwest::Client,
}

impl HttpHealthProbe {
    /// The backend is always local, so system proxies are bypassed.
    pub fn new() -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .map_err(ProbeError::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn probe(&self, url: &Url, timeout: Duration) -> Result<(), ProbeError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|source| ProbeError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ProbeError::Status {
                url: url.clone(),
                status: status.as_u16(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    use super::*;

    async fn serve_once(status_line: &'static str) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut buf = [0_u8; 1024];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok"
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
        Url::parse(&format!("http://{addr}/api/hello")).expect("url")
    }

    #[tokio::test]
    async fn probe_accepts_success_status() {
        let url = serve_once("200 OK").await;
        HttpHealthProbe::new()
            .expect("client")
            .probe(&url, Duration::from_secs(2))
            .await
            .expect("probe should succeed");
    }

    #[tokio::test]
    async fn probe_accepts_any_2xx_status() {
        let url = serve_once("202 Accepted").await;
        assert!(HttpHealthProbe::new()
            .expect("client")
            .probe(&url, Duration::from_secs(2))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn probe_rejects_error_status() {
        let url = serve_once("503 Service Unavailable").await;
        let error = HttpHealthProbe::new()
            .expect("client")
            .probe(&url, Duration::from_secs(2))
            .await
            .expect_err("probe should fail");
        assert!(matches!(error, ProbeError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn probe_reports_unreachable_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let url = Url::parse(&format!("http://{addr}/")).expect("url");
        let error = HttpHealthProbe::new()
            .expect("client")
            .probe(&url, Duration::from_millis(500))
            .await
            .expect_err("nothing listens on the port");
        assert!(matches!(error, ProbeError::Request { .. }));
    }
}
