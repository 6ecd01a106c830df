//! HTTPS client that talks to a single hop the way the next hop up would.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use credhop::core::constants::HEALTH_PATH;
use credhop::core::tls;
use credhop::core::types::{ApiResponse, Role};
use serde_json::Value;

pub struct HopClient {
    client: reqwest::Client,
    base: String,
    intake: &'static str,
}

/// Status plus decoded body.
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub body: ApiResponse,
}

impl HopClient {
    pub fn new(
        ca: &Path,
        target: Role,
        addr: SocketAddr,
        identity: Option<(PathBuf, PathBuf)>,
    ) -> Self {
        let config = match identity {
            Some((cert, key)) => {
                tls::client_config(&cert, &key, ca, None).expect("client tls config")
            }
            None => rustls::ClientConfig::builder_with_provider(Arc::new(
                rustls::crypto::ring::default_provider(),
            ))
            .with_protocol_versions(&[&rustls::version::TLS13])
            .expect("tls 1.3")
            .with_root_certificates(tls::load_roots(ca).expect("load roots"))
            .with_no_client_auth(),
        };

        let client = reqwest::Client::builder()
            .use_preconfigured_tls(config)
            .resolve(target.server_name(), addr)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("build client");

        Self {
            client,
            base: format!("https://{}:{}", target.server_name(), addr.port()),
            intake: target.intake_path(),
        }
    }

    pub async fn register(&self, body: &Value) -> reqwest::Result<Reply> {
        self.post_raw(self.intake, serde_json::to_vec(body).expect("encode body"))
            .await
    }

    pub async fn post_raw(&self, path: &str, body: Vec<u8>) -> reqwest::Result<Reply> {
        let response = self
            .client
            .post(format!("{}{}", self.base, path))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await?;
        Self::reply(response).await
    }

    pub async fn get(&self, path: &str) -> reqwest::Result<Reply> {
        let response = self
            .client
            .get(format!("{}{}", self.base, path))
            .send()
            .await?;
        Self::reply(response).await
    }

    pub async fn health(&self) -> reqwest::Result<Reply> {
        self.get(HEALTH_PATH).await
    }

    async fn reply(response: reqwest::Response) -> reqwest::Result<Reply> {
        let status = response.status().as_u16();
        let body = response.json::<ApiResponse>().await?;
        Ok(Reply { status, body })
    }
}
