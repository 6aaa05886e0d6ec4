use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ClientHeaders {
    #[serde(rename = "X-App-Version")]
    pub app_version: Option<String>,
    #[serde(rename = "X-Platform")]
    pub platform: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: String,
    /// Seconds since the server started.
    pub uptime: f64,
    pub message: &'static str,
    pub headers: ClientHeaders,
}

#[derive(Debug, Serialize)]
pub struct Pong {
    pub pong: bool,
    pub timestamp: i64,
}

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignedFileQuery {
    pub expires: Option<i64>,
    pub signature: Option<String>,
}
