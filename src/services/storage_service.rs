use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::Result;
use crate::helpers::signature_helpers::{hmac_sha256_hex, verify_hmac_sha256_hex};

/// Lifetime of a signed download link.
pub const SIGNED_URL_TTL_SECS: i64 = 3600;

#[derive(strum_macros::AsRefStr, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
pub enum StorageFolder {
    Music,
    Covers,
    Avatars,
}

/// Object store on the local filesystem. Objects are served back through
/// `/files/{folder}/{name}` and private reads go through HMAC signed links.
#[derive(Clone)]
pub struct StorageService {
    root: PathBuf,
    public_url: String,
    signing_key: String,
}

impl StorageService {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root_dir),
            public_url: config.public_url.trim_end_matches('/').to_string(),
            signing_key: config.signing_key.clone(),
        }
    }

    /// Stores `bytes` under a fresh name and returns its public URL.
    pub async fn upload(
        &self,
        bytes: &[u8],
        original_name: &str,
        folder: StorageFolder,
    ) -> Result<String> {
        let name = format!("{}{}", Uuid::new_v4(), sanitized_extension(original_name));
        let dir = self.root.join(folder.as_ref());
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&name), bytes).await?;

        tracing::debug!("Stored {} bytes as {}/{}", bytes.len(), folder.as_ref(), name);
        Ok(format!("{}/files/{}/{}", self.public_url, folder.as_ref(), name))
    }

    /// Object key (`folder/name`) of a URL minted by this store.
    pub fn object_key(&self, url: &str) -> Option<String> {
        let prefix = format!("{}/files/", self.public_url);
        let rest = url.strip_prefix(&prefix)?;
        let key = rest.split(['?', '#']).next().unwrap_or_default();
        is_safe_key(key).then(|| key.to_string())
    }

    pub fn is_managed(&self, url: &str) -> bool {
        self.object_key(url).is_some()
    }

    pub fn local_path(&self, key: &str) -> Option<PathBuf> {
        is_safe_key(key).then(|| self.root.join(key))
    }

    /// Removes a stored object. `false` when the URL is foreign or the object is gone.
    pub async fn delete(&self, url: &str) -> Result<bool> {
        let Some(path) = self.object_key(url).and_then(|key| self.local_path(&key)) else {
            tracing::warn!("Refusing to delete unmanaged url {}", url);
            return Ok(false);
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Time-limited link for a stored object; foreign URLs come back unchanged.
    pub fn signed_url(&self, url: &str) -> Result<String> {
        let Some(key) = self.object_key(url) else {
            return Ok(url.to_string());
        };
        let expires = Utc::now().timestamp() + SIGNED_URL_TTL_SECS;
        let signature = self.sign(&key, expires)?;
        Ok(format!(
            "{}/files/{}?expires={}&signature={}",
            self.public_url, key, expires, signature
        ))
    }

    /// Signs what can be signed, keeping the original URL when signing fails.
    pub fn signed_or_original(&self, url: Option<String>) -> Option<String> {
        url.map(|u| match self.signed_url(&u) {
            Ok(signed) => signed,
            Err(e) => {
                tracing::warn!("Could not sign {}: {:?}", u, e);
                u
            }
        })
    }

    pub fn verify(&self, key: &str, expires: i64, signature: &str) -> bool {
        if expires < Utc::now().timestamp() {
            return false;
        }
        verify_hmac_sha256_hex(&self.signing_key, &signing_payload(key, expires), signature)
    }

    fn sign(&self, key: &str, expires: i64) -> Result<String> {
        hmac_sha256_hex(&self.signing_key, &signing_payload(key, expires))
    }
}

fn signing_payload(key: &str, expires: i64) -> String {
    format!("{key}:{expires}")
}

fn sanitized_extension(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

fn is_safe_key(key: &str) -> bool {
    !key.is_empty()
        && Path::new(key)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
pub fn test_storage(root: &Path) -> StorageService {
    StorageService::new(&StorageConfig {
        root_dir: root.to_string_lossy().to_string(),
        public_url: "http://localhost:8080".to_string(),
        signing_key: "storage-test-key".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("music-social-storage-{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_upload_sign_verify_delete() {
        let root = temp_root();
        let storage = test_storage(&root);

        let url = storage
            .upload(b"ID3 fake audio", "My Song.MP3", StorageFolder::Music)
            .await
            .unwrap();
        assert!(url.starts_with("http://localhost:8080/files/music/"));
        assert!(url.ends_with(".mp3"));

        let key = storage.object_key(&url).unwrap();
        assert!(storage.local_path(&key).unwrap().exists());

        let signed = storage.signed_url(&url).unwrap();
        let query = signed.split_once('?').unwrap().1;
        let mut expires = 0;
        let mut signature = "";
        for pair in query.split('&') {
            match pair.split_once('=').unwrap() {
                ("expires", v) => expires = v.parse().unwrap(),
                ("signature", v) => signature = v,
                _ => {}
            }
        }
        assert!(storage.verify(&key, expires, signature));
        assert!(!storage.verify(&key, expires + 1, signature));
        assert!(!storage.verify(&key, Utc::now().timestamp() - 10, signature));

        assert!(storage.delete(&url).await.unwrap());
        assert!(!storage.delete(&url).await.unwrap());

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[test]
    fn test_foreign_urls_pass_through() {
        let storage = test_storage(&temp_root());
        let foreign = "https://cdn.example.com/cover.png";
        assert_eq!(storage.signed_url(foreign).unwrap(), foreign);
        assert!(!storage.is_managed(foreign));
    }

    #[test]
    fn test_path_traversal_rejected() {
        let storage = test_storage(&temp_root());
        assert!(storage
            .object_key("http://localhost:8080/files/../secret.txt")
            .is_none());
        assert!(storage.local_path("music/../../etc/passwd").is_none());
        assert!(storage.local_path("/etc/passwd").is_none());
    }

    #[test]
    fn test_sanitized_extension() {
        assert_eq!(sanitized_extension("a.WAV"), ".wav");
        assert_eq!(sanitized_extension("noext"), "");
        assert_eq!(sanitized_extension("weird.m p3"), "");
    }
}
