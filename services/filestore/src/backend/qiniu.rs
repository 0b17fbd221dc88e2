use super::{encode_key_path, object_key, read_body, read_file, Backend, StorageError, UploadBody};
use crate::config::{url_expiration, ConfigError, QiniuConfig};
use crate::content_type::get_content_type;
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

const PROVIDER: &str = "Qiniu";

/// Lifetime of an upload token
const UPLOAD_TOKEN_TTL_SECS: i64 = 3600;

type HmacSha1 = Hmac<Sha1>;

/// Put policy carried in an upload token
#[derive(Debug, Serialize)]
struct PutPolicy {
    scope: String,
    deadline: i64,
}

/// Form upload response
#[derive(Debug, Deserialize)]
struct PutRet {
    key: String,
}

/// Qiniu Kodo backend.
///
/// Objects are reachable only through the bound domain, so every URL is a
/// private download URL with an absolute expiry.
pub struct QiniuBackend {
    client: reqwest::Client,
    access_key: String,
    secret_key: String,
    bucket: String,
    domain: String,
    upload_host: String,
    expiration: Duration,
}

impl QiniuBackend {
    pub fn new(config: &QiniuConfig) -> Result<Self, ConfigError> {
        if config.access_key.is_empty() || config.secret_key.is_empty() {
            return Err(ConfigError::MissingField(
                "FSM_QINIU_ACCESS_KEY / FSM_QINIU_SECRET_KEY".to_string(),
            ));
        }
        if config.bucket.is_empty() {
            return Err(ConfigError::MissingField("FSM_QINIU_BUCKET".to_string()));
        }
        if config.domain.trim().is_empty() {
            return Err(ConfigError::MissingField(
                "FSM_QINIU_DOMAIN (Qiniu requires a custom domain for access)".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        let domain = normalize_domain(&config.domain);
        let upload_host = upload_host(&config.region).to_string();

        info!(
            bucket = %config.bucket,
            region = %config.region,
            domain = %domain,
            "Qiniu backend initialized"
        );

        Ok(Self {
            client,
            access_key: config.access_key.clone(),
            secret_key: config.secret_key.clone(),
            bucket: config.bucket.clone(),
            domain,
            upload_host,
            expiration: url_expiration(config.url_expiration_secs),
        })
    }

    /// Override the upload host (private deployments)
    pub fn with_upload_host(mut self, host: impl Into<String>) -> Self {
        self.upload_host = host.into();
        self
    }

    fn sign(&self, data: &[u8]) -> Result<String, StorageError> {
        let mut mac = HmacSha1::new_from_slice(self.secret_key.as_bytes()).map_err(|e| {
            StorageError::Presign {
                provider: PROVIDER,
                message: e.to_string(),
            }
        })?;
        mac.update(data);
        Ok(URL_SAFE.encode(mac.finalize().into_bytes()))
    }

    /// Upload token scoped to a single key: `AK:sign(policy):policy`
    fn upload_token(&self, key: &str, deadline: i64) -> Result<String, StorageError> {
        let policy = PutPolicy {
            scope: format!("{}:{}", self.bucket, key),
            deadline,
        };
        let policy_json =
            serde_json::to_vec(&policy).map_err(|e| StorageError::Upload {
                provider: PROVIDER,
                message: format!("failed to encode put policy: {}", e),
            })?;
        let encoded_policy = URL_SAFE.encode(policy_json);
        let signature = self.sign(encoded_policy.as_bytes())?;

        Ok(format!("{}:{}:{}", self.access_key, signature, encoded_policy))
    }

    /// Private download URL valid until `deadline` (unix seconds)
    fn private_url(&self, key: &str, deadline: i64) -> Result<String, StorageError> {
        let base = format!("{}/{}?e={}", self.domain, encode_key_path(key), deadline);
        let token = format!("{}:{}", self.access_key, self.sign(base.as_bytes())?);
        Ok(format!("{}&token={}", base, token))
    }

    async fn put(&self, data: Vec<u8>, key: &str) -> Result<String, StorageError> {
        let key = object_key(key);
        let now = Utc::now().timestamp();
        let token = self.upload_token(&key, now + UPLOAD_TOKEN_TTL_SECS)?;

        let file_name = Path::new(&key)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&key)
            .to_string();

        let file_part = Part::bytes(data)
            .file_name(file_name)
            .mime_str(&get_content_type(&key))
            .map_err(|e| StorageError::Upload {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        let form = Form::new()
            .text("token", token)
            .text("key", key.clone())
            .text("x:name", key.clone())
            .part("file", file_part);

        let response = self
            .client
            .post(&self.upload_host)
            .multipart(form)
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                provider: PROVIDER,
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| StorageError::Upload {
            provider: PROVIDER,
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(StorageError::Api {
                provider: PROVIDER,
                status: status.as_u16(),
                body,
            });
        }

        let ret: PutRet = serde_json::from_str(&body)
            .map_err(|e| StorageError::Response(format!("invalid Qiniu upload response: {}", e)))?;

        debug!(key = %ret.key, bucket = %self.bucket, "Object stored in Qiniu");

        let deadline = now + self.expiration.as_secs() as i64;
        self.private_url(&ret.key, deadline)
    }
}

#[async_trait]
impl Backend for QiniuBackend {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn upload_file(&self, path: &Path, key: &str) -> Result<String, StorageError> {
        let data = read_file(path).await?;
        self.put(data, key).await
    }

    #[instrument(skip(self, body), fields(bucket = %self.bucket))]
    async fn upload(&self, body: UploadBody, key: &str) -> Result<String, StorageError> {
        let data = read_body(body).await?;
        self.put(data, key).await
    }
}

/// Form upload host for a storage region; unknown regions use z0
fn upload_host(region: &str) -> &'static str {
    match region {
        "z1" => "https://upload-z1.qiniup.com",
        "z2" => "https://upload-z2.qiniup.com",
        "na0" => "https://upload-na0.qiniup.com",
        "as0" => "https://upload-as0.qiniup.com",
        _ => "https://upload.qiniup.com",
    }
}

/// Trim the trailing slash and default to http when no scheme is given
fn normalize_domain(domain: &str) -> String {
    let domain = domain.trim().trim_end_matches('/');
    if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_string()
    } else {
        format!("http://{}", domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_once;

    fn test_config() -> QiniuConfig {
        QiniuConfig {
            access_key: "test-ak".to_string(),
            secret_key: "test-sk".to_string(),
            bucket: "media".to_string(),
            domain: "cdn.example.com/".to_string(),
            region: "z0".to_string(),
            url_expiration_secs: 3600,
        }
    }

    fn verify(secret: &str, data: &str, signature: &str) -> bool {
        let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(data.as_bytes());
        mac.verify_slice(&URL_SAFE.decode(signature).unwrap()).is_ok()
    }

    #[test]
    fn test_requires_domain() {
        let config = QiniuConfig {
            domain: String::new(),
            ..test_config()
        };
        let err = QiniuBackend::new(&config).err().unwrap();
        let message = err.to_string();
        assert!(message.contains("FSM_QINIU_DOMAIN"));
        assert!(message.contains("custom domain"));
    }

    #[test]
    fn test_requires_credentials_and_bucket() {
        let no_key = QiniuConfig {
            access_key: String::new(),
            ..test_config()
        };
        assert!(QiniuBackend::new(&no_key).is_err());

        let no_bucket = QiniuConfig {
            bucket: String::new(),
            ..test_config()
        };
        assert!(QiniuBackend::new(&no_bucket)
            .err()
            .unwrap()
            .to_string()
            .contains("FSM_QINIU_BUCKET"));
    }

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain("cdn.example.com/"), "http://cdn.example.com");
        assert_eq!(
            normalize_domain("https://cdn.example.com"),
            "https://cdn.example.com"
        );
    }

    #[test]
    fn test_upload_host_by_region() {
        assert_eq!(upload_host("z0"), "https://upload.qiniup.com");
        assert_eq!(upload_host("na0"), "https://upload-na0.qiniup.com");
        assert_eq!(upload_host("mars"), "https://upload.qiniup.com");
    }

    #[test]
    fn test_upload_token_structure() {
        let backend = QiniuBackend::new(&test_config()).unwrap();
        let token = backend.upload_token("2024/a.png", 1_700_000_000).unwrap();

        let parts: Vec<&str> = token.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "test-ak");

        let policy: serde_json::Value =
            serde_json::from_slice(&URL_SAFE.decode(parts[2]).unwrap()).unwrap();
        assert_eq!(policy["scope"], "media:2024/a.png");
        assert_eq!(policy["deadline"], 1_700_000_000);

        assert!(verify("test-sk", parts[2], parts[1]));
    }

    #[test]
    fn test_private_url_is_deterministic_for_deadline() {
        let backend = QiniuBackend::new(&test_config()).unwrap();
        let url = backend
            .private_url("2024/my photo.png", 1_700_000_000)
            .unwrap();

        let (base, token) = url.split_once("&token=").unwrap();
        assert_eq!(
            base,
            "http://cdn.example.com/2024/my%20photo.png?e=1700000000"
        );
        let (ak, signature) = token.split_once(':').unwrap();
        assert_eq!(ak, "test-ak");
        assert!(verify("test-sk", base, signature));

        assert_eq!(
            url,
            backend
                .private_url("2024/my photo.png", 1_700_000_000)
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_upload_posts_form_and_returns_private_url() {
        let (host, request) = serve_once(200, r#"{"hash":"Fh","key":"docs/a.txt"}"#).await;
        let backend = QiniuBackend::new(&test_config())
            .unwrap()
            .with_upload_host(host);

        let url = backend
            .upload(Box::new(&b"hello qiniu"[..]), "docs/a.txt")
            .await
            .unwrap();

        assert!(url.starts_with("http://cdn.example.com/docs/a.txt?e="));
        assert!(url.contains("&token=test-ak:"));

        let request = request.await.unwrap();
        assert!(request.starts_with("POST / "));
        assert!(request.contains("name=\"x:name\"\r\n\r\ndocs/a.txt\r\n"));
        assert!(request.contains("name=\"key\""));
        assert!(request.contains("docs/a.txt"));
        assert!(request.contains("hello qiniu"));
    }

    #[tokio::test]
    async fn test_upload_error_status() {
        let (host, _request) = serve_once(401, r#"{"error":"bad token"}"#).await;
        let backend = QiniuBackend::new(&test_config())
            .unwrap()
            .with_upload_host(host);

        let err = backend
            .upload(Box::new(&b"x"[..]), "a.txt")
            .await
            .unwrap_err();
        match err {
            StorageError::Api { status, body, .. } => {
                assert_eq!(status, 401);
                assert!(body.contains("bad token"));
            }
            other => panic!("Expected API error, got {:?}", other),
        }
    }
}
