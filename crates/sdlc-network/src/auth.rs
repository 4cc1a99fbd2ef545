//! 에이전트 플랫폼 액세스 토큰 관리.
//!
//! 자격증명 소스 해석, 토큰 발급/캐시, 만료 임박 시 자동 갱신을 담당한다.
//! 발급 실패는 설정 오류로 취급하며 재시도하지 않는다.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use sdlc_core::config::CredentialConfig;
use sdlc_core::error::CoreError;
use sdlc_core::ports::credentials::{AccessToken, AccessTokenProvider};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// 표준 자격증명 파일 경로 환경변수
const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// 만료 이만큼 전이면 만료로 간주 (초)
const EXPIRY_SKEW_SECS: i64 = 60;

/// `expires_in`이 없을 때 기본 수명 (초)
const DEFAULT_LIFETIME_SECS: i64 = 3600;

/// 서비스 계정 assertion grant 유형
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// assertion 유효 시간 (초). 토큰 엔드포인트 상한이 1시간
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// 토큰 엔드포인트 응답
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

/// 자격증명 JSON (필요한 필드만)
#[derive(Debug, Deserialize)]
struct CredentialFile {
    #[serde(rename = "type")]
    kind: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<String>,
    token_uri: Option<String>,
    client_email: Option<String>,
    private_key: Option<String>,
    private_key_id: Option<String>,
}

/// 서비스 계정 서명 키. 키 내용은 로그에 남기지 않는다
#[derive(Clone)]
struct SigningKey(EncodingKey);

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(..)")
    }
}

/// 서비스 계정 assertion 클레임
#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

/// 해석된 자격증명 소스
#[derive(Debug, Clone)]
enum CredentialSource {
    /// 고정 토큰 (갱신 없음)
    Static(String),
    /// OAuth2 refresh_token grant
    AuthorizedUser {
        client_id: String,
        client_secret: String,
        refresh_token: String,
        token_uri: String,
    },
    /// 서비스 계정 RS256 JWT assertion grant
    ServiceAccount {
        client_email: String,
        key_id: Option<String>,
        signing_key: SigningKey,
        token_uri: String,
    },
    /// 클라우드 런타임 메타데이터 서버
    MetadataServer { base_url: String },
}

impl CredentialSource {
    fn label(&self) -> &'static str {
        match self {
            CredentialSource::Static(_) => "static",
            CredentialSource::AuthorizedUser { .. } => "authorized_user",
            CredentialSource::ServiceAccount { .. } => "service_account",
            CredentialSource::MetadataServer { .. } => "metadata_server",
        }
    }
}

/// 내부 토큰 상태
#[derive(Debug, Clone)]
struct TokenState {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl TokenState {
    fn is_fresh(&self) -> bool {
        Utc::now() + Duration::seconds(EXPIRY_SKEW_SECS) < self.expires_at
    }
}

/// 액세스 토큰 매니저. 발급/캐시/만료 관리
#[derive(Clone)]
pub struct TokenManager {
    source: CredentialSource,
    client: reqwest::Client,
    scope: String,
    state: Arc<RwLock<Option<TokenState>>>,
    refresh_lock: Arc<Mutex<()>>,
}

impl TokenManager {
    /// 설정에서 자격증명 소스를 해석해 매니저 생성
    pub fn from_config(config: &CredentialConfig) -> Result<Self, CoreError> {
        let env_path = std::env::var_os(CREDENTIALS_ENV).map(PathBuf::from);
        let source = resolve_source(config, env_path.as_deref())?;
        info!(source = source.label(), "에이전트 자격증명 소스 결정");
        Ok(Self::with_source(source, config.scope.clone()))
    }

    /// 고정 토큰 매니저
    pub fn with_static_token(token: impl Into<String>) -> Self {
        Self::with_source(CredentialSource::Static(token.into()), String::new())
    }

    fn with_source(source: CredentialSource, scope: String) -> Self {
        Self {
            source,
            client: reqwest::Client::new(),
            scope,
            state: Arc::new(RwLock::new(None)),
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    /// 유효한 토큰 반환 (없거나 만료 임박 시 갱신)
    pub async fn get_token(&self) -> Result<AccessToken, CoreError> {
        if let CredentialSource::Static(token) = &self.source {
            return Ok(AccessToken {
                token: token.clone(),
                expires_at: Utc::now() + Duration::seconds(DEFAULT_LIFETIME_SECS),
            });
        }

        if let Some(cached) = self.cached().await {
            return Ok(cached);
        }

        // 동시 갱신은 한 번만
        let _guard = self.refresh_lock.lock().await;
        if let Some(cached) = self.cached().await {
            return Ok(cached);
        }

        let fresh = self.fetch().await?;
        debug!(source = self.source.label(), expires_at = %fresh.expires_at, "액세스 토큰 발급");
        let token = AccessToken {
            token: fresh.access_token.clone(),
            expires_at: fresh.expires_at,
        };
        *self.state.write().await = Some(fresh);
        Ok(token)
    }

    /// 캐시된 토큰 무효화
    pub async fn invalidate(&self) {
        *self.state.write().await = None;
    }

    async fn cached(&self) -> Option<AccessToken> {
        let state = self.state.read().await;
        state.as_ref().filter(|s| s.is_fresh()).map(|s| AccessToken {
            token: s.access_token.clone(),
            expires_at: s.expires_at,
        })
    }

    async fn fetch(&self) -> Result<TokenState, CoreError> {
        let request = match &self.source {
            CredentialSource::Static(_) => {
                return Err(CoreError::Internal("고정 토큰은 발급 대상 아님".to_string()))
            }
            CredentialSource::AuthorizedUser {
                client_id,
                client_secret,
                refresh_token,
                token_uri,
            } => {
                let mut form = vec![
                    ("grant_type", "refresh_token"),
                    ("client_id", client_id.as_str()),
                    ("client_secret", client_secret.as_str()),
                    ("refresh_token", refresh_token.as_str()),
                ];
                if !self.scope.is_empty() {
                    form.push(("scope", self.scope.as_str()));
                }
                self.client.post(token_uri).form(&form)
            }
            CredentialSource::ServiceAccount {
                client_email,
                key_id,
                signing_key,
                token_uri,
            } => {
                let assertion = signed_assertion(
                    client_email,
                    key_id.as_deref(),
                    signing_key,
                    token_uri,
                    &self.scope,
                    Utc::now(),
                )?;
                debug!(client_email = %client_email, "서비스 계정 assertion 서명");
                self.client.post(token_uri).form(&[
                    ("grant_type", JWT_BEARER_GRANT),
                    ("assertion", assertion.as_str()),
                ])
            }
            CredentialSource::MetadataServer { base_url } => self
                .client
                .get(format!(
                    "{}/computeMetadata/v1/instance/service-accounts/default/token",
                    base_url.trim_end_matches('/')
                ))
                .header("Metadata-Flavor", "Google"),
        };

        let resp = request
            .send()
            .await
            .map_err(|e| CoreError::Config(format!("토큰 요청 실패: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(CoreError::Config(format!(
                "토큰 발급 실패 ({status}): {text}"
            )));
        }

        let token_resp: TokenResponse = resp
            .json()
            .await
            .map_err(|e| CoreError::Config(format!("토큰 응답 파싱 실패: {e}")))?;

        if token_resp.access_token.trim().is_empty() {
            return Err(CoreError::Config("빈 액세스 토큰 수신".to_string()));
        }

        Ok(TokenState {
            access_token: token_resp.access_token,
            expires_at: Utc::now()
                + Duration::seconds(token_resp.expires_in.unwrap_or(DEFAULT_LIFETIME_SECS)),
        })
    }
}

#[async_trait]
impl AccessTokenProvider for TokenManager {
    async fn access_token(&self) -> Result<AccessToken, CoreError> {
        self.get_token().await
    }
}

/// 우선순위에 따라 자격증명 소스 결정
fn resolve_source(
    config: &CredentialConfig,
    env_path: Option<&Path>,
) -> Result<CredentialSource, CoreError> {
    if let Some(token) = config.access_token.as_deref().map(str::trim) {
        if !token.is_empty() {
            return Ok(CredentialSource::Static(token.to_string()));
        }
    }
    if let Some(json) = config.json.as_deref().filter(|j| !j.trim().is_empty()) {
        return parse_credentials(json, &config.token_uri);
    }
    if let Some(path) = config.file.as_deref().or(env_path) {
        let json = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("자격증명 파일 읽기 실패 {}: {e}", path.display()))
        })?;
        return parse_credentials(&json, &config.token_uri);
    }
    if config.use_metadata_server {
        return Ok(CredentialSource::MetadataServer {
            base_url: config.metadata_url.clone(),
        });
    }
    Err(CoreError::Config(
        "에이전트 자격증명 미설정 (credentials.access_token / json / file / use_metadata_server)"
            .to_string(),
    ))
}

fn parse_credentials(json: &str, default_token_uri: &str) -> Result<CredentialSource, CoreError> {
    let file: CredentialFile = serde_json::from_str(json)
        .map_err(|e| CoreError::Config(format!("자격증명 JSON 파싱 실패: {e}")))?;

    let required = |value: Option<String>, field: &str| {
        value
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| CoreError::Config(format!("자격증명에 {field} 없음")))
    };
    let token_uri = file
        .token_uri
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| default_token_uri.to_string());

    match file.kind.as_str() {
        "authorized_user" => Ok(CredentialSource::AuthorizedUser {
            client_id: required(file.client_id, "client_id")?,
            client_secret: required(file.client_secret, "client_secret")?,
            refresh_token: required(file.refresh_token, "refresh_token")?,
            token_uri,
        }),
        "service_account" => {
            let client_email = required(file.client_email, "client_email")?;
            let pem = required(file.private_key, "private_key")?;
            let key = EncodingKey::from_rsa_pem(pem.as_bytes())
                .map_err(|e| CoreError::Config(format!("서비스 계정 private_key 파싱 실패: {e}")))?;
            Ok(CredentialSource::ServiceAccount {
                client_email,
                key_id: file.private_key_id.filter(|k| !k.trim().is_empty()),
                signing_key: SigningKey(key),
                token_uri,
            })
        }
        other => Err(CoreError::Config(format!(
            "지원하지 않는 자격증명 유형: {other} (authorized_user, service_account만 지원)"
        ))),
    }
}

/// 토큰 엔드포인트에 보낼 RS256 서명 assertion
fn signed_assertion(
    client_email: &str,
    key_id: Option<&str>,
    signing_key: &SigningKey,
    token_uri: &str,
    scope: &str,
    now: DateTime<Utc>,
) -> Result<String, CoreError> {
    let issued_at = now.timestamp();
    let claims = AssertionClaims {
        iss: client_email.to_string(),
        scope: scope.to_string(),
        aud: token_uri.to_string(),
        iat: issued_at,
        exp: issued_at + ASSERTION_LIFETIME_SECS,
    };
    let mut header = Header::new(Algorithm::RS256);
    header.kid = key_id.map(str::to_string);

    jsonwebtoken::encode(&header, &claims, &signing_key.0)
        .map_err(|e| CoreError::Config(format!("서비스 계정 assertion 서명 실패: {e}")))
}
