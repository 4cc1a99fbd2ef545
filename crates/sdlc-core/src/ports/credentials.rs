//! 에이전트 플랫폼 토큰 소스 포트.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CoreError;

/// Bearer 액세스 토큰
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// 액세스 토큰 제공자
///
/// 캐시된 토큰이 없거나 만료되면 투명하게 갱신한다. 매 호출마다 재발급하지 않는다.
/// 실패는 설정 오류(`CoreError::Config`)로 전파되며 재시도하지 않는다.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<AccessToken, CoreError>;
}
