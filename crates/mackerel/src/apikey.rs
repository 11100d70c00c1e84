//! Where the Mackerel API key comes from.

use crate::error::{ApiError, ApiResult};

#[async_trait::async_trait]
pub trait ApiKeyProvider: Send + Sync {
    async fn api_key(&self) -> ApiResult<String>;
}

/// A key fixed at construction.
#[derive(Debug, Clone)]
pub struct StaticKey(pub String);

#[async_trait::async_trait]
impl ApiKeyProvider for StaticKey {
    async fn api_key(&self) -> ApiResult<String> { Ok(self.0.clone()) }
}

/// A key read from an environment variable at first use.
#[derive(Debug, Clone)]
pub struct EnvKey(pub String);

#[async_trait::async_trait]
impl ApiKeyProvider for EnvKey {
    async fn api_key(&self) -> ApiResult<String> {
        std::env::var(&self.0).map_err(|_| ApiError::ApiKey(format!("environment value {} not found", self.0)))
    }
}

/// First provider yielding a non-empty key wins.
#[derive(Default)]
pub struct ChainKey(pub Vec<Box<dyn ApiKeyProvider>>);

impl ChainKey {
    pub fn new() -> Self { Self::default() }

    pub fn with(mut self, p: impl ApiKeyProvider + 'static) -> Self {
        self.0.push(Box::new(p));
        self
    }
}

#[async_trait::async_trait]
impl ApiKeyProvider for ChainKey {
    async fn api_key(&self) -> ApiResult<String> {
        let mut errs = Vec::new();
        for p in &self.0 {
            match p.api_key().await {
                Ok(k) if !k.is_empty() => return Ok(k),
                Ok(_) => errs.push("empty api key".to_string()),
                Err(e) => errs.push(e.to_string()),
            }
        }
        Err(ApiError::ApiKey(format!("no valid providers: {}", errs.join(", "))))
    }
}

/// `CFNMKR_API_KEY`, then `MACKEREL_APIKEY`.
pub fn from_env() -> ChainKey { ChainKey::new().with(EnvKey("CFNMKR_API_KEY".into())).with(EnvKey("MACKEREL_APIKEY".into())) }

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn chain_skips_empty_and_missing() {
        let chain = ChainKey::new()
            .with(EnvKey("CFNMKR_TEST_SURELY_UNSET_KEY".into()))
            .with(StaticKey(String::new()))
            .with(StaticKey("k-123".into()));
        assert_eq!(chain.api_key().await.unwrap(), "k-123");
    }

    #[tokio::test]
    async fn chain_reports_every_failure() {
        let chain = ChainKey::new().with(EnvKey("CFNMKR_TEST_SURELY_UNSET_KEY".into())).with(StaticKey(String::new()));
        let err = chain.api_key().await.unwrap_err().to_string();
        assert!(err.contains("no valid providers"), "err={}", err);
        assert!(err.contains("CFNMKR_TEST_SURELY_UNSET_KEY"), "err={}", err);
        assert!(err.contains("empty api key"), "err={}", err);
    }
}
