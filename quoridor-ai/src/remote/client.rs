//! 远程建议服务客户端
//!
//! 与 Ollama 兼容的 `/api/generate` 接口通信，发送提示并取回模型输出。

use serde::{Deserialize, Serialize};

use super::SuggestionError;

#[cfg(feature = "remote")]
use anyhow::Context;
#[cfg(feature = "remote")]
use tracing::{debug, info, warn};

/// 客户端配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuggestionConfig {
    /// 服务地址，默认 http://localhost:11434
    pub base_url: String,
    /// 模型名称
    pub model: String,
    /// 生成温度，0.0-1.0
    pub temperature: f32,
    /// 最大生成 token 数
    pub max_tokens: u32,
    /// 请求超时（秒），需小于每步限时
    pub timeout_secs: u64,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "qwen2.5:7b".to_string(),
            temperature: 0.2,
            max_tokens: 256,
            timeout_secs: 30,
        }
    }
}

#[cfg(feature = "remote")]
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    format: &'static str,
    options: GenerateOptions,
}

#[cfg(feature = "remote")]
#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[cfg(feature = "remote")]
#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    eval_count: u32,
    #[serde(default)]
    total_duration: u64,
}

/// 远程建议客户端
#[cfg(feature = "remote")]
pub struct SuggestionClient {
    config: SuggestionConfig,
    client: reqwest::Client,
}

#[cfg(feature = "remote")]
impl SuggestionClient {
    pub fn new(config: SuggestionConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, client })
    }

    pub fn with_defaults() -> anyhow::Result<Self> {
        Self::new(SuggestionConfig::default())
    }

    /// 发送生成请求
    ///
    /// HTTP 429 映射为 [`SuggestionError::RateLimited`]，其余失败都算网络故障。
    pub async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, SuggestionError> {
        let url = format!("{}/api/generate", self.config.base_url);
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            system,
            stream: false,
            format: "json",
            options: GenerateOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        debug!(
            "Sending suggestion request: model={}, prompt_len={}",
            self.config.model,
            prompt.len()
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SuggestionError::NetworkFailure(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Suggestion service rate limited");
            return Err(SuggestionError::RateLimited);
        }
        if !status.is_success() {
            return Err(SuggestionError::NetworkFailure(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SuggestionError::NetworkFailure(e.to_string()))?;
        let resp: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            SuggestionError::Invalid(format!("{} in response: {}", e, preview))
        })?;

        info!(
            "Suggestion response: tokens={}, duration={}ms",
            resp.eval_count,
            resp.total_duration / 1_000_000
        );

        if resp.response.is_empty() {
            return Err(SuggestionError::Invalid("Empty response".to_string()));
        }
        Ok(resp.response)
    }

    pub fn config(&self) -> &SuggestionConfig {
        &self.config
    }

    pub fn set_model(&mut self, model: String) {
        self.config.model = model;
    }
}

/// 未启用 `remote` feature 时的占位实现
#[cfg(not(feature = "remote"))]
pub struct SuggestionClient {
    config: SuggestionConfig,
}

#[cfg(not(feature = "remote"))]
impl SuggestionClient {
    pub fn new(config: SuggestionConfig) -> anyhow::Result<Self> {
        Ok(Self { config })
    }

    pub fn with_defaults() -> anyhow::Result<Self> {
        Self::new(SuggestionConfig::default())
    }

    pub async fn generate(
        &self,
        _prompt: &str,
        _system: Option<&str>,
    ) -> Result<String, SuggestionError> {
        Err(SuggestionError::NetworkFailure(
            "Remote feature not enabled. Compile with --features remote".to_string(),
        ))
    }

    pub fn config(&self) -> &SuggestionConfig {
        &self.config
    }

    pub fn set_model(&mut self, model: String) {
        self.config.model = model;
    }
}
