//! 远程建议引擎
//!
//! 远程建议 + 本地回退。调用方拿到的动作一定是合法的。

use async_trait::async_trait;
use protocol::{Action, Difficulty, GameSnapshot, PlayerId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{PromptTemplate, SuggestionClient, SuggestionConfig, SuggestionError, SuggestionParser};
use crate::strategy::{local_fallback, AiDecision};

/// 一条走法建议
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub action: Action,
    pub rationale: String,
}

/// 走法建议来源
#[async_trait]
pub trait MoveSuggester: Send + Sync {
    async fn suggest(
        &self,
        snapshot: &GameSnapshot,
        me: PlayerId,
        difficulty: Difficulty,
    ) -> Result<Suggestion, SuggestionError>;
}

/// 远程建议引擎
pub struct RemoteSuggester {
    client: SuggestionClient,
    /// 最大尝试次数（只对无效输出重试，限流直接返回）
    max_retries: u32,
}

impl RemoteSuggester {
    pub fn new(config: SuggestionConfig) -> anyhow::Result<Self> {
        let client = SuggestionClient::new(config)?;
        Ok(Self {
            client,
            max_retries: 2,
        })
    }

    pub fn with_defaults() -> anyhow::Result<Self> {
        Self::new(SuggestionConfig::default())
    }

    pub fn set_max_retries(&mut self, retries: u32) {
        self.max_retries = retries.max(1);
    }

    pub fn config(&self) -> &SuggestionConfig {
        self.client.config()
    }
}

#[async_trait]
impl MoveSuggester for RemoteSuggester {
    async fn suggest(
        &self,
        snapshot: &GameSnapshot,
        me: PlayerId,
        difficulty: Difficulty,
    ) -> Result<Suggestion, SuggestionError> {
        let system = PromptTemplate::system_prompt();
        let prompt = PromptTemplate::suggestion_prompt(snapshot, me, difficulty);
        debug!("Suggestion prompt length: {} chars", prompt.len());

        let mut last_error = SuggestionError::Invalid("No attempt made".to_string());
        for attempt in 1..=self.max_retries {
            info!("Remote suggestion attempt {}/{}", attempt, self.max_retries);

            match self.client.generate(&prompt, Some(system)).await {
                Ok(response) => match SuggestionParser::parse_with_fix(&response, snapshot, me) {
                    Ok(suggestion) => return Ok(suggestion),
                    Err(e) => {
                        let preview: String = response.chars().take(200).collect();
                        warn!(
                            "Unusable suggestion (attempt {}): {}; response: {}",
                            attempt, e, preview
                        );
                        last_error = e;
                    }
                },
                Err(SuggestionError::RateLimited) => return Err(SuggestionError::RateLimited),
                Err(e) => {
                    warn!("Suggestion request failed (attempt {}): {}", attempt, e);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

/// AI 后端类型
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiBackend {
    /// 本地启发式策略
    #[default]
    Local,
    /// 远程建议，失败时回退本地
    Remote,
}

/// 给界面的短暂提示
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AiNotice {
    /// 远程建议无效，已改用本地走法
    InvalidSuggestion,
    /// 远程服务限流
    RateLimited,
    /// 远程服务不可用
    ServiceUnavailable,
}

impl AiNotice {
    pub fn message(&self) -> &'static str {
        match self {
            AiNotice::InvalidSuggestion => "远程 AI 给出了无效走法，已改用本地走法",
            AiNotice::RateLimited => "远程 AI 请求过于频繁，建议切换到本地 AI",
            AiNotice::ServiceUnavailable => "远程 AI 暂时不可用，已改用本地走法",
        }
    }
}

/// 最终采用的动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAction {
    pub decision: AiDecision,
    pub notice: Option<AiNotice>,
}

/// 请求建议并重新验证，任何失败都回退到本地策略
pub async fn resolve_suggestion(
    suggester: &dyn MoveSuggester,
    snapshot: &GameSnapshot,
    me: PlayerId,
    difficulty: Difficulty,
) -> ResolvedAction {
    let notice = match suggester.suggest(snapshot, me, difficulty).await {
        Ok(suggestion) => match SuggestionParser::validate(suggestion.action, snapshot, me) {
            Ok(()) => {
                return ResolvedAction {
                    decision: AiDecision {
                        action: suggestion.action,
                        rationale: suggestion.rationale,
                    },
                    notice: None,
                };
            }
            Err(e) => {
                warn!("Rejected remote suggestion {}: {}", suggestion.action, e);
                AiNotice::InvalidSuggestion
            }
        },
        Err(SuggestionError::RateLimited) => {
            warn!("Remote suggestion rate limited, using local fallback");
            AiNotice::RateLimited
        }
        Err(SuggestionError::Invalid(e)) => {
            warn!("Invalid remote suggestion: {}", e);
            AiNotice::InvalidSuggestion
        }
        Err(SuggestionError::NetworkFailure(e)) => {
            warn!("Remote suggestion failed: {}", e);
            AiNotice::ServiceUnavailable
        }
    };

    let board = snapshot.board();
    let decision = local_fallback(
        &board,
        snapshot.player(me),
        snapshot.player(me.opponent()),
        &snapshot.walls,
    );
    ResolvedAction {
        decision,
        notice: Some(notice),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{GameConfig, Position, WallPlacement};

    /// 固定返回同一结果的建议来源
    struct FixedSuggester(Result<Suggestion, SuggestionError>);

    #[async_trait]
    impl MoveSuggester for FixedSuggester {
        async fn suggest(
            &self,
            _snapshot: &GameSnapshot,
            _me: PlayerId,
            _difficulty: Difficulty,
        ) -> Result<Suggestion, SuggestionError> {
            self.0.clone()
        }
    }

    fn new_game() -> GameSnapshot {
        GameSnapshot::with_start_column(GameConfig::default(), 4)
    }

    fn fallback_move() -> Action {
        Action::Move {
            to: Position::new(7, 4),
        }
    }

    #[tokio::test]
    async fn test_valid_suggestion_used() {
        let wall = Action::PlaceWall {
            wall: WallPlacement::horizontal(2, 3),
        };
        let suggester = FixedSuggester(Ok(Suggestion {
            action: wall,
            rationale: "拦截".to_string(),
        }));

        let resolved =
            resolve_suggestion(&suggester, &new_game(), PlayerId::One, Difficulty::Hard).await;
        assert_eq!(resolved.decision.action, wall);
        assert_eq!(resolved.decision.rationale, "拦截");
        assert_eq!(resolved.notice, None);
    }

    #[tokio::test]
    async fn test_illegal_suggestion_falls_back() {
        let suggester = FixedSuggester(Ok(Suggestion {
            action: Action::Move {
                to: Position::new(5, 5),
            },
            rationale: "瞬移".to_string(),
        }));

        let resolved =
            resolve_suggestion(&suggester, &new_game(), PlayerId::One, Difficulty::Medium).await;
        assert_eq!(resolved.decision.action, fallback_move());
        assert_eq!(resolved.notice, Some(AiNotice::InvalidSuggestion));
    }

    #[tokio::test]
    async fn test_rate_limited_falls_back() {
        let suggester = FixedSuggester(Err(SuggestionError::RateLimited));

        let resolved =
            resolve_suggestion(&suggester, &new_game(), PlayerId::One, Difficulty::Medium).await;
        assert_eq!(resolved.decision.action, fallback_move());
        assert_eq!(resolved.notice, Some(AiNotice::RateLimited));
    }

    #[tokio::test]
    async fn test_network_failure_falls_back() {
        let suggester = FixedSuggester(Err(SuggestionError::NetworkFailure("refused".into())));

        let resolved =
            resolve_suggestion(&suggester, &new_game(), PlayerId::One, Difficulty::Easy).await;
        assert_eq!(resolved.decision.action, fallback_move());
        assert_eq!(resolved.notice, Some(AiNotice::ServiceUnavailable));
    }

    #[tokio::test]
    async fn test_malformed_response_falls_back() {
        let suggester = FixedSuggester(Err(SuggestionError::Invalid("not json".into())));

        let resolved =
            resolve_suggestion(&suggester, &new_game(), PlayerId::One, Difficulty::Easy).await;
        assert_eq!(resolved.decision.action, fallback_move());
        assert_eq!(resolved.notice, Some(AiNotice::InvalidSuggestion));
    }

    #[cfg(not(feature = "remote"))]
    #[tokio::test]
    async fn test_remote_suggester_without_feature() {
        let suggester = RemoteSuggester::with_defaults().unwrap();
        let result = suggester
            .suggest(&new_game(), PlayerId::One, Difficulty::Medium)
            .await;
        assert!(matches!(result, Err(SuggestionError::NetworkFailure(_))));
    }

    #[test]
    fn test_ai_backend_default() {
        assert_eq!(AiBackend::default(), AiBackend::Local);
    }
}
