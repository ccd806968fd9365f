//! 本地 AI 驱动
//!
//! 轮到 AI 时取当前快照计算动作，再交给回合控制器执行。
//! 远程后端的建议一律重新验证，超时或失败都回退到本地策略。

use std::time::{Duration, Instant};

use protocol::{Action, Difficulty, GameSnapshot, PlayerId};
use quoridor_ai::{
    local_fallback, resolve_suggestion, AiBackend, AiEngine, AiNotice, MoveSuggester,
    RemoteSuggester,
};
use tracing::{error, info, warn};

use super::{TurnController, AI_SEAT};
use crate::settings::GameSettings;

/// AI 一步的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiTurn {
    pub action: Action,
    /// 给界面看的简短理由
    pub rationale: String,
    /// 远程后端出问题时的提示
    pub notice: Option<AiNotice>,
}

/// AI 驱动
pub struct AiDriver {
    engine: AiEngine,
    difficulty: Difficulty,
    suggester: Option<Box<dyn MoveSuggester>>,
    think_delay: Duration,
    timeout: Duration,
}

impl AiDriver {
    /// 本地策略
    pub fn local(difficulty: Difficulty) -> Self {
        let engine = AiEngine::from_difficulty(difficulty);
        let think_delay = engine.think_delay();
        Self {
            engine,
            difficulty,
            suggester: None,
            think_delay,
            timeout: Duration::from_secs(45),
        }
    }

    /// 远程建议 + 本地回退
    pub fn remote(difficulty: Difficulty, suggester: Box<dyn MoveSuggester>) -> Self {
        Self {
            suggester: Some(suggester),
            ..Self::local(difficulty)
        }
    }

    /// 按设置创建
    pub fn from_settings(settings: &GameSettings, difficulty: Difficulty) -> anyhow::Result<Self> {
        let driver = match settings.ai_backend {
            AiBackend::Local => Self::local(difficulty),
            AiBackend::Remote => {
                let suggester = RemoteSuggester::new(settings.remote_ai.clone())?;
                Self::remote(difficulty, Box::new(suggester))
            }
        };
        let driver = driver.with_timeout(settings.ai_timeout());
        Ok(if settings.ai_think_delay {
            driver
        } else {
            driver.with_think_delay(Duration::ZERO)
        })
    }

    pub fn with_think_delay(mut self, delay: Duration) -> Self {
        self.think_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn backend(&self) -> AiBackend {
        if self.suggester.is_some() {
            AiBackend::Remote
        } else {
            AiBackend::Local
        }
    }

    /// 为 `me` 计算一步（不修改任何状态）
    pub async fn play(&self, snapshot: &GameSnapshot, me: PlayerId) -> AiTurn {
        let started_at = Instant::now();
        if !self.think_delay.is_zero() {
            tokio::time::sleep(self.think_delay).await;
        }

        let turn = match &self.suggester {
            Some(suggester) => {
                let pending = resolve_suggestion(suggester.as_ref(), snapshot, me, self.difficulty);
                match tokio::time::timeout(self.timeout, pending).await {
                    Ok(resolved) => AiTurn {
                        action: resolved.decision.action,
                        rationale: resolved.decision.rationale,
                        notice: resolved.notice,
                    },
                    Err(_) => {
                        warn!("Remote AI exceeded {:?}, using local fallback", self.timeout);
                        let board = snapshot.board();
                        let decision = local_fallback(
                            &board,
                            snapshot.player(me),
                            snapshot.player(me.opponent()),
                            &snapshot.walls,
                        );
                        AiTurn {
                            action: decision.action,
                            rationale: decision.rationale,
                            notice: Some(AiNotice::ServiceUnavailable),
                        }
                    }
                }
            }
            None => {
                let decision = self.engine.choose(snapshot, me);
                AiTurn {
                    action: decision.action,
                    rationale: decision.rationale,
                    notice: None,
                }
            }
        };

        info!(
            "AI ({}) plays {} in {:?}: {}",
            self.difficulty,
            turn.action,
            started_at.elapsed(),
            turn.rationale
        );
        turn
    }

    /// 轮到 AI 时计算并执行一步
    pub async fn take_turn(&self, controller: &mut TurnController) -> Option<AiTurn> {
        if !controller.should_ai_move() {
            return None;
        }
        let snapshot = controller.snapshot()?.clone();
        let turn = self.play(&snapshot, AI_SEAT).await;

        // 控制器在计算期间可能已离开对局
        if !controller.should_ai_move() {
            return None;
        }
        if let Err(e) = controller.submit(turn.action, AI_SEAT) {
            error!("AI action {} rejected: {}", turn.action, e);
            return None;
        }
        Some(turn)
    }
}
