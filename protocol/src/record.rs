//! 对局记录格式
//!
//! JSON 格式保存起始配置和全部动作，回放时逐个经过 `apply_action` 重建终局。

use anyhow::{bail, Context};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::message::Difficulty;
use crate::player::PlayerId;
use crate::state::{GameConfig, GameSnapshot};

/// 记录版本
pub const RECORD_VERSION: &str = "1.0";

/// 胜利原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinReason {
    /// 到达目标行
    ReachedGoal,
    /// 对方超时
    Timeout,
    /// 对方离开
    OpponentLeft,
}

/// 对局结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    pub winner: PlayerId,
    pub reason: WinReason,
}

/// 对局元数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMetadata {
    /// 1 号玩家名
    pub player_one: String,
    /// 2 号玩家名
    pub player_two: String,
    /// 对局日期
    pub date: String,
    /// 对局结果
    pub result: Option<GameResult>,
    /// 对局配置
    pub config: GameConfig,
    /// AI 难度（人机对局）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_difficulty: Option<Difficulty>,
}

/// 动作记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub player: PlayerId,
    pub action: Action,
    /// 执行时的对局时长（秒）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_clock_secs: Option<u32>,
}

impl ActionRecord {
    pub fn new(player: PlayerId, action: Action) -> Self {
        Self {
            player,
            action,
            game_clock_secs: None,
        }
    }
}

/// 完整的对局记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    /// 版本号
    pub version: String,
    /// 元数据
    pub metadata: GameMetadata,
    /// 1 号玩家起始列（2 号玩家取对称列）
    pub start_column: u8,
    /// 动作列表
    pub actions: Vec<ActionRecord>,
}

impl GameRecord {
    /// 以初始快照创建记录
    pub fn new(player_one: String, player_two: String, initial: &GameSnapshot) -> Self {
        Self {
            version: RECORD_VERSION.to_string(),
            metadata: GameMetadata {
                player_one,
                player_two,
                date: Utc::now().format("%Y-%m-%d").to_string(),
                result: None,
                config: initial.config,
                ai_difficulty: None,
            },
            start_column: initial.player(PlayerId::One).position.c,
            actions: Vec::new(),
        }
    }

    /// 设置 AI 难度
    pub fn set_ai_difficulty(&mut self, difficulty: Difficulty) {
        self.metadata.ai_difficulty = Some(difficulty);
    }

    /// 添加动作，`after` 为执行后的快照
    pub fn record(&mut self, player: PlayerId, action: Action, after: &GameSnapshot) {
        self.actions.push(ActionRecord {
            player,
            action,
            game_clock_secs: Some(after.game_clock_secs),
        });
        if let Some(winner) = after.winner {
            let reason = match action {
                Action::Timeout => WinReason::Timeout,
                _ => WinReason::ReachedGoal,
            };
            self.set_result(GameResult { winner, reason });
        }
    }

    /// 设置对局结果
    pub fn set_result(&mut self, result: GameResult) {
        self.metadata.result = Some(result);
    }

    /// 初始快照
    pub fn initial_snapshot(&self) -> GameSnapshot {
        GameSnapshot::with_start_column(self.metadata.config, self.start_column)
    }

    /// 回放全部动作，返回最终快照
    ///
    /// 任何一个动作被规则拒绝都视为记录损坏。
    pub fn replay(&self) -> anyhow::Result<GameSnapshot> {
        self.metadata
            .config
            .validate()
            .context("Record has invalid game config")?;

        let mut snapshot = self.initial_snapshot();
        for (i, entry) in self.actions.iter().enumerate() {
            snapshot = snapshot
                .try_apply(entry.action, entry.player)
                .with_context(|| format!("Action #{} ({}) rejected", i + 1, entry.action))?;
        }

        if let Some(result) = self.metadata.result {
            if result.reason != WinReason::OpponentLeft && snapshot.winner != Some(result.winner) {
                bail!(
                    "Recorded winner {} does not match replayed winner {:?}",
                    result.winner,
                    snapshot.winner
                );
            }
        }

        Ok(snapshot)
    }

    /// 转换为 JSON 字符串
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// 从 JSON 字符串解析
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
