//! 游戏设置模块
//!
//! 设置以 JSON 保存在配置目录下，读取失败时使用默认值。

use std::path::{Path, PathBuf};

use anyhow::Context;
use protocol::{Difficulty, GameConfig, NetworkConfig};
use quoridor_ai::{AiBackend, SuggestionConfig};
use serde::{Deserialize, Serialize};

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// 作为 `EnvFilter` 指令使用的名称
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// 游戏设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    // === 对局设置 ===
    /// 棋盘、挡板数、每步限时、起始位置
    pub game: GameConfig,
    /// 默认 AI 难度
    pub default_difficulty: Difficulty,
    /// AI 后端
    pub ai_backend: AiBackend,
    /// 远程 AI 服务配置
    pub remote_ai: SuggestionConfig,
    /// AI 单步思考时间上限（秒）
    pub ai_timeout_secs: u32,
    /// 是否模拟 AI 思考时间
    pub ai_think_delay: bool,

    // === 网络设置 ===
    /// 默认服务器地址
    pub server_address: String,
    /// 默认昵称
    pub nickname: String,

    // === 高级设置 ===
    pub log_level: LogLevel,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            default_difficulty: Difficulty::Medium,
            ai_backend: AiBackend::Local,
            remote_ai: SuggestionConfig::default(),
            ai_timeout_secs: 45,
            ai_think_delay: true,

            server_address: NetworkConfig::default().addr(),
            nickname: "玩家".to_string(),

            log_level: LogLevel::default(),
        }
    }
}

impl GameSettings {
    /// 获取设置文件路径
    pub fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("quoridor");
            path.push("settings.json");
            path
        })
    }

    /// 从默认位置加载设置
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            tracing::warn!("无法获取配置目录，使用默认设置");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// 从指定文件加载设置，文件缺失或损坏时使用默认值
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("设置文件不存在，使用默认设置");
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<GameSettings>(&content) {
                Ok(settings) => {
                    tracing::info!("已加载设置: {:?}", path);
                    settings.sanitized()
                }
                Err(e) => {
                    tracing::warn!("设置文件格式无效: {}，使用默认设置", e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("无法读取设置文件: {}，使用默认设置", e);
                Self::default()
            }
        }
    }

    /// 保存到默认位置
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::settings_path().context("无法获取配置目录")?;
        self.save_to(&path)
    }

    /// 保存到指定文件
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("无法创建配置目录: {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self).context("序列化设置失败")?;
        std::fs::write(path, content)
            .with_context(|| format!("写入设置文件失败: {:?}", path))?;

        tracing::info!("设置已保存: {:?}", path);
        Ok(())
    }

    /// 对局配置超出范围时退回默认配置
    fn sanitized(mut self) -> Self {
        let check = match self.ai_backend {
            AiBackend::Local => self.game.validate(),
            AiBackend::Remote => self.game.validate_for_remote_ai(),
        };
        if let Err(e) = check {
            tracing::warn!("设置中的对局配置无效: {}，使用默认配置", e);
            self.game = GameConfig::default();
        }
        self
    }

    /// 当前设置下的 AI 单步时间上限
    pub fn ai_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.ai_timeout_secs.max(1)))
    }
}
