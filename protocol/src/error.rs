//! 错误类型定义

use thiserror::Error;

use crate::board::{Position, WallPlacement};
use crate::message::ErrorCode;
use crate::player::PlayerId;

/// 挡板放置错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WallError {
    /// 没有剩余挡板
    #[error("No walls left")]
    NoWallsLeft,

    /// 挡板不在棋盘内部槽位上
    #[error("Wall out of bounds: ({r}, {c})")]
    OutOfBounds { r: u8, c: u8 },

    /// 与已有挡板冲突
    #[error("Wall collides with existing wall {existing}")]
    Collision { existing: WallPlacement },

    /// 放置后会把玩家完全封死
    #[error("Wall would enclose player {player}")]
    WouldEnclose { player: PlayerId },
}

/// 规则错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// 不是你的回合
    #[error("Not your turn")]
    NotYourTurn,

    /// 游戏已结束
    #[error("Game is already over")]
    GameOver,

    /// 无效的走法
    #[error("Illegal move to {to}")]
    IllegalMove { to: Position },

    /// 还有合法走法时不能放弃回合
    #[error("Cannot pass while legal moves exist")]
    PassNotAllowed,

    /// 无效的挡板
    #[error("Illegal wall: {0}")]
    IllegalWall(#[from] WallError),
}

impl RuleError {
    /// 用于界面提示的简短中文说明
    pub fn user_message(&self) -> &'static str {
        match self {
            RuleError::NotYourTurn => "还没轮到你",
            RuleError::GameOver => "对局已结束",
            RuleError::IllegalMove { .. } => "不能走到这里",
            RuleError::PassNotAllowed => "还有路可走，不能放弃回合",
            RuleError::IllegalWall(WallError::NoWallsLeft) => "挡板已用完",
            RuleError::IllegalWall(WallError::OutOfBounds { .. }) => "挡板位置超出棋盘",
            RuleError::IllegalWall(WallError::Collision { .. }) => "与已有挡板冲突",
            RuleError::IllegalWall(WallError::WouldEnclose { .. }) => "不能把玩家完全封死",
        }
    }
}

/// 配置错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Board size {size} out of range [{min}, {max}]")]
    BoardSize { size: u8, min: u8, max: u8 },

    #[error("Walls per player {walls} out of range [{min}, {max}]")]
    WallsPerPlayer { walls: u8, min: u8, max: u8 },

    #[error("Turn duration {secs}s out of range [{min}, {max}]")]
    TurnDuration { secs: u32, min: u32, max: u32 },
}

/// 协议错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化错误（bincode）
    #[error("Bincode serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// JSON 序列化错误
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// 协议版本不匹配
    #[error("Protocol version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u8, actual: u8 },

    /// 帧大小超限
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// 连接超时
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// 请求超时
    #[error("Request timeout")]
    RequestTimeout,

    /// 连接已关闭
    #[error("Connection closed")]
    ConnectionClosed,

    /// 操作已取消
    #[error("Operation cancelled")]
    Cancelled,

    /// 服务端拒绝请求
    #[error("Server rejected request ({code}): {message}")]
    Rejected { code: ErrorCode, message: String },

    /// 收到意外的应答
    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),

    /// 配置错误
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// 规则错误
    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),
}

/// 协议操作结果类型
pub type Result<T> = std::result::Result<T, ProtocolError>;
