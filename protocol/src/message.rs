//! 消息类型定义

use serde::{Deserialize, Serialize};

use crate::player::PlayerId;
use crate::state::{GameConfig, GameSnapshot};

/// 连接 ID（服务端分配）
pub type ClientId = u64;

/// 对局 ID
pub type GameId = u64;

/// AI 难度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    /// 简单：沿最短路径走
    Easy,
    /// 中等：对手领先时挡住其下一步
    #[default]
    Medium,
    /// 困难：枚举候选挡板并打分
    Hard,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Difficulty::Easy => "简单",
            Difficulty::Medium => "中等",
            Difficulty::Hard => "困难",
        };
        write!(f, "{}", name)
    }
}

/// 玩家展示信息（不属于对局快照）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub nickname: String,
}

impl PlayerInfo {
    pub fn new(nickname: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
        }
    }
}

/// 客户端发送给服务端的消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientMessage {
    // === 身份 ===
    /// 打招呼（只携带昵称，不做认证）
    Hello { nickname: String },

    // === 对局 ===
    /// 创建对局，创建者坐 1 号位
    CreateGame { player: PlayerInfo, config: GameConfig },
    /// 加入对局，加入者坐 2 号位
    JoinGame { game_id: GameId, player: PlayerInfo },
    /// 订阅对局快照
    Subscribe { game_id: GameId },
    /// 取消订阅
    Unsubscribe { game_id: GameId },
    /// 发布本方执行动作后的完整快照
    Publish {
        game_id: GameId,
        snapshot: GameSnapshot,
    },
    /// 离开对局
    LeaveGame { game_id: GameId },

    // === 快速匹配 ===
    /// 进入匹配队列
    FindMatch { player: PlayerInfo, config: GameConfig },
    /// 退出匹配队列
    CancelFindMatch,

    // === 心跳 ===
    /// 心跳请求
    Ping,
}

/// 服务端发送给客户端的消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerMessage {
    // === 身份 ===
    /// 连接已登记
    Welcome { client_id: ClientId },

    // === 对局 ===
    /// 对局创建成功
    GameCreated { game_id: GameId, seat: PlayerId },
    /// 加入对局成功，附初始快照
    GameJoined {
        game_id: GameId,
        seat: PlayerId,
        snapshot: GameSnapshot,
    },
    /// 订阅成功
    Subscribed { game_id: GameId },
    /// 订阅推送：对局快照更新
    SnapshotUpdated {
        game_id: GameId,
        snapshot: GameSnapshot,
    },
    /// 发布成功
    Published,
    /// 已取消订阅
    Unsubscribed,
    /// 已离开对局
    Left,
    /// 对手离开
    OpponentLeft { game_id: GameId },

    // === 快速匹配 ===
    /// 已进入匹配队列
    MatchQueued,
    /// 匹配成功（推送）
    MatchFound {
        game_id: GameId,
        seat: PlayerId,
        snapshot: GameSnapshot,
    },
    /// 已退出匹配队列
    MatchCancelled,

    // === 心跳 ===
    /// 心跳响应
    Pong,

    // === 错误 ===
    /// 错误消息
    Error { code: ErrorCode, message: String },
}

/// 错误码定义
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum ErrorCode {
    // === 对局相关 (1xx) ===
    /// 对局不存在
    GameNotFound = 100,
    /// 对局已满
    GameFull = 101,
    /// 不在对局中
    NotInGame = 103,
    /// 已在对局中
    AlreadyInGame = 104,

    // === 规则相关 (2xx) ===
    /// 不是你的回合
    NotYourTurn = 200,
    /// 快照与对局不符
    InvalidSnapshot = 201,
    /// 对局未开始
    GameNotStarted = 202,
    /// 对局已结束
    GameAlreadyOver = 203,

    // === 玩家相关 (3xx) ===
    /// 无效昵称
    InvalidNickname = 300,
    /// 尚未打招呼
    NotIdentified = 301,

    // === 配置与匹配 (4xx) ===
    /// 无效对局配置
    InvalidConfig = 400,
    /// 已在匹配队列中
    AlreadyQueued = 401,
    /// 不在匹配队列中
    NotQueued = 402,

    // === 系统相关 (5xx) ===
    /// 内部错误
    InternalError = 500,
    /// 超时
    Timeout = 501,
    /// 连接数已满
    ServerBusy = 502,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
