//! 协议常量定义

use std::time::Duration;

/// 协议版本号
pub const PROTOCOL_VERSION: u8 = 1;

/// 默认棋盘边长
pub const DEFAULT_BOARD_SIZE: u8 = 9;

/// 棋盘边长下限
pub const MIN_BOARD_SIZE: u8 = 3;

/// 棋盘边长上限
pub const MAX_BOARD_SIZE: u8 = 19;

/// 每方默认挡板数
pub const DEFAULT_WALLS_PER_PLAYER: u8 = 10;

/// 每方挡板数下限
pub const MIN_WALLS_PER_PLAYER: u8 = 5;

/// 每方挡板数上限
pub const MAX_WALLS_PER_PLAYER: u8 = 15;

/// 默认每步限时（秒）
pub const DEFAULT_TURN_DURATION_SECS: u32 = 60;

/// 每步限时下限（秒）
pub const MIN_TURN_DURATION_SECS: u32 = 30;

/// 每步限时上限（秒）
pub const MAX_TURN_DURATION_SECS: u32 = 120;

/// 使用远程 AI 时每步限时下限（秒），远程调用本身需要时间
pub const MIN_TURN_DURATION_REMOTE_AI_SECS: u32 = 60;

/// 昵称最大长度
pub const MAX_NICKNAME_LEN: usize = 20;

/// 消息帧最大大小
pub const MAX_FRAME_SIZE: usize = 65536;

/// 服务端最大连接数
pub const MAX_CONNECTIONS: usize = 100;

/// 客户端心跳间隔（秒）
pub const HEARTBEAT_INTERVAL_SECS: u64 = 10;

/// 服务端心跳超时（秒）- 超过此时间无消息则断开
pub const HEARTBEAT_TIMEOUT_SECS: u64 = 30;

/// 连接超时（秒）
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 请求应答超时（秒）
pub const REQUEST_TIMEOUT_SECS: u64 = 15;

/// 创建/加入对局等待超时（秒）
pub const LOBBY_TIMEOUT_SECS: u64 = 5 * 60;

/// 快速匹配超时（秒）
pub const MATCHMAKING_TIMEOUT_SECS: u64 = 3 * 60;

/// 心跳间隔 Duration
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(HEARTBEAT_INTERVAL_SECS);

/// 心跳超时 Duration
pub const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(HEARTBEAT_TIMEOUT_SECS);

/// 连接超时 Duration
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(CONNECT_TIMEOUT_SECS);

/// 请求应答超时 Duration
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(REQUEST_TIMEOUT_SECS);

/// 创建/加入对局等待超时 Duration
pub const LOBBY_TIMEOUT: Duration = Duration::from_secs(LOBBY_TIMEOUT_SECS);

/// 快速匹配超时 Duration
pub const MATCHMAKING_TIMEOUT: Duration = Duration::from_secs(MATCHMAKING_TIMEOUT_SECS);

/// 默认服务端口
pub const DEFAULT_PORT: u16 = 9630;
