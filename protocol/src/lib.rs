//! 步步为营（Quoridor）共享协议库
//!
//! 包含:
//! - 棋盘几何、玩家、挡板等核心数据结构
//! - 走法生成、寻路和挡板验证
//! - 对局快照与纯函数状态归约 (apply_action)
//! - 消息类型定义 (ClientMessage, ServerMessage)
//! - 对局状态通道 (GameChannel)
//! - 传输层抽象 (Connector, Connection, Listener traits)
//! - 对局记录格式 (JSON)

mod action;
mod board;
mod channel;
mod constants;
mod error;
mod message;
mod moves;
mod path;
mod player;
mod record;
mod state;
mod transport;
mod walls;

pub use action::{apply_action, Action};
pub use board::{Board, Direction, Orientation, Position, Wall, WallPlacement};
pub use channel::{GameChannel, MatchFound, Subscription};
pub use constants::*;
pub use error::{ConfigError, ProtocolError, Result, RuleError, WallError};
pub use message::{
    ClientId, ClientMessage, Difficulty, ErrorCode, GameId, PlayerInfo, ServerMessage,
};
pub use moves::MoveResolver;
pub use path::{PathFinder, PathMode};
pub use player::{Player, PlayerId};
pub use record::{ActionRecord, GameMetadata, GameRecord, GameResult, WinReason, RECORD_VERSION};
pub use state::{GameConfig, GameSnapshot, StartMode};
pub use transport::{
    Connection, Connector, FrameReader, FrameWriter, Listener, NetworkConfig, TcpConnection,
    TcpConnector, TcpListener,
};
pub use walls::WallValidator;
