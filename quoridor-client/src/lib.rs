//! 步步为营客户端（无界面）
//!
//! 包含:
//! - 回合控制器（菜单、等待对手、对局、终局）
//! - AI 驱动（本地策略或远程建议）
//! - 对局通道客户端与联网流程
//! - 本地设置

pub mod game;
pub mod network;
pub mod settings;

pub use game::{AiDriver, AiTurn, GameMode, Phase, TurnController, TurnError};
pub use network::{ChannelClient, Lobby, OnlineFlow, OnlineGame};
pub use settings::{GameSettings, LogLevel};
