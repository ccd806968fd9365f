//! 步步为营对局通道服务端
//!
//! 包含:
//! - 客户端登记
//! - 对局房间与快照转发（按回合校验发布）
//! - 快速匹配队列
//! - 对局记录存储

pub mod client;
pub mod listener;
pub mod matchmaking;
pub mod room;
pub mod server;
pub mod storage;

pub use client::{Client, ClientManager, ClientStatus};
pub use listener::{Server, SharedState};
pub use matchmaking::{MatchQueue, QueuedPlayer};
pub use room::{infer_action, GameRoom, PublishError, RoomManager, RoomState};
pub use server::{MessageHandler, ServerState};
pub use storage::{SavedRecordInfo, StorageManager};
