//! 网络模块
//!
//! 对局通道客户端与联网对局流程

mod connection;
mod flow;

pub use connection::ChannelClient;
pub use flow::{Lobby, OnlineFlow, OnlineGame};
