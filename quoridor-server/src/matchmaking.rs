//! 快速匹配队列
//!
//! 先到先得：新来的玩家与队列中配置相同的最早一位配对。

use std::collections::VecDeque;
use std::time::Instant;

use protocol::{ClientId, GameConfig};

/// 排队中的玩家
#[derive(Debug, Clone)]
pub struct QueuedPlayer {
    pub client_id: ClientId,
    pub nickname: String,
    pub config: GameConfig,
    pub queued_at: Instant,
}

impl QueuedPlayer {
    pub fn new(client_id: ClientId, nickname: String, config: GameConfig) -> Self {
        Self {
            client_id,
            nickname,
            config,
            queued_at: Instant::now(),
        }
    }
}

/// 匹配队列
#[derive(Default)]
pub struct MatchQueue {
    waiting: VecDeque<QueuedPlayer>,
}

impl MatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, client_id: ClientId) -> bool {
        self.waiting.iter().any(|p| p.client_id == client_id)
    }

    /// 取出配置相同的最早一位等待者
    pub fn take_partner(&mut self, config: &GameConfig) -> Option<QueuedPlayer> {
        let index = self.waiting.iter().position(|p| p.config == *config)?;
        self.waiting.remove(index)
    }

    pub fn enqueue(&mut self, player: QueuedPlayer) {
        self.waiting.push_back(player);
    }

    /// 退出队列
    pub fn cancel(&mut self, client_id: ClientId) -> bool {
        let before = self.waiting.len();
        self.waiting.retain(|p| p.client_id != client_id);
        self.waiting.len() != before
    }

    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}
