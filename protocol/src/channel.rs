//! 对局状态通道
//!
//! 联网对局的数据契约：每个客户端各自持有快照，本地执行动作后发布完整快照，
//! 通过订阅收到对方的快照。通道本身不理解规则，回合限制由 `apply_action` 保证。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::message::{GameId, PlayerInfo};
use crate::player::PlayerId;
use crate::state::{GameConfig, GameSnapshot};

/// 匹配结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchFound {
    pub game_id: GameId,
    /// 本方座位
    pub seat: PlayerId,
    /// 初始快照
    pub snapshot: GameSnapshot,
}

/// 对局状态通道 trait
#[async_trait]
pub trait GameChannel: Send + Sync {
    /// 创建对局，创建者坐 1 号位
    async fn create(&self, player: PlayerInfo, config: GameConfig) -> Result<GameId>;

    /// 加入对局；对局不存在或已满时返回 None
    async fn join(&self, game_id: GameId, player: PlayerInfo) -> Result<Option<GameSnapshot>>;

    /// 订阅对局快照，丢弃返回值即取消订阅
    async fn subscribe(&self, game_id: GameId) -> Result<Subscription>;

    /// 发布完整快照
    async fn publish(&self, game_id: GameId, snapshot: GameSnapshot) -> Result<()>;

    /// 离开对局
    async fn leave(&self, game_id: GameId) -> Result<()>;

    /// 快速匹配，等到对手为止
    async fn find_match(&self, player: PlayerInfo, config: GameConfig) -> Result<MatchFound>;

    /// 退出匹配队列
    async fn cancel_find_match(&self) -> Result<()>;
}

/// 快照订阅
///
/// 释放时（`unsubscribe` 或 drop）把对局 ID 发回通道实现，由其通知服务端。
pub struct Subscription {
    game_id: GameId,
    updates: mpsc::Receiver<GameSnapshot>,
    release: Option<mpsc::UnboundedSender<GameId>>,
}

impl Subscription {
    pub fn new(
        game_id: GameId,
        updates: mpsc::Receiver<GameSnapshot>,
        release: mpsc::UnboundedSender<GameId>,
    ) -> Self {
        Self {
            game_id,
            updates,
            release: Some(release),
        }
    }

    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    /// 等待下一个快照，通道关闭时返回 None
    pub async fn next(&mut self) -> Option<GameSnapshot> {
        self.updates.recv().await
    }

    /// 取出已到达的快照（不等待）
    pub fn try_next(&mut self) -> Option<GameSnapshot> {
        self.updates.try_recv().ok()
    }

    /// 取消订阅
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(tx) = self.release.take() {
            // 通道实现已关闭时无需通知
            let _ = tx.send(self.game_id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("game_id", &self.game_id)
            .field("released", &self.release.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> GameSnapshot {
        GameSnapshot::with_start_column(GameConfig::default(), 4)
    }

    #[tokio::test]
    async fn test_subscription_receives_updates() {
        let (tx, rx) = mpsc::channel(4);
        let (release_tx, _release_rx) = mpsc::unbounded_channel();
        let mut sub = Subscription::new(3, rx, release_tx);

        assert!(sub.try_next().is_none());
        tx.send(snapshot()).await.unwrap();
        assert_eq!(sub.next().await, Some(snapshot()));

        drop(tx);
        assert_eq!(sub.next().await, None);
    }

    #[tokio::test]
    async fn test_unsubscribe_releases_once() {
        let (_tx, rx) = mpsc::channel(1);
        let (release_tx, mut release_rx) = mpsc::unbounded_channel();
        let sub = Subscription::new(11, rx, release_tx);

        sub.unsubscribe();
        assert_eq!(release_rx.recv().await, Some(11));
        // 发送端已随订阅释放
        assert_eq!(release_rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_drop_releases() {
        let (_tx, rx) = mpsc::channel(1);
        let (release_tx, mut release_rx) = mpsc::unbounded_channel();
        {
            let sub = Subscription::new(5, rx, release_tx);
            assert_eq!(sub.game_id(), 5);
        }
        assert_eq!(release_rx.recv().await, Some(5));
    }
}
