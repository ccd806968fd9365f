//! 联网对局流程
//!
//! 创建、加入和快速匹配都带超时；失败或超时时释放订阅，
//! 回合控制器回到菜单并附带提示，不自动重试。

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::time::timeout;
use tracing::{info, warn};

use protocol::{
    Action, GameChannel, GameConfig, GameId, PlayerId, PlayerInfo, Subscription, LOBBY_TIMEOUT,
    MATCHMAKING_TIMEOUT,
};

use crate::game::TurnController;

/// 联网流程入口
pub struct OnlineFlow<C: ?Sized> {
    channel: Arc<C>,
    player: PlayerInfo,
    lobby_timeout: Duration,
    match_timeout: Duration,
}

impl<C: GameChannel + ?Sized> OnlineFlow<C> {
    pub fn new(channel: Arc<C>, player: PlayerInfo) -> Self {
        Self {
            channel,
            player,
            lobby_timeout: LOBBY_TIMEOUT,
            match_timeout: MATCHMAKING_TIMEOUT,
        }
    }

    /// 修改等待对手和匹配的超时
    pub fn with_timeouts(mut self, lobby: Duration, matchmaking: Duration) -> Self {
        self.lobby_timeout = lobby;
        self.match_timeout = matchmaking;
        self
    }

    /// 创建对局；成功后控制器处于等待对手阶段
    pub async fn host(&self, controller: &mut TurnController, config: GameConfig) -> Option<Lobby<C>> {
        controller.await_opponent();

        let game_id = match self.channel.create(self.player.clone(), config).await {
            Ok(game_id) => game_id,
            Err(e) => {
                controller.return_to_menu(Some(format!("创建对局失败: {}", e)));
                return None;
            }
        };
        let subscription = match self.channel.subscribe(game_id).await {
            Ok(subscription) => subscription,
            Err(e) => {
                leave_quietly(self.channel.as_ref(), game_id).await;
                controller.return_to_menu(Some(format!("订阅对局失败: {}", e)));
                return None;
            }
        };

        info!("Game {} created, waiting for an opponent", game_id);
        Some(Lobby {
            channel: self.channel.clone(),
            game_id,
            subscription,
            timeout: self.lobby_timeout,
        })
    }

    /// 加入对局，加入者坐 2 号位
    pub async fn join(&self, controller: &mut TurnController, game_id: GameId) -> Option<OnlineGame<C>> {
        controller.await_opponent();

        let joined = timeout(
            self.lobby_timeout,
            self.channel.join(game_id, self.player.clone()),
        )
        .await;
        let snapshot = match joined {
            Ok(Ok(Some(snapshot))) => snapshot,
            Ok(Ok(None)) => {
                controller.return_to_menu(Some("对局不存在或已满".to_string()));
                return None;
            }
            Ok(Err(e)) => {
                controller.return_to_menu(Some(format!("加入对局失败: {}", e)));
                return None;
            }
            Err(_) => {
                controller.return_to_menu(Some("加入对局超时".to_string()));
                return None;
            }
        };

        let subscription = match self.channel.subscribe(game_id).await {
            Ok(subscription) => subscription,
            Err(e) => {
                leave_quietly(self.channel.as_ref(), game_id).await;
                controller.return_to_menu(Some(format!("订阅对局失败: {}", e)));
                return None;
            }
        };

        controller.start_online(game_id, PlayerId::Two, snapshot);
        Some(OnlineGame::new(
            self.channel.clone(),
            game_id,
            PlayerId::Two,
            subscription,
        ))
    }

    /// 快速匹配
    pub async fn quick_match(
        &self,
        controller: &mut TurnController,
        config: GameConfig,
    ) -> Option<OnlineGame<C>> {
        controller.await_opponent();

        let found = timeout(
            self.match_timeout,
            self.channel.find_match(self.player.clone(), config),
        )
        .await;
        let found = match found {
            Ok(Ok(found)) => found,
            Ok(Err(e)) => {
                controller.return_to_menu(Some(format!("匹配失败: {}", e)));
                return None;
            }
            Err(_) => {
                warn!(
                    "Quick match timeout after {} seconds",
                    self.match_timeout.as_secs()
                );
                if let Err(e) = self.channel.cancel_find_match().await {
                    warn!("Cancel find match failed: {}", e);
                }
                controller.return_to_menu(Some("匹配超时，请稍后再试".to_string()));
                return None;
            }
        };

        let subscription = match self.channel.subscribe(found.game_id).await {
            Ok(subscription) => subscription,
            Err(e) => {
                leave_quietly(self.channel.as_ref(), found.game_id).await;
                controller.return_to_menu(Some(format!("订阅对局失败: {}", e)));
                return None;
            }
        };

        info!("Matched into game {} as {}", found.game_id, found.seat);
        controller.start_online(found.game_id, found.seat, found.snapshot);
        Some(OnlineGame::new(
            self.channel.clone(),
            found.game_id,
            found.seat,
            subscription,
        ))
    }
}

async fn leave_quietly<C: GameChannel + ?Sized>(channel: &C, game_id: GameId) {
    if let Err(e) = channel.leave(game_id).await {
        warn!("Leave game {} failed: {}", game_id, e);
    }
}

/// 已创建、等待对手的对局
pub struct Lobby<C: ?Sized> {
    channel: Arc<C>,
    game_id: GameId,
    subscription: Subscription,
    timeout: Duration,
}

impl<C: GameChannel + ?Sized> Lobby<C> {
    /// 对局 ID，交给对手加入
    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    /// 等待对手加入；超时则离开对局
    pub async fn wait_for_opponent(mut self, controller: &mut TurnController) -> Option<OnlineGame<C>> {
        let first = timeout(self.timeout, self.subscription.next()).await;
        match first {
            Ok(Some(snapshot)) => {
                controller.start_online(self.game_id, PlayerId::One, snapshot);
                Some(OnlineGame::new(
                    self.channel,
                    self.game_id,
                    PlayerId::One,
                    self.subscription,
                ))
            }
            Ok(None) => {
                controller.return_to_menu(Some("与服务器的连接已断开".to_string()));
                None
            }
            Err(_) => {
                self.subscription.unsubscribe();
                leave_quietly(self.channel.as_ref(), self.game_id).await;
                controller.return_to_menu(Some("等待对手超时".to_string()));
                None
            }
        }
    }

    /// 放弃等待
    pub async fn cancel(self, controller: &mut TurnController) {
        self.subscription.unsubscribe();
        leave_quietly(self.channel.as_ref(), self.game_id).await;
        controller.return_to_menu(None);
    }
}

/// 进行中的联网对局
pub struct OnlineGame<C: ?Sized> {
    channel: Arc<C>,
    game_id: GameId,
    seat: PlayerId,
    subscription: Subscription,
}

impl<C: GameChannel + ?Sized> OnlineGame<C> {
    fn new(channel: Arc<C>, game_id: GameId, seat: PlayerId, subscription: Subscription) -> Self {
        Self {
            channel,
            game_id,
            seat,
            subscription,
        }
    }

    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    pub fn seat(&self) -> PlayerId {
        self.seat
    }

    /// 本方行动：先在本地执行，再发布完整快照
    pub async fn submit(&self, controller: &mut TurnController, action: Action) -> anyhow::Result<()> {
        let next = controller.submit(action, self.seat)?;
        self.channel
            .publish(self.game_id, next)
            .await
            .context("发布快照失败")
    }

    /// 时钟走一秒，本方超时则发布超时后的快照
    pub async fn tick(&self, controller: &mut TurnController) -> anyhow::Result<()> {
        if controller.tick().is_none() {
            return Ok(());
        }
        let Some(snapshot) = controller.snapshot().cloned() else {
            return Ok(());
        };
        self.channel
            .publish(self.game_id, snapshot)
            .await
            .context("发布超时失败")
    }

    /// 应用已到达的全部快照，返回局面是否变化
    pub fn poll(&mut self, controller: &mut TurnController) -> bool {
        let mut updated = false;
        while let Some(snapshot) = self.subscription.try_next() {
            updated |= controller.receive_remote(snapshot);
        }
        updated
    }

    /// 等待下一个快照；连接断开时回到菜单
    pub async fn next_update(&mut self, controller: &mut TurnController) -> bool {
        match self.subscription.next().await {
            Some(snapshot) => controller.receive_remote(snapshot),
            None => {
                controller.return_to_menu(Some("与服务器的连接已断开".to_string()));
                false
            }
        }
    }

    /// 离开对局并回到菜单；对局进行中离开判负
    pub async fn leave(self, controller: &mut TurnController) -> anyhow::Result<()> {
        self.subscription.unsubscribe();
        let result = self
            .channel
            .leave(self.game_id)
            .await
            .context("离开对局失败");
        controller.return_to_menu(None);
        result
    }
}
