//! 对局通道客户端
//!
//! 在 TCP 连接上实现 [`GameChannel`]。后台读任务把服务端消息分流：
//! 快照推送交给对应的订阅，匹配成功交给等待中的 `find_match`，其余作为请求应答。
//! 请求按顺序一问一答。

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use anyhow::Context;
use async_trait::async_trait;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use protocol::{
    ClientId, ClientMessage, Connector, ErrorCode, FrameReader, FrameWriter, GameChannel,
    GameConfig, GameId, GameSnapshot, MatchFound, PlayerInfo, ProtocolError, Result,
    ServerMessage, Subscription, TcpConnector, HEARTBEAT_INTERVAL, REQUEST_TIMEOUT,
};

/// 每个订阅缓存的快照数
const SUBSCRIPTION_BUFFER: usize = 32;

type Writer = FrameWriter<OwnedWriteHalf>;

/// 读任务的分流表
#[derive(Default)]
struct Routes {
    /// 每个对局只保留一个订阅，重复订阅替换旧订阅
    subscriptions: HashMap<GameId, mpsc::Sender<GameSnapshot>>,
    pending_match: Option<oneshot::Sender<MatchFound>>,
    closed: bool,
}

fn lock_routes(routes: &StdMutex<Routes>) -> MutexGuard<'_, Routes> {
    routes.lock().unwrap_or_else(PoisonError::into_inner)
}

/// TCP 对局通道
pub struct ChannelClient {
    client_id: ClientId,
    writer: Arc<Mutex<Writer>>,
    /// 应答队列；持有锁即独占一次请求
    replies: Mutex<mpsc::UnboundedReceiver<ServerMessage>>,
    routes: Arc<StdMutex<Routes>>,
    release_tx: mpsc::UnboundedSender<GameId>,
    tasks: Vec<JoinHandle<()>>,
}

impl ChannelClient {
    /// 连接服务端并报名
    pub async fn connect(addr: &str, nickname: &str) -> anyhow::Result<Self> {
        let conn = TcpConnector
            .connect(addr)
            .await
            .with_context(|| format!("无法连接服务器: {}", addr))?;
        let (mut reader, mut writer) = conn.split();

        writer
            .send(&ClientMessage::Hello {
                nickname: nickname.to_string(),
            })
            .await?;
        let client_id = match timeout(REQUEST_TIMEOUT, reader.recv::<ServerMessage>()).await {
            Ok(Ok(ServerMessage::Welcome { client_id })) => client_id,
            Ok(Ok(ServerMessage::Error { code, message })) => {
                return Err(ProtocolError::Rejected { code, message }).context("服务器拒绝报名");
            }
            Ok(Ok(other)) => {
                return Err(ProtocolError::UnexpectedReply(format!("{:?}", other)).into())
            }
            Ok(Err(e)) => return Err(e).context("等待服务器应答失败"),
            Err(_) => return Err(ProtocolError::RequestTimeout.into()),
        };
        info!("Connected to {} as client {}", addr, client_id);

        let writer = Arc::new(Mutex::new(writer));
        let routes = Arc::new(StdMutex::new(Routes::default()));
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let (release_tx, release_rx) = mpsc::unbounded_channel();

        let tasks = vec![
            tokio::spawn(read_loop(reader, routes.clone(), reply_tx)),
            tokio::spawn(heartbeat_loop(writer.clone())),
            tokio::spawn(release_loop(release_rx, routes.clone(), writer.clone())),
        ];

        Ok(Self {
            client_id,
            writer,
            replies: Mutex::new(reply_rx),
            routes,
            release_tx,
            tasks,
        })
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// 连接是否已断开
    pub fn is_closed(&self) -> bool {
        lock_routes(&self.routes).closed
    }

    /// 发送请求并等待应答，错误应答转成 [`ProtocolError::Rejected`]
    async fn request(&self, msg: ClientMessage) -> Result<ServerMessage> {
        let mut replies = self.replies.lock().await;

        // 丢弃之前超时请求的迟到应答
        while let Ok(stale) = replies.try_recv() {
            debug!("Dropping stale reply: {:?}", stale);
        }

        if self.is_closed() {
            return Err(ProtocolError::ConnectionClosed);
        }
        self.writer.lock().await.send(&msg).await?;

        match timeout(REQUEST_TIMEOUT, replies.recv()).await {
            Ok(Some(ServerMessage::Error { code, message })) => {
                Err(ProtocolError::Rejected { code, message })
            }
            Ok(Some(reply)) => Ok(reply),
            Ok(None) => Err(ProtocolError::ConnectionClosed),
            Err(_) => Err(ProtocolError::RequestTimeout),
        }
    }
}

fn unexpected(reply: ServerMessage) -> ProtocolError {
    ProtocolError::UnexpectedReply(format!("{:?}", reply))
}

#[async_trait]
impl GameChannel for ChannelClient {
    async fn create(&self, player: PlayerInfo, config: GameConfig) -> Result<GameId> {
        match self.request(ClientMessage::CreateGame { player, config }).await? {
            ServerMessage::GameCreated { game_id, .. } => Ok(game_id),
            other => Err(unexpected(other)),
        }
    }

    async fn join(&self, game_id: GameId, player: PlayerInfo) -> Result<Option<GameSnapshot>> {
        match self.request(ClientMessage::JoinGame { game_id, player }).await {
            Ok(ServerMessage::GameJoined { snapshot, .. }) => Ok(Some(snapshot)),
            Ok(other) => Err(unexpected(other)),
            Err(ProtocolError::Rejected {
                code: ErrorCode::GameNotFound | ErrorCode::GameFull,
                message,
            }) => {
                info!("Cannot join game {}: {}", game_id, message);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn subscribe(&self, game_id: GameId) -> Result<Subscription> {
        // 先登记再请求，补发的快照会先于应答到达
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        lock_routes(&self.routes).subscriptions.insert(game_id, tx);

        match self.request(ClientMessage::Subscribe { game_id }).await {
            Ok(ServerMessage::Subscribed { .. }) => {
                Ok(Subscription::new(game_id, rx, self.release_tx.clone()))
            }
            Ok(other) => {
                lock_routes(&self.routes).subscriptions.remove(&game_id);
                Err(unexpected(other))
            }
            Err(e) => {
                lock_routes(&self.routes).subscriptions.remove(&game_id);
                Err(e)
            }
        }
    }

    async fn publish(&self, game_id: GameId, snapshot: GameSnapshot) -> Result<()> {
        match self.request(ClientMessage::Publish { game_id, snapshot }).await? {
            ServerMessage::Published => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn leave(&self, game_id: GameId) -> Result<()> {
        match self.request(ClientMessage::LeaveGame { game_id }).await? {
            ServerMessage::Left => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn find_match(&self, player: PlayerInfo, config: GameConfig) -> Result<MatchFound> {
        let (tx, rx) = oneshot::channel();
        lock_routes(&self.routes).pending_match = Some(tx);

        let queued = match self.request(ClientMessage::FindMatch { player, config }).await {
            Ok(ServerMessage::MatchQueued) => Ok(()),
            Ok(other) => Err(unexpected(other)),
            Err(e) => Err(e),
        };
        if let Err(e) = queued {
            lock_routes(&self.routes).pending_match = None;
            return Err(e);
        }

        rx.await.map_err(|_| {
            if self.is_closed() {
                ProtocolError::ConnectionClosed
            } else {
                ProtocolError::Cancelled
            }
        })
    }

    async fn cancel_find_match(&self) -> Result<()> {
        lock_routes(&self.routes).pending_match = None;
        match self.request(ClientMessage::CancelFindMatch).await? {
            ServerMessage::MatchCancelled => Ok(()),
            other => Err(unexpected(other)),
        }
    }
}

impl Drop for ChannelClient {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// 读任务：分流服务端消息，连接断开后关闭全部订阅
async fn read_loop(
    mut reader: FrameReader<OwnedReadHalf>,
    routes: Arc<StdMutex<Routes>>,
    replies: mpsc::UnboundedSender<ServerMessage>,
) {
    loop {
        let msg = match reader.recv::<ServerMessage>().await {
            Ok(msg) => msg,
            Err(ProtocolError::ConnectionClosed) => {
                info!("Server closed the connection");
                break;
            }
            Err(e) => {
                warn!("Receive error: {}", e);
                break;
            }
        };

        match msg {
            ServerMessage::SnapshotUpdated { game_id, snapshot } => {
                let tx = lock_routes(&routes).subscriptions.get(&game_id).cloned();
                match tx {
                    Some(tx) => {
                        if tx.send(snapshot).await.is_err() {
                            lock_routes(&routes).subscriptions.remove(&game_id);
                        }
                    }
                    None => debug!("No subscription for game {}", game_id),
                }
            }
            ServerMessage::MatchFound {
                game_id,
                seat,
                snapshot,
            } => {
                let slot = lock_routes(&routes).pending_match.take();
                let found = MatchFound {
                    game_id,
                    seat,
                    snapshot,
                };
                if slot.map_or(true, |tx| tx.send(found).is_err()) {
                    warn!("Match {} found but nobody is waiting", game_id);
                }
            }
            ServerMessage::OpponentLeft { game_id } => {
                info!("Opponent left game {}", game_id);
            }
            ServerMessage::Pong | ServerMessage::Unsubscribed => {}
            reply => {
                if replies.send(reply).is_err() {
                    break;
                }
            }
        }
    }

    let mut routes = lock_routes(&routes);
    routes.closed = true;
    routes.subscriptions.clear();
    routes.pending_match = None;
}

/// 心跳任务
async fn heartbeat_loop(writer: Arc<Mutex<Writer>>) {
    let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
    interval.tick().await;
    loop {
        interval.tick().await;
        if let Err(e) = writer.lock().await.send(&ClientMessage::Ping).await {
            debug!("Heartbeat stopped: {}", e);
            break;
        }
    }
}

/// 订阅释放任务：订阅被丢弃后通知服务端
async fn release_loop(
    mut release_rx: mpsc::UnboundedReceiver<GameId>,
    routes: Arc<StdMutex<Routes>>,
    writer: Arc<Mutex<Writer>>,
) {
    while let Some(game_id) = release_rx.recv().await {
        {
            let mut routes = lock_routes(&routes);
            // 同一对局已有新订阅时保留
            if routes
                .subscriptions
                .get(&game_id)
                .is_some_and(|tx| !tx.is_closed())
            {
                continue;
            }
            routes.subscriptions.remove(&game_id);
        }

        debug!("Unsubscribing from game {}", game_id);
        if let Err(e) = writer
            .lock()
            .await
            .send(&ClientMessage::Unsubscribe { game_id })
            .await
        {
            debug!("Unsubscribe for game {} not sent: {}", game_id, e);
            break;
        }
    }
}
