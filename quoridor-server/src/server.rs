//! 服务器主逻辑

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use protocol::{
    ClientId, ClientMessage, ErrorCode, GameConfig, GameId, GameSnapshot, PlayerId, PlayerInfo,
    ServerMessage,
};

use crate::client::{ClientManager, ClientStatus};
use crate::matchmaking::{MatchQueue, QueuedPlayer};
use crate::room::{RoomManager, RoomState};
use crate::storage::StorageManager;

/// 服务器状态
pub struct ServerState {
    pub clients: ClientManager,
    pub rooms: RoomManager,
    pub queue: MatchQueue,
    pub storage: StorageManager,
    /// 客户端 ID -> 消息发送通道
    pub connections: HashMap<ClientId, mpsc::Sender<ServerMessage>>,
}

impl ServerState {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self::with_storage(StorageManager::new()?))
    }

    pub fn with_storage(storage: StorageManager) -> Self {
        Self {
            clients: ClientManager::new(),
            rooms: RoomManager::new(),
            queue: MatchQueue::new(),
            storage,
            connections: HashMap::new(),
        }
    }

    /// 登记新连接
    pub fn register(&mut self, tx: mpsc::Sender<ServerMessage>) -> ClientId {
        let client_id = self.clients.connect();
        self.connections.insert(client_id, tx);
        client_id
    }

    /// 发送消息给客户端
    pub async fn send_to_client(&self, client_id: ClientId, msg: ServerMessage) {
        if let Some(tx) = self.connections.get(&client_id) {
            let _ = tx.send(msg).await;
        }
    }

    /// 推送给对局的全部订阅者
    pub async fn broadcast_to_subscribers(
        &self,
        game_id: GameId,
        msg: ServerMessage,
        except: Option<ClientId>,
    ) {
        let Some(room) = self.rooms.get(game_id) else {
            return;
        };
        for client_id in room.subscribers() {
            if Some(client_id) != except {
                self.send_to_client(client_id, msg.clone()).await;
            }
        }
    }

    /// 保存已结束对局的记录
    fn save_finished(&self, game_id: GameId) {
        let Some(record) = self.rooms.get(game_id).and_then(|r| r.record()) else {
            return;
        };
        match self.storage.save_record(game_id, record) {
            Ok(record_id) => info!("Game {} saved as {}", game_id, record_id),
            Err(e) => error!("Failed to save game {}: {:#}", game_id, e),
        }
    }
}

/// 待发送的消息
struct PendingMessages {
    messages: Vec<(ClientId, ServerMessage)>,
    broadcasts: Vec<(GameId, ServerMessage, Option<ClientId>)>,
}

impl PendingMessages {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
            broadcasts: Vec::new(),
        }
    }

    fn send(&mut self, client_id: ClientId, msg: ServerMessage) {
        self.messages.push((client_id, msg));
    }

    fn broadcast(&mut self, game_id: GameId, msg: ServerMessage, except: Option<ClientId>) {
        self.broadcasts.push((game_id, msg, except));
    }

    async fn flush(self, state: &ServerState) {
        for (client_id, msg) in self.messages {
            state.send_to_client(client_id, msg).await;
        }
        for (game_id, msg, except) in self.broadcasts {
            state.broadcast_to_subscribers(game_id, msg, except).await;
        }
    }
}

fn error_reply(code: ErrorCode, message: impl Into<String>) -> Option<ServerMessage> {
    Some(ServerMessage::Error {
        code,
        message: message.into(),
    })
}

/// 消息处理器
pub struct MessageHandler;

impl MessageHandler {
    /// 处理客户端消息
    pub async fn handle(
        state: &mut ServerState,
        client_id: ClientId,
        msg: ClientMessage,
    ) -> Option<ServerMessage> {
        let mut pending = PendingMessages::new();

        let result = match msg {
            ClientMessage::Hello { nickname } => Self::handle_hello(state, client_id, nickname),
            ClientMessage::Ping => Some(ServerMessage::Pong),
            _ if !state.clients.is_identified(client_id) => {
                error_reply(ErrorCode::NotIdentified, "请先报名")
            }
            ClientMessage::CreateGame { player, config } => {
                Self::handle_create_game(state, client_id, player, config)
            }
            ClientMessage::JoinGame { game_id, player } => {
                Self::handle_join_game(state, &mut pending, client_id, game_id, player)
            }
            ClientMessage::Subscribe { game_id } => {
                Self::handle_subscribe(state, &mut pending, client_id, game_id)
            }
            ClientMessage::Unsubscribe { game_id } => {
                Self::handle_unsubscribe(state, client_id, game_id)
            }
            ClientMessage::Publish { game_id, snapshot } => {
                Self::handle_publish(state, &mut pending, client_id, game_id, snapshot)
            }
            ClientMessage::LeaveGame { game_id } => {
                Self::handle_leave_game(state, &mut pending, client_id, game_id)
            }
            ClientMessage::FindMatch { player, config } => {
                Self::handle_find_match(state, &mut pending, client_id, player, config)
            }
            ClientMessage::CancelFindMatch => Self::handle_cancel_find_match(state, client_id),
        };

        pending.flush(state).await;

        result
    }

    /// 处理报名
    fn handle_hello(
        state: &mut ServerState,
        client_id: ClientId,
        nickname: String,
    ) -> Option<ServerMessage> {
        match state.clients.identify(client_id, nickname) {
            Ok(()) => {
                info!(
                    "Client {} identified as {}",
                    client_id,
                    state.clients.nickname(client_id).unwrap_or_default()
                );
                Some(ServerMessage::Welcome { client_id })
            }
            Err(msg) => error_reply(ErrorCode::InvalidNickname, msg),
        }
    }

    /// 客户端是否空闲（不在对局、不在队列）
    fn check_idle(state: &ServerState, client_id: ClientId) -> Option<ServerMessage> {
        match state.clients.status(client_id) {
            Some(ClientStatus::InGame(_)) => error_reply(ErrorCode::AlreadyInGame, "已在对局中"),
            Some(ClientStatus::Queued) => error_reply(ErrorCode::AlreadyQueued, "已在匹配队列中"),
            _ => None,
        }
    }

    /// 展示用昵称，优先使用请求里的名字
    fn display_name(state: &ServerState, client_id: ClientId, player: &PlayerInfo) -> String {
        if ClientManager::validate_nickname(&player.nickname).is_ok() {
            player.nickname.clone()
        } else {
            state
                .clients
                .nickname(client_id)
                .unwrap_or("玩家")
                .to_string()
        }
    }

    /// 处理创建对局
    fn handle_create_game(
        state: &mut ServerState,
        client_id: ClientId,
        player: PlayerInfo,
        config: GameConfig,
    ) -> Option<ServerMessage> {
        if let Some(err) = Self::check_idle(state, client_id) {
            return Some(err);
        }
        if let Err(e) = config.validate() {
            return error_reply(ErrorCode::InvalidConfig, e.to_string());
        }

        let nickname = Self::display_name(state, client_id, &player);
        let game_id = state.rooms.create(config);
        let room = state.rooms.get_mut(game_id)?;
        let seat = room.add_player(client_id, nickname)?;
        state
            .clients
            .set_status(client_id, ClientStatus::InGame(game_id));

        info!("Client {} created game {}", client_id, game_id);
        Some(ServerMessage::GameCreated { game_id, seat })
    }

    /// 处理加入对局
    ///
    /// 第二个座位坐满即开局，初始快照推送给订阅者。
    fn handle_join_game(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        client_id: ClientId,
        game_id: GameId,
        player: PlayerInfo,
    ) -> Option<ServerMessage> {
        if let Some(err) = Self::check_idle(state, client_id) {
            return Some(err);
        }

        let Some(room) = state.rooms.get(game_id) else {
            return error_reply(ErrorCode::GameNotFound, "对局不存在");
        };
        if room.state != RoomState::Waiting || room.is_full() {
            return error_reply(ErrorCode::GameFull, "对局已满");
        }

        let nickname = Self::display_name(state, client_id, &player);
        let room = state.rooms.get_mut(game_id)?;
        let seat = room.add_player(client_id, nickname)?;
        state
            .clients
            .set_status(client_id, ClientStatus::InGame(game_id));

        let snapshot = GameSnapshot::new(room.config, &mut rand::thread_rng());
        room.start(snapshot.clone());
        info!("Client {} joined game {}, game started", client_id, game_id);

        pending.broadcast(
            game_id,
            ServerMessage::SnapshotUpdated {
                game_id,
                snapshot: snapshot.clone(),
            },
            Some(client_id),
        );

        Some(ServerMessage::GameJoined {
            game_id,
            seat,
            snapshot,
        })
    }

    /// 处理订阅
    ///
    /// 已开局时立即补发当前快照，避免错过订阅前的更新。
    fn handle_subscribe(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        client_id: ClientId,
        game_id: GameId,
    ) -> Option<ServerMessage> {
        let Some(room) = state.rooms.get_mut(game_id) else {
            return error_reply(ErrorCode::GameNotFound, "对局不存在");
        };
        room.subscribe(client_id);
        debug!("Client {} subscribed to game {}", client_id, game_id);

        if let Some(snapshot) = room.snapshot() {
            pending.send(
                client_id,
                ServerMessage::SnapshotUpdated {
                    game_id,
                    snapshot: snapshot.clone(),
                },
            );
        }

        Some(ServerMessage::Subscribed { game_id })
    }

    /// 处理取消订阅
    fn handle_unsubscribe(
        state: &mut ServerState,
        client_id: ClientId,
        game_id: GameId,
    ) -> Option<ServerMessage> {
        if let Some(room) = state.rooms.get_mut(game_id) {
            room.unsubscribe(client_id);
        }
        Some(ServerMessage::Unsubscribed)
    }

    /// 处理发布快照
    fn handle_publish(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        client_id: ClientId,
        game_id: GameId,
        snapshot: GameSnapshot,
    ) -> Option<ServerMessage> {
        let Some(room) = state.rooms.get_mut(game_id) else {
            return error_reply(ErrorCode::GameNotFound, "对局不存在");
        };
        let Some(seat) = room.seat_of(client_id) else {
            return error_reply(ErrorCode::NotInGame, "不在该对局中");
        };

        if let Err(e) = room.accept_publish(seat, snapshot.clone()) {
            warn!(
                "Rejected snapshot from client {} in game {}: {}",
                client_id, game_id, e
            );
            return error_reply(e.code(), e.to_string());
        }

        let finished = room.state == RoomState::Finished;
        pending.broadcast(
            game_id,
            ServerMessage::SnapshotUpdated { game_id, snapshot },
            Some(client_id),
        );

        if finished {
            info!("Game {} finished", game_id);
            state.save_finished(game_id);
        }

        Some(ServerMessage::Published)
    }

    /// 处理离开对局
    fn handle_leave_game(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        client_id: ClientId,
        game_id: GameId,
    ) -> Option<ServerMessage> {
        match state.rooms.get(game_id) {
            Some(room) if room.has_client(client_id) => {}
            Some(_) => return error_reply(ErrorCode::NotInGame, "不在该对局中"),
            None => return error_reply(ErrorCode::GameNotFound, "对局不存在"),
        }

        Self::leave_room(state, pending, client_id, game_id);
        Some(ServerMessage::Left)
    }

    /// 离座；对局进行中则判另一方获胜
    fn leave_room(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        client_id: ClientId,
        game_id: GameId,
    ) {
        let Some(room) = state.rooms.get_mut(game_id) else {
            return;
        };
        let Some(seat) = room.seat_of(client_id) else {
            return;
        };
        let opponent = room.client_at(seat.opponent());

        let forfeited = room.forfeit(seat);
        room.remove_player(client_id);
        room.unsubscribe(client_id);
        let empty = room.is_empty();
        state.clients.set_status(client_id, ClientStatus::Lobby);

        if let Some(last) = forfeited {
            info!(
                "Client {} left game {}, {} wins",
                client_id,
                game_id,
                seat.opponent()
            );
            pending.broadcast(
                game_id,
                ServerMessage::SnapshotUpdated {
                    game_id,
                    snapshot: last,
                },
                None,
            );
            if let Some(opponent) = opponent {
                pending.send(opponent, ServerMessage::OpponentLeft { game_id });
            }
            state.save_finished(game_id);
        }

        if empty {
            debug!("Game {} is empty, removing", game_id);
            state.rooms.remove(game_id);
        }
    }

    /// 处理快速匹配
    fn handle_find_match(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        client_id: ClientId,
        player: PlayerInfo,
        config: GameConfig,
    ) -> Option<ServerMessage> {
        if let Some(err) = Self::check_idle(state, client_id) {
            return Some(err);
        }
        if let Err(e) = config.validate() {
            return error_reply(ErrorCode::InvalidConfig, e.to_string());
        }

        let nickname = Self::display_name(state, client_id, &player);
        let Some(partner) = state.queue.take_partner(&config) else {
            state
                .queue
                .enqueue(QueuedPlayer::new(client_id, nickname, config));
            state.clients.set_status(client_id, ClientStatus::Queued);
            info!("Client {} queued for a match", client_id);
            return Some(ServerMessage::MatchQueued);
        };

        // 先来的坐 1 号位
        let game_id = state.rooms.create(config);
        let room = state.rooms.get_mut(game_id)?;
        room.add_player(partner.client_id, partner.nickname);
        room.add_player(client_id, nickname);
        room.subscribe(partner.client_id);
        room.subscribe(client_id);
        let snapshot = GameSnapshot::new(config, &mut rand::thread_rng());
        room.start(snapshot.clone());

        state
            .clients
            .set_status(partner.client_id, ClientStatus::InGame(game_id));
        state
            .clients
            .set_status(client_id, ClientStatus::InGame(game_id));
        info!(
            "Matched clients {} and {} in game {}",
            partner.client_id, client_id, game_id
        );

        for (seat, id) in [
            (PlayerId::One, partner.client_id),
            (PlayerId::Two, client_id),
        ] {
            pending.send(
                id,
                ServerMessage::MatchFound {
                    game_id,
                    seat,
                    snapshot: snapshot.clone(),
                },
            );
        }

        Some(ServerMessage::MatchQueued)
    }

    /// 处理取消匹配
    fn handle_cancel_find_match(
        state: &mut ServerState,
        client_id: ClientId,
    ) -> Option<ServerMessage> {
        if !state.queue.cancel(client_id) {
            return error_reply(ErrorCode::NotQueued, "不在匹配队列中");
        }
        state.clients.set_status(client_id, ClientStatus::Lobby);
        Some(ServerMessage::MatchCancelled)
    }

    /// 处理客户端断线：退出队列，离开对局并取消全部订阅
    pub async fn handle_disconnect(state: &mut ServerState, client_id: ClientId) {
        let mut pending = PendingMessages::new();

        state.queue.cancel(client_id);
        if let Some(game_id) = state.rooms.find_client_room(client_id) {
            Self::leave_room(state, &mut pending, client_id, game_id);
        }
        state.rooms.unsubscribe_all(client_id);
        state.clients.remove(client_id);
        state.connections.remove(&client_id);

        pending.flush(state).await;
        info!("Client {} disconnected", client_id);
    }
}
