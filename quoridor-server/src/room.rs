//! 对局房间
//!
//! 房间保存两个座位、最新快照和订阅者。服务端不替客户端执行动作，
//! 只检查发布的快照能否由当前走子方的一个合法动作得到。

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use protocol::{
    Action, ClientId, ErrorCode, GameConfig, GameId, GameRecord, GameResult, GameSnapshot,
    PlayerId, WinReason,
};
use thiserror::Error;
use tracing::debug;

/// 房间状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    /// 等待第二位玩家
    Waiting,
    Playing,
    Finished,
}

/// 发布被拒绝的原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("Game has not started")]
    NotStarted,

    #[error("Game is already over")]
    AlreadyOver,

    #[error("Not your turn")]
    NotYourTurn,

    #[error("Snapshot config does not match the game")]
    ConfigMismatch,

    #[error("Snapshot is not one legal action away: {0}")]
    Unreachable(String),
}

impl PublishError {
    pub fn code(&self) -> ErrorCode {
        match self {
            PublishError::NotStarted => ErrorCode::GameNotStarted,
            PublishError::AlreadyOver => ErrorCode::GameAlreadyOver,
            PublishError::NotYourTurn => ErrorCode::NotYourTurn,
            PublishError::ConfigMismatch | PublishError::Unreachable(_) => {
                ErrorCode::InvalidSnapshot
            }
        }
    }
}

/// 座位
#[derive(Debug, Clone)]
pub struct Seat {
    pub client_id: ClientId,
    pub nickname: String,
}

/// 对局房间
pub struct GameRoom {
    pub id: GameId,
    pub config: GameConfig,
    pub state: RoomState,
    /// 按 [`PlayerId::index`] 存放
    seats: [Option<Seat>; 2],
    snapshot: Option<GameSnapshot>,
    subscribers: HashSet<ClientId>,
    record: Option<GameRecord>,
    pub created_at: Instant,
}

impl GameRoom {
    pub fn new(id: GameId, config: GameConfig) -> Self {
        Self {
            id,
            config,
            state: RoomState::Waiting,
            seats: [None, None],
            snapshot: None,
            subscribers: HashSet::new(),
            record: None,
            created_at: Instant::now(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.seats.iter().all(Option::is_some)
    }

    pub fn is_empty(&self) -> bool {
        self.seats.iter().all(Option::is_none)
    }

    /// 客户端所在座位
    pub fn seat_of(&self, client_id: ClientId) -> Option<PlayerId> {
        [PlayerId::One, PlayerId::Two]
            .into_iter()
            .find(|id| {
                self.seats[id.index()]
                    .as_ref()
                    .is_some_and(|s| s.client_id == client_id)
            })
    }

    /// 某个座位上的客户端
    pub fn client_at(&self, seat: PlayerId) -> Option<ClientId> {
        self.seats[seat.index()].as_ref().map(|s| s.client_id)
    }

    pub fn has_client(&self, client_id: ClientId) -> bool {
        self.seat_of(client_id).is_some()
    }

    /// 坐到第一个空座位
    pub fn add_player(&mut self, client_id: ClientId, nickname: String) -> Option<PlayerId> {
        let seat = [PlayerId::One, PlayerId::Two]
            .into_iter()
            .find(|id| self.seats[id.index()].is_none())?;
        self.seats[seat.index()] = Some(Seat {
            client_id,
            nickname,
        });
        Some(seat)
    }

    /// 离座
    pub fn remove_player(&mut self, client_id: ClientId) -> Option<PlayerId> {
        let seat = self.seat_of(client_id)?;
        self.seats[seat.index()] = None;
        Some(seat)
    }

    fn nickname_at(&self, seat: PlayerId) -> String {
        self.seats[seat.index()]
            .as_ref()
            .map(|s| s.nickname.clone())
            .unwrap_or_default()
    }

    /// 开局
    pub fn start(&mut self, snapshot: GameSnapshot) {
        self.record = Some(GameRecord::new(
            self.nickname_at(PlayerId::One),
            self.nickname_at(PlayerId::Two),
            &snapshot,
        ));
        self.snapshot = Some(snapshot);
        self.state = RoomState::Playing;
    }

    /// 最新快照
    pub fn snapshot(&self) -> Option<&GameSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn record(&self) -> Option<&GameRecord> {
        self.record.as_ref()
    }

    pub fn subscribe(&mut self, client_id: ClientId) {
        self.subscribers.insert(client_id);
    }

    pub fn unsubscribe(&mut self, client_id: ClientId) -> bool {
        self.subscribers.remove(&client_id)
    }

    pub fn subscribers(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.subscribers.iter().copied()
    }

    /// 接受 `seat` 发布的快照
    ///
    /// 只接受当前走子方发布、且恰好由一个合法动作得到的快照；时钟字段由客户端自行维护，不参与比较。
    pub fn accept_publish(
        &mut self,
        seat: PlayerId,
        next: GameSnapshot,
    ) -> Result<Action, PublishError> {
        match self.state {
            RoomState::Waiting => return Err(PublishError::NotStarted),
            RoomState::Finished => return Err(PublishError::AlreadyOver),
            RoomState::Playing => {}
        }
        let current = self.snapshot.as_ref().ok_or(PublishError::NotStarted)?;
        if current.is_over() {
            return Err(PublishError::AlreadyOver);
        }
        if current.current_player != seat {
            return Err(PublishError::NotYourTurn);
        }
        if next.config != current.config {
            return Err(PublishError::ConfigMismatch);
        }

        let action = infer_action(current, &next, seat).ok_or_else(|| {
            PublishError::Unreachable("walls were changed or removed".to_string())
        })?;
        let expected = current
            .try_apply(action, seat)
            .map_err(|e| PublishError::Unreachable(e.to_string()))?;
        if !same_position(&expected, &next) {
            return Err(PublishError::Unreachable(format!(
                "{} does not produce the published position",
                action
            )));
        }

        debug!("Game {}: {} played {}", self.id, seat, action);
        if let Some(record) = self.record.as_mut() {
            record.record(seat, action, &next);
        }
        if next.is_over() {
            self.state = RoomState::Finished;
        }
        self.snapshot = Some(next);
        Ok(action)
    }

    /// 对局中离开：判另一方获胜，返回终局快照
    pub fn forfeit(&mut self, leaver: PlayerId) -> Option<GameSnapshot> {
        if self.state != RoomState::Playing {
            return None;
        }
        let mut last = self.snapshot.clone()?;
        if last.is_over() {
            return None;
        }
        let winner = leaver.opponent();
        last.winner = Some(winner);
        if let Some(record) = self.record.as_mut() {
            record.set_result(GameResult {
                winner,
                reason: WinReason::OpponentLeft,
            });
        }
        self.state = RoomState::Finished;
        self.snapshot = Some(last.clone());
        Some(last)
    }
}

/// 从前后两个快照推断 `actor` 执行的动作
///
/// 只看挡板和棋子位置，结果仍需用规则重新执行来确认。
pub fn infer_action(prev: &GameSnapshot, next: &GameSnapshot, actor: PlayerId) -> Option<Action> {
    if next.walls.len() == prev.walls.len() + 1 && next.walls.starts_with(&prev.walls) {
        let wall = next.walls.last()?;
        return Some(Action::PlaceWall {
            wall: wall.placement(),
        });
    }
    if next.walls != prev.walls {
        return None;
    }

    let before = prev.player(actor).position;
    let after = next.player(actor).position;
    if before != after {
        return Some(Action::Move { to: after });
    }
    if next.winner == Some(actor.opponent()) {
        return Some(Action::Timeout);
    }
    Some(Action::Pass)
}

/// 除时钟外完全一致
fn same_position(a: &GameSnapshot, b: &GameSnapshot) -> bool {
    a.config == b.config
        && a.players == b.players
        && a.walls == b.walls
        && a.current_player == b.current_player
        && a.winner == b.winner
}

/// 房间管理器
pub struct RoomManager {
    rooms: HashMap<GameId, GameRoom>,
    next_id: AtomicU64,
}

impl RoomManager {
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    fn generate_id(&self) -> GameId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// 创建房间
    pub fn create(&mut self, config: GameConfig) -> GameId {
        let id = self.generate_id();
        self.rooms.insert(id, GameRoom::new(id, config));
        id
    }

    pub fn get(&self, game_id: GameId) -> Option<&GameRoom> {
        self.rooms.get(&game_id)
    }

    pub fn get_mut(&mut self, game_id: GameId) -> Option<&mut GameRoom> {
        self.rooms.get_mut(&game_id)
    }

    pub fn remove(&mut self, game_id: GameId) -> Option<GameRoom> {
        self.rooms.remove(&game_id)
    }

    /// 查找客户端就座的房间
    pub fn find_client_room(&self, client_id: ClientId) -> Option<GameId> {
        self.rooms
            .values()
            .find(|r| r.has_client(client_id))
            .map(|r| r.id)
    }

    /// 取消客户端的全部订阅
    pub fn unsubscribe_all(&mut self, client_id: ClientId) {
        for room in self.rooms.values_mut() {
            room.unsubscribe(client_id);
        }
    }

    pub fn count(&self) -> usize {
        self.rooms.len()
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new()
    }
}
