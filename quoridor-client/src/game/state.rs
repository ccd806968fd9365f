//! 回合控制器
//!
//! 客户端持有的对局状态机：`Menu → Playing → GameOver`，联网时多一个 `AwaitingOpponent`。
//! 所有落子都经过 [`GameSnapshot::try_apply`]，控制器本身只负责阶段、时钟和记录。

use protocol::{
    Action, ConfigError, Difficulty, GameConfig, GameId, GameRecord, GameResult, GameSnapshot,
    PlayerId, RuleError, WinReason,
};
use quoridor_ai::AiBackend;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info};

/// 人机对局中人类玩家的座位（先手）
pub const HUMAN_SEAT: PlayerId = PlayerId::One;

/// 人机对局中 AI 的座位
pub const AI_SEAT: PlayerId = PlayerId::Two;

/// 对局阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Menu,
    /// 等待对手加入或匹配
    AwaitingOpponent,
    Playing,
    GameOver,
}

/// 游戏模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    /// 本地人机
    LocalPvE {
        difficulty: Difficulty,
        backend: AiBackend,
    },
    /// 本地双人（同一设备）
    LocalPvP,
    /// 联网对局，本方坐 `seat`
    Online { game_id: GameId, seat: PlayerId },
}

impl GameMode {
    /// 是否是本地模式（不需要网络）
    pub fn is_local(&self) -> bool {
        !self.is_online()
    }

    pub fn is_online(&self) -> bool {
        matches!(self, GameMode::Online { .. })
    }

    pub fn is_pve(&self) -> bool {
        matches!(self, GameMode::LocalPvE { .. })
    }

    /// 获取难度（仅人机模式有效）
    pub fn difficulty(&self) -> Option<Difficulty> {
        match self {
            GameMode::LocalPvE { difficulty, .. } => Some(*difficulty),
            GameMode::LocalPvP | GameMode::Online { .. } => None,
        }
    }

    /// 获取对局 ID（仅联网模式有效）
    pub fn game_id(&self) -> Option<GameId> {
        match self {
            GameMode::Online { game_id, .. } => Some(*game_id),
            GameMode::LocalPvE { .. } | GameMode::LocalPvP => None,
        }
    }
}

/// 控制器拒绝动作的原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TurnError {
    #[error("No game in progress")]
    NotPlaying,

    /// 联网对局中只能替本方座位行动
    #[error("Seat {0} is not controlled by this client")]
    NotLocalSeat(PlayerId),

    #[error(transparent)]
    Rule(#[from] RuleError),
}

/// 回合控制器
#[derive(Debug, Default)]
pub struct TurnController {
    phase: Phase,
    mode: Option<GameMode>,
    snapshot: Option<GameSnapshot>,
    /// 本地对局的记录；联网对局由服务端保存
    record: Option<GameRecord>,
    result: Option<GameResult>,
    /// 给用户看的提示（例如联网流程失败的原因）
    message: Option<String>,
}

impl TurnController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> Option<GameMode> {
        self.mode
    }

    pub fn snapshot(&self) -> Option<&GameSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn record(&self) -> Option<&GameRecord> {
        self.record.as_ref()
    }

    pub fn result(&self) -> Option<GameResult> {
        self.result
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// 取走提示
    pub fn take_message(&mut self) -> Option<String> {
        self.message.take()
    }

    /// 开始本地人机对局，人类先手
    pub fn start_local_pve<R: Rng + ?Sized>(
        &mut self,
        config: GameConfig,
        difficulty: Difficulty,
        backend: AiBackend,
        rng: &mut R,
    ) -> Result<(), ConfigError> {
        match backend {
            AiBackend::Local => config.validate()?,
            AiBackend::Remote => config.validate_for_remote_ai()?,
        }
        let snapshot = GameSnapshot::new(config, rng);
        self.start_game(GameMode::LocalPvE { difficulty, backend }, snapshot);
        Ok(())
    }

    /// 开始本地双人对局
    pub fn start_local_pvp<R: Rng + ?Sized>(
        &mut self,
        config: GameConfig,
        rng: &mut R,
    ) -> Result<(), ConfigError> {
        config.validate()?;
        let snapshot = GameSnapshot::new(config, rng);
        self.start_game(GameMode::LocalPvP, snapshot);
        Ok(())
    }

    /// 以联网对局的初始快照开局
    pub fn start_online(&mut self, game_id: GameId, seat: PlayerId, snapshot: GameSnapshot) {
        self.start_game(GameMode::Online { game_id, seat }, snapshot);
    }

    /// 以任意快照开局
    pub fn start_game(&mut self, mode: GameMode, snapshot: GameSnapshot) {
        self.record = match mode {
            GameMode::LocalPvE { difficulty, .. } => {
                let mut record =
                    GameRecord::new("玩家".to_string(), format!("AI ({})", difficulty), &snapshot);
                record.set_ai_difficulty(difficulty);
                Some(record)
            }
            GameMode::LocalPvP => Some(GameRecord::new(
                "1 号玩家".to_string(),
                "2 号玩家".to_string(),
                &snapshot,
            )),
            GameMode::Online { .. } => None,
        };

        info!("Game started: {:?}", mode);
        self.phase = Phase::Playing;
        self.mode = Some(mode);
        self.snapshot = Some(snapshot);
        self.result = None;
        self.message = None;
    }

    /// 进入等待对手阶段
    pub fn await_opponent(&mut self) {
        self.phase = Phase::AwaitingOpponent;
        self.mode = None;
        self.snapshot = None;
        self.record = None;
        self.result = None;
        self.message = None;
    }

    /// 回到菜单，可附带提示
    pub fn return_to_menu(&mut self, message: Option<String>) {
        if let Some(msg) = &message {
            info!("Back to menu: {}", msg);
        }
        self.phase = Phase::Menu;
        self.mode = None;
        self.snapshot = None;
        self.record = None;
        self.result = None;
        self.message = message;
    }

    /// 该座位是否由本客户端操作
    pub fn controls(&self, player: PlayerId) -> bool {
        match self.mode {
            Some(GameMode::LocalPvE { .. }) | Some(GameMode::LocalPvP) => true,
            Some(GameMode::Online { seat, .. }) => player == seat,
            None => false,
        }
    }

    /// 联网对局中本方座位
    pub fn local_seat(&self) -> Option<PlayerId> {
        match self.mode {
            Some(GameMode::Online { seat, .. }) => Some(seat),
            Some(GameMode::LocalPvE { .. }) => Some(HUMAN_SEAT),
            Some(GameMode::LocalPvP) | None => None,
        }
    }

    fn current_player(&self) -> Option<PlayerId> {
        if self.phase != Phase::Playing {
            return None;
        }
        self.snapshot.as_ref().map(|s| s.current_player)
    }

    /// 是否轮到本地人类玩家输入
    pub fn is_my_turn(&self) -> bool {
        let Some(current) = self.current_player() else {
            return false;
        };
        match self.mode {
            Some(GameMode::LocalPvP) => true,
            Some(GameMode::LocalPvE { .. }) => current == HUMAN_SEAT,
            Some(GameMode::Online { seat, .. }) => current == seat,
            None => false,
        }
    }

    /// 是否轮到 AI 行动
    pub fn should_ai_move(&self) -> bool {
        matches!(self.mode, Some(GameMode::LocalPvE { .. }))
            && self.current_player() == Some(AI_SEAT)
    }

    /// 提交一个动作，返回执行后的快照
    pub fn submit(&mut self, action: Action, actor: PlayerId) -> Result<GameSnapshot, TurnError> {
        if self.phase != Phase::Playing {
            return Err(TurnError::NotPlaying);
        }
        if !self.controls(actor) {
            return Err(TurnError::NotLocalSeat(actor));
        }
        let snapshot = self.snapshot.as_ref().ok_or(TurnError::NotPlaying)?;

        let next = snapshot.try_apply(action, actor).inspect_err(|e| {
            debug!("Rejected {} from {}: {}", action, actor, e);
        })?;

        if let Some(record) = &mut self.record {
            record.record(actor, action, &next);
        }
        if let Some(winner) = next.winner {
            let reason = match action {
                Action::Timeout => WinReason::Timeout,
                _ => WinReason::ReachedGoal,
            };
            self.finish(GameResult { winner, reason });
        }

        self.snapshot = Some(next.clone());
        Ok(next)
    }

    /// 时钟走一秒
    ///
    /// 当前走子方的回合时间耗尽且由本客户端操作时，提交超时动作并返回它。
    pub fn tick(&mut self) -> Option<Action> {
        if self.phase != Phase::Playing {
            return None;
        }
        let next = self.snapshot.as_ref()?.tick();
        let expired = next.is_turn_expired();
        let current = next.current_player;
        self.snapshot = Some(next);

        if expired && self.controls(current) {
            info!("{} ran out of time", current);
            if self.submit(Action::Timeout, current).is_ok() {
                return Some(Action::Timeout);
            }
        }
        None
    }

    /// 收到对方发布的快照
    ///
    /// 只在联网对局进行中生效；与本地局面相同（忽略时钟）的快照被忽略。返回是否更新。
    pub fn receive_remote(&mut self, snapshot: GameSnapshot) -> bool {
        if !matches!(self.mode, Some(GameMode::Online { .. })) || self.phase != Phase::Playing {
            return false;
        }
        if let Some(current) = &self.snapshot {
            if same_position(current, &snapshot) {
                return false;
            }
        }

        if let Some(winner) = snapshot.winner {
            self.finish(GameResult {
                winner,
                reason: remote_win_reason(&snapshot, winner),
            });
        }
        self.snapshot = Some(snapshot);
        true
    }

    fn finish(&mut self, result: GameResult) {
        info!("Game over: {} wins ({:?})", result.winner, result.reason);
        self.phase = Phase::GameOver;
        self.result = Some(result);
        if let Some(record) = &mut self.record {
            record.set_result(result);
        }
    }
}

/// 推断远程快照中的胜利原因
///
/// 超时动作发布时回合时间为 0；服务端判离开方负时沿用上一次发布的快照，
/// 其回合时间刚被重置过。
fn remote_win_reason(snapshot: &GameSnapshot, winner: PlayerId) -> WinReason {
    if snapshot.player(winner).has_reached_goal() {
        WinReason::ReachedGoal
    } else if snapshot.turn_clock_secs == 0 {
        WinReason::Timeout
    } else {
        WinReason::OpponentLeft
    }
}

/// 两个快照的局面是否相同（不比较时钟）
fn same_position(a: &GameSnapshot, b: &GameSnapshot) -> bool {
    a.config == b.config
        && a.players == b.players
        && a.walls == b.walls
        && a.current_player == b.current_player
        && a.winner == b.winner
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{Player, Position, WallPlacement};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    fn short_config() -> GameConfig {
        GameConfig {
            turn_duration_secs: 30,
            ..GameConfig::default()
        }
    }

    /// 1 号玩家离终点一步
    fn near_goal(config: GameConfig) -> GameSnapshot {
        let players = [
            Player::new(PlayerId::One, Position::new(1, 4), config.walls_per_player, 0),
            Player::new(PlayerId::Two, Position::new(5, 0), config.walls_per_player, 8),
        ];
        GameSnapshot::from_parts(config, players, Vec::new(), PlayerId::One)
    }

    #[test]
    fn test_starts_in_menu() {
        let controller = TurnController::new();
        assert_eq!(controller.phase(), Phase::Menu);
        assert!(controller.snapshot().is_none());
        assert!(!controller.is_my_turn());
    }

    #[test]
    fn test_start_local_pvp_resets_clocks() {
        let mut controller = TurnController::new();
        controller
            .start_local_pvp(short_config(), &mut rng())
            .unwrap();

        assert_eq!(controller.phase(), Phase::Playing);
        let snapshot = controller.snapshot().unwrap();
        assert_eq!(snapshot.turn_clock_secs, 30);
        assert_eq!(snapshot.game_clock_secs, 0);
        assert_eq!(snapshot.current_player, PlayerId::One);
        assert!(controller.record().is_some());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut controller = TurnController::new();
        let config = GameConfig {
            walls_per_player: 2,
            ..GameConfig::default()
        };
        assert!(controller.start_local_pvp(config, &mut rng()).is_err());
        assert_eq!(controller.phase(), Phase::Menu);

        // 远程 AI 要求更长的每步限时
        let result =
            controller.start_local_pve(short_config(), Difficulty::Easy, AiBackend::Remote, &mut rng());
        assert!(matches!(result, Err(ConfigError::TurnDuration { min: 60, .. })));
    }

    #[test]
    fn test_submit_passes_turn_and_resets_clock() {
        let mut controller = TurnController::new();
        controller.start_game(
            GameMode::LocalPvP,
            GameSnapshot::with_start_column(short_config(), 4),
        );
        for _ in 0..5 {
            assert!(controller.tick().is_none());
        }
        assert_eq!(controller.snapshot().unwrap().turn_clock_secs, 25);

        let next = controller
            .submit(Action::Move { to: Position::new(7, 4) }, PlayerId::One)
            .unwrap();
        assert_eq!(next.current_player, PlayerId::Two);
        assert_eq!(next.turn_clock_secs, 30);
        assert_eq!(next.game_clock_secs, 5);

        let wall = WallPlacement::horizontal(3, 3);
        let next = controller
            .submit(Action::PlaceWall { wall }, PlayerId::Two)
            .unwrap();
        assert_eq!(next.current_player, PlayerId::One);
        assert_eq!(next.player(PlayerId::Two).walls_left, 9);
        assert_eq!(controller.record().unwrap().actions.len(), 2);
    }

    #[test]
    fn test_rejected_action_leaves_state_unchanged() {
        let mut controller = TurnController::new();
        controller.start_game(
            GameMode::LocalPvP,
            GameSnapshot::with_start_column(GameConfig::default(), 4),
        );
        let before = controller.snapshot().cloned();

        let err = controller
            .submit(Action::Move { to: Position::new(1, 4) }, PlayerId::Two)
            .unwrap_err();
        assert_eq!(err, TurnError::Rule(RuleError::NotYourTurn));

        let err = controller
            .submit(Action::Move { to: Position::new(6, 4) }, PlayerId::One)
            .unwrap_err();
        assert!(matches!(err, TurnError::Rule(RuleError::IllegalMove { .. })));

        assert_eq!(controller.snapshot().cloned(), before);
        assert!(controller.record().unwrap().actions.is_empty());
    }

    #[test]
    fn test_reaching_goal_ends_game() {
        let mut controller = TurnController::new();
        controller.start_game(GameMode::LocalPvP, near_goal(GameConfig::default()));

        controller
            .submit(Action::Move { to: Position::new(0, 4) }, PlayerId::One)
            .unwrap();
        assert_eq!(controller.phase(), Phase::GameOver);
        assert_eq!(
            controller.result(),
            Some(GameResult {
                winner: PlayerId::One,
                reason: WinReason::ReachedGoal,
            })
        );
        assert_eq!(
            controller.record().unwrap().metadata.result,
            controller.result()
        );

        // 终局后不再接受动作
        assert_eq!(
            controller.submit(Action::Pass, PlayerId::Two),
            Err(TurnError::NotPlaying)
        );
        assert!(controller.tick().is_none());
    }

    #[test]
    fn test_tick_synthesizes_timeout() {
        let mut controller = TurnController::new();
        controller.start_game(
            GameMode::LocalPvP,
            GameSnapshot::with_start_column(short_config(), 4),
        );

        for _ in 0..29 {
            assert!(controller.tick().is_none());
        }
        assert_eq!(controller.tick(), Some(Action::Timeout));
        assert_eq!(controller.phase(), Phase::GameOver);
        assert_eq!(
            controller.result(),
            Some(GameResult {
                winner: PlayerId::Two,
                reason: WinReason::Timeout,
            })
        );
        assert_eq!(controller.snapshot().unwrap().game_clock_secs, 30);
    }

    #[test]
    fn test_online_timeout_only_for_local_seat() {
        let mut controller = TurnController::new();
        controller.start_online(
            1,
            PlayerId::Two,
            GameSnapshot::with_start_column(short_config(), 4),
        );

        // 对方的回合超时由对方上报
        for _ in 0..40 {
            assert!(controller.tick().is_none());
        }
        assert_eq!(controller.phase(), Phase::Playing);
        assert!(controller.snapshot().unwrap().is_turn_expired());
    }

    #[test]
    fn test_online_cannot_act_for_opponent() {
        let mut controller = TurnController::new();
        controller.start_online(
            1,
            PlayerId::Two,
            GameSnapshot::with_start_column(GameConfig::default(), 4),
        );
        assert!(!controller.is_my_turn());
        assert_eq!(
            controller.submit(Action::Move { to: Position::new(7, 4) }, PlayerId::One),
            Err(TurnError::NotLocalSeat(PlayerId::One))
        );
        assert!(controller.record().is_none());
    }

    #[test]
    fn test_receive_remote_snapshot() {
        let initial = GameSnapshot::with_start_column(GameConfig::default(), 4);
        let mut controller = TurnController::new();
        controller.start_online(1, PlayerId::Two, initial.clone());

        // 相同局面（例如订阅补发）被忽略
        assert!(!controller.receive_remote(initial.tick()));

        let moved = initial.apply_action(Action::Move { to: Position::new(7, 4) }, PlayerId::One);
        assert!(controller.receive_remote(moved.clone()));
        assert_eq!(controller.snapshot(), Some(&moved));
        assert!(controller.is_my_turn());

        let next = controller
            .submit(Action::Move { to: Position::new(1, 4) }, PlayerId::Two)
            .unwrap();
        assert_eq!(next.current_player, PlayerId::One);
    }

    #[test]
    fn test_receive_remote_ignored_outside_online() {
        let mut controller = TurnController::new();
        let snapshot = GameSnapshot::with_start_column(GameConfig::default(), 4);
        controller.start_game(GameMode::LocalPvP, snapshot.clone());

        let moved = snapshot.apply_action(Action::Move { to: Position::new(7, 4) }, PlayerId::One);
        assert!(!controller.receive_remote(moved));
        assert_eq!(controller.snapshot(), Some(&snapshot));
    }

    #[test]
    fn test_remote_win_reasons() {
        let config = GameConfig::default();
        let mut controller = TurnController::new();
        controller.start_online(1, PlayerId::Two, near_goal(config));

        let won = near_goal(config).apply_action(Action::Move { to: Position::new(0, 4) }, PlayerId::One);
        assert!(controller.receive_remote(won));
        assert_eq!(controller.phase(), Phase::GameOver);
        assert_eq!(
            controller.result(),
            Some(GameResult {
                winner: PlayerId::One,
                reason: WinReason::ReachedGoal,
            })
        );

        // 对方回合耗尽后发布的超时
        let initial = GameSnapshot::with_start_column(config, 4);
        let mut expired = initial.clone();
        for _ in 0..config.turn_duration_secs {
            expired = expired.tick();
        }
        let timed_out = expired.apply_action(Action::Timeout, PlayerId::One);
        let mut controller = TurnController::new();
        controller.start_online(2, PlayerId::Two, initial.clone());
        assert!(controller.receive_remote(timed_out));
        assert_eq!(controller.result().unwrap().reason, WinReason::Timeout);
        assert_eq!(controller.result().unwrap().winner, PlayerId::Two);

        // 服务端判离开方负
        let mut forfeited = initial.clone();
        forfeited.winner = Some(PlayerId::Two);
        let mut controller = TurnController::new();
        controller.start_online(3, PlayerId::Two, initial);
        assert!(controller.receive_remote(forfeited));
        assert_eq!(
            controller.result(),
            Some(GameResult {
                winner: PlayerId::Two,
                reason: WinReason::OpponentLeft,
            })
        );
    }

    #[test]
    fn test_pve_turn_order() {
        let mut controller = TurnController::new();
        controller
            .start_local_pve(GameConfig::default(), Difficulty::Easy, AiBackend::Local, &mut rng())
            .unwrap();
        assert!(controller.is_my_turn());
        assert!(!controller.should_ai_move());

        let to = {
            let snapshot = controller.snapshot().unwrap();
            let me = snapshot.player(HUMAN_SEAT).position;
            Position::new(me.r - 1, me.c)
        };
        controller.submit(Action::Move { to }, HUMAN_SEAT).unwrap();
        assert!(controller.should_ai_move());
        assert!(!controller.is_my_turn());
        assert_eq!(
            controller.record().unwrap().metadata.ai_difficulty,
            Some(Difficulty::Easy)
        );
    }

    #[test]
    fn test_await_and_return_to_menu() {
        let mut controller = TurnController::new();
        controller.await_opponent();
        assert_eq!(controller.phase(), Phase::AwaitingOpponent);

        controller.return_to_menu(Some("匹配超时".to_string()));
        assert_eq!(controller.phase(), Phase::Menu);
        assert_eq!(controller.message(), Some("匹配超时"));
        assert_eq!(controller.take_message().as_deref(), Some("匹配超时"));
        assert!(controller.message().is_none());
    }
}
