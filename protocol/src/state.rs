//! 对局快照与配置

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::board::{Board, Position, Wall};
use crate::constants::{
    DEFAULT_BOARD_SIZE, DEFAULT_TURN_DURATION_SECS, DEFAULT_WALLS_PER_PLAYER, MAX_BOARD_SIZE,
    MAX_TURN_DURATION_SECS, MAX_WALLS_PER_PLAYER, MIN_BOARD_SIZE, MIN_TURN_DURATION_REMOTE_AI_SECS,
    MIN_TURN_DURATION_SECS, MIN_WALLS_PER_PLAYER,
};
use crate::error::ConfigError;
use crate::player::{Player, PlayerId};

/// 起始位置模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StartMode {
    /// 双方都从中间列出发
    #[default]
    SymmetricCenter,
    /// 随机列，双方关于棋盘中心对称
    SymmetricRandom,
}

/// 对局配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameConfig {
    /// 棋盘边长
    pub board_size: u8,
    /// 每方挡板数
    pub walls_per_player: u8,
    /// 每步限时（秒）
    pub turn_duration_secs: u32,
    /// 起始位置模式
    pub start_mode: StartMode,
}

impl GameConfig {
    /// 检查配置范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&self.board_size) {
            return Err(ConfigError::BoardSize {
                size: self.board_size,
                min: MIN_BOARD_SIZE,
                max: MAX_BOARD_SIZE,
            });
        }
        if !(MIN_WALLS_PER_PLAYER..=MAX_WALLS_PER_PLAYER).contains(&self.walls_per_player) {
            return Err(ConfigError::WallsPerPlayer {
                walls: self.walls_per_player,
                min: MIN_WALLS_PER_PLAYER,
                max: MAX_WALLS_PER_PLAYER,
            });
        }
        self.check_turn_duration(MIN_TURN_DURATION_SECS)
    }

    /// 使用远程 AI 时的检查（限时下限更高）
    pub fn validate_for_remote_ai(&self) -> Result<(), ConfigError> {
        self.validate()?;
        self.check_turn_duration(MIN_TURN_DURATION_REMOTE_AI_SECS)
    }

    fn check_turn_duration(&self, min: u32) -> Result<(), ConfigError> {
        if !(min..=MAX_TURN_DURATION_SECS).contains(&self.turn_duration_secs) {
            return Err(ConfigError::TurnDuration {
                secs: self.turn_duration_secs,
                min,
                max: MAX_TURN_DURATION_SECS,
            });
        }
        Ok(())
    }

    /// 棋盘
    pub fn board(&self) -> Board {
        Board::new(self.board_size)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_size: DEFAULT_BOARD_SIZE,
            walls_per_player: DEFAULT_WALLS_PER_PLAYER,
            turn_duration_secs: DEFAULT_TURN_DURATION_SECS,
            start_mode: StartMode::default(),
        }
    }
}

/// 对局快照
///
/// 完整、不可变的对局状态；所有改动都通过 [`GameSnapshot::apply_action`] 生成新快照。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub config: GameConfig,
    /// 按 [`PlayerId::index`] 存放
    pub players: [Player; 2],
    /// 按放置顺序排列
    pub walls: Vec<Wall>,
    pub current_player: PlayerId,
    pub winner: Option<PlayerId>,
    /// 对局总时长（秒）
    pub game_clock_secs: u32,
    /// 当前回合剩余时间（秒）
    pub turn_clock_secs: u32,
}

impl GameSnapshot {
    /// 按配置创建初始快照，1 号玩家先手
    pub fn new<R: Rng + ?Sized>(config: GameConfig, rng: &mut R) -> Self {
        let board = config.board();
        let column = match config.start_mode {
            StartMode::SymmetricCenter => board.center_column(),
            StartMode::SymmetricRandom => rng.gen_range(0..config.board_size),
        };
        Self::with_start_column(config, column)
    }

    /// 指定 1 号玩家的起始列（2 号玩家取中心对称列）
    pub fn with_start_column(config: GameConfig, column: u8) -> Self {
        let board = config.board();
        let last = board.last_row();
        let column = column.min(last);
        let players = [
            Player::new(
                PlayerId::One,
                Position::new(last, column),
                config.walls_per_player,
                0,
            ),
            Player::new(
                PlayerId::Two,
                Position::new(0, last - column),
                config.walls_per_player,
                last,
            ),
        ];
        Self::from_parts(config, players, Vec::new(), PlayerId::One)
    }

    /// 从任意局面构造（用于残局、测试和记录回放）
    pub fn from_parts(
        config: GameConfig,
        players: [Player; 2],
        walls: Vec<Wall>,
        current_player: PlayerId,
    ) -> Self {
        Self {
            config,
            players,
            walls,
            current_player,
            winner: None,
            game_clock_secs: 0,
            turn_clock_secs: config.turn_duration_secs,
        }
    }

    pub fn board(&self) -> Board {
        self.config.board()
    }

    pub fn player(&self, id: PlayerId) -> &Player {
        &self.players[id.index()]
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> &mut Player {
        &mut self.players[id.index()]
    }

    /// 当前走子方
    pub fn current(&self) -> &Player {
        self.player(self.current_player)
    }

    /// 对局是否已结束
    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    /// 时钟走一秒
    ///
    /// 对局总时长加一，当前回合剩余时间减一（不低于 0）。已结束的对局不变。
    /// 回合时间归零后由回合控制器负责提交超时动作。
    pub fn tick(&self) -> GameSnapshot {
        let mut next = self.clone();
        if next.is_over() {
            return next;
        }
        next.game_clock_secs = next.game_clock_secs.saturating_add(1);
        next.turn_clock_secs = next.turn_clock_secs.saturating_sub(1);
        next
    }

    /// 当前回合是否已超时
    pub fn is_turn_expired(&self) -> bool {
        !self.is_over() && self.turn_clock_secs == 0
    }

    /// 交换走子方并重置回合时间
    pub(crate) fn pass_turn(&mut self) {
        self.current_player = self.current_player.opponent();
        self.turn_clock_secs = self.config.turn_duration_secs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_initial_snapshot_center() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let snapshot = GameSnapshot::new(GameConfig::default(), &mut rng);

        assert_eq!(snapshot.player(PlayerId::One).position, Position::new(8, 4));
        assert_eq!(snapshot.player(PlayerId::One).goal_row, 0);
        assert_eq!(snapshot.player(PlayerId::Two).position, Position::new(0, 4));
        assert_eq!(snapshot.player(PlayerId::Two).goal_row, 8);
        assert_eq!(snapshot.player(PlayerId::One).walls_left, DEFAULT_WALLS_PER_PLAYER);
        assert_eq!(snapshot.current_player, PlayerId::One);
        assert_eq!(snapshot.winner, None);
        assert_eq!(snapshot.game_clock_secs, 0);
        assert_eq!(snapshot.turn_clock_secs, DEFAULT_TURN_DURATION_SECS);
        assert!(snapshot.walls.is_empty());
    }

    #[test]
    fn test_initial_snapshot_random_is_symmetric() {
        let config = GameConfig {
            start_mode: StartMode::SymmetricRandom,
            ..GameConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        for _ in 0..20 {
            let snapshot = GameSnapshot::new(config, &mut rng);
            let one = snapshot.player(PlayerId::One).position;
            let two = snapshot.player(PlayerId::Two).position;
            assert_eq!(one.r, 8);
            assert_eq!(two.r, 0);
            assert_eq!(one.c + two.c, 8);
        }
    }

    #[test]
    fn test_config_ranges() {
        assert!(GameConfig::default().validate().is_ok());

        let too_many_walls = GameConfig {
            walls_per_player: 16,
            ..GameConfig::default()
        };
        assert!(matches!(
            too_many_walls.validate(),
            Err(ConfigError::WallsPerPlayer { .. })
        ));

        let too_short = GameConfig {
            turn_duration_secs: 20,
            ..GameConfig::default()
        };
        assert!(matches!(
            too_short.validate(),
            Err(ConfigError::TurnDuration { .. })
        ));

        let tiny = GameConfig {
            board_size: 2,
            ..GameConfig::default()
        };
        assert!(matches!(tiny.validate(), Err(ConfigError::BoardSize { .. })));
    }

    #[test]
    fn test_remote_ai_turn_floor() {
        let config = GameConfig {
            turn_duration_secs: 45,
            ..GameConfig::default()
        };
        assert!(config.validate().is_ok());
        assert!(config.validate_for_remote_ai().is_err());

        let config = GameConfig {
            turn_duration_secs: 90,
            ..GameConfig::default()
        };
        assert!(config.validate_for_remote_ai().is_ok());
    }

    #[test]
    fn test_tick() {
        let snapshot = GameSnapshot::with_start_column(GameConfig::default(), 4);
        let next = snapshot.tick();
        assert_eq!(next.game_clock_secs, 1);
        assert_eq!(next.turn_clock_secs, DEFAULT_TURN_DURATION_SECS - 1);

        let mut over = snapshot.clone();
        over.winner = Some(PlayerId::Two);
        assert_eq!(over.tick(), over);
    }

    #[test]
    fn test_turn_expires() {
        let config = GameConfig {
            turn_duration_secs: 30,
            ..GameConfig::default()
        };
        let mut snapshot = GameSnapshot::with_start_column(config, 4);
        for _ in 0..29 {
            snapshot = snapshot.tick();
            assert!(!snapshot.is_turn_expired());
        }
        snapshot = snapshot.tick();
        assert!(snapshot.is_turn_expired());
        assert_eq!(snapshot.game_clock_secs, 30);
    }
}
