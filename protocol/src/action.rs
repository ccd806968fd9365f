//! 动作与状态归约
//!
//! 本地和联网对局共用同一个纯函数：`apply_action(快照, 动作, 执行者) -> 新快照`。
//! 联网对局只是把同一个动作在对方的快照上再执行一次。

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::board::{Position, WallPlacement};
use crate::error::RuleError;
use crate::moves::MoveResolver;
use crate::player::PlayerId;
use crate::state::GameSnapshot;
use crate::walls::WallValidator;

/// 玩家动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// 移动棋子
    Move { to: Position },
    /// 放置挡板
    PlaceWall { wall: WallPlacement },
    /// 当前走子方超时
    Timeout,
    /// 无路可走，放弃本回合
    Pass,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Move { to } => write!(f, "MOVE {}", to),
            Action::PlaceWall { wall } => write!(f, "WALL {}", wall),
            Action::Timeout => write!(f, "TIMEOUT"),
            Action::Pass => write!(f, "PASS"),
        }
    }
}

impl GameSnapshot {
    /// 执行动作，非法动作（包括非当前走子方的动作）原样返回快照
    pub fn apply_action(&self, action: Action, actor: PlayerId) -> GameSnapshot {
        match self.try_apply(action, actor) {
            Ok(next) => next,
            Err(e) => {
                debug!("Rejected {} from {}: {}", action, actor, e);
                self.clone()
            }
        }
    }

    /// 执行动作，返回拒绝原因
    pub fn try_apply(&self, action: Action, actor: PlayerId) -> Result<GameSnapshot, RuleError> {
        if self.is_over() {
            return Err(RuleError::GameOver);
        }
        if actor != self.current_player {
            return Err(RuleError::NotYourTurn);
        }

        let board = self.board();
        let mut next = self.clone();

        match action {
            Action::Move { to } => {
                let me = self.player(actor);
                let opponent = self.player(actor.opponent());
                if !MoveResolver::is_legal_move(
                    &board,
                    me.position,
                    to,
                    &self.walls,
                    Some(opponent.position),
                ) {
                    return Err(RuleError::IllegalMove { to });
                }

                let mover = next.player_mut(actor);
                mover.position = to;
                if mover.has_reached_goal() {
                    next.winner = Some(actor);
                } else {
                    next.pass_turn();
                }
            }
            Action::PlaceWall { wall } => {
                let wall = wall.with_owner(actor);
                WallValidator::validate(&board, &wall, &self.walls, &self.players)?;

                next.walls.push(wall);
                next.player_mut(actor).walls_left -= 1;
                next.pass_turn();
            }
            Action::Timeout => {
                next.winner = Some(actor.opponent());
            }
            Action::Pass => {
                let moves = MoveResolver::legal_moves(
                    &board,
                    self.player(actor).position,
                    &self.walls,
                    Some(self.player(actor.opponent()).position),
                );
                if !moves.is_empty() {
                    return Err(RuleError::PassNotAllowed);
                }
                next.pass_turn();
            }
        }

        Ok(next)
    }
}

/// 状态归约（对外接口）
pub fn apply_action(snapshot: &GameSnapshot, action: Action, actor: PlayerId) -> GameSnapshot {
    snapshot.apply_action(action, actor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Wall;
    use crate::error::WallError;
    use crate::player::Player;
    use crate::state::GameConfig;

    fn new_game() -> GameSnapshot {
        GameSnapshot::with_start_column(GameConfig::default(), 4)
    }

    fn all_actions() -> Vec<Action> {
        vec![
            Action::Move {
                to: Position::new(7, 4),
            },
            Action::Move {
                to: Position::new(1, 4),
            },
            Action::PlaceWall {
                wall: WallPlacement::horizontal(4, 4),
            },
            Action::Timeout,
            Action::Pass,
        ]
    }

    #[test]
    fn test_move_switches_turn_and_resets_clock() {
        let snapshot = new_game().tick().tick();
        assert_eq!(snapshot.turn_clock_secs, 58);

        let next = apply_action(
            &snapshot,
            Action::Move {
                to: Position::new(7, 4),
            },
            PlayerId::One,
        );

        assert_eq!(next.player(PlayerId::One).position, Position::new(7, 4));
        assert_eq!(next.current_player, PlayerId::Two);
        assert_eq!(next.turn_clock_secs, snapshot.config.turn_duration_secs);
        assert_eq!(next.game_clock_secs, 2);
        assert_eq!(next.winner, None);
    }

    #[test]
    fn test_wall_commits_and_decrements() {
        let snapshot = new_game().tick();
        let next = apply_action(
            &snapshot,
            Action::PlaceWall {
                wall: WallPlacement::horizontal(4, 4),
            },
            PlayerId::One,
        );

        assert_eq!(next.walls.len(), 1);
        assert_eq!(next.walls[0].owner, PlayerId::One);
        assert_eq!(next.player(PlayerId::One).walls_left, 9);
        assert_eq!(next.player(PlayerId::Two).walls_left, 10);
        assert_eq!(next.current_player, PlayerId::Two);
        assert_eq!(next.turn_clock_secs, snapshot.config.turn_duration_secs);
    }

    #[test]
    fn test_non_active_actor_is_noop() {
        let snapshot = new_game();
        for action in all_actions() {
            assert_eq!(apply_action(&snapshot, action, PlayerId::Two), snapshot);
        }

        let after_move = apply_action(
            &snapshot,
            Action::Move {
                to: Position::new(7, 4),
            },
            PlayerId::One,
        );
        for action in all_actions() {
            assert_eq!(apply_action(&after_move, action, PlayerId::One), after_move);
        }
    }

    #[test]
    fn test_not_your_turn_error() {
        let snapshot = new_game();
        assert_eq!(
            snapshot.try_apply(Action::Pass, PlayerId::Two),
            Err(RuleError::NotYourTurn)
        );
    }

    #[test]
    fn test_illegal_move_rejected() {
        let snapshot = new_game();
        let action = Action::Move {
            to: Position::new(6, 4),
        };
        assert_eq!(
            snapshot.try_apply(action, PlayerId::One),
            Err(RuleError::IllegalMove {
                to: Position::new(6, 4)
            })
        );
        assert_eq!(apply_action(&snapshot, action, PlayerId::One), snapshot);
    }

    #[test]
    fn test_illegal_wall_reasons() {
        let mut snapshot = new_game();
        snapshot.walls.push(WallPlacement::horizontal(1, 3).with_owner(PlayerId::Two));

        let overlap = Action::PlaceWall {
            wall: WallPlacement::horizontal(1, 4),
        };
        assert!(matches!(
            snapshot.try_apply(overlap, PlayerId::One),
            Err(RuleError::IllegalWall(WallError::Collision { .. }))
        ));

        snapshot.players[0].walls_left = 0;
        let fresh = Action::PlaceWall {
            wall: WallPlacement::horizontal(5, 5),
        };
        assert_eq!(
            snapshot.try_apply(fresh, PlayerId::One),
            Err(RuleError::IllegalWall(WallError::NoWallsLeft))
        );
    }

    #[test]
    fn test_reaching_goal_wins() {
        let config = GameConfig::default();
        let players = [
            Player::new(PlayerId::One, Position::new(1, 2), 10, 0),
            Player::new(PlayerId::Two, Position::new(5, 5), 10, 8),
        ];
        let snapshot = GameSnapshot::from_parts(config, players, Vec::<Wall>::new(), PlayerId::One);

        let next = apply_action(
            &snapshot,
            Action::Move {
                to: Position::new(0, 2),
            },
            PlayerId::One,
        );
        assert_eq!(next.winner, Some(PlayerId::One));
        assert_eq!(next.current_player, PlayerId::One);

        // 终局后不再接受任何动作
        for action in all_actions() {
            assert_eq!(apply_action(&next, action, PlayerId::One), next);
            assert_eq!(apply_action(&next, action, PlayerId::Two), next);
        }
    }

    #[test]
    fn test_timeout_awards_opponent() {
        let snapshot = new_game();
        let next = apply_action(&snapshot, Action::Timeout, PlayerId::One);
        assert_eq!(next.winner, Some(PlayerId::Two));
    }

    #[test]
    fn test_pass_rejected_while_moves_exist() {
        let snapshot = new_game();
        assert_eq!(
            snapshot.try_apply(Action::Pass, PlayerId::One),
            Err(RuleError::PassNotAllowed)
        );
        assert_eq!(apply_action(&snapshot, Action::Pass, PlayerId::One), snapshot);
    }

    #[test]
    fn test_pass_switches_turn_when_trapped() {
        // 左下角被两块挡板围住，没有任何合法走法
        let players = [
            Player::new(PlayerId::One, Position::new(8, 0), 10, 0),
            Player::new(PlayerId::Two, Position::new(0, 4), 8, 8),
        ];
        let walls = vec![
            WallPlacement::horizontal(8, 0).with_owner(PlayerId::Two),
            WallPlacement::vertical(7, 1).with_owner(PlayerId::Two),
        ];
        let snapshot =
            GameSnapshot::from_parts(GameConfig::default(), players, walls, PlayerId::One).tick();

        let next = apply_action(&snapshot, Action::Pass, PlayerId::One);
        assert_eq!(next.current_player, PlayerId::Two);
        assert_eq!(next.turn_clock_secs, snapshot.config.turn_duration_secs);
        assert_eq!(next.players, snapshot.players);
    }

    #[test]
    fn test_jump_through_reconciler() {
        let config = GameConfig::default();
        let players = [
            Player::new(PlayerId::One, Position::new(4, 4), 10, 0),
            Player::new(PlayerId::Two, Position::new(3, 4), 10, 8),
        ];
        let snapshot = GameSnapshot::from_parts(config, players, Vec::new(), PlayerId::One);

        let onto = apply_action(
            &snapshot,
            Action::Move {
                to: Position::new(3, 4),
            },
            PlayerId::One,
        );
        assert_eq!(onto, snapshot);

        let jumped = apply_action(
            &snapshot,
            Action::Move {
                to: Position::new(2, 4),
            },
            PlayerId::One,
        );
        assert_eq!(jumped.player(PlayerId::One).position, Position::new(2, 4));
    }
}
