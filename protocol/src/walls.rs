//! 挡板合法性验证

use crate::board::{Board, Orientation, Wall, WallPlacement};
use crate::error::WallError;
use crate::path::PathFinder;
use crate::player::Player;

/// 挡板验证器
pub struct WallValidator;

impl WallValidator {
    /// 挡板是否可以放置
    pub fn is_legal_placement(board: &Board, wall: &Wall, walls: &[Wall], players: &[Player]) -> bool {
        Self::validate(board, wall, walls, players).is_ok()
    }

    /// 验证挡板，返回第一条不满足的规则
    ///
    /// 依次检查：剩余挡板数、边界、与已有挡板的碰撞、放置后双方是否仍有路可走。
    /// 只做判断，不修改任何状态。
    pub fn validate(
        board: &Board,
        wall: &Wall,
        walls: &[Wall],
        players: &[Player],
    ) -> Result<(), WallError> {
        // 找不到归属玩家按无剩余挡板处理
        let has_walls = players
            .iter()
            .find(|p| p.id == wall.owner)
            .is_some_and(|p| p.walls_left > 0);
        if !has_walls {
            return Err(WallError::NoWallsLeft);
        }

        let placement = wall.placement();
        if !board.wall_in_bounds(&placement) {
            return Err(WallError::OutOfBounds {
                r: wall.r,
                c: wall.c,
            });
        }

        if let Some(existing) = walls.iter().find(|w| Self::collides(&placement, &w.placement())) {
            return Err(WallError::Collision {
                existing: existing.placement(),
            });
        }

        // 假设放置后，每个玩家都必须仍能到达自己的目标行
        let mut hypothetical = Vec::with_capacity(walls.len() + 1);
        hypothetical.extend_from_slice(walls);
        hypothetical.push(*wall);

        for player in players {
            if !PathFinder::has_path(board, player.position, player.goal_row, &hypothetical) {
                return Err(WallError::WouldEnclose { player: player.id });
            }
        }

        Ok(())
    }

    /// 两块挡板是否冲突（重合、同线重叠或十字交叉）
    pub fn collides(a: &WallPlacement, b: &WallPlacement) -> bool {
        use Orientation::{Horizontal, Vertical};

        match (a.orientation, b.orientation) {
            (Horizontal, Horizontal) => a.r == b.r && a.c.abs_diff(b.c) < 2,
            (Vertical, Vertical) => a.c == b.c && a.r.abs_diff(b.r) < 2,
            (Horizontal, Vertical) => b.r + 1 == a.r && b.c == a.c + 1,
            (Vertical, Horizontal) => a.r + 1 == b.r && a.c == b.c + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;
    use crate::player::PlayerId;

    fn default_players() -> [Player; 2] {
        [
            Player::new(PlayerId::One, Position::new(8, 4), 10, 0),
            Player::new(PlayerId::Two, Position::new(0, 4), 10, 8),
        ]
    }

    fn placed(placements: &[WallPlacement]) -> Vec<Wall> {
        placements
            .iter()
            .map(|w| w.with_owner(PlayerId::Two))
            .collect()
    }

    #[test]
    fn test_overlap_same_line() {
        let board = Board::default();
        let players = default_players();
        let walls = placed(&[WallPlacement::horizontal(1, 3)]);

        let overlapping = WallPlacement::horizontal(1, 4).with_owner(PlayerId::One);
        assert!(matches!(
            WallValidator::validate(&board, &overlapping, &walls, &players),
            Err(WallError::Collision { .. })
        ));

        let apart = WallPlacement::horizontal(1, 6).with_owner(PlayerId::One);
        assert!(WallValidator::is_legal_placement(&board, &apart, &walls, &players));

        // 相邻但不重叠（间隔 2）
        let touching = WallPlacement::horizontal(1, 5).with_owner(PlayerId::One);
        assert!(WallValidator::is_legal_placement(&board, &touching, &walls, &players));
    }

    #[test]
    fn test_identical_wall_rejected() {
        let board = Board::default();
        let players = default_players();
        let walls = placed(&[WallPlacement::vertical(3, 3)]);

        let same = WallPlacement::vertical(3, 3).with_owner(PlayerId::One);
        assert!(!WallValidator::is_legal_placement(&board, &same, &walls, &players));

        let below = WallPlacement::vertical(4, 3).with_owner(PlayerId::One);
        assert!(!WallValidator::is_legal_placement(&board, &below, &walls, &players));

        let clear = WallPlacement::vertical(5, 3).with_owner(PlayerId::One);
        assert!(WallValidator::is_legal_placement(&board, &clear, &walls, &players));
    }

    #[test]
    fn test_cross_rejected() {
        let board = Board::default();
        let players = default_players();

        // 横 (4, 2) 与 纵 (3, 3) 中心重合
        let walls = placed(&[WallPlacement::horizontal(4, 2)]);
        let cross = WallPlacement::vertical(3, 3).with_owner(PlayerId::One);
        assert!(matches!(
            WallValidator::validate(&board, &cross, &walls, &players),
            Err(WallError::Collision { .. })
        ));

        let walls = placed(&[WallPlacement::vertical(3, 3)]);
        let cross = WallPlacement::horizontal(4, 2).with_owner(PlayerId::One);
        assert!(!WallValidator::is_legal_placement(&board, &cross, &walls, &players));

        // 共用端点但不交叉
        let t_shape = WallPlacement::horizontal(5, 2).with_owner(PlayerId::One);
        assert!(WallValidator::is_legal_placement(&board, &t_shape, &walls, &players));
    }

    #[test]
    fn test_out_of_bounds() {
        let board = Board::default();
        let players = default_players();

        for wall in [
            WallPlacement::horizontal(0, 2),
            WallPlacement::horizontal(3, 8),
            WallPlacement::vertical(8, 3),
            WallPlacement::vertical(2, 0),
        ] {
            let wall = wall.with_owner(PlayerId::One);
            assert!(matches!(
                WallValidator::validate(&board, &wall, &[], &players),
                Err(WallError::OutOfBounds { .. })
            ));
        }
    }

    #[test]
    fn test_no_walls_left() {
        let board = Board::default();
        let mut players = default_players();
        players[0].walls_left = 0;

        let wall = WallPlacement::horizontal(4, 4).with_owner(PlayerId::One);
        assert_eq!(
            WallValidator::validate(&board, &wall, &[], &players),
            Err(WallError::NoWallsLeft)
        );

        // 另一方不受影响
        let wall = WallPlacement::horizontal(4, 4).with_owner(PlayerId::Two);
        assert!(WallValidator::is_legal_placement(&board, &wall, &[], &players));
    }

    #[test]
    fn test_enclosure_rejected_by_path_check_alone() {
        // 2 号玩家困在左上角，挡板本身不与任何挡板冲突
        let board = Board::default();
        let players = [
            Player::new(PlayerId::One, Position::new(8, 4), 10, 0),
            Player::new(PlayerId::Two, Position::new(0, 0), 10, 8),
        ];
        let walls = placed(&[WallPlacement::vertical(0, 1)]);
        let closing = WallPlacement::horizontal(2, 0).with_owner(PlayerId::One);

        assert!(!walls
            .iter()
            .any(|w| WallValidator::collides(&closing.placement(), &w.placement())));
        assert_eq!(
            WallValidator::validate(&board, &closing, &walls, &players),
            Err(WallError::WouldEnclose {
                player: PlayerId::Two
            })
        );
    }

    #[test]
    fn test_accepted_walls_keep_paths() {
        // 每次接受的挡板都保证双方仍有路
        let board = Board::default();
        let players = default_players();
        let mut walls: Vec<Wall> = Vec::new();

        for r in 1..9u8 {
            for c in 0..8u8 {
                for wall in [WallPlacement::horizontal(r, c), WallPlacement::vertical(c, r)] {
                    let wall = wall.with_owner(PlayerId::One);
                    if WallValidator::is_legal_placement(&board, &wall, &walls, &players) {
                        walls.push(wall);
                        for p in &players {
                            assert!(PathFinder::has_path(&board, p.position, p.goal_row, &walls));
                        }
                    }
                }
            }
        }

        // 已接受的挡板两两不冲突
        for (i, a) in walls.iter().enumerate() {
            for b in &walls[i + 1..] {
                assert!(!WallValidator::collides(&a.placement(), &b.placement()));
            }
        }
        assert!(!walls.is_empty());
    }
}
