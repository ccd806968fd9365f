//! 走法生成
//!
//! 枚举棋子的合法落点：正交一步、直线跳过对手、直跳受阻时的斜向跳。

use crate::board::{Board, Direction, Position, Wall};

/// 走法生成器
pub struct MoveResolver;

impl MoveResolver {
    /// 生成合法落点
    ///
    /// 顺序固定（上、下、左、右，跳跃落点替换对手所在的那一格），
    /// 下游的寻路和 AI 依赖这个顺序做确定性的平局裁决。
    pub fn legal_moves(
        board: &Board,
        pos: Position,
        walls: &[Wall],
        opponent: Option<Position>,
    ) -> Vec<Position> {
        let mut moves = Vec::with_capacity(5);

        for dir in Direction::ALL {
            let Some(next) = board.step(pos, dir, walls) else {
                continue;
            };

            if Some(next) != opponent {
                moves.push(next);
                continue;
            }

            // 相邻格是对手：优先直跳
            if let Some(jump) = board.step(next, dir, walls) {
                moves.push(jump);
                continue;
            }

            // 直跳越界或被挡：改为对手两侧的斜跳
            for side in dir.perpendicular() {
                if let Some(diagonal) = board.step(next, side, walls) {
                    if !moves.contains(&diagonal) {
                        moves.push(diagonal);
                    }
                }
            }
        }

        moves
    }

    /// 检查走法是否合法
    pub fn is_legal_move(
        board: &Board,
        from: Position,
        to: Position,
        walls: &[Wall],
        opponent: Option<Position>,
    ) -> bool {
        Self::legal_moves(board, from, walls, opponent).contains(&to)
    }
}
