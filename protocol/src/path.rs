//! 寻路
//!
//! 广度优先搜索到目标行的最短路径。

use std::collections::VecDeque;

use crate::board::{Board, Direction, Position, Wall};
use crate::moves::MoveResolver;

/// 寻路模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathMode {
    /// 只考虑挡板，忽略所有棋子（用于“始终有路”规则）
    Topological,
    /// 挡板 + 一个可被跳过的障碍棋子（用于 AI 和走法回退）
    Tactical(Option<Position>),
}

/// 寻路器
pub struct PathFinder;

impl PathFinder {
    /// 查找从 `start` 到 `goal_row` 的最短路径
    ///
    /// 返回的路径包含起点，终点位于目标行；起点已在目标行时返回只含起点的路径。
    /// 同长度路径按邻居枚举顺序取最先发现的一条。
    pub fn find_path(
        board: &Board,
        start: Position,
        goal_row: u8,
        walls: &[Wall],
        mode: PathMode,
    ) -> Option<Vec<Position>> {
        if !board.contains(start) {
            return None;
        }
        if start.r == goal_row {
            return Some(vec![start]);
        }

        let size = board.size() as usize;
        let index = |p: Position| p.r as usize * size + p.c as usize;

        // parent[i] 记录前驱，visited 防止重复访问
        let mut parent: Vec<Option<Position>> = vec![None; size * size];
        let mut visited = vec![false; size * size];
        let mut queue = VecDeque::with_capacity(size * size);

        visited[index(start)] = true;
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            for next in Self::neighbors(board, current, walls, mode) {
                let i = index(next);
                if visited[i] {
                    continue;
                }
                visited[i] = true;
                parent[i] = Some(current);

                if next.r == goal_row {
                    return Some(Self::rebuild(next, &parent, index));
                }
                queue.push_back(next);
            }
        }

        None
    }

    /// 到目标行的步数
    pub fn distance(
        board: &Board,
        start: Position,
        goal_row: u8,
        walls: &[Wall],
        mode: PathMode,
    ) -> Option<usize> {
        Self::find_path(board, start, goal_row, walls, mode).map(|path| path.len() - 1)
    }

    /// 检查是否存在到目标行的路径（只看挡板）
    pub fn has_path(board: &Board, start: Position, goal_row: u8, walls: &[Wall]) -> bool {
        Self::find_path(board, start, goal_row, walls, PathMode::Topological).is_some()
    }

    fn neighbors(board: &Board, pos: Position, walls: &[Wall], mode: PathMode) -> Vec<Position> {
        match mode {
            PathMode::Topological => Direction::ALL
                .iter()
                .filter_map(|dir| board.step(pos, *dir, walls))
                .collect(),
            PathMode::Tactical(obstacle) => {
                MoveResolver::legal_moves(board, pos, walls, obstacle)
            }
        }
    }

    fn rebuild(
        end: Position,
        parent: &[Option<Position>],
        index: impl Fn(Position) -> usize,
    ) -> Vec<Position> {
        let mut path = vec![end];
        let mut current = end;
        while let Some(prev) = parent[index(current)] {
            path.push(prev);
            current = prev;
        }
        path.reverse();
        path
    }
}
