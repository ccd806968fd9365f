//! 棋盘几何
//!
//! 格子坐标 `(r, c)`，r 为行（0 在最上方），c 为列。挡板位于格子之间的槽位上：
//! - 横向挡板 `(r, c)` 隔开第 `r-1` 行与第 `r` 行，覆盖第 `c`、`c+1` 列；
//! - 纵向挡板 `(r, c)` 隔开第 `c-1` 列与第 `c` 列，覆盖第 `r`、`r+1` 行。

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_BOARD_SIZE;
use crate::player::PlayerId;

/// 棋盘位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// 行
    pub r: u8,
    /// 列
    pub c: u8,
}

impl Position {
    /// 创建新位置（不检查边界，边界由 [`Board`] 判断）
    pub const fn new(r: u8, c: u8) -> Self {
        Self { r, c }
    }

    /// 获取偏移后的位置（负坐标返回 None，上界由调用方检查）
    fn offset(&self, dr: i8, dc: i8) -> Option<Position> {
        let r = self.r as i16 + dr as i16;
        let c = self.c as i16 + dc as i16;
        if r < 0 || c < 0 || r > u8::MAX as i16 || c > u8::MAX as i16 {
            return None;
        }
        Some(Position::new(r as u8, c as u8))
    }

    /// 两格是否正交相邻
    pub fn is_adjacent(&self, other: &Position) -> bool {
        let dr = (self.r as i16 - other.r as i16).abs();
        let dc = (self.c as i16 - other.c as i16).abs();
        dr + dc == 1
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.r, self.c)
    }
}

/// 移动方向，顺序即邻居枚举顺序：上、下、左、右
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// 固定的枚举顺序
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// 行列增量
    pub fn delta(&self) -> (i8, i8) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    /// 垂直方向（先小后大）
    pub fn perpendicular(&self) -> [Direction; 2] {
        match self {
            Direction::Up | Direction::Down => [Direction::Left, Direction::Right],
            Direction::Left | Direction::Right => [Direction::Up, Direction::Down],
        }
    }
}

/// 挡板方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// 未指定归属的挡板（落子请求）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WallPlacement {
    pub r: u8,
    pub c: u8,
    pub orientation: Orientation,
}

impl WallPlacement {
    pub const fn new(r: u8, c: u8, orientation: Orientation) -> Self {
        Self { r, c, orientation }
    }

    pub const fn horizontal(r: u8, c: u8) -> Self {
        Self::new(r, c, Orientation::Horizontal)
    }

    pub const fn vertical(r: u8, c: u8) -> Self {
        Self::new(r, c, Orientation::Vertical)
    }

    /// 指定归属
    pub fn with_owner(self, owner: PlayerId) -> Wall {
        Wall {
            r: self.r,
            c: self.c,
            orientation: self.orientation,
            owner,
        }
    }

    /// 该挡板是否阻断两个正交相邻格子之间的移动
    pub fn blocks(&self, a: Position, b: Position) -> bool {
        if a.c == b.c && a.r.abs_diff(b.r) == 1 {
            // 纵向移动只会被横向挡板阻断
            let lower = a.r.max(b.r);
            self.orientation == Orientation::Horizontal
                && self.r == lower
                && (self.c == a.c || self.c + 1 == a.c)
        } else if a.r == b.r && a.c.abs_diff(b.c) == 1 {
            let right = a.c.max(b.c);
            self.orientation == Orientation::Vertical
                && self.c == right
                && (self.r == a.r || self.r + 1 == a.r)
        } else {
            false
        }
    }
}

impl std::fmt::Display for WallPlacement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let o = match self.orientation {
            Orientation::Horizontal => 'H',
            Orientation::Vertical => 'V',
        };
        write!(f, "{}({}, {})", o, self.r, self.c)
    }
}

/// 已放置的挡板
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Wall {
    pub r: u8,
    pub c: u8,
    pub orientation: Orientation,
    pub owner: PlayerId,
}

impl Wall {
    /// 去掉归属信息
    pub fn placement(&self) -> WallPlacement {
        WallPlacement::new(self.r, self.c, self.orientation)
    }

    pub fn blocks(&self, a: Position, b: Position) -> bool {
        self.placement().blocks(a, b)
    }
}

/// 棋盘（N×N）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    size: u8,
}

impl Board {
    /// 创建指定边长的棋盘
    pub const fn new(size: u8) -> Self {
        Self { size }
    }

    /// 棋盘边长
    pub fn size(&self) -> u8 {
        self.size
    }

    /// 检查位置是否在棋盘内
    pub fn contains(&self, pos: Position) -> bool {
        pos.r < self.size && pos.c < self.size
    }

    /// 指定方向上的相邻格子（越界返回 None，不考虑挡板）
    pub fn neighbor(&self, pos: Position, dir: Direction) -> Option<Position> {
        let (dr, dc) = dir.delta();
        pos.offset(dr, dc).filter(|p| self.contains(*p))
    }

    /// 两个正交相邻格子之间是否被挡板阻断
    pub fn is_blocked(&self, a: Position, b: Position, walls: &[Wall]) -> bool {
        walls.iter().any(|w| w.blocks(a, b))
    }

    /// 指定方向上可直接到达的相邻格子（在棋盘内且未被挡板阻断）
    pub fn step(&self, pos: Position, dir: Direction, walls: &[Wall]) -> Option<Position> {
        self.neighbor(pos, dir)
            .filter(|next| !self.is_blocked(pos, *next, walls))
    }

    /// 挡板是否位于棋盘内部的合法槽位上
    pub fn wall_in_bounds(&self, wall: &WallPlacement) -> bool {
        let last = self.size.saturating_sub(1);
        let inner = self.size.saturating_sub(2);
        match wall.orientation {
            Orientation::Horizontal => wall.c <= inner && (1..=last).contains(&wall.r),
            Orientation::Vertical => wall.r <= inner && (1..=last).contains(&wall.c),
        }
    }

    /// 中间列
    pub fn center_column(&self) -> u8 {
        self.size / 2
    }

    /// 最后一行
    pub fn last_row(&self) -> u8 {
        self.size.saturating_sub(1)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new(DEFAULT_BOARD_SIZE)
    }
}
