//! 玩家定义

use serde::{Deserialize, Serialize};

use crate::board::Position;

/// 座位（玩家编号）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerId {
    /// 1 号玩家（先手，从最下方出发）
    One,
    /// 2 号玩家（后手，从最上方出发）
    Two,
}

impl PlayerId {
    /// 获取对手
    pub fn opponent(&self) -> PlayerId {
        match self {
            PlayerId::One => PlayerId::Two,
            PlayerId::Two => PlayerId::One,
        }
    }

    /// 数组索引
    pub fn index(&self) -> usize {
        match self {
            PlayerId::One => 0,
            PlayerId::Two => 1,
        }
    }

    /// 玩家编号（1 或 2）
    pub fn number(&self) -> u8 {
        match self {
            PlayerId::One => 1,
            PlayerId::Two => 2,
        }
    }

    /// 从玩家编号解析
    pub fn from_number(n: u8) -> Option<PlayerId> {
        match n {
            1 => Some(PlayerId::One),
            2 => Some(PlayerId::Two),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.number())
    }
}

/// 棋盘上的玩家
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    /// 棋子位置
    pub position: Position,
    /// 剩余挡板数
    pub walls_left: u8,
    /// 目标行
    pub goal_row: u8,
}

impl Player {
    /// 创建新玩家
    pub fn new(id: PlayerId, position: Position, walls_left: u8, goal_row: u8) -> Self {
        Self {
            id,
            position,
            walls_left,
            goal_row,
        }
    }

    /// 是否已到达目标行
    pub fn has_reached_goal(&self) -> bool {
        self.position.r == self.goal_row
    }
}
