//! 本地策略
//!
//! 先用战术寻路（对方棋子视为可跳过的障碍）算出双方最短路径，再按难度决定走棋还是放挡板：
//! - 简单：沿最短路径走一步
//! - 中等：对手严格领先时，尝试挡住对手路径的第一步
//! - 困难：枚举对手路径前几步的候选挡板并打分，择优放置

use std::time::Duration;

use protocol::{
    Action, Board, Difficulty, GameSnapshot, MoveResolver, PathFinder, PathMode, Player, PlayerId,
    Position, Wall, WallPlacement, WallValidator,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// AI 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub difficulty: Difficulty,
    /// 考察对手路径的前几步
    pub max_edges: usize,
    /// 每一步最多尝试的挡板数（主槽位 + 平移一格）
    pub candidates_per_edge: usize,
    /// 领先时放挡板所需的最低得分
    pub winning_threshold: i32,
    /// 模拟思考时间（毫秒），只影响节奏
    pub think_delay_ms: u64,
}

impl AiConfig {
    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Self {
                difficulty,
                max_edges: 0,
                candidates_per_edge: 0,
                winning_threshold: 3,
                think_delay_ms: 300,
            },
            Difficulty::Medium => Self {
                difficulty,
                max_edges: 1,
                candidates_per_edge: 2,
                winning_threshold: 3,
                think_delay_ms: 500,
            },
            Difficulty::Hard => Self {
                difficulty,
                max_edges: 4,
                candidates_per_edge: 2,
                winning_threshold: 3,
                think_delay_ms: 800,
            },
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self::from_difficulty(Difficulty::Medium)
    }
}

/// AI 决策：动作 + 给界面看的简短理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiDecision {
    pub action: Action,
    pub rationale: String,
}

impl AiDecision {
    fn new(action: Action, rationale: impl Into<String>) -> Self {
        Self {
            action,
            rationale: rationale.into(),
        }
    }
}

/// AI 引擎
pub struct AiEngine {
    config: AiConfig,
}

impl AiEngine {
    /// 创建新的 AI 引擎
    pub fn new(config: AiConfig) -> Self {
        Self { config }
    }

    /// 从难度创建
    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        Self::new(AiConfig::from_difficulty(difficulty))
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    /// 思考延迟
    pub fn think_delay(&self) -> Duration {
        Duration::from_millis(self.config.think_delay_ms)
    }

    /// 为快照中的 `me` 选择动作
    pub fn choose(&self, snapshot: &GameSnapshot, me: PlayerId) -> AiDecision {
        self.decide(
            &snapshot.board(),
            snapshot.player(me),
            snapshot.player(me.opponent()),
            &snapshot.walls,
        )
    }

    /// 选择动作
    pub fn decide(&self, board: &Board, me: &Player, opponent: &Player, walls: &[Wall]) -> AiDecision {
        let my_path = tactical_path(board, me, opponent.position, walls);
        let fallback = candidate_move(board, me, opponent, walls, my_path.as_deref());

        let wall = match self.config.difficulty {
            Difficulty::Easy => None,
            Difficulty::Medium => self.medium_wall(board, me, opponent, walls),
            Difficulty::Hard => self.hard_wall(board, me, opponent, walls),
        };

        let decision = wall.unwrap_or(fallback);
        debug!(
            "AI {} ({:?}) chose {}: {}",
            me.id, self.config.difficulty, decision.action, decision.rationale
        );
        decision
    }

    /// 中等：对手严格领先时挡住其路径第一步，取第一块合法挡板
    fn medium_wall(
        &self,
        board: &Board,
        me: &Player,
        opponent: &Player,
        walls: &[Wall],
    ) -> Option<AiDecision> {
        if me.walls_left == 0 {
            return None;
        }
        let my_len = tactical_path(board, me, opponent.position, walls)?.len() - 1;
        let opp_path = tactical_path(board, opponent, me.position, walls)?;
        let opp_len = opp_path.len() - 1;
        if opp_len >= my_len {
            return None;
        }

        let players = [*me, *opponent];
        for (a, b) in edges(&opp_path).take(self.config.max_edges) {
            for placement in blocking_walls(board, a, b)
                .into_iter()
                .take(self.config.candidates_per_edge)
            {
                let wall = placement.with_owner(me.id);
                if WallValidator::is_legal_placement(board, &wall, walls, &players) {
                    return Some(AiDecision::new(
                        Action::PlaceWall { wall: placement },
                        format!("对手领先 {} 步，挡住它的下一步", my_len - opp_len),
                    ));
                }
            }
        }
        None
    }

    /// 困难：对候选挡板打分
    ///
    /// 得分 = 对手路径增加量 − 自己路径增加量。落后或持平时得分为正就放，
    /// 领先时得分达到阈值才放。
    fn hard_wall(
        &self,
        board: &Board,
        me: &Player,
        opponent: &Player,
        walls: &[Wall],
    ) -> Option<AiDecision> {
        if me.walls_left == 0 {
            return None;
        }
        let my_len = tactical_path(board, me, opponent.position, walls)?.len() - 1;
        let opp_path = tactical_path(board, opponent, me.position, walls)?;
        let opp_len = opp_path.len() - 1;

        let players = [*me, *opponent];
        let mut best: Option<(WallPlacement, i32)> = None;

        for (a, b) in edges(&opp_path).take(self.config.max_edges) {
            for placement in blocking_walls(board, a, b)
                .into_iter()
                .take(self.config.candidates_per_edge)
            {
                let wall = placement.with_owner(me.id);
                if !WallValidator::is_legal_placement(board, &wall, walls, &players) {
                    continue;
                }

                let Some(score) = score_wall(board, me, opponent, walls, wall, (my_len, opp_len))
                else {
                    continue;
                };
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((placement, score));
                }
            }
        }

        let (placement, score) = best?;
        let losing = my_len >= opp_len;
        let commit = if losing {
            score > 0
        } else {
            score >= self.config.winning_threshold
        };
        if !commit {
            debug!(
                "Best wall {} scored {} (self {}, opp {}), keep moving",
                placement, score, my_len, opp_len
            );
            return None;
        }

        let rationale = if losing {
            format!("落后 {} 步，放挡板拉开 {} 步", my_len - opp_len, score)
        } else {
            format!("领先时的关键封堵，净赚 {} 步", score)
        };
        Some(AiDecision::new(Action::PlaceWall { wall: placement }, rationale))
    }
}

/// 选择动作（对外接口）
pub fn choose_ai_action(
    board: &Board,
    me: &Player,
    opponent: &Player,
    walls: &[Wall],
    difficulty: Difficulty,
) -> AiDecision {
    AiEngine::from_difficulty(difficulty).decide(board, me, opponent, walls)
}

/// 确定性的本地回退：最短路径第一步，否则第一个合法走法，否则放弃回合
pub fn local_fallback(board: &Board, me: &Player, opponent: &Player, walls: &[Wall]) -> AiDecision {
    let my_path = tactical_path(board, me, opponent.position, walls);
    candidate_move(board, me, opponent, walls, my_path.as_deref())
}

fn candidate_move(
    board: &Board,
    me: &Player,
    opponent: &Player,
    walls: &[Wall],
    my_path: Option<&[Position]>,
) -> AiDecision {
    if let Some(path) = my_path {
        if let Some(next) = path.get(1) {
            return AiDecision::new(
                Action::Move { to: *next },
                format!("沿最短路径前进，还剩 {} 步", path.len() - 1),
            );
        }
    }

    let moves = MoveResolver::legal_moves(board, me.position, walls, Some(opponent.position));
    match moves.first() {
        Some(first) => AiDecision::new(
            Action::Move { to: *first },
            format!("暂时没有通路，先走到 {}", first),
        ),
        None => AiDecision::new(Action::Pass, "无路可走，放弃本回合"),
    }
}

fn tactical_path(
    board: &Board,
    player: &Player,
    obstacle: Position,
    walls: &[Wall],
) -> Option<Vec<Position>> {
    PathFinder::find_path(
        board,
        player.position,
        player.goal_row,
        walls,
        PathMode::Tactical(Some(obstacle)),
    )
}

/// 候选挡板得分：对手路径增加量 − 自己路径增加量
///
/// 放下后自己没有战术路径的挡板返回 None。`baseline` 为放置前的 (自己, 对手) 路径长度。
fn score_wall(
    board: &Board,
    me: &Player,
    opponent: &Player,
    walls: &[Wall],
    wall: Wall,
    baseline: (usize, usize),
) -> Option<i32> {
    let mut hypothetical = Vec::with_capacity(walls.len() + 1);
    hypothetical.extend_from_slice(walls);
    hypothetical.push(wall);

    let new_self = PathFinder::distance(
        board,
        me.position,
        me.goal_row,
        &hypothetical,
        PathMode::Tactical(Some(opponent.position)),
    )?;
    let new_opp = route_len(board, opponent, me.position, &hypothetical)?;

    let (my_len, opp_len) = baseline;
    Some((new_opp as i32 - opp_len as i32) - (new_self as i32 - my_len as i32))
}

/// 对手路径长度：优先战术路径，被棋子暂时堵住时退回拓扑路径
fn route_len(board: &Board, player: &Player, obstacle: Position, walls: &[Wall]) -> Option<usize> {
    PathFinder::distance(
        board,
        player.position,
        player.goal_row,
        walls,
        PathMode::Tactical(Some(obstacle)),
    )
    .or_else(|| {
        PathFinder::distance(
            board,
            player.position,
            player.goal_row,
            walls,
            PathMode::Topological,
        )
    })
}

fn edges(path: &[Position]) -> impl Iterator<Item = (Position, Position)> + '_ {
    path.windows(2).map(|w| (w[0], w[1]))
}

/// 横穿一步移动的挡板：先主槽位，再平移一格
///
/// 跳跃产生的边不生成候选。
fn blocking_walls(board: &Board, a: Position, b: Position) -> Vec<WallPlacement> {
    let mut candidates = Vec::with_capacity(2);

    if a.c == b.c && a.r.abs_diff(b.r) == 1 {
        let r = a.r.max(b.r);
        candidates.push(WallPlacement::horizontal(r, a.c));
        if a.c > 0 {
            candidates.push(WallPlacement::horizontal(r, a.c - 1));
        }
    } else if a.r == b.r && a.c.abs_diff(b.c) == 1 {
        let c = a.c.max(b.c);
        candidates.push(WallPlacement::vertical(a.r, c));
        if a.r > 0 {
            candidates.push(WallPlacement::vertical(a.r - 1, c));
        }
    }

    candidates.retain(|w| board.wall_in_bounds(w));
    candidates
}
