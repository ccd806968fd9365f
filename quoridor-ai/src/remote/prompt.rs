//! 提示模板
//!
//! 把对局快照格式化成模型能读懂的文本，并约定返回的 JSON 格式。

use protocol::{Difficulty, GameSnapshot, MoveResolver, PlayerId, Position};

/// 提示模板
pub struct PromptTemplate;

impl PromptTemplate {
    /// 系统提示：规则与坐标约定
    pub fn system_prompt() -> &'static str {
        r#"你是一位步步为营（Quoridor）高手。你的任务是为指定玩家选择下一步动作。

规则提醒：
- 坐标 [r, c]，r 为行（0 在最上方），c 为列
- 每回合只能做一件事：移动棋子一格，或放置一块挡板
- 棋子不能穿过挡板；与对手相邻时可以跳过对手，正后方被挡住时才能斜跳
- 横挡板 (r, c) 隔开第 r-1 行与第 r 行，覆盖第 c、c+1 列
- 纵挡板 (r, c) 隔开第 c-1 列与第 c 列，覆盖第 r、r+1 行
- 挡板不能重叠、不能十字交叉，也不能把任何一方完全封死

请严格按照要求的 JSON 格式返回动作。"#
    }

    /// 格式化对局快照
    pub fn format_snapshot(snapshot: &GameSnapshot, me: PlayerId) -> String {
        let mut result = String::new();
        let size = snapshot.config.board_size;

        result.push_str(&format!("棋盘 {}×{}：\n", size, size));
        result.push_str(&Self::visualize_board(snapshot));
        result.push('\n');

        for player in &snapshot.players {
            let tag = if player.id == me { "（你）" } else { "" };
            result.push_str(&format!(
                "玩家 {}{}: 位置 [{}, {}]，目标行 {}，剩余挡板 {}\n",
                player.id.number(),
                tag,
                player.position.r,
                player.position.c,
                player.goal_row,
                player.walls_left
            ));
        }

        if snapshot.walls.is_empty() {
            result.push_str("挡板: 无\n");
        } else {
            result.push_str("挡板: ");
            let walls: Vec<String> = snapshot
                .walls
                .iter()
                .map(|w| w.placement().to_string())
                .collect();
            result.push_str(&walls.join(", "));
            result.push('\n');
        }

        result
    }

    /// 简单的字符棋盘，只画棋子
    fn visualize_board(snapshot: &GameSnapshot) -> String {
        let size = snapshot.config.board_size;
        let mut result = String::from("   ");
        for c in 0..size {
            result.push_str(&format!("{:>2}", c));
        }
        result.push('\n');

        for r in 0..size {
            result.push_str(&format!("{:>2} ", r));
            for c in 0..size {
                let pos = Position::new(r, c);
                let cell = snapshot
                    .players
                    .iter()
                    .find(|p| p.position == pos)
                    .map(|p| char::from(b'0' + p.id.number()))
                    .unwrap_or('.');
                result.push(' ');
                result.push(cell);
            }
            result.push('\n');
        }
        result
    }

    /// 生成走法请求提示
    pub fn suggestion_prompt(snapshot: &GameSnapshot, me: PlayerId, difficulty: Difficulty) -> String {
        let mut prompt = Self::format_snapshot(snapshot, me);
        let board = snapshot.board();
        let player = snapshot.player(me);
        let opponent = snapshot.player(me.opponent());

        let moves = MoveResolver::legal_moves(
            &board,
            player.position,
            &snapshot.walls,
            Some(opponent.position),
        );
        prompt.push_str("\n你可以移动到: ");
        if moves.is_empty() {
            prompt.push_str("无（只能放挡板或放弃本回合）");
        } else {
            let cells: Vec<String> = moves.iter().map(|p| format!("[{}, {}]", p.r, p.c)).collect();
            prompt.push_str(&cells.join(", "));
        }
        prompt.push('\n');

        let style = match difficulty {
            Difficulty::Easy => "以前进为主，很少放挡板",
            Difficulty::Medium => "对手领先时用挡板阻拦",
            Difficulty::Hard => "精确计算双方最短路径，只在收益明显时放挡板",
        };
        prompt.push_str(&format!("\n你是玩家 {}，风格：{}。\n", me.number(), style));

        prompt.push_str("返回格式（严格 JSON，三选一）:\n");
        prompt.push_str(r#"{"type": "move", "to": [r, c], "reason": "简短说明"}"#);
        prompt.push('\n');
        prompt.push_str(
            r#"{"type": "wall", "at": [r, c], "orientation": "h" 或 "v", "reason": "简短说明"}"#,
        );
        prompt.push('\n');
        prompt.push_str(r#"{"type": "pass", "reason": "简短说明"}"#);
        prompt.push_str("\n\n注意：\n");
        prompt.push_str(&format!(
            "- 坐标范围 0-{}；横挡板 r 取 1-{}、c 取 0-{}；纵挡板 r 取 0-{}、c 取 1-{}\n",
            snapshot.config.board_size - 1,
            snapshot.config.board_size - 1,
            snapshot.config.board_size - 2,
            snapshot.config.board_size - 2,
            snapshot.config.board_size - 1
        ));
        if player.walls_left == 0 {
            prompt.push_str("- 你已没有挡板\n");
        }
        prompt.push_str("- 只返回 JSON，不要其他文字\n");

        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{Action, GameConfig, WallPlacement};

    #[test]
    fn test_system_prompt() {
        let prompt = PromptTemplate::system_prompt();
        assert!(prompt.contains("Quoridor"));
        assert!(prompt.contains("JSON"));
    }

    #[test]
    fn test_format_snapshot() {
        let snapshot = GameSnapshot::with_start_column(GameConfig::default(), 4).apply_action(
            Action::PlaceWall {
                wall: WallPlacement::horizontal(3, 3),
            },
            PlayerId::One,
        );
        let formatted = PromptTemplate::format_snapshot(&snapshot, PlayerId::Two);

        assert!(formatted.contains("棋盘 9×9"));
        assert!(formatted.contains("玩家 2（你）"));
        assert!(formatted.contains("剩余挡板 9"));
        assert!(formatted.contains("H(3, 3)"));
    }

    #[test]
    fn test_suggestion_prompt_lists_moves() {
        let snapshot = GameSnapshot::with_start_column(GameConfig::default(), 4);
        let prompt = PromptTemplate::suggestion_prompt(&snapshot, PlayerId::One, Difficulty::Hard);

        assert!(prompt.contains("[7, 4]"));
        assert!(prompt.contains(r#""type": "wall""#));
        assert!(prompt.contains("你是玩家 1"));
    }
}
