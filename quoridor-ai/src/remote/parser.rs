//! 建议解析器
//!
//! 解析模型返回的 JSON 动作，并用本地规则验证其合法性。

use protocol::{Action, GameSnapshot, Orientation, PlayerId, Position, WallPlacement};
use serde::Deserialize;
use tracing::{debug, warn};

use super::engine::Suggestion;
use super::SuggestionError;

/// 模型返回的动作格式
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RemoteAction {
    Move {
        to: [u8; 2],
        #[serde(default)]
        reason: Option<String>,
    },
    Wall {
        at: [u8; 2],
        orientation: String,
        #[serde(default)]
        reason: Option<String>,
    },
    Pass {
        #[serde(default)]
        reason: Option<String>,
    },
}

impl RemoteAction {
    fn reason(&self) -> Option<&str> {
        match self {
            RemoteAction::Move { reason, .. }
            | RemoteAction::Wall { reason, .. }
            | RemoteAction::Pass { reason } => reason.as_deref(),
        }
    }
}

/// 建议解析器
pub struct SuggestionParser;

impl SuggestionParser {
    /// 从模型输出中解析动作
    pub fn parse_response(response: &str) -> Result<RemoteAction, SuggestionError> {
        if let Ok(action) = serde_json::from_str::<RemoteAction>(response) {
            return Ok(action);
        }

        let json = Self::extract_json(response)
            .ok_or_else(|| SuggestionError::Invalid("No JSON object found in response".to_string()))?;
        serde_json::from_str(&json)
            .map_err(|e| SuggestionError::Invalid(format!("Failed to parse extracted JSON: {}", e)))
    }

    /// 从文本中提取第一个 JSON 对象，被截断时尝试补全括号
    fn extract_json(text: &str) -> Option<String> {
        let start = text.find('{')?;

        let mut depth = 0i32;
        let mut bracket_depth = 0i32;
        let mut in_string = false;
        let mut escaped = false;

        for (i, ch) in text[start..].char_indices() {
            if in_string {
                match ch {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    '"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match ch {
                '"' => in_string = true,
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(text[start..start + i + 1].to_string());
                    }
                }
                '[' => bracket_depth += 1,
                ']' => bracket_depth -= 1,
                _ => {}
            }
        }

        if depth <= 0 {
            return None;
        }

        // 输出被截断：去掉末尾不完整的字段后补全括号
        let mut json = text[start..].trim_end().to_string();
        if in_string {
            if let Some(comma) = json.rfind(',') {
                json.truncate(comma);
            } else {
                json.push('"');
            }
        }
        while json.ends_with(',') || json.ends_with(':') {
            json.pop();
        }
        for _ in 0..bracket_depth.max(0) {
            json.push(']');
        }
        for _ in 0..depth {
            json.push('}');
        }

        debug!("Fixed truncated JSON: {}", json);
        Some(json)
    }

    /// 转换为游戏动作
    pub fn to_action(remote: &RemoteAction) -> Result<Action, SuggestionError> {
        match remote {
            RemoteAction::Move { to, .. } => Ok(Action::Move {
                to: Position::new(to[0], to[1]),
            }),
            RemoteAction::Wall { at, orientation, .. } => {
                let orientation = Self::parse_orientation(orientation)?;
                Ok(Action::PlaceWall {
                    wall: WallPlacement::new(at[0], at[1], orientation),
                })
            }
            RemoteAction::Pass { .. } => Ok(Action::Pass),
        }
    }

    fn parse_orientation(text: &str) -> Result<Orientation, SuggestionError> {
        match text.trim().to_lowercase().as_str() {
            "h" | "horizontal" | "横" => Ok(Orientation::Horizontal),
            "v" | "vertical" | "纵" | "竖" => Ok(Orientation::Vertical),
            other => Err(SuggestionError::Invalid(format!(
                "Unknown wall orientation: {}",
                other
            ))),
        }
    }

    /// 验证动作对 `me` 是否合法
    pub fn validate(action: Action, snapshot: &GameSnapshot, me: PlayerId) -> Result<(), SuggestionError> {
        if action == Action::Timeout {
            return Err(SuggestionError::Invalid("Timeout is not a move".to_string()));
        }

        snapshot.try_apply(action, me).map(|_| ()).map_err(|e| {
            warn!("Remote suggested illegal action {}: {}", action, e);
            SuggestionError::Invalid(e.to_string())
        })
    }

    /// 修复常见的模型输出问题
    pub fn try_fix_response(response: &str) -> String {
        let mut fixed = response.to_string();

        // 推理模型的 <think>...</think>
        if let Some(think_end) = fixed.find("</think>") {
            fixed = fixed[think_end + "</think>".len()..].to_string();
        }

        fixed = fixed.replace("```json", "").replace("```", "");
        fixed = fixed.replace('\'', "\"");

        let lines: Vec<&str> = fixed
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect();
        lines.join("\n").trim().to_string()
    }

    /// 解析并验证
    pub fn parse_and_validate(
        response: &str,
        snapshot: &GameSnapshot,
        me: PlayerId,
    ) -> Result<Suggestion, SuggestionError> {
        let remote = Self::parse_response(response)?;
        debug!("Parsed remote action: {:?}", remote);

        let action = Self::to_action(&remote)?;
        Self::validate(action, snapshot, me)?;

        Ok(Suggestion {
            action,
            rationale: remote.reason().unwrap_or("远程建议").to_string(),
        })
    }

    /// 先修复再解析，失败时再试原始内容
    pub fn parse_with_fix(
        response: &str,
        snapshot: &GameSnapshot,
        me: PlayerId,
    ) -> Result<Suggestion, SuggestionError> {
        let fixed = Self::try_fix_response(response);
        if let Ok(suggestion) = Self::parse_and_validate(&fixed, snapshot, me) {
            return Ok(suggestion);
        }
        Self::parse_and_validate(response, snapshot, me)
    }
}
