//! 游戏逻辑模块
//!
//! 回合控制器和 AI 驱动

mod ai;
mod state;

pub use ai::{AiDriver, AiTurn};
pub use state::{GameMode, Phase, TurnController, TurnError, AI_SEAT, HUMAN_SEAT};
