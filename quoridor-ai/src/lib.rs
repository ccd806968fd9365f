//! 步步为营 AI 引擎
//!
//! 包含:
//! - 三档难度的本地启发式策略（最短路径 + 挡板打分）
//! - 远程走法建议服务（可选 `remote` feature），建议一律重新验证，失败时回退本地策略

mod remote;
mod strategy;

pub use remote::{
    resolve_suggestion, AiBackend, AiNotice, MoveSuggester, PromptTemplate, RemoteAction,
    RemoteSuggester, ResolvedAction, Suggestion, SuggestionClient, SuggestionConfig,
    SuggestionError, SuggestionParser,
};
pub use strategy::{choose_ai_action, local_fallback, AiConfig, AiDecision, AiEngine};

// 重导出 Difficulty 以便外部使用
pub use protocol::Difficulty;
