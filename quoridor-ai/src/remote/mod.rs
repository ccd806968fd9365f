//! 远程走法建议
//!
//! 通过 HTTP（Ollama 兼容接口）向远程模型请求走法建议。建议不可信，
//! 一律经过本地规则重新验证，失败时回退到确定性的本地策略。

mod client;
mod engine;
mod error;
mod parser;
mod prompt;

pub use client::{SuggestionClient, SuggestionConfig};
pub use engine::{
    resolve_suggestion, AiBackend, AiNotice, MoveSuggester, RemoteSuggester, ResolvedAction,
    Suggestion,
};
pub use error::SuggestionError;
pub use parser::{RemoteAction, SuggestionParser};
pub use prompt::PromptTemplate;
