pub mod artifact;
pub mod citation;
pub mod message;
pub mod moderation;
pub mod response;
pub mod tool;
pub mod usage;

pub use artifact::Artifact;
pub use citation::{Citation, MessagePartWithCitations};
pub use message::{AssistantMessage, Message, ToolResultMessage};
pub use moderation::{ModerationResponse, ModerationResult};
pub use response::{Response, Step};
pub use tool::{FunctionDefinition, ProviderToolCall, Tool, ToolCall, ToolOutput, ToolResult};
pub use usage::{FinishReason, Meta, Usage};
