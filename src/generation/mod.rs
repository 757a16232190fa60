//! 生成层：响应清洗、响应 Schema、步骤人设表、生成客户端

pub mod client;
pub mod personas;
pub mod sanitize;
pub mod schema;

pub use client::{ClarificationRequest, GenerationClient, StepResult};
pub use personas::{descriptor, GenerationContext, StepDescriptor, StepGeneration, PIPELINE};
pub use sanitize::{sanitize, EMPTY_OBJECT};
pub use schema::{FilesPayload, QuestionProbe, ResponseSchema};
