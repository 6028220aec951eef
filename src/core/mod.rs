//! 核心层：共享状态、错误类型、Crew 组装

pub mod builder;
pub mod error;
pub mod state;

pub use builder::{Credentials, CrewBuilder};
pub use error::{CapabilityError, SetupError, WorkflowError};
pub use state::{AgentRole, CrewState, HistoryEntry, NextStep, TaskKind};
