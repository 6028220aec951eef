//! 命令行界面：结果渲染（render）与会话（session）

pub mod render;
pub mod session;

pub use render::{render_event, render_summary, render_usage, strip_source_prefix};
pub use session::{interactive, render_state, run_query, OutputMode, RunOutcome};
