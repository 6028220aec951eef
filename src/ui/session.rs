//! 命令行会话：单次查询与交互式循环
//!
//! 交互模式逐行读取查询，`quit` / `exit` / `q` 或取消（Ctrl-C）结束；单次运行失败只打印错误，循环继续。
//! 步数上限或取消导致的提前结束会输出部分结果并附带警告。

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::core::{CrewState, WorkflowError};
use crate::crew::{usage_since, Crew};
use crate::ui::render::{render_summary, render_usage};

const GOODBYE: &str = "Interrupted. Goodbye!";

/// 结果输出方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// 完整运行摘要
    #[default]
    Summary,
    /// 只输出最终内容
    DraftOnly,
    /// 状态序列化为 JSON
    Json,
}

/// 一次运行的渲染结果
#[derive(Debug)]
pub struct RunOutcome {
    pub output: String,
    /// 提前结束时的警告（步数上限 / 取消）
    pub warning: Option<String>,
    pub cancelled: bool,
}

impl RunOutcome {
    pub fn is_complete(&self) -> bool {
        self.warning.is_none()
    }
}

pub fn render_state(state: &CrewState, mode: OutputMode) -> anyhow::Result<String> {
    Ok(match mode {
        OutputMode::Summary => render_summary(state),
        OutputMode::DraftOnly => state.draft.clone(),
        OutputMode::Json => serde_json::to_string_pretty(state)?,
    })
}

/// 执行一次查询并渲染；提前结束时渲染部分状态。摘要模式附带本次 token 使用
pub async fn run_query(
    crew: &Crew,
    query: &str,
    mode: OutputMode,
    cancel_token: CancellationToken,
) -> anyhow::Result<RunOutcome> {
    let usage_before = crew.token_usage();
    let (state, warning, cancelled) = match crew.run_with_cancel(query, cancel_token).await {
        Ok(state) => (state, None, false),
        Err(err) => {
            let warning = err.to_string();
            let cancelled = matches!(err, WorkflowError::Cancelled { .. });
            (err.into_state(), Some(warning), cancelled)
        }
    };

    let mut output = render_state(&state, mode)?;
    if mode == OutputMode::Summary {
        if let Some(line) = render_usage(usage_since(usage_before, crew.token_usage())) {
            output.push('\n');
            output.push_str(&line);
        }
    }
    Ok(RunOutcome {
        output,
        warning,
        cancelled,
    })
}

fn is_exit_command(line: &str) -> bool {
    matches!(line.to_lowercase().as_str(), "quit" | "exit" | "q")
}

/// 交互式循环；返回完成的查询数
pub async fn interactive<R, W>(
    crew: &Crew,
    mode: OutputMode,
    reader: R,
    mut writer: W,
    cancel_token: CancellationToken,
) -> anyhow::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut completed = 0;

    writer
        .write_all(b"Multi-agent research & writing. Type 'quit' to exit.\n")
        .await?;
    loop {
        writer.write_all(b"\nQuery> ").await?;
        writer.flush().await?;

        // 在提示符处取消等同于退出
        let line = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                writer.write_all(format!("\n{}\n", GOODBYE).as_bytes()).await?;
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if is_exit_command(query) {
            break;
        }

        match run_query(crew, query, mode, cancel_token.clone()).await {
            Ok(outcome) => {
                if let Some(warning) = &outcome.warning {
                    writer
                        .write_all(format!("warning: {}\n", warning).as_bytes())
                        .await?;
                }
                writer.write_all(outcome.output.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                if outcome.cancelled {
                    writer.write_all(format!("{}\n", GOODBYE).as_bytes()).await?;
                    break;
                }
                if outcome.is_complete() {
                    completed += 1;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "query failed");
                writer.write_all(format!("error: {}\n", e).as_bytes()).await?;
            }
        }
    }
    writer.flush().await?;
    Ok(completed)
}
