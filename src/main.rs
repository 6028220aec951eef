//! Hive - 多角色研究写作智能体
//!
//! 入口：解析参数、初始化日志、加载配置与凭证、组装 Crew，然后执行单次查询或进入交互模式。

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use hive::{
    config::load_config,
    core::{Credentials, CrewBuilder},
    observability,
    ui::{self, OutputMode},
};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "hive")]
#[command(about = "Coordinator / researcher / writer crew for research and writing tasks")]
struct Args {
    /// Query to run; omit to start interactive mode
    query: Option<String>,

    /// Read queries from stdin until quit
    #[arg(short, long)]
    interactive: bool,

    /// Hide step-by-step progress
    #[arg(short, long)]
    quiet: bool,

    /// Print only the final content
    #[arg(long, conflicts_with = "json")]
    no_summary: bool,

    /// Print the final state as JSON
    #[arg(long)]
    json: bool,

    /// Run offline with mock model and search
    #[arg(long)]
    mock: bool,

    /// Extra config file layered over config/default.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the workflow step ceiling
    #[arg(long)]
    max_steps: Option<usize>,
}

impl Args {
    fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else if self.no_summary {
            OutputMode::DraftOnly
        } else {
            OutputMode::Summary
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 日志：默认 info（quiet / json 时为 warn），可通过 RUST_LOG 覆盖
    let quiet = args.quiet || args.json;
    observability::init(if quiet { "warn" } else { "info" });

    let mut cfg = load_config(args.config.clone()).context("Failed to load config")?;
    if let Some(max_steps) = args.max_steps {
        cfg.workflow.max_steps = max_steps;
    }

    let credentials = Credentials::resolve(&cfg);
    if !args.mock {
        let missing = credentials.missing(&cfg);
        if !missing.is_empty() {
            eprintln!("Missing credentials: {}", missing.join(", "));
            eprintln!("Set them in the environment or config file, or run with --mock.");
            std::process::exit(2);
        }
    }

    let mut builder = CrewBuilder::new(cfg)
        .with_credentials(credentials)
        .offline(args.mock);

    // 进度事件：非 quiet 时逐行打印到 stderr
    let printer = if quiet {
        None
    } else {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        builder = builder.with_event_tx(tx);
        Some(tokio::spawn(async move {
            while let Some(ev) = rx.recv().await {
                eprintln!("{}", ui::render_event(&ev));
            }
        }))
    };

    let crew = builder.build().context("Failed to assemble crew")?;

    // 第一次 Ctrl-C 取消（两步之间生效，提示符处直接退出）；再次 Ctrl-C 立即退出
    let cancel_token = CancellationToken::new();
    {
        let token = cancel_token.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if token.is_cancelled() {
                    eprintln!("\nInterrupted. Goodbye!");
                    std::process::exit(130);
                }
                tracing::warn!("interrupt received, stopping after current step");
                token.cancel();
            }
        });
    }

    let mode = args.output_mode();
    let single = args
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty() && !args.interactive);

    let exit_code = match single {
        Some(query) => {
            let outcome = ui::run_query(&crew, query, mode, cancel_token).await?;
            // 先让进度行全部输出，再打印结果
            drop(crew);
            if let Some(handle) = printer {
                let _ = handle.await;
            }
            if let Some(warning) = &outcome.warning {
                eprintln!("warning: {}", warning);
            }
            println!("{}", outcome.output);
            if outcome.is_complete() {
                0
            } else {
                1
            }
        }
        None => {
            let stdin = BufReader::new(tokio::io::stdin());
            ui::interactive(&crew, mode, stdin, tokio::io::stdout(), cancel_token)
                .await
                .context("Interactive session failed")?;
            0
        }
    };

    std::process::exit(exit_code);
}
