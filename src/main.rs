//! AppForge 命令行入口
//!
//! 读取项目描述文件，运行六步生成流水线，打印事件并把产物导出到 `<output_dir>/<项目目录名>`；
//! 可选地在完成后应用一条细化指令。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use appforge::{
    config::{load_config, AppConfig},
    core::ProjectConfig,
    observability,
    workflow::{ChannelSink, Forge, ForgeBuilder, RefineStatus, WorkflowEvent},
};
use clap::Parser;

#[derive(Parser)]
#[command(name = "appforge")]
#[command(version, about = "Multi-agent web app generator")]
struct Cli {
    /// Project description file (TOML: name, description, theme, features)
    project: PathBuf,

    /// Extra config file layered over config/default.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Export root; overrides app.output_dir
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Refinement instruction applied after a successful run
    #[arg(long)]
    refine: Option<String>,

    /// Use the offline mock backend regardless of API keys
    #[arg(long)]
    mock: bool,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

fn print_event(event: &WorkflowEvent, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!("Failed to serialize event: {}", e),
        }
        return;
    }
    match event {
        WorkflowEvent::Log { entry } => println!(
            "[{}] {:>6} {:<5} {}",
            entry.timestamp,
            entry.agent_id,
            entry.kind.tag(),
            entry.message
        ),
        WorkflowEvent::Artifacts { files } => println!("  files: {}", files.names().join(", ")),
        WorkflowEvent::Error { message } => eprintln!("error: {}", message),
        _ => {}
    }
}

async fn run(cli: &Cli, cfg: &AppConfig, forge: &Forge, project: ProjectConfig) -> anyhow::Result<PathBuf> {
    forge
        .run_workflow(project)
        .await
        .context("Generation workflow failed")?;

    if let Some(instruction) = cli.refine.as_deref() {
        let outcome = forge.refine(instruction).await.context("Refinement rejected")?;
        if let RefineStatus::Failed(failure) = outcome.status {
            tracing::warn!("Refinement failed, exporting unrefined files: {}", failure);
        }
    }

    let root: &Path = cli.out.as_deref().unwrap_or(cfg.app.output_dir.as_path());
    forge.export(root).context("Export failed")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志：默认 info，可通过 RUST_LOG 覆盖
    observability::init();

    let cli = Cli::parse();
    let mut cfg = load_config(cli.config.clone()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });
    if cli.mock {
        cfg.llm.provider = "mock".to_string();
    }

    let project = ProjectConfig::from_toml_file(&cli.project)
        .with_context(|| format!("Failed to read project file {}", cli.project.display()))?;

    let (sink, mut events) = ChannelSink::new();
    let json = cli.json;
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            print_event(&event, json);
        }
    });

    let forge = ForgeBuilder::from_config(&cfg).sink(Arc::new(sink)).build();
    let outcome = run(&cli, &cfg, &forge, project).await;
    let (prompt_tokens, completion_tokens, total_tokens) = forge.token_usage();
    if total_tokens > 0 {
        tracing::info!(prompt_tokens, completion_tokens, total_tokens, "Token usage");
    }

    // 释放发送端，打印任务读完剩余事件后退出
    drop(forge);
    printer.await.context("Event printer panicked")?;

    let dir = outcome?;
    println!("Project written to {}", dir.display());
    Ok(())
}
