//! Reel - 后期制作排期助手
//!
//! 入口：初始化日志、加载配置与项目快照，然后逐行读取指令并执行。

use std::time::Duration;

use anyhow::Context;
use chrono::{Days, Local, NaiveDate};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use reel::catalog::CatalogBuilder;
use reel::config::{load_config, AppConfig};
use reel::core::{EngineOptions, ProjectRegistry, ProjectSession};
use reel::interpreter::{execute, execute_and_save, AssistedInterpreter, PromptContext};
use reel::schedule::persistence::SnapshotFile;
use reel::schedule::{CalendarEvent, CalendarEventType, ScheduleState};
use reel::{llm, observability};

const DEMO_PROJECT: &str = "demo";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let config_path = std::env::args().nth(1).map(Into::into);
    let config = load_config(config_path).context("Failed to load configuration")?;
    let today = config
        .app
        .reference_date
        .unwrap_or_else(|| Local::now().date_naive());

    let snapshot_file = config.app.snapshot_path.as_ref().map(SnapshotFile::new);
    let (session, project_name) = load_session(&config, snapshot_file.as_ref(), today)?;
    let project_id = session.project_id().to_string();

    let registry = ProjectRegistry::new();
    registry
        .insert(session.with_options(EngineOptions::from(&config.engine)))
        .await;

    let interpreter = AssistedInterpreter::new(
        llm::create_client(&config.llm),
        Duration::from_secs(config.llm.timeouts.request),
    );
    info!(
        project = %project_id,
        today = %today,
        llm = interpreter.has_llm(),
        "Ready; type 'help' for commands"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "quit" | "exit") {
            break;
        }

        // 提示上下文在锁内收集，LLM 调用在锁外进行
        let Some(context) = registry
            .with_project(&project_id, |session| PromptContext {
                type_codes: session.type_codes(),
                episode_numbers: session
                    .state()
                    .episodes()
                    .iter()
                    .map(|e| e.number.clone())
                    .collect(),
                today,
            })
            .await
        else {
            warn!(project = %project_id, "Project is no longer loaded");
            break;
        };

        let intent = interpreter.interpret(input, &context).await;
        // 有快照文件时先落盘再回复；写入失败则丢弃本次修改
        let Some(reply) = registry
            .with_project(&project_id, |session| match snapshot_file.as_ref() {
                Some(file) => execute_and_save(session, &intent, today, file, &project_name),
                None => execute(session, &intent, today),
            })
            .await
        else {
            break;
        };
        print!("{reply}");
    }

    if let Some((prompt, completion, total)) = interpreter.token_usage() {
        info!(prompt, completion, total, "LLM token usage");
    }

    Ok(())
}

/// 有快照文件时从文件加载，否则生成演示项目
fn load_session(
    config: &AppConfig,
    snapshot_file: Option<&SnapshotFile>,
    today: NaiveDate,
) -> anyhow::Result<(ProjectSession, String)> {
    if let Some(file) = snapshot_file.filter(|f| f.exists()) {
        let snapshot = file.load()?;
        let name = snapshot.project.name.clone();
        info!(path = %file.path().display(), project = %snapshot.project.id, "Loaded snapshot");
        return Ok((snapshot.into_session()?, name));
    }

    let name = config
        .app
        .name
        .clone()
        .unwrap_or_else(|| "Demo Season".to_string());
    Ok((demo_session(today)?, name))
}

/// 三集演示排期，每集错开一周，另加一个全组假期
fn demo_session(today: NaiveDate) -> anyhow::Result<ProjectSession> {
    let catalog = CatalogBuilder::post_production(DEMO_PROJECT)
        .build()
        .context("Failed to build demo catalog")?;
    let mut state = ScheduleState::empty(DEMO_PROJECT);

    let first = today.checked_sub_days(Days::new(14)).unwrap_or(today);
    for (offset, number) in ["301", "302", "303"].into_iter().enumerate() {
        let start = first.checked_add_days(Days::new(offset as u64 * 7));
        state.provision_episode(&catalog, number, start, 4);
    }

    if let Some(start) = today.checked_add_days(Days::new(10)) {
        state.add_calendar_event(CalendarEvent {
            project_id: DEMO_PROJECT.to_string(),
            name: "Studio holiday".to_string(),
            event_type: CalendarEventType::Holiday,
            start_date: start,
            end_date: start.checked_add_days(Days::new(1)),
            affects_all: true,
        });
    }

    Ok(ProjectSession::new(catalog, state)?)
}
