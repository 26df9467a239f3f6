use crate::cli::commands::{Cli, Commands, PageArgs, SettingsCommands};
use adpace::bus::ContextId;
use adpace::classifier::{Verdict, classify};
use adpace::config::{Config, ConfigHandle};
use adpace::controller::{Status, StatusReport};
use adpace::coordinator::StatusEvent;
use adpace::observability::{self, Observer};
use adpace::page::{FilePage, PageHost, PageSnapshot, SimulatedPage};
use adpace::panel::render_status as render_page_status;
use adpace::runtime::{self, Runtime};
use adpace::settings::{JsonFileStore, MemoryStore, Settings, SettingsPatch, SettingsStore};
use anyhow::{Context, Result, bail};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use url::Url;

use crate::app::status::render_status;

const SIMULATED_NORMAL: &str = r#"<html><body>
    <div id="movie_player" class="html5-video-player"><video></video></div>
</body></html>"#;

const SIMULATED_AD: &str = r#"<html><body>
    <div id="movie_player" class="html5-video-player ad-showing">
        <video></video>
        <div class="ytp-ad-player-overlay"></div>
    </div>
</body></html>"#;

fn parse_url(raw: Option<&str>) -> Result<Option<Url>> {
    raw.map(|raw| Url::parse(raw).with_context(|| format!("invalid --url '{raw}'")))
        .transpose()
}

fn observer_for(config: &Config) -> Arc<dyn Observer> {
    Arc::from(observability::create_observer(&config.observability))
}

async fn start_runtime(config: &ConfigHandle, store: Arc<dyn SettingsStore>) -> Result<Runtime> {
    let observer = observer_for(&config.load());
    Runtime::start(config.clone(), store, observer).await
}

fn file_store(config: &Config) -> Arc<dyn SettingsStore> {
    Arc::new(JsonFileStore::new(config.settings_file()))
}

async fn run_classify(config: &Config, page: &PageArgs, json: bool) -> Result<()> {
    let html = tokio::fs::read_to_string(&page.html)
        .await
        .with_context(|| format!("failed to read {}", page.html.display()))?;
    let snapshot = PageSnapshot::new(parse_url(page.url.as_deref())?, html);
    let indicators = config.indicator_set()?;
    let verdict = classify(&snapshot, &indicators);

    if json {
        let value = serde_json::json!({
            "classification": verdict.classification,
            "adEvidence": verdict.ad_evidence,
            "musicEvidence": verdict.music_evidence,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print_verdict(&verdict);
    }
    Ok(())
}

fn rules(names: &[String]) -> String {
    if names.is_empty() {
        t!("classify.none").to_string()
    } else {
        names.join(", ")
    }
}

fn print_verdict(verdict: &Verdict) {
    println!(
        "{}",
        t!(
            "classify.result",
            classification = verdict.classification.to_string()
        )
    );
    println!(
        "{}",
        t!("classify.ad_evidence", rules = rules(&verdict.ad_evidence))
    );
    println!(
        "{}",
        t!(
            "classify.music_evidence",
            rules = rules(&verdict.music_evidence)
        )
    );
}

fn print_settings(settings: &Settings, config: &Config) {
    println!("◆ {}", t!("settings.title"));
    println!("   {}", t!("settings.ad_speed", value = settings.ad_speed));
    println!(
        "   {}",
        t!("settings.video_speed", value = settings.video_speed)
    );
    println!("   {}", t!("settings.enabled", value = settings.enabled));
    println!(
        "   {}",
        t!("settings.music", value = settings.auto_normal_speed_for_music)
    );
    println!(
        "   {}",
        t!(
            "settings.store",
            path = config.settings_file().display().to_string()
        )
    );
}

async fn run_settings(config: &ConfigHandle, command: SettingsCommands) -> Result<()> {
    let snapshot = config.load_full();
    let patch = match &command {
        SettingsCommands::Set {
            ad_speed,
            video_speed,
            enabled,
            music_normal_speed,
        } => {
            let patch = SettingsPatch {
                ad_speed: *ad_speed,
                video_speed: *video_speed,
                enabled: *enabled,
                auto_normal_speed_for_music: *music_normal_speed,
            };
            if patch.is_empty() {
                bail!("{}", t!("settings.nothing_to_set"));
            }
            Some(patch)
        }
        SettingsCommands::Show | SettingsCommands::Reset => None,
    };

    let runtime = start_runtime(config, file_store(&snapshot)).await?;
    let panel = runtime.panel(None);
    let result = match (command, patch) {
        (_, Some(patch)) => panel.update(&patch).await.inspect(|_| {
            println!("{}", t!("settings.saved"));
        }),
        (SettingsCommands::Reset, None) => panel.reset().await.inspect(|_| {
            println!("{}", t!("settings.reset"));
        }),
        _ => panel.load().await,
    };
    runtime.shutdown().await;

    let settings = result.context("settings request failed")?;
    print_settings(&settings, &snapshot);
    Ok(())
}

async fn run_watch(config: &ConfigHandle, page: &PageArgs, locale: &str) -> Result<()> {
    let snapshot = config.load_full();
    let host = FilePage::open(&page.html, parse_url(page.url.as_deref())?)
        .await
        .with_context(|| format!("failed to open {}", page.html.display()))?;

    let mut runtime = start_runtime(config, file_store(&snapshot)).await?;
    let mut events = runtime.subscribe_status();
    let id = runtime.open_page(Arc::clone(&host) as Arc<dyn PageHost>);
    let refresh = host.spawn_refresh(snapshot.watcher.file_refresh());
    let writer = runtime::spawn_state_writer(
        snapshot.state_file(),
        Duration::from_secs(snapshot.reliability.state_flush_secs),
    );

    println!(
        "◆ {}",
        t!("watch.started", path = host.path().display().to_string())
    );
    println!("   {}", t!("watch.stop_hint"));

    let mut liveness = tokio::time::interval(Duration::from_millis(500));
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                println!("{}", t!("watch.stopped"));
                break;
            }
            event = events.recv() => match event {
                Ok(event) => {
                    let report = StatusReport::from(event.status);
                    println!("[{}] {}", event.page, render_page_status(Some(&report), locale));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "status events skipped");
                }
                Err(RecvError::Closed) => break,
            },
            _ = liveness.tick() => {
                if runtime.page_finished(id) {
                    println!("{}", t!("watch.invalidated"));
                    break;
                }
            }
        }
    }

    refresh.abort();
    writer.abort();
    runtime.shutdown().await;
    runtime::write_state(&snapshot.state_file()).await?;
    Ok(())
}

async fn run_simulate(config: &ConfigHandle, locale: &str) -> Result<()> {
    let mut runtime = start_runtime(config, Arc::new(MemoryStore::new())).await?;
    let mut events = runtime.subscribe_status();
    let page = Arc::new(SimulatedPage::new(None, SIMULATED_NORMAL));
    let id = runtime.open_page(Arc::clone(&page) as Arc<dyn PageHost>);
    let panel = runtime.panel(Some(id));

    println!("◆ {}", t!("simulate.title"));
    let steps: [(&str, Option<&str>); 3] = [
        ("normal", None),
        ("ad", Some(SIMULATED_AD)),
        ("normal", Some(SIMULATED_NORMAL)),
    ];
    for (step, html) in steps {
        if let Some(html) = html {
            page.set_html(html);
        }
        let event = tokio::time::timeout(Duration::from_secs(5), next_page_event(&mut events, id))
            .await
            .with_context(|| format!("no status change after step '{step}'"))??;
        let report = StatusReport::from(event);
        println!(
            "{}",
            t!(
                "simulate.step",
                step = step,
                status = render_page_status(Some(&report), locale)
            )
        );
    }

    let report = panel.status().await.ok();
    println!("   {}", render_page_status(report.as_ref(), locale));
    println!("{}", t!("simulate.done"));
    runtime.shutdown().await;
    Ok(())
}

async fn next_page_event(
    events: &mut broadcast::Receiver<StatusEvent>,
    page: ContextId,
) -> Result<Status> {
    loop {
        match events.recv().await {
            Ok(event) if event.page == page => return Ok(event.status),
            Ok(_) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => bail!("status channel closed"),
        }
    }
}

pub async fn dispatch(cli: Cli, config: Config, locale: String) -> Result<()> {
    let handle = ConfigHandle::new(config);
    match cli.command {
        Commands::Classify { page, json } => run_classify(&handle.load(), &page, json).await,
        Commands::Settings { settings_command } => run_settings(&handle, settings_command).await,
        Commands::Watch { page } => run_watch(&handle, &page, &locale).await,
        Commands::Simulate => run_simulate(&handle, &locale).await,
        Commands::Status => {
            let config = handle.load_full();
            let state = runtime::read_state(&config.state_file())?;
            println!("{}", render_status(&config, state.as_ref(), &locale));
            Ok(())
        }
    }
}
