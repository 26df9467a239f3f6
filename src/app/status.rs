use adpace::config::Config;
use adpace::runtime::RuntimeState;

pub fn render_status(config: &Config, state: Option<&RuntimeState>, locale: &str) -> String {
    let mut lines = vec![
        format!("◆ {}", t!("status.title")),
        String::new(),
        format!("{}       {}", t!("status.version"), env!("CARGO_PKG_VERSION")),
        format!("{}        {}", t!("status.config"), config.config_path.display()),
        format!(
            "{}      {}",
            t!("status.settings"),
            config.settings_file().display()
        ),
        format!(
            "{}    {}",
            t!("status.state_file"),
            config.state_file().display()
        ),
        format!("{}        {locale}", t!("status.locale")),
        format!(
            "{} {}ms",
            t!("status.poll"),
            config.watcher.poll_interval_ms
        ),
        format!(
            "{} {}",
            t!("status.observability"),
            config.observability.backend
        ),
        String::new(),
    ];

    let Some(state) = state else {
        lines.push(format!("  {}", t!("status.no_state")));
        return lines.join("\n");
    };

    lines.push(format!(
        "{} (pid {}, {})",
        t!("status.components"),
        state.health.pid,
        t!("status.written", written_at = state.written_at.as_str())
    ));
    for (name, component) in &state.health.components {
        let mut line = format!(
            "  {name:<12} {:<8} restarts={} errors={}",
            component.status, component.restart_count, component.error_count
        );
        if let Some(detail) = &component.detail {
            line.push_str(&format!(" [{detail}]"));
        }
        if let Some(error) = &component.last_error {
            line.push_str(&format!("  last error: {error}"));
        }
        lines.push(line);
    }
    lines.join("\n")
}
