use super::Config;

fn detect_system_locale() -> Option<String> {
    std::env::var("LANG")
        .or_else(|_| std::env::var("LC_MESSAGES"))
        .ok()
        .map(|lang| lang.trim().to_string())
        .filter(|lang| !lang.is_empty() && lang != "C" && lang != "POSIX")
}

/// Detect locale: `ADPACE_LANG` env -> config value -> system `LANG` -> `"en"`.
fn detect_locale(config_locale: &str) -> String {
    if let Ok(lang) = std::env::var("ADPACE_LANG") {
        let lang = lang.trim();
        if !lang.is_empty() {
            return normalise_locale(lang);
        }
    }

    if config_locale != "en" && !config_locale.is_empty() {
        return normalise_locale(config_locale);
    }

    if let Some(system_locale) = detect_system_locale() {
        return normalise_locale(&system_locale);
    }

    "en".into()
}

/// Map `"zh_TW.UTF-8"`, `"zh-tw"` and plain `"zh"` to the shipped
/// `"zh-TW"` catalog, `"en_US"` to `"en"`; anything else passes through.
fn normalise_locale(raw: &str) -> String {
    let base = raw.split('.').next().unwrap_or(raw);
    let lang = base
        .split(['_', '-'])
        .next()
        .unwrap_or(base)
        .to_lowercase();
    match lang.as_str() {
        "zh" => "zh-TW".into(),
        _ => lang,
    }
}

impl Config {
    /// Locale that user-facing text should render in.
    pub fn resolved_locale(&self) -> String {
        detect_locale(&self.locale)
    }

    /// Detect the locale and install it for `t!`.
    pub fn apply_locale(&self) -> String {
        let locale = self.resolved_locale();
        rust_i18n::set_locale(&locale);
        locale
    }
}
