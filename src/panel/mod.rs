//! Settings panel client.
//!
//! Short-lived context that reads and edits the settings record through the
//! coordinator and asks the active page for its status. A page that does not
//! answer PING within the retry budget is reported as not ready instead of
//! leaving the caller waiting.

use crate::bus::{BusClient, ContextId, Hub, Message, RetryPolicy};
use crate::classifier::Classification;
use crate::controller::StatusReport;
use crate::error::PanelError;
use crate::settings::{Settings, SettingsPatch};
use std::time::Duration;

pub struct Panel {
    client: BusClient,
    target: Option<ContextId>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl Panel {
    /// Panel bound to the active page `target`, if any.
    pub fn new(hub: Hub, target: Option<ContextId>) -> Self {
        Self {
            client: BusClient::new(ContextId::Panel, hub),
            target,
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(2),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn target(&self) -> Option<ContextId> {
        self.target
    }

    pub async fn load(&self) -> Result<Settings, PanelError> {
        let response = self
            .client
            .request_with_timeout(ContextId::Background, Message::GetSettings, self.timeout)
            .await?
            .into_result("background")?;
        Ok(response.settings.unwrap_or_default().sanitized())
    }

    /// Merge `patch` over the stored record and save the result.
    pub async fn update(&self, patch: &SettingsPatch) -> Result<Settings, PanelError> {
        let current = self.load().await?;
        let updated = patch.apply_to(current);
        self.save(updated).await?;
        Ok(updated)
    }

    pub async fn reset(&self) -> Result<Settings, PanelError> {
        let defaults = Settings::default();
        self.save(defaults).await?;
        Ok(defaults)
    }

    /// Status of the active page, after making sure it is listening.
    pub async fn status(&self) -> Result<StatusReport, PanelError> {
        let target = self.target.ok_or(PanelError::NoActivePage)?;
        if let Err(error) = self.client.wait_until_ready(target, self.retry).await {
            tracing::debug!(%target, %error, "page observer not ready");
            return Err(PanelError::NotReady);
        }
        let response = self
            .client
            .request_with_timeout(target, Message::GetAdStatus, self.timeout)
            .await?
            .into_result(&target.to_string())?;
        Ok(response.status.unwrap_or_else(|| {
            StatusReport::from(crate::controller::Status::unknown())
        }))
    }

    async fn save(&self, settings: Settings) -> Result<(), PanelError> {
        self.client
            .request_with_timeout(
                ContextId::Background,
                Message::UpdateSettings(settings),
                self.timeout,
            )
            .await?
            .into_result("background")?;
        tracing::debug!(
            ad_speed = settings.ad_speed,
            video_speed = settings.video_speed,
            enabled = settings.enabled,
            "panel saved settings"
        );
        Ok(())
    }
}

/// Localized one-line status, as the popup shows it.
///
/// `None` means the page could not be asked.
pub fn render_status(report: Option<&StatusReport>, locale: &str) -> String {
    let Some(report) = report else {
        return t!("panel.unavailable", locale = locale).to_string();
    };
    let label = match report.classification {
        Classification::Ad => t!("panel.ad", locale = locale),
        Classification::Music => t!("panel.music", locale = locale),
        Classification::Normal => t!("panel.normal", locale = locale),
        Classification::Unknown => t!("panel.unknown", locale = locale),
    };
    match report.current_speed {
        Some(speed) => t!(
            "panel.with_speed",
            locale = locale,
            label = label,
            speed = format!("{speed:.1}")
        )
        .to_string(),
        None => t!("panel.untouched", locale = locale, label = label).to_string(),
    }
}
