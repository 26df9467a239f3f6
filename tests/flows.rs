#[path = "support/runtime_harness.rs"]
mod runtime_harness;

#[path = "flows/disabled.rs"]
mod disabled;
#[path = "flows/file_page.rs"]
mod file_page;
#[path = "flows/invalidation.rs"]
mod invalidation;
#[path = "flows/panel_readiness.rs"]
mod panel_readiness;
#[path = "flows/round_trip.rs"]
mod round_trip;
#[path = "flows/settings_sync.rs"]
mod settings_sync;
