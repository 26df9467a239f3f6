use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// `adpace` - speeds through video ads, leaves music videos alone.
#[derive(Parser, Debug)]
#[command(name = "adpace")]
#[command(version)]
#[command(about = "Ad and music-video aware playback-rate controller.", long_about = None)]
pub struct Cli {
    /// Log at debug level regardless of config
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify a saved page once and print the verdict
    Classify {
        #[command(flatten)]
        page: PageArgs,

        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change the stored playback settings
    Settings {
        #[command(subcommand)]
        settings_command: SettingsCommands,
    },

    /// Watch a page file and drive its video rate until Ctrl-C
    Watch {
        #[command(flatten)]
        page: PageArgs,
    },

    /// Run a scripted ad-then-normal round trip on a simulated page
    Simulate,

    /// Show config paths and the last runtime health snapshot
    Status,
}

#[derive(Args, Debug)]
pub struct PageArgs {
    /// HTML file holding the page markup
    #[arg(long)]
    pub html: PathBuf,

    /// URL the markup was loaded from
    #[arg(long)]
    pub url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Print the stored record
    Show,

    /// Change one or more fields
    Set {
        /// Rate used while an ad plays (1.0 - 16.0)
        #[arg(long)]
        ad_speed: Option<f64>,

        /// Rate used for normal videos
        #[arg(long)]
        video_speed: Option<f64>,

        /// Turn speed control on or off
        #[arg(long)]
        enabled: Option<bool>,

        /// Keep music videos at the normal speed
        #[arg(long)]
        music_normal_speed: Option<bool>,
    },

    /// Restore the defaults
    Reset,
}
