use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use reclink_core::autocomplete::AutocompleteRequest;
use reclink_core::models::{ArtistCreditName, Recording};
use reclink_core::{MusicBrainzClient, RecordingSuggestions, SuggestConfig, Track, TrackState};
use tracing::{error, info};

/// Suggests MusicBrainz recordings for tracks of a release.
#[derive(Parser)]
#[command(name = "reclink")]
struct Args {
    /// Config file to use instead of the default location.
    #[arg(long, global = true, env = "RECLINK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one suggestion cycle for a track and print the ranked recordings.
    Suggest {
        /// Track title.
        #[arg(long)]
        title: String,

        /// Track length in milliseconds.
        #[arg(long)]
        length: Option<u64>,

        /// MBID of a credited artist. Repeat for each artist, in credit order.
        #[arg(long = "artist-id", required = true)]
        artist_ids: Vec<String>,

        /// Release group whose recordings are preferred.
        #[arg(long)]
        release_group: Option<String>,
    },
    /// Page through recording search results as an autocomplete field would.
    Search {
        /// Free-text title.
        #[arg(long)]
        query: String,

        /// Page number, starting at 1.
        #[arg(long, default_value = "1")]
        page: u32,

        #[arg(long, default_value = "25")]
        page_size: u32,

        /// Track length in milliseconds, used to narrow results.
        #[arg(long)]
        length: Option<u64>,

        /// MBID of a credited artist, used to boost results.
        #[arg(long = "artist-id")]
        artist_ids: Vec<String>,
    },
    /// Write the default settings to the config file.
    InitConfig,
}

fn configure_logging() {
    use tracing_subscriber::prelude::*;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_line_number(true)
        .with_target(false)
        .with_file(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

#[tokio::main]
async fn main() {
    configure_logging();
    let args = Args::parse();

    if let Command::InitConfig = args.command {
        let Some(path) = args.config.or_else(SuggestConfig::config_path) else {
            error!("No config directory available, pass --config");
            std::process::exit(1);
        };
        if let Err(e) = SuggestConfig::default().save_to_yaml_file(&path) {
            error!("Failed to write config: {e}");
            std::process::exit(1);
        }
        info!("Wrote default config to {}", path.display());
        return;
    }

    let config = match &args.config {
        Some(path) => SuggestConfig::from_yaml_file(path),
        None => SuggestConfig::load(),
    }
    .unwrap_or_else(|e| {
        error!("Failed to load config: {e}");
        std::process::exit(1);
    });

    let client = MusicBrainzClient::new(&config).unwrap_or_else(|e| {
        error!("Failed to create MusicBrainz client: {e}");
        std::process::exit(1);
    });
    let engine = RecordingSuggestions::new(Arc::new(client), &config);

    match args.command {
        Command::Suggest {
            title,
            length,
            artist_ids,
            release_group,
        } => {
            let track = track_for(title, length, &artist_ids);
            if let Some(release_group) = release_group {
                info!("Preferring recordings of release group {release_group}");
                engine.select_release_group(Some(release_group));
            }
            engine.find_recording_suggestions(&track).await;

            let suggestions = track.state().suggested_recordings;
            if suggestions.is_empty() {
                println!("No matching recordings");
            }
            for (i, recording) in suggestions.iter().enumerate() {
                println!("{:>2}. {}", i + 1, describe(recording));
            }
        }
        Command::Search {
            query,
            page,
            page_size,
            length,
            artist_ids,
        } => {
            let track = track_for(query.clone(), length, &artist_ids);
            let hook = engine.autocomplete_hook(&track);
            let result = hook
                .fetch(&AutocompleteRequest::new(query, page, page_size))
                .await
                .unwrap_or_else(|e| {
                    error!("Search failed: {e}");
                    std::process::exit(1);
                });

            println!("Page {} of {}", result.page, result.total_pages);
            for recording in &result.recordings {
                println!("  {}", describe(recording));
            }
        }
        Command::InitConfig => {}
    }
}

fn track_for(title: String, length: Option<u64>, artist_ids: &[String]) -> Track {
    Track::new(TrackState {
        name: title,
        length,
        artist_credit: artist_ids
            .iter()
            .map(|id| ArtistCreditName::new(id.clone(), id.clone()))
            .collect(),
        ..Default::default()
    })
}

fn describe(recording: &Recording) -> String {
    let mut line = format!("{} by {}", recording.name, recording.artist);
    if !recording.comment.is_empty() {
        line.push_str(&format!(" ({})", recording.comment));
    }
    if let Some(length) = recording.length {
        let seconds = length / 1000;
        line.push_str(&format!(" [{}:{:02}]", seconds / 60, seconds % 60));
    }
    if recording.video {
        line.push_str(" [video]");
    }
    line.push_str(&format!(
        " on {} release(s), {}",
        recording.appearance_count(),
        recording.id
    ));
    line
}
