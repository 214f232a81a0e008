use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path (defaults to ./vtrim.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Profile table to read from the configuration file
    #[arg(short, long)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cut the A-B range of a video into a new file
    Trim {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Range start in seconds (A point)
        #[arg(short, long)]
        start: Option<f64>,

        /// Range end in seconds (B point)
        #[arg(short, long)]
        end: Option<f64>,

        /// Stream indices to treat as the active tracks (repeatable)
        #[arg(long = "select", value_name = "INDEX")]
        select: Vec<u32>,

        /// Drop subtitles from the output
        #[arg(long)]
        no_subs: bool,

        /// Drop audio from the output
        #[arg(long)]
        no_audio: bool,

        /// Start ffmpeg and return without waiting for it
        #[arg(long)]
        detached: bool,

        /// Render text subtitles into the video
        #[arg(long)]
        burn_subs: bool,
    },

    /// Show the tracks of a video and which ones would be used
    Probe {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Stream indices to treat as the active tracks (repeatable)
        #[arg(long = "select", value_name = "INDEX")]
        select: Vec<u32>,
    },

    /// Run the configured post-trim hooks against an existing output
    Hooks {
        /// Output file substituted for <output>
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trim() {
        let args = Args::try_parse_from([
            "vtrim", "--profile", "mobile", "trim", "-i", "show.mkv", "-s", "10", "-e", "15.5",
            "--select", "0", "--select", "3", "--no-audio", "--detached",
        ])
        .unwrap();

        assert_eq!(args.profile.as_deref(), Some("mobile"));
        match args.command {
            Commands::Trim {
                input,
                start,
                end,
                select,
                no_subs,
                no_audio,
                detached,
                burn_subs,
            } => {
                assert_eq!(input, PathBuf::from("show.mkv"));
                assert_eq!(start, Some(10.0));
                assert_eq!(end, Some(15.5));
                assert_eq!(select, vec![0, 3]);
                assert!(!no_subs && no_audio && detached && !burn_subs);
            }
            _ => panic!("expected trim"),
        }
    }

    #[test]
    fn test_trim_requires_input() {
        assert!(Args::try_parse_from(["vtrim", "trim", "-s", "1", "-e", "2"]).is_err());
    }
}
