//! Inputs normally provided by the playback host: the file, the A-B range,
//! the source geometry, the audio channel layout and the track list.
//!
//! Outside a player the snapshot is built by probing the file with ffprobe.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::Options;
use crate::error::{Result, VtrimError};
use crate::geometry::Geometry;
use crate::media::{MediaCommandBuilder, ProcessRunner};
use crate::tracks::{self, Track, TrackKind};

/// Read-only snapshot of the host state for one trim request
#[derive(Debug, Clone, PartialEq)]
pub struct HostState {
    pub path: PathBuf,
    /// A-B loop points, when both are set
    pub trim: Option<(f64, f64)>,
    pub geometry: Option<Geometry>,
    pub audio_channels: Option<String>,
    pub tracks: Vec<Track>,
}

// Structs for parsing `ffprobe -show_streams -of json`
#[derive(Debug, Deserialize)]
struct StreamReport {
    #[serde(default)]
    streams: Vec<ProbedStream>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbedStream {
    pub index: u32,
    pub codec_type: Option<String>,
    pub codec_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub channel_layout: Option<String>,
    #[serde(default)]
    pub disposition: Disposition,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Disposition {
    #[serde(default)]
    pub attached_pic: u8,
}

pub fn parse_streams(json: &str) -> Result<Vec<ProbedStream>> {
    let report: StreamReport = serde_json::from_str(json)?;
    Ok(report.streams)
}

/// Convert probed streams into host tracks.
///
/// With no explicit selection the first stream of each type is selected,
/// like a player's default choice. Cover art is not a video track.
pub fn tracks_from_streams(streams: &[ProbedStream], select: &[u32]) -> Vec<Track> {
    let mut seen: Vec<TrackKind> = Vec::new();

    streams
        .iter()
        .filter(|stream| stream.disposition.attached_pic == 0)
        .filter_map(|stream| {
            let kind = TrackKind::from_codec_type(stream.codec_type.as_deref()?)?;
            let selected = if select.is_empty() {
                let first = !seen.contains(&kind);
                seen.push(kind);
                first
            } else {
                select.contains(&stream.index)
            };

            Some(Track {
                kind,
                codec: stream.codec_name.clone().unwrap_or_default(),
                index: stream.index,
                selected,
            })
        })
        .collect()
}

fn stream_for<'s>(streams: &'s [ProbedStream], track: Option<&Track>) -> Option<&'s ProbedStream> {
    let track = track?;
    streams.iter().find(|stream| stream.index == track.index)
}

/// Build a host snapshot for `input` by probing its streams
pub async fn probe_host(
    runner: &dyn ProcessRunner,
    options: &Options,
    input: &Path,
    trim: Option<(f64, f64)>,
    select: &[u32],
) -> Result<HostState> {
    if !input.exists() {
        return Err(VtrimError::FileNotFound(input.display().to_string()));
    }

    let command = MediaCommandBuilder::new(&options.ffmpeg, &options.ffprobe).probe_streams(input);
    let json = runner
        .output(&command)
        .await
        .into_stdout()
        .map_err(|e| VtrimError::Probe(format!("Stream probe of {} failed: {}", input.display(), e)))?;

    let streams = parse_streams(&json)?;
    let tracks = tracks_from_streams(&streams, select);
    let selected = tracks::select(&tracks);

    let geometry = stream_for(&streams, selected.video.as_ref()).and_then(|stream| match (stream.width, stream.height) {
        (Some(width), Some(height)) if width > 0 && height > 0 => Some(Geometry::new(width, height)),
        _ => None,
    });
    let audio_channels = stream_for(&streams, selected.audio.as_ref()).and_then(|stream| stream.channel_layout.clone());

    info!("Probed {} tracks from {}", tracks.len(), input.display());
    debug!("Geometry: {:?}, audio channels: {:?}", geometry, audio_channels);

    Ok(HostState {
        path: input.to_path_buf(),
        trim,
        geometry,
        audio_channels,
        tracks,
    })
}
