use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Video,
    Audio,
    Subtitle,
}

impl TrackKind {
    /// Map a probe/host codec type string (`video`, `audio`, `subtitle`, `sub`)
    pub fn from_codec_type(value: &str) -> Option<Self> {
        match value {
            "video" => Some(Self::Video),
            "audio" => Some(Self::Audio),
            "subtitle" | "sub" => Some(Self::Subtitle),
            _ => None,
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Subtitle => "subtitle",
        };
        f.write_str(name)
    }
}

/// One selectable media stream as reported by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub kind: TrackKind,
    /// Codec identifier, e.g. `h264`, `opus`, `hdmv_pgs_subtitle`
    pub codec: String,
    /// Absolute stream index inside the input file
    pub index: u32,
    pub selected: bool,
}

impl Track {
    /// Stream specifier for `-map` and filter pads
    pub fn stream_spec(&self) -> String {
        format!("0:{}", self.index)
    }
}

/// At most one active track per media type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedTracks {
    pub video: Option<Track>,
    pub audio: Option<Track>,
    pub subtitle: Option<Track>,
}

impl SelectedTracks {
    pub fn get(&self, kind: TrackKind) -> Option<&Track> {
        match kind {
            TrackKind::Video => self.video.as_ref(),
            TrackKind::Audio => self.audio.as_ref(),
            TrackKind::Subtitle => self.subtitle.as_ref(),
        }
    }

    fn slot(&mut self, kind: TrackKind) -> &mut Option<Track> {
        match kind {
            TrackKind::Video => &mut self.video,
            TrackKind::Audio => &mut self.audio,
            TrackKind::Subtitle => &mut self.subtitle,
        }
    }
}

/// Reduce the host track list to the selected track of each type.
///
/// Later selected tracks overwrite earlier ones of the same type, matching
/// host iteration order. Unselected tracks are ignored.
pub fn select<'a, I>(tracks: I) -> SelectedTracks
where
    I: IntoIterator<Item = &'a Track>,
{
    let mut selected = SelectedTracks::default();
    for track in tracks.into_iter().filter(|t| t.selected) {
        *selected.slot(track.kind) = Some(track.clone());
    }
    selected
}
