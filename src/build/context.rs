use std::path::PathBuf;

use crate::error::{Result, VtrimError};
use crate::geometry::Geometry;

/// Per-request switches, mirroring the key bindings of the player script
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrimMode {
    pub no_subs: bool,
    pub no_audio: bool,
    pub detached: bool,
}

impl TrimMode {
    /// `[+no_subs] [-no_audio] [-detached]`
    pub fn summary(&self) -> String {
        let flag = |name: &str, on: bool| format!("[{}{}]", if on { '+' } else { '-' }, name);
        [
            flag("no_subs", self.no_subs),
            flag("no_audio", self.no_audio),
            flag("detached", self.detached),
        ]
        .join(" ")
    }
}

/// One validated trim action
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimRequest {
    pub start: f64,
    pub end: f64,
    pub mode: TrimMode,
}

impl TrimRequest {
    /// Rejects ranges where `end <= start` (and non-finite bounds)
    pub fn new(start: f64, end: f64, mode: TrimMode) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() || end <= start {
            return Err(VtrimError::InvalidRange { start, end });
        }
        Ok(Self { start, end, mode })
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Filter chains collected during one build, kept per stream type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    video: Vec<String>,
    audio: Vec<String>,
    complex: Vec<String>,
}

impl Filters {
    pub fn push_video<S: Into<String>>(&mut self, filter: S) {
        self.video.push(filter.into());
    }

    pub fn push_audio<S: Into<String>>(&mut self, filter: S) {
        self.audio.push(filter.into());
    }

    pub fn push_complex<S: Into<String>>(&mut self, filter: S) {
        self.complex.push(filter.into());
    }

    pub fn is_empty(&self) -> bool {
        self.video.is_empty() && self.audio.is_empty() && self.complex.is_empty()
    }

    /// Flag/value pairs in fixed order: video, audio, complex.
    /// Chains join with `,`; complex graphs join with `;`.
    pub fn to_args(&self) -> Vec<(&'static str, String)> {
        [
            ("-filter:v", self.video.join(",")),
            ("-filter:a", self.audio.join(",")),
            ("-filter_complex", self.complex.join(";")),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .collect()
    }
}

/// `-map` values, emitted as subtitle, audio, video
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Maps {
    pub subtitle: Option<String>,
    pub audio: Option<String>,
    pub video: Option<String>,
}

impl Maps {
    pub fn ordered(&self) -> impl Iterator<Item = &str> {
        [&self.subtitle, &self.audio, &self.video]
            .into_iter()
            .filter_map(|value| value.as_deref())
    }
}

/// Working state for one trim request
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub input: PathBuf,
    pub output: PathBuf,
    pub request: TrimRequest,
    /// Effective output extension
    pub ext: String,
    /// Resolved output geometry, set only when a size cap is configured
    pub size: Option<Geometry>,
    pub maps: Maps,
    pub filters: Filters,
    /// The video stream feeds an overlay and must not be mapped directly
    pub video_consumed: bool,
    /// Non-fatal problems to report alongside the result
    pub notices: Vec<String>,
}

impl BuildContext {
    pub fn new(input: PathBuf, output: PathBuf, request: TrimRequest, ext: String) -> Self {
        Self {
            input,
            output,
            request,
            ext,
            size: None,
            maps: Maps::default(),
            filters: Filters::default(),
            video_consumed: false,
            notices: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_request_rejects_inverted_range() {
        let result = TrimRequest::new(10.0, 5.0, TrimMode::default());
        let err = result.unwrap_err();
        assert!(matches!(err, VtrimError::InvalidRange { .. }));
        assert!(err.to_string().starts_with("End time can't be lower than or equal to start time"));

        assert!(TrimRequest::new(5.0, 5.0, TrimMode::default()).is_err());
        assert!(TrimRequest::new(f64::NAN, 5.0, TrimMode::default()).is_err());
    }

    #[test]
    fn test_trim_request_duration() {
        let request = TrimRequest::new(1.5, 4.0, TrimMode::default()).unwrap();
        assert_eq!(request.duration(), 2.5);
    }

    #[test]
    fn test_mode_summary() {
        let mode = TrimMode {
            no_subs: true,
            no_audio: false,
            detached: true,
        };
        assert_eq!(mode.summary(), "[+no_subs] [-no_audio] [+detached]");
    }

    #[test]
    fn test_filters_fixed_order() {
        let mut filters = Filters::default();
        filters.push_complex("[0:0][0:2]overlay[v]");
        filters.push_audio("channelmap=channel_layout=5.1");
        filters.push_complex("[v]null[w]");
        filters.push_video("scale=640:-2");
        filters.push_video("hflip");

        assert_eq!(
            filters.to_args(),
            vec![
                ("-filter:v", "scale=640:-2,hflip".to_string()),
                ("-filter:a", "channelmap=channel_layout=5.1".to_string()),
                ("-filter_complex", "[0:0][0:2]overlay[v];[v]null[w]".to_string()),
            ]
        );
    }

    #[test]
    fn test_maps_ordered() {
        let maps = Maps {
            subtitle: Some("0:2".to_string()),
            audio: None,
            video: Some("0:0".to_string()),
        };
        assert_eq!(maps.ordered().collect::<Vec<_>>(), vec!["0:2", "0:0"]);
    }
}
