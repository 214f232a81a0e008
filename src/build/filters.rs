use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::context::{BuildContext, TrimMode};
use super::fonts::recover_fonts;
use crate::config::Options;
use crate::media::{log_invocation, run, MediaCommandBuilder, ProcessRunner};
use crate::tracks::{SelectedTracks, Track};

/// Subtitle codecs stored as bitmaps
pub const PICTURE_SUBTITLE_CODECS: [&str; 4] = [
    "hdmv_pgs_subtitle",
    "dvd_subtitle",
    "dvb_subtitle",
    "xsub",
];

/// Filter output label of the subtitle overlay
pub const OVERLAY_LABEL: &str = "[v]";

/// Channel layout libopus refuses to encode
const OPUS_REJECTED_LAYOUT: &str = "5.1(side)";
const OPUS_LAYOUT_REMAP: &str = "channelmap=channel_layout=5.1";

pub fn is_picture_subtitle(codec: &str) -> bool {
    PICTURE_SUBTITLE_CODECS.contains(&codec)
}

/// Quote a value for the filtergraph parser.
///
/// Wraps in single quotes and escapes `\` and `:` with a backslash. A
/// single quote cannot be escaped inside quotes, so it closes the quoted
/// run, is escaped, and a new run is opened: `'` becomes `'\''`.
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            ':' => escaped.push_str("\\:"),
            '\'' => escaped.push_str("'\\''"),
            _ => escaped.push(ch),
        }
    }
    escaped.push('\'');
    escaped
}

/// How the selected subtitle ends up in the output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleStrategy {
    None,
    /// Bitmap subtitles composited onto the video in a complex filtergraph
    Overlay,
    /// Text subtitles rendered into the video through an extracted file
    BurnIn,
    /// Subtitle stream copied as-is
    Passthrough,
}

/// First match wins: nothing to do, bitmap overlay, burn-in, passthrough
pub fn choose_strategy(tracks: &SelectedTracks, mode: &TrimMode, burn_subs: bool) -> SubtitleStrategy {
    let Some(subtitle) = tracks.subtitle.as_ref() else {
        return SubtitleStrategy::None;
    };
    if mode.no_subs || tracks.video.is_none() {
        return SubtitleStrategy::None;
    }

    if is_picture_subtitle(&subtitle.codec) {
        SubtitleStrategy::Overlay
    } else if burn_subs {
        SubtitleStrategy::BurnIn
    } else {
        SubtitleStrategy::Passthrough
    }
}

/// Whether the 5.1(side) remap is needed for this output
pub fn needs_opus_layout_fix(options: &Options, ext: &str, channels: Option<&str>) -> bool {
    let targets_opus = match options.audio_codec.as_deref() {
        Some(codec) => codec == "libopus",
        None => ext.eq_ignore_ascii_case("webm"),
    };
    targets_opus && channels == Some(OPUS_REJECTED_LAYOUT)
}

/// Decides maps and filters for one request
pub struct FilterGraphBuilder<'a> {
    options: &'a Options,
    runner: &'a dyn ProcessRunner,
    commands: MediaCommandBuilder,
}

impl<'a> FilterGraphBuilder<'a> {
    pub fn new(options: &'a Options, runner: &'a dyn ProcessRunner) -> Self {
        Self {
            options,
            runner,
            commands: MediaCommandBuilder::new(&options.ffmpeg, &options.ffprobe),
        }
    }

    /// Fill maps and filters of `context`.
    ///
    /// Subtitles are decided first since an overlay consumes the video
    /// stream, then audio, then video.
    pub async fn apply(
        &self,
        context: &mut BuildContext,
        tracks: &SelectedTracks,
        audio_channels: Option<&str>,
    ) {
        let mode = context.request.mode;
        let strategy = choose_strategy(tracks, &mode, self.options.burn_subs);
        debug!("Subtitle strategy: {:?}", strategy);

        if let (Some(subtitle), Some(video)) = (tracks.subtitle.as_ref(), tracks.video.as_ref()) {
            match strategy {
                SubtitleStrategy::Overlay => self.overlay(context, video, subtitle),
                SubtitleStrategy::BurnIn => self.burn_in(context, subtitle).await,
                SubtitleStrategy::Passthrough => context.maps.subtitle = Some(subtitle.stream_spec()),
                SubtitleStrategy::None => {}
            }
        }

        if let Some(audio) = tracks.audio.as_ref().filter(|_| !mode.no_audio) {
            if needs_opus_layout_fix(self.options, &context.ext, audio_channels) {
                debug!("Remapping {} audio for libopus", OPUS_REJECTED_LAYOUT);
                context.filters.push_audio(OPUS_LAYOUT_REMAP);
            }
            context.maps.audio = Some(audio.stream_spec());
        }

        if let Some(video) = tracks.video.as_ref() {
            if !context.video_consumed {
                context.maps.video = Some(video.stream_spec());
            }
        }
    }

    fn overlay(&self, context: &mut BuildContext, video: &Track, subtitle: &Track) {
        context.filters.push_complex(format!(
            "[{}][{}]overlay{}",
            video.stream_spec(),
            subtitle.stream_spec(),
            OVERLAY_LABEL
        ));
        context.maps.subtitle = Some(OVERLAY_LABEL.to_string());
        context.video_consumed = true;
    }

    /// Extract the subtitle range to a file and render it into the video.
    /// Failure leaves the context untouched apart from a notice.
    async fn burn_in(&self, context: &mut BuildContext, subtitle: &Track) {
        let subtitle_path = self.options.subtitle_path_for(&context.output);

        if let Some(parent) = subtitle_path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                self.notice(context, format!("Cannot create subtitle directory, not burning subtitles: {}", e));
                return;
            }
        }

        let fonts_dir = self.embedded_fonts_dir(context).await;

        let extraction = self.commands.extract_subtitle(
            &context.input,
            context.request.start,
            context.request.duration(),
            subtitle,
            &subtitle_path,
        );
        let outcome = run(self.runner, &extraction, &subtitle_path, false).await;
        let log_path = self.options.log.then(|| self.options.log_path_for(&context.output));
        if let Some(notice) = log_invocation(log_path.as_deref(), &extraction, &outcome).await {
            context.notices.push(notice);
        }
        if !outcome.is_success() {
            self.notice(context, format!("Subtitle extraction failed, not burning subtitles: {}", outcome.message()));
            return;
        }

        let mut filter = format!("subtitles={}", escape_filter_value(&subtitle_path.to_string_lossy()));
        match (&fonts_dir, &self.options.fallback_font) {
            (Some(dir), _) => {
                filter.push_str(&format!(":fontsdir={}", escape_filter_value(&dir.to_string_lossy())));
            }
            (None, Some(font)) => {
                filter.push_str(&format!(":force_style={}", escape_filter_value(&format!("FontName={}", font))));
            }
            (None, None) => {}
        }
        if let Some(size) = context.size {
            filter.push_str(&format!(":original_size={}", size));
        }

        info!("Burning subtitles from {}", subtitle_path.display());
        context.filters.push_video(filter);
    }

    /// Fonts directory to hand to libass, if any font was recovered
    async fn embedded_fonts_dir(&self, context: &mut BuildContext) -> Option<PathBuf> {
        if !self.options.embedded_fonts {
            return None;
        }

        let fonts_dir = self.options.fonts_dir_for(&context.output);
        match recover_fonts(self.runner, &self.commands, &context.input, &fonts_dir).await {
            Ok(0) => None,
            Ok(_) => Some(fonts_dir),
            Err(e) => {
                let fallback = match &self.options.fallback_font {
                    Some(font) => format!("using fallback font {}", font),
                    None => "using default fonts".to_string(),
                };
                self.notice(context, format!("Embedded fonts unavailable ({}), {}", e, fallback));
                None
            }
        }
    }

    fn notice(&self, context: &mut BuildContext, message: String) {
        warn!("{}", message);
        context.notices.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::context::TrimRequest;
    use crate::geometry::Geometry;
    use crate::media::{MockProcessRunner, RawOutput};
    use crate::tracks::TrackKind;

    fn track(kind: TrackKind, codec: &str, index: u32) -> Track {
        Track {
            kind,
            codec: codec.to_string(),
            index,
            selected: true,
        }
    }

    fn tracks(subtitle_codec: Option<&str>) -> SelectedTracks {
        SelectedTracks {
            video: Some(track(TrackKind::Video, "h264", 0)),
            audio: Some(track(TrackKind::Audio, "aac", 1)),
            subtitle: subtitle_codec.map(|codec| track(TrackKind::Subtitle, codec, 2)),
        }
    }

    fn context(mode: TrimMode) -> BuildContext {
        BuildContext::new(
            PathBuf::from("/media/in.mkv"),
            PathBuf::from("/media/in [1.000-3.000].webm"),
            TrimRequest::new(1.0, 3.0, mode).unwrap(),
            "webm".to_string(),
        )
    }

    /// Reverse of `escape_filter_value`, as the filtergraph parser reads it
    fn unescape(value: &str) -> String {
        let mut out = String::new();
        let mut quoted = false;
        let mut chars = value.chars();
        while let Some(ch) = chars.next() {
            match ch {
                '\'' => quoted = !quoted,
                '\\' => {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                _ => out.push(ch),
            }
        }
        assert!(!quoted, "unbalanced quotes in {value}");
        out
    }

    #[test]
    fn test_escape_filter_value() {
        assert_eq!(escape_filter_value("/tmp/a.ass"), "'/tmp/a.ass'");
        assert_eq!(escape_filter_value("C:\\subs\\a.ass"), "'C\\:\\\\subs\\\\a.ass'");
        assert_eq!(escape_filter_value("it's"), "'it'\\''s'");
    }

    #[test]
    fn test_escape_round_trip() {
        for path in ["/tmp/a:b\\c'd.ass", "plain", "'''", "C:\\x:y", "/tmp/out [0.000-5.000].ass"] {
            assert_eq!(unescape(&escape_filter_value(path)), path);
        }
    }

    #[test]
    fn test_choose_strategy() {
        let mode = TrimMode::default();
        assert_eq!(choose_strategy(&tracks(None), &mode, true), SubtitleStrategy::None);
        assert_eq!(choose_strategy(&tracks(Some("hdmv_pgs_subtitle")), &mode, true), SubtitleStrategy::Overlay);
        assert_eq!(choose_strategy(&tracks(Some("dvd_subtitle")), &mode, false), SubtitleStrategy::Overlay);
        assert_eq!(choose_strategy(&tracks(Some("ass")), &mode, true), SubtitleStrategy::BurnIn);
        assert_eq!(choose_strategy(&tracks(Some("subrip")), &mode, false), SubtitleStrategy::Passthrough);

        let no_subs = TrimMode { no_subs: true, ..mode };
        assert_eq!(choose_strategy(&tracks(Some("ass")), &no_subs, true), SubtitleStrategy::None);

        let mut without_video = tracks(Some("ass"));
        without_video.video = None;
        assert_eq!(choose_strategy(&without_video, &mode, false), SubtitleStrategy::None);
    }

    #[test]
    fn test_needs_opus_layout_fix() {
        let options = Options::default();
        assert!(needs_opus_layout_fix(&options, "webm", Some("5.1(side)")));
        assert!(!needs_opus_layout_fix(&options, "webm", Some("5.1")));
        assert!(!needs_opus_layout_fix(&options, "mkv", Some("5.1(side)")));

        let opus = Options {
            audio_codec: Some("libopus".to_string()),
            ..Options::default()
        };
        assert!(needs_opus_layout_fix(&opus, "mkv", Some("5.1(side)")));

        let aac = Options {
            audio_codec: Some("aac".to_string()),
            ..Options::default()
        };
        assert!(!needs_opus_layout_fix(&aac, "webm", Some("5.1(side)")));
    }

    #[tokio::test]
    async fn test_overlay_consumes_video() {
        let options = Options::default();
        let runner = MockProcessRunner::new();
        let builder = FilterGraphBuilder::new(&options, &runner);

        let mut ctx = context(TrimMode::default());
        builder.apply(&mut ctx, &tracks(Some("hdmv_pgs_subtitle")), None).await;

        assert!(ctx.video_consumed);
        assert_eq!(ctx.maps.ordered().collect::<Vec<_>>(), vec!["[v]", "0:1"]);
        assert_eq!(
            ctx.filters.to_args(),
            vec![("-filter_complex", "[0:0][0:2]overlay[v]".to_string())]
        );
    }

    #[tokio::test]
    async fn test_passthrough_and_audio_fix() {
        let options = Options::default();
        let runner = MockProcessRunner::new();
        let builder = FilterGraphBuilder::new(&options, &runner);

        let mut ctx = context(TrimMode::default());
        builder.apply(&mut ctx, &tracks(Some("subrip")), Some("5.1(side)")).await;

        assert_eq!(ctx.maps.ordered().collect::<Vec<_>>(), vec!["0:2", "0:1", "0:0"]);
        assert_eq!(
            ctx.filters.to_args(),
            vec![("-filter:a", "channelmap=channel_layout=5.1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_no_audio_skips_map_and_fix() {
        let options = Options::default();
        let runner = MockProcessRunner::new();
        let builder = FilterGraphBuilder::new(&options, &runner);

        let mode = TrimMode {
            no_audio: true,
            no_subs: true,
            ..TrimMode::default()
        };
        let mut ctx = context(mode);
        builder.apply(&mut ctx, &tracks(Some("subrip")), Some("5.1(side)")).await;

        assert_eq!(ctx.maps.ordered().collect::<Vec<_>>(), vec!["0:0"]);
        assert!(ctx.filters.is_empty());
    }

    #[tokio::test]
    async fn test_burn_in_with_recovered_fonts() {
        let dir = tempfile::tempdir().unwrap();
        let options = Options {
            fonts_dir: Some(dir.path().join("fonts")),
            subs_dir: Some(dir.path().join("subs")),
            burn_subs: true,
            ..Options::default()
        };

        let mut runner = MockProcessRunner::new();
        runner.expect_output().times(3).returning(|command| match command.description.as_str() {
            "Attachment probe" => RawOutput::ok(
                r#"{"streams":[{"index":5,"tags":{"filename":"a.ttf","mimetype":"application/x-truetype-font"}}]}"#,
            ),
            _ => RawOutput::ok(""),
        });

        let builder = FilterGraphBuilder::new(&options, &runner);
        let mut ctx = context(TrimMode::default());
        ctx.size = Some(Geometry::new(1280, 720));
        builder.apply(&mut ctx, &tracks(Some("ass")), None).await;

        let subs = dir.path().join("subs").join("in [1.000-3.000].ass");
        let fonts = dir.path().join("fonts").join("in [1.000-3.000]");
        let expected = format!(
            "subtitles={}:fontsdir={}:original_size=1280x720",
            escape_filter_value(&subs.to_string_lossy()),
            escape_filter_value(&fonts.to_string_lossy()),
        );

        assert_eq!(ctx.filters.to_args(), vec![("-filter:v", expected)]);
        // Burned subtitles are not muxed
        assert_eq!(ctx.maps.ordered().collect::<Vec<_>>(), vec!["0:1", "0:0"]);
        assert!(ctx.notices.is_empty());
    }

    #[tokio::test]
    async fn test_burn_in_font_probe_failure_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let options = Options {
            subs_dir: Some(dir.path().to_path_buf()),
            fallback_font: Some("Noto Sans".to_string()),
            burn_subs: true,
            ..Options::default()
        };

        let mut runner = MockProcessRunner::new();
        runner.expect_output().times(2).returning(|command| match command.description.as_str() {
            "Attachment probe" => RawOutput::Failed("ffprobe missing".to_string()),
            _ => RawOutput::ok(""),
        });

        let builder = FilterGraphBuilder::new(&options, &runner);
        let mut ctx = context(TrimMode::default());
        builder.apply(&mut ctx, &tracks(Some("ass")), None).await;

        let args = ctx.filters.to_args();
        assert_eq!(args.len(), 1);
        assert!(args[0].1.ends_with(":force_style='FontName=Noto Sans'"));
        assert_eq!(ctx.notices.len(), 1);
        assert!(ctx.notices[0].contains("fallback font Noto Sans"));
    }

    #[tokio::test]
    async fn test_burn_in_extraction_failure_skips_subtitle() {
        let dir = tempfile::tempdir().unwrap();
        let options = Options {
            subs_dir: Some(dir.path().to_path_buf()),
            embedded_fonts: false,
            burn_subs: true,
            log: true,
            log_dir: Some(dir.path().join("logs")),
            ..Options::default()
        };

        let mut runner = MockProcessRunner::new();
        runner.expect_output().times(1).returning(|command| {
            assert_eq!(command.description, "Subtitle extraction");
            RawOutput::Exited {
                code: Some(1),
                stdout: String::new(),
                stderr: "Subtitle encoding currently only possible from text to text or bitmap to bitmap".to_string(),
            }
        });

        let builder = FilterGraphBuilder::new(&options, &runner);
        let mut ctx = context(TrimMode::default());
        builder.apply(&mut ctx, &tracks(Some("ass")), None).await;

        assert!(ctx.filters.is_empty());
        assert_eq!(ctx.maps.ordered().collect::<Vec<_>>(), vec!["0:1", "0:0"]);
        assert_eq!(ctx.notices.len(), 1);
        assert!(ctx.notices[0].starts_with("Subtitle extraction failed"));

        let log = std::fs::read_to_string(dir.path().join("logs").join("in [1.000-3.000].webm.log")).unwrap();
        assert!(log.contains("Subtitle extraction"));
        assert!(log.contains("ffmpeg error: Subtitle encoding"));
    }
}
