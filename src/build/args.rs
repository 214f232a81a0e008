use std::path::{Path, PathBuf};

use super::context::BuildContext;
use crate::config::Options;
use crate::media::{MediaCommand, MediaCommandBuilder};

/// Configured extension, or the input's own when none is configured
pub fn effective_ext(configured: &str, input: &Path) -> String {
    if !configured.trim().is_empty() {
        return configured.trim().trim_start_matches('.').to_string();
    }
    input
        .extension()
        .map(|ext| ext.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// `<input without extension> [<start>-<end>].<ext>`, moved into `video_dir`
/// when one is configured
pub fn output_path(input: &Path, ext: &str, start: f64, end: f64, video_dir: Option<&Path>) -> PathBuf {
    let base = input.with_extension("");
    let mut name = format!("{} [{:.3}-{:.3}]", base.to_string_lossy(), start, end);
    if !ext.is_empty() {
        name.push('.');
        name.push_str(ext);
    }

    let path = PathBuf::from(name);
    match (video_dir, path.file_name()) {
        (Some(dir), Some(file_name)) => dir.join(file_name),
        _ => path,
    }
}

/// Render the primary transcode invocation.
///
/// Order: overwrite policy, verbosity, seek, input, duration, codec and
/// rate flags, geometry, `-an`/`-sn` for excluded types, maps (subtitle,
/// audio, video), filters (video, audio, complex), output.
pub fn render(options: &Options, context: &BuildContext) -> MediaCommand {
    let quality = options.quality.map(|q| q.to_string());
    let threads = options.threads.map(|t| t.to_string());

    let mut cmd = MediaCommandBuilder::new(&options.ffmpeg, &options.ffprobe)
        .transcode(format!("Trim {}", context.request.mode.summary()));

    cmd = if options.overwrite { cmd.overwrite() } else { cmd.no_clobber() };

    cmd = cmd
        .loglevel(&options.loglevel)
        .seek(context.request.start)
        .input(&context.input)
        .duration(context.request.duration())
        .flag_opt("-c:v", options.video_codec.as_deref())
        .flag_opt("-c:a", options.audio_codec.as_deref())
        .flag_opt("-c:s", options.subtitle_codec.as_deref())
        .flag_opt("-b:v", options.video_bitrate.as_deref())
        .flag_opt("-b:a", options.audio_bitrate.as_deref())
        .flag_opt("-crf", quality.as_deref())
        .flag_opt("-threads", threads.as_deref());

    if let Some(size) = context.size {
        cmd = cmd.flag("-s:v", size.to_string());
    }

    // Must hold even when nothing is mapped
    if context.request.mode.no_audio {
        cmd = cmd.arg("-an");
    }
    if context.request.mode.no_subs {
        cmd = cmd.arg("-sn");
    }

    for map in context.maps.ordered() {
        cmd = cmd.map(map);
    }

    for (flag, value) in context.filters.to_args() {
        cmd = cmd.flag(flag, value);
    }

    cmd.output(&context.output)
}
