use std::fmt;
use std::path::{Path, PathBuf};

use crate::tracks::Track;

/// Format seconds for `-ss` / `-t`
pub fn format_seconds(seconds: f64) -> String {
    format!("{:.3}", seconds)
}

/// Abstract media processing command representation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add a flag followed by its value
    pub fn flag<S: Into<String>>(self, flag: &str, value: S) -> Self {
        self.arg(flag).arg(value)
    }

    /// Add a flag only when the value is configured
    pub fn flag_opt(self, flag: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) if !value.is_empty() => self.flag(flag, value),
            _ => self,
        }
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Fail if the output already exists
    pub fn no_clobber(self) -> Self {
        self.arg("-n")
    }

    /// Set log verbosity
    pub fn loglevel<S: Into<String>>(self, level: S) -> Self {
        self.flag("-v", level)
    }

    /// Input seek position
    pub fn seek(self, seconds: f64) -> Self {
        self.flag("-ss", format_seconds(seconds))
    }

    /// Output duration
    pub fn duration(self, seconds: f64) -> Self {
        self.flag("-t", format_seconds(seconds.max(0.0)))
    }

    /// Map a stream or filter output label
    pub fn map<S: Into<String>>(self, spec: S) -> Self {
        self.flag("-map", spec)
    }

    /// The full argument vector, executable first
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.binary_path.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Short program name used in status messages
    pub fn program_name(&self) -> String {
        Path::new(&self.binary_path)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.binary_path.clone())
    }
}

impl fmt::Display for MediaCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.binary_path)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Builder for the auxiliary ffmpeg/ffprobe invocations
pub struct MediaCommandBuilder {
    ffmpeg: String,
    ffprobe: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S1: Into<String>, S2: Into<String>>(ffmpeg: S1, ffprobe: S2) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Build the primary transcode command skeleton
    pub fn transcode<S: Into<String>>(&self, description: S) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg, description)
    }

    /// Copy a single subtitle stream of the trimmed range into its own file
    ///
    /// Always runs at `-v error` so that any stderr output means failure.
    pub fn extract_subtitle<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        start: f64,
        duration: f64,
        subtitle: &Track,
        output: Q,
    ) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg, "Subtitle extraction")
            .overwrite()
            .loglevel("error")
            .seek(start)
            .input(input)
            .duration(duration)
            .map(subtitle.stream_spec())
            .output(output)
    }

    /// List attachment streams with their filename and mimetype tags
    pub fn probe_attachments<P: AsRef<Path>>(&self, input: P) -> MediaCommand {
        MediaCommand::new(&self.ffprobe, "Attachment probe")
            .loglevel("error")
            .flag("-select_streams", "t")
            .flag("-show_entries", "stream=index:stream_tags=filename,mimetype")
            .flag("-of", "json")
            .input(input)
    }

    /// Dump the given attachment streams to files
    ///
    /// ffmpeg refuses to run without an output, so the dump is paired with a
    /// zero-length null output.
    pub fn dump_attachments<P: AsRef<Path>>(
        &self,
        input: P,
        attachments: &[(u32, PathBuf)],
    ) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.ffmpeg, "Attachment dump")
            .overwrite()
            .loglevel("error");

        for (index, path) in attachments {
            cmd = cmd.flag(
                &format!("-dump_attachment:{}", index),
                path.to_string_lossy().to_string(),
            );
        }

        cmd.input(input)
            .flag("-t", "0")
            .flag("-f", "null")
            .arg("-")
    }

    /// Probe every stream of the input
    pub fn probe_streams<P: AsRef<Path>>(&self, input: P) -> MediaCommand {
        MediaCommand::new(&self.ffprobe, "Stream probe")
            .loglevel("error")
            .arg("-show_streams")
            .flag("-of", "json")
            .input(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracks::TrackKind;

    fn builder() -> MediaCommandBuilder {
        MediaCommandBuilder::new("/usr/bin/ffmpeg", "ffprobe")
    }

    #[test]
    fn test_argv_starts_with_binary() {
        let cmd = MediaCommand::new("ffmpeg", "test").overwrite().input("/a.mkv");
        assert_eq!(cmd.argv(), vec!["ffmpeg", "-y", "-i", "/a.mkv"]);
    }

    #[test]
    fn test_flag_opt_skips_missing_and_empty() {
        let cmd = MediaCommand::new("ffmpeg", "test")
            .flag_opt("-c:v", None)
            .flag_opt("-c:a", Some(""))
            .flag_opt("-b:v", Some("1M"));
        assert_eq!(cmd.args, vec!["-b:v", "1M"]);
    }

    #[test]
    fn test_seek_and_duration_format() {
        let cmd = MediaCommand::new("ffmpeg", "test").seek(10.0).duration(4.199999999999999);
        assert_eq!(cmd.args, vec!["-ss", "10.000", "-t", "4.200"]);
    }

    #[test]
    fn test_program_name() {
        assert_eq!(builder().transcode("Trim").program_name(), "ffmpeg");
        assert_eq!(MediaCommand::new("C:/tools/ffmpeg.exe", "x").program_name(), "ffmpeg");
    }

    #[test]
    fn test_extract_subtitle() {
        let track = Track {
            kind: TrackKind::Subtitle,
            codec: "ass".to_string(),
            index: 3,
            selected: true,
        };
        let cmd = builder().extract_subtitle("/in.mkv", 12.5, 3.0, &track, "/tmp/out.ass");
        assert_eq!(
            cmd.args,
            vec!["-y", "-v", "error", "-ss", "12.500", "-i", "/in.mkv", "-t", "3.000", "-map", "0:3", "/tmp/out.ass"]
        );
    }

    #[test]
    fn test_probe_attachments() {
        let cmd = builder().probe_attachments("/in.mkv");
        assert_eq!(cmd.binary_path, "ffprobe");
        assert_eq!(
            cmd.args,
            vec![
                "-v",
                "error",
                "-select_streams",
                "t",
                "-show_entries",
                "stream=index:stream_tags=filename,mimetype",
                "-of",
                "json",
                "-i",
                "/in.mkv"
            ]
        );
    }

    #[test]
    fn test_dump_attachments() {
        let cmd = builder().dump_attachments(
            "/in.mkv",
            &[(4, PathBuf::from("/f/a.ttf")), (5, PathBuf::from("/f/b.otf"))],
        );
        assert_eq!(
            cmd.args,
            vec![
                "-y",
                "-v",
                "error",
                "-dump_attachment:4",
                "/f/a.ttf",
                "-dump_attachment:5",
                "/f/b.otf",
                "-i",
                "/in.mkv",
                "-t",
                "0",
                "-f",
                "null",
                "-"
            ]
        );
    }

    #[test]
    fn test_display_quotes_spaces() {
        let cmd = MediaCommand::new("ffmpeg", "x").output("/tmp/a b.webm");
        assert_eq!(cmd.to_string(), "ffmpeg \"/tmp/a b.webm\"");
    }
}
