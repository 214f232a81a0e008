use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{Result, VtrimError};
use crate::geometry::{parse_size_hint, SizeHint};
use crate::hooks::{parse_hooks, Hook};

/// Profile used when none is requested
pub const DEFAULT_PROFILE: &str = "default";

/// Configuration file looked up in the current directory
pub const DEFAULT_CONFIG_FILE: &str = "vtrim.toml";

/// One profile table of the configuration document.
///
/// Every key is optional. A present key replaces the built-in default as a
/// whole; an empty string clears an optional value. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    /// Path to ffmpeg binary
    pub ffmpeg: Option<String>,
    /// Path to ffprobe binary
    pub ffprobe: Option<String>,
    /// Output container extension; empty reuses the input extension
    pub ext: Option<String>,
    /// ffmpeg `-v` level
    pub loglevel: Option<String>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub subtitle_codec: Option<String>,
    pub video_bitrate: Option<String>,
    pub audio_bitrate: Option<String>,
    /// Constant rate factor
    pub quality: Option<u32>,
    pub threads: Option<u32>,
    /// `W:H[:force]` or `WxH[:force]`; anything else disables the cap
    pub size_hint: Option<String>,
    /// Overwrite existing outputs instead of failing
    pub overwrite: Option<bool>,
    /// Burn text subtitles into the video
    pub burn_subs: Option<bool>,
    /// Extract fonts embedded in the source before burning subtitles
    pub embedded_fonts: Option<bool>,
    /// Font family used when no embedded fonts could be recovered
    pub fallback_font: Option<String>,
    pub fonts_dir: Option<PathBuf>,
    pub subs_dir: Option<PathBuf>,
    pub video_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    /// `cmd|arg|<output>;cmd2|...`
    pub hooks: Option<String>,
    /// Write a per-output diagnostic log
    pub log: Option<bool>,
}

/// Resolved, read-only configuration for the whole run
#[derive(Debug, Clone)]
pub struct Options {
    pub ffmpeg: String,
    pub ffprobe: String,
    pub ext: String,
    pub loglevel: String,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub subtitle_codec: Option<String>,
    pub video_bitrate: Option<String>,
    pub audio_bitrate: Option<String>,
    pub quality: Option<u32>,
    pub threads: Option<u32>,
    pub size_hint: Option<SizeHint>,
    pub overwrite: bool,
    pub burn_subs: bool,
    pub embedded_fonts: bool,
    pub fallback_font: Option<String>,
    pub fonts_dir: Option<PathBuf>,
    pub subs_dir: Option<PathBuf>,
    pub video_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub hooks: Vec<Hook>,
    pub log: bool,
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() { None } else { Some(value) }
}

fn non_empty_path(value: PathBuf) -> Option<PathBuf> {
    if value.as_os_str().is_empty() { None } else { Some(value) }
}

impl Default for Options {
    fn default() -> Self {
        Self::from_profile(Profile::default())
    }
}

impl Options {
    /// Merge a profile over the built-in defaults
    pub fn from_profile(profile: Profile) -> Self {
        let size_hint_value = profile.size_hint.unwrap_or_else(|| "1280:720".to_string());
        let size_hint = parse_size_hint(&size_hint_value);
        if size_hint.is_none() && !size_hint_value.trim().is_empty() {
            warn!("Ignoring invalid size hint '{}', output size is not capped", size_hint_value);
        }

        let hooks = profile
            .hooks
            .as_deref()
            .map(parse_hooks)
            .unwrap_or_default();

        Self {
            ffmpeg: profile.ffmpeg.and_then(non_empty).unwrap_or_else(|| "ffmpeg".to_string()),
            ffprobe: profile.ffprobe.and_then(non_empty).unwrap_or_else(|| "ffprobe".to_string()),
            ext: profile.ext.unwrap_or_else(|| "webm".to_string()),
            loglevel: profile.loglevel.and_then(non_empty).unwrap_or_else(|| "error".to_string()),
            video_codec: profile.video_codec.and_then(non_empty),
            audio_codec: profile.audio_codec.and_then(non_empty),
            subtitle_codec: profile.subtitle_codec.and_then(non_empty),
            video_bitrate: match profile.video_bitrate {
                Some(bitrate) => non_empty(bitrate),
                None => Some("1M".to_string()),
            },
            audio_bitrate: profile.audio_bitrate.and_then(non_empty),
            quality: profile.quality,
            threads: profile.threads,
            size_hint,
            overwrite: profile.overwrite.unwrap_or(false),
            burn_subs: profile.burn_subs.unwrap_or(false),
            embedded_fonts: profile.embedded_fonts.unwrap_or(true),
            fallback_font: profile.fallback_font.and_then(non_empty),
            fonts_dir: profile.fonts_dir.and_then(non_empty_path),
            subs_dir: profile.subs_dir.and_then(non_empty_path),
            video_dir: profile.video_dir.and_then(non_empty_path),
            log_dir: profile.log_dir.and_then(non_empty_path),
            hooks,
            log: profile.log.unwrap_or(false),
        }
    }

    /// Parse a configuration document and pick one profile table
    pub fn from_document(content: &str, profile_name: &str) -> Result<Self> {
        let document: toml::Table = toml::from_str(content)?;

        let profile: Profile = match document.get(profile_name) {
            Some(value @ toml::Value::Table(_)) => value
                .clone()
                .try_into()
                .map_err(|e| VtrimError::Config(format!("Invalid profile '{}': {}", profile_name, e)))?,
            Some(_) => {
                return Err(VtrimError::Config(format!(
                    "Profile '{}' is not a table",
                    profile_name
                )));
            }
            None => {
                return Err(VtrimError::Config(format!(
                    "Profile '{}' not found",
                    profile_name
                )));
            }
        };

        Ok(Self::from_profile(profile))
    }

    pub fn from_file<P: AsRef<Path>>(path: P, profile_name: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| VtrimError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_document(&content, profile_name)
    }

    /// Resolve options once at startup. Never fails: any problem with the
    /// document falls back to the built-in defaults.
    pub fn load(path: Option<&Path>, requested_profile: Option<&str>) -> Self {
        let profile_name = requested_profile.unwrap_or(DEFAULT_PROFILE);

        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !local.exists() {
                    if let Some(message) = ignored_profile_message(requested_profile) {
                        warn!("{}", message);
                    }
                    return Self::default();
                }
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                local
            }
        };

        match Self::from_file(&path, profile_name) {
            Ok(options) => {
                info!("Loaded profile '{}' from {}", profile_name, path.display());
                options
            }
            Err(e) => {
                warn!("{}; using default options", e);
                Self::default()
            }
        }
    }

    /// Scratch space for intermediate artifacts
    pub fn work_dir() -> PathBuf {
        std::env::temp_dir().join("vtrim")
    }

    /// Directory receiving fonts recovered for `output`
    pub fn fonts_dir_for(&self, output: &Path) -> PathBuf {
        let base = self
            .fonts_dir
            .clone()
            .unwrap_or_else(|| Self::work_dir().join("fonts"));
        base.join(file_stem(output))
    }

    /// Standalone subtitle file extracted for `output`
    pub fn subtitle_path_for(&self, output: &Path) -> PathBuf {
        let base = self
            .subs_dir
            .clone()
            .unwrap_or_else(|| Self::work_dir().join("subs"));
        base.join(format!("{}.ass", file_stem(output)))
    }

    /// Diagnostic log file for `output`
    pub fn log_path_for(&self, output: &Path) -> PathBuf {
        let file_name = output
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "vtrim".to_string());
        let base = match &self.log_dir {
            Some(dir) => dir.clone(),
            None => output.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        base.join(format!("{}.log", file_name))
    }
}

/// Warning for a profile requested while no configuration file exists
fn ignored_profile_message(requested_profile: Option<&str>) -> Option<String> {
    requested_profile.map(|name| {
        format!(
            "Profile '{}' ignored: no --config given and no {} in the current directory",
            name, DEFAULT_CONFIG_FILE
        )
    })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "vtrim".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.ffmpeg, "ffmpeg");
        assert_eq!(options.ext, "webm");
        assert_eq!(options.loglevel, "error");
        assert_eq!(options.video_bitrate.as_deref(), Some("1M"));
        assert_eq!(options.size_hint.map(|h| (h.width, h.height, h.force)), Some((1280, 720, false)));
        assert!(!options.overwrite);
        assert!(options.embedded_fonts);
        assert!(options.hooks.is_empty());
    }

    #[test]
    fn test_profile_overrides_are_shallow() {
        let document = r#"
            [default]
            ext = "mp4"

            [hq]
            video_codec = "libx264"
            video_bitrate = ""
            quality = 18
            size_hint = "1920x1080:force"
            hooks = "notify-send|<output>"
            unknown_key = "ignored"
        "#;

        let options = Options::from_document(document, "hq").unwrap();
        assert_eq!(options.video_codec.as_deref(), Some("libx264"));
        assert_eq!(options.video_bitrate, None);
        assert_eq!(options.quality, Some(18));
        assert_eq!(options.size_hint.map(|h| h.force), Some(true));
        assert_eq!(options.hooks.len(), 1);
        // Not inherited from the [default] table
        assert_eq!(options.ext, "webm");
    }

    #[test]
    fn test_invalid_size_hint_disables_cap() {
        let document = "[default]\nsize_hint = \"1281:720\"\n";
        let options = Options::from_document(document, DEFAULT_PROFILE).unwrap();
        assert_eq!(options.size_hint, None);
    }

    #[test]
    fn test_missing_profile_is_error() {
        let result = Options::from_document("[default]\next = \"mkv\"\n", "missing");
        assert!(matches!(result, Err(VtrimError::Config(_))));
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = temp.child("vtrim.toml");
        config.write_str("[default\next = ").unwrap();

        let options = Options::load(Some(config.path()), None);
        assert_eq!(options.ext, "webm");

        let options = Options::load(Some(temp.child("absent.toml").path()), None);
        assert_eq!(options.ffmpeg, "ffmpeg");
    }

    #[test]
    fn test_requested_profile_without_document_is_reported() {
        assert_eq!(ignored_profile_message(None), None);
        let message = ignored_profile_message(Some("mobile")).unwrap();
        assert!(message.starts_with("Profile 'mobile' ignored"));
        assert!(message.contains("vtrim.toml"));
    }

    #[test]
    fn test_load_selected_profile() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = temp.child("vtrim.toml");
        config
            .write_str("[default]\next = \"mkv\"\n[fast]\nthreads = 4\noverwrite = true\n")
            .unwrap();

        let options = Options::load(Some(config.path()), Some("fast"));
        assert_eq!(options.threads, Some(4));
        assert!(options.overwrite);
        assert_eq!(options.ext, "webm");

        let options = Options::load(Some(config.path()), None);
        assert_eq!(options.ext, "mkv");
    }

    #[test]
    fn test_artifact_paths_follow_output_name() {
        let options = Options {
            fonts_dir: Some(PathBuf::from("/var/fonts")),
            subs_dir: Some(PathBuf::from("/var/subs")),
            ..Options::default()
        };
        let output = Path::new("/videos/clip [1.000-2.000].webm");

        assert_eq!(options.fonts_dir_for(output), PathBuf::from("/var/fonts/clip [1.000-2.000]"));
        assert_eq!(options.subtitle_path_for(output), PathBuf::from("/var/subs/clip [1.000-2.000].ass"));
        assert_eq!(options.log_path_for(output), PathBuf::from("/videos/clip [1.000-2.000].webm.log"));
    }
}
