use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Result, VtrimError};
use crate::media::{run, MediaCommandBuilder, ProcessRunner};

/// Attachment mimetypes treated as fonts
pub const FONT_MIME_TYPES: [&str; 3] = [
    "application/x-truetype-font",
    "application/vnd.ms-opentype",
    "application/font-sfnt",
];

// Structs for parsing `ffprobe -show_entries stream=index:stream_tags=... -of json`
#[derive(Debug, Deserialize)]
struct AttachmentReport {
    #[serde(default)]
    streams: Vec<AttachmentStream>,
}

#[derive(Debug, Deserialize)]
struct AttachmentStream {
    index: u32,
    #[serde(default)]
    tags: AttachmentTags,
}

#[derive(Debug, Default, Deserialize)]
struct AttachmentTags {
    filename: Option<String>,
    mimetype: Option<String>,
}

/// A font stream embedded in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontAttachment {
    pub index: u32,
    pub filename: String,
}

/// Pick font attachments out of an ffprobe JSON report
pub fn parse_font_attachments(json: &str) -> Result<Vec<FontAttachment>> {
    let report: AttachmentReport = serde_json::from_str(json)?;

    let fonts = report
        .streams
        .into_iter()
        .filter(|stream| {
            stream
                .tags
                .mimetype
                .as_deref()
                .is_some_and(|mime| FONT_MIME_TYPES.iter().any(|m| m.eq_ignore_ascii_case(mime)))
        })
        .filter_map(|stream| {
            // Only keep the final component so a tag cannot escape the fonts directory
            let filename = Path::new(stream.tags.filename.as_deref()?)
                .file_name()?
                .to_string_lossy()
                .to_string();
            Some(FontAttachment {
                index: stream.index,
                filename,
            })
        })
        .collect();

    Ok(fonts)
}

/// Probe `input` for embedded fonts and dump them into `fonts_dir`.
///
/// Returns how many fonts were written. Any failure is returned as an error
/// for the caller to downgrade.
pub async fn recover_fonts(
    runner: &dyn ProcessRunner,
    commands: &MediaCommandBuilder,
    input: &Path,
    fonts_dir: &Path,
) -> Result<usize> {
    let probe = commands.probe_attachments(input);
    let json = runner
        .output(&probe)
        .await
        .into_stdout()
        .map_err(|e| VtrimError::Probe(format!("Attachment probe failed: {}", e)))?;

    let fonts = parse_font_attachments(&json)?;
    if fonts.is_empty() {
        debug!("No embedded fonts in {}", input.display());
        return Ok(0);
    }

    tokio::fs::create_dir_all(fonts_dir).await?;

    let targets: Vec<(u32, PathBuf)> = fonts
        .iter()
        .map(|font| (font.index, fonts_dir.join(&font.filename)))
        .collect();

    let dump = commands.dump_attachments(input, &targets);
    let outcome = run(runner, &dump, fonts_dir, false).await;
    if !outcome.is_success() {
        return Err(VtrimError::Media(format!("Font dump failed: {}", outcome.message())));
    }

    info!("Recovered {} embedded fonts into {}", fonts.len(), fonts_dir.display());
    Ok(fonts.len())
}
