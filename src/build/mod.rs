// Transcode command construction
//
// - Context: the per-request working state (request, maps, filters)
// - Filters: subtitle strategy, audio compatibility fix, stream maps
// - Fonts: recovery of fonts embedded in the source for burn-in
// - Args: output naming and the final ffmpeg argument vector

pub mod args;
pub mod context;
pub mod filters;
pub mod fonts;

pub use args::{effective_ext, output_path, render};
pub use context::{BuildContext, Filters, Maps, TrimMode, TrimRequest};
pub use filters::{FilterGraphBuilder, SubtitleStrategy, choose_strategy, escape_filter_value};
