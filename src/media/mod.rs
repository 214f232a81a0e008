// External process plumbing
//
// - Commands: argument-vector builders for ffmpeg/ffprobe
// - Processor: process execution, outcome classification and diagnostic logs

pub mod commands;
pub mod processor;

pub use commands::*;
pub use processor::*;

/// Factory for the process runner used outside of tests
pub struct ProcessRunnerFactory;

impl ProcessRunnerFactory {
    /// Create the default runner (real child processes)
    pub fn create_runner() -> Box<dyn ProcessRunner> {
        Box::new(SystemRunner)
    }
}
