use std::path::Path;
use tracing::{debug, info};

use crate::build::{effective_ext, output_path, render, BuildContext, FilterGraphBuilder, TrimMode, TrimRequest};
use crate::config::Options;
use crate::error::{Result, VtrimError};
use crate::geometry::{self, Geometry};
use crate::hooks::{run_hooks, HookContext, HookReport};
use crate::host::{probe_host, HostState};
use crate::media::{log_invocation, run, CommandOutcome, ProcessRunner, ProcessRunnerFactory};
use crate::tracks;

/// Everything one trim action produced
#[derive(Debug, Clone)]
pub struct TrimReport {
    pub mode: TrimMode,
    pub outcome: CommandOutcome,
    /// Non-fatal problems met along the way
    pub notices: Vec<String>,
    pub hooks: Vec<HookReport>,
}

impl TrimReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

pub struct Trimmer {
    options: Options,
    runner: Box<dyn ProcessRunner>,
}

impl Trimmer {
    pub fn new(options: Options) -> Self {
        Self::with_runner(options, ProcessRunnerFactory::create_runner())
    }

    pub fn with_runner(options: Options, runner: Box<dyn ProcessRunner>) -> Self {
        Self { options, runner }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn runner(&self) -> &dyn ProcessRunner {
        self.runner.as_ref()
    }

    /// Validate an A-B range into a request. Never touches the runner.
    pub fn validate(&self, trim: Option<(f64, f64)>, mode: TrimMode) -> Result<TrimRequest> {
        let (start, end) = trim.ok_or(VtrimError::MissingBoundaries)?;
        TrimRequest::new(start, end, mode)
    }

    /// Validate the host's A-B range into a request
    pub fn request(&self, host: &HostState, mode: TrimMode) -> Result<TrimRequest> {
        self.validate(host.trim, mode)
    }

    /// Probe `input` for a validated request
    pub async fn snapshot(&self, input: &Path, request: &TrimRequest, select: &[u32]) -> Result<HostState> {
        probe_host(
            self.runner(),
            &self.options,
            input,
            Some((request.start, request.end)),
            select,
        )
        .await
    }

    /// Output size for the host geometry under the configured cap.
    /// A forced hint applies even when the geometry is unknown.
    fn output_size(&self, source: Option<Geometry>) -> Option<Geometry> {
        let hint = self.options.size_hint.as_ref()?;
        match source {
            Some(source) => Some(geometry::resolve(Some(hint), source)),
            None if hint.force => Some(hint.geometry()),
            None => None,
        }
    }

    /// Resolve naming, geometry, track maps and filters for one request
    pub async fn prepare(&self, host: &HostState, request: TrimRequest) -> BuildContext {
        let ext = effective_ext(&self.options.ext, &host.path);
        let output = output_path(
            &host.path,
            &ext,
            request.start,
            request.end,
            self.options.video_dir.as_deref(),
        );

        let mut context = BuildContext::new(host.path.clone(), output, request, ext);
        context.size = self.output_size(host.geometry);

        let selected = tracks::select(&host.tracks);
        FilterGraphBuilder::new(&self.options, self.runner())
            .apply(&mut context, &selected, host.audio_channels.as_deref())
            .await;

        context
    }

    /// Build and run the transcode for an already validated request.
    ///
    /// Hooks run only after an attached run that succeeded.
    pub async fn execute(&self, host: &HostState, request: TrimRequest) -> TrimReport {
        let context = self.prepare(host, request).await;
        let command = render(&self.options, &context);
        debug!("Trim command: {}", command);

        let detached = request.mode.detached;
        let outcome = run(self.runner(), &command, &context.output, detached).await;

        let mut notices = context.notices;
        if !detached {
            let log_path = self.options.log.then(|| self.options.log_path_for(&context.output));
            if let Some(notice) = log_invocation(log_path.as_deref(), &command, &outcome).await {
                notices.push(notice);
            }
        }

        let hooks = if outcome.is_success() && !outcome.is_detached() && !self.options.hooks.is_empty() {
            info!("Running {} hook(s)", self.options.hooks.len());
            run_hooks(self.runner(), &self.options.hooks, &HookContext::for_output(&context.output)).await
        } else {
            Vec::new()
        };

        TrimReport {
            mode: request.mode,
            outcome,
            notices,
            hooks,
        }
    }

    /// Validate and execute in one step
    pub async fn trim(&self, host: &HostState, mode: TrimMode) -> Result<TrimReport> {
        let request = self.request(host, mode)?;
        Ok(self.execute(host, request).await)
    }
}
