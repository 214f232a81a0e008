//! Post-trim hooks.
//!
//! A hook specification is a `;`-separated list of commands, each a
//! `|`-separated list of argument tokens:
//!
//! ```text
//! notify-send|vtrim|<output>;cp|<output>|/mnt/clips/
//! ```
//!
//! Tokens are passed verbatim apart from placeholder substitution, so a
//! path containing spaces needs no quoting.

use std::path::Path;
use tracing::{info, warn};

use crate::media::{MediaCommand, ProcessRunner, RawOutput};

/// Placeholder replaced by the produced file's full path
pub const OUTPUT_PLACEHOLDER: &str = "<output>";

/// One post-processing command template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hook {
    pub tokens: Vec<String>,
}

impl Hook {
    /// First token before substitution, used to label results
    pub fn label(&self) -> &str {
        self.tokens.first().map(String::as_str).unwrap_or_default()
    }

    /// Substitute placeholders and drop tokens that end up empty
    pub fn render(&self, context: &HookContext) -> Vec<String> {
        self.tokens
            .iter()
            .map(|token| context.substitute(token))
            .filter(|token| !token.is_empty())
            .collect()
    }
}

/// Parse a hook specification. Malformed entries are skipped.
pub fn parse_hooks(spec: &str) -> Vec<Hook> {
    spec.split(';')
        .filter(|command| !command.trim().is_empty())
        .filter_map(|command| {
            let tokens: Vec<String> = command.split('|').map(str::to_string).collect();
            if tokens[0].trim().is_empty() {
                warn!("Ignoring hook without a command: '{}'", command);
                return None;
            }
            Some(Hook { tokens })
        })
        .collect()
}

/// Run-time values available to hook templates
#[derive(Debug, Clone, Default)]
pub struct HookContext {
    vars: Vec<(String, String)>,
}

impl HookContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context exposing the produced output path
    pub fn for_output(output: &Path) -> Self {
        Self::new().with(OUTPUT_PLACEHOLDER, output.to_string_lossy())
    }

    pub fn with<K: Into<String>, V: Into<String>>(mut self, placeholder: K, value: V) -> Self {
        self.vars.push((placeholder.into(), value.into()));
        self
    }

    pub fn substitute(&self, token: &str) -> String {
        self.vars
            .iter()
            .fold(token.to_string(), |acc, (placeholder, value)| acc.replace(placeholder.as_str(), value))
    }
}

/// Result of one hook invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookReport {
    pub label: String,
    pub success: bool,
    pub detail: String,
}

impl HookReport {
    pub fn message(&self) -> String {
        format!("[{}] {}", self.label, self.detail)
    }
}

fn report(label: &str, raw: RawOutput) -> HookReport {
    let (success, detail) = match raw {
        RawOutput::Exited { stderr, .. } if !stderr.trim().is_empty() => (false, stderr.trim().to_string()),
        RawOutput::Failed(error) => (false, error),
        RawOutput::Exited { code: None, .. } => (false, "terminated without an exit status".to_string()),
        RawOutput::Exited { code: Some(code), .. } if code != 0 => (false, format!("exited with status {}", code)),
        RawOutput::Exited { stdout, .. } if !stdout.trim().is_empty() => (true, stdout.trim().to_string()),
        RawOutput::Exited { .. } => (true, "no output".to_string()),
    };

    HookReport {
        label: label.to_string(),
        success,
        detail,
    }
}

/// Run hooks one after another. A failing hook does not stop the rest.
pub async fn run_hooks(runner: &dyn ProcessRunner, hooks: &[Hook], context: &HookContext) -> Vec<HookReport> {
    let mut reports = Vec::with_capacity(hooks.len());

    for hook in hooks {
        let label = hook.label();
        let argv = hook.render(context);

        let Some((program, args)) = argv.split_first() else {
            reports.push(HookReport {
                label: label.to_string(),
                success: false,
                detail: "nothing to run after substitution".to_string(),
            });
            continue;
        };

        let command = MediaCommand::new(program, format!("Hook {}", label)).args(args.iter().cloned());
        let result = report(label, runner.output(&command).await);

        if result.success {
            info!("Hook {}", result.message());
        } else {
            warn!("Hook {}", result.message());
        }
        reports.push(result);
    }

    reports
}
