use std::str::FromStr;

use clap::ValueEnum;
use serde::Deserialize;
use tracing::warn;

/// Environment variable that overrides `[config].on_dispatch_failure`.
pub const ON_DISPATCH_FAILURE_ENV: &str = "QBATCH_ON_DISPATCH_FAILURE";

/// What the runtime does when the submission port fails to dispatch a job.
///
/// - `Abort`: let the current wave finish, then stop and report the failure
///   (default behaviour).
/// - `Continue`: mark the job failed, skip everything that depends on it, and
///   keep submitting the rest of the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DispatchFailurePolicy {
    #[default]
    Abort,
    Continue,
}

impl DispatchFailurePolicy {
    /// Pick the policy from the CLI flag, then the environment value, then
    /// the batch file. An unparsable environment value is logged and skipped.
    pub fn resolve(cli: Option<Self>, env: Option<&str>, config: Self) -> Self {
        if let Some(policy) = cli {
            return policy;
        }
        if let Some(raw) = env {
            match raw.parse::<Self>() {
                Ok(policy) => return policy,
                Err(err) => warn!(
                    var = ON_DISPATCH_FAILURE_ENV,
                    value = %raw,
                    error = %err,
                    "ignoring invalid dispatch failure policy from environment"
                ),
            }
        }
        config
    }
}

impl FromStr for DispatchFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "abort" => Ok(DispatchFailurePolicy::Abort),
            "continue" => Ok(DispatchFailurePolicy::Continue),
            other => Err(format!(
                "invalid on_dispatch_failure: {other} (expected \"abort\" or \"continue\")"
            )),
        }
    }
}
