// src/submit/dry_run.rs

use tracing::info;

use crate::submit::layout::BatchLayout;
use crate::submit::port::{
    DispatchFuture, DispatchHandle, DispatchRequest, SubmissionPort,
};
use crate::submit::sge::{qsub_args, render_command_line, SgeOptions};

/// Port that prints the `qsub` command each job would get and touches
/// nothing. Never fails.
#[derive(Debug, Clone)]
pub struct DryRunSubmitter {
    layout: BatchLayout,
    options: SgeOptions,
}

impl DryRunSubmitter {
    pub fn new(layout: BatchLayout, options: SgeOptions) -> Self {
        Self { layout, options }
    }
}

impl SubmissionPort for DryRunSubmitter {
    fn dispatch<'a>(&'a self, request: &'a DispatchRequest) -> DispatchFuture<'a> {
        Box::pin(async move {
            let script_path = self.layout.script_path(&request.name);
            let args = qsub_args(request, &self.layout, &self.options, &script_path);
            let command_line = render_command_line(&self.options.qsub, &args);

            info!(job = %request.name, "dry-run: not submitting");
            println!("{command_line}");

            Ok(DispatchHandle {
                job: request.name.clone(),
                external_id: None,
                command_line,
            })
        })
    }
}
