//! Capability port that spawns handler processes directly.
//!
//! The query and timestamp are appended as their own argv entries. Nothing
//! goes through a shell, so quotes or `;` in a query are just text.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

use crate::capability::Capability;
use crate::config::{HandlerCommand, HandlerConfig};

use super::error::{InvocationError, parse_output};
use super::{CapabilityPort, HandlerRequest, InvokeFuture};

/// Spawns one handler process per invocation.
#[derive(Clone, Debug)]
pub struct ProcessPort {
    mail: HandlerCommand,
    calendar: HandlerCommand,
    web_search: HandlerCommand,
    working_dir: Option<PathBuf>,
}

impl ProcessPort {
    /// Build a port from explicit commands.
    #[must_use]
    pub const fn new(
        mail: HandlerCommand,
        calendar: HandlerCommand,
        web_search: HandlerCommand,
        working_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            mail,
            calendar,
            web_search,
            working_dir,
        }
    }

    /// Build a port from handler configuration.
    #[must_use]
    pub fn from_config(config: &HandlerConfig) -> Self {
        Self::new(
            config.mail.clone(),
            config.calendar.clone(),
            config.web_search.clone(),
            config.working_dir.clone(),
        )
    }

    const fn command(&self, capability: Capability) -> &HandlerCommand {
        match capability {
            Capability::Mail => &self.mail,
            Capability::Calendar => &self.calendar,
            Capability::WebSearch => &self.web_search,
        }
    }

    /// Full argv (after the program) for one request.
    #[must_use]
    pub fn argv(&self, capability: Capability, request: &HandlerRequest) -> Vec<String> {
        let mut args = self.command(capability).args.clone();
        args.push(request.message.clone());
        if let Some(time) = &request.time {
            args.push(time.clone());
        }
        args
    }

    async fn run(&self, capability: Capability, request: &HandlerRequest) -> Result<serde_json::Value, InvocationError> {
        let command = self.command(capability);
        let mut process = Command::new(&command.program);
        process
            .args(self.argv(capability, request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            process.current_dir(dir);
        }

        let output = process.output().await.map_err(|e| {
            InvocationError::process_failure(format!("failed to start {}: {e}", command.program))
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let diagnostic = if stderr.trim().is_empty() { stdout } else { stderr };
            tracing::debug!(%capability, status = %output.status, "handler exited unsuccessfully");
            return Err(InvocationError::process_failure(diagnostic));
        }

        parse_output(&stdout)
    }
}

impl CapabilityPort for ProcessPort {
    fn search_mail<'a>(&'a self, request: &'a HandlerRequest) -> InvokeFuture<'a> {
        Box::pin(self.run(Capability::Mail, request))
    }

    fn search_calendar<'a>(&'a self, request: &'a HandlerRequest) -> InvokeFuture<'a> {
        Box::pin(self.run(Capability::Calendar, request))
    }

    fn web_search<'a>(&'a self, request: &'a HandlerRequest) -> InvokeFuture<'a> {
        Box::pin(self.run(Capability::WebSearch, request))
    }
}
