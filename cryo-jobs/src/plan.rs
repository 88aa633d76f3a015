use crate::common::*;
use crate::config::{PlatformConfig, PlatformTarget, DEFAULT_BASE_PORT};
use crate::invocation::ToolInvocation;

use serde::Serialize;
use std::io::Write;

/// What to link into a job directory
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkSource {
    Files { files: Vec<Box<str>> },
    /// every `*.<extension>` in `dir`
    Dir { dir: Box<str>, extension: Box<str> },
    /// the stack directory named by the first `ImageName` of
    /// `star_file`, under `project_dir`
    ParticleStack {
        star_file: Box<str>,
        project_dir: Box<str>,
    },
}

/// One step for an external executor, run in order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum PlanStep {
    /// block until the platform job completes
    WaitFor { job_id: Box<str> },
    LinkInputs {
        source: LinkSource,
        target_dir: Box<str>,
        /// rename links from `.mrc` to `.mrcs`
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        as_mrcs: bool,
    },
    Run(ToolInvocation),
    Note { message: Box<str> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobPlan {
    pub title: Box<str>,
    pub project: Box<str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<Box<str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<PlatformTarget>,
    pub steps: Vec<PlanStep>,
}

impl JobPlan {
    pub fn new(title: &str, project: &str, workspace: Option<&str>) -> Self {
        Self {
            title: title.into(),
            project: project.into(),
            workspace: workspace.map(|x| x.into()),
            platform: None,
            steps: vec![],
        }
    }

    pub fn wait_for(&mut self, job_id: &str) -> &mut Self {
        self.steps.push(PlanStep::WaitFor {
            job_id: job_id.into(),
        });
        self
    }

    pub fn link(&mut self, source: LinkSource, target_dir: &str) -> &mut Self {
        self.steps.push(PlanStep::LinkInputs {
            source,
            target_dir: target_dir.into(),
            as_mrcs: false,
        });
        self
    }

    pub fn link_as_mrcs(&mut self, source: LinkSource, target_dir: &str) -> &mut Self {
        self.steps.push(PlanStep::LinkInputs {
            source,
            target_dir: target_dir.into(),
            as_mrcs: true,
        });
        self
    }

    pub fn run(&mut self, invocation: ToolInvocation) -> &mut Self {
        info!("{}", invocation);
        self.steps.push(PlanStep::Run(invocation));
        self
    }

    pub fn note(&mut self, message: &str) -> &mut Self {
        self.steps.push(PlanStep::Note {
            message: message.into(),
        });
        self
    }

    pub fn invocations(&self) -> impl Iterator<Item = &ToolInvocation> {
        self.steps.iter().filter_map(|s| match s {
            PlanStep::Run(x) => Some(x),
            _ => None,
        })
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Pretty JSON to `output` (`stdout` when `-`)
    pub fn write(&self, output: &str) -> anyhow::Result<()> {
        let output = if output == "-" { "stdout" } else { output };
        if output != "stdout" {
            io::mkdir_parent(output)?;
        }
        let mut buf = io::open_buf_writer(output)?;
        writeln!(buf, "{}", self.to_json()?)?;
        buf.flush()?;
        info!(
            "{} steps ({} tool runs) written to {}",
            self.steps.len(),
            self.invocations().count(),
            output
        );
        Ok(())
    }
}

/// Platform connection flags shared by every `plan-*` command
#[derive(Args, Debug, Clone)]
pub struct PlatformArgs {
    /// dotenv file with the `CRYOSPARC_*` login keys
    #[arg(long)]
    pub env_file: Option<Box<str>>,

    /// cryoSPARC base port
    #[arg(long, default_value_t = DEFAULT_BASE_PORT)]
    pub baseport: u16,
}

impl PlatformArgs {
    pub fn target(&self) -> anyhow::Result<Option<PlatformTarget>> {
        match &self.env_file {
            Some(env_file) => {
                let config = PlatformConfig::from_env_file(env_file, self.baseport)?;
                info!("platform: {}:{}", config.host, config.base_port);
                Ok(Some(config.target()))
            }
            None => Ok(None),
        }
    }
}

/// Call back into this program from a plan step
pub fn self_invocation(subcommand: &str) -> ToolInvocation {
    ToolInvocation::new(env!("CARGO_PKG_NAME")).arg(subcommand)
}

/// `dir/name` without doubling the separator
pub fn join_dir(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), name)
    }
}
