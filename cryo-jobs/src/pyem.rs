use crate::invocation::*;

/// `csparc2star.py` from pyem for a Select 2D job's particles
#[derive(Debug, Clone, PartialEq)]
pub struct Csparc2Star {
    pub pyem_dir: Box<str>,
    /// directory of the cryoSPARC job
    pub job_dir: Box<str>,
    pub job_uid: Box<str>,
    pub output_star: Box<str>,
}

impl Csparc2Star {
    pub fn particles_cs(&self) -> String {
        format!("{}/particles_selected.cs", self.job_dir.trim_end_matches('/'))
    }

    pub fn passthrough_cs(&self) -> String {
        format!(
            "{}/{}_passthrough_particles_selected.cs",
            self.job_dir.trim_end_matches('/'),
            self.job_uid
        )
    }

    pub fn invocation(&self) -> Result<ToolInvocation, ToolError> {
        check_non_empty("cryoSPARC job directory", &self.job_dir)?;
        check_non_empty("cryoSPARC job id", &self.job_uid)?;
        check_non_empty("output STAR file", &self.output_star)?;

        let program = if self.pyem_dir.is_empty() {
            "csparc2star.py".to_string()
        } else {
            format!("{}/csparc2star.py", self.pyem_dir.trim_end_matches('/'))
        };

        Ok(ToolInvocation::new(&program)
            .arg(self.particles_cs())
            .arg(self.passthrough_cs())
            .arg(&self.output_star))
    }
}
