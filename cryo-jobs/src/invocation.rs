use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Bad parameters for an external tool, caught before any argument
/// vector is built
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    #[error("{name} = {value} is out of range {range}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        range: &'static str,
    },

    #[error("{name} must not be empty")]
    Empty { name: &'static str },

    #[error("particle subset {subset} exceeds the {count} particles available")]
    SubsetTooLarge { subset: usize, count: usize },

    #[error("no `particles.cs` file among {0} candidates")]
    NoParticlesFile(usize),

    #[error("invalid GPU list `{0}`")]
    GpuList(Box<str>),
}

/// One external program call: program, argument vector, extra
/// environment and working directory. Never a shell string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInvocation {
    pub program: Box<str>,
    pub args: Vec<Box<str>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<Box<str>, Box<str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<Box<str>>,
}

impl ToolInvocation {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.into(),
            args: vec![],
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    pub fn arg<T: ToString>(mut self, arg: T) -> Self {
        self.args.push(arg.to_string().into());
        self
    }

    /// `flag value` pair
    pub fn opt<T: ToString>(self, flag: &str, value: T) -> Self {
        self.arg(flag).arg(value)
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn cwd(mut self, dir: &str) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn args_str(&self) -> Vec<&str> {
        self.args.iter().map(|x| x.as_ref()).collect()
    }
}

fn shell_word(word: &str) -> String {
    if !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./,=:@%+".contains(c))
    {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', "'\\''"))
    }
}

/// Copy-pasteable line for logs, quoting where a shell would need it
impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(cwd) = &self.cwd {
            write!(f, "(cd {} && ", shell_word(cwd))?;
        }
        for (k, v) in self.env.iter() {
            write!(f, "{}={} ", k, shell_word(v))?;
        }
        write!(f, "{}", shell_word(&self.program))?;
        for a in self.args.iter() {
            write!(f, " {}", shell_word(a))?;
        }
        if self.cwd.is_some() {
            write!(f, ")")?;
        }
        Ok(())
    }
}

pub(crate) fn check_range(
    name: &'static str,
    value: f64,
    ok: bool,
    range: &'static str,
) -> Result<(), ToolError> {
    if ok && value.is_finite() {
        Ok(())
    } else {
        Err(ToolError::OutOfRange { name, value, range })
    }
}

pub(crate) fn check_non_empty(name: &'static str, value: &str) -> Result<(), ToolError> {
    if value.trim().is_empty() {
        Err(ToolError::Empty { name })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_display() {
        let run = ToolInvocation::new("cryodrgn")
            .arg("train_vae")
            .opt("--zdim", 8)
            .opt("-o", "my out")
            .env("CUDA_VISIBLE_DEVICES", "2,3")
            .cwd("J12");

        assert_eq!(run.args_str(), vec!["train_vae", "--zdim", "8", "-o", "my out"]);
        assert_eq!(
            run.to_string(),
            "(cd J12 && CUDA_VISIBLE_DEVICES=2,3 cryodrgn train_vae --zdim 8 -o 'my out')"
        );
    }

    #[test]
    fn serialized_without_empty_parts() {
        let run = ToolInvocation::new("csparc2star.py").arg("a.cs");
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json, serde_json::json!({"program": "csparc2star.py", "args": ["a.cs"]}));
    }

    #[test]
    fn ranges() {
        assert!(check_range("x", 0.5, true, "(0, 1)").is_ok());
        assert!(check_range("x", f64::NAN, true, "(0, 1)").is_err());
        assert_eq!(
            check_non_empty("weights", " "),
            Err(ToolError::Empty { name: "weights" })
        );
    }
}
