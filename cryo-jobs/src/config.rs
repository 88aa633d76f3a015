use crate::common::*;
use serde::Serialize;
use std::collections::HashMap;

pub const DEFAULT_BASE_PORT: u16 = 39000;

const LICENSE_ID: &str = "CRYOSPARC_LICENSE_ID";
const HOST: &str = "CRYOSPARC_HOST";
const EMAIL: &str = "CRYOSPARC_EMAIL";
const PASSWORD: &str = "CRYOSPARC_PASSWORD";

/// Connection settings for the job platform
#[derive(Clone, PartialEq)]
pub struct PlatformConfig {
    pub license_id: Box<str>,
    pub host: Box<str>,
    pub email: Box<str>,
    password: Box<str>,
    pub base_port: u16,
}

/// The part of [`PlatformConfig`] that goes into a job plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformTarget {
    pub host: Box<str>,
    pub base_port: u16,
    pub email: Box<str>,
}

impl std::fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("license_id", &self.license_id)
            .field("host", &self.host)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("base_port", &self.base_port)
            .finish()
    }
}

impl PlatformConfig {
    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn target(&self) -> PlatformTarget {
        PlatformTarget {
            host: self.host.clone(),
            base_port: self.base_port,
            email: self.email.clone(),
        }
    }

    /// Take the four `CRYOSPARC_*` keys out of dotenv-style pairs
    pub fn from_pairs(pairs: &HashMap<Box<str>, Box<str>>, base_port: u16) -> anyhow::Result<Self> {
        let get = |key: &str| -> anyhow::Result<Box<str>> {
            pairs
                .get(key)
                .cloned()
                .ok_or(anyhow::anyhow!("missing {} in the environment file", key))
        };

        Ok(Self {
            license_id: get(LICENSE_ID)?,
            host: get(HOST)?,
            email: get(EMAIL)?,
            password: get(PASSWORD)?,
            base_port,
        })
    }

    pub fn from_env_file(env_file: &str, base_port: u16) -> anyhow::Result<Self> {
        let text = io::read_to_string(env_file)?;
        let pairs = parse_dotenv(&text).map_err(|e| anyhow::anyhow!("{}: {}", env_file, e))?;
        Self::from_pairs(&pairs, base_port)
    }
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    for q in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(q) && value.ends_with(q) {
            return &value[1..value.len() - 1];
        }
    }
    // unquoted values may carry a trailing comment
    match value.find(" #") {
        Some(pos) => value[..pos].trim_end(),
        None => value,
    }
}

/// `KEY=value` lines, with `#` comments, blank lines, an optional
/// `export ` prefix and quoted values
pub fn parse_dotenv(text: &str) -> anyhow::Result<HashMap<Box<str>, Box<str>>> {
    let mut pairs = HashMap::new();

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let (key, value) = line
            .split_once('=')
            .ok_or(anyhow::anyhow!("line {}: expected KEY=value", lineno + 1))?;

        let key = key.trim();
        if key.is_empty() {
            return Err(anyhow::anyhow!("line {}: empty key", lineno + 1));
        }
        pairs.insert(key.into(), unquote(value).into());
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENV: &str = "# platform login\n\
                       CRYOSPARC_LICENSE_ID=abc-123\n\
                       export CRYOSPARC_HOST=\"cryo.lab.org\"\n\
                       CRYOSPARC_EMAIL='me@lab.org'\n\
                       \n\
                       CRYOSPARC_PASSWORD=s3cret # not shared\n";

    #[test]
    fn reads_keys_and_quotes() {
        let pairs = parse_dotenv(ENV).unwrap();
        let config = PlatformConfig::from_pairs(&pairs, DEFAULT_BASE_PORT).unwrap();
        assert_eq!(config.license_id.as_ref(), "abc-123");
        assert_eq!(config.host.as_ref(), "cryo.lab.org");
        assert_eq!(config.email.as_ref(), "me@lab.org");
        assert_eq!(config.password(), "s3cret");
        assert_eq!(config.base_port, 39000);
    }

    #[test]
    fn password_never_shows() {
        let pairs = parse_dotenv(ENV).unwrap();
        let config = PlatformConfig::from_pairs(&pairs, 40000).unwrap();

        assert!(!format!("{:?}", config).contains("s3cret"));

        let json = serde_json::to_string(&config.target()).unwrap();
        assert!(!json.contains("s3cret"));
        assert!(json.contains("40000"));
    }

    #[test]
    fn missing_key_is_named() {
        let pairs = parse_dotenv("CRYOSPARC_HOST=x\n").unwrap();
        let err = PlatformConfig::from_pairs(&pairs, DEFAULT_BASE_PORT).unwrap_err();
        assert!(err.to_string().contains(LICENSE_ID));
    }

    #[test]
    fn malformed_line() {
        assert!(parse_dotenv("JUSTAKEY\n").is_err());
        assert!(parse_dotenv("=value\n").is_err());
    }

    #[test]
    fn from_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join(".env");
        std::fs::write(&file, ENV)?;
        let config = PlatformConfig::from_env_file(file.to_str().unwrap(), DEFAULT_BASE_PORT)?;
        assert_eq!(config.target().host.as_ref(), "cryo.lab.org");
        Ok(())
    }
}
