use std::{fs, io, net::SocketAddr, path::Path, time::Duration};

use anyhow::{bail, Context};
use serde::Deserialize;
use tabular::PREVIEW_PAGE_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_bind: String,
    pub max_upload_bytes: usize,
    pub preview_page_size: usize,
    pub session_idle_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8050".into(),
            max_upload_bytes: 16 * 1024 * 1024,
            preview_page_size: PREVIEW_PAGE_SIZE,
            session_idle_secs: 60 * 60,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    bind_addr: Option<String>,
    max_upload_bytes: Option<usize>,
    preview_page_size: Option<usize>,
    session_idle_secs: Option<u64>,
}

/// Defaults, then `server.toml` in the working directory, then environment.
pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from(Path::new("server.toml"), |key| std::env::var(key).ok())
}

pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => {
            let file_cfg: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("failed to parse '{}'", path.display()))?;
            if let Some(v) = file_cfg.bind_addr {
                settings.server_bind = v;
            }
            if let Some(v) = file_cfg.max_upload_bytes {
                settings.max_upload_bytes = v;
            }
            if let Some(v) = file_cfg.preview_page_size {
                settings.preview_page_size = v;
            }
            if let Some(v) = file_cfg.session_idle_secs {
                settings.session_idle_secs = v;
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read '{}'", path.display()));
        }
    }

    if let Some(v) = env("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = env("APP__MAX_UPLOAD_BYTES") {
        settings.max_upload_bytes = v
            .parse()
            .with_context(|| format!("APP__MAX_UPLOAD_BYTES is not a byte count: '{v}'"))?;
    }
    if let Some(v) = env("APP__PREVIEW_PAGE_SIZE") {
        settings.preview_page_size = v
            .parse()
            .with_context(|| format!("APP__PREVIEW_PAGE_SIZE is not a number: '{v}'"))?;
    }

    if let Some(v) = env("APP__SESSION_IDLE_SECS") {
        settings.session_idle_secs = v
            .parse()
            .with_context(|| format!("APP__SESSION_IDLE_SECS is not a number: '{v}'"))?;
    }

    if settings.preview_page_size == 0 {
        bail!("preview_page_size must be at least 1");
    }
    if settings.session_idle_secs == 0 {
        bail!("session_idle_secs must be at least 1");
    }

    Ok(settings)
}

impl Settings {
    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }
}

pub fn parse_bind_addr(raw: &str) -> anyhow::Result<SocketAddr> {
    raw.trim()
        .parse()
        .with_context(|| format!("invalid bind address '{raw}'"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
