use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::time::Duration;

use anyhow::{
  Context,
  anyhow
};
use chrono_tz::Tz;
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::datetime::resolve_timezone;

const ENV_CONFIG: &str =
  "ZENLIST_CONFIG";
const ENV_GRAPHQL_URL: &str =
  "ZENLIST_GRAPHQL_URL";
const ENV_TIMEZONE: &str =
  "ZENLIST_TIMEZONE";

const DEFAULTS: [(&str, &str); 7] = [
  (
    "graphql.origin",
    "http://localhost:8080"
  ),
  ("graphql.endpoint", "/query"),
  ("page.projects", "100"),
  ("page.labels", "200"),
  ("page.tasks", "200"),
  ("http.timeout_secs", "30"),
  ("time.zone", "UTC")
];

/// Page sizes sent as `first` on each
/// collection query.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct PageSizes {
  pub projects: usize,
  pub labels:   usize,
  pub tasks:    usize
}

impl Default for PageSizes {
  fn default() -> Self {
    Self {
      projects: 100,
      labels:   200,
      tasks:    200
    }
  }
}

#[derive(Debug, Clone)]
pub struct Config {
  map:              HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    Self {
      map:          DEFAULTS
        .iter()
        .map(|(k, v)| {
          (k.to_string(), v.to_string())
        })
        .collect(),
      loaded_files: vec![]
    }
  }
}

impl Config {
  /// Defaults, then the rc file, then
  /// the process environment.
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let env_rc = std::env::var(ENV_CONFIG)
      .ok()
      .map(PathBuf::from);
    let rc = resolve_rc_path(
      rc_override,
      env_rc
    )?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading zenlistrc");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no zenlistrc found; using \
         defaults"
      );
    }

    cfg.apply_env(std::env::vars());
    Ok(cfg)
  }

  /// Picks the recognised variables out
  /// of an environment listing.
  pub fn apply_env<I>(
    &mut self,
    vars: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (name, value) in vars {
      let key = match name.as_str() {
        | ENV_GRAPHQL_URL => "graphql.url",
        | ENV_TIMEZONE => "time.zone",
        | _ => continue
      };
      if value.trim().is_empty() {
        continue;
      }
      debug!(env = %name, key, "config from environment");
      self
        .map
        .insert(key.to_string(), value);
    }
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> Option<bool> {
    self
      .map
      .get(key)
      .map(|v| parse_bool(v))
  }

  /// Absolute graph endpoint. A full
  /// `graphql.url` wins; otherwise a
  /// relative `graphql.endpoint` is
  /// joined onto `graphql.origin`.
  pub fn endpoint_url(
    &self
  ) -> anyhow::Result<String> {
    if let Some(url) =
      self.get("graphql.url")
    {
      return Ok(url.trim().to_string());
    }

    let endpoint = self
      .get("graphql.endpoint")
      .unwrap_or_default();
    let endpoint = endpoint.trim();
    if is_absolute_url(endpoint) {
      return Ok(endpoint.to_string());
    }

    let origin = self
      .get("graphql.origin")
      .ok_or_else(|| {
        anyhow!(
          "graphql.origin is required \
           for a relative endpoint"
        )
      })?;
    let origin = origin.trim();
    if !is_absolute_url(origin) {
      return Err(anyhow!(
        "graphql.origin must be an \
         http(s) URL, got: {origin}"
      ));
    }

    Ok(format!(
      "{}/{}",
      origin.trim_end_matches('/'),
      endpoint.trim_start_matches('/')
    ))
  }

  pub fn page_sizes(
    &self
  ) -> anyhow::Result<PageSizes> {
    let defaults = PageSizes::default();
    Ok(PageSizes {
      projects: self.get_usize(
        "page.projects",
        defaults.projects
      )?,
      labels:   self.get_usize(
        "page.labels",
        defaults.labels
      )?,
      tasks:    self.get_usize(
        "page.tasks",
        defaults.tasks
      )?
    })
  }

  pub fn http_timeout(
    &self
  ) -> anyhow::Result<Duration> {
    let secs = self
      .get_usize("http.timeout_secs", 30)?;
    Ok(Duration::from_secs(secs as u64))
  }

  pub fn display_timezone(&self) -> Tz {
    resolve_timezone(
      self.get("time.zone").as_deref(),
      "config:time.zone"
    )
  }

  fn get_usize(
    &self,
    key: &str,
    default: usize
  ) -> anyhow::Result<usize> {
    let Some(raw) = self.map.get(key)
    else {
      return Ok(default);
    };
    let value = raw
      .trim()
      .parse::<usize>()
      .with_context(|| {
        format!(
          "invalid {key}: {raw}"
        )
      })?;
    if value == 0 {
      return Err(anyhow!(
        "{key} must be positive"
      ));
    }
    Ok(value)
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let line = raw_line
        .split_once('#')
        .map_or(raw_line, |(before, _)| {
          before
        })
        .trim();
      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if self
          .loaded_files
          .contains(&include_path)
        {
          warn!(include = %include_path.display(), "include cycle; skipping");
        } else if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

fn resolve_rc_path(
  override_path: Option<&Path>,
  env_path: Option<PathBuf>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Some(path) = env_path {
    if path.as_os_str() == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(path));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory"
    );
    return Ok(None);
  };
  let candidate = home.join(".zenlistrc");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn is_absolute_url(text: &str) -> bool {
  text.starts_with("http://")
    || text.starts_with("https://")
}

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}
