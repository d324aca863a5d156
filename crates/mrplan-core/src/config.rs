use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::time::Duration;

use anyhow::{
  Context,
  anyhow,
  bail
};
use mrplan_shared::Bucket;
use tracing::{
  debug,
  info,
  trace,
  warn
};

const DEFAULTS: &[(&str, &str)] = &[
  ("screen.width", "390"),
  ("screen.height", "844"),
  ("drawer.fraction", "0.95"),
  ("drawer.corner_radius", "20"),
  ("spring.damping", "18"),
  ("spring.stiffness", "100"),
  ("spring.mass", "1"),
  ("vertical.duration_ms", "350"),
  ("overlay.edit_delay_ms", "150"),
  ("drag.long_press_ms", "200"),
  ("color", "on")
];

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let map = DEFAULTS
      .iter()
      .map(|(k, v)| {
        (k.to_string(), v.to_string())
      })
      .collect();
    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rc = resolve_rc_path(
      rc_override
    )?;
    if let Some(path) = rc {
      info!(mrplanrc = %path.display(), "loading mrplanrc");
      cfg.load_file(&path)?;
    } else {
      warn!(
        "no mrplanrc found; using \
         defaults"
      );
    }

    Ok(cfg)
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

  pub fn get_f32(
    &self,
    key: &str
  ) -> anyhow::Result<f32> {
    let raw = self.require(key)?;
    raw.trim().parse::<f32>().with_context(
      || {
        format!(
          "config key {key} expects a \
           number, got `{raw}`"
        )
      }
    )
  }

  pub fn get_u64(
    &self,
    key: &str
  ) -> anyhow::Result<u64> {
    let raw = self.require(key)?;
    raw.trim().parse::<u64>().with_context(
      || {
        format!(
          "config key {key} expects a \
           whole number, got `{raw}`"
        )
      }
    )
  }

  fn require(
    &self,
    key: &str
  ) -> anyhow::Result<&str> {
    self
      .map
      .get(key)
      .map(String::as_str)
      .ok_or_else(|| {
        anyhow!(
          "missing config key {key}"
        )
      })
  }

  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    self.load_file_nested(
      path,
      &mut Vec::new()
    )
  }

  /// `chain` holds the canonical paths
  /// of the files currently being read.
  #[tracing::instrument(skip(
    self, chain
  ))]
  fn load_file_nested(
    &mut self,
    path: &Path,
    chain: &mut Vec<PathBuf>
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

    let canonical =
      fs::canonicalize(&path)
        .unwrap_or_else(|_| {
          path.clone()
        });
    if chain.contains(&canonical) {
      bail!(
        "config include cycle at {}",
        path.display()
      );
    }
    chain.push(canonical);

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
      let mut line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

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

        if include_path.exists() {
          self.load_file_nested(
            &include_path,
            chain
          )?;
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

    chain.pop();
    Ok(())
  }
}

/// Typed view of the config map,
/// validated once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
  pub screen_width:         f32,
  pub screen_height:        f32,
  pub drawer_fraction:      f32,
  pub drawer_corner_radius: f32,
  pub spring:               SpringParams,
  pub vertical_duration:    Duration,
  pub edit_delay:           Duration,
  pub long_press:           Duration,
  pub dashboard_bucket:     Bucket,
  pub organizer_bucket:     Bucket
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringParams {
  pub damping:   f32,
  pub stiffness: f32,
  pub mass:      f32
}

impl Default for SpringParams {
  fn default() -> Self {
    Self {
      damping:   18.0,
      stiffness: 100.0,
      mass:      1.0
    }
  }
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      screen_width:         390.0,
      screen_height:        844.0,
      drawer_fraction:      0.95,
      drawer_corner_radius: 20.0,
      spring: SpringParams::default(),
      vertical_duration:
        Duration::from_millis(350),
      edit_delay:
        Duration::from_millis(150),
      long_press:
        Duration::from_millis(200),
      dashboard_bucket: Bucket::Today,
      organizer_bucket: Bucket::Inbox
    }
  }
}

impl Settings {
  #[tracing::instrument(skip(cfg))]
  pub fn from_config(
    cfg: &Config
  ) -> anyhow::Result<Self> {
    let settings = Self {
      screen_width: cfg
        .get_f32("screen.width")?,
      screen_height: cfg
        .get_f32("screen.height")?,
      drawer_fraction: cfg
        .get_f32("drawer.fraction")?,
      drawer_corner_radius: cfg
        .get_f32(
          "drawer.corner_radius"
        )?,
      spring: SpringParams {
        damping:   cfg.get_f32(
          "spring.damping"
        )?,
        stiffness: cfg.get_f32(
          "spring.stiffness"
        )?,
        mass:      cfg
          .get_f32("spring.mass")?
      },
      vertical_duration:
        Duration::from_millis(
          cfg.get_u64(
            "vertical.duration_ms"
          )?
        ),
      edit_delay:
        Duration::from_millis(
          cfg.get_u64(
            "overlay.edit_delay_ms"
          )?
        ),
      long_press:
        Duration::from_millis(
          cfg.get_u64(
            "drag.long_press_ms"
          )?
        ),
      ..Self::default()
    };
    settings.validate()?;
    debug!(?settings, "resolved settings");
    Ok(settings)
  }

  pub fn drawer_width(&self) -> f32 {
    self.screen_width
      * self.drawer_fraction
  }

  fn validate(
    &self
  ) -> anyhow::Result<()> {
    if !(self.screen_width > 0.0
      && self.screen_height > 0.0)
    {
      bail!(
        "screen size must be positive, \
         got {}x{}",
        self.screen_width,
        self.screen_height
      );
    }
    if !(self.drawer_fraction > 0.0
      && self.drawer_fraction <= 1.0)
    {
      bail!(
        "drawer.fraction must be in \
         (0, 1], got {}",
        self.drawer_fraction
      );
    }
    if self.drawer_corner_radius < 0.0 {
      bail!(
        "drawer.corner_radius cannot \
         be negative"
      );
    }
    let spring = self.spring;
    if !(spring.damping > 0.0
      && spring.stiffness > 0.0
      && spring.mass > 0.0)
    {
      bail!(
        "spring parameters must be \
         positive, got {spring:?}"
      );
    }
    Ok(())
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var("MRPLANRC")
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    debug!(
      "cannot determine home \
       directory; skipping ~/.mrplanrc"
    );
    return Ok(None);
  };
  let candidate = home.join(".mrplanrc");
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

pub(crate) fn expand_tilde(
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

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}
