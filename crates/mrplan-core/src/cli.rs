use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "mrplan",
    version,
    about = "MrPlan: replay organizer interactions against an in-memory feed",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "mrplanrc")]
    pub mrplanrc: Option<PathBuf>,

    /// JSON file with the user, projects and tasks to start from.
    #[arg(long = "seed")]
    pub seed: Option<PathBuf>,

    /// Print the report as JSON instead of tables.
    #[arg(long = "json")]
    pub json: bool,

    pub scenario: PathBuf,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_rc_overrides_are_pulled_out() {
        let pre = preprocess_args(&args(&[
            "mrplan",
            "rc.drawer.fraction=0.5",
            "rc.color:off",
            "scenario.json",
        ]))
        .expect("preprocess");
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.drawer.fraction".to_string(), "0.5".to_string()),
                ("rc.color".to_string(), "off".to_string()),
            ]
        );
        assert_eq!(pre.cleaned_args, args(&["mrplan", "scenario.json"]));
    }

    #[test]
    fn flags_parse() {
        let cli = GlobalCli::parse_from(args(&[
            "mrplan",
            "-vv",
            "--rc",
            "spring.damping=20",
            "--seed",
            "seed.json",
            "--json",
            "run.json",
        ]));
        assert_eq!(cli.verbose, 2);
        assert!(cli.json);
        assert_eq!(cli.seed, Some(PathBuf::from("seed.json")));
        assert_eq!(cli.scenario, PathBuf::from("run.json"));
        assert_eq!(cli.rc_overrides[0].key, "spring.damping");
        assert_eq!(cli.rc_overrides[0].value, "20");
    }

    #[test]
    fn keyval_requires_equals() {
        assert!("color".parse::<KeyVal>().is_err());
    }
}
