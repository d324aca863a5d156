pub mod classify;
pub mod cli;
pub mod config;
pub mod drag;
pub mod memory;
pub mod motion;
pub mod overlay;
pub mod render;
pub mod scenario;
pub mod session;
pub mod store;
pub mod view;

use std::ffi::OsString;
use std::io::{
  self,
  Write
};

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use session::{
  AuthState,
  Session
};
pub use store::{
  Snapshot,
  Subscription,
  TaskService
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting mrplan"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.mrplanrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let settings =
    config::Settings::from_config(&cfg)
      .context(
        "invalid configuration"
      )?;
  let renderer =
    render::Renderer::new(&cfg)?;

  let (service, default_user) =
    match cli.seed.as_deref() {
      | Some(path) => {
        let seed =
          memory::Seed::load(path)?;
        let service =
          memory::MemoryService::with_seed(
            &seed
          )
          .with_context(|| {
            format!(
              "failed to seed feed from \
               {}",
              path.display()
            )
          })?;
        (service, Some(seed.user))
      }
      | None => {
        (
          memory::MemoryService::new(),
          None
        )
      }
    };

  let scenario =
    scenario::Scenario::load(
      &cli.scenario
    )?;
  let mut driver =
    scenario::Driver::new(
      service,
      settings,
      default_user
    );
  let report = driver.run(&scenario);

  let mut out = io::stdout().lock();
  if cli.json {
    serde_json::to_writer_pretty(
      &mut out, &report
    )
    .context(
      "failed to write JSON report"
    )?;
    writeln!(out)?;
  } else {
    let snapshot =
      driver.session().snapshot();
    renderer.write_board(
      &mut out,
      &driver.session().board(),
      snapshot.projects()
    )?;
    writeln!(out)?;
    renderer.write_status(
      &mut out,
      &report.status
    )?;
    writeln!(out)?;
    renderer.write_intents(
      &mut out,
      &report.intents,
      &driver.service().tasks()
    )?;
  }

  info!(
    steps = report.steps.len(),
    intents = report.intents.len(),
    "done"
  );
  Ok(())
}
