pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod error;
pub mod filter;
pub mod forms;
pub mod orchestrator;
pub mod remote;
pub mod render;
pub mod selection;
pub mod state;

use std::ffi::OsString;
use std::io::{
  self,
  Write
};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info,
  warn
};

use crate::orchestrator::{
  ActionOutcome,
  Session
};
use crate::remote::GraphqlClient;
use crate::state::AppState;

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<ExitCode> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting zenlist CLI"
  );

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  );
  if let Some(endpoint) = cli.endpoint {
    cfg.apply_overrides([(
      "graphql.url".to_string(),
      endpoint
    )]);
  }

  let endpoint = cfg
    .endpoint_url()
    .context("failed to resolve graph endpoint")?;
  let pages = cfg.page_sizes()?;
  let timeout = cfg.http_timeout()?;
  let tz = cfg.display_timezone();
  debug!(%endpoint, ?pages, ?timeout, timezone = %tz, "resolved settings");

  let client =
    GraphqlClient::new(endpoint, timeout)
      .context(
        "failed to build HTTP client"
      )?;
  info!(endpoint = client.endpoint(), "graph client ready");
  let renderer =
    render::Renderer::new(&cfg)?;
  let command = cli
    .command
    .unwrap_or(cli::Command::Show);

  let runtime =
    tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .context(
        "failed to start async runtime"
      )?;

  let state = runtime.block_on(async {
    let mut session = Session::new(
      client,
      AppState::new(tz),
      pages
    );
    let outcome = session.bootstrap().await;
    if outcome.is_failure() {
      return Ok::<_, anyhow::Error>((
        outcome,
        session.into_state()
      ));
    }
    let outcome = commands::dispatch(
      &mut session,
      &renderer,
      command
    )
    .await?;
    Ok((outcome, session.into_state()))
  });
  let (outcome, state) = state?;

  let mut out = io::stdout().lock();
  renderer.write_notice(&mut out, &state)?;
  out.flush()?;

  if outcome == ActionOutcome::Skipped {
    warn!(
      "nothing was sent; a required \
       selection is missing"
    );
  }

  let failed = outcome.is_failure()
    || state
      .activity
      .notice
      .as_ref()
      .is_some_and(|notice| notice.is_failure());
  info!(failed, "done");
  Ok(if failed {
    ExitCode::FAILURE
  } else {
    ExitCode::SUCCESS
  })
}
