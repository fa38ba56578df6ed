mod execute;
mod plan;

#[cfg(test)]
mod tests;

use clap::{ArgMatches, CommandFactory, FromArgMatches};

use crate::args::PushpollArgs;
use crate::error::AppResult;
use execute::execute_plan;
use plan::build_plan;

/// Binary entry point: parse flags, merge the config file, run, report.
///
/// # Errors
///
/// Returns invalid flags or config, setup failures, and interrupted or
/// timed-out runs (after the report has been printed).
pub fn run() -> AppResult<()> {
    let matches = PushpollArgs::command().get_matches_from(std::env::args_os());
    let args = resolve_args(&matches)?;

    crate::logger::init_logging(args.verbose, args.no_color);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_async(&args))
}

fn resolve_args(matches: &ArgMatches) -> AppResult<PushpollArgs> {
    let mut args = PushpollArgs::from_arg_matches(matches)?;
    if let Some(config) = crate::config::load_config(args.config.as_deref())? {
        crate::config::apply_config(&mut args, matches, &config)?;
    }
    Ok(args)
}

async fn run_async(args: &PushpollArgs) -> AppResult<()> {
    let plan = build_plan(args)?;
    execute_plan(plan).await
}
