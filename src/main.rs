use clap::Parser;
use droidkit::adb::session::ProcessLauncher;
use droidkit::cli::{Cli, Commands};
use droidkit::commands::{bootstrap, SessionSupervisor, StartupOptions};
use droidkit::config::Config;
use droidkit::output::{spawn_printer, LogFormatter, LogSink, SINK_CAPACITY};
use log::*;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

fn startup_options(cli: &Cli, config: &Config) -> StartupOptions {
    let poll_interval = if cli.no_poll {
        None
    } else {
        Some(
            cli.poll_interval
                .map(|secs| Duration::from_secs(secs.max(1)))
                .unwrap_or_else(|| config.poll_interval()),
        )
    };

    StartupOptions {
        work_dir: config.work_dir(),
        bundle_dir: cli.bundle_dir.clone().or_else(|| config.bundle_dir()),
        adb_path: cli.adb.clone().or_else(|| config.adb_path()),
        poll_interval,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .init();

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };
    let options = startup_options(&cli, &config);
    debug!("Startup options: {:?}", options);

    let (sink, rx) = LogSink::channel(SINK_CAPACITY);
    let printer = spawn_printer(rx, LogFormatter::new().with_color(!cli.no_color));

    let cancel = CancellationToken::new();
    let startup = bootstrap(&options, &sink, cancel.clone()).await;

    let launcher = ProcessLauncher::new(startup.tool.clone());
    let reap_orphans = config.reap_orphans;
    let mut supervisor =
        SessionSupervisor::new(startup.runner, launcher, sink.clone(), startup.workspace)
            .with_config(config);
    if reap_orphans {
        supervisor = supervisor.with_orphan_reaping(startup.tool.display_name());
    }

    match cli.command {
        Some(Commands::Exec { command }) => {
            supervisor.dispatch(&command.join(" ")).await;
        }
        None => {
            sink.info("Type an adb command without the 'adb' prefix, or `info` for help.")
                .await;

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);

            loop {
                tokio::select! {
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => supervisor.dispatch(&line).await,
                        Ok(None) => {
                            debug!("stdin closed");
                            break;
                        }
                        Err(e) => {
                            error!("Failed to read stdin: {}", e);
                            break;
                        }
                    },
                    _ = &mut ctrl_c => {
                        info!("Interrupted");
                        break;
                    }
                }
            }
        }
    }

    cancel.cancel();
    if let Some(poller) = startup.poller {
        if let Err(e) = poller.await {
            warn!("Device poller ended abnormally: {}", e);
        }
    }

    supervisor.shutdown().await;

    drop(supervisor);
    drop(sink);
    printer.await?;

    Ok(())
}
