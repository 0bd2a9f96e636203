use alertcore::telemetry::MetricsRecorder;
use anyhow::Context;
use clap::Parser;
use generator::profile::ScenarioConfig;
use log::info;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use telemetry_bridge::bridge::{default_bind_address, TelemetryBridge};
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::NodeConfig;
use workflow::live::run_live;
use workflow::runner::Runner;

mod generator;
mod telemetry_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Hazard-alert relay and receiver driver")]
struct Args {
    /// Run a live relay or receiver node from a YAML config
    #[arg(long)]
    config: Option<PathBuf>,
    /// Play a generated scenario through a relay and a receiving vehicle
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load offline scenario parameters from YAML
    #[arg(long)]
    scenario: Option<PathBuf>,
    #[arg(long, default_value_t = 20)]
    alerts: usize,
    #[arg(long, default_value_t = 3)]
    rebroadcasts: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    #[arg(long, default_value_t = 500)]
    max_seen: usize,
    /// Forward every copy instead of suppressing re-broadcasts
    #[arg(long, default_value_t = false)]
    no_loop_prevention: bool,
    /// Append the offline summary to this file
    #[arg(long, default_value = "tools/data/offline_alerts.log")]
    report: PathBuf,
    /// Serve node telemetry over HTTP
    #[arg(long, default_value_t = false)]
    serve: bool,
    #[arg(long, default_value_t = 9000)]
    bridge_port: u16,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let bridge = TelemetryBridge::new();
    if args.serve {
        bridge.serve(default_bind_address(args.bridge_port));
        bridge.publish_status(&format!(
            "HTTP bridge on port {} (Ctrl+C to stop)...",
            args.bridge_port
        ));
    }

    if args.offline {
        let scenario = if let Some(path) = args.scenario.as_ref() {
            ScenarioConfig::load(path)?
        } else {
            ScenarioConfig {
                alerts: args.alerts,
                rebroadcasts: args.rebroadcasts,
                seed: args.seed,
                max_seen: args.max_seen,
                enable_loop_prevention: !args.no_loop_prevention,
                ..Default::default()
            }
        };

        let relay_metrics = Arc::new(MetricsRecorder::new());
        let receiver_metrics = Arc::new(MetricsRecorder::new());
        bridge.register("relay", relay_metrics.clone());
        bridge.register("receiver", receiver_metrics.clone());

        let runner = Runner::new(scenario);
        let result = runner.execute(relay_metrics, receiver_metrics)?;

        println!(
            "Offline run -> relay rx {}, forwarded {}, suppressed {}, seen {}",
            result.relay.received, result.relay.forwarded, result.suppressed, result.seen_len
        );
        println!(
            "Receiver -> {}, zones critical/caution/clear {}/{}/{}, final speed {:?}",
            result.receiver_status,
            result.zones.critical,
            result.zones.caution,
            result.zones.clear,
            result.final_speed
        );

        for model in bridge.snapshot() {
            bridge.publish_status(&format!(
                "{} rx {} avg delay {:?}",
                model.node, model.metrics.received, model.average_delay
            ));
        }

        let report = format!(
            "scenario={} {}\n",
            runner
                .config()
                .description
                .as_deref()
                .unwrap_or("generated"),
            serde_json::to_string(&result).context("serializing offline summary")?
        );
        if let Some(parent) = args.report.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&args.report)
            .with_context(|| format!("opening report {}", args.report.display()))?;
        file.write_all(report.as_bytes())?;
    }

    if let Some(path) = args.config.as_ref() {
        let node = NodeConfig::load(path)?;
        let metrics = Arc::new(MetricsRecorder::new());
        bridge.register(&node.name, metrics.clone());

        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for alert node")?;
        let outcome: anyhow::Result<()> = runtime.block_on(async {
            tokio::select! {
                result = run_live(node, metrics) => result,
                signal = signal::ctrl_c() => {
                    signal.context("awaiting Ctrl+C to exit")?;
                    info!("shutting down");
                    Ok(())
                }
            }
        });
        outcome?;
    } else if args.serve {
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
    } else if !args.offline {
        info!("nothing to run; pass --offline or --config <node.yaml>");
    }

    Ok(())
}
