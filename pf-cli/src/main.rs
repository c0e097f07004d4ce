#![cfg_attr(coverage, feature(coverage_attribute))]
use std::io::{
    self,
    Write,
};

use async_trait::async_trait;
use clap::Parser;
use pf_core::logging;
use pf_core::prelude::*;
use pf_monitor::{
    KubePodSource,
    Monitor,
    MonitorConfig,
    PodEventHandler,
    Selector,
    dispatch,
};
use tokio_util::sync::CancellationToken;
use tracing::*;

const DEFAULT_NAMESPACE: &str = "foo";
const DEFAULT_SELECTOR: &str = "app=busybox";

#[derive(Parser, Debug)]
#[command(about = "print the addresses of pods matching a label selector as they change", version)]
struct Options {
    #[arg(long, help = "YAML monitor config; command-line flags override values from the file")]
    config_file: Option<String>,

    #[arg(short, long, help = "namespace to watch [default: foo]")]
    namespace: Option<String>,

    #[arg(short = 'l', long, help = "comma-separated key=value label selector [default: app=busybox]")]
    selector: Option<Selector>,

    #[arg(long, help = "per-subscriber event buffer size")]
    channel_capacity: Option<usize>,

    #[arg(short, long, default_value = "info")]
    verbosity: String,
}

fn build_config(args: &Options) -> anyhow::Result<MonitorConfig> {
    let mut config = match &args.config_file {
        Some(path) => MonitorConfig::load(path)?,
        None => MonitorConfig::new(DEFAULT_NAMESPACE, DEFAULT_SELECTOR.parse()?),
    };

    if let Some(ns) = &args.namespace {
        config.namespace.clone_from(ns);
    }
    if let Some(sel) = &args.selector {
        config.label_selector = sel.clone();
    }
    if let Some(capacity) = args.channel_capacity {
        config.channel_capacity = capacity;
    }

    config.validate()?;
    Ok(config)
}

struct PrintHandler<W> {
    out: W,
}

impl<W: Write + Send> PrintHandler<W> {
    fn new(out: W) -> PrintHandler<W> {
        PrintHandler { out }
    }

    fn print(&mut self, line: &str) {
        if let Err(err) = writeln!(self.out, "{line}") {
            warn!("could not write pod event: {err}");
        }
    }
}

#[async_trait]
impl<W: Write + Send> PodEventHandler for PrintHandler<W> {
    async fn on_start(&mut self, names: &[String]) {
        self.print(&format!("pod finder started, {} matching pods", names.len()));
    }

    async fn on_upsert(&mut self, name: &str, address: &str) {
        self.print(&format!("pod modified name: {name} ip: {address}"));
    }

    async fn on_removed(&mut self, name: &str) {
        self.print(&format!("pod removed name: {name}"));
    }
}

async fn build_client() -> anyhow::Result<kube::Client> {
    match std::env::var(KUBECONFIG_ENV_VAR) {
        Ok(path) => debug!("loading cluster credentials from {path}"),
        Err(_) => debug!("loading default cluster credentials"),
    }
    Ok(kube::Client::try_default().await?)
}

#[instrument(ret, err)]
async fn run(args: Options) -> EmptyResult {
    let config = build_config(&args)?;
    info!("watching pods in {} matching '{}'", config.namespace, config.label_selector);

    let client = build_client().await?;
    let mut monitor = Monitor::new(Box::new(KubePodSource::new(client)), config)?;
    let events = monitor.events();
    let cancel = CancellationToken::new();
    let handle = monitor.start(cancel.clone()).await?;

    // Nothing is delivered until the printer starts draining, so on_start always comes first
    let names = handle.listed_pods().to_vec();
    let printer = tokio::spawn(async move {
        let mut handler = PrintHandler::new(io::stdout());
        handler.on_start(&names).await;
        dispatch(events, &mut handler).await
    });

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("interrupted, shutting down"),
            Err(err) => error!("could not listen for ctrl-c, shutting down: {err}"),
        }
        shutdown.cancel();
    });

    handle.wait().await?;
    let count = printer.await?;
    info!("printed {count} pod events");
    Ok(())
}

#[tokio::main]
async fn main() -> EmptyResult {
    let args = Options::parse();
    logging::setup_for_cli(&args.verbosity)?;
    run(args).await
}

#[cfg(test)]
mod tests;
