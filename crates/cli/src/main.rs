// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! depot: suburban bus station simulator.

mod args;
mod scenarios;

use anyhow::Context;
use args::Args;
use clap::Parser;
use depot_core::{AdminSignal, SimConfig};
use depot_sim::StationLogger;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("depot: {:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = SimConfig::default();
    depot_sim::env::apply(&mut config);
    args.apply(&mut config);
    let scenario = args.scenario();
    if let Some(number) = scenario {
        tracing::info!(scenario = number, "running canned scenario");
        scenarios::configure(number, &mut config);
    }

    let logger = Arc::new(StationLogger::new(depot_sim::env::log_dir(), config.log_mode));
    let handle = depot_sim::launch(config, logger).context("startup failed")?;

    spawn_signal_bridge(handle.admin());

    if let Some(number) = scenario {
        scenarios::drive(number, &handle).await;
    }

    let report = handle.wait().await.context("simulation lost")?;
    println!("{}", report.accounting);
    println!(
        "tickets issued={} denied={}  boarded={} (vip {})  trips per bus: {:?}",
        report.counters.tickets_issued,
        report.counters.tickets_denied,
        report.counters.boarded_people,
        report.counters.boarded_vip_people,
        report.bus_trips,
    );
    if !report.balanced {
        // Logged as ERROR by the controller; the run itself still succeeded.
        eprintln!("depot: accounting mismatch (see logs)");
    }
    Ok(())
}

/// Map process signals to admin signals: SIGINT/SIGTERM stop the run,
/// SIGUSR1 forces early departures, SIGUSR2 closes the station.
fn spawn_signal_bridge(admin: mpsc::UnboundedSender<AdminSignal>) {
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        let (Ok(mut interrupt), Ok(mut terminate), Ok(mut usr1), Ok(mut usr2)) = (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
            signal(SignalKind::user_defined1()),
            signal(SignalKind::user_defined2()),
        ) else {
            tracing::warn!("signal handlers unavailable; admin signals disabled");
            return;
        };
        loop {
            let admin_signal = tokio::select! {
                _ = interrupt.recv() => AdminSignal::Shutdown,
                _ = terminate.recv() => AdminSignal::Shutdown,
                _ = usr1.recv() => AdminSignal::EarlyDepart,
                _ = usr2.recv() => AdminSignal::CloseStation,
            };
            if admin.send(admin_signal).is_err() {
                return;
            }
        }
    });
}
