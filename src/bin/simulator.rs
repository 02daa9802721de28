use std::sync::Arc;
use std::time::Duration;

use clap::{App, Arg};
use tokio::time;
use tracing::{error, info};

use satlink::server::{Server, DEFAULT_PORT};
use satlink::telemetry::TelemetryReport;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let matches = App::new("satlink-simulator")
        .version("0.1.0")
        .about("🛰️  Satellite link simulator - binary telemetry/command protocol over TCP")
        .arg(
            Arg::with_name("host")
                .long("host")
                .value_name("HOST")
                .help("Bind address")
                .takes_value(true)
                .default_value("0.0.0.0"),
        )
        .arg(
            Arg::with_name("port")
                .short("p")
                .long("port")
                .value_name("PORT")
                .help("TCP port for ground stations")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("tick-ms")
                .long("tick-ms")
                .value_name("MS")
                .help("Physics tick period in milliseconds")
                .takes_value(true)
                .default_value("100"),
        )
        .arg(
            Arg::with_name("mirror")
                .long("mirror")
                .help("Log a JSON telemetry mirror once per second"),
        )
        .get_matches();

    let host = matches.value_of("host").unwrap();
    let port = matches
        .value_of("port")
        .map_or(Ok(DEFAULT_PORT), str::parse)?;
    let tick_ms: u64 = matches.value_of("tick-ms").unwrap().parse()?;
    let mirror = matches.is_present("mirror");

    println!("🛰️  Satellite Link Simulator");
    println!("============================");

    let state = satlink::shared_state();

    // A bind failure here is the only fatal startup error.
    let server = Server::bind((host, port), Arc::clone(&state)).await?;
    info!(addr = %server.local_addr()?, "simulator ready");

    tokio::spawn(async move {
        if let Err(err) = server.run().await {
            error!(error = %err, "listener failed");
        }
    });

    // Main simulation loop: advance physics at the tick rate and, once per
    // second, emit the JSON mirror consumed by dashboard tooling.
    let mirror_every = (1000 / tick_ms.max(1)).max(1);
    let mut interval = time::interval(Duration::from_millis(tick_ms));

    loop {
        interval.tick().await;

        let report = {
            let mut state = state.lock().await;
            state.tick();
            (mirror && state.tick % mirror_every == 0).then(|| TelemetryReport::from_state(&state))
        };

        if let Some(report) = report {
            match report.to_json() {
                Ok(json) => info!(target: "satlink::mirror", "{json}"),
                Err(err) => error!(error = %err, "failed to serialize telemetry mirror"),
            }
        }
    }
}
