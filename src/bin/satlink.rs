use std::time::Duration;

use clap::{App, Arg, SubCommand};
use colored::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};

use satlink::protocol::{Command, CommandCode, TelemetryDeframer, TelemetryFrame};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: &str = "10000";
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("satlink")
        .version("0.1.0")
        .about("🛰️  Ground-station CLI for the satellite link simulator")
        .arg(
            Arg::with_name("host")
                .long("host")
                .value_name("HOST")
                .help("Simulator host address")
                .takes_value(true)
                .default_value(DEFAULT_HOST)
                .global(true),
        )
        .arg(
            Arg::with_name("port")
                .short("p")
                .long("port")
                .value_name("PORT")
                .help("Simulator port")
                .takes_value(true)
                .default_value(DEFAULT_PORT)
                .global(true),
        )
        .arg(
            Arg::with_name("format")
                .short("f")
                .long("format")
                .value_name("FORMAT")
                .help("Output format")
                .takes_value(true)
                .possible_values(&["json", "table", "compact"])
                .default_value("table")
                .global(true),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Enable verbose output")
                .global(true),
        )
        .subcommand(SubCommand::with_name("nop").about("🏓 Send a no-op command (link check)"))
        .subcommand(
            SubCommand::with_name("reset")
                .about("♻️  Reset a subsystem (2 = ADCS)")
                .arg(
                    Arg::with_name("subsystem")
                        .help("Subsystem identifier")
                        .required(true)
                        .validator(validate_u32),
                ),
        )
        .subcommand(
            SubCommand::with_name("adcs")
                .about("🎯 Command a target attitude")
                .arg(
                    Arg::with_name("angle")
                        .help("Target roll angle in degrees (pitch/yaw derived on board)")
                        .required(true)
                        .validator(validate_f32),
                ),
        )
        .subcommand(SubCommand::with_name("telemetry").about("📡 Request one telemetry frame"))
        .subcommand(
            SubCommand::with_name("param")
                .about("🔧 Set an on-board parameter")
                .arg(
                    Arg::with_name("id")
                        .help("Parameter table index")
                        .required(true)
                        .validator(validate_u32),
                )
                .arg(
                    Arg::with_name("value")
                        .help("Parameter value")
                        .required(true)
                        .validator(validate_f32),
                ),
        )
        .subcommand(
            SubCommand::with_name("shutdown")
                .about("🛑 Shut down a subsystem (2 = ADCS)")
                .arg(
                    Arg::with_name("subsystem")
                        .help("Subsystem identifier")
                        .required(true)
                        .validator(validate_u32),
                ),
        )
        .subcommand(
            SubCommand::with_name("monitor")
                .about("📈 Monitor the live telemetry stream")
                .arg(
                    Arg::with_name("duration")
                        .short("d")
                        .long("duration")
                        .value_name("SECONDS")
                        .help("Monitor duration in seconds (default: infinite)")
                        .takes_value(true)
                        .validator(validate_u32),
                ),
        )
        .get_matches();

    let host = matches.value_of("host").unwrap().to_owned();
    let port: u16 = matches.value_of("port").unwrap().parse()?;
    let format = matches.value_of("format").unwrap().to_owned();
    let verbose = matches.is_present("verbose");

    if verbose {
        println!("{} {}:{}", "Connecting to".dimmed(), host, port);
    }

    match matches.subcommand() {
        ("nop", _) => {
            run_command(&host, port, &format, Command::new(CommandCode::Nop)).await?;
        }
        ("reset", Some(sub)) => {
            let subsystem: u32 = sub.value_of("subsystem").unwrap().parse()?;
            let cmd = Command {
                param1: subsystem,
                ..Command::new(CommandCode::Reset)
            };
            run_command(&host, port, &format, cmd).await?;
        }
        ("adcs", Some(sub)) => {
            let angle: f32 = sub.value_of("angle").unwrap().parse()?;
            let cmd = Command {
                fparam: angle,
                ..Command::new(CommandCode::AdcsSet)
            };
            run_command(&host, port, &format, cmd).await?;
        }
        ("telemetry", _) => {
            run_command(&host, port, &format, Command::new(CommandCode::GetTelemetry)).await?;
        }
        ("param", Some(sub)) => {
            let id: u32 = sub.value_of("id").unwrap().parse()?;
            let value: f32 = sub.value_of("value").unwrap().parse()?;
            let cmd = Command {
                param1: id,
                fparam: value,
                ..Command::new(CommandCode::SetParam)
            };
            run_command(&host, port, &format, cmd).await?;
        }
        ("shutdown", Some(sub)) => {
            let subsystem: u32 = sub.value_of("subsystem").unwrap().parse()?;
            let cmd = Command {
                param1: subsystem,
                ..Command::new(CommandCode::Shutdown)
            };
            run_command(&host, port, &format, cmd).await?;
        }
        ("monitor", Some(sub)) => {
            let duration = sub
                .value_of("duration")
                .map(str::parse::<u64>)
                .transpose()?;
            monitor(&host, port, &format, duration).await?;
        }
        _ => {
            println!(
                "{}",
                "No command specified. Use --help for usage information.".yellow()
            );
            println!("{}", "Quick start:".bright_green());
            println!("  {} Start the simulator", "satlink-simulator".bright_cyan());
            println!("  {} Check the link", "satlink nop".bright_cyan());
            println!("  {} Watch telemetry", "satlink monitor".bright_cyan());
        }
    }

    Ok(())
}

fn validate_u32(value: String) -> Result<(), String> {
    value
        .parse::<u32>()
        .map(|_| ())
        .map_err(|_| "must be a non-negative integer".into())
}

fn validate_f32(value: String) -> Result<(), String> {
    value
        .parse::<f32>()
        .map(|_| ())
        .map_err(|_| "must be a number".into())
}

async fn run_command(
    host: &str,
    port: u16,
    format: &str,
    cmd: Command,
) -> Result<(), Box<dyn std::error::Error>> {
    let frame = send_command(host, port, cmd).await?;
    print_frame(&frame, format);
    Ok(())
}

async fn connect(host: &str, port: u16) -> Result<TcpStream, Box<dyn std::error::Error>> {
    match TcpStream::connect((host, port)).await {
        Ok(stream) => Ok(stream),
        Err(err) => {
            eprintln!(
                "{} Failed to connect to simulator at {}:{}",
                "❌".red(),
                host.bright_white(),
                port
            );
            match err.kind() {
                std::io::ErrorKind::ConnectionRefused => {
                    eprintln!("{} Server is not running. Start it with:", "💡".yellow());
                    eprintln!("   {}", "satlink-simulator".bright_cyan());
                }
                std::io::ErrorKind::TimedOut => {
                    eprintln!("{} Connection timed out", "⏰".yellow());
                }
                _ => {
                    eprintln!("{} Network error: {}", "🔌".yellow(), err.to_string().bright_red());
                }
            }
            Err(err.into())
        }
    }
}

/// Sends one command frame and waits for the telemetry frame the satellite
/// pushes in response.
async fn send_command(
    host: &str,
    port: u16,
    cmd: Command,
) -> Result<TelemetryFrame, Box<dyn std::error::Error>> {
    let mut stream = connect(host, port).await?;

    let result = timeout(RESPONSE_TIMEOUT, async {
        stream.write_all(&cmd.encode()).await?;
        read_telemetry(&mut stream).await
    })
    .await;

    match result {
        Ok(frame) => frame,
        Err(_) => {
            eprintln!("{} No telemetry within {:?}", "⏰".yellow(), RESPONSE_TIMEOUT);
            Err("response timeout".into())
        }
    }
}

async fn read_telemetry(
    stream: &mut TcpStream,
) -> Result<TelemetryFrame, Box<dyn std::error::Error>> {
    let mut deframer = TelemetryDeframer::new();
    let mut buf = [0u8; 256];

    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Err("server closed connection".into());
        }
        deframer.extend(&buf[..n]);
        while let Some(result) = deframer.next_frame() {
            match result {
                Ok(frame) => return Ok(frame),
                Err(err) => {
                    eprintln!("{} Dropped malformed frame: {}", "⚠️".yellow(), err);
                }
            }
        }
    }
}

fn status_label(status: u8) -> ColoredString {
    match status {
        0 => "ERROR".bright_red(),
        1 => "NOMINAL".bright_green(),
        2 => "WARNING".bright_yellow(),
        _ => "UNKNOWN".dimmed(),
    }
}

fn print_frame(frame: &TelemetryFrame, format: &str) {
    match format {
        "json" => {
            let json = serde_json::json!({
                "timestamp": frame.timestamp,
                "attitude": frame.attitude,
                "position": frame.position,
                "temperature": frame.temperature,
                "power": frame.power,
                "status": frame.status,
            });
            println!("{json}");
        }
        "compact" => {
            println!(
                "[{}] {} | att {:.1}/{:.1}/{:.1} | pwr {}% | {}°C",
                frame.timestamp,
                status_label(frame.status),
                frame.attitude[0],
                frame.attitude[1],
                frame.attitude[2],
                frame.power,
                frame.temperature,
            );
        }
        _ => {
            println!("{}", "📡 Telemetry".bright_blue().bold());
            println!("{}", "═══════════════════════════".bright_blue());
            println!("{} {}", "Timestamp:".bright_white(), frame.timestamp);
            println!(
                "{} roll {:.2}°, pitch {:.2}°, yaw {:.2}°",
                "Attitude: ".bright_white(),
                frame.attitude[0],
                frame.attitude[1],
                frame.attitude[2],
            );
            println!(
                "{} [{:.1}, {:.1}, {:.1}] km",
                "Position: ".bright_white(),
                frame.position[0],
                frame.position[1],
                frame.position[2],
            );
            println!("{} {}°C", "Temp:     ".bright_white(), frame.temperature);
            println!("{} {}%", "Power:    ".bright_white(), frame.power);
            println!("{} {}", "Status:   ".bright_white(), status_label(frame.status));
        }
    }
}

async fn monitor(
    host: &str,
    port: u16,
    format: &str,
    duration: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "{}",
        "📡 Monitoring satellite telemetry (Ctrl+C to stop)..."
            .bright_blue()
            .bold()
    );

    let mut stream = connect(host, port).await?;

    // Kick the stream off rather than waiting out the first push interval.
    stream
        .write_all(&Command::new(CommandCode::GetTelemetry).encode())
        .await?;

    let deadline = duration.map(|secs| Instant::now() + Duration::from_secs(secs));
    let mut deframer = TelemetryDeframer::new();
    let mut buf = [0u8; 256];

    if format == "table" {
        println!(
            "{}",
            "│ Time     │ Roll    │ Pitch   │ Yaw     │ Power │ Temp │ Status  │".bright_white()
        );
    }

    loop {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                break;
            }
        }

        let n = match timeout(Duration::from_millis(500), stream.read(&mut buf)).await {
            Ok(Ok(0)) => {
                eprintln!("{} Server closed connection", "🔌".yellow());
                break;
            }
            Ok(Ok(n)) => n,
            Ok(Err(err)) => return Err(err.into()),
            Err(_) => continue, // idle, re-check the deadline
        };

        deframer.extend(&buf[..n]);
        while let Some(result) = deframer.next_frame() {
            match result {
                Ok(frame) => print_monitor_row(&frame, format),
                Err(err) => {
                    eprintln!("{} Dropped malformed frame: {}", "⚠️".yellow(), err);
                }
            }
        }
    }

    Ok(())
}

fn print_monitor_row(frame: &TelemetryFrame, format: &str) {
    match format {
        "json" | "compact" => print_frame(frame, format),
        _ => {
            println!(
                "│ {:>8} │ {:>7.2} │ {:>7.2} │ {:>7.2} │ {:>4}% │ {:>3}° │ {:>7} │",
                frame.timestamp,
                frame.attitude[0],
                frame.attitude[1],
                frame.attitude[2],
                frame.power,
                frame.temperature,
                status_label(frame.status),
            );
        }
    }
}
