use std::collections::HashSet;
use std::env;
use std::error::Error;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tokio::signal::unix::SignalKind;

use procon_gadget::controller::Controller;
use procon_gadget::report::GyroAxis;
use procon_gadget::transport::GadgetChannel;

/// Emulates a Nintendo Switch Pro Controller over a USB HID gadget device
/// node. Does not provision the gadget device node itself, load a
/// key-mapping configuration, or discover keyboard/mouse event sources --
/// those are the responsibility of whatever wires input events into this
/// process via its library API.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the HID gadget device node (e.g. /dev/hidg0).
    #[arg(long, default_value = "/dev/hidg0")]
    device_path: String,

    /// Interval between six-axis sensor flushes, in milliseconds.
    #[arg(long, default_value_t = 15)]
    report_interval_ms: u64,

    /// Gyro axes to convert from accumulated dots to degrees-per-second
    /// (dots-per-degree conversion); unlisted axes pass through raw.
    #[arg(long, value_delimiter = ',', default_value = "gyroy,gyroz")]
    apply_sens: Vec<String>,

    /// Legacy numeric verbosity knob (0 quietest), independent of
    /// RUST_LOG: gates SPI-read/unknown-request notices (>1) and raw
    /// frame hex dumps (>4).
    #[arg(long, default_value_t = 0)]
    log_level: i32,
}

fn parse_apply_sens(names: &[String]) -> HashSet<GyroAxis> {
    names
        .iter()
        .filter_map(|name| match name.trim() {
            "gyrox" => Some(GyroAxis::X),
            "gyroy" => Some(GyroAxis::Y),
            "gyroz" => Some(GyroAxis::Z),
            other => {
                log::warn!("ignoring unknown apply-sens axis {other:?}");
                None
            }
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    env::set_var("RUST_LOG", log_level);
    env_logger::init();

    let args = Args::parse();
    let apply_sens = parse_apply_sens(&args.apply_sens);

    log::info!("opening gadget channel at {}", args.device_path);
    let report_seconds = args.report_interval_ms as f64 / 1000.0;
    let controller = Arc::new(Controller::<GadgetChannel>::new(
        args.device_path.clone(),
        report_seconds,
        apply_sens,
        args.log_level,
    ));

    if let Err(e) = controller.clone().start_connect() {
        log::error!("failed to start controller: {e}");
        process::exit(1);
    }
    log::info!("---- ProCon connection started ----");

    let mut sig_term = tokio::signal::unix::signal(SignalKind::terminate())?;
    let mut sig_int = tokio::signal::unix::signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("received CTRL+C, shutting down");
        }
        _ = sig_int.recv() => {
            log::info!("received SIGINT, shutting down");
        }
        _ = sig_term.recv() => {
            log::info!("received SIGTERM, shutting down");
        }
    }

    if let Err(e) = controller.disconnect() {
        log::warn!("failed to send disconnect frames: {e}");
    }
    controller.close();

    Ok(())
}
