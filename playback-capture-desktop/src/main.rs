use std::io::BufRead;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use crossbeam_channel::{after, never, select, Receiver};

use playback_capture_core::{CaptureController, CaptureError, CaptureReport};
use playback_capture_desktop::cli::CliArgs;
use playback_capture_desktop::{ConsoleConsent, LoggingHost};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();
    let provider = args.build_provider()?;
    let source = provider.device_info();
    if !provider.is_available() {
        anyhow::bail!("{} is not available", source.name);
    }

    let config = args.capture_configuration();
    let mut controller = CaptureController::new(provider, config).context("invalid capture configuration")?;
    let (host, finished) = LoggingHost::new();
    controller.set_host(Arc::new(host));

    let consent = ConsoleConsent::new(args.yes);
    controller
        .start_authorized(&consent)
        .with_context(|| format!("failed to start capture from {}", source.name))?;
    // Enter is read from the same buffered stdin the prompt used.
    let input = consent.into_input();

    if let Some(session) = controller.current_session() {
        eprintln!("Recording {} to {}", source.name, session.output_path.display());
    }
    eprintln!("Press Enter to stop.");

    let report = match wait_for_end(&args, input, &finished) {
        Some(report) => report,
        None => match controller.stop() {
            Ok(report) => report,
            // The session ended on its own just before we asked.
            Err(CaptureError::NoActiveCapture) => finished
                .recv_timeout(Duration::from_secs(1))
                .context("capture ended without a report")?,
            Err(e) => return Err(e).context("failed to stop capture"),
        },
    };

    println!(
        "{}\t{} bytes\t{:.2}s\tsha256:{}",
        report.file_path.display(),
        report.bytes_written,
        report.duration.as_secs_f64(),
        report.checksum
    );
    if let Some(error) = report.termination.error() {
        anyhow::bail!("capture ended early: {}", error);
    }
    Ok(())
}

/// Blocks until the user presses Enter, the duration elapses, or the
/// capture ends on its own. Returns the report only in the last case.
fn wait_for_end(
    args: &CliArgs,
    input: Box<dyn BufRead + Send>,
    finished: &Receiver<CaptureReport>,
) -> Option<CaptureReport> {
    let mut enter = enter_pressed(input);
    let timer = args.stop_after().map(after).unwrap_or_else(never);

    loop {
        select! {
            recv(enter) -> msg => match msg {
                Ok(()) => return None,
                // stdin closed (piped input): keep capturing.
                Err(_) => enter = never(),
            },
            recv(timer) -> _ => return None,
            recv(finished) -> report => return report.ok(),
        }
    }
}

fn enter_pressed(mut input: Box<dyn BufRead + Send>) -> Receiver<()> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    let spawned = thread::Builder::new().name("stdin-stop".into()).spawn(move || {
        let mut line = String::new();
        if matches!(input.read_line(&mut line), Ok(n) if n > 0) {
            let _ = tx.send(());
        }
    });
    if let Err(e) = spawned {
        log::warn!("Cannot watch stdin for Enter: {}", e);
    }
    rx
}
