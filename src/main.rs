use std::env::args;
use std::io::{stdout, Write};

use futex_turns::{Actor, Config};
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), String> {
    // stdout belongs to the actors, diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    Config::from_args(args().skip(1))
        .and_then(|config| {
            #[cfg(target_os = "linux")]
            let futex = {
                debug!(sys_futex = libc::SYS_futex, "using the futex syscall");
                futex_turns::futex::LinuxFutex::private()
            };
            #[cfg(not(target_os = "linux"))]
            let futex = {
                warn!("no futex on this OS, falling back to yielding");
                futex_turns::futex::simulated::LostWakeFutex
            };
            futex_turns::run(&config, futex, say)
        })
        .map_err(|e| {
            error!(error = %e, "giving up");
            e.to_string()
        })
}

/// One line per turn, flushed right away so the alternation is visible
fn say(actor: Actor, j: usize) {
    let mut out = stdout().lock();
    if let Err(e) = writeln!(out, "{actor} {j}").and_then(|()| out.flush()) {
        warn!(%actor, j, error = %e, "failed to write");
    }
}
