//! Terminal output for the dropsy CLI

use console::style;
use dropsy_types::{Error, ErrorKind, Target};
use std::path::Path;

/// Announce what is about to be watched
pub fn print_banner(targets: &[Target], poll_secs: u64, jobs: usize) {
    let Some(first) = targets.first() else {
        return;
    };

    println!(
        "{} Mirroring to {}",
        style("→").green().bold(),
        style(format!("{}@{}", first.username, first.hostname)).cyan().bold()
    );
    for target in targets {
        println!("  {}", style(target.directory.display()).cyan());
    }

    let mode = if poll_secs == 0 {
        "single pass".to_string()
    } else {
        format!("every {}s", poll_secs)
    };
    println!(
        "  {} {}, {} {}",
        style("Mode:").dim(),
        style(mode).yellow(),
        style("jobs:").dim(),
        style(jobs).yellow()
    );
}

/// Follow-up advice printed under a fatal error
fn fatal_hint(error: &anyhow::Error) -> Option<&'static str> {
    match error.downcast_ref::<Error>().map(Error::kind)? {
        ErrorKind::Transfer => Some("Test network and retry!"),
        ErrorKind::Store => Some("Check that the state directory is writable."),
        ErrorKind::Authentication => Some("Check the user name and password."),
        ErrorKind::Config => Some("Check the targets (user@host:/dir) and the configuration file."),
        _ => None,
    }
}

/// Report a fatal error on stderr
pub fn print_fatal(error: &anyhow::Error) {
    eprintln!("{} {:#}", style("FATAL:").red().bold(), error);
    if let Some(hint) = fatal_hint(error) {
        eprintln!("  {}", style(hint).dim());
    }
}

/// Confirm that a configuration file was written
pub fn print_config_written(path: &Path) {
    println!(
        "{} Configuration written to {}",
        style("✓").green().bold(),
        style(path.display()).cyan()
    );
}

/// Farewell line after a clean stop
pub fn print_stopped() {
    println!("{} Stopped", style("■").dim());
}
