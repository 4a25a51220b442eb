//! Presentation helpers for the `tempdrop` binary.

use chrono::Duration;
use tempdrop_core::Config;

/// Initialize tracing for the CLI.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Truncate a string to `max_len` characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Human-readable byte size, binary units.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Countdown until expiry, e.g. "23h 59m". Zero or negative reads "expired".
pub fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.num_seconds();
    if secs <= 0 {
        return "expired".to_string();
    }

    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Setup instructions shown when the provider settings are missing.
pub fn setup_guidance(config: &Config) -> String {
    let mut out = String::from("Tempdrop is not configured.\n\nMissing settings:\n");
    for name in config.missing_settings() {
        out.push_str(&format!("  {}\n", name));
    }
    out.push_str(
        "\nSet them in the environment or in a .env file, for example:\n\n  \
         TEMPDROP_CLOUD_NAME=your-cloud-name\n  \
         TEMPDROP_API_KEY=your-api-key\n  \
         TEMPDROP_UPLOAD_PRESET=ml_default\n\n\
         The upload preset must allow unsigned uploads. Set TEMPDROP_API_SECRET as well\n\
         to delete files from the provider instead of only from the local index.\n",
    );
    out
}
