use std::str::FromStr;

use crate::config::LoggingConfig;

/// Install the global logger: stdout plus an optional log file, one line per
/// record.
pub fn setup_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let level = log::LevelFilter::from_str(&config.level).unwrap_or_else(|_| {
        eprintln!("Unknown log level {:?}, using info", config.level);
        log::LevelFilter::Info
    });

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                chrono::Local::now().format("%Y-%m-%d][%H:%M:%S"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout());

    if let Some(ref path) = config.output {
        dispatch = dispatch.chain(fern::log_file(path)?);
    }

    dispatch.apply()?;
    Ok(())
}
