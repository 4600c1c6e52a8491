use std::path::Path;

use flexi_logger::{
    Cleanup, Criterion, FileSpec, FlexiLoggerError, Logger, LoggerHandle, Naming, WriteMode,
    detailed_format,
};

pub const LOG_FILE_BASENAME: &str = "weekboard";
pub const LOG_FILE_SUFFIX: &str = "log";
pub const LOG_ROTATE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const LOG_ROTATE_KEEP_FILES: usize = 5;
const DEFAULT_LEVEL_SPEC: &str = "warn,weekboard=info";

/// Starts file logging in the data dir. The terminal is owned by the
/// dashboard, so nothing is duplicated to stdout or stderr.
///
/// The returned handle must stay alive for the lifetime of the process.
pub fn init_logging(data_dir: &Path, configured: Option<&str>) -> Result<LoggerHandle, FlexiLoggerError> {
    std::fs::create_dir_all(data_dir)?;

    let spec = level_spec(
        std::env::var("WEEKBOARD_LOG").ok(),
        std::env::var("RUST_LOG").ok(),
        configured,
    );

    let handle = Logger::try_with_str(&spec)?
        .log_to_file(
            FileSpec::default()
                .directory(data_dir)
                .basename(LOG_FILE_BASENAME)
                .suffix(LOG_FILE_SUFFIX)
                .suppress_timestamp(),
        )
        .append()
        .write_mode(WriteMode::BufferAndFlush)
        .format_for_files(detailed_format)
        .rotate(
            Criterion::Size(LOG_ROTATE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(LOG_ROTATE_KEEP_FILES),
        )
        .start()?;

    install_panic_hook();

    log::info!(
        "logger initialized dir={} spec={} version={}",
        data_dir.display(),
        spec,
        env!("CARGO_PKG_VERSION")
    );
    Ok(handle)
}

/// `WEEKBOARD_LOG` beats `RUST_LOG`, which beats the config file.
fn level_spec(weekboard_log: Option<String>, rust_log: Option<String>, configured: Option<&str>) -> String {
    [weekboard_log, rust_log, configured.map(str::to_string)]
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LEVEL_SPEC.to_string())
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info: &std::panic::PanicHookInfo<'_>| {
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| info.payload().downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("<non-string panic payload>");
        let location = info
            .location()
            .map(|loc| format!("{loc}"))
            .unwrap_or_else(|| "<unknown>".to_string());

        log::error!("panic: payload={payload} location={location}");
        default_hook(info);
    }));
}
