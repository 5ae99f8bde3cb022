use std::path::Path;

pub const LOG_FILE_BASENAME: &str = "task-manager";
pub const LOG_FILE_SUFFIX: &str = "log";
pub const LOG_ROTATE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const LOG_ROTATE_KEEP_FILES: usize = 10;
pub const LOG_ENV: &str = "TASK_MANAGER_LOG";

/// Log files live next to the task snapshot.
pub fn log_directory(data_dir: &Path) -> &Path {
    data_dir
}

/// `TASK_MANAGER_LOG`, then `RUST_LOG`, then a build-dependent default.
pub fn log_spec(app_var: Option<String>, rust_log: Option<String>) -> String {
    let default_spec = if cfg!(debug_assertions) {
        "warn,task_manager_lib=debug"
    } else {
        "warn,task_manager_lib=info"
    };
    app_var
        .filter(|value| !value.trim().is_empty())
        .or_else(|| rust_log.filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| default_spec.to_string())
}

#[cfg(all(feature = "app", not(test)))]
pub fn init_logging(
    data_dir: &Path,
) -> Result<flexi_logger::LoggerHandle, flexi_logger::FlexiLoggerError> {
    use flexi_logger::{detailed_format, Cleanup, Criterion, FileSpec, Logger, Naming, WriteMode};

    std::fs::create_dir_all(data_dir)?;

    let spec = log_spec(std::env::var(LOG_ENV).ok(), std::env::var("RUST_LOG").ok());

    // stdout carries the command bridge, so logs go to the file only.
    let handle = Logger::try_with_str(spec)?
        .log_to_file(
            FileSpec::default()
                .directory(log_directory(data_dir))
                .basename(LOG_FILE_BASENAME)
                .suffix(LOG_FILE_SUFFIX),
        )
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
        "logger initialized dir={} rotate_size_bytes={} keep_files={}",
        log_directory(data_dir).display(),
        LOG_ROTATE_SIZE_BYTES,
        LOG_ROTATE_KEEP_FILES
    );
    Ok(handle)
}

/// Best-effort text of a panic payload; `panic!` produces either a `&str`
/// or a formatted `String`.
pub fn panic_message<'a>(payload: &'a (dyn std::any::Any + Send + 'static)) -> &'a str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}

/// Routes panics into the log file before the default hook prints them, so
/// a host that dies mid-request leaves a trace next to the task snapshot.
#[cfg(all(feature = "app", not(test)))]
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info: &std::panic::PanicHookInfo<'_>| {
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "<unknown>".to_string());
        log::error!(
            "task-manager panicked at {location}: {}\n{}",
            panic_message(info.payload()),
            std::backtrace::Backtrace::force_capture()
        );
        default_hook(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_variable_takes_precedence() {
        let spec = log_spec(Some("debug".to_string()), Some("trace".to_string()));
        assert_eq!(spec, "debug");
    }

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        let literal = std::panic::catch_unwind(|| panic!("snapshot lost")).unwrap_err();
        assert_eq!(panic_message(&*literal), "snapshot lost");

        let id = "42-abc";
        let formatted = std::panic::catch_unwind(|| panic!("no task {id}")).unwrap_err();
        assert_eq!(panic_message(&*formatted), "no task 42-abc");

        let other = std::panic::catch_unwind(|| std::panic::panic_any(7_u8)).unwrap_err();
        assert_eq!(panic_message(&*other), "<non-string panic payload>");
    }

    #[test]
    fn blank_values_fall_through() {
        assert_eq!(log_spec(Some("  ".to_string()), Some("info".to_string())), "info");
        let spec = log_spec(None, Some(String::new()));
        assert!(spec.starts_with("warn,task_manager_lib="));
    }
}
