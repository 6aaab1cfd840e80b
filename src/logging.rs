//! Logger setup.

/// Used when neither `--log` nor `RUST_LOG` says otherwise. wgpu logs every
/// resource it creates at info.
const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// The `env_logger` filter to use: `--log` first, then `RUST_LOG`, then
/// [`DEFAULT_FILTER`]. Blank values count as unset.
fn filter_spec(cli: Option<&str>, env: Option<String>) -> String {
    cli.filter(|f| !f.trim().is_empty())
        .map(str::to_owned)
        .or_else(|| env.filter(|f| !f.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_FILTER.to_owned())
}

/// Installs the global logger. Calling it again only logs a warning.
pub fn init_logging(cli_filter: Option<&str>) {
    let spec = filter_spec(cli_filter, std::env::var("RUST_LOG").ok());
    let installed = env_logger::Builder::new()
        .parse_filters(&spec)
        .format_timestamp_millis()
        .try_init();
    match installed {
        Ok(()) => log::debug!("log filter `{spec}`"),
        Err(e) => log::warn!("logger already installed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_filter_wins() {
        assert_eq!(filter_spec(Some("debug"), Some("trace".into())), "debug");
        assert_eq!(filter_spec(None, Some("trace".into())), "trace");
        assert_eq!(filter_spec(None, None), DEFAULT_FILTER);
    }

    #[test]
    fn blank_filters_are_ignored() {
        assert_eq!(filter_spec(Some("  "), Some("warn".into())), "warn");
        assert_eq!(filter_spec(Some(""), Some(String::new())), DEFAULT_FILTER);
    }
}
