use tracing::metadata::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Environment variable holding filter directives, e.g. `trellis::dnd=debug`
pub const LOG_ENV: &str = "TRELLIS_LOG";

/// Install the stderr subscriber. `TRELLIS_LOG` takes precedence over the
/// verbosity flag. Calling this twice is harmless.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::builder()
        .with_default_directive(level_from_verbosity(verbosity).into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

fn level_from_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(level_from_verbosity(0), LevelFilter::WARN);
        assert_eq!(level_from_verbosity(1), LevelFilter::DEBUG);
        assert_eq!(level_from_verbosity(5), LevelFilter::TRACE);
    }

    #[test]
    fn init_twice_does_not_panic() {
        init(0);
        init(1);
    }
}
