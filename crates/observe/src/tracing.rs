use {
    crate::config::Config,
    std::{io::IsTerminal, panic::PanicHookInfo},
    time::macros::format_description,
    tracing::Level,
    tracing_subscriber::{
        EnvFilter,
        Layer,
        fmt::{time::UtcTime, writer::MakeWriterExt as _},
        prelude::*,
        util::SubscriberInitExt,
    },
};

/// Initializes the tracing setup of the binary.
/// `env_filter` has similar syntax to env_logger. It is documented at
/// https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html
pub fn initialize(config: &Config) {
    set_tracing_subscriber(config);
    std::panic::set_hook(Box::new(tracing_panic_hook));
}

fn set_tracing_subscriber(config: &Config) {
    let stderr_threshold = config.stderr_threshold.unwrap_or(Level::ERROR);

    // Events at least as severe as the threshold go to stderr, the rest to
    // stdout.
    macro_rules! fmt_layer {
        () => {
            tracing_subscriber::fmt::layer()
                .with_writer(
                    std::io::stderr
                        .with_max_level(stderr_threshold)
                        .or_else(std::io::stdout),
                )
                .with_timer(UtcTime::new(format_description!(
                    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
                )))
        };
    }

    let env_filter = EnvFilter::new(&config.env_filter);
    let layer = if config.use_json_format {
        fmt_layer!().json().with_filter(env_filter).boxed()
    } else {
        fmt_layer!()
            .with_ansi(std::io::stdout().is_terminal())
            .with_filter(env_filter)
            .boxed()
    };

    tracing_subscriber::registry().with(layer).init();
    tracing::info!(json = config.use_json_format, "initialized logging");
}

/// Panic hook that prints roughly the same message as the default panic hook
/// but uses tracing:error instead of stderr.
fn tracing_panic_hook(panic: &PanicHookInfo) {
    let thread = std::thread::current();
    let name = thread.name().unwrap_or("<unnamed>");
    let backtrace = std::backtrace::Backtrace::force_capture();
    tracing::error!("thread '{name}' {panic}\nstack backtrace:\n{backtrace}");
}
