use clap::Parser;

#[tokio::main]
async fn main() {
    let args = staking_relay::arguments::Arguments::parse();
    observe::tracing::initialize(&observe::Config::new(
        &args.log_filter,
        Some(args.log_stderr_threshold),
        args.use_json_logs,
    ));
    observe::metrics::setup_registry(None, None);
    tracing::info!("running staking relay with validated arguments:\n{}", args);
    if let Err(err) = staking_relay::run(args).await {
        tracing::error!(?err, "staking relay stopped");
        std::process::exit(1);
    }
}
