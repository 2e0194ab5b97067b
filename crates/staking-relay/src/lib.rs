pub mod arguments;
pub mod chain_reader;
pub mod contracts;
pub mod decoder;
pub mod domain;
pub mod ledger;
pub mod liveness;
pub mod metrics;
pub mod polling;
pub mod profile;
pub mod relay;
pub mod relayer;
pub mod shutdown;
pub mod submitter;
pub mod watcher;

#[cfg(test)]
mod testing;

use {
    crate::{
        arguments::Arguments,
        chain_reader::ChainReader,
        decoder::EventDecoder,
        ledger::{SourceLedger, TargetLedger},
        liveness::Liveness,
        metrics::Metrics,
        polling::PollingScanner,
        profile::Profile,
        relay::RelayJob,
        relayer::{Relayer, WatchEnd},
        shutdown::Shutdown,
        submitter::TxExecutor,
        watcher::EventWatcher,
    },
    anyhow::Context,
    std::{sync::Arc, time::Duration},
};

/// Longest time without a completed scan or handled log before the relay is
/// reported dead: a few poll intervals plus every confirmation wait of one
/// relay.
fn max_stall(args: &Arguments) -> Duration {
    let attempts = u32::try_from(args.leg_retries.saturating_add(1).saturating_mul(2))
        .unwrap_or(u32::MAX);
    args.poll_interval
        .saturating_mul(3)
        .saturating_add(args.confirmation_timeout.saturating_mul(attempts))
}

/// Connects to both ledgers and relays the staking index until shutdown.
pub async fn run(args: Arguments) -> anyhow::Result<()> {
    let source = ethrpc::alloy::connect(&args.source_node_url, "source")
        .await
        .context("could not connect to source ledger")?;
    let target = ethrpc::alloy::provider(&args.target_node_url, "target");
    let source_ledger: Arc<dyn SourceLedger> = Arc::new(source.clone());
    let target_ledger: Arc<dyn TargetLedger> = Arc::new(target);

    let source_chain_id = alloy::providers::Provider::get_chain_id(&source)
        .await
        .context("source ledger unreachable")?;
    let target_chain_id = target_ledger
        .chain_id()
        .await
        .context("target ledger unreachable")?;
    tracing::info!(
        source_chain_id,
        target_chain_id,
        sender = ?args.private_key.address(),
        "connected to ledgers"
    );

    let shutdown = Shutdown::on_signal();
    let profile = Profile::new(args.deployment, args.addresses());
    let reader = Arc::new(ChainReader::new(
        source_ledger.clone(),
        profile.addresses.source,
        profile.getter,
    ));
    let executor = Arc::new(TxExecutor::new(
        target_ledger,
        args.private_key.clone(),
        target_chain_id,
        submitter::Config {
            gas_limit: args.gas_limit,
            confirmation_timeout: args.confirmation_timeout,
            receipt_poll_interval: args.receipt_poll_interval,
        },
        shutdown.clone(),
    ));
    let job = RelayJob::new(executor, &profile, args.leg_retries);

    if args.once {
        let outcome = relayer::relay_current(reader.as_ref(), &job).await?;
        tracing::info!(?outcome, "relayed current staking index");
        return Ok(());
    }

    let liveness = Arc::new(Liveness::new(max_stall(&args), shutdown.clone()));
    observe::metrics::serve_metrics(liveness.clone(), args.metrics_address);

    // Subscribe before reading the head so no block falls in between.
    let mut watcher = None;
    if args.start_block.is_none() && ethrpc::alloy::supports_subscriptions(&args.source_node_url)
    {
        let mut subscription = EventWatcher::new(source, profile.addresses.source);
        match subscription.connect().await {
            Ok(()) => watcher = Some(subscription),
            Err(err) => {
                Metrics::get().subscription_fallback();
                tracing::warn!(?err, "could not subscribe to source logs, polling instead");
            }
        }
    }
    let checkpoint = match args.start_block {
        Some(block) => block.saturating_sub(1),
        None => source_ledger
            .block_number()
            .await
            .context("could not fetch source chain head")?,
    };

    let mut relayer = Relayer::new(
        EventDecoder::new(profile.deposit_layout),
        reader,
        job,
        checkpoint,
        args.exit_on_relay_failure,
        liveness,
    );
    // Backfills next to the subscription and takes over once it fails.
    let mut scanner = PollingScanner::new(
        source_ledger,
        profile.addresses.source,
        args.start_block.unwrap_or(checkpoint + 1),
        args.max_blocks_per_scan,
        args.poll_interval,
    );
    let mut shutdown = shutdown;
    if let Some(watcher) = watcher.as_mut() {
        match relayer.watch(watcher, &mut scanner, &mut shutdown).await? {
            WatchEnd::Shutdown => return Ok(()),
            WatchEnd::Failed(err) => {
                Metrics::get().subscription_fallback();
                tracing::warn!(
                    ?err,
                    checkpoint = relayer.checkpoint(),
                    "source log subscription failed, falling back to polling"
                );
            }
        }
    }

    relayer.poll(&mut scanner, &mut shutdown).await?;
    tracing::info!("shut down");
    Ok(())
}
