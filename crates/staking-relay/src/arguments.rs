use {
    crate::profile::{Addresses, Deployment},
    alloy::{primitives::Address, signers::local::PrivateKeySigner},
    std::{
        fmt::{self, Display, Formatter},
        net::SocketAddr,
        num::{NonZeroU64, ParseFloatError},
        time::Duration,
    },
    tracing::Level,
    url::Url,
};

#[derive(clap::Parser)]
#[clap(about = "Relays the L1 staking index to the L2 swap pool and marketplace")]
pub struct Arguments {
    #[clap(long, env, default_value = "warn,staking_relay=debug,ethrpc=info")]
    pub log_filter: String,

    /// At which log level logs should be printed to stderr instead of stdout.
    #[clap(long, env, default_value = "error")]
    pub log_stderr_threshold: Level,

    /// Whether to use JSON format for the logs.
    #[clap(long, env, action = clap::ArgAction::Set, default_value = "false")]
    pub use_json_logs: bool,

    /// Address to serve `/metrics` and `/liveness` on.
    #[clap(long, env, default_value = "0.0.0.0:9586")]
    pub metrics_address: SocketAddr,

    /// Source ledger node. A `ws://` or `wss://` URL enables the live log
    /// subscription, any other URL polls for logs.
    #[clap(long, env)]
    pub source_node_url: Url,

    /// Target ledger node.
    #[clap(long, env)]
    pub target_node_url: Url,

    /// Hex encoded key signing the target ledger transactions.
    #[clap(long, env)]
    pub private_key: PrivateKeySigner,

    /// Source contract holding the staking index.
    #[clap(long, env = "L1_WRAPPED_STAKED_TON")]
    pub staking_index_source: Address,

    #[clap(long, env = "WSTON_SWAP_POOL")]
    pub swap_pool: Address,

    #[clap(long, env = "MARKETPLACE")]
    pub marketplace: Address,

    /// Revision of the source contract.
    #[clap(long, env, value_enum)]
    pub deployment: Deployment,

    /// Seconds between two polls of the source ledger.
    #[clap(
        long,
        env,
        default_value = "15",
        value_parser = duration_from_seconds,
    )]
    pub poll_interval: Duration,

    /// Upper bound for the size of a single `eth_getLogs` range.
    #[clap(long, env, default_value = "1000")]
    pub max_blocks_per_scan: NonZeroU64,

    /// First block to scan for events. Setting it disables the live
    /// subscription.
    #[clap(long, env)]
    pub start_block: Option<u64>,

    /// Gas limit of every target ledger transaction.
    #[clap(long, env, default_value = "300000")]
    pub gas_limit: u64,

    /// Seconds to wait for a submitted transaction to be mined.
    #[clap(
        long,
        env,
        default_value = "120",
        value_parser = duration_from_seconds,
    )]
    pub confirmation_timeout: Duration,

    /// Seconds between two receipt queries while waiting for confirmation.
    #[clap(
        long,
        env,
        default_value = "2",
        value_parser = duration_from_seconds,
    )]
    pub receipt_poll_interval: Duration,

    /// How often a failed write is resubmitted.
    #[clap(long, env, default_value = "2")]
    pub leg_retries: usize,

    /// Stop the process when a relay fails instead of waiting for the next
    /// event.
    #[clap(long, env, action = clap::ArgAction::Set, default_value = "false")]
    pub exit_on_relay_failure: bool,

    /// Relay the current index once and exit.
    #[clap(long, env, action = clap::ArgAction::Set, default_value = "false")]
    pub once: bool,
}

impl Arguments {
    pub fn addresses(&self) -> Addresses {
        Addresses {
            source: self.staking_index_source,
            swap_pool: self.swap_pool,
            marketplace: self.marketplace,
        }
    }
}

pub fn duration_from_seconds(s: &str) -> Result<Duration, ParseFloatError> {
    Ok(Duration::from_secs_f32(s.parse()?))
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            log_filter,
            log_stderr_threshold,
            use_json_logs,
            metrics_address,
            source_node_url: _,
            target_node_url: _,
            private_key,
            staking_index_source,
            swap_pool,
            marketplace,
            deployment,
            poll_interval,
            max_blocks_per_scan,
            start_block,
            gas_limit,
            confirmation_timeout,
            receipt_poll_interval,
            leg_retries,
            exit_on_relay_failure,
            once,
        } = self;

        writeln!(f, "log_filter: {log_filter}")?;
        writeln!(f, "log_stderr_threshold: {log_stderr_threshold}")?;
        writeln!(f, "use_json_logs: {use_json_logs}")?;
        writeln!(f, "metrics_address: {metrics_address}")?;
        // Node URLs frequently embed API keys.
        writeln!(f, "source_node_url: SECRET")?;
        writeln!(f, "target_node_url: SECRET")?;
        writeln!(f, "private_key: SECRET ({})", private_key.address())?;
        writeln!(f, "staking_index_source: {staking_index_source}")?;
        writeln!(f, "swap_pool: {swap_pool}")?;
        writeln!(f, "marketplace: {marketplace}")?;
        writeln!(f, "deployment: {deployment}")?;
        writeln!(f, "poll_interval: {poll_interval:?}")?;
        writeln!(f, "max_blocks_per_scan: {max_blocks_per_scan}")?;
        writeln!(f, "start_block: {start_block:?}")?;
        writeln!(f, "gas_limit: {gas_limit}")?;
        writeln!(f, "confirmation_timeout: {confirmation_timeout:?}")?;
        writeln!(f, "receipt_poll_interval: {receipt_poll_interval:?}")?;
        writeln!(f, "leg_retries: {leg_retries}")?;
        writeln!(f, "exit_on_relay_failure: {exit_on_relay_failure}")?;
        writeln!(f, "once: {once}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, clap::Parser};

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn parse(extra: &[&str]) -> Result<Arguments, clap::Error> {
        let required = [
            "staking-relay",
            "--source-node-url",
            "wss://eth-sepolia.example.org/ws/apikey",
            "--target-node-url",
            "https://rpc.thanos-sepolia.example.org",
            "--private-key",
            KEY,
            "--staking-index-source",
            "0x1111111111111111111111111111111111111111",
            "--swap-pool",
            "0x2222222222222222222222222222222222222222",
            "--marketplace",
            "0x3333333333333333333333333333333333333333",
        ];
        Arguments::try_parse_from(required.iter().chain(extra))
    }

    #[test]
    fn deployment_must_be_selected() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["--deployment", "mainnet"]).is_err());

        let args = parse(&["--deployment", "titan"]).unwrap();
        assert_eq!(args.deployment, Deployment::Titan);
        assert_eq!(args.poll_interval, Duration::from_secs(15));
        assert_eq!(args.gas_limit, 300_000);
        assert_eq!(args.confirmation_timeout, Duration::from_secs(120));
        assert_eq!(args.start_block, None);
        assert!(!args.once);
    }

    #[test]
    fn display_redacts_secrets() {
        let args = parse(&["--deployment", "thanos"]).unwrap();
        let display = args.to_string();
        assert!(!display.contains("apikey"));
        assert!(!display.contains(&KEY[2..]));
        assert!(display.contains("deployment: thanos"));
    }
}
