pub mod errors;
mod instrumentation;

use {
    crate::AlloyProvider,
    alloy::{
        providers::{Provider, ProviderBuilder, WsConnect},
        rpc::client::ClientBuilder,
    },
    anyhow::{Context, Result},
    instrumentation::InstrumentationLayer,
    url::Url,
};

/// Creates an HTTP provider. Every request is logged and measured under
/// `label` so the two ledgers can be told apart in the metrics.
pub fn provider(url: &Url, label: &str) -> AlloyProvider {
    let rpc = ClientBuilder::default()
        .layer(InstrumentationLayer::new(label))
        .http(url.clone());
    ProviderBuilder::new().connect_client(rpc).erased()
}

/// Creates a websocket provider which supports `eth_subscribe`, instrumented
/// like [`provider`].
///
/// alloy reconnects the socket and re-establishes subscriptions on its own.
/// Logs emitted while the socket was down are not delivered, so callers
/// have to backfill them with `eth_getLogs`.
pub async fn ws_provider(url: &Url, label: &str) -> Result<AlloyProvider> {
    tracing::info!(%url, "connecting to websocket endpoint");
    let rpc = ClientBuilder::default()
        .layer(InstrumentationLayer::new(label))
        .ws(WsConnect::new(url.as_str()))
        .await
        .context("failed to connect to websocket")?;
    Ok(ProviderBuilder::new().connect_client(rpc).erased())
}

/// Whether the endpoint can serve log subscriptions.
pub fn supports_subscriptions(url: &Url) -> bool {
    matches!(url.scheme(), "ws" | "wss")
}

/// Connects to `url` over websocket when possible, plain HTTP otherwise.
pub async fn connect(url: &Url, label: &str) -> Result<AlloyProvider> {
    if supports_subscriptions(url) {
        ws_provider(url, label).await
    } else {
        Ok(provider(url, label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_subscription_capable_urls() {
        let ws: Url = "wss://sepolia.example.org/ws".parse().unwrap();
        let http: Url = "https://sepolia.example.org".parse().unwrap();
        assert!(supports_subscriptions(&ws));
        assert!(!supports_subscriptions(&http));
    }
}
