use {
    alloy::{
        primitives::Address,
        providers::Provider,
        rpc::types::{Filter, Log},
        transports::TransportError,
    },
    ethrpc::AlloyProvider,
    futures::{StreamExt, stream::BoxStream},
    tokio::sync::broadcast::error::RecvError,
};

#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    #[error("could not subscribe to logs")]
    Subscribe(#[source] TransportError),
    /// Logs were dropped because they were not consumed fast enough.
    #[error("subscription lagged behind and dropped {0} logs")]
    Lagged(u64),
    #[error("subscription terminated")]
    Terminated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Subscribing,
    Streaming,
    /// The stream reported an error. Logs may have been missed.
    Failed,
    /// The stream ended.
    Terminated,
}

enum Inner {
    Subscribing {
        provider: AlloyProvider,
        filter: Filter,
    },
    Streaming(BoxStream<'static, Result<Log, SubscriptionError>>),
    Failed,
    Terminated,
}

/// Live log subscription for a single contract.
///
/// Once the underlying stream fails or ends the watcher stays in that state
/// forever. Callers are expected to switch to polling instead of trying to
/// resubscribe.
pub struct EventWatcher {
    inner: Inner,
}

impl EventWatcher {
    /// Creates a watcher for logs emitted by `address`. The subscription is
    /// established by [`Self::connect`] or lazily on the first call to
    /// [`Self::next`].
    pub fn new(provider: AlloyProvider, address: Address) -> Self {
        Self {
            inner: Inner::Subscribing {
                provider,
                filter: Filter::new().address(address),
            },
        }
    }

    /// Watcher over an already established stream of logs.
    pub fn from_stream(logs: BoxStream<'static, Result<Log, SubscriptionError>>) -> Self {
        Self {
            inner: Inner::Streaming(logs),
        }
    }

    pub fn state(&self) -> State {
        match self.inner {
            Inner::Subscribing { .. } => State::Subscribing,
            Inner::Streaming(_) => State::Streaming,
            Inner::Failed => State::Failed,
            Inner::Terminated => State::Terminated,
        }
    }

    /// Establishes the subscription if that did not happen yet.
    pub async fn connect(&mut self) -> Result<(), SubscriptionError> {
        let Inner::Subscribing { provider, filter } = &self.inner else {
            return match self.inner {
                Inner::Streaming(_) => Ok(()),
                _ => Err(SubscriptionError::Terminated),
            };
        };
        let subscription = match provider.subscribe_logs(filter).await {
            Ok(subscription) => subscription,
            Err(err) => {
                self.inner = Inner::Failed;
                return Err(SubscriptionError::Subscribe(err));
            }
        };
        tracing::info!("subscribed to source logs");

        // The provider owns the websocket backend and has to outlive the
        // subscription, so it moves into the stream state.
        let provider = provider.clone();
        let logs = futures::stream::unfold(
            Some((provider, subscription)),
            |state| async move {
                let (provider, mut subscription) = state?;
                match subscription.recv().await {
                    Ok(log) => Some((Ok(log), Some((provider, subscription)))),
                    Err(RecvError::Lagged(skipped)) => {
                        Some((Err(SubscriptionError::Lagged(skipped)), None))
                    }
                    Err(RecvError::Closed) => None,
                }
            },
        )
        .boxed();
        self.inner = Inner::Streaming(logs);
        Ok(())
    }

    /// Waits for the next log.
    ///
    /// Never returns `Ok` again after the first error.
    pub async fn next(&mut self) -> Result<Log, SubscriptionError> {
        self.connect().await?;
        let Inner::Streaming(logs) = &mut self.inner else {
            return Err(SubscriptionError::Terminated);
        };
        match logs.next().await {
            Some(Ok(log)) => Ok(log),
            Some(Err(err)) => {
                self.inner = Inner::Failed;
                Err(err)
            }
            None => {
                self.inner = Inner::Terminated;
                Err(SubscriptionError::Terminated)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::testing};

    #[tokio::test]
    async fn does_not_recover_after_failure() {
        let logs = vec![
            Ok(testing::log(testing::withdrawal(1), 5, 0)),
            Err(SubscriptionError::Lagged(3)),
            Ok(testing::log(testing::withdrawal(2), 6, 0)),
        ];
        let mut watcher = EventWatcher::from_stream(futures::stream::iter(logs).boxed());
        assert_eq!(watcher.state(), State::Streaming);

        assert_eq!(watcher.next().await.unwrap().block_number, Some(5));
        assert!(matches!(
            watcher.next().await,
            Err(SubscriptionError::Lagged(3))
        ));
        assert_eq!(watcher.state(), State::Failed);
        assert!(matches!(
            watcher.next().await,
            Err(SubscriptionError::Terminated)
        ));
        assert_eq!(watcher.state(), State::Failed);
    }

    #[tokio::test]
    async fn reports_end_of_stream() {
        let mut watcher = EventWatcher::from_stream(futures::stream::empty().boxed());
        assert!(matches!(
            watcher.next().await,
            Err(SubscriptionError::Terminated)
        ));
        assert_eq!(watcher.state(), State::Terminated);
    }
}
