use {
    crate::{
        contracts::{L1WrappedStakedTon, L1WrappedStakedTonThanos, L1WrappedStakedTonTitan},
        domain::{Deposited, DomainEvent, WithdrawalRequested},
        profile::DepositLayout,
    },
    alloy::{rpc::types::Log, sol_types::SolEvent},
};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("log payload does not match the {event} layout")]
    Malformed {
        event: &'static str,
        #[source]
        source: alloy::sol_types::Error,
    },
}

/// Turns raw source logs into domain events.
#[derive(Clone, Copy, Debug)]
pub struct EventDecoder {
    layout: DepositLayout,
}

impl EventDecoder {
    pub fn new(layout: DepositLayout) -> Self {
        Self { layout }
    }

    /// Decodes a single log.
    ///
    /// Returns `Ok(None)` for logs that are not relay triggers (unknown
    /// signature or no topics at all) and an error for logs that carry a known
    /// signature but a payload that does not fit it.
    pub fn decode(&self, log: &Log) -> Result<Option<DomainEvent>, DecodeError> {
        let Some(signature) = log.topic0() else {
            return Ok(None);
        };
        let data = log.data();

        if *signature == L1WrappedStakedTon::WithdrawalRequested::SIGNATURE_HASH {
            let event = L1WrappedStakedTon::WithdrawalRequested::decode_log_data(data)
                .map_err(malformed("WithdrawalRequested"))?;
            return Ok(Some(DomainEvent::WithdrawalRequested(WithdrawalRequested {
                to: event._to,
                amount: event.amount,
            })));
        }

        let deposited = match self.layout {
            DepositLayout::WithTokenFlag
                if *signature == L1WrappedStakedTonThanos::Deposited::SIGNATURE_HASH =>
            {
                let event = L1WrappedStakedTonThanos::Deposited::decode_log_data(data)
                    .map_err(malformed("Deposited"))?;
                Deposited {
                    to: event.to,
                    token: Some(event.token),
                    amount: event.amount,
                    wston_amount: event.wstonAmount,
                    deposit_time: event.depositTime,
                    deposit_block_number: event.depositBlockNumber,
                }
            }
            DepositLayout::WithoutTokenFlag
                if *signature == L1WrappedStakedTonTitan::Deposited::SIGNATURE_HASH =>
            {
                let event = L1WrappedStakedTonTitan::Deposited::decode_log_data(data)
                    .map_err(malformed("Deposited"))?;
                Deposited {
                    to: event.to,
                    token: None,
                    amount: event.amount,
                    wston_amount: event.wstonAmount,
                    deposit_time: event.depositTime,
                    deposit_block_number: event.depositBlockNumber,
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(DomainEvent::Deposited(deposited)))
    }
}

fn malformed(event: &'static str) -> impl FnOnce(alloy::sol_types::Error) -> DecodeError {
    move |source| DecodeError::Malformed { event, source }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::testing,
        alloy::primitives::{Address, B256, LogData, U256},
    };

    fn thanos_deposit() -> LogData {
        L1WrappedStakedTonThanos::Deposited {
            to: Address::repeat_byte(0xaa),
            token: true,
            amount: U256::from(1000),
            wstonAmount: U256::from(952),
            depositTime: U256::from(1_700_000_000),
            depositBlockNumber: U256::from(19_000_000),
        }
        .encode_log_data()
    }

    #[test]
    fn decodes_deposit_with_token_flag() {
        let decoder = EventDecoder::new(DepositLayout::WithTokenFlag);
        let event = decoder
            .decode(&testing::log(thanos_deposit(), 10, 0))
            .unwrap();
        assert_eq!(
            event,
            Some(DomainEvent::Deposited(Deposited {
                to: Address::repeat_byte(0xaa),
                token: Some(true),
                amount: U256::from(1000),
                wston_amount: U256::from(952),
                deposit_time: U256::from(1_700_000_000),
                deposit_block_number: U256::from(19_000_000),
            }))
        );
    }

    #[test]
    fn decodes_deposit_without_token_flag() {
        let data = L1WrappedStakedTonTitan::Deposited {
            to: Address::repeat_byte(0xbb),
            amount: U256::from(7),
            wstonAmount: U256::from(6),
            depositTime: U256::from(1),
            depositBlockNumber: U256::from(2),
        }
        .encode_log_data();
        let decoder = EventDecoder::new(DepositLayout::WithoutTokenFlag);
        let Some(DomainEvent::Deposited(deposited)) =
            decoder.decode(&testing::log(data, 10, 0)).unwrap()
        else {
            panic!("expected a deposit");
        };
        assert_eq!(deposited.token, None);
        assert_eq!(deposited.wston_amount, U256::from(6));
    }

    #[test]
    fn takes_withdrawal_recipient_from_topic() {
        let decoder = EventDecoder::new(DepositLayout::WithoutTokenFlag);
        let event = decoder
            .decode(&testing::log(testing::withdrawal(500), 10, 0))
            .unwrap();
        assert_eq!(
            event,
            Some(DomainEvent::WithdrawalRequested(WithdrawalRequested {
                to: testing::RECIPIENT,
                amount: U256::from(500),
            }))
        );
    }

    #[test]
    fn ignores_unrelated_logs() {
        let decoder = EventDecoder::new(DepositLayout::WithoutTokenFlag);

        let no_topics = LogData::new_unchecked(vec![], vec![1, 2, 3].into());
        assert_eq!(decoder.decode(&testing::log(no_topics, 1, 0)).unwrap(), None);

        let unknown = LogData::new_unchecked(vec![B256::repeat_byte(0x42)], Default::default());
        assert_eq!(decoder.decode(&testing::log(unknown, 1, 1)).unwrap(), None);

        // Deposit of the other contract revision.
        assert_eq!(
            decoder.decode(&testing::log(thanos_deposit(), 1, 2)).unwrap(),
            None
        );
    }

    #[test]
    fn rejects_truncated_payloads() {
        let decoder = EventDecoder::new(DepositLayout::WithTokenFlag);

        let mut deposit = thanos_deposit();
        let truncated = deposit.data[..64].to_vec();
        deposit.data = truncated.into();
        assert!(matches!(
            decoder.decode(&testing::log(deposit, 1, 0)),
            Err(DecodeError::Malformed {
                event: "Deposited",
                ..
            })
        ));

        let mut withdrawal = testing::withdrawal(500);
        withdrawal.data = vec![0xff; 3].into();
        assert!(matches!(
            decoder.decode(&testing::log(withdrawal, 1, 1)),
            Err(DecodeError::Malformed {
                event: "WithdrawalRequested",
                ..
            })
        ));
    }
}
