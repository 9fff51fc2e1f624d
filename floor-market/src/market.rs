//! Token ownership state machine.
//!
//! The `Market` is the single shared aggregate of the system: the current
//! token holder plus the ordered membership list. It is mutated only through
//! the transition methods here, and each transition returns every delivery it
//! implies, computed against the post-transition state. The caller owns the
//! aggregate exclusively for the duration of a call, which makes the
//! check-then-act sequences (trade validation, holder reassignment) atomic.

use thiserror::Error;

use crate::event::Event;
use crate::trader::TraderId;

/// Market state errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarketError {
    /// A trader joined twice without leaving. Cannot occur while IDs are
    /// allocated from a strictly-increasing counter.
    #[error("Duplicate trader: {0}")]
    DuplicateTrader(TraderId),
}

/// Result type for market operations.
pub type MarketResult<T> = Result<T, MarketError>;

/// An event routed to one trader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Recipient trader.
    pub to: TraderId,
    /// Event to deliver.
    pub event: Event,
}

impl Delivery {
    fn new(to: TraderId, event: Event) -> Self {
        Self { to, event }
    }
}

/// The market aggregate: current holder and ordered membership.
///
/// Invariants, maintained by every transition:
/// - the holder is either absent or a member,
/// - the holder is absent exactly when the membership is empty,
/// - the membership holds no duplicates.
#[derive(Debug, Default)]
pub struct Market {
    /// Current token holder.
    holder: Option<TraderId>,
    /// Connected traders in join order.
    members: Vec<TraderId>,
}

impl Market {
    /// Create an empty market with no holder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current holder.
    pub fn holder(&self) -> Option<TraderId> {
        self.holder
    }

    /// Get the members in join order.
    pub fn members(&self) -> &[TraderId] {
        &self.members
    }

    /// Check whether a trader is a member.
    pub fn is_member(&self, id: TraderId) -> bool {
        self.members.contains(&id)
    }

    /// Get the number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check whether the market has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Admit a trader.
    ///
    /// The first trader into an empty market becomes the holder. The joiner
    /// receives a `Welcome` with the post-join member list; every trader
    /// already present receives `NewTrader`.
    pub fn join(&mut self, id: TraderId) -> MarketResult<Vec<Delivery>> {
        if self.is_member(id) {
            return Err(MarketError::DuplicateTrader(id));
        }

        let others: Vec<TraderId> = self.members.clone();
        self.members.push(id);

        let holder = match self.holder {
            Some(h) => h,
            None => {
                self.holder = Some(id);
                tracing::debug!(trader = %id, "Token assigned to first trader");
                id
            }
        };

        let mut deliveries = vec![Delivery::new(
            id,
            Event::Welcome {
                id,
                holder,
                members: self.members.clone(),
            },
        )];
        for other in others {
            deliveries.push(Delivery::new(other, Event::NewTrader { id }));
        }

        Ok(deliveries)
    }

    /// Transfer the token from `from` to `to`.
    ///
    /// Valid only if `from` holds the token, `to` is a member, and the two
    /// differ; anything else is a silent rejection (`None`) with no state
    /// change. On success the new holder receives `ReceiveTrade`, the old
    /// holder `ConfirmTrade`, and every uninvolved member `NewStockholder`.
    pub fn trade(&mut self, from: TraderId, to: TraderId) -> Option<Vec<Delivery>> {
        if self.holder != Some(from) || !self.is_member(to) || to == from {
            return None;
        }

        self.holder = Some(to);
        tracing::debug!(from = %from, to = %to, "Token transferred");

        let mut deliveries = vec![
            Delivery::new(to, Event::ReceiveTrade),
            Delivery::new(from, Event::ConfirmTrade { new_holder: to }),
        ];
        for &member in &self.members {
            if member != from && member != to {
                deliveries.push(Delivery::new(member, Event::NewStockholder { id: to }));
            }
        }

        Some(deliveries)
    }

    /// Remove a trader.
    ///
    /// A no-op for unknown IDs, so duplicate disconnect signals are safe.
    /// Every remaining member is told of the departure; if the departed
    /// trader held the token it passes to the longest-connected remaining
    /// member (front of the join-order list), or the market goes vacant.
    pub fn leave(&mut self, id: TraderId) -> Vec<Delivery> {
        let Some(pos) = self.members.iter().position(|&m| m == id) else {
            return Vec::new();
        };
        self.members.remove(pos);

        let mut deliveries: Vec<Delivery> = self
            .members
            .iter()
            .map(|&member| Delivery::new(member, Event::TraderDisconnected { id }))
            .collect();

        if self.holder == Some(id) {
            match self.members.first().copied() {
                Some(new_holder) => {
                    self.holder = Some(new_holder);
                    tracing::debug!(trader = %new_holder, "Token reassigned after holder left");
                    deliveries.push(Delivery::new(new_holder, Event::ReceiveTrade));
                    for &member in &self.members {
                        if member != new_holder {
                            deliveries.push(Delivery::new(
                                member,
                                Event::NewStockholder { id: new_holder },
                            ));
                        }
                    }
                }
                None => {
                    self.holder = None;
                    tracing::debug!("Market is vacant");
                }
            }
        }

        deliveries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> TraderId {
        TraderId::new(n)
    }

    /// Events delivered to one trader, in order.
    fn events_for(deliveries: &[Delivery], to: TraderId) -> Vec<Event> {
        deliveries
            .iter()
            .filter(|d| d.to == to)
            .map(|d| d.event.clone())
            .collect()
    }

    fn check_invariants(market: &Market) {
        match market.holder() {
            Some(h) => assert!(market.is_member(h), "holder must be a member"),
            None => assert!(market.is_empty(), "vacant market must have no members"),
        }
        let mut seen = std::collections::HashSet::new();
        for &m in market.members() {
            assert!(seen.insert(m), "duplicate member {}", m);
        }
    }

    #[test]
    fn test_first_join_takes_token() {
        let mut market = Market::new();
        let deliveries = market.join(id(1)).unwrap();

        assert_eq!(market.holder(), Some(id(1)));
        assert_eq!(market.members(), &[id(1)]);
        assert_eq!(
            deliveries,
            vec![Delivery::new(
                id(1),
                Event::Welcome {
                    id: id(1),
                    holder: id(1),
                    members: vec![id(1)],
                }
            )]
        );
        check_invariants(&market);
    }

    #[test]
    fn test_join_broadcast_reaches_prior_members_only() {
        let mut market = Market::new();
        market.join(id(1)).unwrap();
        market.join(id(2)).unwrap();

        let deliveries = market.join(id(3)).unwrap();

        // Joiner gets the full membership with itself appended last.
        assert_eq!(
            events_for(&deliveries, id(3)),
            vec![Event::Welcome {
                id: id(3),
                holder: id(1),
                members: vec![id(1), id(2), id(3)],
            }]
        );
        // Prior members each get exactly one NewTrader.
        assert_eq!(events_for(&deliveries, id(1)), vec![Event::NewTrader { id: id(3) }]);
        assert_eq!(events_for(&deliveries, id(2)), vec![Event::NewTrader { id: id(3) }]);
        check_invariants(&market);
    }

    #[test]
    fn test_duplicate_join_rejected() {
        let mut market = Market::new();
        market.join(id(1)).unwrap();
        assert_eq!(market.join(id(1)), Err(MarketError::DuplicateTrader(id(1))));
        assert_eq!(market.members(), &[id(1)]);
    }

    #[test]
    fn test_trade_fanout_excludes_parties() {
        let mut market = Market::new();
        market.join(id(1)).unwrap();
        market.join(id(2)).unwrap();
        market.join(id(3)).unwrap();

        let deliveries = market.trade(id(1), id(2)).expect("trade should be accepted");

        assert_eq!(market.holder(), Some(id(2)));
        assert_eq!(events_for(&deliveries, id(2)), vec![Event::ReceiveTrade]);
        assert_eq!(
            events_for(&deliveries, id(1)),
            vec![Event::ConfirmTrade { new_holder: id(2) }]
        );
        assert_eq!(
            events_for(&deliveries, id(3)),
            vec![Event::NewStockholder { id: id(2) }]
        );
        check_invariants(&market);
    }

    #[test]
    fn test_trade_rejected_when_not_holder() {
        let mut market = Market::new();
        market.join(id(1)).unwrap();
        market.join(id(2)).unwrap();

        assert!(market.trade(id(2), id(1)).is_none());
        assert_eq!(market.holder(), Some(id(1)));
    }

    #[test]
    fn test_trade_rejected_for_unknown_target() {
        let mut market = Market::new();
        market.join(id(1)).unwrap();

        assert!(market.trade(id(1), id(9)).is_none());
        assert_eq!(market.holder(), Some(id(1)));
    }

    #[test]
    fn test_trade_rejected_for_self() {
        let mut market = Market::new();
        market.join(id(1)).unwrap();
        market.join(id(2)).unwrap();

        assert!(market.trade(id(1), id(1)).is_none());
        assert_eq!(market.holder(), Some(id(1)));
    }

    #[test]
    fn test_deterministic_reassignment_chain() {
        let mut market = Market::new();
        market.join(id(1)).unwrap();
        market.join(id(2)).unwrap();
        market.join(id(3)).unwrap();

        // Holder A leaves: B (longest connected) takes the token.
        market.leave(id(1));
        assert_eq!(market.holder(), Some(id(2)));
        check_invariants(&market);

        market.leave(id(2));
        assert_eq!(market.holder(), Some(id(3)));
        check_invariants(&market);

        // Last member leaves: vacant.
        market.leave(id(3));
        assert_eq!(market.holder(), None);
        assert!(market.is_empty());
        check_invariants(&market);
    }

    #[test]
    fn test_holder_leave_deliveries() {
        let mut market = Market::new();
        market.join(id(1)).unwrap();
        market.join(id(2)).unwrap();
        market.join(id(3)).unwrap();

        let deliveries = market.leave(id(1));

        // New holder hears of the departure first, then receives the token.
        assert_eq!(
            events_for(&deliveries, id(2)),
            vec![
                Event::TraderDisconnected { id: id(1) },
                Event::ReceiveTrade,
            ]
        );
        assert_eq!(
            events_for(&deliveries, id(3)),
            vec![
                Event::TraderDisconnected { id: id(1) },
                Event::NewStockholder { id: id(2) },
            ]
        );
        // Nothing goes to the departed trader.
        assert!(events_for(&deliveries, id(1)).is_empty());
    }

    #[test]
    fn test_non_holder_leave_keeps_holder() {
        let mut market = Market::new();
        market.join(id(1)).unwrap();
        market.join(id(2)).unwrap();
        market.join(id(3)).unwrap();

        let deliveries = market.leave(id(2));

        assert_eq!(market.holder(), Some(id(1)));
        assert_eq!(market.members(), &[id(1), id(3)]);
        assert_eq!(
            events_for(&deliveries, id(1)),
            vec![Event::TraderDisconnected { id: id(2) }]
        );
        assert_eq!(
            events_for(&deliveries, id(3)),
            vec![Event::TraderDisconnected { id: id(2) }]
        );
        check_invariants(&market);
    }

    #[test]
    fn test_leave_unknown_is_noop() {
        let mut market = Market::new();
        market.join(id(1)).unwrap();

        let deliveries = market.leave(id(9));
        assert!(deliveries.is_empty());
        assert_eq!(market.holder(), Some(id(1)));

        // Duplicate disconnect signal for a trader that already left.
        market.leave(id(1));
        assert!(market.leave(id(1)).is_empty());
        check_invariants(&market);
    }

    #[test]
    fn test_rejoin_after_vacant() {
        let mut market = Market::new();
        market.join(id(1)).unwrap();
        market.leave(id(1));
        assert_eq!(market.holder(), None);

        market.join(id(2)).unwrap();
        assert_eq!(market.holder(), Some(id(2)));
        assert_eq!(market.members(), &[id(2)]);
        check_invariants(&market);
    }

    #[test]
    fn test_invariants_across_interleavings() {
        // Exercise a mixed sequence of joins, trades, and leaves and check
        // the invariants after every operation.
        let mut market = Market::new();
        let ops: Vec<Box<dyn Fn(&mut Market)>> = vec![
            Box::new(|m| {
                m.join(id(1)).unwrap();
            }),
            Box::new(|m| {
                m.join(id(2)).unwrap();
            }),
            Box::new(|m| {
                m.trade(id(1), id(2));
            }),
            Box::new(|m| {
                m.join(id(3)).unwrap();
            }),
            Box::new(|m| {
                m.trade(id(2), id(3));
            }),
            Box::new(|m| {
                m.leave(id(3));
            }),
            Box::new(|m| {
                m.trade(id(3), id(1));
            }),
            Box::new(|m| {
                m.leave(id(1));
            }),
            Box::new(|m| {
                m.leave(id(2));
            }),
        ];

        for op in ops {
            op(&mut market);
            check_invariants(&market);
        }
        assert!(market.is_empty());
    }
}
