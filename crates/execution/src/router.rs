//! Venue selection and cancel routing.
//!
//! The router owns the venue simulators, picks one per order according to
//! the configured [`RoutingStrategy`], and remembers which venue received
//! each order so cancels can be routed back.

use std::collections::HashMap;

use velo_core::types::{ExecutionReport, OrderId, OrderRequest, OrderStatus, Timestamp, VenueId};

use crate::venue::VenueSimulator;

/// How the router picks a venue for each order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoutingStrategy {
    /// Cycle through the venues in order.
    #[default]
    RoundRobin,
    /// Pick the enabled venue with the smallest simulated latency.
    LowestLatency,
    /// Declared but not implemented: falls back to round-robin. True
    /// best-price would need a cross-venue book scan.
    BestPrice,
}

/// Routes orders to venues and cancels back to the venue that holds them.
pub struct Router {
    venues: Vec<VenueSimulator>,
    strategy: RoutingStrategy,
    round_robin_idx: usize,
    order_venue: HashMap<OrderId, VenueId>,
}

impl Router {
    /// Create an empty router with the given strategy.
    pub fn new(strategy: RoutingStrategy) -> Self {
        Self {
            venues: Vec::new(),
            strategy,
            round_robin_idx: 0,
            order_venue: HashMap::new(),
        }
    }

    /// Register a venue.
    pub fn add_venue(&mut self, venue: VenueSimulator) {
        self.venues.push(venue);
    }

    /// Change the routing strategy.
    pub fn set_strategy(&mut self, strategy: RoutingStrategy) {
        self.strategy = strategy;
    }

    /// Route an order to a venue and return its report.
    ///
    /// With no venues registered, a synthesized Rejected report comes
    /// back.
    pub fn route_order(&mut self, request: &OrderRequest) -> ExecutionReport {
        let Some(venue_idx) = self.select_venue() else {
            return ExecutionReport::rejected(request, 0, Timestamp::now());
        };

        let venue = &mut self.venues[venue_idx];
        self.order_venue.insert(request.id, venue.id());
        venue.submit_order(request)
    }

    /// Route a cancel to the venue that received the order.
    ///
    /// On a successful cancel the order→venue mapping is erased; unknown
    /// ids return a Rejected report.
    pub fn cancel_order(&mut self, order_id: OrderId) -> ExecutionReport {
        let Some(&venue_id) = self.order_venue.get(&order_id) else {
            return synthesized_cancel_reject(order_id);
        };

        let Some(venue) = self.venues.iter_mut().find(|v| v.id() == venue_id) else {
            return synthesized_cancel_reject(order_id);
        };

        let report = venue.cancel_order(order_id);
        if report.status == OrderStatus::Cancelled {
            self.order_venue.remove(&order_id);
        }
        report
    }

    fn select_venue(&mut self) -> Option<usize> {
        if self.venues.is_empty() {
            return None;
        }

        match self.strategy {
            RoutingStrategy::LowestLatency => {
                let best = self
                    .venues
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| v.config().enabled)
                    .min_by_key(|(_, v)| v.config().latency_ns)
                    .map(|(i, _)| i);
                // All venues disabled: fall back to the first.
                Some(best.unwrap_or(0))
            }
            RoutingStrategy::RoundRobin | RoutingStrategy::BestPrice => {
                let idx = self.round_robin_idx % self.venues.len();
                self.round_robin_idx = (self.round_robin_idx + 1) % self.venues.len();
                Some(idx)
            }
        }
    }

    /// The registered venues.
    pub fn venues(&self) -> &[VenueSimulator] {
        &self.venues
    }

    /// Mutable venue access (seeding, inspection).
    pub fn venues_mut(&mut self) -> &mut [VenueSimulator] {
        &mut self.venues
    }

    /// Number of order→venue mappings currently tracked.
    pub fn tracked_orders(&self) -> usize {
        self.order_venue.len()
    }
}

fn synthesized_cancel_reject(order_id: OrderId) -> ExecutionReport {
    use velo_core::types::{OrderType, Price, Side};
    ExecutionReport::rejected(
        &OrderRequest::new(
            order_id,
            0,
            Side::Buy,
            OrderType::Limit,
            Price::ZERO,
            0,
            Timestamp::now(),
        ),
        0,
        Timestamp::now(),
    )
}
