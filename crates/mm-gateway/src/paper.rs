//! In-memory paper gateway.
//!
//! Simulates one exchange account: a static external book per pair and our
//! own resting orders merged into depth. Immediate-or-cancel orders never
//! rest; they only move the last traded price. There is no matching. Used
//! for dry runs and as the test double for every control loop.
//!
//! State sits behind a `parking_lot::Mutex` that is never held across an
//! await point.

use std::collections::{BTreeMap, HashMap, VecDeque};

use mm_core::{
    BookLevel, CurrencyPair, OpenOrder, OrderBookSnapshot, OrderId, OrderRequest, OrderSide,
    OrderType, Price, Size, Ticker,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{
    snap_depth_limit, BoxFuture, ExchangeGateway, OrderOutcome, PlacedOrder, RejectReason,
};

/// Gateway operation, used to target injected faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    Ticker,
    Depth,
    CreateOrder,
    CancelOrder,
    OpenOrders,
}

/// Execution of an immediate-or-cancel order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperTrade {
    pub pair: CurrencyPair,
    /// Side of the aggressive order.
    pub side: OrderSide,
    pub price: Price,
    pub amount: Size,
}

/// External liquidity for one pair, excluding our own orders.
#[derive(Debug, Clone, Default)]
struct PairMarket {
    bids: Vec<BookLevel>,
    asks: Vec<BookLevel>,
    last: Price,
}

#[derive(Debug, Default)]
struct PaperState {
    markets: HashMap<CurrencyPair, PairMarket>,
    /// Our resting orders, oldest first.
    open: Vec<OpenOrder>,
    created: Vec<OrderRequest>,
    cancelled: Vec<OrderId>,
    trades: Vec<PaperTrade>,
    depth_requests: Vec<u32>,
    faults: HashMap<GatewayOp, GatewayError>,
    rejections: VecDeque<RejectReason>,
}

impl PaperState {
    fn take_fault(&mut self, op: GatewayOp) -> GatewayResult<()> {
        match self.faults.remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn market(&self, pair: &CurrencyPair) -> GatewayResult<&PairMarket> {
        self.markets
            .get(pair)
            .ok_or_else(|| GatewayError::UnknownPair(pair.symbol()))
    }

    fn snapshot(&self, pair: &CurrencyPair, limit: usize) -> GatewayResult<OrderBookSnapshot> {
        let market = self.market(pair)?;

        let mut bids: BTreeMap<Price, Size> = BTreeMap::new();
        let mut asks: BTreeMap<Price, Size> = BTreeMap::new();
        for level in &market.bids {
            *bids.entry(level.price).or_insert(Size::ZERO) += level.amount;
        }
        for level in &market.asks {
            *asks.entry(level.price).or_insert(Size::ZERO) += level.amount;
        }
        for order in self.open.iter().filter(|o| &o.pair == pair) {
            let levels = match order.side {
                OrderSide::Buy => &mut bids,
                OrderSide::Sell => &mut asks,
            };
            *levels.entry(order.price).or_insert(Size::ZERO) += order.amount;
        }

        let to_levels = |levels: BTreeMap<Price, Size>| -> Vec<BookLevel> {
            levels
                .into_iter()
                .map(|(price, amount)| BookLevel::new(price, amount))
                .collect()
        };
        Ok(OrderBookSnapshot::from_unsorted(to_levels(bids), to_levels(asks)).truncated(limit))
    }

    /// Record an immediate-or-cancel order as traded at its limit price.
    /// Market orders trade at the last price.
    ///
    /// No matching happens: resting orders are left untouched.
    fn record_trade(&mut self, request: &OrderRequest) {
        let Some(market) = self.markets.get_mut(&request.pair) else {
            return;
        };
        let Some(price) = request.price.or(Some(market.last).filter(|p| p.is_positive())) else {
            return;
        };
        market.last = price;
        self.trades.push(PaperTrade {
            pair: request.pair.clone(),
            side: request.side,
            price,
            amount: request.amount,
        });
    }
}

/// Paper trading gateway.
#[derive(Debug, Default)]
pub struct PaperGateway {
    state: Mutex<PaperState>,
    /// Exchange minimum order value in quote currency.
    min_notional: Option<Decimal>,
}

impl PaperGateway {
    /// Create a gateway with no listed pairs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject orders whose notional is below `min_notional`.
    #[must_use]
    pub fn with_min_notional(mut self, min_notional: Decimal) -> Self {
        self.min_notional = Some(min_notional);
        self
    }

    /// List a pair with an empty external book and the given last price.
    #[must_use]
    pub fn with_pair(self, pair: CurrencyPair, last: Price) -> Self {
        self.state.lock().markets.insert(
            pair,
            PairMarket {
                last,
                ..PairMarket::default()
            },
        );
        self
    }

    /// Replace the external liquidity of a listed pair.
    pub fn set_external_book(
        &self,
        pair: &CurrencyPair,
        bids: Vec<BookLevel>,
        asks: Vec<BookLevel>,
    ) {
        let mut state = self.state.lock();
        let market = state.markets.entry(pair.clone()).or_default();
        market.bids = bids;
        market.asks = asks;
    }

    pub fn set_last_price(&self, pair: &CurrencyPair, last: Price) {
        self.state.lock().markets.entry(pair.clone()).or_default().last = last;
    }

    /// Add a resting order directly, bypassing validation.
    pub fn seed_order(
        &self,
        pair: &CurrencyPair,
        side: OrderSide,
        price: Price,
        amount: Size,
    ) -> OrderId {
        let id = Self::next_order_id();
        self.state
            .lock()
            .open
            .push(OpenOrder::new(id.clone(), pair.clone(), side, price, amount));
        id
    }

    /// Make the next call of `op` fail with `err`.
    pub fn fail_next(&self, op: GatewayOp, err: GatewayError) {
        self.state.lock().faults.insert(op, err);
    }

    /// Make the next order submission come back rejected.
    pub fn reject_next_order(&self, reason: RejectReason) {
        self.state.lock().rejections.push_back(reason);
    }

    /// Every order request received, including rejected ones.
    pub fn created_orders(&self) -> Vec<OrderRequest> {
        self.state.lock().created.clone()
    }

    pub fn cancelled_orders(&self) -> Vec<OrderId> {
        self.state.lock().cancelled.clone()
    }

    pub fn trades(&self) -> Vec<PaperTrade> {
        self.state.lock().trades.clone()
    }

    /// Depth limits requested so far, after snapping.
    pub fn depth_requests(&self) -> Vec<u32> {
        self.state.lock().depth_requests.clone()
    }

    /// Our resting orders on one side of one pair.
    pub fn resting(&self, pair: &CurrencyPair, side: OrderSide) -> Vec<OpenOrder> {
        self.state
            .lock()
            .open
            .iter()
            .filter(|o| &o.pair == pair && o.side == side)
            .cloned()
            .collect()
    }

    /// Total resting amount we hold on one side of one pair.
    pub fn resting_volume(&self, pair: &CurrencyPair, side: OrderSide) -> Size {
        self.resting(pair, side).iter().map(|o| o.amount).sum()
    }

    fn next_order_id() -> OrderId {
        OrderId::new(format!("paper-{}", Uuid::new_v4().simple()))
    }

    fn validate(&self, request: &OrderRequest) -> Option<RejectReason> {
        if !request.amount.is_positive() {
            return Some(RejectReason::InvalidAmount);
        }
        match (request.order_type, request.price) {
            (OrderType::Limit, None) => return Some(RejectReason::InvalidPrice),
            (_, Some(price)) if !price.is_positive() => return Some(RejectReason::InvalidPrice),
            _ => {}
        }
        if let (Some(min), Some(notional)) = (self.min_notional, request.notional()) {
            if notional < min {
                return Some(RejectReason::BelowMinimum);
            }
        }
        None
    }

    fn place(&self, request: OrderRequest) -> GatewayResult<OrderOutcome> {
        let mut state = self.state.lock();
        state.take_fault(GatewayOp::CreateOrder)?;
        state.market(&request.pair)?;
        state.created.push(request.clone());

        if let Some(reason) = state.rejections.pop_front().or_else(|| self.validate(&request)) {
            debug!(order = %request, %reason, "Paper order rejected");
            return Ok(OrderOutcome::Rejected(reason));
        }

        let id = Self::next_order_id();
        if request.is_ioc() || request.order_type == OrderType::Market {
            state.record_trade(&request);
            debug!(order = %request, %id, "Paper order executed");
        } else if let Some(price) = request.price {
            state.open.push(OpenOrder::new(
                id.clone(),
                request.pair.clone(),
                request.side,
                price,
                request.amount,
            ));
            debug!(order = %request, %id, "Paper order resting");
        }

        Ok(OrderOutcome::Placed(PlacedOrder { id, request }))
    }

    fn cancel(
        &self,
        pair: &CurrencyPair,
        order_id: &OrderId,
        side: OrderSide,
    ) -> GatewayResult<()> {
        let mut state = self.state.lock();
        state.take_fault(GatewayOp::CancelOrder)?;

        let position = state
            .open
            .iter()
            .position(|o| &o.id == order_id && &o.pair == pair && o.side == side)
            .ok_or_else(|| GatewayError::UnknownOrder(order_id.clone()))?;
        state.open.remove(position);
        state.cancelled.push(order_id.clone());
        debug!(%order_id, %side, "Paper order cancelled");
        Ok(())
    }
}

impl ExchangeGateway for PaperGateway {
    fn ticker<'a>(&'a self, pair: &'a CurrencyPair) -> BoxFuture<'a, GatewayResult<Ticker>> {
        Box::pin(async move {
            let mut state = self.state.lock();
            state.take_fault(GatewayOp::Ticker)?;
            Ok(Ticker::new(state.market(pair)?.last))
        })
    }

    fn depth<'a>(
        &'a self,
        pair: &'a CurrencyPair,
        limit: u32,
    ) -> BoxFuture<'a, GatewayResult<OrderBookSnapshot>> {
        Box::pin(async move {
            let mut state = self.state.lock();
            state.take_fault(GatewayOp::Depth)?;
            let limit = snap_depth_limit(limit);
            state.depth_requests.push(limit);
            state.snapshot(pair, limit as usize)
        })
    }

    fn create_order(&self, request: OrderRequest) -> BoxFuture<'_, GatewayResult<OrderOutcome>> {
        Box::pin(async move { self.place(request) })
    }

    fn cancel_order<'a>(
        &'a self,
        pair: &'a CurrencyPair,
        order_id: &'a OrderId,
        side: OrderSide,
    ) -> BoxFuture<'a, GatewayResult<()>> {
        Box::pin(async move { self.cancel(pair, order_id, side) })
    }

    fn open_orders(&self) -> BoxFuture<'_, GatewayResult<Vec<OpenOrder>>> {
        Box::pin(async move {
            let mut state = self.state.lock();
            state.take_fault(GatewayOp::OpenOrders)?;
            Ok(state.open.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_core::BookSide;
    use rust_decimal_macros::dec;

    fn pair() -> CurrencyPair {
        CurrencyPair::new("BTC", "USDT").unwrap()
    }

    fn px(d: Decimal) -> Price {
        Price::new(d)
    }

    fn sz(d: Decimal) -> Size {
        Size::new(d)
    }

    fn gateway() -> PaperGateway {
        PaperGateway::new().with_pair(pair(), px(dec!(100)))
    }

    #[tokio::test]
    async fn test_limit_order_rests_and_shows_in_depth() {
        let gw = gateway();
        let outcome = gw
            .create_order(OrderRequest::limit(pair(), OrderSide::Buy, sz(dec!(2)), px(dec!(99))))
            .await
            .unwrap();
        assert!(outcome.is_placed());

        let book = gw.depth(&pair(), 10).await.unwrap();
        assert_eq!(book.best_bid(), Some(px(dec!(99))));
        assert_eq!(book.total_amount(BookSide::Bids), sz(dec!(2)));
        assert_eq!(gw.open_orders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_depth_merges_external_and_own_levels() {
        let gw = gateway();
        gw.set_external_book(
            &pair(),
            vec![BookLevel::new(px(dec!(99)), sz(dec!(1)))],
            vec![BookLevel::new(px(dec!(101)), sz(dec!(1)))],
        );
        gw.seed_order(&pair(), OrderSide::Buy, px(dec!(99)), sz(dec!(3)));
        gw.seed_order(&pair(), OrderSide::Buy, px(dec!(98)), sz(dec!(1)));

        let book = gw.depth(&pair(), 5).await.unwrap();
        assert_eq!(book.bids()[0], BookLevel::new(px(dec!(99)), sz(dec!(4))));
        assert_eq!(book.bids()[1].price, px(dec!(98)));
        assert_eq!(book.best_ask(), Some(px(dec!(101))));
    }

    #[tokio::test]
    async fn test_depth_limit_is_snapped() {
        let gw = gateway();
        gw.depth(&pair(), 7).await.unwrap();
        gw.depth(&pair(), 80).await.unwrap();
        assert_eq!(gw.depth_requests(), vec![5, 100]);
    }

    #[tokio::test]
    async fn test_validation_rejections() {
        let gw = gateway().with_min_notional(dec!(10));

        let zero_price = OrderRequest::limit(pair(), OrderSide::Buy, sz(dec!(1)), Price::ZERO);
        let zero_amount = OrderRequest::limit(pair(), OrderSide::Buy, Size::ZERO, px(dec!(99)));
        let tiny = OrderRequest::limit(pair(), OrderSide::Sell, sz(dec!(0.05)), px(dec!(100)));

        assert_eq!(
            gw.create_order(zero_price).await.unwrap(),
            OrderOutcome::Rejected(RejectReason::InvalidPrice)
        );
        assert_eq!(
            gw.create_order(zero_amount).await.unwrap(),
            OrderOutcome::Rejected(RejectReason::InvalidAmount)
        );
        assert_eq!(
            gw.create_order(tiny).await.unwrap(),
            OrderOutcome::Rejected(RejectReason::BelowMinimum)
        );
        assert_eq!(gw.created_orders().len(), 3);
        assert!(gw.open_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_forced_rejection_is_one_shot() {
        let gw = gateway();
        gw.reject_next_order(RejectReason::InsufficientFunds);
        let request = OrderRequest::limit(pair(), OrderSide::Buy, sz(dec!(1)), px(dec!(99)));

        let first = gw.create_order(request.clone()).await.unwrap();
        let second = gw.create_order(request).await.unwrap();
        assert_eq!(first, OrderOutcome::Rejected(RejectReason::InsufficientFunds));
        assert!(second.is_placed());
    }

    #[tokio::test]
    async fn test_injected_fault_is_one_shot() {
        let gw = gateway();
        gw.fail_next(GatewayOp::Ticker, GatewayError::Transport("down".into()));

        assert!(matches!(
            gw.ticker(&pair()).await,
            Err(GatewayError::Transport(_))
        ));
        assert_eq!(gw.ticker(&pair()).await.unwrap().last, px(dec!(100)));
    }

    #[tokio::test]
    async fn test_unknown_pair() {
        let gw = gateway();
        let other = CurrencyPair::new("ETH", "USDT").unwrap();
        assert!(matches!(
            gw.ticker(&other).await,
            Err(GatewayError::UnknownPair(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_removes_order_once() {
        let gw = gateway();
        let id = gw.seed_order(&pair(), OrderSide::Sell, px(dec!(101)), sz(dec!(1)));

        gw.cancel_order(&pair(), &id, OrderSide::Sell).await.unwrap();
        assert!(matches!(
            gw.cancel_order(&pair(), &id, OrderSide::Sell).await,
            Err(GatewayError::UnknownOrder(_))
        ));
        assert_eq!(gw.cancelled_orders(), vec![id]);
    }

    #[tokio::test]
    async fn test_ioc_order_sets_last_price_and_does_not_rest() {
        let gw = gateway();
        gw.seed_order(&pair(), OrderSide::Sell, px(dec!(101)), sz(dec!(1)));

        let request = OrderRequest::limit(pair(), OrderSide::Buy, sz(dec!(0.4)), px(dec!(101)))
            .immediate_or_cancel();
        assert!(gw.create_order(request).await.unwrap().is_placed());

        assert_eq!(gw.ticker(&pair()).await.unwrap().last, px(dec!(101)));
        assert_eq!(gw.resting(&pair(), OrderSide::Buy).len(), 0);
        // Resting liquidity is not consumed.
        assert_eq!(gw.resting_volume(&pair(), OrderSide::Sell), sz(dec!(1)));

        let trades = gw.trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].side, OrderSide::Buy);
        assert_eq!(trades[0].amount, sz(dec!(0.4)));
    }

    #[tokio::test]
    async fn test_market_order_trades_at_last_price() {
        let gw = gateway();
        gw.set_last_price(&pair(), px(dec!(100.5)));

        let request = OrderRequest::market(pair(), OrderSide::Sell, sz(dec!(0.2)));
        assert!(gw.create_order(request).await.unwrap().is_placed());

        let trades = gw.trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, px(dec!(100.5)));
        assert!(gw.resting(&pair(), OrderSide::Sell).is_empty());
    }
}
