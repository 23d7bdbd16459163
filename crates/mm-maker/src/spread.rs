//! Spread maintenance.
//!
//! Keeps one bid and one ask quoted at a fixed distance around the
//! reference price, whatever other participants do.

use mm_core::{CurrencyPair, OrderRequest, OrderSide, Price, Size};
use mm_gateway::ExchangeGateway;
use rand::Rng;
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::MakerConfig;
use crate::error::MakerResult;
use crate::orders::{self, SOURCE_SPREAD};
use crate::random::random_decimal;

/// Levels at which quoting uses the top of the book only.
const TOP_OF_BOOK_DEPTH: u32 = 5;

/// Our quoted bid and ask.
///
/// `ask == bid + max_spread`, both on the price grid, `bid >= price_step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpreadLevels {
    pub bid: Price,
    pub ask: Price,
}

impl SpreadLevels {
    pub fn price(&self, side: OrderSide) -> Price {
        match side {
            OrderSide::Buy => self.bid,
            OrderSide::Sell => self.ask,
        }
    }
}

/// Center a spread of `max_spread` on `reference`.
pub fn compute_spread_levels(
    reference: Price,
    max_spread: Price,
    price_step: Price,
) -> SpreadLevels {
    let mut bid = (reference - max_spread / Decimal::TWO).round_to_tick(price_step);
    if bid < price_step {
        bid = price_step;
    }
    SpreadLevels {
        bid,
        ask: bid + max_spread,
    }
}

/// Raise `amount` so that `amount * price` reaches `min_notional`.
///
/// The replacement is rounded up to `amount_step`, so the minimum holds
/// exactly. Amounts already large enough are returned unchanged.
pub fn ensure_minimum_notional(
    amount: Size,
    price: Price,
    min_notional: Decimal,
    amount_step: Size,
) -> Size {
    if !price.is_positive() || amount.notional(price) >= min_notional {
        return amount;
    }
    Size::new(min_notional / price.inner()).ceil_to_lot(amount_step)
}

/// What one spread pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpreadReport {
    pub bid_quoted: bool,
    pub ask_quoted: bool,
}

/// Quote at `levels` on each side whose best price is missing or behind it.
pub async fn maintain_spread<R: Rng + Send + ?Sized>(
    gateway: &dyn ExchangeGateway,
    pair: &CurrencyPair,
    levels: SpreadLevels,
    config: &MakerConfig,
    rng: &mut R,
) -> MakerResult<SpreadReport> {
    let book = gateway.depth(pair, TOP_OF_BOOK_DEPTH).await?;
    let mut report = SpreadReport::default();

    for side in [OrderSide::Buy, OrderSide::Sell] {
        let target = levels.price(side);
        let covered = match (side, book.best(side.resting_side())) {
            (OrderSide::Buy, Some(best)) => best >= target,
            (OrderSide::Sell, Some(best)) => best <= target,
            (_, None) => false,
        };
        if covered {
            debug!(%side, %target, "Spread level already quoted");
            continue;
        }

        let amount = quote_amount(config, target, rng);
        let request = OrderRequest::limit(pair.clone(), side, amount, target);
        orders::submit(gateway, request, SOURCE_SPREAD).await?;
        match side {
            OrderSide::Buy => report.bid_quoted = true,
            OrderSide::Sell => report.ask_quoted = true,
        }
    }

    Ok(report)
}

/// Random amount in `[min, 3 * min]`, with `min` raised to the notional floor.
fn quote_amount<R: Rng + ?Sized>(config: &MakerConfig, price: Price, rng: &mut R) -> Size {
    let ob = &config.orderbook;
    let min = ensure_minimum_notional(
        ob.min_order_amount,
        price,
        config.min_order_notional,
        ob.amount_step,
    );
    Size::new(random_decimal(
        rng,
        min.inner(),
        min.inner() * Decimal::from(3),
        ob.amount_step.inner(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_core::BookLevel;
    use mm_gateway::PaperGateway;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rust_decimal_macros::dec;

    fn px(d: Decimal) -> Price {
        Price::new(d)
    }

    fn sz(d: Decimal) -> Size {
        Size::new(d)
    }

    fn pair() -> CurrencyPair {
        CurrencyPair::new("BTC", "USDT").unwrap()
    }

    #[test]
    fn test_spread_levels_around_reference() {
        let levels = compute_spread_levels(px(dec!(100)), px(dec!(2)), px(dec!(0.01)));
        assert_eq!(levels.bid, px(dec!(99.00)));
        assert_eq!(levels.ask, px(dec!(101.00)));
    }

    #[test]
    fn test_spread_levels_on_grid() {
        let step = px(dec!(0.05));
        let levels = compute_spread_levels(px(dec!(100.03)), px(dec!(0.5)), step);
        assert_eq!(levels.bid, px(dec!(99.75)));
        assert_eq!(levels.ask, levels.bid + px(dec!(0.5)));
        assert!((levels.bid.inner() / step.inner()).fract().is_zero());
    }

    #[test]
    fn test_spread_levels_bid_floor() {
        let levels = compute_spread_levels(px(dec!(0.5)), px(dec!(2)), px(dec!(0.01)));
        assert_eq!(levels.bid, px(dec!(0.01)));
        assert_eq!(levels.ask, px(dec!(2.01)));
    }

    #[test]
    fn test_ensure_minimum_notional() {
        let step = sz(dec!(0.01));
        // 0.05 * 100 = 5 < 10 -> 10 / 100 = 0.1
        assert_eq!(
            ensure_minimum_notional(sz(dec!(0.05)), px(dec!(100)), dec!(10), step),
            sz(dec!(0.1))
        );
        // 10 / 3 = 3.333.. -> rounded up to 3.34
        let adjusted = ensure_minimum_notional(sz(dec!(1)), px(dec!(3)), dec!(10), step);
        assert_eq!(adjusted, sz(dec!(3.34)));
        assert!(adjusted.notional(px(dec!(3))) >= dec!(10));
        // Large enough already.
        assert_eq!(
            ensure_minimum_notional(sz(dec!(2)), px(dec!(100)), dec!(10), step),
            sz(dec!(2))
        );
    }

    #[tokio::test]
    async fn test_quotes_both_sides_on_empty_book() {
        let gateway = PaperGateway::new().with_pair(pair(), Price::ZERO);
        let config = MakerConfig::default();
        let levels = compute_spread_levels(px(dec!(100)), px(dec!(2)), px(dec!(0.01)));
        let mut rng = StdRng::seed_from_u64(5);

        let report = maintain_spread(&gateway, &pair(), levels, &config, &mut rng)
            .await
            .unwrap();
        assert!(report.bid_quoted && report.ask_quoted);

        let created = gateway.created_orders();
        assert_eq!(created.len(), 2);
        assert_eq!(created[0].price, Some(px(dec!(99))));
        assert_eq!(created[1].price, Some(px(dec!(101))));
        // 0.1 @ 99 is below the 10 notional floor, so the bid minimum becomes 0.11.
        assert!(created[0].amount >= sz(dec!(0.11)) && created[0].amount <= sz(dec!(0.33)));
        assert!(created[1].amount >= sz(dec!(0.1)) && created[1].amount <= sz(dec!(0.3)));
        for request in &created {
            assert!(request.notional().unwrap() >= dec!(10));
        }
    }

    #[tokio::test]
    async fn test_skips_side_already_quoted_inside() {
        let gateway = PaperGateway::new().with_pair(pair(), px(dec!(100)));
        gateway.set_external_book(
            &pair(),
            vec![BookLevel::new(px(dec!(99.5)), sz(dec!(1)))],
            vec![BookLevel::new(px(dec!(102)), sz(dec!(1)))],
        );
        let config = MakerConfig::default();
        let levels = compute_spread_levels(px(dec!(100)), px(dec!(2)), px(dec!(0.01)));
        let mut rng = StdRng::seed_from_u64(5);

        let report = maintain_spread(&gateway, &pair(), levels, &config, &mut rng)
            .await
            .unwrap();
        assert!(!report.bid_quoted);
        assert!(report.ask_quoted);
        assert_eq!(gateway.resting(&pair(), OrderSide::Sell)[0].price, px(dec!(101)));
        assert_eq!(gateway.depth_requests(), vec![5]);
    }
}
