//! Price band for liquidity orders.
//!
//! A bid band ends one tick below the best opposing price and extends down
//! by the relative price range; an ask band mirrors it upwards. The band is
//! then kept behind our own spread quotes so liquidity orders never cross
//! them.

use mm_core::{OrderBookSnapshot, OrderSide, Price};
use rand::Rng;
use rust_decimal::Decimal;

use crate::random::random_decimal;
use crate::spread::SpreadLevels;

/// Market prices the band is anchored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandAnchors {
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    /// Last traded price; zero or less when unknown.
    pub last: Price,
}

impl BandAnchors {
    pub fn from_snapshot(book: &OrderBookSnapshot, last: Price) -> Self {
        Self {
            best_bid: book.best_bid(),
            best_ask: book.best_ask(),
            last,
        }
    }
}

/// Pull toward the reference price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Traction {
    pub rate_up: Decimal,
    pub rate_down: Decimal,
    pub attractor: Price,
}

/// Inclusive price interval, `min <= max`, `min >= price_step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceBand {
    pub min: Price,
    pub max: Price,
}

impl PriceBand {
    /// Keep the band behind our quoted spread.
    ///
    /// A bid band never exceeds the spread bid and an ask band never falls
    /// below the spread ask. A band lying entirely past the quote collapses
    /// onto it.
    #[must_use]
    pub fn within_spread(self, side: OrderSide, spread: &SpreadLevels) -> Self {
        match side {
            OrderSide::Buy => {
                let max = self.max.min(spread.bid);
                Self {
                    min: self.min.min(max),
                    max,
                }
            }
            OrderSide::Sell => {
                let min = self.min.max(spread.ask);
                Self {
                    min,
                    max: self.max.max(min),
                }
            }
        }
    }

    /// Uniform price on the tick grid.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, price_step: Price) -> Price {
        Price::new(random_decimal(
            rng,
            self.min.inner(),
            self.max.inner(),
            price_step.inner(),
        ))
    }
}

/// Band for new liquidity orders on `side`.
///
/// Anchor order for bids: best ask, best bid, last price; asks mirror it.
/// Without any anchor the band is `[price_step, 1000 * price_step]`.
pub fn compute_price_band(
    side: OrderSide,
    anchors: &BandAnchors,
    price_range: Decimal,
    price_step: Price,
    traction: Option<&Traction>,
) -> PriceBand {
    let last = Some(anchors.last).filter(|p| p.is_positive());
    let widen = Decimal::ONE + price_range;

    let (min, max) = match side {
        OrderSide::Buy => {
            let Some(anchor) = anchors.best_ask.or(anchors.best_bid).or(last) else {
                return trivial_band(price_step);
            };
            let max = anchor.inner() - price_step.inner();
            let min = max / widen;
            let max = match traction {
                Some(t) if t.attractor.is_positive() && max > t.attractor.inner() => {
                    max - (max - min) * t.rate_down * (max / t.attractor.inner())
                }
                _ => max,
            };
            (min, max)
        }
        OrderSide::Sell => {
            let Some(anchor) = anchors.best_bid.or(anchors.best_ask).or(last) else {
                return trivial_band(price_step);
            };
            let min = anchor.inner() + price_step.inner();
            let max = min * widen;
            let min = match traction {
                Some(t) if min > Decimal::ZERO && min < t.attractor.inner() => {
                    min + (max - min) * t.rate_up * (t.attractor.inner() / min)
                }
                _ => min,
            };
            (min, max)
        }
    };

    let (min, max) = if min > max { (max, min) } else { (min, max) };
    let mut min = Price::new(min).ceil_to_tick(price_step);
    let max = Price::new(max).round_to_tick(price_step);
    if !min.is_positive() {
        min = price_step;
    }
    PriceBand {
        min,
        max: max.max(min),
    }
}

fn trivial_band(price_step: Price) -> PriceBand {
    PriceBand {
        min: price_step,
        max: price_step * Decimal::from(1000),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rust_decimal_macros::dec;

    fn step() -> Price {
        Price::new(dec!(0.01))
    }

    fn px(d: Decimal) -> Price {
        Price::new(d)
    }

    fn anchors(bid: Option<Decimal>, ask: Option<Decimal>, last: Decimal) -> BandAnchors {
        BandAnchors {
            best_bid: bid.map(px),
            best_ask: ask.map(px),
            last: px(last),
        }
    }

    #[test]
    fn test_trivial_band_on_empty_market() {
        let empty = anchors(None, None, dec!(0));
        for side in [OrderSide::Buy, OrderSide::Sell] {
            let band = compute_price_band(side, &empty, dec!(0.05), step(), None);
            assert_eq!(band.min, px(dec!(0.01)));
            assert_eq!(band.max, px(dec!(10)));
        }
    }

    #[test]
    fn test_bid_band_below_best_ask() {
        let a = anchors(Some(dec!(99)), Some(dec!(101)), dec!(100));
        let band = compute_price_band(OrderSide::Buy, &a, dec!(0.1), step(), None);
        // max = 101 - 0.01, min = 100.99 / 1.1 = 91.8090.. -> ceil 91.81
        assert_eq!(band.max, px(dec!(100.99)));
        assert_eq!(band.min, px(dec!(91.81)));
    }

    #[test]
    fn test_ask_band_above_best_bid() {
        let a = anchors(Some(dec!(99)), Some(dec!(101)), dec!(100));
        let band = compute_price_band(OrderSide::Sell, &a, dec!(0.1), step(), None);
        // min = 99.01, max = 99.01 * 1.1 = 108.911 -> floor 108.91
        assert_eq!(band.min, px(dec!(99.01)));
        assert_eq!(band.max, px(dec!(108.91)));
    }

    #[test]
    fn test_anchor_fallback_order() {
        // Bid side without asks falls back to own best bid.
        let a = anchors(Some(dec!(50)), None, dec!(70));
        let band = compute_price_band(OrderSide::Buy, &a, dec!(0), step(), None);
        assert_eq!(band.max, px(dec!(49.99)));

        // Then to the last price.
        let a = anchors(None, None, dec!(70));
        let band = compute_price_band(OrderSide::Sell, &a, dec!(0), step(), None);
        assert_eq!(band.min, px(dec!(70.01)));
        assert_eq!(band.max, px(dec!(70.01)));
    }

    #[test]
    fn test_zero_min_is_bumped() {
        // Anchor one tick above zero puts the bid max at zero.
        let a = anchors(None, Some(dec!(0.01)), dec!(0));
        let band = compute_price_band(OrderSide::Buy, &a, dec!(0.05), step(), None);
        assert_eq!(band.min, step());
        assert!(band.min <= band.max);
    }

    #[test]
    fn test_traction_pulls_bid_band_down() {
        let a = anchors(None, Some(dec!(121)), dec!(0));
        let traction = Traction {
            rate_up: dec!(0.5),
            rate_down: dec!(0.5),
            attractor: px(dec!(100)),
        };
        let free = compute_price_band(OrderSide::Buy, &a, dec!(0.2), step(), None);
        let pulled = compute_price_band(OrderSide::Buy, &a, dec!(0.2), step(), Some(&traction));
        assert!(pulled.max < free.max);
        assert!(pulled.min <= pulled.max);
    }

    #[test]
    fn test_traction_ignored_on_far_side() {
        // Ask band already above the attractor is left alone.
        let a = anchors(Some(dec!(120)), None, dec!(0));
        let traction = Traction {
            rate_up: dec!(0.5),
            rate_down: dec!(0.5),
            attractor: px(dec!(100)),
        };
        let free = compute_price_band(OrderSide::Sell, &a, dec!(0.2), step(), None);
        let pulled = compute_price_band(OrderSide::Sell, &a, dec!(0.2), step(), Some(&traction));
        assert_eq!(free, pulled);
    }

    #[test]
    fn test_within_spread_clamps_and_collapses() {
        let spread = SpreadLevels {
            bid: px(dec!(99)),
            ask: px(dec!(101)),
        };
        let bid_band = PriceBand {
            min: px(dec!(95)),
            max: px(dec!(100.5)),
        };
        assert_eq!(bid_band.within_spread(OrderSide::Buy, &spread).max, px(dec!(99)));

        let ask_band = PriceBand {
            min: px(dec!(0.01)),
            max: px(dec!(10)),
        };
        let clamped = ask_band.within_spread(OrderSide::Sell, &spread);
        assert_eq!(clamped.min, px(dec!(101)));
        assert_eq!(clamped.max, px(dec!(101)));
    }

    #[test]
    fn test_sample_stays_in_band() {
        let band = PriceBand {
            min: px(dec!(90.5)),
            max: px(dec!(91)),
        };
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..100 {
            let price = band.sample(&mut rng, step());
            assert!(price >= band.min && price <= band.max);
        }
    }
}
