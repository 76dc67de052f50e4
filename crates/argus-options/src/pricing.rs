//! Black-Scholes pricing and greeks for European options.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use argus_types::EngineError;

use crate::contract::OptionKind;
use crate::greeks::OptionGreeks;

// ---------- normal distribution helpers (no external dep) ----------

/// Standard normal cumulative distribution function (Abramowitz & Stegun 26.2.17).
pub(crate) fn norm_cdf(x: f64) -> f64 {
    if x >= 8.0 {
        return 1.0;
    }
    if x <= -8.0 {
        return 0.0;
    }

    let a1 = 0.254829592_f64;
    let a2 = -0.284496736_f64;
    let a3 = 1.421413741_f64;
    let a4 = -1.453152027_f64;
    let a5 = 1.061405429_f64;
    let p = 0.3275911_f64;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x_abs = x.abs();
    let t = 1.0 / (1.0 + p * x_abs);
    let y =
        1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x_abs * x_abs / 2.0).exp();

    0.5 * (1.0 + sign * y)
}

/// Standard normal probability density function.
pub(crate) fn norm_pdf(x: f64) -> f64 {
    const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

// ---------- Black-Scholes core ----------

fn d1_d2(s: f64, k: f64, r: f64, sigma: f64, t: f64) -> (f64, f64) {
    let d1 = ((s / k).ln() + (r + 0.5 * sigma * sigma) * t) / (sigma * t.sqrt());
    let d2 = d1 - sigma * t.sqrt();
    (d1, d2)
}

fn to_dec(v: f64, dp: u32) -> Decimal {
    Decimal::from_f64(v).unwrap_or(Decimal::ZERO).round_dp(dp)
}

/// Price a European option and compute its greeks.
///
/// * `spot`, `strike`: must be positive.
/// * `time_to_expiry`: years; `<= 0` returns intrinsic value with
///   terminal greeks.
/// * `volatility`: annualised fraction (0.30 = 30 %); must be positive.
/// * `risk_free_rate`: annualised fraction.
///
/// Invalid inputs fail fast with [`EngineError::InvalidInput`] rather than
/// letting NaN propagate through the closed form.
pub fn price_and_greeks(
    spot: f64,
    strike: f64,
    time_to_expiry: f64,
    volatility: f64,
    risk_free_rate: f64,
    kind: OptionKind,
) -> Result<OptionGreeks, EngineError> {
    if spot <= 0.0 || !spot.is_finite() {
        return Err(EngineError::InvalidInput(format!(
            "spot must be positive, got {spot}"
        )));
    }
    if strike <= 0.0 || !strike.is_finite() {
        return Err(EngineError::InvalidInput(format!(
            "strike must be positive, got {strike}"
        )));
    }
    if volatility <= 0.0 || !volatility.is_finite() {
        return Err(EngineError::InvalidInput(format!(
            "volatility must be positive, got {volatility}"
        )));
    }

    // Expired contract: intrinsic value and terminal greeks. Deep-ITM calls
    // move one-for-one with the underlying (delta 1), deep-ITM puts inverse
    // (delta -1); everything else has stopped responding.
    if time_to_expiry <= 0.0 {
        let (intrinsic, delta) = match kind {
            OptionKind::Call => {
                let iv = (spot - strike).max(0.0);
                (iv, if spot > strike { 1.0 } else { 0.0 })
            }
            OptionKind::Put => {
                let iv = (strike - spot).max(0.0);
                (iv, if strike > spot { -1.0 } else { 0.0 })
            }
        };
        return Ok(OptionGreeks::expired(to_dec(intrinsic, 4), to_dec(delta, 4)));
    }

    let s = spot;
    let k = strike;
    let r = risk_free_rate;
    let sigma = volatility;
    let t = time_to_expiry;
    let sqrt_t = t.sqrt();

    let (d1, d2) = d1_d2(s, k, r, sigma, t);
    let disc = (-r * t).exp();

    let price = match kind {
        OptionKind::Call => s * norm_cdf(d1) - k * disc * norm_cdf(d2),
        OptionKind::Put => k * disc * norm_cdf(-d2) - s * norm_cdf(-d1),
    };

    let delta = match kind {
        OptionKind::Call => norm_cdf(d1),
        OptionKind::Put => norm_cdf(d1) - 1.0,
    };

    let gamma = norm_pdf(d1) / (s * sigma * sqrt_t);

    let theta_common = -(s * norm_pdf(d1) * sigma) / (2.0 * sqrt_t);
    let theta_annual = match kind {
        OptionKind::Call => theta_common - r * k * disc * norm_cdf(d2),
        OptionKind::Put => theta_common + r * k * disc * norm_cdf(-d2),
    };
    // Per-calendar-day decay
    let theta = theta_annual / 365.0;

    // Per 1 % move in volatility
    let vega = s * norm_pdf(d1) * sqrt_t / 100.0;

    // Per 1 % move in the risk-free rate
    let rho = match kind {
        OptionKind::Call => k * t * disc * norm_cdf(d2) / 100.0,
        OptionKind::Put => -k * t * disc * norm_cdf(-d2) / 100.0,
    };

    Ok(OptionGreeks {
        price: to_dec(price, 4),
        delta: to_dec(delta, 4),
        gamma: to_dec(gamma, 6),
        theta: to_dec(theta, 4),
        vega: to_dec(vega, 4),
        rho: to_dec(rho, 4),
    })
}

/// Implied volatility via Newton-Raphson on Black-Scholes vega.
/// Returns `None` if it fails to converge.
pub fn implied_volatility(
    kind: OptionKind,
    strike: f64,
    market_price: f64,
    spot: f64,
    risk_free_rate: f64,
    time_to_expiry: f64,
) -> Option<f64> {
    if time_to_expiry <= 0.0 || market_price <= 0.0 || spot <= 0.0 || strike <= 0.0 {
        return None;
    }

    let mut sigma = 0.30; // initial guess
    let max_iter = 100;
    let tol = 1e-8;

    for _ in 0..max_iter {
        let result =
            price_and_greeks(spot, strike, time_to_expiry, sigma, risk_free_rate, kind).ok()?;
        let model_price = result.price.to_f64().unwrap_or(0.0);
        let diff = model_price - market_price;

        if diff.abs() < tol {
            return Some(sigma);
        }

        // Vega in absolute terms (undo the /100 scaling)
        let vega_abs = result.vega.to_f64().unwrap_or(0.0) * 100.0;
        if vega_abs.abs() < 1e-12 {
            return None; // vega too small to converge
        }

        sigma -= diff / vega_abs;
        if sigma <= 0.0 {
            sigma = 0.001; // clamp positive
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_call_price_sanity() {
        let g = price_and_greeks(155.0, 150.0, 0.25, 0.25, 0.05, OptionKind::Call).unwrap();
        let price = g.price.to_f64().unwrap();
        // ITM call should be worth at least intrinsic ($5)
        assert!(price > 5.0, "call price = {price}");
        assert!(price < 20.0, "call price unreasonably high = {price}");
    }

    #[test]
    fn test_put_price_sanity() {
        let g = price_and_greeks(145.0, 150.0, 0.25, 0.25, 0.05, OptionKind::Put).unwrap();
        let price = g.price.to_f64().unwrap();
        assert!(price > 5.0, "put price = {price}");
        assert!(price < 20.0, "put price unreasonably high = {price}");
    }

    #[test]
    fn test_put_call_parity() {
        let (s, k, t, sigma, r) = (150.0, 150.0, 0.5, 0.30, 0.05);
        let c = price_and_greeks(s, k, t, sigma, r, OptionKind::Call)
            .unwrap()
            .price
            .to_f64()
            .unwrap();
        let p = price_and_greeks(s, k, t, sigma, r, OptionKind::Put)
            .unwrap()
            .price
            .to_f64()
            .unwrap();
        // C - P = S - K*exp(-rT)
        let lhs = c - p;
        let rhs = s - k * (-r * t).exp();
        assert!(
            (lhs - rhs).abs() < 0.01,
            "put-call parity violated: lhs={lhs}, rhs={rhs}"
        );
    }

    #[test]
    fn test_put_call_parity_across_strikes() {
        let (s, t, sigma, r) = (100.0, 0.25, 0.2, 0.04);
        for k in [80.0, 90.0, 100.0, 110.0, 120.0] {
            let c = price_and_greeks(s, k, t, sigma, r, OptionKind::Call)
                .unwrap()
                .price
                .to_f64()
                .unwrap();
            let p = price_and_greeks(s, k, t, sigma, r, OptionKind::Put)
                .unwrap()
                .price
                .to_f64()
                .unwrap();
            let rhs = s - k * (-r * t).exp();
            assert!(
                (c - p - rhs).abs() < 0.01,
                "parity violated at strike {k}: c-p={}, rhs={rhs}",
                c - p
            );
        }
    }

    #[test]
    fn test_expired_call_returns_intrinsic() {
        let g = price_and_greeks(160.0, 150.0, 0.0, 0.25, 0.05, OptionKind::Call).unwrap();
        assert_eq!(g.price, dec!(10));
        assert_eq!(g.delta, dec!(1));
        assert_eq!(g.gamma, Decimal::ZERO);
        assert_eq!(g.theta, Decimal::ZERO);
        assert_eq!(g.vega, Decimal::ZERO);
        assert_eq!(g.rho, Decimal::ZERO);
    }

    #[test]
    fn test_expired_put_returns_intrinsic() {
        let g = price_and_greeks(140.0, 150.0, 0.0, 0.25, 0.05, OptionKind::Put).unwrap();
        assert_eq!(g.price, dec!(10));
        assert_eq!(g.delta, dec!(-1));
    }

    #[test]
    fn test_expired_otm_worthless() {
        let call = price_and_greeks(140.0, 150.0, 0.0, 0.25, 0.05, OptionKind::Call).unwrap();
        assert_eq!(call.price, Decimal::ZERO);
        assert_eq!(call.delta, Decimal::ZERO);

        let put = price_and_greeks(160.0, 150.0, 0.0, 0.25, 0.05, OptionKind::Put).unwrap();
        assert_eq!(put.price, Decimal::ZERO);
        assert_eq!(put.delta, Decimal::ZERO);
    }

    #[test]
    fn test_near_expiry_converges_to_intrinsic() {
        // 1 minute to expiry: price should be within a cent of intrinsic
        let t = 1.0 / (365.0 * 24.0 * 60.0);
        let g = price_and_greeks(160.0, 150.0, t, 0.25, 0.05, OptionKind::Call).unwrap();
        let price = g.price.to_f64().unwrap();
        assert!((price - 10.0).abs() < 0.01, "price = {price}");
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        assert!(price_and_greeks(0.0, 150.0, 0.25, 0.25, 0.05, OptionKind::Call).is_err());
        assert!(price_and_greeks(150.0, -1.0, 0.25, 0.25, 0.05, OptionKind::Call).is_err());
        assert!(price_and_greeks(150.0, 150.0, 0.25, 0.0, 0.05, OptionKind::Call).is_err());
        assert!(price_and_greeks(f64::NAN, 150.0, 0.25, 0.25, 0.05, OptionKind::Put).is_err());
    }

    #[test]
    fn test_greeks_sign_call() {
        let g = price_and_greeks(150.0, 150.0, 0.25, 0.25, 0.05, OptionKind::Call).unwrap();
        assert!(g.delta > Decimal::ZERO, "call delta should be positive");
        assert!(g.gamma > Decimal::ZERO, "gamma should be positive");
        assert!(
            g.theta < Decimal::ZERO,
            "theta should be negative (time decay)"
        );
        assert!(g.vega > Decimal::ZERO, "vega should be positive");
        assert!(g.rho > Decimal::ZERO, "call rho should be positive");
    }

    #[test]
    fn test_greeks_sign_put() {
        let g = price_and_greeks(150.0, 150.0, 0.25, 0.25, 0.05, OptionKind::Put).unwrap();
        assert!(g.delta < Decimal::ZERO, "put delta should be negative");
        assert!(g.gamma > Decimal::ZERO, "gamma should be positive");
        assert!(g.vega > Decimal::ZERO, "vega should be positive");
        assert!(g.rho < Decimal::ZERO, "put rho should be negative");
    }

    #[test]
    fn test_gamma_identical_for_call_and_put() {
        let c = price_and_greeks(150.0, 145.0, 0.25, 0.25, 0.05, OptionKind::Call).unwrap();
        let p = price_and_greeks(150.0, 145.0, 0.25, 0.25, 0.05, OptionKind::Put).unwrap();
        assert_eq!(c.gamma, p.gamma);
    }

    #[test]
    fn test_implied_volatility_roundtrip() {
        let true_vol = 0.25;
        let price = price_and_greeks(155.0, 150.0, 0.25, true_vol, 0.05, OptionKind::Call)
            .unwrap()
            .price
            .to_f64()
            .unwrap();

        let iv = implied_volatility(OptionKind::Call, 150.0, price, 155.0, 0.05, 0.25);
        assert!(iv.is_some(), "IV should converge");
        let iv = iv.unwrap();
        assert!(
            (iv - true_vol).abs() < 0.001,
            "IV={iv} should match true vol={true_vol}"
        );
    }

    #[test]
    fn test_implied_volatility_put() {
        let true_vol = 0.30;
        let price = price_and_greeks(148.0, 150.0, 0.5, true_vol, 0.04, OptionKind::Put)
            .unwrap()
            .price
            .to_f64()
            .unwrap();

        let iv = implied_volatility(OptionKind::Put, 150.0, price, 148.0, 0.04, 0.5);
        assert!(iv.is_some());
        assert!((iv.unwrap() - true_vol).abs() < 0.001);
    }

    #[test]
    fn test_implied_volatility_rejects_bad_inputs() {
        assert!(implied_volatility(OptionKind::Call, 150.0, 0.0, 155.0, 0.05, 0.25).is_none());
        assert!(implied_volatility(OptionKind::Call, 150.0, 5.0, 155.0, 0.05, 0.0).is_none());
    }

    #[test]
    fn test_norm_cdf_boundaries() {
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-6);
        assert!(norm_cdf(8.0) == 1.0);
        assert!(norm_cdf(-8.0) == 0.0);
    }
}
