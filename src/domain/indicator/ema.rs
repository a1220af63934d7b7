//! Exponential Moving Average.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = P[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) values are NaN.

pub fn calculate_ema(prices: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return vec![f64::NAN; prices.len()];
    }

    let mut values = Vec::with_capacity(prices.len());
    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = 0.0;
    let mut sum = 0.0;

    for (i, &price) in prices.iter().enumerate() {
        if i < period - 1 {
            sum += price;
            values.push(f64::NAN);
        } else if i == period - 1 {
            sum += price;
            ema = sum / period as f64;
            values.push(ema);
        } else {
            ema = price * k + ema * (1.0 - k);
            values.push(ema);
        }
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_warmup() {
        let values = calculate_ema(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);
        assert!(values[0].is_nan());
        assert!(values[1].is_nan());
        assert!(values[2..].iter().all(|v| v.is_finite()));
    }

    #[test]
    fn ema_period_1_tracks_price() {
        let values = calculate_ema(&[10.0, 20.0, 30.0], 1);
        assert_eq!(values, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn ema_seed_is_sma() {
        let values = calculate_ema(&[10.0, 20.0, 30.0], 3);
        assert!((values[2] - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_recursive_calculation() {
        let values = calculate_ema(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);
        let k = 2.0 / 4.0;
        let sma = 20.0;
        let ema_3 = 40.0 * k + sma * (1.0 - k);
        let ema_4 = 50.0 * k + ema_3 * (1.0 - k);
        assert!((values[3] - ema_3).abs() < f64::EPSILON);
        assert!((values[4] - ema_4).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_equal_prices() {
        let values = calculate_ema(&[100.0; 5], 3);
        for v in &values[2..] {
            assert!((v - 100.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn ema_empty_and_zero_period() {
        assert!(calculate_ema(&[], 3).is_empty());
        let values = calculate_ema(&[10.0, 20.0], 0);
        assert_eq!(values.len(), 2);
        assert!(values.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn ema_shorter_than_period_is_all_warmup() {
        let values = calculate_ema(&[1.0, 2.0], 5);
        assert!(values.iter().all(|v| v.is_nan()));
    }
}
