//! Joins raw countries to the rate table and estimates GDP.

use rand::Rng;

use crate::models::{ExchangeRateTable, NormalizedCountry, RawCountry};

/// Lower bound (inclusive) of the per-country GDP multiplier.
pub const GDP_MULTIPLIER_MIN: f64 = 1000.0;
/// Upper bound (exclusive) of the per-country GDP multiplier.
pub const GDP_MULTIPLIER_MAX: f64 = 2000.0;

/// Join raw countries against the rate table and derive the GDP estimate.
///
/// One output per input, in input order. Data-quality problems surface as
/// null/zero fields; nothing is dropped here.
pub fn reconcile<R>(
    countries: &[RawCountry],
    rates: &ExchangeRateTable,
    rng: &mut R,
) -> Vec<NormalizedCountry>
where
    R: Rng + ?Sized,
{
    countries
        .iter()
        .map(|raw| normalize_country(raw, rates, rng))
        .collect()
}

pub fn normalize_country<R>(
    raw: &RawCountry,
    rates: &ExchangeRateTable,
    rng: &mut R,
) -> NormalizedCountry
where
    R: Rng + ?Sized,
{
    let population = raw
        .population
        .map(|p| i64::try_from(p).unwrap_or(i64::MAX))
        .unwrap_or(0);
    let currency_code = primary_currency(raw);

    let exchange_rate = currency_code.as_deref().and_then(|code| rates.get(code));
    let estimated_gdp = match exchange_rate {
        Some(rate) => {
            let multiplier = rng.gen_range(GDP_MULTIPLIER_MIN..GDP_MULTIPLIER_MAX);
            estimate_gdp(population, multiplier, rate)
        }
        None => 0.0,
    };

    NormalizedCountry {
        name: raw.name.clone(),
        capital: raw.capital.clone(),
        region: raw.region.clone(),
        population,
        currency_code,
        exchange_rate,
        estimated_gdp: Some(estimated_gdp),
        flag_url: raw.flag.clone(),
    }
}

/// First listed currency code; countries with several currencies keep only this one.
pub fn primary_currency(raw: &RawCountry) -> Option<String> {
    raw.currencies
        .first()
        .and_then(|c| c.code.as_deref())
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
}

/// `population * multiplier / rate`, saturating at `f64::MAX`.
pub fn estimate_gdp(population: i64, multiplier: f64, rate: f64) -> f64 {
    let gdp = population as f64 * multiplier / rate;
    if gdp.is_finite() {
        gdp.max(0.0)
    } else {
        f64::MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawCurrency;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn wakanda(code: Option<&str>) -> RawCountry {
        RawCountry {
            name: Some("Wakanda".into()),
            population: Some(1000),
            currencies: code
                .map(|c| {
                    vec![RawCurrency {
                        code: Some(c.into()),
                        ..Default::default()
                    }]
                })
                .unwrap_or_default(),
            ..Default::default()
        }
    }

    #[test]
    fn derives_gdp_when_rate_matches() {
        let rates: ExchangeRateTable = [("WK", 2.0)].into_iter().collect();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let out = normalize_country(&wakanda(Some("WK")), &rates, &mut rng);
            assert_eq!(out.currency_code.as_deref(), Some("WK"));
            assert_eq!(out.exchange_rate, Some(2.0));
            let gdp = out.estimated_gdp.expect("gdp set");
            assert!((500_000.0..1_000_000.0).contains(&gdp), "gdp out of range: {gdp}");
        }
    }

    #[test]
    fn zero_gdp_without_matching_rate() {
        let mut rng = StdRng::seed_from_u64(1);
        let out = normalize_country(&wakanda(Some("WK")), &ExchangeRateTable::default(), &mut rng);
        assert_eq!(out.currency_code.as_deref(), Some("WK"));
        assert_eq!(out.exchange_rate, None);
        assert_eq!(out.estimated_gdp, Some(0.0));
    }

    #[test]
    fn zero_gdp_without_currency() {
        let rates: ExchangeRateTable = [("WK", 2.0)].into_iter().collect();
        let mut rng = StdRng::seed_from_u64(1);
        let out = normalize_country(&wakanda(None), &rates, &mut rng);
        assert_eq!(out.currency_code, None);
        assert_eq!(out.exchange_rate, None);
        assert_eq!(out.estimated_gdp, Some(0.0));
    }

    #[test]
    fn keeps_first_currency_only() {
        let raw = RawCountry {
            name: Some("Zimbabwe".into()),
            population: Some(10),
            currencies: vec![
                RawCurrency {
                    code: Some("USD".into()),
                    ..Default::default()
                },
                RawCurrency {
                    code: Some("ZWL".into()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assert_eq!(primary_currency(&raw).as_deref(), Some("USD"));

        let blank_first = RawCountry {
            currencies: vec![RawCurrency {
                code: Some("  ".into()),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(primary_currency(&blank_first), None);
    }

    #[test]
    fn never_drops_records() {
        let input = vec![RawCountry::default(), wakanda(Some("WK")), wakanda(None)];
        let rates: ExchangeRateTable = [("WK", 4.0)].into_iter().collect();
        let mut rng = StdRng::seed_from_u64(3);
        let out = reconcile(&input, &rates, &mut rng);
        assert_eq!(out.len(), input.len());
        assert_eq!(out[0].name, None);
        assert_eq!(out[0].population, 0);
        assert_eq!(out[0].estimated_gdp, Some(0.0));
        assert_eq!(out[1].name.as_deref(), Some("Wakanda"));
    }

    #[test]
    fn estimate_saturates_instead_of_overflowing() {
        assert_eq!(estimate_gdp(i64::MAX, 1999.0, f64::MIN_POSITIVE), f64::MAX);
        assert_eq!(estimate_gdp(0, 1500.0, 3.0), 0.0);
        assert_eq!(estimate_gdp(10, 1500.0, 3.0), 5000.0);
    }
}
