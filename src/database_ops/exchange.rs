use serde_json::Value;
use tracing::debug;

use crate::database_ops::sources::{SourceError, EXCHANGE_RATE_SOURCE};
use crate::models::ExchangeRateTable;

/// Build a rate table from an open.er-api style payload:
/// `{"result": "success", "base_code": "USD", "rates": {"NGN": 1600.5, ...}}`.
///
/// A missing or non-object `rates` field is a malformed response. Individual
/// entries that are not positive finite numbers are skipped.
pub fn parse_rate_table(v: &Value) -> Result<ExchangeRateTable, SourceError> {
    let rates = v
        .get("rates")
        .and_then(|r| r.as_object())
        .ok_or_else(|| SourceError::MalformedResponse {
            source_name: EXCHANGE_RATE_SOURCE,
            message: "Invalid exchange rate response format".into(),
        })?;

    let base = v
        .get("base_code")
        .or_else(|| v.get("base"))
        .and_then(|b| b.as_str())
        .map(|b| b.to_uppercase());

    let mut table = ExchangeRateTable::new(base);
    for (code, val) in rates.iter() {
        let accepted = val.as_f64().is_some_and(|rate| table.insert(code.clone(), rate));
        if !accepted {
            debug!(code = %code, value = %val, "skipping unusable exchange rate");
        }
    }
    Ok(table)
}
