//! Import tax estimation
//!
//! Converts listing prices to USD, applies the destination country's
//! de-minimis threshold, customs duty and VAT, and returns an itemized
//! breakdown. Rates come from a pluggable `TaxRateSource` and are cached
//! per country for the calculator's lifetime.

use dashmap::DashMap;
use lazy_static::lazy_static;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

use shopsearch_types::{CountryTaxRate, TaxBreakdown};

#[derive(Error, Debug)]
pub enum TaxError {
	#[error("negative amount: {0}")]
	NegativeAmount(Decimal),
}

/// One product to estimate taxes for
#[derive(Debug, Clone)]
pub struct TaxRequest {
	pub product_price: Decimal,
	pub shipping_cost: Decimal,
	pub currency: String,
	pub destination_country: String,
}

impl TaxRequest {
	pub fn new(
		product_price: Decimal,
		shipping_cost: Decimal,
		currency: impl Into<String>,
		destination_country: impl Into<String>,
	) -> Self {
		Self {
			product_price,
			shipping_cost,
			currency: currency.into(),
			destination_country: destination_country.into(),
		}
	}
}

/// Source of per-country tax rates
pub trait TaxRateSource: Send + Sync {
	/// Rate record for an uppercase ISO 3166-1 alpha-2 code, if known
	fn rate_for(&self, country_code: &str) -> Option<CountryTaxRate>;
}

/// Built-in rate table
///
/// Reference values for the destinations the marketplaces ship to most.
/// They are estimates, not customs rulings, and every breakdown says so.
#[derive(Debug)]
pub struct StaticTaxRateTable {
	rates: HashMap<String, CountryTaxRate>,
}

impl StaticTaxRateTable {
	pub fn new() -> Self {
		let mut rates = HashMap::new();
		for rate in [
			CountryTaxRate::new("CL", "Chile", dec!(19), dec!(6), dec!(30)),
			CountryTaxRate::new("AR", "Argentina", dec!(21), dec!(16), dec!(50)),
			CountryTaxRate::new("BR", "Brazil", dec!(17), dec!(60), dec!(0)),
			CountryTaxRate::new("MX", "Mexico", dec!(16), dec!(19), dec!(50)),
			CountryTaxRate::new("US", "United States", dec!(0), dec!(0), dec!(800)),
			CountryTaxRate::new("CA", "Canada", dec!(5), dec!(0), dec!(15)),
			CountryTaxRate::new("GB", "United Kingdom", dec!(20), dec!(2.5), dec!(165)),
			CountryTaxRate::new("DE", "Germany", dec!(19), dec!(4.2), dec!(165)),
		] {
			rates.insert(rate.country_code.clone(), rate);
		}
		Self { rates }
	}

	pub fn with_rate(mut self, rate: CountryTaxRate) -> Self {
		self.rates.insert(rate.country_code.clone(), rate);
		self
	}
}

impl Default for StaticTaxRateTable {
	fn default() -> Self {
		Self::new()
	}
}

impl TaxRateSource for StaticTaxRateTable {
	fn rate_for(&self, country_code: &str) -> Option<CountryTaxRate> {
		self.rates.get(country_code).cloned()
	}
}

lazy_static! {
	/// Approximate conversion rates into USD
	static ref USD_RATES: HashMap<&'static str, Decimal> = HashMap::from([
		("USD", dec!(1)),
		("EUR", dec!(1.08)),
		("GBP", dec!(1.27)),
		("BRL", dec!(0.19)),
		("CLP", dec!(0.0011)),
		("MXN", dec!(0.055)),
		("ARS", dec!(0.001)),
		("CAD", dec!(0.73)),
	]);
}

/// Convert an amount into USD, returning the converted value and whether
/// the currency was recognized
fn to_usd(amount: Decimal, currency: &str) -> (Decimal, bool) {
	match USD_RATES.get(currency.to_uppercase().as_str()) {
		Some(rate) => (amount * rate, true),
		None => (amount, false),
	}
}

fn round_money(amount: Decimal) -> Decimal {
	amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Import tax calculator with a per-country rate cache
pub struct TaxCalculator {
	source: Box<dyn TaxRateSource>,
	cache: DashMap<String, Option<CountryTaxRate>>,
}

impl TaxCalculator {
	pub fn new() -> Self {
		Self::with_source(Box::new(StaticTaxRateTable::new()))
	}

	pub fn with_source(source: Box<dyn TaxRateSource>) -> Self {
		Self {
			source,
			cache: DashMap::new(),
		}
	}

	fn lookup_rate(&self, country_code: &str) -> Option<CountryTaxRate> {
		let key = country_code.to_uppercase();
		if let Some(cached) = self.cache.get(&key) {
			return cached.clone();
		}
		let rate = self.source.rate_for(&key);
		self.cache.insert(key, rate.clone());
		rate
	}

	/// Estimate import taxes for one shipment
	///
	/// Duty applies to the product value only; VAT applies to product,
	/// shipping and duty combined. Shipments at or under the destination's
	/// de-minimis threshold owe nothing.
	pub fn calculate(&self, request: &TaxRequest) -> Result<TaxBreakdown, TaxError> {
		if request.product_price < Decimal::ZERO {
			return Err(TaxError::NegativeAmount(request.product_price));
		}
		if request.shipping_cost < Decimal::ZERO {
			return Err(TaxError::NegativeAmount(request.shipping_cost));
		}

		let mut notes = Vec::new();

		let (product_usd, known) = to_usd(request.product_price, &request.currency);
		if !known {
			warn!(
				"unknown currency '{}', treating amounts as USD",
				request.currency
			);
			notes.push(format!(
				"unknown currency {}, amounts assumed to be USD",
				request.currency
			));
		}
		let (shipping_usd, _) = to_usd(request.shipping_cost, &request.currency);
		let product_usd = round_money(product_usd);
		let shipping_usd = round_money(shipping_usd);

		let country_code = request.destination_country.to_uppercase();
		let Some(rate) = self.lookup_rate(&country_code).filter(|r| r.active) else {
			return Ok(TaxBreakdown::zero(
				product_usd,
				shipping_usd,
				&country_code,
				&country_code,
				"no import tax data for destination",
			));
		};

		if product_usd + shipping_usd <= rate.de_minimis_usd {
			notes.push(format!(
				"declared value is at or under the {} USD de minimis threshold",
				rate.de_minimis_usd
			));
			return Ok(TaxBreakdown {
				product_price_usd: product_usd,
				shipping_cost_usd: shipping_usd,
				customs_duty: Decimal::ZERO,
				vat: Decimal::ZERO,
				total_taxes: Decimal::ZERO,
				total_cost: product_usd + shipping_usd,
				destination_country: rate.country_code.clone(),
				destination_country_name: rate.country_name.clone(),
				vat_rate: rate.vat_rate,
				customs_duty_rate: rate.customs_duty_rate,
				de_minimis_applied: true,
				is_estimated: true,
				notes,
			});
		}

		let duty = round_money(product_usd * rate.customs_duty_rate / dec!(100));
		let vat = round_money((product_usd + shipping_usd + duty) * rate.vat_rate / dec!(100));
		let total_taxes = duty + vat;

		Ok(TaxBreakdown {
			product_price_usd: product_usd,
			shipping_cost_usd: shipping_usd,
			customs_duty: duty,
			vat,
			total_taxes,
			total_cost: product_usd + shipping_usd + total_taxes,
			destination_country: rate.country_code.clone(),
			destination_country_name: rate.country_name.clone(),
			vat_rate: rate.vat_rate,
			customs_duty_rate: rate.customs_duty_rate,
			de_minimis_applied: false,
			is_estimated: true,
			notes,
		})
	}

	/// Estimate taxes for several shipments; output is index-aligned with
	/// the input, with per-item failures carried as `Err`
	pub fn calculate_batch(&self, requests: &[TaxRequest]) -> Vec<Result<TaxBreakdown, TaxError>> {
		requests.iter().map(|r| self.calculate(r)).collect()
	}
}

impl Default for TaxCalculator {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_duty_and_vat_for_chile() {
		let calc = TaxCalculator::new();
		let breakdown = calc
			.calculate(&TaxRequest::new(dec!(100), dec!(10), "USD", "CL"))
			.unwrap();

		assert_eq!(breakdown.customs_duty, dec!(6.00));
		assert_eq!(breakdown.vat, dec!(22.04));
		assert_eq!(breakdown.total_taxes, dec!(28.04));
		assert_eq!(breakdown.total_cost, dec!(138.04));
		assert!(!breakdown.de_minimis_applied);
		assert!(breakdown.is_estimated);
	}

	#[test]
	fn test_de_minimis_waives_taxes() {
		let calc = TaxCalculator::new();
		let breakdown = calc
			.calculate(&TaxRequest::new(dec!(20), dec!(5), "USD", "CL"))
			.unwrap();

		assert_eq!(breakdown.total_taxes, Decimal::ZERO);
		assert_eq!(breakdown.total_cost, dec!(25.00));
		assert!(breakdown.de_minimis_applied);
		// The record's rates are preserved even though none were charged
		assert_eq!(breakdown.vat_rate, dec!(19));
		assert_eq!(breakdown.customs_duty_rate, dec!(6));
	}

	#[test]
	fn test_de_minimis_boundary_is_inclusive_of_shipping() {
		let calc = TaxCalculator::new();
		// Product plus shipping lands exactly on the threshold
		let breakdown = calc
			.calculate(&TaxRequest::new(dec!(25), dec!(5), "USD", "CL"))
			.unwrap();
		assert!(breakdown.de_minimis_applied);

		let breakdown = calc
			.calculate(&TaxRequest::new(dec!(25.01), dec!(5), "USD", "CL"))
			.unwrap();
		assert!(!breakdown.de_minimis_applied);
	}

	#[test]
	fn test_unknown_destination_yields_zero_estimate() {
		let calc = TaxCalculator::new();
		let breakdown = calc
			.calculate(&TaxRequest::new(dec!(100), dec!(10), "USD", "ZZ"))
			.unwrap();

		assert_eq!(breakdown.total_taxes, Decimal::ZERO);
		assert_eq!(breakdown.total_cost, dec!(110));
		assert_eq!(breakdown.destination_country, "ZZ");
		assert!(breakdown
			.notes
			.iter()
			.any(|n| n.contains("no import tax data")));
	}

	#[test]
	fn test_inactive_country_treated_as_unknown() {
		let table = StaticTaxRateTable::new().with_rate(CountryTaxRate {
			country_code: "XX".to_string(),
			country_name: "Test".to_string(),
			vat_rate: dec!(20),
			customs_duty_rate: dec!(5),
			de_minimis_usd: dec!(0),
			active: false,
		});
		let calc = TaxCalculator::with_source(Box::new(table));
		let breakdown = calc
			.calculate(&TaxRequest::new(dec!(100), dec!(0), "USD", "XX"))
			.unwrap();
		assert_eq!(breakdown.total_taxes, Decimal::ZERO);
	}

	#[test]
	fn test_currency_conversion_before_thresholding() {
		let calc = TaxCalculator::new();
		// 20,000 CLP is roughly 22 USD, under Chile's threshold
		let breakdown = calc
			.calculate(&TaxRequest::new(dec!(20000), dec!(0), "CLP", "CL"))
			.unwrap();
		assert_eq!(breakdown.product_price_usd, dec!(22.00));
		assert!(breakdown.de_minimis_applied);
	}

	#[test]
	fn test_unknown_currency_assumed_usd_with_note() {
		let calc = TaxCalculator::new();
		let breakdown = calc
			.calculate(&TaxRequest::new(dec!(100), dec!(0), "XYZ", "CL"))
			.unwrap();
		assert_eq!(breakdown.product_price_usd, dec!(100));
		assert!(breakdown.notes.iter().any(|n| n.contains("unknown currency")));
	}

	#[test]
	fn test_country_code_is_case_insensitive() {
		let calc = TaxCalculator::new();
		let breakdown = calc
			.calculate(&TaxRequest::new(dec!(100), dec!(10), "USD", "cl"))
			.unwrap();
		assert_eq!(breakdown.destination_country, "CL");
		assert_eq!(breakdown.total_cost, dec!(138.04));
	}

	#[test]
	fn test_negative_amount_rejected() {
		let calc = TaxCalculator::new();
		let err = calc
			.calculate(&TaxRequest::new(dec!(-1), dec!(0), "USD", "CL"))
			.unwrap_err();
		assert!(matches!(err, TaxError::NegativeAmount(_)));
	}

	#[test]
	fn test_batch_is_index_aligned() {
		let calc = TaxCalculator::new();
		let out = calc.calculate_batch(&[
			TaxRequest::new(dec!(100), dec!(10), "USD", "CL"),
			TaxRequest::new(dec!(-5), dec!(0), "USD", "CL"),
		]);
		assert_eq!(out.len(), 2);
		assert!(out[0].is_ok());
		assert!(out[1].is_err());
	}
}
