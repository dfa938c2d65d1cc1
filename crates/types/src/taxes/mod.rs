//! Import tax models: per-country rates and calculated breakdowns

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-country import tax record
///
/// Rates are percentages (e.g. `19` for 19% VAT); `de_minimis_usd` is the
/// declared-value threshold below which the country waives import taxes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryTaxRate {
	pub country_code: String,
	pub country_name: String,
	pub vat_rate: Decimal,
	pub customs_duty_rate: Decimal,
	pub de_minimis_usd: Decimal,
	pub active: bool,
}

impl CountryTaxRate {
	pub fn new(
		country_code: impl Into<String>,
		country_name: impl Into<String>,
		vat_rate: Decimal,
		customs_duty_rate: Decimal,
		de_minimis_usd: Decimal,
	) -> Self {
		Self {
			country_code: country_code.into(),
			country_name: country_name.into(),
			vat_rate,
			customs_duty_rate,
			de_minimis_usd,
			active: true,
		}
	}
}

/// Result of an import tax estimate for one product
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxBreakdown {
	pub product_price_usd: Decimal,
	pub shipping_cost_usd: Decimal,
	pub customs_duty: Decimal,
	pub vat: Decimal,
	pub total_taxes: Decimal,
	pub total_cost: Decimal,
	pub destination_country: String,
	pub destination_country_name: String,
	pub vat_rate: Decimal,
	pub customs_duty_rate: Decimal,
	pub de_minimis_applied: bool,
	/// Always true: rates are reference data, not a customs ruling
	pub is_estimated: bool,
	pub notes: Vec<String>,
}

impl TaxBreakdown {
	/// Zero-tax breakdown used for unknown or inactive destinations and for
	/// shipments under the de-minimis threshold
	pub fn zero(
		product_price_usd: Decimal,
		shipping_cost_usd: Decimal,
		destination_country: impl Into<String>,
		destination_country_name: impl Into<String>,
		note: impl Into<String>,
	) -> Self {
		Self {
			product_price_usd,
			shipping_cost_usd,
			customs_duty: Decimal::ZERO,
			vat: Decimal::ZERO,
			total_taxes: Decimal::ZERO,
			total_cost: product_price_usd + shipping_cost_usd,
			destination_country: destination_country.into(),
			destination_country_name: destination_country_name.into(),
			vat_rate: Decimal::ZERO,
			customs_duty_rate: Decimal::ZERO,
			de_minimis_applied: false,
			is_estimated: true,
			notes: vec![note.into()],
		}
	}
}
