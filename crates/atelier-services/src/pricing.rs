//! Pricing model — minimum viable price from estimated work minutes, plus
//! the customer-facing price list.

use atelier_core::config::PricingConfig;
use atelier_core::error::{AtelierError, Result};

/// Rounded integer breakdown in UAH.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceBreakdown {
    pub final_price: i64,
    pub labor: i64,
    pub overhead: i64,
    pub tax: i64,
}

/// Minimum price covering labor, overhead, fixed fees, and tax.
pub fn calculate_min_price(base_minutes: u32, economics: &PricingConfig) -> Result<PriceBreakdown> {
    if base_minutes == 0 {
        return Err(AtelierError::Pricing("base minutes must be > 0".into()));
    }

    let hours = f64::from(base_minutes) / 60.0;
    let labor_cost = hours * economics.hourly_labor_rate;
    let overhead_cost = hours * economics.overhead_per_hour;
    let subtotal =
        labor_cost + overhead_cost + economics.depreciation_fee + economics.consumables_fee;
    let final_price = subtotal / (1.0 - economics.tax_rate);

    Ok(PriceBreakdown {
        final_price: final_price.round() as i64,
        labor: labor_cost.round() as i64,
        overhead: overhead_cost.round() as i64,
        tax: (final_price * economics.tax_rate).round() as i64,
    })
}

/// Markdown price list shown from the menu.
pub fn price_list_text() -> String {
    "💰 *Орієнтовні ціни*\n\n\
     👖 Вкорочення джинсів — від 250 грн\n\
     👖 Вкорочення штанів — від 200 грн\n\
     🧥 Заміна блискавки (куртка) — від 350 грн\n\
     👗 Підгонка сукні по фігурі — від 400 грн\n\
     🩹 Латка / художня штопка — від 150 грн\n\
     👔 Звуження сорочки — від 300 грн\n\n\
     _Точна вартість залежить від тканини та складності — майстер назве її після огляду._"
        .to_string()
}
