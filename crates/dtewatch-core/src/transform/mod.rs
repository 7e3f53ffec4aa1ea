//! Document-type transformers.
//!
//! Each transformer converts classified [`RawSections`](crate::sections::RawSections)
//! plus the merchant configuration into a normalized [`Document`], applying
//! discount/surcharge math and numeric reconciliation. Field positions in the
//! source format are load-bearing and fixed per document type.

pub mod boleta;
pub mod factura;

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::TransformError;
use crate::models::config::MerchantConfig;
use crate::models::document::{DetailLine, Emisor};

/// Result type for transformation operations.
pub type Result<T> = std::result::Result<T, TransformError>;

/// Currency rounding: half away from zero at the given scale.
pub(crate) fn round_dp(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Positional field access; absence of a load-bearing position is an error.
pub(crate) fn field<'a>(
    parts: &[&'a str],
    section: &'static str,
    index: usize,
) -> Result<&'a str> {
    parts
        .get(index)
        .copied()
        .ok_or(TransformError::MissingField { section, index })
}

/// Parse a load-bearing field into its expected type.
pub(crate) fn parse_field<T: FromStr>(
    parts: &[&str],
    section: &'static str,
    index: usize,
) -> Result<T> {
    let raw = field(parts, section, index)?;
    raw.trim().parse().map_err(|_| TransformError::Parse {
        section,
        index,
        value: raw.to_string(),
    })
}

/// Numeric field that falls back to a default when absent or empty, but
/// still rejects garbage.
pub(crate) fn decimal_field_or(
    parts: &[&str],
    section: &'static str,
    index: usize,
    default: Decimal,
) -> Result<Decimal> {
    match parts.get(index) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| TransformError::Parse {
            section,
            index,
            value: raw.to_string(),
        }),
    }
}

/// Distribute a fixed-amount discount proportionally over the non-surcharge
/// items, rounding allocations at `scale` decimal places and the per-item
/// percentage at one.
///
/// A zero sum of non-surcharge amounts short-circuits every allocation to
/// zero. No clamp is applied: a discount larger than the available amounts
/// yields negative line amounts, matching the documented behavior.
pub(crate) fn distribute_fixed_discount(items: &mut [DetailLine], value: Decimal, scale: u32) {
    let total: Decimal = items
        .iter()
        .filter(|i| !i.is_surcharge)
        .map(|i| i.monto_item)
        .sum();

    for item in items.iter_mut().filter(|i| !i.is_surcharge) {
        let proportion = if total > Decimal::ZERO {
            item.monto_item / total
        } else {
            Decimal::ZERO
        };
        let allocated = round_dp(value * proportion, scale);
        item.descuento_pct = if item.monto_item > Decimal::ZERO {
            round_dp(allocated / item.monto_item * Decimal::from(100), 1)
        } else {
            Decimal::ZERO
        };
        item.descuento_monto = allocated;
        item.monto_item = round_dp(item.monto_item - allocated, scale);
    }
}

/// Build the Emisor block from the merchant configuration.
pub(crate) fn emisor_from(merchant: &MerchantConfig) -> Emisor {
    Emisor {
        rut_emisor: merchant.rut_normalized(),
        razon_social: merchant.razon_social.clone(),
        giro: merchant.giro.clone(),
        acteco: merchant.act_economica,
        dir_origen: merchant.direccion.clone(),
        cmna_origen: merchant.comuna.clone(),
        telefono: merchant.telefono.clone(),
        cdg_sii_sucur: merchant.codsuc_sii,
        email: merchant.email.clone(),
    }
}

#[cfg(test)]
pub(crate) fn test_merchant() -> MerchantConfig {
    MerchantConfig {
        rut_empresa: "76.543.210-K".to_string(),
        razon_social: "Comercial Prueba SpA".to_string(),
        giro: "Venta al por menor".to_string(),
        act_economica: 472101,
        direccion: "Av. Siempre Viva 742".to_string(),
        comuna: "Providencia".to_string(),
        ciudad: "Santiago".to_string(),
        region: "Metropolitana".to_string(),
        telefono: "+56912345678".to_string(),
        codsuc_sii: 81303347,
        email: "ventas@prueba.cl".to_string(),
        tpv: "TPV01".to_string(),
    }
}
