//! Typed document payload for the electronic-invoicing API.
//!
//! Field names follow the provider's wire format exactly (SII DTE naming);
//! the structures here are the only place that format appears. Amounts are
//! `rust_decimal::Decimal` so integer peso amounts round-trip without a
//! floating-point tail.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::classify::DocType;

/// A fully assembled document, ready for submission.
///
/// Only `payload` crosses the wire; the other fields feed the intake loop's
/// filing decision.
#[derive(Debug, Clone)]
pub struct Document {
    /// Document type this payload was built as.
    pub doc_type: DocType,

    /// Issue date parsed from the source file, when it was parseable.
    /// Used by the intake loop to derive the dated error-archive path.
    pub issue_date: Option<NaiveDate>,

    /// The wire payload.
    pub payload: DtePayload,
}

/// Top-level request body posted to the API.
#[derive(Debug, Clone, Serialize)]
pub struct DtePayload {
    /// Response artifacts requested from the provider.
    pub response: Vec<String>,

    /// The document itself.
    pub dte: Dte,

    #[serde(rename = "TEDXML")]
    pub ted_xml: String,

    #[serde(rename = "TPVMobil")]
    pub tpv_mobil: String,

    #[serde(rename = "IdMsg")]
    pub id_msg: i64,
}

impl DtePayload {
    /// Standard envelope around an assembled [`Dte`].
    pub fn new(dte: Dte) -> Self {
        Self {
            response: vec!["80MM".to_string(), "PDFPATH".to_string()],
            dte,
            ted_xml: String::new(),
            tpv_mobil: String::new(),
            id_msg: 0,
        }
    }
}

/// The `dte` object of the request body.
#[derive(Debug, Clone, Serialize)]
pub struct Dte {
    #[serde(rename = "Encabezado")]
    pub encabezado: Encabezado,

    #[serde(rename = "Detalle")]
    pub detalle: Vec<DetailLine>,

    /// Always null; references travel in the source file only.
    #[serde(rename = "Referencia")]
    pub referencia: Option<serde_json::Value>,

    /// Always null; global adjustments are folded into the detail lines.
    #[serde(rename = "DscRcgGlobal")]
    pub dsc_rcg_global: Option<serde_json::Value>,
}

/// Document header: identification, issuer, recipient and totals.
#[derive(Debug, Clone, Serialize)]
pub struct Encabezado {
    #[serde(rename = "IdDoc")]
    pub id_doc: IdDoc,

    #[serde(rename = "Emisor")]
    pub emisor: Emisor,

    #[serde(rename = "Receptor")]
    pub receptor: Receptor,

    #[serde(rename = "Totales")]
    pub totales: Totales,
}

/// Document identification block.
#[derive(Debug, Clone, Serialize)]
pub struct IdDoc {
    #[serde(rename = "IndServicio")]
    pub ind_servicio: i64,

    #[serde(rename = "TipoDTE")]
    pub tipo_dte: i64,

    #[serde(rename = "Folio")]
    pub folio: i64,

    #[serde(rename = "FchEmis")]
    pub fch_emis: String,

    #[serde(rename = "FmaPago")]
    pub fma_pago: i64,

    /// Present only on facturas.
    #[serde(rename = "TpoTranCompra", skip_serializing_if = "Option::is_none")]
    pub tpo_tran_compra: Option<i64>,

    #[serde(rename = "MedioPago")]
    pub medio_pago: String,

    #[serde(rename = "MntBruto")]
    pub mnt_bruto: i64,
}

/// Issuer block, copied from the merchant configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Emisor {
    #[serde(rename = "RUTEmisor")]
    pub rut_emisor: String,

    #[serde(rename = "RznSocEmisor")]
    pub razon_social: String,

    #[serde(rename = "GiroEmisor")]
    pub giro: String,

    #[serde(rename = "Acteco")]
    pub acteco: i64,

    #[serde(rename = "DirOrigen")]
    pub dir_origen: String,

    #[serde(rename = "CmnaOrigen")]
    pub cmna_origen: String,

    #[serde(rename = "Telefono")]
    pub telefono: String,

    #[serde(rename = "CdgSIISucur")]
    pub cdg_sii_sucur: i64,

    #[serde(rename = "Email")]
    pub email: String,
}

/// Recipient block, extracted from the source file header.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Receptor {
    #[serde(rename = "RUTRecep")]
    pub rut_recep: String,

    #[serde(rename = "RznSocRecep")]
    pub razon_social: String,

    #[serde(rename = "GiroRecep")]
    pub giro: String,

    #[serde(rename = "DirRecep")]
    pub dir_recep: String,

    #[serde(rename = "CmnaRecep")]
    pub cmna_recep: String,
}

/// Totals block. The two document types carry slightly different key sets
/// (`MontoPeriodo` vs `MntPeriodo`), so each gets its own shape.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Totales {
    Boleta(BoletaTotales),
    Factura(FacturaTotales),
}

/// Boleta totals: only the gross total and the fixed tax rate are filled,
/// the provider derives the rest.
#[derive(Debug, Clone, Serialize)]
pub struct BoletaTotales {
    #[serde(rename = "MntNeto")]
    pub mnt_neto: Decimal,

    #[serde(rename = "TasaIVA")]
    pub tasa_iva: i64,

    #[serde(rename = "IVA")]
    pub iva: Decimal,

    #[serde(rename = "MntTotal")]
    pub mnt_total: Decimal,

    #[serde(rename = "MontoPeriodo")]
    pub monto_periodo: Decimal,

    #[serde(rename = "VlrPagar")]
    pub vlr_pagar: Decimal,

    #[serde(rename = "MntExe")]
    pub mnt_exe: Decimal,

    #[serde(rename = "MontoNF")]
    pub monto_nf: Decimal,
}

impl BoletaTotales {
    /// Totals carrying only the running gross total, rate fixed at 19.
    pub fn with_total(mnt_total: Decimal) -> Self {
        Self {
            mnt_neto: Decimal::ZERO,
            tasa_iva: 19,
            iva: Decimal::ZERO,
            mnt_total,
            monto_periodo: Decimal::ZERO,
            vlr_pagar: Decimal::ZERO,
            mnt_exe: Decimal::ZERO,
            monto_nf: Decimal::ZERO,
        }
    }
}

/// Factura totals: everything zeroed except the tax rate, pending the
/// corrected detail on the provider side.
#[derive(Debug, Clone, Serialize)]
pub struct FacturaTotales {
    #[serde(rename = "MntNeto")]
    pub mnt_neto: Decimal,

    #[serde(rename = "TasaIVA")]
    pub tasa_iva: i64,

    #[serde(rename = "IVA")]
    pub iva: Decimal,

    #[serde(rename = "MntTotal")]
    pub mnt_total: Decimal,

    #[serde(rename = "MntPeriodo")]
    pub mnt_periodo: Decimal,

    #[serde(rename = "VlrPagar")]
    pub vlr_pagar: Decimal,

    #[serde(rename = "MntExe")]
    pub mnt_exe: Decimal,

    #[serde(rename = "MontoNF")]
    pub monto_nf: Decimal,
}

impl FacturaTotales {
    /// Zeroed totals with the given (already rounded) tax rate.
    pub fn with_tasa_iva(tasa_iva: i64) -> Self {
        Self {
            mnt_neto: Decimal::ZERO,
            tasa_iva,
            iva: Decimal::ZERO,
            mnt_total: Decimal::ZERO,
            mnt_periodo: Decimal::ZERO,
            vlr_pagar: Decimal::ZERO,
            mnt_exe: Decimal::ZERO,
            monto_nf: Decimal::ZERO,
        }
    }
}

/// One sellable entry of the document detail.
///
/// A surcharge is modeled as a synthetic line appended after discount
/// distribution; the `is_surcharge` marker is internal and never serialized.
#[derive(Debug, Clone, Serialize)]
pub struct DetailLine {
    #[serde(rename = "NroLinDet")]
    pub nro_lin_det: u32,

    #[serde(rename = "NmbItem")]
    pub nmb_item: String,

    /// Long description; facturas only, omitted when empty.
    #[serde(rename = "DscItem", skip_serializing_if = "Option::is_none")]
    pub dsc_item: Option<String>,

    #[serde(rename = "QtyItem")]
    pub qty_item: Decimal,

    #[serde(rename = "PrcItem")]
    pub prc_item: Decimal,

    #[serde(rename = "MontoItem")]
    pub monto_item: Decimal,

    #[serde(rename = "DescuentoPct")]
    pub descuento_pct: Decimal,

    #[serde(rename = "DescuentoMonto")]
    pub descuento_monto: Decimal,

    #[serde(rename = "IndExe")]
    pub ind_exe: i64,

    #[serde(rename = "UnmdItem")]
    pub unmd_item: String,

    /// Marks synthetic surcharge lines during construction. Stripped from
    /// the wire representation.
    #[serde(skip)]
    pub is_surcharge: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn surcharge_marker_is_not_serialized() {
        let line = DetailLine {
            nro_lin_det: 3,
            nmb_item: "Recargo".to_string(),
            dsc_item: None,
            qty_item: Decimal::ONE,
            prc_item: Decimal::from(500),
            monto_item: Decimal::from(500),
            descuento_pct: Decimal::ZERO,
            descuento_monto: Decimal::ZERO,
            ind_exe: 0,
            unmd_item: "UND".to_string(),
            is_surcharge: true,
        };

        let json = serde_json::to_value(&line).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("is_surcharge"));
        assert!(!obj.contains_key("DscItem"));
        assert_eq!(obj["NroLinDet"], serde_json::json!(3));
        assert_eq!(obj["MontoItem"].to_string(), "500");
    }

    #[test]
    fn boleta_totales_carry_running_total_only() {
        let totales = BoletaTotales::with_total(Decimal::from(10_900));
        let json = serde_json::to_value(&totales).unwrap();
        assert_eq!(json["MntTotal"].to_string(), "10900");
        assert_eq!(json["TasaIVA"], serde_json::json!(19));
        assert_eq!(json["MntNeto"].to_string(), "0");
        assert!(json.get("MontoPeriodo").is_some());
    }

    #[test]
    fn factura_totales_use_mnt_periodo_key() {
        let totales = FacturaTotales::with_tasa_iva(19);
        let json = serde_json::to_value(&totales).unwrap();
        assert!(json.get("MntPeriodo").is_some());
        assert!(json.get("MontoPeriodo").is_none());
    }
}
