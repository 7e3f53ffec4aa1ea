//! Boleta (DTE 39) transformer.
//!
//! Section layout:
//! - `Boleta` header, one line: `[0]` type code, `[1]` folio, `[2]` issue
//!   date, `[3]` service indicator, `[8]` recipient RUT, `[10]`..`[13]`
//!   recipient name, business line, address, commune.
//! - `BoletaTotales`, one line: `[3]` original grand total.
//! - `BoletaDetalle`, one line per item: `[0]` line number, `[2]` name,
//!   `[3]` exempt flag, `[4]` quantity, `[5]` unit price, `[7]` amount,
//!   `[9]` unit of measure.
//! - `BoletaDescRec` (optional), one line per adjustment: `[1]` `D`|`R`,
//!   `[2]` description, `[3]` `$`|`%`, `[4]` value, `[5]` exempt flag.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::classify::DocType;
use crate::models::config::MerchantConfig;
use crate::models::document::{
    BoletaTotales, DetailLine, Document, Dte, DtePayload, Encabezado, IdDoc, Receptor, Totales,
};
use crate::sections::RawSections;
use crate::error::TransformError;

use super::{
    Result, distribute_fixed_discount, emisor_from, field, parse_field, round_dp,
};

const HEADER: &str = "Boleta";
const TOTALS: &str = "BoletaTotales";
const DETAIL: &str = "BoletaDetalle";
const DESC_REC: &str = "BoletaDescRec";

/// Transform parsed boleta sections into a submittable document.
pub fn transform(sections: &RawSections, merchant: &MerchantConfig) -> Result<Document> {
    let header_line = sections
        .lines(HEADER)
        .first()
        .ok_or(TransformError::MissingSection(HEADER))?;
    let header: Vec<&str> = header_line.split(';').collect();

    let totals_line = sections
        .lines(TOTALS)
        .first()
        .ok_or(TransformError::MissingSection(TOTALS))?;
    let totals: Vec<&str> = totals_line.split(';').collect();
    let original_total: Decimal = parse_field(&totals, TOTALS, 3)?;
    let mut running_total = original_total;

    let detail_lines = sections.lines(DETAIL);
    let mut items = build_items(detail_lines)?;
    // Line numbers for appended surcharges continue after the raw detail.
    let mut next_line = detail_lines.len() as u32 + 1;

    for line in sections.lines(DESC_REC) {
        let parts: Vec<&str> = line.split(';').collect();
        if parts.len() < 6 {
            continue;
        }
        let kind = field(&parts, DESC_REC, 1)?;
        let description = field(&parts, DESC_REC, 2)?;
        let value_kind = field(&parts, DESC_REC, 3)?;
        let value: Decimal = parse_field(&parts, DESC_REC, 4)?;
        let ind_exe: i64 = parse_field(&parts, DESC_REC, 5)?;

        match (kind, value_kind) {
            ("D", "$") => {
                distribute_fixed_discount(&mut items, value, 0);
                running_total -= value;
            }
            ("D", "%") => {
                for item in items.iter_mut().filter(|i| !i.is_surcharge) {
                    let allocated = round_dp(item.monto_item * value / Decimal::from(100), 0);
                    item.descuento_pct = round_dp(value, 1);
                    item.descuento_monto = allocated;
                    item.monto_item -= allocated;
                }
                running_total -= round_dp(original_total * value / Decimal::from(100), 0);
            }
            ("R", _) => {
                items.push(DetailLine {
                    nro_lin_det: next_line,
                    nmb_item: description.to_string(),
                    dsc_item: None,
                    qty_item: Decimal::ONE,
                    prc_item: value,
                    monto_item: value,
                    descuento_pct: Decimal::ZERO,
                    descuento_monto: Decimal::ZERO,
                    ind_exe,
                    unmd_item: "UND".to_string(),
                    is_surcharge: true,
                });
                next_line += 1;
                running_total += value;
            }
            _ => {}
        }
    }

    let fch_emis = field(&header, HEADER, 2)?.to_string();
    let issue_date = NaiveDate::parse_from_str(&fch_emis, "%Y-%m-%d").ok();

    let id_doc = IdDoc {
        ind_servicio: parse_field(&header, HEADER, 3)?,
        tipo_dte: parse_field(&header, HEADER, 0)?,
        folio: parse_field(&header, HEADER, 1)?,
        fch_emis,
        fma_pago: 1,
        tpo_tran_compra: None,
        medio_pago: "EF".to_string(),
        mnt_bruto: 1,
    };

    let receptor = Receptor {
        rut_recep: field(&header, HEADER, 8)?.to_string(),
        razon_social: field(&header, HEADER, 10)?.to_string(),
        giro: field(&header, HEADER, 11)?.to_string(),
        dir_recep: field(&header, HEADER, 12)?.to_string(),
        cmna_recep: field(&header, HEADER, 13)?.to_string(),
    };

    let dte = Dte {
        encabezado: Encabezado {
            id_doc,
            emisor: emisor_from(merchant),
            receptor,
            totales: Totales::Boleta(BoletaTotales::with_total(running_total)),
        },
        detalle: items,
        referencia: None,
        dsc_rcg_global: None,
    };

    Ok(Document {
        doc_type: DocType::Boleta,
        issue_date,
        payload: DtePayload::new(dte),
    })
}

fn build_items(lines: &[String]) -> Result<Vec<DetailLine>> {
    let mut items = Vec::new();
    for line in lines {
        let parts: Vec<&str> = line.split(';').collect();
        // Lines shorter than six fields are not detail records.
        if parts.len() < 6 {
            continue;
        }
        items.push(DetailLine {
            nro_lin_det: parse_field(&parts, DETAIL, 0)?,
            nmb_item: field(&parts, DETAIL, 2)?.to_string(),
            dsc_item: None,
            qty_item: parse_field(&parts, DETAIL, 4)?,
            prc_item: parse_field(&parts, DETAIL, 5)?,
            monto_item: parse_field(&parts, DETAIL, 7)?,
            descuento_pct: Decimal::ZERO,
            descuento_monto: Decimal::ZERO,
            ind_exe: parse_field(&parts, DETAIL, 3)?,
            unmd_item: field(&parts, DETAIL, 9)?.to_string(),
            is_surcharge: false,
        });
    }
    Ok(items)
}
