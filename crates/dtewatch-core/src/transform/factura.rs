//! Factura (DTE 33) transformer.
//!
//! Section layout:
//! - `Encabezado`, one line: `[2]` issue date, `[5]`..`[9]` recipient RUT,
//!   name, business line, address, commune.
//! - `Totales`, one line: `[0]` discount pct, `[1]` discount value, `[2]`
//!   surcharge pct, `[3]` surcharge value, `[4]` net (already including the
//!   surcharge, per upstream convention), `[5]` exempt, `[6]` tax rate,
//!   `[7]` tax amount, `[8]` gross total.
//! - `Detalle`, one line per item: `[0]` line number, `[2]` description,
//!   `[3]` quantity, `[4]` unit price, `[9]` exempt amount, `[10]` line
//!   value, `[13]` long description (optional).
//! - `Referencia`, one line: `[2]` folio.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::{info, warn};

use crate::classify::DocType;
use crate::error::TransformError;
use crate::log::{LogSink, Severity};
use crate::models::config::MerchantConfig;
use crate::models::document::{
    DetailLine, Document, Dte, DtePayload, Encabezado, FacturaTotales, IdDoc, Receptor, Totales,
};
use crate::sections::RawSections;

use super::{
    Result, decimal_field_or, distribute_fixed_discount, emisor_from, parse_field, round_dp,
};

const HEADER: &str = "Encabezado";
const TOTALS: &str = "Totales";
const DETAIL: &str = "Detalle";
const REFERENCE: &str = "Referencia";

/// Transform parsed factura sections into a submittable document.
///
/// Reconciliation warnings and corrections are recorded through `sink` so
/// they reach the persisted operator log, not only the diagnostics.
pub fn transform(
    sections: &RawSections,
    merchant: &MerchantConfig,
    sink: &dyn LogSink,
) -> Result<Document> {
    let header: Vec<&str> = sections
        .lines(HEADER)
        .first()
        .map(|l| l.split(';').collect())
        .unwrap_or_default();

    let totals: Vec<&str> = sections
        .lines(TOTALS)
        .first()
        .ok_or(TransformError::MissingSection(TOTALS))?
        .split(';')
        .collect();

    let discount_value = decimal_field_or(&totals, TOTALS, 1, Decimal::ZERO)?;
    let surcharge_pct = decimal_field_or(&totals, TOTALS, 2, Decimal::ZERO)?;
    let surcharge_value = decimal_field_or(&totals, TOTALS, 3, Decimal::ZERO)?;
    let net = decimal_field_or(&totals, TOTALS, 4, Decimal::ZERO)?;
    let exempt = decimal_field_or(&totals, TOTALS, 5, Decimal::ZERO)?;
    let tax_rate = decimal_field_or(&totals, TOTALS, 6, Decimal::from(19))?;

    let mut items = build_items(sections.lines(DETAIL));

    // The stated net already contains the surcharge; the synthetic item only
    // makes the detail add up.
    if surcharge_value > Decimal::ZERO {
        let next_line = items.iter().map(|i| i.nro_lin_det).max().unwrap_or(0) + 1;
        let description = if surcharge_pct > Decimal::ZERO {
            format!("Recargo {surcharge_pct}%")
        } else {
            "Recargo".to_string()
        };
        items.push(DetailLine {
            nro_lin_det: next_line,
            nmb_item: description,
            dsc_item: None,
            qty_item: Decimal::ONE,
            prc_item: surcharge_value.trunc(),
            monto_item: surcharge_value.trunc(),
            descuento_pct: Decimal::ZERO,
            descuento_monto: Decimal::ZERO,
            ind_exe: 0,
            unmd_item: "un".to_string(),
            is_surcharge: true,
        });
    }

    if discount_value > Decimal::ZERO {
        distribute_fixed_discount(&mut items, discount_value, 2);
    }

    reconcile_surcharge(&mut items, net, exempt, surcharge_value, sink);

    // A reference line shorter than three fields carries no folio.
    let folio = sections
        .lines(REFERENCE)
        .first()
        .map(|l| {
            let parts: Vec<&str> = l.split(';').collect();
            if parts.len() > 2 {
                parse_field(&parts, REFERENCE, 2)
            } else {
                Ok(0)
            }
        })
        .transpose()?
        .unwrap_or(0);

    let fch_emis = header.get(2).copied().unwrap_or("").to_string();
    let issue_date = NaiveDate::parse_from_str(&fch_emis, "%Y-%m-%d").ok();

    let id_doc = IdDoc {
        ind_servicio: 3,
        tipo_dte: 33,
        folio,
        fch_emis,
        fma_pago: 1,
        tpo_tran_compra: Some(1),
        medio_pago: "EF".to_string(),
        mnt_bruto: 0,
    };

    let receptor = Receptor {
        rut_recep: header.get(5).copied().unwrap_or("").to_string(),
        razon_social: header.get(6).copied().unwrap_or("").to_string(),
        giro: header.get(7).copied().unwrap_or("").to_string(),
        dir_recep: header.get(8).copied().unwrap_or("").to_string(),
        cmna_recep: header.get(9).copied().unwrap_or("").to_string(),
    };

    let tasa_iva = round_dp(tax_rate, 0).to_i64().unwrap_or(19);

    let dte = Dte {
        encabezado: Encabezado {
            id_doc,
            emisor: emisor_from(merchant),
            receptor,
            totales: Totales::Factura(FacturaTotales::with_tasa_iva(tasa_iva)),
        },
        detalle: items,
        referencia: None,
        dsc_rcg_global: None,
    };

    Ok(Document {
        doc_type: DocType::Factura,
        issue_date,
        payload: DtePayload::new(dte),
    })
}

/// Build detail items; a malformed line is logged and skipped, never fatal.
fn build_items(lines: &[String]) -> Vec<DetailLine> {
    let mut items = Vec::new();
    for line in lines {
        let parts: Vec<&str> = line.split(';').collect();
        if parts.len() < 13 {
            continue;
        }
        match build_item(&parts) {
            Ok(item) => items.push(item),
            Err(e) => warn!(line = %line, error = %e, "línea de detalle descartada"),
        }
    }
    items
}

fn build_item(parts: &[&str]) -> Result<DetailLine> {
    let quantity: Decimal = parse_field(parts, DETAIL, 3)?;
    let price: Decimal = parse_field(parts, DETAIL, 4)?;
    let exempt_amount = decimal_field_or(parts, DETAIL, 9, Decimal::ZERO)?;
    let long_desc = parts.get(13).map(|s| s.trim()).filter(|s| !s.is_empty());

    Ok(DetailLine {
        nro_lin_det: parse_field(parts, DETAIL, 0)?,
        nmb_item: parts[2].to_string(),
        dsc_item: long_desc.map(str::to_string),
        qty_item: quantity,
        prc_item: round_dp(price, 0),
        monto_item: round_dp(quantity * price, 0),
        descuento_pct: Decimal::ZERO,
        descuento_monto: Decimal::ZERO,
        ind_exe: i64::from(exempt_amount > Decimal::ZERO),
        unmd_item: "un".to_string(),
        is_surcharge: false,
    })
}

/// Best-effort reconciliation between the detail and the stated totals.
///
/// When the detail disagrees with `net + exempt` by more than one unit and a
/// surcharge item exists, the surcharge amount absorbs the gap. Provisional
/// compensation for upstream data inconsistency; the trigger threshold is
/// the historical one. Both the mismatch and the correction go through the
/// operator log sink.
fn reconcile_surcharge(
    items: &mut [DetailLine],
    net: Decimal,
    exempt: Decimal,
    surcharge_value: Decimal,
    sink: &dyn LogSink,
) {
    let expected = net + exempt;
    let detail_total: Decimal = items.iter().map(|i| i.monto_item).sum();
    if (detail_total - expected).abs() <= Decimal::ONE {
        return;
    }

    warn!(
        detail_total = %detail_total,
        expected = %expected,
        "el total del detalle no coincide con neto+exento"
    );
    sink.record(
        &format!("La suma del detalle ({detail_total}) no coincide con neto+exento ({expected})"),
        Severity::Warning,
    );

    if surcharge_value <= Decimal::ZERO {
        return;
    }
    if let Some(surcharge) = items.iter_mut().find(|i| i.is_surcharge) {
        let corrected = expected - (detail_total - surcharge.monto_item);
        info!(
            from = %surcharge.monto_item,
            to = %corrected,
            "recargo ajustado para cuadrar los totales"
        );
        sink.record(
            &format!(
                "Recargo ajustado de {} a {corrected} para cuadrar los totales",
                surcharge.monto_item
            ),
            Severity::Info,
        );
        surcharge.monto_item = corrected;
        surcharge.prc_item = corrected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::TracingSink;
    use crate::log::testing::RecordingSink;
    use crate::sections::parse;
    use crate::transform::test_merchant;
    use pretty_assertions::assert_eq;

    fn factura_file(totals: &str, detail: &str) -> String {
        format!(
            "->Encabezado<-\n\
             33;x;2024-06-15;x;x;77111222-3;DISTRIBUIDORA SUR LTDA;MAYORISTA;CAMINO REAL 100;TEMUCO\n\
             ->Totales<-\n{totals}\n\
             ->Detalle<-\n{detail}\
             ->Referencia<-\nx;x;4502\n"
        )
    }

    // 13+ fields: [0] line, [2] desc, [3] qty, [4] price, [9] exempt, [10] value, [13] long desc
    fn detail_line(nro: u32, desc: &str, qty: &str, price: &str, value: &str) -> String {
        format!("{nro};x;{desc};{qty};{price};x;x;x;x;0;{value};x;x;\n")
    }

    #[test]
    fn happy_path_builds_items_and_folio() {
        let detail = format!(
            "{}{}",
            detail_line(1, "Harina 25kg", "2", "10000", "20000"),
            detail_line(2, "Azucar 10kg", "1", "8000", "8000"),
        );
        let sections = parse(&factura_file("0;0;0;0;28000;0;19;5320;33320", &detail));
        let doc = transform(&sections, &test_merchant(), &TracingSink).unwrap();

        assert_eq!(doc.doc_type, DocType::Factura);
        let id_doc = &doc.payload.dte.encabezado.id_doc;
        assert_eq!(id_doc.folio, 4502);
        assert_eq!(id_doc.tipo_dte, 33);
        assert_eq!(id_doc.tpo_tran_compra, Some(1));

        let items = &doc.payload.dte.detalle;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].monto_item, Decimal::from(20000));
        assert_eq!(items[0].dsc_item, None);
        assert_eq!(doc.issue_date, NaiveDate::from_ymd_opt(2024, 6, 15));
    }

    #[test]
    fn item_amount_is_quantity_times_price_rounded() {
        let detail = detail_line(1, "Clavo suelto", "2.5", "333.4", "834");
        let sections = parse(&factura_file("0;0;0;0;834;0;19;158;992", &detail));
        let doc = transform(&sections, &test_merchant(), &TracingSink).unwrap();

        // 2.5 * 333.4 = 833.5 -> 834
        assert_eq!(doc.payload.dte.detalle[0].monto_item, Decimal::from(834));
    }

    #[test]
    fn exempt_amount_sets_exempt_flag() {
        let detail = "1;x;Libro;1;5000;x;x;x;x;5000;5000;x;x;\n".to_string();
        let sections = parse(&factura_file("0;0;0;0;0;5000;19;0;5000", &detail));
        let doc = transform(&sections, &test_merchant(), &TracingSink).unwrap();

        assert_eq!(doc.payload.dte.detalle[0].ind_exe, 1);
    }

    #[test]
    fn long_description_is_carried() {
        let detail = "1;x;Servicio;1;9900;x;x;x;x;0;9900;x;x;Mantencion anual equipos\n";
        let sections = parse(&factura_file("0;0;0;0;9900;0;19;1881;11781", detail));
        let doc = transform(&sections, &test_merchant(), &TracingSink).unwrap();

        assert_eq!(
            doc.payload.dte.detalle[0].dsc_item.as_deref(),
            Some("Mantencion anual equipos")
        );
    }

    #[test]
    fn surcharge_value_appends_item_with_next_line_number() {
        let detail = format!(
            "{}{}",
            detail_line(1, "Item A", "1", "6000", "6000"),
            detail_line(4, "Item B", "1", "4000", "4000"),
        );
        // net 11000 includes the 1000 surcharge
        let sections = parse(&factura_file("0;0;10;1000;11000;0;19;2090;13090", &detail));
        let doc = transform(&sections, &test_merchant(), &TracingSink).unwrap();

        let items = &doc.payload.dte.detalle;
        assert_eq!(items.len(), 3);
        let surcharge = &items[2];
        assert_eq!(surcharge.nro_lin_det, 5);
        assert_eq!(surcharge.nmb_item, "Recargo 10%");
        assert_eq!(surcharge.monto_item, Decimal::from(1000));
    }

    #[test]
    fn surcharge_without_percentage_gets_plain_description() {
        let detail = detail_line(1, "Item", "1", "5000", "5000");
        let sections = parse(&factura_file("0;0;0;500;5500;0;19;1045;6545", &detail));
        let doc = transform(&sections, &test_merchant(), &TracingSink).unwrap();

        assert_eq!(doc.payload.dte.detalle[1].nmb_item, "Recargo");
    }

    #[test]
    fn discount_distributes_with_two_decimals() {
        let detail = format!(
            "{}{}",
            detail_line(1, "Item A", "1", "100", "100"),
            detail_line(2, "Item B", "1", "200", "200"),
        );
        let sections = parse(&factura_file("0;10;0;0;290;0;19;55.1;345.1", &detail));
        let doc = transform(&sections, &test_merchant(), &TracingSink).unwrap();

        let items = &doc.payload.dte.detalle;
        assert_eq!(items[0].descuento_monto, Decimal::new(333, 2));
        assert_eq!(items[1].descuento_monto, Decimal::new(667, 2));
        assert_eq!(items[0].monto_item, Decimal::new(9667, 2));
    }

    #[test]
    fn reconciliation_adjusts_surcharge_to_close_the_gap() {
        let detail = detail_line(1, "Item", "1", "6000", "6000");
        // stated net 7500 with a surcharge of 1000: detail sums 7000,
        // gap 500 > 1, surcharge absorbs it and becomes 1500
        let sections = parse(&factura_file("0;0;0;1000;7500;0;19;1425;8925", &detail));
        let doc = transform(&sections, &test_merchant(), &TracingSink).unwrap();

        let surcharge = &doc.payload.dte.detalle[1];
        assert_eq!(surcharge.monto_item, Decimal::from(1500));
        assert_eq!(surcharge.prc_item, Decimal::from(1500));
    }

    #[test]
    fn small_gap_is_left_alone() {
        let detail = detail_line(1, "Item", "1", "6000", "6000");
        // gap of exactly 1 unit is tolerated
        let sections = parse(&factura_file("0;0;0;1000;7001;0;19;0;0", &detail));
        let doc = transform(&sections, &test_merchant(), &TracingSink).unwrap();

        assert_eq!(doc.payload.dte.detalle[1].monto_item, Decimal::from(1000));
    }

    #[test]
    fn gap_without_surcharge_is_only_logged() {
        let detail = detail_line(1, "Item", "1", "6000", "6000");
        let sections = parse(&factura_file("0;0;0;0;9000;0;19;0;0", &detail));
        let doc = transform(&sections, &test_merchant(), &TracingSink).unwrap();

        assert_eq!(doc.payload.dte.detalle.len(), 1);
        assert_eq!(doc.payload.dte.detalle[0].monto_item, Decimal::from(6000));
    }

    #[test]
    fn malformed_detail_line_is_skipped() {
        let detail = format!(
            "{}{}",
            "1;x;Roto;abc;10;x;x;x;x;0;10;x;x;\n",
            detail_line(2, "Bueno", "1", "100", "100"),
        );
        let sections = parse(&factura_file("0;0;0;0;100;0;19;19;119", &detail));
        let doc = transform(&sections, &test_merchant(), &TracingSink).unwrap();

        assert_eq!(doc.payload.dte.detalle.len(), 1);
        assert_eq!(doc.payload.dte.detalle[0].nmb_item, "Bueno");
    }

    #[test]
    fn empty_totals_fields_fall_back_to_defaults() {
        let detail = detail_line(1, "Item", "1", "100", "100");
        let sections = parse(&factura_file(";;;;100;;;;", &detail));
        let doc = transform(&sections, &test_merchant(), &TracingSink).unwrap();

        match &doc.payload.dte.encabezado.totales {
            Totales::Factura(t) => assert_eq!(t.tasa_iva, 19),
            Totales::Boleta(_) => panic!("expected factura totals"),
        }
    }

    #[test]
    fn missing_reference_defaults_folio_to_zero() {
        let text = "->Encabezado<-\n33;x;2024-06-15\n->Totales<-\n0;0;0;0;100;0;19;19;119\n\
                    ->Detalle<-\n1;x;Item;1;100;x;x;x;x;0;100;x;x;\n";
        let sections = parse(text);
        let doc = transform(&sections, &test_merchant(), &TracingSink).unwrap();

        assert_eq!(doc.payload.dte.encabezado.id_doc.folio, 0);
    }

    #[test]
    fn short_reference_line_defaults_folio_to_zero() {
        let text = "->Encabezado<-\n33;x;2024-06-15\n->Totales<-\n0;0;0;0;100;0;19;19;119\n\
                    ->Detalle<-\n1;x;Item;1;100;x;x;x;x;0;100;x;x;\n->Referencia<-\nx;y\n";
        let sections = parse(text);
        let doc = transform(&sections, &test_merchant(), &TracingSink).unwrap();

        assert_eq!(doc.payload.dte.encabezado.id_doc.folio, 0);
    }

    #[test]
    fn garbage_folio_is_still_a_parse_error() {
        let detail = detail_line(1, "Item", "1", "100", "100");
        let sections = parse(&factura_file("0;0;0;0;100;0;19;19;119", &detail).replace("4502", "abc"));
        assert!(matches!(
            transform(&sections, &test_merchant(), &TracingSink),
            Err(TransformError::Parse { section: REFERENCE, index: 2, .. })
        ));
    }

    #[test]
    fn reconciliation_messages_reach_the_operator_log() {
        let sink = RecordingSink::default();
        let detail = detail_line(1, "Item", "1", "6000", "6000");
        let sections = parse(&factura_file("0;0;0;1000;7500;0;19;1425;8925", &detail));
        transform(&sections, &test_merchant(), &sink).unwrap();

        let messages = sink.messages();
        assert!(messages.iter().any(|m| m.contains("no coincide con neto+exento")));
        assert!(messages.iter().any(|m| m.contains("Recargo ajustado de 1000 a 1500")));
    }

    #[test]
    fn missing_totals_section_is_an_error() {
        let sections = parse("->Encabezado<-\n33;x;2024-06-15\n");
        assert!(matches!(
            transform(&sections, &test_merchant(), &TracingSink),
            Err(TransformError::MissingSection(TOTALS))
        ));
    }
}
