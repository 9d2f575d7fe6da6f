use crate::domain::model::{AjusteResultado, LiquidacionAutorizada};
use crate::utils::error::{Result, WslpgError};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = WslpgError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(WslpgError::InvalidConfigValueError {
                field: "format".to_string(),
                value: other.to_string(),
                reason: "Unsupported format. Valid formats: json, csv".to_string(),
            }),
        }
    }
}

/// CSV 單列：授權結果
#[derive(Debug, Serialize)]
struct AutorizacionRow<'a> {
    coe: &'a str,
    estado: &'a str,
    pto_emision: Option<u32>,
    nro_orden: Option<u64>,
    total_deduccion: Decimal,
    total_retencion: Decimal,
    total_neto_a_pagar: Decimal,
    total_iva_rg_2300_07: Decimal,
    total_pago_segun_condicion: Decimal,
}

/// CSV 單列：調整結果 (統一總計)
#[derive(Debug, Serialize)]
struct AjusteRow<'a> {
    coe: &'a str,
    coe_ajustado: &'a str,
    estado: &'a str,
    subtotal_general: Decimal,
    total_iva_105: Decimal,
    total_iva_21: Decimal,
    total_retenciones_ganancias: Decimal,
    total_retenciones_iva: Decimal,
    total_neto_a_pagar: Decimal,
    total_iva_rg_2300_07: Decimal,
    total_pago_segun_condicion: Decimal,
}

fn csv_single_row<T: Serialize>(row: &T) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.serialize(row)?;
    writer.flush()?;
    let bytes = writer.into_inner().map_err(|e| WslpgError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| WslpgError::ValidationError {
        message: format!("CSV output is not UTF-8: {}", e),
    })
}

pub fn render_autorizacion(result: &LiquidacionAutorizada, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Csv => csv_single_row(&AutorizacionRow {
            coe: &result.coe,
            estado: result.estado.as_deref().unwrap_or_default(),
            pto_emision: result.pto_emision,
            nro_orden: result.nro_orden,
            total_deduccion: result.total_deduccion,
            total_retencion: result.total_retencion,
            total_neto_a_pagar: result.total_neto_a_pagar,
            total_iva_rg_2300_07: result.total_iva_rg_2300_07,
            total_pago_segun_condicion: result.total_pago_segun_condicion,
        }),
    }
}

pub fn render_ajuste(result: &AjusteResultado, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Csv => {
            let t = &result.totales;
            csv_single_row(&AjusteRow {
                coe: &result.coe,
                coe_ajustado: result.coe_ajustado.as_deref().unwrap_or_default(),
                estado: result.estado.as_deref().unwrap_or_default(),
                subtotal_general: t.subtotal_general,
                total_iva_105: t.total_iva_105,
                total_iva_21: t.total_iva_21,
                total_retenciones_ganancias: t.total_retenciones_ganancias,
                total_retenciones_iva: t.total_retenciones_iva,
                total_neto_a_pagar: t.total_neto_a_pagar,
                total_iva_rg_2300_07: t.total_iva_rg_2300_07,
                total_pago_segun_condicion: t.total_pago_segun_condicion,
            })
        }
    }
}

/// 其他結果 (票證、狀態、參數表) 一律輸出 JSON
pub fn render_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
