use crate::utils::error::{Result, ServiceMessage, WslpgError};
use crate::utils::validation::{
    validate_coe, validate_cuit_format, validate_non_empty_string, validate_positive_number,
    Validate,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 服務使用 "S" / "N" 表示布林值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiNo {
    #[serde(rename = "S")]
    Si,
    #[serde(rename = "N")]
    No,
}

// ============================================================================
// Requests
// ============================================================================

/// 一次穀物交易的結算資料 (liquidación)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Liquidacion {
    pub pto_emision: u32,
    pub nro_orden: u64,
    pub cuit_comprador: u64,
    pub nro_act_comprador: u32,
    pub nro_ing_bruto_comprador: u64,
    pub cod_tipo_operacion: u32,
    pub es_liquidacion_propia: SiNo,
    pub es_canje: SiNo,
    pub cod_puerto: u32,
    pub des_puerto_localidad: String,
    pub cod_grano: u32,
    pub cuit_vendedor: u64,
    pub nro_ing_bruto_vendedor: u64,
    pub actua_corredor: SiNo,
    pub liquida_corredor: SiNo,
    pub cuit_corredor: Option<u64>,
    pub comision_corredor: Option<Decimal>,
    pub nro_ing_bruto_corredor: Option<u64>,
    pub fecha_precio_operacion: NaiveDate,
    pub precio_ref_tn: Decimal,
    pub cod_grado_ref: Option<String>,
    pub cod_grado_ent: Option<String>,
    pub factor_ent: Option<Decimal>,
    pub val_grado_ent: Option<Decimal>,
    pub precio_flete_tn: Decimal,
    pub cont_proteico: Option<Decimal>,
    pub alic_iva_operacion: Decimal,
    pub campania_ppal: u32,
    pub cod_localidad_procedencia: u32,
    pub cod_prov_procedencia: u32,
    pub datos_adicionales: Option<String>,
    pub peso_neto_sin_certificado: Option<Decimal>,
    pub cod_prov_procedencia_sin_certificado: Option<u32>,
    pub cod_localidad_procedencia_sin_certificado: Option<u32>,
}

/// Retención (IVA, ganancias, etc.)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Retencion {
    pub codigo_concepto: String,
    pub detalle_aclaratorio: Option<String>,
    pub base_calculo: Decimal,
    pub alicuota: Decimal,
    pub nro_certificado_retencion: Option<u64>,
    pub fecha_certificado_retencion: Option<NaiveDate>,
    pub importe_certificado_retencion: Option<Decimal>,
}

impl Retencion {
    pub fn new(codigo_concepto: &str, detalle: &str, base_calculo: Decimal, alicuota: Decimal) -> Self {
        Self {
            codigo_concepto: codigo_concepto.to_string(),
            detalle_aclaratorio: Some(detalle.to_string()),
            base_calculo,
            alicuota,
            nro_certificado_retencion: None,
            fecha_certificado_retencion: None,
            importe_certificado_retencion: None,
        }
    }
}

/// Deducción (almacenaje, gastos, etc.)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deduccion {
    pub codigo_concepto: String,
    pub detalle_aclaratorio: Option<String>,
    pub dias_almacenaje: Option<u32>,
    pub precio_pkg_diario: Option<Decimal>,
    pub comision_gastos_adm: Option<Decimal>,
    pub base_calculo: Option<Decimal>,
    pub alicuota_iva: Option<Decimal>,
}

/// 寄存證明 (certificado de depósito)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificado {
    pub tipo_certificado_deposito: u32,
    pub nro_certificado_deposito: u64,
    pub peso_neto: Decimal,
    pub cod_localidad_procedencia: u32,
    pub cod_prov_procedencia: u32,
    pub campania: u32,
    pub fecha_cierre: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidacionRequest {
    pub liquidacion: Liquidacion,
    #[serde(default)]
    pub certificados: Vec<Certificado>,
    #[serde(default)]
    pub retenciones: Vec<Retencion>,
    #[serde(default)]
    pub deducciones: Vec<Deduccion>,
}

impl LiquidacionRequest {
    pub fn new(liquidacion: Liquidacion) -> Self {
        Self {
            liquidacion,
            certificados: Vec::new(),
            retenciones: Vec::new(),
            deducciones: Vec::new(),
        }
    }

    pub fn agregar_retencion(&mut self, retencion: Retencion) -> &mut Self {
        self.retenciones.push(retencion);
        self
    }

    pub fn agregar_deduccion(&mut self, deduccion: Deduccion) -> &mut Self {
        self.deducciones.push(deduccion);
        self
    }

    pub fn agregar_certificado(&mut self, certificado: Certificado) -> &mut Self {
        self.certificados.push(certificado);
        self
    }
}

impl Validate for LiquidacionRequest {
    fn validate(&self) -> Result<()> {
        let liq = &self.liquidacion;
        validate_positive_number("liquidacion.pto_emision", liq.pto_emision as u64, 1)?;
        validate_positive_number("liquidacion.nro_orden", liq.nro_orden, 1)?;
        validate_cuit_format("liquidacion.cuit_comprador", liq.cuit_comprador)?;
        validate_cuit_format("liquidacion.cuit_vendedor", liq.cuit_vendedor)?;
        if liq.actua_corredor == SiNo::Si {
            let cuit = liq.cuit_corredor.unwrap_or(0);
            validate_cuit_format("liquidacion.cuit_corredor", cuit)?;
        }
        for retencion in &self.retenciones {
            validate_non_empty_string("retenciones.codigo_concepto", &retencion.codigo_concepto)?;
        }
        for deduccion in &self.deducciones {
            validate_non_empty_string("deducciones.codigo_concepto", &deduccion.codigo_concepto)?;
        }
        Ok(())
    }
}

/// 調整單的共同欄位；依調整種類 (統一、合約、紙本) 使用不同子集
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AjusteBase {
    pub pto_emision: u32,
    pub nro_orden: u64,
    pub coe_ajustado: Option<String>,
    pub nro_contrato: Option<u64>,
    pub tipo_formulario: Option<u32>,
    pub nro_formulario: Option<String>,
    pub actividad: Option<u32>,
    pub nro_act_comprador: Option<u32>,
    pub cuit_comprador: Option<u64>,
    pub nro_ing_bruto_comprador: Option<u64>,
    pub tipo_operacion: Option<u32>,
    pub cod_grano: Option<u32>,
    pub cuit_vendedor: Option<u64>,
    pub nro_ing_bruto_vendedor: Option<u64>,
    pub cuit_corredor: Option<u64>,
    pub precio_ref_tn: Option<Decimal>,
    pub cod_grado_ent: Option<String>,
    pub val_grado_ent: Option<Decimal>,
    pub precio_flete_tn: Option<Decimal>,
    pub cod_puerto: Option<u32>,
    pub des_puerto_localidad: Option<String>,
    pub cod_provincia: Option<u32>,
    pub cod_localidad: Option<u32>,
}

/// 貸方或借方調整
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AjusteParte {
    pub diferencia_peso_neto: Option<Decimal>,
    pub diferencia_precio_operacion: Option<Decimal>,
    pub cod_grado: Option<String>,
    pub val_grado: Option<Decimal>,
    pub factor: Option<Decimal>,
    pub diferencia_precio_flete_tn: Option<Decimal>,
    pub datos_adicionales: Option<String>,
    pub concepto_importe_iva_0: Option<String>,
    pub importe_ajustar_iva_0: Option<Decimal>,
    pub concepto_importe_iva_105: Option<String>,
    pub importe_ajustar_iva_105: Option<Decimal>,
    pub concepto_importe_iva_21: Option<String>,
    pub importe_ajustar_iva_21: Option<Decimal>,
    #[serde(default)]
    pub deducciones: Vec<Deduccion>,
    #[serde(default)]
    pub retenciones: Vec<Retencion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lado {
    Credito,
    Debito,
}

/// 調整請求；扣除額與扣繳會附加到最後建立的貸方/借方調整
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ajuste {
    pub base: AjusteBase,
    #[serde(default)]
    pub certificados: Vec<Certificado>,
    pub credito: Option<AjusteParte>,
    pub debito: Option<AjusteParte>,
    #[serde(skip)]
    abierto: Option<Lado>,
}

impl Ajuste {
    pub fn new(base: AjusteBase) -> Self {
        Self {
            base,
            ..Default::default()
        }
    }

    pub fn agregar_certificado(&mut self, certificado: Certificado) -> &mut Self {
        self.certificados.push(certificado);
        self
    }

    pub fn crear_ajuste_credito(&mut self, parte: AjusteParte) -> &mut Self {
        self.credito = Some(parte);
        self.abierto = Some(Lado::Credito);
        self
    }

    pub fn crear_ajuste_debito(&mut self, parte: AjusteParte) -> &mut Self {
        self.debito = Some(parte);
        self.abierto = Some(Lado::Debito);
        self
    }

    fn parte_abierta(&mut self) -> Result<&mut AjusteParte> {
        let parte = match self.abierto {
            Some(Lado::Credito) => self.credito.as_mut(),
            Some(Lado::Debito) => self.debito.as_mut(),
            None => None,
        };
        parte.ok_or_else(|| WslpgError::ValidationError {
            message: "create a credit or debit adjustment before adding line items".to_string(),
        })
    }

    pub fn agregar_deduccion(&mut self, deduccion: Deduccion) -> Result<&mut Self> {
        self.parte_abierta()?.deducciones.push(deduccion);
        Ok(self)
    }

    pub fn agregar_retencion(&mut self, retencion: Retencion) -> Result<&mut Self> {
        self.parte_abierta()?.retenciones.push(retencion);
        Ok(self)
    }
}

impl Validate for Ajuste {
    fn validate(&self) -> Result<()> {
        validate_positive_number("base.pto_emision", self.base.pto_emision as u64, 1)?;
        validate_positive_number("base.nro_orden", self.base.nro_orden, 1)?;
        if let Some(coe) = &self.base.coe_ajustado {
            validate_coe("base.coe_ajustado", coe)?;
        }
        if self.credito.is_none() && self.debito.is_none() {
            return Err(WslpgError::ValidationError {
                message: "an adjustment needs a credit or a debit part".to_string(),
            });
        }
        Ok(())
    }
}

/// 可查詢的參數表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tabla {
    Granos,
    Puertos,
    Provincias,
    Localidades { cod_provincia: u32 },
    GradosReferencia,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiquidacionAutorizada {
    pub pto_emision: Option<u32>,
    pub nro_orden: Option<u64>,
    pub coe: String,
    pub coe_ajustado: Option<String>,
    pub estado: Option<String>,
    pub fecha_liquidacion: Option<String>,
    pub total_deduccion: Decimal,
    pub total_retencion: Decimal,
    pub total_retencion_afip: Decimal,
    pub total_otras_retenciones: Decimal,
    pub total_neto_a_pagar: Decimal,
    pub total_iva_rg_2300_07: Decimal,
    pub total_pago_segun_condicion: Decimal,
    pub eventos: Vec<ServiceMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Anulacion {
    pub coe: String,
    pub resultado: String,
    pub eventos: Vec<ServiceMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TotalesUnificados {
    pub subtotal_general: Decimal,
    pub total_iva_105: Decimal,
    pub total_iva_21: Decimal,
    pub total_retenciones_ganancias: Decimal,
    pub total_retenciones_iva: Decimal,
    pub total_otras_retenciones: Decimal,
    pub total_neto_a_pagar: Decimal,
    pub total_iva_rg_2300_07: Decimal,
    pub total_pago_segun_condicion: Decimal,
}

/// 調整明細；保留服務回傳的原始字串 (例如 "1.900")
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AjusteDetalle {
    pub parametros: BTreeMap<String, String>,
    pub deducciones: Vec<BTreeMap<String, String>>,
    pub retenciones: Vec<BTreeMap<String, String>>,
}

impl AjusteDetalle {
    pub fn parametro(&self, name: &str) -> Option<&str> {
        self.parametros.get(name).map(String::as_str)
    }

    /// 讀取 `deducciones` 或 `retenciones` 第 `index` 筆的欄位
    pub fn item(&self, list: &str, index: usize, name: &str) -> Option<&str> {
        let items = match list {
            "deducciones" => &self.deducciones,
            "retenciones" => &self.retenciones,
            _ => return None,
        };
        items.get(index)?.get(name).map(String::as_str)
    }

    pub fn decimal(&self, name: &str) -> Option<Decimal> {
        self.parametro(name)?.parse().ok()
    }

    pub fn total_deduccion(&self) -> Decimal {
        self.decimal("total_deduccion").unwrap_or_default()
    }

    pub fn total_pago_segun_condicion(&self) -> Decimal {
        self.decimal("total_pago_segun_condicion").unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AjusteResultado {
    pub pto_emision: Option<u32>,
    pub nro_orden: Option<u64>,
    pub coe: String,
    pub coe_ajustado: Option<String>,
    pub estado: Option<String>,
    pub totales: TotalesUnificados,
    pub credito: Option<AjusteDetalle>,
    pub debito: Option<AjusteDetalle>,
    pub eventos: Vec<ServiceMessage>,
}

impl AjusteResultado {
    pub fn analizar_ajuste_credito(&self) -> Option<&AjusteDetalle> {
        self.credito.as_ref()
    }

    pub fn analizar_ajuste_debito(&self) -> Option<&AjusteDetalle> {
        self.debito.as_ref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub app_server: String,
    pub db_server: String,
    pub auth_server: String,
}

impl ServiceStatus {
    pub fn is_ok(&self) -> bool {
        [&self.app_server, &self.db_server, &self.auth_server]
            .iter()
            .all(|s| s.eq_ignore_ascii_case("OK"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodigoDescripcion {
    pub codigo: String,
    pub descripcion: String,
}
