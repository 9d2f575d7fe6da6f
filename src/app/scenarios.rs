//! Homologation scenarios.
//!
//! Each scenario replays one end-to-end flow against the settlement service
//! (authorize, void, adjust) using fixed sample data, and checks the values
//! the homologation environment is known to return.

use crate::core::wslpg::WslpgClient;
use crate::domain::model::{
    Ajuste, AjusteBase, AjusteDetalle, AjusteParte, AjusteResultado, Anulacion, Certificado,
    Deduccion, Liquidacion, LiquidacionAutorizada, LiquidacionRequest, Retencion, SiNo,
};
use crate::utils::error::{Result, WslpgError};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt::Display;

pub const PTO_EMISION_LIQUIDACION: u32 = 99;
pub const PTO_EMISION_AJUSTE: u32 = 55;
pub const COE_LEN: usize = 12;

fn fecha(y: i32, m: u32, d: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| WslpgError::ValidationError {
        message: format!("invalid date {}-{}-{}", y, m, d),
    })
}

/// 授權測試用的結算 (含兩筆扣繳)
pub fn liquidacion_muestra(pto_emision: u32, nro_orden: u64, cuit: u64) -> Result<LiquidacionRequest> {
    let liquidacion = Liquidacion {
        pto_emision,
        nro_orden,
        cuit_comprador: cuit,
        nro_act_comprador: 29,
        nro_ing_bruto_comprador: cuit,
        cod_tipo_operacion: 1,
        es_liquidacion_propia: SiNo::No,
        es_canje: SiNo::No,
        cod_puerto: 14,
        des_puerto_localidad: "DETALLE PUERTO".to_string(),
        cod_grano: 31,
        cuit_vendedor: 23000000019,
        nro_ing_bruto_vendedor: 23000000019,
        actua_corredor: SiNo::No,
        liquida_corredor: SiNo::No,
        cuit_corredor: None,
        comision_corredor: None,
        nro_ing_bruto_corredor: None,
        fecha_precio_operacion: fecha(2013, 2, 7)?,
        precio_ref_tn: dec!(2000),
        cod_grado_ref: Some("G1".to_string()),
        cod_grado_ent: Some("FG".to_string()),
        factor_ent: Some(dec!(98)),
        val_grado_ent: Some(dec!(1.02)),
        precio_flete_tn: dec!(10),
        cont_proteico: Some(dec!(20)),
        alic_iva_operacion: dec!(10.5),
        campania_ppal: 1213,
        cod_localidad_procedencia: 5544,
        cod_prov_procedencia: 12,
        datos_adicionales: Some("DATOS ADICIONALES".to_string()),
        peso_neto_sin_certificado: Some(dec!(10000)),
        cod_prov_procedencia_sin_certificado: Some(1),
        cod_localidad_procedencia_sin_certificado: Some(15124),
    };

    let mut request = LiquidacionRequest::new(liquidacion);
    request
        .agregar_retencion(Retencion::new("RI", "DETALLE DE IVA", dec!(1000), dec!(10.5)))
        .agregar_retencion(Retencion::new("RG", "DETALLE DE GANANCIAS", dec!(100), dec!(15)));
    Ok(request)
}

fn deduccion_almacenaje(base_calculo: Decimal) -> Deduccion {
    Deduccion {
        codigo_concepto: "AL".to_string(),
        detalle_aclaratorio: Some("Deduc Alm".to_string()),
        dias_almacenaje: Some(1),
        precio_pkg_diario: Some(dec!(0.01)),
        comision_gastos_adm: Some(dec!(1.0)),
        base_calculo: Some(base_calculo),
        alicuota_iva: Some(dec!(10.5)),
    }
}

/// 統一調整：貸方與借方各含一筆倉儲扣除與 IVA 扣繳
pub fn ajuste_unificado_muestra(pto_emision: u32, nro_orden: u64, coe_ajustado: &str) -> Result<Ajuste> {
    let mut ajuste = Ajuste::new(AjusteBase {
        pto_emision,
        nro_orden,
        coe_ajustado: Some(coe_ajustado.to_string()),
        ..Default::default()
    });

    ajuste.agregar_certificado(Certificado {
        tipo_certificado_deposito: 5,
        nro_certificado_deposito: 555501200729,
        peso_neto: dec!(10000),
        cod_localidad_procedencia: 3,
        cod_prov_procedencia: 1,
        campania: 1213,
        fecha_cierre: fecha(2013, 4, 15)?,
    });

    ajuste.crear_ajuste_credito(AjusteParte {
        diferencia_peso_neto: Some(dec!(1000)),
        diferencia_precio_operacion: Some(dec!(100)),
        cod_grado: Some("G2".to_string()),
        val_grado: Some(dec!(1.0)),
        factor: Some(dec!(100)),
        diferencia_precio_flete_tn: Some(dec!(10)),
        datos_adicionales: Some("AJUSTE CRED UNIF".to_string()),
        concepto_importe_iva_0: Some("Alicuota Cero".to_string()),
        importe_ajustar_iva_0: Some(dec!(900)),
        concepto_importe_iva_105: Some("Alicuota Diez".to_string()),
        importe_ajustar_iva_105: Some(dec!(800)),
        concepto_importe_iva_21: Some("Alicuota Veintiuno".to_string()),
        importe_ajustar_iva_21: Some(dec!(700)),
        ..Default::default()
    });
    ajuste.agregar_deduccion(deduccion_almacenaje(dec!(1000.0)))?;
    ajuste.agregar_retencion(Retencion::new("RI", "Ret IVA", dec!(1000), dec!(10.5)))?;

    ajuste.crear_ajuste_debito(AjusteParte {
        diferencia_peso_neto: Some(dec!(500)),
        diferencia_precio_operacion: Some(dec!(100)),
        cod_grado: Some("G2".to_string()),
        val_grado: Some(dec!(1.0)),
        factor: Some(dec!(100)),
        diferencia_precio_flete_tn: Some(dec!(0.01)),
        datos_adicionales: Some("AJUSTE DEB UNIF".to_string()),
        concepto_importe_iva_0: Some("Alic 0".to_string()),
        importe_ajustar_iva_0: Some(dec!(250)),
        concepto_importe_iva_105: Some("Alic 10.5".to_string()),
        importe_ajustar_iva_105: Some(dec!(200)),
        concepto_importe_iva_21: Some("Alicuota 21".to_string()),
        importe_ajustar_iva_21: Some(dec!(50)),
        ..Default::default()
    });
    ajuste.agregar_deduccion(deduccion_almacenaje(dec!(500.0)))?;
    ajuste.agregar_retencion(Retencion::new("RI", "Ret IVA", dec!(100), dec!(10.5)))?;

    Ok(ajuste)
}

/// 合約調整 (不需事先授權的 COE)
pub fn ajuste_contrato_muestra() -> Result<Ajuste> {
    let mut ajuste = Ajuste::new(AjusteBase {
        pto_emision: PTO_EMISION_AJUSTE,
        nro_orden: 1,
        nro_contrato: Some(100001005),
        nro_act_comprador: Some(41),
        cod_grano: Some(41),
        cuit_vendedor: Some(30000000007),
        cuit_comprador: Some(99999999999),
        precio_ref_tn: Some(dec!(100)),
        cod_grado_ent: Some("G1".to_string()),
        val_grado_ent: Some(dec!(1.01)),
        precio_flete_tn: Some(dec!(1000)),
        cod_puerto: Some(14),
        des_puerto_localidad: Some("Desc Puerto".to_string()),
        ..Default::default()
    });

    ajuste.crear_ajuste_credito(AjusteParte {
        concepto_importe_iva_0: Some("Ajuste IVA al 0%".to_string()),
        importe_ajustar_iva_0: Some(dec!(100)),
        ..Default::default()
    });
    ajuste.crear_ajuste_debito(AjusteParte {
        concepto_importe_iva_105: Some("Ajuste IVA al 10.5%".to_string()),
        importe_ajustar_iva_105: Some(dec!(100)),
        ..Default::default()
    });
    ajuste.agregar_deduccion(Deduccion {
        codigo_concepto: "OD".to_string(),
        detalle_aclaratorio: Some("Otras Deduc".to_string()),
        dias_almacenaje: Some(1),
        base_calculo: Some(dec!(100.0)),
        alicuota_iva: Some(dec!(10.5)),
        ..Default::default()
    })?;

    Ok(ajuste)
}

/// 紙本結算 (formulario 1116) 的調整
pub fn ajuste_papel_muestra() -> Result<Ajuste> {
    let mut ajuste = Ajuste::new(AjusteBase {
        pto_emision: 50,
        nro_orden: 1,
        tipo_formulario: Some(6),
        nro_formulario: Some("000101800999".to_string()),
        actividad: Some(46),
        cuit_comprador: Some(99999999999),
        nro_ing_bruto_comprador: Some(99999999999),
        tipo_operacion: Some(1),
        cod_grano: Some(31),
        cuit_vendedor: Some(30000000007),
        nro_ing_bruto_vendedor: Some(30000000007),
        cod_provincia: Some(1),
        cod_localidad: Some(5),
        ..Default::default()
    });

    ajuste.agregar_certificado(Certificado {
        tipo_certificado_deposito: 5,
        nro_certificado_deposito: 555501200802,
        peso_neto: dec!(10000),
        cod_localidad_procedencia: 5,
        cod_prov_procedencia: 1,
        campania: 1213,
        fecha_cierre: fecha(2013, 7, 12)?,
    });
    ajuste.crear_ajuste_credito(AjusteParte {
        concepto_importe_iva_21: Some("IVA al 21%".to_string()),
        importe_ajustar_iva_21: Some(dec!(1500)),
        ..Default::default()
    });
    ajuste.agregar_retencion(Retencion::new("RI", "Ret IVA", dec!(1500), dec!(8)))?;
    ajuste.crear_ajuste_debito(AjusteParte {
        concepto_importe_iva_105: Some("IVA al 0%".to_string()),
        importe_ajustar_iva_105: Some(dec!(100)),
        ..Default::default()
    });

    Ok(ajuste)
}

fn expect_eq<T: PartialEq + Display>(scenario: &str, field: &str, actual: T, expected: T) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(WslpgError::ScenarioError {
            scenario: scenario.to_string(),
            message: format!("{}: expected {}, got {}", field, expected, actual),
        })
    }
}

fn expect_param(scenario: &str, detalle: &AjusteDetalle, name: &str, expected: &str) -> Result<()> {
    expect_eq(scenario, name, detalle.parametro(name).unwrap_or("<missing>"), expected)
}

fn expect_coe(scenario: &str, coe: &str) -> Result<()> {
    expect_eq(scenario, "COE length", coe.len(), COE_LEN)
}

/// 統一調整的預期總計 (同一組測試資料在測試環境的回應)
pub fn verify_ajuste_unificado(result: &AjusteResultado) -> Result<()> {
    const S: &str = "ajuste_unificado";
    expect_coe(S, &result.coe)?;
    expect_eq(S, "estado", result.estado.as_deref().unwrap_or(""), "AC")?;

    let t = &result.totales;
    expect_eq(S, "subtotal_general", t.subtotal_general, dec!(-734.10))?;
    expect_eq(S, "total_iva_105", t.total_iva_105, dec!(0))?;
    expect_eq(S, "total_iva_21", t.total_iva_21, dec!(0))?;
    expect_eq(S, "total_retenciones_ganancias", t.total_retenciones_ganancias, dec!(0))?;
    expect_eq(S, "total_retenciones_iva", t.total_retenciones_iva, dec!(-94.50))?;
    expect_eq(S, "total_neto_a_pagar", t.total_neto_a_pagar, dec!(-639.07))?;
    expect_eq(S, "total_iva_rg_2300_07", t.total_iva_rg_2300_07, dec!(94.50))?;
    expect_eq(S, "total_pago_segun_condicion", t.total_pago_segun_condicion, dec!(-733.57))?;

    let credito = result
        .analizar_ajuste_credito()
        .ok_or_else(|| WslpgError::missing(S, "ajusteCredito"))?;
    expect_param(S, credito, "precio_operacion", "1.900")?;
    expect_param(S, credito, "total_peso_neto", "1000")?;
    expect_eq(S, "credito.total_deduccion", credito.total_deduccion(), dec!(11.05))?;
    expect_eq(
        S,
        "credito.total_pago_segun_condicion",
        credito.total_pago_segun_condicion(),
        dec!(2780.95),
    )?;
    expect_param(S, credito, "importe_iva", "293.16")?;
    expect_param(S, credito, "operacion_con_iva", "3085.16")?;
    expect_eq(
        S,
        "credito.deducciones[0].importe_iva",
        credito.item("deducciones", 0, "importe_iva").unwrap_or("<missing>"),
        "1.05",
    )?;

    let debito = result
        .analizar_ajuste_debito()
        .ok_or_else(|| WslpgError::missing(S, "ajusteDebito"))?;
    expect_param(S, debito, "precio_operacion", "2.090")?;
    expect_param(S, debito, "total_peso_neto", "500")?;
    expect_eq(S, "debito.total_deduccion", debito.total_deduccion(), dec!(11.05))?;
    expect_eq(
        S,
        "debito.total_pago_segun_condicion",
        debito.total_pago_segun_condicion(),
        dec!(2047.38),
    )?;
    expect_param(S, debito, "importe_iva", "215.55")?;
    expect_param(S, debito, "operacion_con_iva", "2268.45")?;
    expect_eq(
        S,
        "debito.retenciones[0].importe_retencion",
        debito.item("retenciones", 0, "importe_retencion").unwrap_or("<missing>"),
        "10.50",
    )?;

    Ok(())
}

/// 依序執行測試流程的腳本
pub struct Homologacion<'a> {
    client: &'a WslpgClient,
    cuit: u64,
}

impl<'a> Homologacion<'a> {
    pub fn new(client: &'a WslpgClient, cuit: u64) -> Self {
        Self { client, cuit }
    }

    pub async fn liquidacion(&self) -> Result<LiquidacionAutorizada> {
        let ultimo = self.client.last_order_number(PTO_EMISION_LIQUIDACION).await?;
        let request = liquidacion_muestra(PTO_EMISION_LIQUIDACION, ultimo + 1, self.cuit)?;
        let result = self.client.authorize(&request).await?;
        expect_coe("liquidacion", &result.coe)?;
        Ok(result)
    }

    /// 先授權一筆新的結算再作廢
    pub async fn anulacion(&self) -> Result<Anulacion> {
        let autorizada = self.liquidacion().await?;
        let anulacion = self.client.void(&autorizada.coe).await?;
        expect_eq("anulacion", "resultado", anulacion.resultado.as_str(), "A")?;
        Ok(anulacion)
    }

    pub async fn ajuste_unificado(&self) -> Result<AjusteResultado> {
        let autorizada = self.liquidacion().await?;
        let ultimo = self.client.last_order_number(PTO_EMISION_AJUSTE).await?;
        let ajuste = ajuste_unificado_muestra(PTO_EMISION_AJUSTE, ultimo + 1, &autorizada.coe)?;

        let result = self.client.adjust_unified(&ajuste).await?;
        verify_ajuste_unificado(&result)?;
        Ok(result)
    }

    pub async fn ajuste_contrato(&self) -> Result<AjusteResultado> {
        self.client.adjust_contract(&ajuste_contrato_muestra()?).await
    }

    pub async fn ajuste_papel(&self) -> Result<AjusteResultado> {
        self.client.adjust_paper(&ajuste_papel_muestra()?).await
    }
}
