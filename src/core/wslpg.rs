use crate::config::toml_config::WslpgConfig;
use crate::core::codec::{flatten_detail, service_errors, service_events, value_to_nodes};
use crate::core::soap::{self, XmlNode};
use crate::core::wsaa::AccessTicket;
use crate::domain::model::{
    Ajuste, AjusteResultado, Anulacion, Certificado, CodigoDescripcion, LiquidacionAutorizada,
    LiquidacionRequest, ServiceStatus, Tabla, TotalesUnificados,
};
use crate::utils::error::{Result, ServiceMessage, WslpgError};
use crate::utils::validation::{validate_coe, validate_positive_number, Validate};
use rust_decimal::Decimal;
use serde_json::Value;
use std::time::Duration;

pub const WSLPG_NAMESPACE: &str = "http://serviciosjava.afip.gob.ar/wslpg/";

#[derive(Clone)]
struct Credentials {
    token: String,
    sign: String,
    cuit: u64,
}

/// 穀物結算 Web Service 客戶端
pub struct WslpgClient {
    client: reqwest::Client,
    url: String,
    credentials: Option<Credentials>,
}

impl WslpgClient {
    /// 建立連線設定 (端點、CA 憑證、逾時)
    pub fn connect(config: &WslpgConfig) -> Result<Self> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_seconds()));

        if let Some(path) = &config.cacert {
            let pem = std::fs::read(path)?;
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
        }

        let url = config.endpoint().to_string();
        tracing::info!("🌐 WSLPG endpoint: {}", url);

        Ok(Self {
            client: builder.build()?,
            url,
            credentials: None,
        })
    }

    pub fn with_auth(mut self, ticket: &AccessTicket, cuit: u64) -> Self {
        self.credentials = Some(Credentials {
            token: ticket.token.clone(),
            sign: ticket.sign.clone(),
            cuit,
        });
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.url
    }

    fn auth_node(&self, operation: &str) -> Result<XmlNode> {
        let creds = self
            .credentials
            .as_ref()
            .ok_or_else(|| WslpgError::AuthError {
                message: format!("{} requires an access ticket", operation),
            })?;

        let mut auth = XmlNode::new("auth");
        auth.push(XmlNode::with_text("token", creds.token.as_str()));
        auth.push(XmlNode::with_text("sign", creds.sign.as_str()));
        auth.push(XmlNode::with_text("cuit", creds.cuit.to_string()));
        Ok(auth)
    }

    /// 呼叫遠端操作；回傳 Body 內的回應元素
    async fn invoke(&self, operation: &str, payload: Vec<XmlNode>, authenticated: bool) -> Result<XmlNode> {
        let mut request = XmlNode::new(format!("wsl:{}", operation));
        if authenticated {
            request.push(self.auth_node(operation)?);
        }
        request.children.extend(payload);

        tracing::debug!("Invoking {} at {}", operation, self.url);
        let envelope = soap::envelope("wsl", WSLPG_NAMESPACE, request);
        let soap_action = format!("{}{}", WSLPG_NAMESPACE, operation);
        let document = soap::call(&self.client, &self.url, &soap_action, &envelope).await?;
        let response = soap::body_of(&document)?.clone();

        let errors = service_errors(&response);
        if !errors.is_empty() {
            for e in &errors {
                tracing::error!("❌ {} error {}", operation, e);
            }
            return Err(WslpgError::rejected(operation, errors));
        }
        Ok(response)
    }

    /// 服務狀態 (不需認證)
    pub async fn dummy(&self) -> Result<ServiceStatus> {
        let response = self.invoke("dummy", Vec::new(), false).await?;
        Ok(ServiceStatus {
            app_server: text(&response, "appserver"),
            db_server: text(&response, "dbserver"),
            auth_server: text(&response, "authserver"),
        })
    }

    /// 查詢銷售點最後使用的單號
    pub async fn last_order_number(&self, pto_emision: u32) -> Result<u64> {
        const OP: &str = "liquidacionUltimoNroOrdenConsultar";
        validate_positive_number("pto_emision", pto_emision as u64, 1)?;

        let payload = vec![XmlNode::with_text("ptoEmision", pto_emision.to_string())];
        let response = self.invoke(OP, payload, true).await?;
        let nro_orden = parse_number(&response, OP, "nroOrden")?
            .ok_or_else(|| WslpgError::missing(OP, "nroOrden"))?;

        tracing::info!("📋 Last order number for point of sale {}: {}", pto_emision, nro_orden);
        Ok(nro_orden)
    }

    /// 申請授權 (取得 COE)
    pub async fn authorize(&self, request: &LiquidacionRequest) -> Result<LiquidacionAutorizada> {
        const OP: &str = "liquidacionAutorizar";
        request.validate()?;

        let payload = liquidacion_payload(request)?;
        let response = self.invoke(OP, payload, true).await?;

        let result = parse_autorizacion(&response, OP)?;
        tracing::info!(
            "✅ Settlement {} authorized, COE {}",
            request.liquidacion.nro_orden,
            result.coe
        );
        Ok(result)
    }

    /// 作廢已授權的結算
    pub async fn void(&self, coe: &str) -> Result<Anulacion> {
        const OP: &str = "liquidacionAnular";
        validate_coe("coe", coe)?;

        let payload = vec![XmlNode::with_text("coe", coe)];
        let response = self.invoke(OP, payload, true).await?;

        let resultado = response
            .find_text("resultado")
            .ok_or_else(|| WslpgError::missing(OP, "resultado"))?
            .to_string();
        tracing::info!("🗑️ Void of COE {} returned {}", coe, resultado);

        Ok(Anulacion {
            coe: response.find_text("coe").unwrap_or(coe).to_string(),
            resultado,
            eventos: events(&response, OP),
        })
    }

    pub async fn query_by_coe(&self, coe: &str) -> Result<LiquidacionAutorizada> {
        const OP: &str = "liquidacionXCoeConsultar";
        validate_coe("coe", coe)?;

        let payload = vec![XmlNode::with_text("coe", coe), XmlNode::with_text("pdf", "N")];
        let response = self.invoke(OP, payload, true).await?;
        parse_autorizacion(&response, OP)
    }

    pub async fn adjust_unified(&self, ajuste: &Ajuste) -> Result<AjusteResultado> {
        self.adjust("liquidacionAjustarUnificado", ajuste).await
    }

    pub async fn adjust_contract(&self, ajuste: &Ajuste) -> Result<AjusteResultado> {
        self.adjust("liquidacionAjustarContrato", ajuste).await
    }

    pub async fn adjust_paper(&self, ajuste: &Ajuste) -> Result<AjusteResultado> {
        self.adjust("liquidacionAjustarUnificadoPapel", ajuste).await
    }

    async fn adjust(&self, operation: &str, ajuste: &Ajuste) -> Result<AjusteResultado> {
        ajuste.validate()?;

        let payload = ajuste_payload(ajuste)?;
        let response = self.invoke(operation, payload, true).await?;
        let result = parse_ajuste(&response, operation)?;

        tracing::info!(
            "✅ Adjustment {} authorized, COE {} (estado {})",
            ajuste.base.nro_orden,
            result.coe,
            result.estado.as_deref().unwrap_or("-")
        );
        Ok(result)
    }

    /// 查詢參數表 (穀物、港口、省份、地區、等級)
    pub async fn reference_table(&self, tabla: Tabla) -> Result<Vec<CodigoDescripcion>> {
        let (operation, payload) = match tabla {
            Tabla::Granos => ("tipoGranoConsultar", Vec::new()),
            Tabla::Puertos => ("puertoConsultar", Vec::new()),
            Tabla::Provincias => ("provinciasConsultar", Vec::new()),
            Tabla::Localidades { cod_provincia } => (
                "localidadXProvinciaConsultar",
                vec![XmlNode::with_text("codProvincia", cod_provincia.to_string())],
            ),
            Tabla::GradosReferencia => ("codigoGradoReferenciaConsultar", Vec::new()),
        };

        let response = self.invoke(operation, payload, true).await?;
        let mut items = Vec::new();
        response.find_all("codigoDescripcion", &mut items);

        Ok(items
            .into_iter()
            .map(|item| CodigoDescripcion {
                codigo: text(item, "codigo"),
                descripcion: text(item, "descripcion"),
            })
            .collect())
    }
}

fn text(node: &XmlNode, name: &str) -> String {
    node.find_text(name).unwrap_or_default().to_string()
}

/// 先找直接子節點，避免讀到明細中的同名欄位
fn own_text<'a>(node: &'a XmlNode, name: &str) -> Option<&'a str> {
    match node.child(name) {
        Some(child) if !child.text.is_empty() => Some(child.text.as_str()),
        Some(_) => None,
        None => node.find_text(name),
    }
}

fn parse_number<T: std::str::FromStr>(node: &XmlNode, operation: &str, name: &str) -> Result<Option<T>> {
    match own_text(node, name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| WslpgError::ValidationError {
                message: format!("{}: field '{}' has invalid value '{}'", operation, name, raw),
            }),
        None => Ok(None),
    }
}

fn decimal(node: &XmlNode, operation: &str, name: &str) -> Result<Decimal> {
    Ok(parse_number::<Decimal>(node, operation, name)?.unwrap_or_default())
}

fn events(node: &XmlNode, operation: &str) -> Vec<ServiceMessage> {
    let eventos = service_events(node);
    for e in &eventos {
        tracing::warn!("⚠️ {} event {}", operation, e);
    }
    eventos
}

fn parse_autorizacion(response: &XmlNode, operation: &str) -> Result<LiquidacionAutorizada> {
    let aut = response.find("autorizacion").unwrap_or(response);
    let coe = own_text(aut, "coe").ok_or_else(|| WslpgError::missing(operation, "coe"))?;

    Ok(LiquidacionAutorizada {
        pto_emision: parse_number(aut, operation, "ptoEmision")?,
        nro_orden: parse_number(aut, operation, "nroOrden")?,
        coe: coe.to_string(),
        coe_ajustado: own_text(aut, "coeAjustado").map(str::to_string),
        estado: own_text(aut, "estado").map(str::to_string),
        fecha_liquidacion: own_text(aut, "fechaLiquidacion").map(str::to_string),
        total_deduccion: decimal(aut, operation, "totalDeduccion")?,
        total_retencion: decimal(aut, operation, "totalRetencion")?,
        total_retencion_afip: decimal(aut, operation, "totalRetencionAfip")?,
        total_otras_retenciones: decimal(aut, operation, "totalOtrasRetenciones")?,
        total_neto_a_pagar: decimal(aut, operation, "totalNetoAPagar")?,
        total_iva_rg_2300_07: decimal(aut, operation, "totalIvaRg2300_07")?,
        total_pago_segun_condicion: decimal(aut, operation, "totalPagoSegunCondicion")?,
        eventos: events(response, operation),
    })
}

fn parse_ajuste(response: &XmlNode, operation: &str) -> Result<AjusteResultado> {
    let aj = response.find("ajusteUnificado").unwrap_or(response);
    let coe = own_text(aj, "coe").ok_or_else(|| WslpgError::missing(operation, "coe"))?;

    let totales = match aj.find("totalesUnificados") {
        Some(t) => TotalesUnificados {
            subtotal_general: decimal(t, operation, "subTotalGeneral")?,
            total_iva_105: decimal(t, operation, "iva105")?,
            total_iva_21: decimal(t, operation, "iva21")?,
            total_retenciones_ganancias: decimal(t, operation, "retencionesGanancias")?,
            total_retenciones_iva: decimal(t, operation, "retencionesIVA")?,
            total_otras_retenciones: decimal(t, operation, "importeOtrasRetenciones")?,
            total_neto_a_pagar: decimal(t, operation, "importeNeto")?,
            total_iva_rg_2300_07: decimal(t, operation, "ivaRG2300_2007")?,
            total_pago_segun_condicion: decimal(t, operation, "pagoSCondicion")?,
        },
        None => TotalesUnificados::default(),
    };

    Ok(AjusteResultado {
        pto_emision: parse_number(aj, operation, "ptoEmision")?,
        nro_orden: parse_number(aj, operation, "nroOrden")?,
        coe: coe.to_string(),
        coe_ajustado: own_text(aj, "coeAjustado").map(str::to_string),
        estado: own_text(aj, "estado").map(str::to_string),
        totales,
        credito: aj.find("ajusteCredito").map(flatten_detail),
        debito: aj.find("ajusteDebito").map(flatten_detail),
        eventos: events(response, operation),
    })
}

/// 將寄存證明放進標頭物件 (空清單由 `value_to_nodes` 略過)
fn with_certificados(mut header: Value, certificados: &[Certificado]) -> Result<Value> {
    if let Value::Object(map) = &mut header {
        map.insert(
            "certificados".to_string(),
            serde_json::to_value(certificados)?,
        );
    }
    Ok(header)
}

/// 結算請求內容：liquidacion (含寄存證明)，其後為扣繳與扣除
fn liquidacion_payload(request: &LiquidacionRequest) -> Result<Vec<XmlNode>> {
    let liquidacion = with_certificados(
        serde_json::to_value(&request.liquidacion)?,
        &request.certificados,
    )?;

    let mut nodes = value_to_nodes("liquidacion", &liquidacion);
    nodes.extend(value_to_nodes(
        "retenciones",
        &serde_json::to_value(&request.retenciones)?,
    ));
    nodes.extend(value_to_nodes(
        "deducciones",
        &serde_json::to_value(&request.deducciones)?,
    ));
    Ok(nodes)
}

/// 調整請求內容：ajusteBase (含寄存證明) 與貸方/借方調整
fn ajuste_payload(ajuste: &Ajuste) -> Result<Vec<XmlNode>> {
    let base = with_certificados(serde_json::to_value(&ajuste.base)?, &ajuste.certificados)?;

    let mut nodes = value_to_nodes("ajuste_base", &base);
    if let Some(credito) = &ajuste.credito {
        nodes.extend(value_to_nodes("ajuste_credito", &serde_json::to_value(credito)?));
    }
    if let Some(debito) = &ajuste.debito {
        nodes.extend(value_to_nodes("ajuste_debito", &serde_json::to_value(debito)?));
    }
    Ok(nodes)
}
