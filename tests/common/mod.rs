#![allow(dead_code)]

use chrono::DateTime;
use httpmock::MockServer;
use wslpg_client::config::WslpgConfig;
use wslpg_client::{AccessTicket, WslpgClient};

pub const SERVICE_PATH: &str = "/wslpg/LpgService";
pub const CUIT: u64 = 20267565393;

pub fn soap_response(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
<soap:Body>{}</soap:Body>
</soap:Envelope>"#,
        body
    )
}

pub fn soap_fault(code: &str, message: &str) -> String {
    soap_response(&format!(
        "<soap:Fault><faultcode>{}</faultcode><faultstring>{}</faultstring></soap:Fault>",
        code, message
    ))
}

pub fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn ticket() -> AccessTicket {
    AccessTicket {
        token: "TOKEN".to_string(),
        sign: "SIGN".to_string(),
        source: None,
        destination: None,
        unique_id: None,
        generation_time: None,
        expiration_time: DateTime::parse_from_rfc3339("2099-01-01T00:00:00-03:00").unwrap(),
    }
}

pub fn client_for(server: &MockServer) -> WslpgClient {
    let config = WslpgConfig {
        url: Some(format!("{}?wsdl", server.url(SERVICE_PATH))),
        cacert: None,
        timeout_seconds: Some(5),
    };
    WslpgClient::connect(&config).unwrap().with_auth(&ticket(), CUIT)
}

pub fn last_order_body(nro_orden: u64) -> String {
    soap_response(&format!(
        r#"<ns2:liquidacionUltimoNroOrdenConsultarResponse xmlns:ns2="http://serviciosjava.afip.gob.ar/wslpg/">
<liqUltNroOrdenReturn><nroOrden>{}</nroOrden><errores/></liqUltNroOrdenReturn>
</ns2:liquidacionUltimoNroOrdenConsultarResponse>"#,
        nro_orden
    ))
}

pub fn authorized_body(coe: &str) -> String {
    soap_response(&format!(
        r#"<ns2:liquidacionAutorizarResponse xmlns:ns2="http://serviciosjava.afip.gob.ar/wslpg/">
<liqReturn>
  <autorizacion>
    <ptoEmision>99</ptoEmision>
    <nroOrden>42</nroOrden>
    <coe>{}</coe>
    <fechaLiquidacion>2013-02-07</fechaLiquidacion>
    <estado>AC</estado>
    <totalDeduccion>0.00</totalDeduccion>
    <totalRetencion>120.00</totalRetencion>
    <totalRetencionAfip>105.00</totalRetencionAfip>
    <totalOtrasRetenciones>15.00</totalOtrasRetenciones>
    <totalNetoAPagar>19838.00</totalNetoAPagar>
    <totalIvaRg2300_07>2082.99</totalIvaRg2300_07>
    <totalPagoSegunCondicion>21920.99</totalPagoSegunCondicion>
  </autorizacion>
  <errores/>
</liqReturn>
</ns2:liquidacionAutorizarResponse>"#,
        coe
    ))
}

/// 統一調整回應 (與測試環境回傳的數值相同)
pub fn adjusted_body(coe: &str, coe_ajustado: &str) -> String {
    soap_response(&format!(
        r#"<ns2:liquidacionAjustarUnificadoResponse xmlns:ns2="http://serviciosjava.afip.gob.ar/wslpg/">
<ajusteUnifReturn>
 <ajusteUnificado>
  <ptoEmision>55</ptoEmision>
  <nroOrden>8</nroOrden>
  <coe>{}</coe>
  <coeAjustado>{}</coeAjustado>
  <estado>AC</estado>
  <ajusteCredito>
    <precioOperacion>1.900</precioOperacion>
    <totalPesoNeto>1000</totalPesoNeto>
    <importeIva>293.16</importeIva>
    <operacionConIva>3085.16</operacionConIva>
    <totalDeduccion>11.05</totalDeduccion>
    <totalPagoSegunCondicion>2780.95</totalPagoSegunCondicion>
    <deducciones>
      <deduccionReturn>
        <deduccion><codigoConcepto>AL</codigoConcepto><baseCalculo>10.00</baseCalculo></deduccion>
        <importeIva>1.05</importeIva>
        <importeDeduccion>11.05</importeDeduccion>
      </deduccionReturn>
    </deducciones>
    <retenciones>
      <retencionReturn><importeRetencion>105.00</importeRetencion></retencionReturn>
    </retenciones>
  </ajusteCredito>
  <ajusteDebito>
    <precioOperacion>2.090</precioOperacion>
    <totalPesoNeto>500</totalPesoNeto>
    <importeIva>215.55</importeIva>
    <operacionConIva>2268.45</operacionConIva>
    <totalDeduccion>11.05</totalDeduccion>
    <totalPagoSegunCondicion>2047.38</totalPagoSegunCondicion>
    <retenciones>
      <retencionReturn><importeRetencion>10.50</importeRetencion></retencionReturn>
    </retenciones>
  </ajusteDebito>
  <totalesUnificados>
    <subTotalGeneral>-734.10</subTotalGeneral>
    <iva105>0</iva105>
    <iva21>0</iva21>
    <retencionesGanancias>0</retencionesGanancias>
    <retencionesIVA>-94.50</retencionesIVA>
    <importeNeto>-639.07</importeNeto>
    <ivaRG2300_2007>94.50</ivaRG2300_2007>
    <pagoSCondicion>-733.57</pagoSCondicion>
  </totalesUnificados>
 </ajusteUnificado>
 <errores/>
</ajusteUnifReturn>
</ns2:liquidacionAjustarUnificadoResponse>"#,
        coe, coe_ajustado
    ))
}
