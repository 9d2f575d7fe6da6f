mod common;

use anyhow::Result;
use common::*;
use httpmock::prelude::*;
use rust_decimal_macros::dec;
use wslpg_client::app::scenarios::Homologacion;
use wslpg_client::utils::validation::Validate;
use wslpg_client::{ClientConfig, LocalStorage, OpensslSigner, WsaaClient, WslpgClient, WslpgError};

const ULT_NRO_ORDEN: &str = "<wsl:liquidacionUltimoNroOrdenConsultar>";

#[tokio::test]
async fn test_unified_adjustment_scenario_offline() -> Result<()> {
    let server = MockServer::start_async().await;

    let ult_liquidacion = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(SERVICE_PATH)
                .body_contains(ULT_NRO_ORDEN)
                .body_contains("<ptoEmision>99</ptoEmision>");
            then.status(200).body(last_order_body(41));
        })
        .await;
    let ult_ajuste = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(SERVICE_PATH)
                .body_contains(ULT_NRO_ORDEN)
                .body_contains("<ptoEmision>55</ptoEmision>");
            then.status(200).body(last_order_body(7));
        })
        .await;
    let autorizar = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(SERVICE_PATH)
                .body_contains("<wsl:liquidacionAutorizar>")
                .body_contains("<nroOrden>42</nroOrden>");
            then.status(200).body(authorized_body("330100013142"));
        })
        .await;
    let ajustar = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(SERVICE_PATH)
                .body_contains("<wsl:liquidacionAjustarUnificado>")
                .body_contains("<nroOrden>8</nroOrden>")
                .body_contains("<coeAjustado>330100013142</coeAjustado>");
            then.status(200)
                .body(adjusted_body("330100013133", "330100013142"));
        })
        .await;

    let client = client_for(&server);
    let script = Homologacion::new(&client, CUIT);
    let result = script.ajuste_unificado().await?;

    ult_liquidacion.assert_async().await;
    ult_ajuste.assert_async().await;
    autorizar.assert_async().await;
    ajustar.assert_async().await;

    assert_eq!(result.coe, "330100013133");
    assert_eq!(result.totales.total_iva_rg_2300_07, dec!(94.50));
    Ok(())
}

#[tokio::test]
async fn test_unexpected_totals_fail_the_scenario() -> Result<()> {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(POST).path(SERVICE_PATH).body_contains(ULT_NRO_ORDEN);
            then.status(200).body(last_order_body(1));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path(SERVICE_PATH)
                .body_contains("<wsl:liquidacionAutorizar>");
            then.status(200).body(authorized_body("330100013142"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path(SERVICE_PATH)
                .body_contains("<wsl:liquidacionAjustarUnificado>");
            then.status(200).body(
                adjusted_body("330100013133", "330100013142")
                    .replace("<importeNeto>-639.07</importeNeto>", "<importeNeto>-600.00</importeNeto>"),
            );
        })
        .await;

    let client = client_for(&server);
    match Homologacion::new(&client, CUIT).ajuste_unificado().await {
        Err(WslpgError::ScenarioError { scenario, message }) => {
            assert_eq!(scenario, "ajuste_unificado");
            assert!(message.contains("total_neto_a_pagar"));
            assert!(message.contains("-639.07"));
        }
        other => panic!("expected scenario error, got {:?}", other.map(|r| r.coe)),
    }
    Ok(())
}

#[tokio::test]
async fn test_void_scenario_checks_result() -> Result<()> {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(POST).path(SERVICE_PATH).body_contains(ULT_NRO_ORDEN);
            then.status(200).body(last_order_body(10));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path(SERVICE_PATH)
                .body_contains("<wsl:liquidacionAutorizar>");
            then.status(200).body(authorized_body("330100013150"));
        })
        .await;
    let anular = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(SERVICE_PATH)
                .body_contains("<wsl:liquidacionAnular>")
                .body_contains("<coe>330100013150</coe>");
            then.status(200).body(soap_response(
                r#"<ns2:liquidacionAnularResponse xmlns:ns2="http://serviciosjava.afip.gob.ar/wslpg/">
<anulacionReturn><resultado>R</resultado></anulacionReturn>
</ns2:liquidacionAnularResponse>"#,
            ));
        })
        .await;

    let client = client_for(&server);
    let err = Homologacion::new(&client, CUIT).anulacion().await.unwrap_err();

    anular.assert_async().await;
    assert!(matches!(err, WslpgError::ScenarioError { .. }));
    Ok(())
}

/// 需要測試環境憑證：WSLPG_CONFIG=homo.toml cargo test -- --ignored
#[tokio::test]
#[ignore]
async fn test_homologation_environment() -> Result<()> {
    let path = std::env::var("WSLPG_CONFIG").unwrap_or_else(|_| "wslpg.toml".to_string());
    let config = ClientConfig::from_file(&path)?;
    config.validate()?;

    let storage = LocalStorage::new(config.cache_dir().to_string());
    let signer = OpensslSigner::new(
        config.auth.openssl_bin(),
        &config.auth.cert,
        &config.auth.private_key,
    );
    let ticket = WsaaClient::from_config(&config.auth, storage, signer)
        .authenticate(config.auth.service())
        .await?;

    let client = WslpgClient::connect(&config.wslpg)?.with_auth(&ticket, config.auth.cuit);
    assert!(client.dummy().await?.is_ok());

    let script = Homologacion::new(&client, config.auth.cuit);
    script.liquidacion().await?;
    script.anulacion().await?;
    script.ajuste_unificado().await?;
    Ok(())
}
