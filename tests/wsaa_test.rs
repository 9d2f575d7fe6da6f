mod common;

use anyhow::Result;
use async_trait::async_trait;
use common::{soap_fault, soap_response, xml_escape};
use httpmock::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use wslpg_client::core::wsaa::cache_key;
use wslpg_client::core::{Storage, TraSigner};
use wslpg_client::{LocalStorage, WsaaClient, WslpgError};

const WSAA_PATH: &str = "/ws/services/LoginCms";

/// 不呼叫 openssl 的簽章器
#[derive(Clone, Default)]
struct FakeSigner {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl TraSigner for FakeSigner {
    async fn sign(&self, tra: &str) -> wslpg_client::Result<String> {
        assert!(tra.contains("<service>wslpg</service>"));
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("Q01TLVNJR05FRA==".to_string())
    }

    fn identity(&self) -> String {
        "test.crt|test.key".to_string()
    }
}

fn ticket_xml(token: &str, expiration: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<loginTicketResponse version="1.0">
  <header>
    <source>CN=wsaahomo, O=AFIP, C=AR</source>
    <destination>SERIALNUMBER=CUIT 20267565393, CN=test</destination>
    <uniqueId>1360245677</uniqueId>
    <generationTime>2013-02-07T10:01:17.512-03:00</generationTime>
    <expirationTime>{}</expirationTime>
  </header>
  <credentials>
    <token>{}</token>
    <sign>FIRMA</sign>
  </credentials>
</loginTicketResponse>"#,
        expiration, token
    )
}

fn login_body(token: &str) -> String {
    soap_response(&format!(
        r#"<loginCmsResponse xmlns="http://wsaa.view.sua.dvadac.desein.afip.gov"><loginCmsReturn>{}</loginCmsReturn></loginCmsResponse>"#,
        xml_escape(&ticket_xml(token, "2099-02-07T22:01:17.512-03:00"))
    ))
}

fn storage_in(dir: &TempDir) -> LocalStorage {
    LocalStorage::new(dir.path().to_str().unwrap().to_string())
}

#[tokio::test]
async fn test_authenticate_logs_in_once_and_caches_ticket() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(WSAA_PATH)
                .body_contains("<wsaa:loginCms>")
                .body_contains("<wsaa:in0>Q01TLVNJR05FRA==</wsaa:in0>");
            then.status(200).body(login_body("TOKEN-1"));
        })
        .await;

    let temp_dir = TempDir::new()?;
    let signer = FakeSigner::default();
    let wsaa = WsaaClient::new(&server.url(WSAA_PATH), storage_in(&temp_dir), signer.clone(), 2400);

    let first = wsaa.authenticate("wslpg").await?;
    assert_eq!(first.token, "TOKEN-1");
    assert_eq!(first.sign, "FIRMA");

    let second = wsaa.authenticate("wslpg").await?;
    assert_eq!(second.token, "TOKEN-1");

    assert_eq!(mock.hits_async().await, 1);
    assert_eq!(signer.calls.load(Ordering::SeqCst), 1);

    let key = cache_key("wslpg", "test.crt|test.key");
    let cached = storage_in(&temp_dir).read_file(&key).await?;
    assert!(String::from_utf8(cached)?.contains("<token>TOKEN-1</token>"));
    Ok(())
}

#[tokio::test]
async fn test_expired_cached_ticket_triggers_new_login() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path(WSAA_PATH);
            then.status(200).body(login_body("TOKEN-NUEVO"));
        })
        .await;

    let temp_dir = TempDir::new()?;
    let key = cache_key("wslpg", "test.crt|test.key");
    storage_in(&temp_dir)
        .write_file(&key, ticket_xml("TOKEN-VIEJO", "2013-02-07T22:01:17.512-03:00").as_bytes())
        .await?;

    let wsaa = WsaaClient::new(&server.url(WSAA_PATH), storage_in(&temp_dir), FakeSigner::default(), 2400);
    let ticket = wsaa.authenticate("wslpg").await?;

    assert_eq!(ticket.token, "TOKEN-NUEVO");
    assert_eq!(mock.hits_async().await, 1);
    Ok(())
}

#[tokio::test]
async fn test_login_fault_is_reported() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(WSAA_PATH);
            then.status(500).body(soap_fault(
                "ns1:coe.alreadyAuthenticated",
                "El CEE ya posee un TA valido para el acceso al WSN solicitado",
            ));
        })
        .await;

    let temp_dir = TempDir::new()?;
    let wsaa = WsaaClient::new(&server.url(WSAA_PATH), storage_in(&temp_dir), FakeSigner::default(), 2400);

    match wsaa.authenticate("wslpg").await {
        Err(WslpgError::SoapFault { code, message }) => {
            assert_eq!(code, "ns1:coe.alreadyAuthenticated");
            assert!(message.contains("TA valido"));
        }
        other => panic!("expected SOAP fault, got {:?}", other.map(|t| t.token)),
    }

    // 失敗時不寫入快取
    let key = cache_key("wslpg", "test.crt|test.key");
    assert!(storage_in(&temp_dir).read_file(&key).await.is_err());
    Ok(())
}
