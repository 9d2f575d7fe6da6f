//! WSAA authentication: ticket request (TRA) creation, CMS signing and
//! `loginCms`, with the resulting access ticket (TA) cached on disk.

use crate::config::toml_config::AuthConfig;
use crate::core::soap::{self, XmlNode};
use crate::domain::ports::{Storage, TraSigner};
use crate::utils::error::{Result, WslpgError};
use chrono::{DateTime, Duration, FixedOffset, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const WSAA_NAMESPACE: &str = "http://wsaa.view.sua.dvadac.desein.afip.gov";

/// 票證到期前保留的緩衝時間
const EXPIRATION_MARGIN_SECONDS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessTicket {
    pub token: String,
    pub sign: String,
    pub source: Option<String>,
    pub destination: Option<String>,
    pub unique_id: Option<u64>,
    pub generation_time: Option<DateTime<FixedOffset>>,
    pub expiration_time: DateTime<FixedOffset>,
}

impl AccessTicket {
    /// 解析 `loginTicketResponse`
    pub fn parse(xml: &str) -> Result<Self> {
        let doc = XmlNode::parse(xml)?;
        let field = |name: &str| -> Result<String> {
            doc.find_text(name)
                .map(str::to_string)
                .ok_or_else(|| WslpgError::missing("loginCms", name))
        };
        let timestamp = |name: &str| -> Result<DateTime<FixedOffset>> {
            let raw = field(name)?;
            DateTime::parse_from_rfc3339(raw.trim()).map_err(|e| WslpgError::AuthError {
                message: format!("invalid {} '{}': {}", name, raw, e),
            })
        };

        Ok(Self {
            token: field("token")?,
            sign: field("sign")?,
            source: doc.find_text("source").map(str::to_string),
            destination: doc.find_text("destination").map(str::to_string),
            unique_id: doc.find_text("uniqueId").and_then(|v| v.parse().ok()),
            generation_time: timestamp("generationTime").ok(),
            expiration_time: timestamp("expirationTime")?,
        })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration_time.with_timezone(&Utc) <= now + Duration::seconds(EXPIRATION_MARGIN_SECONDS)
    }
}

/// 建立存取票證請求 (loginTicketRequest 1.0)
pub fn create_tra(service: &str, ttl_seconds: u64, now: DateTime<Utc>) -> Result<String> {
    let ttl = Duration::seconds(ttl_seconds as i64);

    let mut header = XmlNode::new("header");
    header.push(XmlNode::with_text("uniqueId", now.timestamp().to_string()));
    header.push(XmlNode::with_text(
        "generationTime",
        (now - ttl).to_rfc3339_opts(SecondsFormat::Secs, false),
    ));
    header.push(XmlNode::with_text(
        "expirationTime",
        (now + ttl).to_rfc3339_opts(SecondsFormat::Secs, false),
    ));

    let mut request = XmlNode::new("loginTicketRequest").attr("version", "1.0");
    request.push(header);
    request.push(XmlNode::with_text("service", service));
    request.to_xml()
}

pub fn cache_key(service: &str, identity: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(service.as_bytes());
    hasher.update(identity.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("TA-{}.xml", hex)
}

pub struct WsaaClient<S: Storage, G: TraSigner> {
    client: reqwest::Client,
    url: String,
    storage: S,
    signer: G,
    ttl_seconds: u64,
}

impl<S: Storage, G: TraSigner> WsaaClient<S, G> {
    pub fn new(url: &str, storage: S, signer: G, ttl_seconds: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
            storage,
            signer,
            ttl_seconds,
        }
    }

    pub fn from_config(config: &AuthConfig, storage: S, signer: G) -> Self {
        Self::new(config.wsaa_url(), storage, signer, config.ttl_seconds())
    }

    pub async fn sign_tra(&self, tra: &str) -> Result<String> {
        self.signer.sign(tra).await
    }

    /// 呼叫 loginCms；回傳票證與原始 XML
    pub async fn login_cms(&self, cms: &str) -> Result<(AccessTicket, String)> {
        let mut login = XmlNode::new("wsaa:loginCms");
        login.push(XmlNode::with_text("wsaa:in0", cms));
        let envelope = soap::envelope("wsaa", WSAA_NAMESPACE, login);

        let document = soap::call(&self.client, &self.url, "", &envelope).await?;
        let body = soap::body_of(&document)?;
        let raw = body
            .find_text("loginCmsReturn")
            .ok_or_else(|| WslpgError::missing("loginCms", "loginCmsReturn"))?
            .to_string();

        let ticket = AccessTicket::parse(&raw)?;
        tracing::info!(
            "🔑 Access ticket obtained, expires at {}",
            ticket.expiration_time
        );
        Ok((ticket, raw))
    }

    async fn cached_ticket(&self, key: &str, now: DateTime<Utc>) -> Option<AccessTicket> {
        let data = self.storage.read_file(key).await.ok()?;
        let xml = String::from_utf8(data).ok()?;
        match AccessTicket::parse(&xml) {
            Ok(ticket) if !ticket.is_expired_at(now) => Some(ticket),
            Ok(_) => {
                tracing::debug!("Cached access ticket {} expired", key);
                None
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable cached ticket {}: {}", key, e);
                None
            }
        }
    }

    /// 取得服務的存取票證；快取中有效則直接使用
    pub async fn authenticate(&self, service: &str) -> Result<AccessTicket> {
        let now = Utc::now();
        let key = cache_key(service, &self.signer.identity());

        if let Some(ticket) = self.cached_ticket(&key, now).await {
            tracing::debug!("Using cached access ticket {}", key);
            return Ok(ticket);
        }

        let tra = create_tra(service, self.ttl_seconds, now)?;
        let cms = self.sign_tra(&tra).await?;
        let (ticket, raw) = self.login_cms(&cms).await?;

        if let Err(e) = self.storage.write_file(&key, raw.as_bytes()).await {
            tracing::warn!("Could not cache access ticket: {}", e);
        }
        Ok(ticket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) const TICKET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<loginTicketResponse version="1.0">
  <header>
    <source>CN=wsaahomo, O=AFIP, C=AR, SERIALNUMBER=CUIT 33693450239</source>
    <destination>SERIALNUMBER=CUIT 20267565393, CN=reingart</destination>
    <uniqueId>1360245677</uniqueId>
    <generationTime>2013-02-07T10:01:17.512-03:00</generationTime>
    <expirationTime>2013-02-07T22:01:17.512-03:00</expirationTime>
  </header>
  <credentials>
    <token>PD94bWwgdG9rZW4=</token>
    <sign>c2lnbmF0dXJl</sign>
  </credentials>
</loginTicketResponse>"#;

    #[test]
    fn test_create_tra() {
        let now = Utc.with_ymd_and_hms(2013, 2, 7, 12, 0, 0).unwrap();
        let tra = create_tra("wslpg", 2400, now).unwrap();

        let doc = XmlNode::parse(&tra).unwrap();
        assert_eq!(doc.name, "loginTicketRequest");
        assert_eq!(doc.find_text("service"), Some("wslpg"));
        assert_eq!(doc.find_text("uniqueId"), Some(now.timestamp().to_string().as_str()));
        assert_eq!(doc.find_text("generationTime"), Some("2013-02-07T11:20:00+00:00"));
        assert_eq!(doc.find_text("expirationTime"), Some("2013-02-07T12:40:00+00:00"));
        assert!(tra.contains("version=\"1.0\""));
    }

    #[test]
    fn test_parse_ticket() {
        let ticket = AccessTicket::parse(TICKET).unwrap();
        assert_eq!(ticket.token, "PD94bWwgdG9rZW4=");
        assert_eq!(ticket.sign, "c2lnbmF0dXJl");
        assert_eq!(ticket.unique_id, Some(1360245677));
        assert!(ticket.generation_time.is_some());

        let before = Utc.with_ymd_and_hms(2013, 2, 7, 20, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2013, 2, 8, 2, 0, 0).unwrap();
        assert!(!ticket.is_expired_at(before));
        assert!(ticket.is_expired_at(after));
    }

    #[test]
    fn test_parse_ticket_without_credentials() {
        let err = AccessTicket::parse("<loginTicketResponse><header/></loginTicketResponse>")
            .unwrap_err();
        assert!(matches!(err, WslpgError::MissingField { .. }));
    }

    #[test]
    fn test_cache_key_depends_on_service_and_identity() {
        let a = cache_key("wslpg", "user.crt|user.key");
        let b = cache_key("wsfe", "user.crt|user.key");
        let c = cache_key("wslpg", "other.crt|other.key");

        assert!(a.starts_with("TA-") && a.ends_with(".xml"));
        assert_eq!(a.len(), "TA-".len() + 64 + ".xml".len());
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, cache_key("wslpg", "user.crt|user.key"));
    }
}
