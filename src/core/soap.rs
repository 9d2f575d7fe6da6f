//! SOAP 1.1 envelope handling.
//!
//! Requests are built as a small element tree and written with `quick-xml`;
//! responses are parsed back into the same tree with namespace prefixes
//! stripped, so lookups work by local name only.

use crate::utils::error::{Result, WslpgError};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::Cursor;

pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn attr(mut self, key: &str, value: &str) -> Self {
        self.attributes.push((key.to_string(), value.to_string()));
        self
    }

    pub fn push(&mut self, child: XmlNode) -> &mut Self {
        self.children.push(child);
        self
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// 深度優先搜尋第一個符合名稱的子孫節點 (含自己)
    pub fn find(&self, name: &str) -> Option<&XmlNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    pub fn find_text(&self, name: &str) -> Option<&str> {
        self.find(name)
            .map(|n| n.text.as_str())
            .filter(|t| !t.is_empty())
    }

    pub fn find_all<'a>(&'a self, name: &str, out: &mut Vec<&'a XmlNode>) {
        if self.name == name {
            out.push(self);
        }
        for child in &self.children {
            child.find_all(name, out);
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        self.write_to(&mut writer)?;
        let bytes = writer.into_inner().into_inner();
        String::from_utf8(bytes).map_err(|e| WslpgError::ValidationError {
            message: format!("generated XML is not UTF-8: {}", e),
        })
    }

    fn write_to(&self, writer: &mut Writer<Cursor<Vec<u8>>>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() && self.text.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        if !self.text.is_empty() {
            writer.write_event(Event::Text(BytesText::new(&self.text)))?;
        }
        for child in &self.children {
            child.write_to(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }

    pub fn parse(xml: &str) -> Result<XmlNode> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    stack.push(XmlNode::new(local_name(e.local_name().as_ref())));
                }
                Event::Empty(e) => {
                    let node = XmlNode::new(local_name(e.local_name().as_ref()));
                    attach(&mut stack, &mut root, node);
                }
                Event::Text(t) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&t.unescape()?);
                    }
                }
                Event::CData(c) => {
                    if let Some(current) = stack.last_mut() {
                        current
                            .text
                            .push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Event::End(_) => {
                    if let Some(node) = stack.pop() {
                        attach(&mut stack, &mut root, node);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        root.ok_or_else(|| WslpgError::ValidationError {
            message: "empty XML document".to_string(),
        })
    }
}

fn local_name(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if root.is_none() {
                *root = Some(node);
            }
        }
    }
}

/// 以指定前綴包裝 SOAP body
pub fn envelope(prefix: &str, namespace: &str, body: XmlNode) -> XmlNode {
    let mut body_node = XmlNode::new("soapenv:Body");
    body_node.push(body);

    let mut env = XmlNode::new("soapenv:Envelope")
        .attr("xmlns:soapenv", SOAP_ENV_NS)
        .attr(&format!("xmlns:{}", prefix), namespace);
    env.push(XmlNode::new("soapenv:Header"));
    env.push(body_node);
    env
}

/// 取出 Body 的第一個元素；Fault 轉為錯誤
pub fn body_of(document: &XmlNode) -> Result<&XmlNode> {
    let body = document.find("Body").ok_or_else(|| WslpgError::SoapFault {
        code: "Client".to_string(),
        message: "response has no SOAP Body".to_string(),
    })?;

    let first = body.children.first().ok_or_else(|| WslpgError::SoapFault {
        code: "Client".to_string(),
        message: "SOAP Body is empty".to_string(),
    })?;

    if first.name == "Fault" {
        return Err(WslpgError::SoapFault {
            code: first.find_text("faultcode").unwrap_or("Server").to_string(),
            message: first
                .find_text("faultstring")
                .unwrap_or("unknown fault")
                .to_string(),
        });
    }

    Ok(first)
}

/// 送出 SOAP 請求並解析回應文件 (Fault 留給 `body_of` 判斷)
pub async fn call(
    client: &reqwest::Client,
    url: &str,
    soap_action: &str,
    envelope: &XmlNode,
) -> Result<XmlNode> {
    let request_xml = envelope.to_xml()?;
    tracing::trace!("SOAP request to {}:\n{}", url, request_xml);

    let response = client
        .post(url)
        .header("Content-Type", "text/xml; charset=utf-8")
        .header("SOAPAction", format!("\"{}\"", soap_action))
        .body(request_xml)
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    tracing::debug!("SOAP response status: {}", status);
    tracing::trace!("SOAP response:\n{}", body);

    match XmlNode::parse(&body) {
        Ok(document) => Ok(document),
        Err(_) if !status.is_success() => Err(WslpgError::SoapFault {
            code: status.as_str().to_string(),
            message: body.chars().take(200).collect(),
        }),
        Err(e) => Err(e),
    }
}
