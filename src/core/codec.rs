use crate::core::soap::XmlNode;
use crate::domain::model::AjusteDetalle;
use crate::utils::error::ServiceMessage;
use serde_json::Value;
use std::collections::BTreeMap;

/// 不符合一般 camelCase 規則的欄位名稱
const WIRE_NAME_OVERRIDES: &[(&str, &str)] = &[
    ("campania_ppal", "campaniaPPal"),
    ("precio_pkg_diario", "precioPKGdiario"),
];

/// 陣列包裝元素與其項目元素名稱
const LIST_ITEMS: &[(&str, &str)] = &[
    ("retenciones", "retencion"),
    ("deducciones", "deduccion"),
    ("certificados", "certificado"),
];

pub fn to_wire_name(field: &str) -> String {
    if let Some((_, wire)) = WIRE_NAME_OVERRIDES.iter().find(|(k, _)| *k == field) {
        return wire.to_string();
    }

    let mut out = String::with_capacity(field.len());
    for (i, part) in field.split('_').filter(|p| !p.is_empty()).enumerate() {
        if i == 0 {
            out.push_str(part);
            continue;
        }
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// camelCase -> snake_case (回應欄位名稱)
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower_or_digit = false;
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower_or_digit {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower_or_digit = false;
        } else {
            out.push(c);
            prev_lower_or_digit = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

fn item_name(list: &str) -> String {
    LIST_ITEMS
        .iter()
        .find(|(l, _)| *l == list)
        .map(|(_, item)| item.to_string())
        .unwrap_or_else(|| list.trim_end_matches('s').to_string())
}

/// 將序列化後的值轉為 XML 節點；null 與空陣列略過
pub fn value_to_nodes(field: &str, value: &Value) -> Vec<XmlNode> {
    let wire = to_wire_name(field);
    match value {
        Value::Null => Vec::new(),
        Value::Bool(b) => vec![XmlNode::with_text(wire, if *b { "S" } else { "N" })],
        Value::Number(n) => vec![XmlNode::with_text(wire, n.to_string())],
        Value::String(s) => vec![XmlNode::with_text(wire, s.as_str())],
        Value::Array(items) => {
            if items.is_empty() {
                return Vec::new();
            }
            let mut wrapper = XmlNode::new(wire);
            let item = item_name(field);
            for entry in items {
                wrapper.children.extend(value_to_nodes(&item, entry));
            }
            vec![wrapper]
        }
        Value::Object(map) => {
            let mut node = XmlNode::new(wire);
            for (key, child) in map {
                node.children.extend(value_to_nodes(key, child));
            }
            vec![node]
        }
    }
}

fn messages(node: &XmlNode, container: &str, item: &str) -> Vec<ServiceMessage> {
    let mut containers = Vec::new();
    node.find_all(container, &mut containers);

    let mut out = Vec::new();
    for c in containers {
        let mut items = Vec::new();
        c.find_all(item, &mut items);
        for i in items {
            out.push(ServiceMessage {
                codigo: i.find_text("codigo").unwrap_or_default().to_string(),
                descripcion: i.find_text("descripcion").unwrap_or_default().to_string(),
            });
        }
    }
    out
}

/// 收集 `errores/error` 與 `errorFormato`
pub fn service_errors(node: &XmlNode) -> Vec<ServiceMessage> {
    let mut errors = messages(node, "errores", "error");

    let mut formato = Vec::new();
    node.find_all("errorFormato", &mut formato);
    for f in formato {
        let codigo = f.find_text("codigo").unwrap_or_default();
        let descripcion = f.find_text("descripcion").unwrap_or_default();
        if codigo.is_empty() && descripcion.is_empty() {
            continue;
        }
        errors.push(ServiceMessage {
            codigo: codigo.to_string(),
            descripcion: descripcion.to_string(),
        });
    }
    errors
}

pub fn service_events(node: &XmlNode) -> Vec<ServiceMessage> {
    messages(node, "eventos", "evento")
}

fn collect_leaves(node: &XmlNode, out: &mut BTreeMap<String, String>) {
    for child in &node.children {
        if child.is_leaf() {
            out.entry(to_snake_case(&child.name))
                .or_insert_with(|| child.text.clone());
        } else {
            collect_leaves(child, out);
        }
    }
}

/// 攤平調整明細 (ajusteCredito / ajusteDebito)
pub fn flatten_detail(node: &XmlNode) -> AjusteDetalle {
    let mut detalle = AjusteDetalle::default();

    for child in &node.children {
        match child.name.as_str() {
            "deducciones" | "retenciones" => {
                let items = child.children.iter().map(|item| {
                    let mut map = BTreeMap::new();
                    collect_leaves(item, &mut map);
                    map
                });
                if child.name == "deducciones" {
                    detalle.deducciones.extend(items);
                } else {
                    detalle.retenciones.extend(items);
                }
            }
            _ if child.is_leaf() => {
                detalle
                    .parametros
                    .entry(to_snake_case(&child.name))
                    .or_insert_with(|| child.text.clone());
            }
            _ => collect_leaves(child, &mut detalle.parametros),
        }
    }

    detalle
}
