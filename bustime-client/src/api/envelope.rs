//! Response envelope decoding and API error classification.
//!
//! Every BusTime response, success or failure, is one `bustime-response`
//! wrapper holding either business children or one-or-more `error`
//! children. The wrapper arrives either as JSON or as XML depending on the
//! configured format; both decode to the same canonical
//! [`serde_json::Value`] tree, with XML text nodes becoming strings and
//! repeated sibling elements becoming arrays (a single occurrence stays a
//! bare object, which is where the cardinality ambiguity originates).

use serde_json::{Map, Value};

use quick_xml::Reader;
use quick_xml::events::Event;

use super::error::BustimeError;
use super::norm::normalize;

/// Name of the wrapper element every response shares.
pub const RESPONSE_TOKEN: &str = "bustime-response";

/// Name of the error child element.
pub const ERROR_TOKEN: &str = "error";

/// Phrase the API uses when a key's transaction quota is exhausted.
const QUOTA_PHRASE: &str = "transaction limit";

/// Phrases that signal "nothing matched", not a hard failure.
const NO_DATA_PHRASES: &[&str] = &[
    "no data found",
    "no arrival times",
    "no service scheduled",
    "no bulletins found",
];

/// Wire format of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// JSON body (the default for API v3)
    #[default]
    Json,
    /// Native XML body
    Xml,
}

impl ResponseFormat {
    /// Value of the `format` query parameter.
    pub fn as_param(self) -> &'static str {
        match self {
            ResponseFormat::Json => "json",
            ResponseFormat::Xml => "xml",
        }
    }
}

/// Decode a response body into the tree under `bustime-response`.
///
/// A missing wrapper or undecodable body is a malformed-response error;
/// an `error` child hands off to the classifier and never returns data.
pub fn decode(body: &str, format: ResponseFormat) -> Result<Value, BustimeError> {
    let tree = match format {
        ResponseFormat::Json => serde_json::from_str::<Value>(body).map_err(|e| {
            BustimeError::Malformed(format!("undecodable JSON body: {e} (body: {})", excerpt(body)))
        })?,
        ResponseFormat::Xml => xml_to_value(body)?,
    };

    let Value::Object(mut root) = tree else {
        return Err(BustimeError::Malformed(format!(
            "`{RESPONSE_TOKEN}` wrapper missing (body: {})",
            excerpt(body)
        )));
    };

    let Some(inner) = root.remove(RESPONSE_TOKEN) else {
        return Err(BustimeError::Malformed(format!(
            "`{RESPONSE_TOKEN}` wrapper missing (body: {})",
            excerpt(body)
        )));
    };

    if let Value::Object(map) = &inner
        && let Some(errors) = map.get(ERROR_TOKEN)
    {
        return Err(classify_errors(normalize(errors.clone())));
    }

    Ok(inner)
}

/// Classify parsed `error` children into the typed failure taxonomy.
///
/// Multiple simultaneous errors concatenate into one comma-separated
/// message; the quota check runs against the whole concatenation so a
/// rate-limit notice is never downgraded by a neighboring message.
pub fn classify_errors(errors: Vec<Value>) -> BustimeError {
    let messages: Vec<String> = errors
        .iter()
        .map(|e| match e {
            Value::Object(map) => map
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            Value::String(s) => s.clone(),
            _ => String::new(),
        })
        .filter(|m| !m.is_empty())
        .collect();

    let joined = if messages.is_empty() {
        "unspecified API error".to_string()
    } else {
        messages.join(", ")
    };

    let lower = joined.to_lowercase();
    if lower.contains(QUOTA_PHRASE) {
        BustimeError::QuotaExceeded(joined)
    } else if NO_DATA_PHRASES.iter().any(|p| lower.contains(p)) {
        BustimeError::NoData(joined)
    } else {
        BustimeError::Api(joined)
    }
}

/// Fold an XML document into a nested-mapping tree.
///
/// Elements become map entries, repeated sibling names become arrays,
/// text-only elements become strings, and empty elements become `null`.
/// The feed does not use attributes, so they are ignored.
fn xml_to_value(body: &str) -> Result<Value, BustimeError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    // Each frame: (element name, child map, accumulated text).
    // Frame zero collects the document root.
    let mut stack: Vec<(String, Map<String, Value>, String)> =
        vec![(String::new(), Map::new(), String::new())];
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                stack.push((name, Map::new(), String::new()));
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if let Some((_, children, _)) = stack.last_mut() {
                    insert_child(children, name, Value::Null);
                }
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| BustimeError::Malformed(format!("bad XML text: {e}")))?;
                if let Some((_, _, acc)) = stack.last_mut() {
                    acc.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Ok(text) = std::str::from_utf8(e.as_ref())
                    && let Some((_, _, acc)) = stack.last_mut()
                {
                    acc.push_str(text);
                }
            }
            Ok(Event::End(_)) => {
                let Some((name, children, text)) = stack.pop() else {
                    return Err(BustimeError::Malformed("unbalanced XML".into()));
                };
                let value = if children.is_empty() {
                    if text.is_empty() {
                        Value::Null
                    } else {
                        Value::String(text)
                    }
                } else {
                    Value::Object(children)
                };
                match stack.last_mut() {
                    Some((_, parent, _)) => insert_child(parent, name, value),
                    None => return Err(BustimeError::Malformed("unbalanced XML".into())),
                }
            }
            Ok(Event::Eof) => break,
            // Declarations, comments, processing instructions
            Ok(_) => {}
            Err(e) => {
                return Err(BustimeError::Malformed(format!(
                    "XML parse error: {e} (body: {})",
                    excerpt(body)
                )));
            }
        }
        buf.clear();
    }

    let Some((_, root_children, _)) = stack.pop() else {
        return Err(BustimeError::Malformed("unbalanced XML".into()));
    };
    if !stack.is_empty() {
        return Err(BustimeError::Malformed("unbalanced XML".into()));
    }
    Ok(Value::Object(root_children))
}

/// First occurrence of `name` stays bare; a repeat promotes the slot to an
/// array. This mirrors the JSON rendering's cardinality behavior exactly.
fn insert_child(map: &mut Map<String, Value>, name: String, value: Value) {
    match map.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(name, value);
        }
    }
}

/// Truncated body excerpt for error messages.
fn excerpt(body: &str) -> String {
    body.chars().take(200).collect()
}
