//! XML-RPC envelope codec.
//!
//! Parsing is a hand-rolled pull parser over quick-xml events; XML-RPC's
//! type-tagged recursive `<value>` trees don't map onto serde derive.
//! Encoding builds the document directly, escaping character data.

use std::{collections::BTreeMap, fmt::Write as _};

use quick_xml::{Reader, escape::escape, events::Event};

use crate::{Fault, Value};

const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

/// A parsed inbound call: wire method name plus positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method: String,
    pub params: Vec<Value>,
}

/// A parsed backend response: a return value or a server-raised fault.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    Success(Value),
    Fault(Fault),
}

// ── Parsing ──────────────────────────────────────────────────────────────────

struct Cursor<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> Cursor<'a> {
    fn new(xml: &'a str) -> Self {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        Self { reader }
    }

    /// Next structural event; declarations, comments and PIs are skipped.
    fn next(&mut self) -> Result<Event<'a>, Fault> {
        loop {
            match self.reader.read_event() {
                Ok(Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_)) => {},
                Ok(ev) => return Ok(ev),
                Err(e) => return Err(Fault::parse_error(e)),
            }
        }
    }

    fn expect_start(&mut self, tag: &[u8]) -> Result<(), Fault> {
        match self.next()? {
            Event::Start(e) if e.name().as_ref() == tag => Ok(()),
            other => Err(unexpected(tag, &other)),
        }
    }

    fn expect_end(&mut self, tag: &[u8]) -> Result<(), Fault> {
        match self.next()? {
            Event::End(e) if e.name().as_ref() == tag => Ok(()),
            other => Err(unexpected(tag, &other)),
        }
    }

    /// Collect character data up to the matching end tag.
    fn text_until_end(&mut self, tag: &[u8]) -> Result<String, Fault> {
        let mut out = String::new();
        loop {
            match self.next()? {
                Event::Text(t) => out.push_str(&t.unescape().map_err(Fault::parse_error)?),
                Event::CData(d) => out.push_str(&String::from_utf8_lossy(&d.into_inner())),
                Event::End(e) if e.name().as_ref() == tag => return Ok(out),
                other => return Err(unexpected(tag, &other)),
            }
        }
    }
}

fn unexpected(expected: &[u8], got: &Event<'_>) -> Fault {
    Fault::parse_error(format!(
        "expected <{}>, got {:?}",
        String::from_utf8_lossy(expected),
        got
    ))
}

/// Parse a `<methodCall>` document into method name + positional params.
pub fn parse_call(xml: &str) -> Result<MethodCall, Fault> {
    let mut c = Cursor::new(xml);
    c.expect_start(b"methodCall")?;
    c.expect_start(b"methodName")?;
    let method = c.text_until_end(b"methodName")?;
    if method.is_empty() {
        return Err(Fault::parse_error("empty methodName"));
    }

    let mut params = Vec::new();
    loop {
        match c.next()? {
            Event::Start(e) if e.name().as_ref() == b"params" => loop {
                match c.next()? {
                    Event::Start(e) if e.name().as_ref() == b"param" => {
                        params.push(parse_value_element(&mut c)?);
                        c.expect_end(b"param")?;
                    },
                    Event::End(e) if e.name().as_ref() == b"params" => break,
                    other => return Err(unexpected(b"param", &other)),
                }
            },
            Event::Empty(e) if e.name().as_ref() == b"params" => {},
            Event::End(e) if e.name().as_ref() == b"methodCall" => break,
            other => return Err(unexpected(b"params", &other)),
        }
    }
    Ok(MethodCall { method, params })
}

/// Parse a `<methodResponse>` document into a value or a fault.
pub fn parse_response(xml: &str) -> Result<MethodResponse, Fault> {
    let mut c = Cursor::new(xml);
    c.expect_start(b"methodResponse")?;
    match c.next()? {
        Event::Start(e) if e.name().as_ref() == b"params" => {
            c.expect_start(b"param")?;
            let value = parse_value_element(&mut c)?;
            c.expect_end(b"param")?;
            c.expect_end(b"params")?;
            Ok(MethodResponse::Success(value))
        },
        Event::Start(e) if e.name().as_ref() == b"fault" => {
            let value = parse_value_element(&mut c)?;
            c.expect_end(b"fault")?;
            let members = value
                .as_struct()
                .ok_or_else(|| Fault::parse_error("fault body is not a struct"))?;
            let code = members
                .get("faultCode")
                .and_then(Value::as_int)
                .ok_or_else(|| Fault::parse_error("fault without faultCode"))?;
            let message = members
                .get("faultString")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Ok(MethodResponse::Fault(Fault::new(code as i32, message)))
        },
        other => Err(unexpected(b"params", &other)),
    }
}

/// Parse one `<value>` element the cursor has not yet entered.
fn parse_value_element(c: &mut Cursor) -> Result<Value, Fault> {
    match c.next()? {
        Event::Start(e) if e.name().as_ref() == b"value" => parse_value(c),
        Event::Empty(e) if e.name().as_ref() == b"value" => Ok(Value::String(String::new())),
        other => Err(unexpected(b"value", &other)),
    }
}

/// Parse the inside of a `<value>` whose start tag was just consumed.
fn parse_value(c: &mut Cursor) -> Result<Value, Fault> {
    match c.next()? {
        // Untyped content is a string, per the XML-RPC spec.
        Event::Text(t) => {
            let s = t.unescape().map_err(Fault::parse_error)?.into_owned();
            c.expect_end(b"value")?;
            Ok(Value::String(s))
        },
        Event::CData(d) => {
            let s = String::from_utf8_lossy(&d.into_inner()).into_owned();
            c.expect_end(b"value")?;
            Ok(Value::String(s))
        },
        Event::End(e) if e.name().as_ref() == b"value" => Ok(Value::String(String::new())),
        Event::Empty(e) => {
            let v = empty_value(e.name().as_ref())?;
            c.expect_end(b"value")?;
            Ok(v)
        },
        Event::Start(e) => {
            let tag = e.name().as_ref().to_vec();
            let v = parse_typed(c, &tag)?;
            c.expect_end(b"value")?;
            Ok(v)
        },
        other => Err(unexpected(b"value", &other)),
    }
}

fn empty_value(tag: &[u8]) -> Result<Value, Fault> {
    match tag {
        b"nil" => Ok(Value::Nil),
        b"string" => Ok(Value::String(String::new())),
        b"base64" => Ok(Value::Base64(String::new())),
        b"array" => Ok(Value::Array(Vec::new())),
        b"struct" => Ok(Value::Struct(BTreeMap::new())),
        _ => Err(Fault::parse_error(format!(
            "empty <{}> value",
            String::from_utf8_lossy(tag)
        ))),
    }
}

fn parse_typed(c: &mut Cursor, tag: &[u8]) -> Result<Value, Fault> {
    match tag {
        b"int" | b"i4" | b"i8" => {
            let text = c.text_until_end(tag)?;
            text.trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| Fault::parse_error(format!("invalid integer: {text}")))
        },
        b"boolean" => {
            let text = c.text_until_end(tag)?;
            match text.trim() {
                "1" | "true" => Ok(Value::Bool(true)),
                "0" | "false" => Ok(Value::Bool(false)),
                other => Err(Fault::parse_error(format!("invalid boolean: {other}"))),
            }
        },
        b"double" => {
            let text = c.text_until_end(tag)?;
            text.trim()
                .parse::<f64>()
                .map(Value::Double)
                .map_err(|_| Fault::parse_error(format!("invalid double: {text}")))
        },
        b"string" => Ok(Value::String(c.text_until_end(tag)?)),
        b"dateTime.iso8601" => Ok(Value::DateTime(c.text_until_end(tag)?)),
        b"base64" => Ok(Value::Base64(c.text_until_end(tag)?)),
        b"array" => parse_array(c),
        b"struct" => parse_struct(c),
        _ => Err(Fault::parse_error(format!(
            "unknown value type <{}>",
            String::from_utf8_lossy(tag)
        ))),
    }
}

fn parse_array(c: &mut Cursor) -> Result<Value, Fault> {
    let mut items = Vec::new();
    match c.next()? {
        Event::Empty(e) if e.name().as_ref() == b"data" => {
            c.expect_end(b"array")?;
            return Ok(Value::Array(items));
        },
        Event::Start(e) if e.name().as_ref() == b"data" => {},
        other => return Err(unexpected(b"data", &other)),
    }
    loop {
        match c.next()? {
            Event::Start(e) if e.name().as_ref() == b"value" => items.push(parse_value(c)?),
            Event::Empty(e) if e.name().as_ref() == b"value" => {
                items.push(Value::String(String::new()));
            },
            Event::End(e) if e.name().as_ref() == b"data" => break,
            other => return Err(unexpected(b"value", &other)),
        }
    }
    c.expect_end(b"array")?;
    Ok(Value::Array(items))
}

fn parse_struct(c: &mut Cursor) -> Result<Value, Fault> {
    let mut members = BTreeMap::new();
    loop {
        match c.next()? {
            Event::Start(e) if e.name().as_ref() == b"member" => {
                c.expect_start(b"name")?;
                let name = c.text_until_end(b"name")?;
                let value = parse_value_element(c)?;
                c.expect_end(b"member")?;
                members.insert(name, value);
            },
            Event::End(e) if e.name().as_ref() == b"struct" => break,
            other => return Err(unexpected(b"member", &other)),
        }
    }
    Ok(Value::Struct(members))
}

// ── Encoding ─────────────────────────────────────────────────────────────────

/// Encode an outbound `<methodCall>` document.
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::with_capacity(256);
    out.push_str(XML_DECL);
    out.push_str("<methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        encode_value(&mut out, param);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

/// Encode a successful `<methodResponse>` document.
pub fn encode_response(value: &Value) -> String {
    let mut out = String::with_capacity(256);
    out.push_str(XML_DECL);
    out.push_str("<methodResponse><params><param>");
    encode_value(&mut out, value);
    out.push_str("</param></params></methodResponse>");
    out
}

/// Encode a `<fault>` response document.
pub fn encode_fault(fault: &Fault) -> String {
    let mut out = String::with_capacity(256);
    out.push_str(XML_DECL);
    out.push_str("<methodResponse><fault><value><struct>");
    let _ = write!(
        out,
        "<member><name>faultCode</name><value><int>{}</int></value></member>",
        fault.code
    );
    out.push_str("<member><name>faultString</name><value><string>");
    out.push_str(&escape(fault.message.as_str()));
    out.push_str("</string></value></member>");
    out.push_str("</struct></value></fault></methodResponse>");
    out
}

fn encode_value(out: &mut String, value: &Value) {
    out.push_str("<value>");
    match value {
        Value::Int(i) => {
            // i8 is the conventional extension tag for out-of-i32-range ints.
            if i32::try_from(*i).is_ok() {
                let _ = write!(out, "<int>{i}</int>");
            } else {
                let _ = write!(out, "<i8>{i}</i8>");
            }
        },
        Value::Bool(b) => {
            let _ = write!(out, "<boolean>{}</boolean>", if *b { 1 } else { 0 });
        },
        Value::String(s) => {
            out.push_str("<string>");
            out.push_str(&escape(s.as_str()));
            out.push_str("</string>");
        },
        Value::Double(d) => {
            let _ = write!(out, "<double>{d}</double>");
        },
        Value::DateTime(s) => {
            out.push_str("<dateTime.iso8601>");
            out.push_str(&escape(s.as_str()));
            out.push_str("</dateTime.iso8601>");
        },
        Value::Base64(s) => {
            out.push_str("<base64>");
            out.push_str(&escape(s.as_str()));
            out.push_str("</base64>");
        },
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                encode_value(out, item);
            }
            out.push_str("</data></array>");
        },
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                out.push_str("<member><name>");
                out.push_str(&escape(name.as_str()));
                out.push_str("</name>");
                encode_value(out, member);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        },
        Value::Nil => out.push_str("<nil/>"),
    }
    out.push_str("</value>");
}
