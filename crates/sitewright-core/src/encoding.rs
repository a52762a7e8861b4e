//! Character set handling for source documents and rendered output.

use encoding_rs::{Encoding, UTF_8};

use crate::{
    error::{CoreError, Result},
    module::ContentType,
};

/// Resolve an encoding label such as `UTF-8` or `ISO-8859-1`.
pub fn lookup(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| CoreError::Encoding(label.to_string()))
}

/// Encoding declared by an XML document: byte order mark first, then the
/// `encoding` pseudo-attribute of the prolog, then UTF-8.
pub fn detect_xml_encoding(bytes: &[u8]) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }

    let head = &bytes[..bytes.len().min(1024)];
    let head = String::from_utf8_lossy(head);
    let Some(prolog) = head
        .strip_prefix("<?xml")
        .and_then(|rest| rest.split("?>").next())
    else {
        return UTF_8;
    };

    prolog
        .find("encoding")
        .and_then(|pos| {
            let rest = prolog[pos + "encoding".len()..].trim_start();
            let rest = rest.strip_prefix('=')?.trim_start();
            let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
            let value = &rest[1..];
            let end = value.find(quote)?;
            Encoding::for_label(value[..end].as_bytes())
        })
        .unwrap_or(UTF_8)
}

/// Decode a source document the way its dialect expects.
///
/// Structured markup describes its own encoding; everything else is read
/// with the configured input encoding. A byte order mark always wins.
pub fn decode_source(bytes: &[u8], content_type: ContentType, input_encoding: &str) -> Result<String> {
    let encoding = match content_type {
        ContentType::StructuredMarkup => detect_xml_encoding(bytes),
        ContentType::PlainText | ContentType::Unknown => lookup(input_encoding)?,
    };
    let (text, _, _) = encoding.decode(bytes);
    Ok(text.into_owned())
}

/// Encode rendered text with the configured output encoding.
pub fn encode_output(text: &str, output_encoding: &str) -> Result<Vec<u8>> {
    let encoding = lookup(output_encoding)?;
    let (bytes, _, _) = encoding.encode(text);
    Ok(bytes.into_owned())
}
