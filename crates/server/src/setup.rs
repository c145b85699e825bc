//! Call-setup response document
//!
//! On call initiation the telephony provider is handed a markup document
//! telling it to speak a short greeting and open a media stream to the
//! bridge, carrying the call identifier as a parameter. The document is
//! validated well-formed before use; a truncated document would strand the
//! call with no stream.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::fmt::Write;

use crate::ServerError;

/// Build the call-setup document for one call.
pub fn call_setup_document(greeting: &str, stream_url: &str, call_id: &str) -> String {
    let mut doc = String::with_capacity(256);
    doc.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    doc.push_str("<Response>");
    let _ = write!(doc, "<Say>{}</Say>", xml_escape(greeting));
    let _ = write!(doc, "<Connect><Stream url=\"{}\">", xml_escape(stream_url));
    let _ = write!(
        doc,
        "<Parameter name=\"call_id\" value=\"{}\"/>",
        xml_escape(call_id)
    );
    doc.push_str("</Stream></Connect>");
    doc.push_str("</Response>");
    doc
}

/// Validate that a document is well-formed: parseable, with a single root
/// element that is opened and closed.
pub fn validate_document(xml: &str) -> Result<(), ServerError> {
    let mut reader = Reader::from_str(xml);
    let mut depth: i64 = 0;
    let mut saw_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => {
                depth += 1;
                saw_root = true;
            }
            Ok(Event::End(_)) => {
                depth -= 1;
                if depth < 0 {
                    return Err(ServerError::InvalidDocument(
                        "unbalanced closing tag".to_string(),
                    ));
                }
            }
            Ok(Event::Empty(_)) => {
                saw_root = true;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ServerError::InvalidDocument(e.to_string()));
            }
        }
    }

    if !saw_root {
        return Err(ServerError::InvalidDocument("no root element".to_string()));
    }
    if depth != 0 {
        return Err(ServerError::InvalidDocument(
            "root element not closed".to_string(),
        ));
    }
    Ok(())
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_built_document_is_well_formed() {
        let doc = call_setup_document(
            "Please hold while we connect you.",
            "wss://bridge.example.com/media-stream",
            "CA123",
        );
        validate_document(&doc).unwrap();
        assert!(doc.contains("<Say>Please hold while we connect you.</Say>"));
        assert!(doc.contains("call_id"));
        assert!(doc.contains("CA123"));
    }

    #[test]
    fn test_greeting_is_escaped() {
        let doc = call_setup_document("Hold <please> & wait", "wss://x", "CA1");
        validate_document(&doc).unwrap();
        assert!(doc.contains("Hold &lt;please&gt; &amp; wait"));
    }

    #[test]
    fn test_truncated_document_rejected() {
        let doc = call_setup_document("hi", "wss://x", "CA1");
        let truncated = &doc[..doc.len() - "</Response>".len()];
        assert!(validate_document(truncated).is_err());
    }

    #[test]
    fn test_empty_document_rejected() {
        assert!(validate_document("").is_err());
        assert!(validate_document("just text").is_err());
    }

    #[test]
    fn test_unbalanced_close_rejected() {
        assert!(validate_document("<Response></Response></Extra>").is_err());
    }
}
