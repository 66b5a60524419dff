//! TwiML answer documents.
//!
//! When a call connects (inbound, or outbound once answered), the provider
//! fetches TwiML telling it what to do. We always answer with a
//! `<Connect><Stream>` pointing back at our media WebSocket, carrying the
//! customer number as a stream parameter so the bridge can resolve the lead
//! without another provider round trip.

/// Escape the five XML-significant characters in attribute values.
fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Build the media-stream TwiML document.
///
/// `ws_url` is the public wss URL of the `/media` endpoint; `customer` is
/// the canonical phone number when known.
pub fn connect_stream(ws_url: &str, customer: Option<&str>) -> String {
    let parameter = match customer {
        Some(number) => format!(
            "\n      <Parameter name=\"customer\" value=\"{}\"/>",
            escape_xml(number)
        ),
        None => String::new(),
    };

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Response>
  <Connect>
    <Stream url="{url}">{parameter}
    </Stream>
  </Connect>
</Response>"#,
        url = escape_xml(ws_url),
        parameter = parameter,
    )
}
