//! Form decoding module
//!
//! Reads `application/x-www-form-urlencoded` fields as raw bytes, body
//! before query. Values are not required to be UTF-8.

use percent_encoding::percent_decode;

/// How a request body is encoded, judged from its `Content-Type`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEncoding {
    UrlEncoded,
    Multipart,
    /// Missing or any other type; the body carries no form fields
    Other,
}

pub fn form_encoding(content_type: Option<&str>) -> FormEncoding {
    let Some(content_type) = content_type else {
        return FormEncoding::Other;
    };
    let media_type = content_type.split(';').next().unwrap_or("").trim();
    if media_type.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
        FormEncoding::UrlEncoded
    } else if media_type.eq_ignore_ascii_case("multipart/form-data") {
        FormEncoding::Multipart
    } else {
        FormEncoding::Other
    }
}

/// Return the first value for `key`
///
/// `body` must already be known to be urlencoded; pass an empty slice
/// otherwise. The body wins over the query string.
pub fn form_value(body: &[u8], query: Option<&str>, key: &str) -> Option<Vec<u8>> {
    find_field(body, key.as_bytes())
        .or_else(|| query.and_then(|q| find_field(q.as_bytes(), key.as_bytes())))
}

fn find_field(encoded: &[u8], key: &[u8]) -> Option<Vec<u8>> {
    encoded
        .split(|&b| b == b'&')
        .filter(|pair| !pair.is_empty())
        .find_map(|pair| {
            let (name, value) = match pair.iter().position(|&b| b == b'=') {
                Some(eq) => (&pair[..eq], &pair[eq + 1..]),
                None => (pair, &[][..]),
            };
            (decode_component(name) == key).then(|| decode_component(value))
        })
}

/// `+` is a space, then percent-decode byte for byte
fn decode_component(raw: &[u8]) -> Vec<u8> {
    let spaced: Vec<u8> = raw
        .iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect();
    percent_decode(&spaced).collect()
}
