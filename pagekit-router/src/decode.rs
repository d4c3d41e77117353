use percent_encoding::percent_decode_str;

/// Characters `decodeURI` leaves escaped.
const RESERVED: &[u8] = b";/?:@&=+$,#";

/// Decodes every escape sequence, like `decodeURIComponent`.
pub(crate) fn decode_component(input: &str) -> String {
    percent_decode_str(input).decode_utf8_lossy().into_owned()
}

/// Decodes escape sequences except those of reserved characters, like
/// `decodeURI`.
pub(crate) fn decode_uri(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%'
            && let Some(byte) = hex_byte(bytes.get(index + 1..index + 3))
        {
            if RESERVED.contains(&byte) {
                decoded.extend_from_slice(&bytes[index..index + 3]);
            } else {
                decoded.push(byte);
            }
            index += 3;
            continue;
        }
        decoded.push(bytes[index]);
        index += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex_byte(digits: Option<&[u8]>) -> Option<u8> {
    let digits = digits?;
    if !digits.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    let digits = std::str::from_utf8(digits).ok()?;
    u8::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_component() {
        assert_eq!(decode_component("a%20b%2Fc+d"), "a b/c+d");
        assert_eq!(decode_component("caf%C3%A9"), "café");
    }

    #[test]
    fn test_decode_uri_keeps_reserved_escapes() {
        assert_eq!(decode_uri("/a%20b/c%2Fd?x=%26"), "/a b/c%2Fd?x=%26");
        assert_eq!(decode_uri("/caf%C3%A9"), "/café");
        assert_eq!(decode_uri("/100%"), "/100%");
        assert_eq!(decode_uri("/%zz"), "/%zz");
    }
}
