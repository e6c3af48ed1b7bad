use bytes::Bytes;

/// Print one received message, one line per frame.
pub fn print_message(parts: &[Bytes]) {
    if parts.len() == 1 {
        println!("{}", payload_preview(parts[0].as_ref()));
        return;
    }
    println!("message ({} frames)", parts.len());
    for (index, part) in parts.iter().enumerate() {
        println!("  [{index}] {}", payload_preview(part.as_ref()));
    }
}

pub fn payload_preview(payload: &[u8]) -> String {
    if payload.is_empty() {
        return "<signal>".to_string();
    }
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_text_binary_and_signal() {
        assert_eq!(payload_preview(b"hello"), "hello");
        assert_eq!(payload_preview(&[0xFF, 0x00]), "<binary 2 bytes>");
        assert_eq!(payload_preview(b""), "<signal>");
    }
}
