// src/text.rs

pub fn clean_html_entities(text: &str) -> String {
    let mut cleaned = text.to_string();
    // Try decoding multiple times in case of double-encoding
    for _ in 0..2 {
        let decoded = html_escape::decode_html_entities(&cleaned).into_owned();
        if decoded == cleaned {
            break;
        }
        cleaned = decoded;
    }

    // Handle any remaining common entities manually
    cleaned
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_double_encoded_entities() {
        assert_eq!(clean_html_entities("it&amp;#39;s here"), "it's here");
        assert_eq!(clean_html_entities("a &lt; b &amp; c"), "a < b & c");
        assert_eq!(clean_html_entities("plain text"), "plain text");
    }
}
