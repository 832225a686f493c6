//! Keep record content and secrets out of logs.

/// Longest body prefix that reaches the log.
const TRUNCATE_LIMIT: usize = 256;

fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Cut `s` to [`TRUNCATE_LIMIT`] bytes on a char boundary, noting the full length.
pub fn truncate_for_log(s: &str) -> String {
    if s.len() <= TRUNCATE_LIMIT {
        s.to_string()
    } else {
        format!(
            "{}... [truncated, total {} bytes]",
            &s[..floor_char_boundary(s, TRUNCATE_LIMIT)],
            s.len()
        )
    }
}

/// Show only the last four characters of an API key or token.
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("****{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_string_unchanged() {
        assert_eq!(truncate_for_log("v=spf1 -all"), "v=spf1 -all");
    }

    #[test]
    fn long_dkim_key_truncated() {
        let s = format!("v=DKIM1; k=rsa; p={}", "A".repeat(400));
        let result = truncate_for_log(&s);
        assert!(result.contains("[truncated, total"));
        assert!(result.len() < s.len());
    }

    #[test]
    fn multibyte_boundary_is_respected() {
        let s = "é".repeat(200);
        let result = truncate_for_log(&s);
        assert!(result.starts_with('é'));
        assert!(result.contains("[truncated, total 400 bytes]"));
    }

    #[test]
    fn mask_secret_keeps_tail() {
        assert_eq!(mask_secret("abcdefgh1234"), "****1234");
        assert_eq!(mask_secret("abc"), "***");
    }
}
