use crate::exit::{CliError, CliResult};

/// Parse hex digits into bytes.
///
/// Whitespace, `:`, `-` and `,` separators and `0x` prefixes are ignored.
pub fn parse(text: &str) -> CliResult<Vec<u8>> {
    let mut bytes = Vec::with_capacity(text.len() / 2);
    for token in text.split(|c: char| c.is_whitespace() || matches!(c, ':' | '-' | ',')) {
        let token = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        let digits = token
            .chars()
            .map(|c| {
                c.to_digit(16)
                    .map(|d| d as u8)
                    .ok_or_else(|| CliError::usage(format!("invalid hex digit {c:?}")))
            })
            .collect::<CliResult<Vec<u8>>>()?;
        if digits.len() % 2 != 0 {
            return Err(CliError::usage(format!(
                "odd number of hex digits in {token:?}"
            )));
        }
        bytes.extend(digits.chunks_exact(2).map(|pair| (pair[0] << 4) | pair[1]));
    }
    Ok(bytes)
}

/// Lowercase hex, bytes separated by spaces.
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
