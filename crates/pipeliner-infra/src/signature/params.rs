//! Parsing of the `Signature` parameter list.
//!
//! Format (draft-cavage HTTP signatures):
//!
//! ```text
//! keyId="woodpecker-ci-plugins",algorithm="ed25519",headers="(request-target) date",signature="<base64>"
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use super::AuthError;

/// Covered header list used when a signature does not name one.
const DEFAULT_COVERED_HEADERS: &[&str] = &["date"];

/// Parsed signature parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureParams {
    pub key_id: String,
    pub algorithm: String,
    /// Covered header names, lowercased, in signing order.
    pub headers: Vec<String>,
    /// Raw signature bytes.
    pub signature: Vec<u8>,
}

impl SignatureParams {
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        let mut key_id = None;
        let mut algorithm = None;
        let mut headers = None;
        let mut signature = None;

        for (name, value) in parse_pairs(raw)? {
            match name.as_str() {
                "keyId" => key_id = Some(value),
                "algorithm" => algorithm = Some(value),
                "headers" => headers = Some(value),
                "signature" => signature = Some(value),
                // created, expires and unknown extensions are not used.
                _ => {}
            }
        }

        let key_id = key_id
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AuthError::MalformedSignature("keyId is required".to_string()))?;
        let algorithm = algorithm
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AuthError::MalformedSignature("algorithm is required".to_string()))?;
        let signature = signature
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AuthError::MalformedSignature("signature is required".to_string()))?;
        let signature = STANDARD
            .decode(signature.as_bytes())
            .map_err(|e| AuthError::MalformedSignature(format!("signature is not base64: {e}")))?;

        let mut headers: Vec<String> = headers
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_ascii_lowercase)
            .collect();
        if headers.is_empty() {
            headers = DEFAULT_COVERED_HEADERS.iter().map(|h| h.to_string()).collect();
        }

        Ok(Self {
            key_id,
            algorithm: algorithm.to_ascii_lowercase(),
            headers,
            signature,
        })
    }
}

/// Split `name="value",name2="value2"` into pairs.
///
/// Values may be quoted (with `\` escapes) or bare tokens.
fn parse_pairs(raw: &str) -> Result<Vec<(String, String)>, AuthError> {
    let mut pairs = Vec::new();
    let mut chars = raw.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace() || *c == ',') {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' {
                break;
            }
            name.push(c);
            chars.next();
        }
        if chars.next() != Some('=') {
            return Err(AuthError::MalformedSignature(format!(
                "parameter '{}' has no value",
                name.trim()
            )));
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => {
                        closed = true;
                        break;
                    }
                    _ => value.push(c),
                }
            }
            if !closed {
                return Err(AuthError::MalformedSignature(format!(
                    "unterminated value for '{}'",
                    name.trim()
                )));
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c == ',' {
                    break;
                }
                value.push(c);
                chars.next();
            }
            value = value.trim().to_string();
        }

        pairs.push((name.trim().to_string(), value));
    }

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_woodpecker_style_header() {
        let raw = r#"keyId="woodpecker-ci-plugins",algorithm="ed25519",headers="(request-target) date",signature="AAEC""#;
        let params = SignatureParams::parse(raw).unwrap();
        assert_eq!(params.key_id, "woodpecker-ci-plugins");
        assert_eq!(params.algorithm, "ed25519");
        assert_eq!(params.headers, vec!["(request-target)", "date"]);
        assert_eq!(params.signature, vec![0, 1, 2]);
    }

    #[test]
    fn test_parse_tolerates_spaces_and_unknown_params() {
        let raw = r#"keyId="k", created=1700000000, algorithm="hs2019", headers="Date", signature="AAEC""#;
        let params = SignatureParams::parse(raw).unwrap();
        assert_eq!(params.key_id, "k");
        assert_eq!(params.algorithm, "hs2019");
        assert_eq!(params.headers, vec!["date"]);
    }

    #[test]
    fn test_parse_defaults_headers_to_date() {
        let raw = r#"keyId="k",algorithm="ed25519",signature="AAEC""#;
        let params = SignatureParams::parse(raw).unwrap();
        assert_eq!(params.headers, vec!["date"]);
    }

    #[test]
    fn test_parse_handles_escaped_quotes() {
        let raw = r#"keyId="a\"b",algorithm="ed25519",signature="AAEC""#;
        let params = SignatureParams::parse(raw).unwrap();
        assert_eq!(params.key_id, "a\"b");
    }

    #[test]
    fn test_parse_requires_key_id() {
        let raw = r#"algorithm="ed25519",signature="AAEC""#;
        assert!(SignatureParams::parse(raw).is_err());
    }

    #[test]
    fn test_parse_requires_algorithm() {
        let raw = r#"keyId="k",signature="AAEC""#;
        assert!(SignatureParams::parse(raw).is_err());
    }

    #[test]
    fn test_parse_requires_signature() {
        let raw = r#"keyId="k",algorithm="ed25519""#;
        assert!(SignatureParams::parse(raw).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_base64() {
        let raw = r#"keyId="k",algorithm="ed25519",signature="!!!""#;
        assert!(SignatureParams::parse(raw).is_err());
    }

    #[test]
    fn test_parse_rejects_unterminated_value() {
        let raw = r#"keyId="k,algorithm="ed25519""#;
        assert!(SignatureParams::parse(raw).is_err());
    }

    #[test]
    fn test_parse_rejects_missing_equals() {
        assert!(SignatureParams::parse("garbage").is_err());
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(SignatureParams::parse("").is_err());
    }
}
