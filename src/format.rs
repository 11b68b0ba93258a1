//! Placeholder substitution for configuration templates
//!
//! Template strings in `config.toml` use `{name}` placeholders. A doubled
//! brace (`{{` or `}}`) produces a literal brace, which is how path
//! expressions spell Clark-notation namespaces: `.//{{{namespace}}}rect`.

use thiserror::Error;

/// Errors raised while parsing or expanding a template string
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("unknown placeholder '{{{name}}}' at offset {offset}")]
    UnknownPlaceholder { name: String, offset: usize },

    #[error("unterminated placeholder starting at offset {offset}")]
    Unterminated { offset: usize },

    #[error("single '}}' at offset {offset} (write '}}}}' for a literal brace)")]
    StrayBrace { offset: usize },

    #[error("format spec in placeholder '{{{name}}}' is not supported (offset {offset})")]
    FormatSpec { name: String, offset: usize },
}

#[derive(Debug, PartialEq)]
enum Piece<'a> {
    Literal(&'a str),
    Placeholder { name: &'a str, offset: usize },
}

fn pieces(template: &str) -> Result<Vec<Piece<'_>>, FormatError> {
    let bytes = template.as_bytes();
    let mut pieces = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                // keep one brace of the pair
                pieces.push(Piece::Literal(&template[literal_start..=i]));
                i += 2;
                literal_start = i;
            }
            b'{' => {
                if literal_start < i {
                    pieces.push(Piece::Literal(&template[literal_start..i]));
                }
                let rest = &template[i + 1..];
                let close = rest
                    .find(['{', '}'])
                    .filter(|&rel| rest.as_bytes()[rel] == b'}')
                    .ok_or(FormatError::Unterminated { offset: i })?;
                let name = &rest[..close];
                if name.contains([':', '!']) {
                    return Err(FormatError::FormatSpec {
                        name: name.to_string(),
                        offset: i,
                    });
                }
                pieces.push(Piece::Placeholder { name, offset: i });
                i += close + 2;
                literal_start = i;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                pieces.push(Piece::Literal(&template[literal_start..=i]));
                i += 2;
                literal_start = i;
            }
            b'}' => return Err(FormatError::StrayBrace { offset: i }),
            _ => i += 1,
        }
    }

    if literal_start < template.len() {
        pieces.push(Piece::Literal(&template[literal_start..]));
    }
    Ok(pieces)
}

/// Expand `template`, looking placeholder names up in `values`
///
/// # Example
///
/// ```rust
/// use svg_colorways::format::format;
///
/// let style = format("fill:{color_value}", &[("color_value", "#ff0000")]).unwrap();
/// assert_eq!(style, "fill:#ff0000");
/// ```
pub fn format(template: &str, values: &[(&str, &str)]) -> Result<String, FormatError> {
    let mut out = String::with_capacity(template.len());
    for piece in pieces(template)? {
        match piece {
            Piece::Literal(text) => out.push_str(text),
            Piece::Placeholder { name, offset } => {
                let value = values
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| *value)
                    .ok_or_else(|| FormatError::UnknownPlaceholder {
                        name: name.to_string(),
                        offset,
                    })?;
                out.push_str(value);
            }
        }
    }
    Ok(out)
}

/// Check that `template` is well formed and only uses names from `allowed`
pub fn check(template: &str, allowed: &[&str]) -> Result<(), FormatError> {
    for piece in pieces(template)? {
        if let Piece::Placeholder { name, offset } = piece {
            if !allowed.contains(&name) {
                return Err(FormatError::UnknownPlaceholder {
                    name: name.to_string(),
                    offset,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitutes_named_placeholder() {
        let out = format("{color_key}_bg", &[("color_key", "red")]).unwrap();
        assert_eq!(out, "red_bg");
    }

    #[test]
    fn test_escaped_braces_around_placeholder() {
        let out = format(
            ".//{{{namespace}}}rect",
            &[("namespace", "http://www.w3.org/2000/svg")],
        )
        .unwrap();
        assert_eq!(out, ".//{http://www.w3.org/2000/svg}rect");
    }

    #[test]
    fn test_literal_only() {
        assert_eq!(format("fill:none", &[]).unwrap(), "fill:none");
        assert_eq!(format("", &[]).unwrap(), "");
        assert_eq!(format("{{}}", &[]).unwrap(), "{}");
    }

    #[test]
    fn test_repeated_placeholder() {
        let out = format(
            "fill:{color_value};stroke:{color_value}",
            &[("color_value", "#000")],
        )
        .unwrap();
        assert_eq!(out, "fill:#000;stroke:#000");
    }

    #[test]
    fn test_unknown_placeholder() {
        let err = format("x{nope}", &[("color_key", "red")]).unwrap_err();
        assert_eq!(
            err,
            FormatError::UnknownPlaceholder {
                name: "nope".to_string(),
                offset: 1
            }
        );
    }

    #[test]
    fn test_unterminated_placeholder() {
        assert_eq!(
            format("abc{color", &[]).unwrap_err(),
            FormatError::Unterminated { offset: 3 }
        );
        assert_eq!(
            format("{a{b}", &[]).unwrap_err(),
            FormatError::Unterminated { offset: 0 }
        );
    }

    #[test]
    fn test_stray_closing_brace() {
        assert_eq!(
            format("a}b", &[]).unwrap_err(),
            FormatError::StrayBrace { offset: 1 }
        );
    }

    #[test]
    fn test_format_spec_rejected() {
        let err = format("{color_key:>8}", &[("color_key", "red")]).unwrap_err();
        assert!(matches!(err, FormatError::FormatSpec { .. }));
    }

    #[test]
    fn test_check_allowed_names() {
        assert!(check("fill:{color_value}", &["color_value"]).is_ok());
        assert!(check("fill:{color_key}", &["color_value"]).is_err());
        assert!(check("no placeholders", &[]).is_ok());
    }
}
