//! Positional message templates.
//!
//! Configured messages and handler URLs use `{0}`, `{1}`, ... placeholders. Literal
//! braces are written as `{{` and `}}`. Placeholders may carry an alignment or format
//! suffix (`{0,5}`, `{1:D}`); the suffix is accepted and ignored.

use std::fmt::Display;

/// Substitute positional placeholders in `template` with `args`.
///
/// Placeholders that reference a missing argument, and unbalanced braces, are kept
/// verbatim so a misconfigured template never fails a request.
pub fn format_positional(template: &str, args: &[&dyn Display]) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut chars = template.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        match c {
            '{' => {
                if matches!(chars.peek(), Some((_, '{'))) {
                    chars.next();
                    out.push('{');
                    continue;
                }
                let Some(close) = template[start..].find('}') else {
                    out.push_str(&template[start..]);
                    break;
                };
                let inner = &template[start + 1..start + close];
                let index_part = inner
                    .split(|ch| ch == ',' || ch == ':')
                    .next()
                    .unwrap_or_default()
                    .trim();
                match index_part.parse::<usize>().ok().and_then(|i| args.get(i)) {
                    Some(arg) => out.push_str(&arg.to_string()),
                    None => out.push_str(&template[start..=start + close]),
                }
                // Skip past the closing brace.
                while let Some((i, _)) = chars.peek() {
                    if *i > start + close {
                        break;
                    }
                    chars.next();
                }
            }
            '}' => {
                if matches!(chars.peek(), Some((_, '}'))) {
                    chars.next();
                }
                out.push('}');
            }
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitutes_in_any_order() {
        let s = format_positional("{1} of {0}", &[&"six", &"images"]);
        assert_eq!(s, "images of six");
    }

    #[test]
    fn test_repeated_placeholder() {
        assert_eq!(format_positional("{0}-{0}", &[&7]), "7-7");
    }

    #[test]
    fn test_escaped_braces() {
        assert_eq!(format_positional("{{0}} is {0}", &[&"x"]), "{0} is x");
    }

    #[test]
    fn test_missing_argument_kept_verbatim() {
        assert_eq!(format_positional("/{0}/{2}", &[&"proj"]), "/proj/{2}");
    }

    #[test]
    fn test_format_suffix_ignored() {
        assert_eq!(format_positional("id={1:D}", &[&"p", &42]), "id=42");
    }

    #[test]
    fn test_unterminated_brace() {
        assert_eq!(format_positional("abc{0", &[&1]), "abc{0");
    }
}
