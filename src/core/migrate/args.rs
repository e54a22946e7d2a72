//! Bracket-aware argument splitting.
//!
//! Call-site arguments are carried through as raw expression text, so the
//! only parsing needed is finding top-level commas and the end of a call.
//! Both respect `()`, `[]`, `{}` nesting and quoted string literals, where a
//! backslash escapes the next character.

/// Split an argument list into trimmed top-level expressions.
///
/// Empty or whitespace-only input yields no arguments. A single trailing
/// comma (`a, b,`) does not produce an extra empty argument.
pub fn split_arguments(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut parts = Vec::new();
    let mut depth: usize = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(text[start..i].trim().to_string());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }

    let last = text[start..].trim();
    if !last.is_empty() || parts.is_empty() {
        parts.push(last.to_string());
    } else if parts.len() == 1 && parts[0].is_empty() {
        // A lone `,` is only a trailing comma.
        parts.clear();
    }

    parts
}

/// Find the byte index of the `)` closing the `(` at `open`.
///
/// The call must close on the same line. Returns `None` when it does not,
/// when a closer does not match its opener, or when `open` is not a `(`.
pub fn find_call_end(text: &str, open: usize) -> Option<usize> {
    if text.as_bytes().get(open) != Some(&b'(') {
        return None;
    }

    let mut stack: Vec<char> = vec![')'];
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, c) in text[open + 1..].char_indices() {
        if c == '\n' {
            return None;
        }

        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => quote = Some(c),
            '(' => stack.push(')'),
            '[' => stack.push(']'),
            '{' => stack.push('}'),
            ')' | ']' | '}' => {
                if stack.pop() != Some(c) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(open + 1 + offset);
                }
            }
            _ => {}
        }
    }

    None
}

/// If `expr` is a single quoted string literal, return its contents.
pub fn string_literal_value(expr: &str) -> Option<&str> {
    let quote = expr.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    if expr.len() < 2 || !expr.ends_with(quote) {
        return None;
    }
    let inner = &expr[1..expr.len() - 1];
    if inner.contains(quote) || inner.contains('\\') {
        return None;
    }
    Some(inner)
}

/// If `expr` is a single bracketed list `[...]`, return its inner text.
pub fn list_literal_inner(expr: &str) -> Option<&str> {
    if !expr.starts_with('[') || !expr.ends_with(']') {
        return None;
    }
    // The opening bracket must close at the very end, not earlier (`[a] + [b]`).
    let wrapped = format!("({})", &expr[1..expr.len() - 1]);
    if find_call_end(&wrapped, 0) != Some(wrapped.len() - 1) {
        return None;
    }
    Some(&expr[1..expr.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_top_level_commas_only() {
        assert_eq!(split_arguments("a, [b, c], d"), vec!["a", "[b, c]", "d"]);
        assert_eq!(split_arguments("f(x, y), z"), vec!["f(x, y)", "z"]);
        assert_eq!(split_arguments("{\"k\": 1, \"j\": 2}, 3"), vec!["{\"k\": 1, \"j\": 2}", "3"]);
    }

    #[test]
    fn empty_input_yields_no_arguments() {
        assert!(split_arguments("").is_empty());
        assert!(split_arguments("   ").is_empty());
    }

    #[test]
    fn commas_inside_strings_do_not_split() {
        assert_eq!(split_arguments("\"a, b\", 'c, d'"), vec!["\"a, b\"", "'c, d'"]);
        assert_eq!(split_arguments("\"it's, fine\", x"), vec!["\"it's, fine\"", "x"]);
    }

    #[test]
    fn escaped_quotes_stay_inside_string() {
        assert_eq!(
            split_arguments(r#""say \"hi, there\"", 2"#),
            vec![r#""say \"hi, there\"""#, "2"]
        );
    }

    #[test]
    fn deep_nesting_is_respected() {
        assert_eq!(
            split_arguments("f(g([1, {a: (2, 3)}]), h), [[x, y], z]"),
            vec!["f(g([1, {a: (2, 3)}]), h)", "[[x, y], z]"]
        );
    }

    #[test]
    fn internal_whitespace_is_preserved() {
        assert_eq!(split_arguments("  a  +  b ,c"), vec!["a  +  b", "c"]);
    }

    #[test]
    fn trailing_comma_is_dropped() {
        assert_eq!(split_arguments("1, 2,"), vec!["1", "2"]);
        assert_eq!(split_arguments("1, , 2"), vec!["1", "", "2"]);
        assert!(split_arguments(",").is_empty());
        assert!(split_arguments(" , ").is_empty());
        assert_eq!(split_arguments("1,,"), vec!["1", ""]);
    }

    #[test]
    fn call_end_respects_nesting_and_strings() {
        let text = "emit(\"a)\", [b, (c)]) + 1";
        assert_eq!(find_call_end(text, 4), Some(19));
        assert_eq!(&text[4..=19], "(\"a)\", [b, (c)])");
    }

    #[test]
    fn call_end_requires_same_line_and_balance() {
        assert_eq!(find_call_end("emit(a,\n b)", 4), None);
        assert_eq!(find_call_end("emit(a]", 4), None);
        assert_eq!(find_call_end("emit(a", 4), None);
        assert_eq!(find_call_end("emit a", 4), None);
    }

    #[test]
    fn string_literal_value_accepts_plain_literals() {
        assert_eq!(string_literal_value("\"game_started\""), Some("game_started"));
        assert_eq!(string_literal_value("'game_started'"), Some("game_started"));
        assert_eq!(string_literal_value("event_name"), None);
        assert_eq!(string_literal_value("\"a\" + b"), None);
        assert_eq!(string_literal_value("\""), None);
        assert_eq!(string_literal_value("\"mixed'"), None);
    }

    #[test]
    fn list_literal_inner_requires_single_list() {
        assert_eq!(list_literal_inner("[1, [2, 3]]"), Some("1, [2, 3]"));
        assert_eq!(list_literal_inner("[]"), Some(""));
        assert_eq!(list_literal_inner("[a] + [b]"), None);
        assert_eq!(list_literal_inner("args"), None);
    }
}
