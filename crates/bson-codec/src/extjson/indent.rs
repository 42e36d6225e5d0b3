/// Pretty-prints compact Extended JSON.
///
/// Each object member and array element starts on a new line beginning with
/// `prefix` followed by one copy of `indent` per nesting level. Empty
/// containers stay on one line. The output does not begin with `prefix`.
/// Whitespace outside strings is dropped; the text is not otherwise
/// validated.
pub fn indent_ext_json(text: &str, prefix: &str, indent: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    // An opening delimiter whose newline is deferred until we know the
    // container is not empty.
    let mut pending_open = false;

    let newline = |out: &mut String, depth: usize| {
        out.push('\n');
        out.push_str(prefix);
        for _ in 0..depth {
            out.push_str(indent);
        }
    };

    for c in text.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        if c.is_ascii_whitespace() {
            continue;
        }
        if pending_open {
            pending_open = false;
            if c != '}' && c != ']' {
                newline(&mut out, depth);
            } else {
                depth = depth.saturating_sub(1);
                out.push(c);
                continue;
            }
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '{' | '[' => {
                out.push(c);
                depth += 1;
                pending_open = true;
            }
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                newline(&mut out, depth);
                out.push(c);
            }
            ',' => {
                out.push(c);
                newline(&mut out, depth);
            }
            ':' => out.push_str(": "),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indents_nested_containers() {
        let text = r#"{"a":{"$numberInt":"1"},"b":[1,{}],"c":[]}"#;
        assert_eq!(
            indent_ext_json(text, "", "  "),
            "{\n  \"a\": {\n    \"$numberInt\": \"1\"\n  },\n  \"b\": [\n    1,\n    {}\n  ],\n  \"c\": []\n}"
        );
    }

    #[test]
    fn prefix_and_strings() {
        let text = r#"{"k":"a, {b}: \"c\""}"#;
        assert_eq!(
            indent_ext_json(text, ">", "\t"),
            "{\n>\t\"k\": \"a, {b}: \\\"c\\\"\"\n>}"
        );
    }
}
