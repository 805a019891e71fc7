//! Base English modifiers (`#word.s#`, `#word.a#`, ...).
//!
//! Unknown modifiers leave the text unchanged and log a warning, so a typo in a
//! modifier name never stops a bot from posting.

fn is_vowel(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u')
}

fn is_alpha_num(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

fn second_to_last(s: &str) -> Option<char> {
    s.chars().rev().nth(1)
}

fn drop_last(s: &str) -> &str {
    s.char_indices().next_back().map_or(s, |(i, _)| &s[..i])
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn capitalize_all(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut cap_next = true;
    for c in s.chars() {
        if !is_alpha_num(c) {
            cap_next = true;
            out.push(c);
        } else if cap_next {
            out.extend(c.to_uppercase());
            cap_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn article(s: &str) -> String {
    let mut chars = s.chars();
    let first = chars.next();
    let third = chars.nth(1);
    if first == Some('u') && third == Some('i') {
        return format!("a {s}");
    }
    match first {
        Some(c) if is_vowel(c) => format!("an {s}"),
        _ => format!("a {s}"),
    }
}

fn plural(s: &str) -> String {
    match s.chars().last() {
        Some('s' | 'h' | 'x') => format!("{s}es"),
        Some('y') if !second_to_last(s).is_some_and(is_vowel) => format!("{}ies", drop_last(s)),
        _ => format!("{s}s"),
    }
}

fn past_tense(s: &str) -> String {
    match s.chars().last() {
        Some('e') => format!("{s}d"),
        Some('y') if !second_to_last(s).is_some_and(is_vowel) => format!("{}ied", drop_last(s)),
        _ => format!("{s}ed"),
    }
}

fn first_s(s: &str) -> String {
    match s.split_once(' ') {
        Some((first, rest)) => format!("{} {rest}", plural(first)),
        None => plural(s),
    }
}

/// Parse `name(arg1,arg2)` into the name and its arguments.
fn split_call(modifier: &str) -> (&str, Vec<&str>) {
    match modifier.split_once('(') {
        Some((name, args)) => {
            let args = args.strip_suffix(')').unwrap_or(args);
            (name, args.split(',').collect())
        }
        None => (modifier, Vec::new()),
    }
}

/// Apply one modifier to expanded text.
pub(crate) fn apply_modifier(modifier: &str, text: &str) -> String {
    let (name, args) = split_call(modifier.trim());
    match (name, args.as_slice()) {
        ("capitalize", _) => capitalize(text),
        ("capitalizeAll", _) => capitalize_all(text),
        ("a", _) => article(text),
        ("s", _) => plural(text),
        ("ed", _) => past_tense(text),
        ("firstS", _) => first_s(text),
        ("replace", [from, to]) => text.replace(from, to),
        _ => {
            tracing::warn!("Unknown grammar modifier '{}', leaving text unchanged", modifier);
            text.to_string()
        }
    }
}
