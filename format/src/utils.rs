use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    pub static ref ATOM: Regex = Regex::new(r"^[a-z][a-z-]*$").unwrap();
}

/// Quote `text` as a BBDB string. Only `"` and `\` are escaped; newlines
/// are emitted literally.
pub fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Inverse of [`quote`] for the body of a string token (without the
/// surrounding quotes).
pub fn unescape(body: &str) -> String {
    let mut text = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                text.push(escaped);
            }
        } else {
            text.push(c);
        }
    }
    text
}

/// True if `name` may be used as a user field name.
pub fn is_atom(name: &str) -> bool {
    ATOM.is_match(name) && name != "nil"
}
