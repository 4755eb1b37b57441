//! Server-generated text lines. Every line is newline terminated.

pub fn welcome(label: &str) -> String {
    format!("Welcome {}!\n", label)
}

pub fn joined(label: &str) -> String {
    format!("{} has joined the chat.\n", label)
}

pub fn chat(label: &str, text: &str) -> String {
    format!("{}: {}\n", label, text)
}

pub fn left(label: &str) -> String {
    format!("{} has left the chat.\n", label)
}

/// Strips trailing whitespace from a received line. `None` means there is
/// nothing worth broadcasting.
pub fn normalize(line: &str) -> Option<&str> {
    let line = line.trim_end();
    if line.is_empty() { None } else { Some(line) }
}

/// Client-side: a local line that ends the session instead of being sent.
pub fn is_quit(line: &str) -> bool {
    line.eq_ignore_ascii_case("quit")
}
