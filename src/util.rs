//! Small utility helpers used across modules.

/// Upper-case the first letter of every sentence.
/// A sentence starts at the beginning of the text and after each `.`, `!` or `?`.
pub fn capitalize_sentences(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  let mut at_start = true;
  for ch in text.chars() {
    if at_start && !ch.is_whitespace() {
      out.extend(ch.to_uppercase());
      at_start = false;
    } else {
      out.push(ch);
    }
    if matches!(ch, '.' | '!' | '?') {
      at_start = true;
    }
  }
  out
}

/// Singular/plural helper for short UI counters ("1 question", "3 questions").
pub fn plural(count: usize, noun: &str) -> String {
  if count == 1 { format!("{} {}", count, noun) } else { format!("{} {}s", count, noun) }
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge collaborator error bodies.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) { cut -= 1; }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}
