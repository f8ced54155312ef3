pub mod writer;

const ELLIPSIS: &str = "...";

/// Shortens `text` to at most `max` characters, marking the cut with an
/// ellipsis when there is room for one. A `max` of `0` disables truncation.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if max == 0 || text.chars().count() <= max {
        return text.to_string();
    }
    if max <= ELLIPSIS.len() {
        return text.chars().take(max).collect();
    }
    let mut shortened: String = text.chars().take(max - ELLIPSIS.len()).collect();
    shortened.push_str(ELLIPSIS);
    shortened
}

/// Strips module paths from a type name, `alloc::vec::Vec<u8>` becomes
/// `Vec<u8>`.
pub(crate) fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let mut short = String::with_capacity(full.len());
    let mut segment = String::new();
    for ch in full.chars() {
        match ch {
            ':' => segment.clear(),
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | ';' | '&' => {
                short.push_str(&segment);
                segment.clear();
                short.push(ch);
            }
            _ => segment.push(ch),
        }
    }
    short.push_str(&segment);
    short
}
