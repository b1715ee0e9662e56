//! Member-name segmentation for flattening.
//!
//! `AddressCity` → `["Address", "City"]`, `HTTPServerPort` →
//! `["HTTP", "Server", "Port"]`, `billing_address` → `["billing", "address"]`.

use smallvec::SmallVec;

/// Words of a member name, split on camel/Pascal boundaries and `_`.
pub fn split_words(name: &str) -> SmallVec<[&str; 4]> {
    let mut words = SmallVec::new();
    let chars: Vec<(usize, char)> = name.char_indices().collect();
    let mut start: Option<usize> = None;

    for (i, &(pos, c)) in chars.iter().enumerate() {
        if c == '_' {
            if let Some(s) = start.take() {
                words.push(&name[s..pos]);
            }
            continue;
        }
        let Some(s) = start else {
            start = Some(pos);
            continue;
        };
        let prev = chars[i - 1].1;
        let next = chars.get(i + 1).map(|&(_, n)| n);
        let boundary = c.is_uppercase()
            && (prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next.is_some_and(char::is_lowercase)));
        if boundary {
            words.push(&name[s..pos]);
            start = Some(pos);
        }
    }
    if let Some(s) = start {
        words.push(&name[s..]);
    }
    words
}

/// Compare a member name against concatenated words, ignoring ASCII case
/// and underscores.
pub fn names_match(member: &str, words: &[&str]) -> bool {
    let mut lhs = member.chars().filter(|&c| c != '_');
    let mut rhs = words.iter().flat_map(|w| w.chars()).filter(|&c| c != '_');
    loop {
        match (lhs.next(), rhs.next()) {
            (None, None) => return true,
            (Some(a), Some(b)) if a.eq_ignore_ascii_case(&b) => {}
            _ => return false,
        }
    }
}
