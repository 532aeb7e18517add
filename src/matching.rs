/// True when one string is a non-empty prefix of the other.
///
/// The shorter string is compared against the equal-length head of the longer
/// one, so the relation is symmetric. Comparison is case-sensitive and an empty
/// string never matches anything, including another empty string.
pub fn matches_prefix(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }

    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    long.as_bytes().starts_with(short.as_bytes())
}
