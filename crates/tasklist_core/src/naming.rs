/// Folds a user-typed name into a lookup key: ASCII words lowercased and
/// joined by `_`, so `High Priority`, `high-priority` and `HIGH_priority`
/// all become `high_priority`. `None` when no word is left.
pub fn canonical_key(raw: &str) -> Option<String> {
    let key = raw
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("_");

    (!key.is_empty()).then_some(key)
}
