//! Transliteration of Turkish letters for the base PDF fonts

/// ASCII stand-in for a Turkish letter the base fonts cannot draw.
fn ascii_for(c: char) -> Option<char> {
    let mapped = match c {
        'ğ' => 'g',
        'Ğ' => 'G',
        'ü' => 'u',
        'Ü' => 'U',
        'ş' => 's',
        'Ş' => 'S',
        'ı' => 'i',
        'İ' => 'I',
        'ö' => 'o',
        'Ö' => 'O',
        'ç' => 'c',
        'Ç' => 'C',
        _ => return None,
    };
    Some(mapped)
}

/// Replace Turkish diacritics with their ASCII letters, leaving everything
/// else untouched. Idempotent.
pub fn normalize_text(text: &str) -> String {
    text.chars().map(|c| ascii_for(c).unwrap_or(c)).collect()
}

/// [`normalize_text`] for optional fields, blank treated as absent.
pub fn normalize_opt(text: Option<&str>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty()).map(normalize_text)
}
