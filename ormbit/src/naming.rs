use once_cell::sync::Lazy;
use std::collections::HashMap;

static IRREGULAR: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("person", "people"),
        ("man", "men"),
        ("woman", "women"),
        ("child", "children"),
        ("mouse", "mice"),
        ("goose", "geese"),
        ("foot", "feet"),
        ("tooth", "teeth"),
        ("datum", "data"),
        ("index", "indices"),
    ])
});

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

/// English plural of a lower-case word.
pub fn pluralize(word: &str) -> String {
    if let Some(plural) = IRREGULAR.get(word) {
        return plural.to_string();
    }
    if let Some(stem) = word.strip_suffix('y') {
        if stem.chars().last().is_some_and(|c| !is_vowel(c)) {
            return format!("{stem}ies");
        }
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|suffix| word.ends_with(suffix)) {
        return format!("{word}es");
    }
    format!("{word}s")
}

/// Default table name of a type: lower-cased, then pluralized.
pub fn table_name_for(type_name: &str) -> String {
    let short = type_name.rsplit("::").next().unwrap_or(type_name);
    pluralize(&short.to_lowercase())
}
