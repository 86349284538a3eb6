//! Word inflection for XML element naming.

const UNCOUNTABLE: &[&str] = &[
    "money",
    "rice",
    "series",
    "fish",
    "species",
    "information",
    "meta",
    "equipment",
];

// Ordered, most specific first. The first matching suffix wins.
const SINGULAR_RULES: &[(&str, &str)] = &[
    ("matrices", "matrix"),
    ("vertices", "vertex"),
    ("indices", "index"),
    ("oxen", "ox"),
    ("aliases", "alias"),
    ("statuses", "status"),
    ("viruses", "virus"),
    ("octopi", "octopus"),
    ("analyses", "analysis"),
    ("bases", "basis"),
    ("diagnoses", "diagnosis"),
    ("parentheses", "parenthesis"),
    ("prognoses", "prognosis"),
    ("synopses", "synopsis"),
    ("theses", "thesis"),
    ("crises", "crisis"),
    ("axes", "axis"),
    ("testes", "testis"),
    ("shoes", "shoe"),
    ("oes", "o"),
    ("buses", "bus"),
    ("campuses", "campus"),
    ("mice", "mouse"),
    ("lice", "louse"),
    ("children", "child"),
    ("people", "person"),
    ("men", "man"),
    ("movies", "movie"),
    ("xes", "x"),
    ("ches", "ch"),
    ("sses", "ss"),
    ("shes", "sh"),
    ("ies", "y"),
    ("lves", "lf"),
    ("rves", "rf"),
    ("tives", "tive"),
    ("hives", "hive"),
    ("ves", "fe"),
    ("ta", "tum"),
    ("ia", "ium"),
    ("news", "news"),
];

/// The singular form of a word, used to name the items of an encoded list
/// (`users` becomes `user` elements).
pub fn singular_of(word: &str) -> String {
    if !word.is_ascii() {
        return word.to_string();
    }
    let lower = word.to_lowercase();
    if UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    for (suffix, replacement) in SINGULAR_RULES {
        if lower.ends_with(suffix) {
            let stem = word.len() - suffix.len();
            return format!("{}{}", &word[..stem], replacement);
        }
    }
    // Generic trailing `s`, except after a double `s` or `us`.
    if lower.ends_with('s') && !lower.ends_with("ss") && !lower.ends_with("us") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}
