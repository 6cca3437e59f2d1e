//! Names derived from nouns and readings: schema keys, property names,
//! plurals and articles.

/// Schema/component key for a noun or fact-type name: spaces and hyphens
/// dropped, `&` spelled out.
pub fn schema_key(name: &str) -> String {
    name.chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect::<String>()
        .replace('&', "And")
}

pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lower-camel-case property name. All-caps names are lowercased whole;
/// otherwise the leading capital (or leading acronym) is lowercased, so
/// `PersonName` → `personName` and `APIProduct` → `apiProduct`.
pub fn property_name(name: &str) -> String {
    let key = schema_key(name);
    if key == key.to_uppercase() {
        return key.to_lowercase();
    }

    let chars: Vec<char> = key.chars().collect();
    let run = chars.iter().take_while(|c| c.is_uppercase()).count();
    let lowered = match run {
        0 | 1 => run,
        n if chars.get(n).is_some_and(|c| c.is_lowercase()) => n - 1,
        n => n,
    };

    let mut out = String::with_capacity(key.len());
    for (i, c) in chars.into_iter().enumerate() {
        if i < lowered {
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Property name from the object-side span of a tokenized reading.
///
/// The first token may be a multi-word noun name; its all-caps words are
/// title-cased (`API` → `Api`). Remaining tokens are capitalized and
/// appended.
pub fn extract_property_name<S: AsRef<str>>(object_reading: &[S]) -> String {
    let Some((first, rest)) = object_reading.split_first() else {
        return String::new();
    };

    let mut joined: String = first
        .as_ref()
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(|w| {
            if w == w.to_uppercase() {
                capitalize(&w.to_lowercase())
            } else {
                w.to_string()
            }
        })
        .collect();
    for token in rest {
        joined.push_str(&capitalize(token.as_ref()));
    }
    property_name(&joined)
}

/// Drops a redundant subject prefix: `personName` on `Person` → `name`.
/// The prefix must end on a word boundary (`personnel` stays).
pub fn strip_subject_prefix(property: &str, subject: &str) -> String {
    let compare: String = subject
        .chars()
        .filter(|c| *c != ' ')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if compare.is_empty() || property.len() <= compare.len() {
        return property.to_string();
    }
    if !property.is_char_boundary(compare.len()) {
        return property.to_string();
    }

    let (head, tail) = property.split_at(compare.len());
    let boundary = tail
        .chars()
        .next()
        .is_some_and(|c| c.to_uppercase().eq(std::iter::once(c)));
    if head.to_ascii_uppercase() == compare && boundary {
        property_name(tail)
    } else {
        property.to_string()
    }
}

// ============================================================================
// Plurals
// ============================================================================

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("woman", "women"),
    ("man", "men"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("tooth", "teeth"),
    ("foot", "feet"),
    ("criterion", "criteria"),
];

/// English plural of the last word of `word`, preserving its casing.
pub fn pluralize(word: &str) -> String {
    let lower = word.to_lowercase();
    for (singular, plural) in IRREGULAR {
        let Some(cut) = word.len().checked_sub(singular.len()) else {
            continue;
        };
        if !word.is_char_boundary(cut) || word[cut..].to_lowercase() != *singular {
            continue;
        }
        let (stem, segment) = word.split_at(cut);
        let at_boundary = stem.is_empty()
            || stem.ends_with(' ')
            || segment.chars().next().is_some_and(char::is_uppercase);
        if !at_boundary {
            continue;
        }
        let plural = if segment.chars().next().is_some_and(char::is_uppercase) {
            capitalize(plural)
        } else {
            plural.to_string()
        };
        return format!("{stem}{plural}");
    }

    if let Some(stem) = word.strip_suffix('y') {
        let before = stem.chars().last().map(|c| c.to_ascii_lowercase());
        if before.is_some_and(|c| !"aeiou".contains(c)) {
            return format!("{stem}ies");
        }
        return format!("{word}s");
    }
    if ["s", "x", "z", "sh", "ch"].iter().any(|s| lower.ends_with(s)) {
        return format!("{word}es");
    }
    format!("{word}s")
}

/// Display plural of a resource: the declared plural capitalized, else the
/// pluralized title.
pub fn resource_plural(declared: Option<&str>, title: &str) -> String {
    match declared.filter(|p| !p.is_empty()) {
        Some(plural) => capitalize(plural),
        None => pluralize(title),
    }
}

/// Indefinite article for `title`.
pub fn article(title: &str) -> &'static str {
    match title.chars().next().map(|c| c.to_ascii_uppercase()) {
        Some('A' | 'E' | 'I' | 'O' | 'U') => "an",
        _ => "a",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_keys() {
        assert_eq!(schema_key("Support Request"), "SupportRequest");
        assert_eq!(schema_key("Terms & Conditions"), "TermsAndConditions");
        assert_eq!(schema_key("e-mail Address"), "emailAddress");
    }

    #[test]
    fn property_names() {
        assert_eq!(property_name("PersonName"), "personName");
        assert_eq!(property_name("ID"), "id");
        assert_eq!(property_name("APIProduct"), "apiProduct");
        assert_eq!(property_name("firstName"), "firstName");
        assert_eq!(property_name("Order Number"), "orderNumber");
    }

    #[test]
    fn extracts_from_object_span() {
        assert_eq!(extract_property_name(&["First", "Name"]), "firstName");
        assert_eq!(extract_property_name(&["API"]), "api");
        assert_eq!(extract_property_name(&["is", "active"]), "isActive");
        assert_eq!(extract_property_name(&["Support Request"]), "supportRequest");
        assert_eq!(extract_property_name::<&str>(&[]), "");
    }

    #[test]
    fn strips_redundant_subject_prefix() {
        assert_eq!(strip_subject_prefix("personName", "Person"), "name");
        assert_eq!(strip_subject_prefix("personId", "Person"), "id");
        assert_eq!(strip_subject_prefix("orderNumber", "Order"), "number");
        assert_eq!(strip_subject_prefix("personnel", "Person"), "personnel");
        assert_eq!(strip_subject_prefix("person", "Person"), "person");
        assert_eq!(strip_subject_prefix("age", "Person"), "age");
    }

    #[test]
    fn plurals() {
        assert_eq!(pluralize("Person"), "People");
        assert_eq!(pluralize("SalesPerson"), "SalesPeople");
        assert_eq!(pluralize("Human"), "Humans");
        assert_eq!(pluralize("Order"), "Orders");
        assert_eq!(pluralize("Policy"), "Policies");
        assert_eq!(pluralize("Day"), "Days");
        assert_eq!(pluralize("Address"), "Addresses");
        assert_eq!(pluralize("Branch"), "Branches");
        assert_eq!(resource_plural(Some("staff"), "Staff"), "Staff");
        assert_eq!(resource_plural(None, "Support Request"), "Support Requests");
    }

    #[test]
    fn articles() {
        assert_eq!(article("Order"), "an");
        assert_eq!(article("Person"), "a");
        assert_eq!(article(""), "a");
    }
}
