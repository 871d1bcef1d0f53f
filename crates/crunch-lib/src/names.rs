//! Studio name normalization
//!
//! External databases spell studio names inconsistently ("Bioware" vs
//! "BioWare Corp." vs "Bioware Studios"), so lookups walk an ordered list of
//! candidate spellings.

/// Legal entity suffixes stripped from company names
const COMPANY_SUFFIXES: &[&str] = &[
    "lp", "llp", "lllp", "llc", "lc", "ltd", "co", "pllc", "corp", "pc", "cic", "plc", "cyf",
    "ccc", "inc", "ent", "coop", "gp",
];

/// Words studios commonly append to or drop from their names
const STUDIO_WORDS: &[&str] = &["Games", "Studios", "Studio"];

/// Remove a trailing legal entity suffix such as "Inc." or ", LLC"
pub fn strip_company_suffix(name: &str) -> String {
    let name = name.trim();
    let Some(split) = name.rfind(' ') else {
        return name.to_string();
    };

    let suffix: String = name[split + 1..]
        .chars()
        .filter(|c| *c != '.' && *c != ',')
        .collect::<String>()
        .to_lowercase();

    if COMPANY_SUFFIXES.contains(&suffix.as_str()) {
        name[..split].trim_end_matches(',').trim().to_string()
    } else {
        name.to_string()
    }
}

/// Ordered candidate spellings for a studio, the name itself first
pub fn alias_candidates(name: &str) -> Vec<String> {
    let name = name.trim();
    let mut candidates = vec![name.to_string()];

    for word in STUDIO_WORDS {
        let candidate = if ends_with_ignore_case(name, word) {
            name[..name.len() - word.len()].trim().to_string()
        } else {
            format!("{} {}", name, word)
        };
        push_unique(&mut candidates, candidate);
    }

    let stripped = strip_company_suffix(name);
    push_unique(&mut candidates, stripped);

    candidates
}

fn ends_with_ignore_case(name: &str, word: &str) -> bool {
    name.len() >= word.len()
        && name.is_char_boundary(name.len() - word.len())
        && name[name.len() - word.len()..].eq_ignore_ascii_case(word)
}

fn push_unique(candidates: &mut Vec<String>, candidate: String) {
    if !candidate.is_empty() && !candidates.iter().any(|c| c.eq_ignore_ascii_case(&candidate)) {
        candidates.push(candidate);
    }
}
