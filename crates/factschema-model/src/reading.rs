//! Predicate tokenizer.
//!
//! A reading such as `"Person has first- Name"` is split on the known noun
//! names (longest first, so `SupportRequest` wins over `Support`). Noun spans
//! become single tokens kept verbatim, including a trailing binding hyphen.
//! Everything else is lowercased, split on whitespace, and hyphenated word
//! continuations are joined (`word-continuation` → `wordContinuation`).

use regex::Regex;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub noun: bool,
}

impl Token {
    pub fn noun(text: impl Into<String>) -> Self {
        Token {
            text: text.into(),
            noun: true,
        }
    }

    pub fn word(text: impl Into<String>) -> Self {
        Token {
            text: text.into(),
            noun: false,
        }
    }

    /// `true` when the token carries a trailing hyphen binding it to the
    /// adjacent noun (`first- Name`).
    pub fn is_bound(&self) -> bool {
        self.text.ends_with('-')
    }

    /// The token without its binding hyphen.
    pub fn bare(&self) -> &str {
        self.text.strip_suffix('-').unwrap_or(&self.text)
    }

    /// Whether this token names `noun`, with or without a binding hyphen.
    pub fn names(&self, noun: &str) -> bool {
        self.noun && self.bare() == noun
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A tokenized reading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate(pub Vec<Token>);

impl Predicate {
    pub fn tokens(&self) -> &[Token] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Index of the first noun token naming `noun`.
    pub fn position_of(&self, noun: &str) -> Option<usize> {
        self.0.iter().position(|t| t.names(noun))
    }

    /// Noun tokens in reading order, without binding hyphens.
    pub fn nouns(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().filter(|t| t.noun).map(|t| t.bare())
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{token}")?;
        }
        Ok(())
    }
}

/// Compiled alternation over a fixed set of noun names.
#[derive(Debug, Clone)]
pub struct NounPattern {
    names: Vec<String>,
    regex: Option<Regex>,
}

impl NounPattern {
    pub fn new<I, S>(names: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = names
            .into_iter()
            .map(|n| n.as_ref().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        names.dedup();

        let regex = if names.is_empty() {
            None
        } else {
            let alternation = names
                .iter()
                .map(|n| format!(r"\b{}\b-?", regex::escape(n)))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&format!("(?:{alternation})"))?)
        };

        Ok(NounPattern { names, regex })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn tokenize(&self, reading: &str) -> Predicate {
        let mut tokens = Vec::new();
        let mut cursor = 0usize;
        if let Some(regex) = &self.regex {
            for m in regex.find_iter(reading) {
                push_words(&reading[cursor..m.start()], &mut tokens);
                tokens.push(Token::noun(m.as_str()));
                cursor = m.end();
            }
        }
        push_words(&reading[cursor..], &mut tokens);
        Predicate(tokens)
    }
}

/// Tokenize `reading` against `nouns` in one call.
pub fn tokenize<S: AsRef<str>>(reading: &str, nouns: &[S]) -> Result<Predicate, regex::Error> {
    Ok(NounPattern::new(nouns)?.tokenize(reading))
}

fn push_words(span: &str, tokens: &mut Vec<Token>) {
    for word in span.split_whitespace() {
        tokens.push(Token::word(join_continuations(&word.to_lowercase())));
    }
}

/// `word-continuation` → `wordContinuation`; a trailing hyphen is kept.
pub fn join_continuations(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut chars = word.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '-' {
            if let Some(next) = chars.peek().copied().filter(|n| n.is_ascii_lowercase()) {
                out.push(next.to_ascii_uppercase());
                chars.next();
                continue;
            }
        }
        out.push(c);
    }
    out
}
