use std::cmp::Ordering;
use std::fmt;

/// Classification of a single character in a version string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Numeric,
    Separator,
    Textual,
}

impl TokenKind {
    fn of(c: char) -> Self {
        match c {
            '.' => Self::Separator,
            '0'..='9' => Self::Numeric,
            _ => Self::Textual,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionToken {
    pub kind: TokenKind,
    pub text: String,
}

/// A version string split into classified tokens.
///
/// `"1.20rc3"` becomes `["1", ".", "20", "rc", "3"]`. Every separator is a
/// token of its own, so `"1..2"` yields two separator tokens in a row.
///
/// Equality and ordering follow [`compare_versions`]: `"1.02"` and `"1.2"`
/// compare equal even though their text differs.
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    tokens: Vec<VersionToken>,
}

impl Version {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            tokens: tokenize(raw),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn tokens(&self) -> &[VersionToken] {
        &self.tokens
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_tokens(&self.tokens, &other.tokens)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn tokenize(raw: &str) -> Vec<VersionToken> {
    let mut tokens: Vec<VersionToken> = Vec::new();

    for c in raw.chars() {
        let kind = TokenKind::of(c);
        match tokens.last_mut() {
            Some(last) if last.kind == kind && kind != TokenKind::Separator => {
                last.text.push(c);
            }
            _ => tokens.push(VersionToken {
                kind,
                text: c.to_string(),
            }),
        }
    }

    tokens
}

/// Compare two version strings.
///
/// Numbers compare numerically, text compares lexically, and at a position
/// where the kinds differ a number beats a separator which beats text
/// (`1.2.0 > 1.2rc1`). When one string is a prefix of the other, a trailing
/// text token makes the longer one older (`1.5 > 1.5b3`) while anything else
/// makes it newer (`1.5.1 > 1.5`).
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    compare_tokens(&tokenize(a), &tokenize(b))
}

fn compare_tokens(a: &[VersionToken], b: &[VersionToken]) -> Ordering {
    for (left, right) in a.iter().zip(b) {
        let ordering = compare_token(left, right);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    let common = a.len().min(b.len());
    match a.len().cmp(&b.len()) {
        Ordering::Equal => Ordering::Equal,
        Ordering::Greater => extra_token_ordering(&a[common]),
        Ordering::Less => extra_token_ordering(&b[common]).reverse(),
    }
}

// Ordering of the longer sequence relative to the shorter one, decided by the
// first token the shorter one lacks.
fn extra_token_ordering(extra: &VersionToken) -> Ordering {
    if extra.kind == TokenKind::Textual {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

fn compare_token(a: &VersionToken, b: &VersionToken) -> Ordering {
    match (a.kind, b.kind) {
        (TokenKind::Textual, TokenKind::Textual) => a.text.cmp(&b.text),
        (TokenKind::Numeric, TokenKind::Numeric) => compare_numeric(&a.text, &b.text),
        (TokenKind::Separator, TokenKind::Separator) => Ordering::Equal,
        (left, right) => kind_rank(left).cmp(&kind_rank(right)),
    }
}

fn kind_rank(kind: TokenKind) -> u8 {
    match kind {
        TokenKind::Textual => 0,
        TokenKind::Separator => 1,
        TokenKind::Numeric => 2,
    }
}

// Digit runs may be longer than any integer type, so compare them as
// normalized strings.
fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use super::{TokenKind, Version, compare_versions, tokenize};

    #[test]
    fn tokenize_splits_on_kind_changes_and_every_separator() {
        let tokens = tokenize("1.20rc3");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["1", ".", "20", "rc", "3"]);

        let kinds: Vec<TokenKind> = tokenize("1..2").iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            [
                TokenKind::Numeric,
                TokenKind::Separator,
                TokenKind::Separator,
                TokenKind::Numeric
            ]
        );
    }

    #[test]
    fn tokenize_empty_string_yields_no_tokens() {
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn literal_orderings() {
        assert_eq!(compare_versions("1.2.0", "1.2rc1"), Ordering::Greater);
        assert_eq!(compare_versions("1.2rc1", "1.2.0"), Ordering::Less);
        assert_eq!(compare_versions("1.5", "1.5b3"), Ordering::Greater);
        assert_eq!(compare_versions("1.5.1", "1.5"), Ordering::Greater);
        assert_eq!(compare_versions("2.0.0", "2.0"), Ordering::Greater);
        assert_eq!(compare_versions("2.0", "2.0"), Ordering::Equal);
    }

    #[test]
    fn numeric_tokens_ignore_leading_zeros() {
        assert_eq!(compare_versions("1.02", "1.2"), Ordering::Equal);
        assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare_versions("1.007", "1.10"), Ordering::Less);
    }

    #[test]
    fn very_long_numbers_do_not_overflow() {
        assert_eq!(
            compare_versions("1.123456789012345678901234567890", "1.99999999999999999999"),
            Ordering::Greater
        );
    }

    #[test]
    fn textual_tokens_compare_lexically() {
        assert_eq!(compare_versions("1.0beta", "1.0alpha"), Ordering::Greater);
        assert_eq!(compare_versions("1.0b2", "1.0b10"), Ordering::Less);
    }

    #[test]
    fn number_beats_separator_beats_text() {
        assert_eq!(compare_versions("1.5", "1..5"), Ordering::Greater);
        assert_eq!(compare_versions("1.", "1a"), Ordering::Greater);
        assert_eq!(compare_versions("1a", "1."), Ordering::Less);
    }

    #[test]
    fn empty_version_is_older_than_any_numeric_version() {
        assert_eq!(compare_versions("", "0"), Ordering::Less);
        assert_eq!(compare_versions("", ""), Ordering::Equal);
        assert_eq!(compare_versions("", "beta"), Ordering::Greater);
    }

    #[test]
    fn comparison_is_a_total_order_over_sample_versions() {
        let samples = [
            "", "1", "1.", "1a", "1.0", "1.0.0", "1.2", "1.2rc1", "1.2.0", "1.5", "1.5b3",
            "1.5.1", "1..5", "2.0", "2.0.0", "10", "01", "beta", "1.0beta", "1.0alpha",
        ];

        for a in samples {
            assert_eq!(compare_versions(a, a), Ordering::Equal, "reflexive for {a:?}");
            for b in samples {
                assert_eq!(
                    compare_versions(a, b),
                    compare_versions(b, a).reverse(),
                    "antisymmetric for {a:?} / {b:?}"
                );
                for c in samples {
                    if compare_versions(a, b) == Ordering::Greater
                        && compare_versions(b, c) == Ordering::Greater
                    {
                        assert_eq!(
                            compare_versions(a, c),
                            Ordering::Greater,
                            "transitive for {a:?} > {b:?} > {c:?}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn version_sorts_with_std_sort() {
        let mut versions: Vec<Version> = ["1.5", "1.5b3", "1.10", "1.5.1", "1.2rc1"]
            .into_iter()
            .map(Version::parse)
            .collect();
        versions.sort();

        let sorted: Vec<&str> = versions.iter().map(Version::as_str).collect();
        assert_eq!(sorted, ["1.2rc1", "1.5b3", "1.5", "1.5.1", "1.10"]);
    }
}
