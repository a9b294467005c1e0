//! Scores recorded selector alternatives and picks the most stable one.
//!
//! Recorded selectors use the DevTools Recorder prefixes: `aria/Name[role="r"]`,
//! `aria/Name`, `text/...`, `xpath/...`, `pierce/...` and `css/...` (or bare
//! CSS). Scoring is pure: the same input always gives the same result.

use std::sync::LazyLock;
use regex::Regex;
use serde::Serialize;
use crate::browser::locator::Descriptor;
use tracing::warn;

pub const SCORE_ROLE_NAME: u32 = 100;
pub const SCORE_ARIA_LABEL: u32 = 90;
pub const SCORE_TEST_ATTRIBUTE: u32 = 85;
pub const SCORE_TEXT: u32 = 80;
pub const SCORE_ID: u32 = 70;
pub const SCORE_CSS: u32 = 60;
pub const SCORE_XPATH: u32 = 20;

const PENALTY_POSITIONAL: u32 = 25;
const PENALTY_PER_COMBINATOR: u32 = 10;
const PENALTY_PER_CLASS: u32 = 5;
const PENALTY_GENERATED: u32 = 20;
const MAX_COMBINATORS: usize = 3;
const MAX_CLASSES: usize = 3;

static ARIA_ROLE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(.*)\[role="([^"]+)"\]$"#).expect("aria role regex is valid")
});

static BARE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#[A-Za-z_][A-Za-z0-9_-]*$").expect("id regex is valid")
});

static TEST_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[data-(?:testid|test-id|test|cy)\s*[~|^$*]?=\s*["']?[^"'\]]+["']?\s*\]"#)
        .expect("test attribute regex is valid")
});

static EXACT_TESTID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\[data-testid\s*=\s*["']?([^"'\]]+)["']?\s*\]$"#).expect("testid regex is valid")
});

static POSITIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":nth-(?:child|of-type|last-child|last-of-type)\(").expect("positional regex is valid")
});

static CLASS_OR_ID_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[.#]([A-Za-z0-9_-]+)").expect("token regex is valid")
});

/// Class names that look machine-generated: CSS-in-JS prefixes, CSS module
/// hashes, long camelCase runs, and mixed letter/digit hashes.
static GENERATED_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:",
        r"sc-[A-Za-z0-9]+",
        r"|css-[a-z0-9]{4,}",
        r"|jsx-\d+",
        r"|[A-Za-z]+_[A-Za-z]+__[A-Za-z0-9_-]{5,}",
        r"|_[A-Za-z0-9]{5,}",
        r"|[a-z]+(?:[A-Z][a-z0-9]+){3,}",
        r"|[A-Za-z]*\d[A-Za-z]+\d[A-Za-z0-9]*",
        r")$"
    ))
    .expect("generated token regex is valid")
});

/// The scorer's verdict on one raw selector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredSelector {
    /// Playwright locator expression for generated scripts.
    pub code: String,
    pub descriptor: Descriptor,
    pub score: u32,
    pub raw: String,
    pub brittle: bool,
    pub reason: String,
}

/// Name and optional role from an `aria/` selector.
pub fn parse_aria(raw: &str) -> Option<(Option<String>, String)> {
    let rest = raw.strip_prefix("aria/")?;
    match ARIA_ROLE_NAME.captures(rest) {
        Some(caps) => Some((Some(caps[2].to_string()), caps[1].to_string())),
        None => Some((None, rest.to_string())),
    }
}

fn scored(descriptor: Descriptor, score: u32, raw: &str, brittle: bool, reason: String) -> ScoredSelector {
    ScoredSelector { code: descriptor.to_code(), descriptor, score, raw: raw.to_string(), brittle, reason }
}

/// Score a single raw selector string.
pub fn score_selector(raw: &str) -> ScoredSelector {
    let raw = raw.trim();

    if let Some((role, name)) = parse_aria(raw) {
        return match role {
            Some(role) if !name.is_empty() => scored(
                Descriptor::role(&role, Some(&name), true),
                SCORE_ROLE_NAME,
                raw,
                false,
                "ARIA role and accessible name".to_string(),
            ),
            Some(role) => scored(
                Descriptor::role(&role, None, false),
                SCORE_CSS,
                raw,
                true,
                "ARIA role without an accessible name".to_string(),
            ),
            None => scored(
                Descriptor::Label { text: name, exact: true },
                SCORE_ARIA_LABEL,
                raw,
                false,
                "ARIA accessible name".to_string(),
            ),
        };
    }

    if let Some(text) = raw.strip_prefix("text/") {
        return scored(
            Descriptor::Text { text: text.to_string(), exact: false },
            SCORE_TEXT,
            raw,
            false,
            "visible text".to_string(),
        );
    }

    if let Some(path) = raw.strip_prefix("xpath/").or_else(|| raw.starts_with("//").then_some(raw)) {
        return scored(
            Descriptor::css(&format!("xpath={}", path)),
            SCORE_XPATH,
            raw,
            true,
            "xpath depends on document structure".to_string(),
        );
    }

    if let Some(css) = raw.strip_prefix("pierce/") {
        let mut result = score_css(css, raw);
        result.reason = format!("shadow-piercing, {}", result.reason);
        return result;
    }

    let css = raw.strip_prefix("css/").unwrap_or(raw);
    score_css(css, raw)
}

fn score_css(css: &str, raw: &str) -> ScoredSelector {
    let css = css.trim();
    let mut notes = Vec::new();
    let mut brittle = false;

    let (descriptor, mut score) = if let Some(caps) = EXACT_TESTID.captures(css) {
        notes.push("test id attribute".to_string());
        (Descriptor::TestId { value: caps[1].to_string() }, SCORE_TEST_ATTRIBUTE)
    } else if TEST_ATTRIBUTE.is_match(css) {
        notes.push("test attribute".to_string());
        (Descriptor::css(css), SCORE_TEST_ATTRIBUTE)
    } else if BARE_ID.is_match(css) {
        notes.push("element id".to_string());
        (Descriptor::css(css), SCORE_ID)
    } else {
        notes.push("css".to_string());
        (Descriptor::css(css), SCORE_CSS)
    };

    if POSITIONAL.is_match(css) {
        score = score.saturating_sub(PENALTY_POSITIONAL);
        brittle = true;
        notes.push("positional index".to_string());
    }

    let combinators = count_combinators(css);
    if combinators > MAX_COMBINATORS {
        let excess = (combinators - MAX_COMBINATORS) as u32;
        score = score.saturating_sub(PENALTY_PER_COMBINATOR * excess);
        brittle = true;
        notes.push(format!("{} combinators", combinators));
    }

    let classes = count_classes(css);
    if classes > MAX_CLASSES {
        let excess = (classes - MAX_CLASSES) as u32;
        score = score.saturating_sub(PENALTY_PER_CLASS * excess);
        brittle = true;
        notes.push(format!("{} class names", classes));
    }

    if let Some(token) = generated_token(css) {
        score = score.saturating_sub(PENALTY_GENERATED);
        brittle = true;
        notes.push(format!("generated-looking name '{}'", token));
    }

    scored(descriptor, score, raw, brittle, notes.join(", "))
}

/// Visit characters outside attribute brackets, parentheses and quotes.
fn outside_brackets(css: &str) -> Vec<(usize, char)> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in css.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '[' | '(' => {
                if depth == 0 {
                    out.push((i, c));
                }
                depth += 1;
            }
            ']' | ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push((i, c)),
            _ => {}
        }
    }
    out
}

/// Number of combinators (descendant, `>`, `+`, `~`) between compound
/// selectors. Selector lists are scored by their longest branch.
fn count_combinators(css: &str) -> usize {
    let mut max = 0;
    let mut count = 0;
    let mut in_gap = false;
    let mut seen_compound = false;
    for (_, c) in outside_brackets(css) {
        match c {
            ',' => {
                max = max.max(count);
                count = 0;
                in_gap = false;
                seen_compound = false;
            }
            ' ' | '\t' | '\n' | '>' | '+' | '~' => {
                if seen_compound {
                    in_gap = true;
                }
            }
            _ => {
                if in_gap {
                    count += 1;
                    in_gap = false;
                }
                seen_compound = true;
            }
        }
    }
    max.max(count)
}

fn count_classes(css: &str) -> usize {
    let chars = outside_brackets(css);
    chars
        .iter()
        .enumerate()
        .filter(|(idx, (_, c))| {
            *c == '.'
                && chars
                    .get(idx + 1)
                    .is_some_and(|(_, next)| next.is_alphabetic() || *next == '_' || *next == '-')
        })
        .count()
}

fn generated_token(css: &str) -> Option<String> {
    let visible: String = outside_brackets(css).into_iter().map(|(_, c)| c).collect();
    CLASS_OR_ID_TOKEN
        .captures_iter(&visible)
        .map(|caps| caps[1].to_string())
        .find(|token| GENERATED_TOKEN.is_match(token))
}

/// Fallback when a step recorded no usable selectors.
pub fn body_fallback() -> ScoredSelector {
    scored(Descriptor::css("body"), 0, "", true, "no selectors provided".to_string())
}

/// Pick the best selector among recorded alternatives. Only the first
/// (top-level frame) entry of each alternative is scored. Higher scores
/// win; ties go to the earlier alternative.
pub fn best_selector(groups: &[Vec<String>]) -> ScoredSelector {
    let mut candidates: Vec<(ScoredSelector, bool)> = groups
        .iter()
        .filter_map(|frames| {
            let first = frames.first().filter(|s| !s.trim().is_empty())?;
            Some((score_selector(first), frames.len() > 1))
        })
        .collect();

    if candidates.is_empty() {
        return body_fallback();
    }
    candidates.sort_by(|a, b| b.0.score.cmp(&a.0.score));

    let (mut best, nested) = candidates.swap_remove(0);
    if nested {
        warn!(selector = %best.raw, "Selector spans nested frames; only the top-level entry was used");
        best.reason = format!("{}; nested frame entries ignored", best.reason);
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(raw: &[&str]) -> Vec<Vec<String>> {
        raw.iter().map(|s| vec![s.to_string()]).collect()
    }

    #[test]
    fn test_role_name_selector() {
        let s = score_selector(r#"aria/Login[role="button"]"#);
        assert_eq!(s.score, 100);
        assert!(!s.brittle);
        assert_eq!(s.code, r#"page.getByRole("button", { name: "Login", exact: true })"#);
    }

    #[test]
    fn test_aria_label_only() {
        let s = score_selector("aria/Email address");
        assert_eq!(s.score, 90);
        assert_eq!(s.descriptor, Descriptor::Label { text: "Email address".into(), exact: true });
    }

    #[test]
    fn test_text_selector() {
        let s = score_selector("text/Forgot password?");
        assert_eq!(s.score, 80);
        assert!(!s.brittle);
    }

    #[test]
    fn test_xpath_always_brittle() {
        for raw in ["xpath///*[@id=\"main\"]/div[2]/button", "//button"] {
            let s = score_selector(raw);
            assert_eq!(s.score, 20);
            assert!(s.brittle);
        }
    }

    #[test]
    fn test_bare_id() {
        let s = score_selector("#login");
        assert_eq!(s.score, 70);
        assert!(!s.brittle);
    }

    #[test]
    fn test_testid_converts_to_descriptor() {
        let s = score_selector(r#"[data-testid="submit"]"#);
        assert_eq!(s.score, 85);
        assert_eq!(s.descriptor, Descriptor::TestId { value: "submit".into() });
        assert_eq!(s.code, r#"page.getByTestId("submit")"#);
    }

    #[test]
    fn test_other_test_attributes_stay_css() {
        let s = score_selector(r#"form [data-cy="save"]"#);
        assert_eq!(s.score, 85);
        assert!(matches!(s.descriptor, Descriptor::Css { .. }));
    }

    #[test]
    fn test_nth_child_is_brittle() {
        let s = score_selector("ul > li:nth-child(3)");
        assert_eq!(s.score, 35);
        assert!(s.brittle);
        let s = score_selector("css/div p:nth-of-type(2)");
        assert!(s.brittle);
    }

    #[test]
    fn test_combinator_penalty() {
        assert_eq!(count_combinators("a b > c"), 2);
        assert_eq!(count_combinators("div>span.btn"), 1);
        assert_eq!(count_combinators("a[title='x y'] b"), 1);
        assert_eq!(count_combinators("form [data-cy=\"save\"]"), 1);
        let s = score_selector("main div > section ul li a");
        assert_eq!(s.score, 40);
        assert!(s.brittle);
    }

    #[test]
    fn test_class_penalty() {
        assert_eq!(count_classes(".a.b .c[data-x='.d']"), 3);
        let s = score_selector(".card.primary.large.rounded.shadow");
        assert_eq!(s.score, 50);
        assert!(s.brittle);
    }

    #[test]
    fn test_generated_class_penalty() {
        for raw in [".sc-bdVaJa", ".css-1x2y3z", ".Button_primary__3xYzQ", ".someVeryLongGeneratedClassName", ".a1b2c3"] {
            let s = score_selector(raw);
            assert!(s.brittle, "{} should be brittle", raw);
            assert_eq!(s.score, 40, "{}", raw);
        }
        assert!(!score_selector(".submit-button").brittle);
    }

    #[test]
    fn test_penalties_floor_at_zero() {
        let s = score_selector("//div");
        assert_eq!(s.score, 20);
        let s = score_selector(".sc-x1 a b c d e f g:nth-child(1)");
        assert_eq!(s.score, 0);
    }

    #[test]
    fn test_empty_input_falls_back_to_body() {
        for input in [Vec::new(), vec![Vec::new()], groups(&["  "])] {
            let s = best_selector(&input);
            assert_eq!(s.score, 0);
            assert!(s.brittle);
            assert_eq!(s.reason, "no selectors provided");
            assert_eq!(s.code, r#"page.locator("body")"#);
        }
    }

    #[test]
    fn test_role_beats_css() {
        let s = best_selector(&groups(&["css/div>span.btn", r#"aria/Login[role="button"]"#]));
        assert_eq!(s.raw, r#"aria/Login[role="button"]"#);
    }

    #[test]
    fn test_testid_beats_multi_class() {
        let s = best_selector(&groups(&[".btn.primary", r#"[data-testid="go"]"#]));
        assert_eq!(s.raw, r#"[data-testid="go"]"#);
    }

    #[test]
    fn test_ties_go_to_first() {
        let s = best_selector(&groups(&[".first", ".second"]));
        assert_eq!(s.raw, ".first");
    }

    #[test]
    fn test_nested_frames_use_first_entry_and_flag() {
        let input = vec![vec!["#frame-host".to_string(), r#"aria/Pay[role="button"]"#.to_string()]];
        let s = best_selector(&input);
        assert_eq!(s.raw, "#frame-host");
        assert!(s.reason.contains("nested frame"));
    }

    #[test]
    fn test_deterministic() {
        let input = groups(&[".a > .b", "text/Go", "#go", "xpath//a"]);
        let first = best_selector(&input);
        for _ in 0..10 {
            assert_eq!(best_selector(&input), first);
        }
    }
}
