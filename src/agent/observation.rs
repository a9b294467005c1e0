use std::collections::HashSet;
use serde::{Deserialize, Serialize};
use crate::browser::page::PageDriver;
use crate::config::AgentConfig;
use crate::utils::truncation::truncate_chars;
use super::expectations::Expectation;
use super::result::ActionRecord;
use tracing::debug;

/// Page state shown to the model for one tick. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub tick: u32,
    pub url: String,
    pub title: String,
    pub ax_tree: String,
    pub visible_text: String,
    pub last_error: Option<String>,
    pub history: Vec<ActionRecord>,
}

const TREE_TRUNCATION_MARKER: &str = "... [accessibility tree truncated]";

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "then", "that", "this", "from", "into", "onto", "page", "should",
    "make", "sure", "user", "click", "enter", "type", "fill", "select", "button", "link", "field",
    "your", "you", "are", "was", "has", "have", "will", "see", "able",
];

const INTERACTIVE_ROLES: &[&str] = &[
    "button", "link", "textbox", "checkbox", "radio", "combobox", "listbox", "option", "menuitem",
    "tab", "switch", "searchbox", "slider", "spinbutton",
];

/// Lowercase words of at least 3 characters, stop words removed, from the
/// goal and the expectation values. Order of first appearance is kept.
pub fn extract_keywords(goal: &str, expectations: &[Expectation]) -> Vec<String> {
    let mut seen = HashSet::new();
    let sources = std::iter::once(goal).chain(expectations.iter().map(|e| e.value.as_str()));
    let mut keywords = Vec::new();
    for source in sources {
        for word in source.split(|c: char| !c.is_alphanumeric()) {
            let word = word.to_lowercase();
            if word.chars().count() < 3 || STOP_WORDS.contains(&word.as_str()) {
                continue;
            }
            if seen.insert(word.clone()) {
                keywords.push(word);
            }
        }
    }
    keywords
}

/// Cap an accessibility tree to `max_chars`, marker included. Lines
/// mentioning a keyword or an interactive role are kept first, then the rest
/// in document order while the budget lasts. Whatever budget is left goes to
/// a prefix of the first line that did not fit. Kept lines stay in document
/// order.
pub fn prioritize_tree(tree: &str, keywords: &[String], max_chars: usize) -> String {
    if tree.chars().count() <= max_chars {
        return tree.to_string();
    }
    let marker_chars = TREE_TRUNCATION_MARKER.chars().count();
    if max_chars <= marker_chars {
        return TREE_TRUNCATION_MARKER.chars().take(max_chars).collect();
    }

    let lines: Vec<&str> = tree.lines().collect();
    let budget = max_chars - marker_chars;
    let is_priority = |line: &str| {
        let lower = line.to_lowercase();
        keywords.iter().any(|k| lower.contains(k.as_str()))
            || INTERACTIVE_ROLES.iter().any(|r| lower.trim_start().trim_start_matches("- ").starts_with(r))
    };

    let mut keep: Vec<Option<usize>> = vec![None; lines.len()];
    let mut used = 0usize;
    let mut first_skipped = None;
    for pass_priority in [true, false] {
        for (i, line) in lines.iter().enumerate() {
            if keep[i].is_some() || is_priority(line) != pass_priority {
                continue;
            }
            let chars = line.chars().count();
            if used + chars + 1 > budget {
                first_skipped.get_or_insert(i);
                continue;
            }
            used += chars + 1;
            keep[i] = Some(chars);
        }
    }
    if let Some(i) = first_skipped {
        let room = budget - used;
        if room > 1 {
            keep[i] = Some(room - 1);
        }
    }

    let mut out: Vec<String> = lines
        .iter()
        .zip(keep.iter())
        .filter_map(|(line, k)| k.map(|n| line.chars().take(n).collect()))
        .collect();
    out.push(TREE_TRUNCATION_MARKER.to_string());
    out.join("\n")
}

/// Builds per-tick observations from the live page.
pub struct ObservationCollector {
    ax_tree_max_chars: usize,
    visible_text_max_chars: usize,
    history_window: usize,
}

impl ObservationCollector {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            ax_tree_max_chars: config.ax_tree_max_chars,
            visible_text_max_chars: config.visible_text_max_chars,
            history_window: config.history_window,
        }
    }

    /// Snapshot the page. Backend failures become placeholder text with a
    /// note; collecting an observation never fails.
    pub async fn collect(
        &self,
        page: &dyn PageDriver,
        tick: u32,
        keywords: &[String],
        last_error: Option<&str>,
        history: &[ActionRecord],
    ) -> Observation {
        let url = page.url().await.unwrap_or_else(|e| unavailable("url", &e.to_string()));
        let title = page.title().await.unwrap_or_else(|e| unavailable("title", &e.to_string()));
        let ax_tree = match page.aria_snapshot().await {
            Ok(tree) => prioritize_tree(&tree, keywords, self.ax_tree_max_chars),
            Err(e) => unavailable("accessibility tree", &e.to_string()),
        };
        let visible_text = match page.inner_text().await {
            Ok(text) => truncate_chars(text.trim(), self.visible_text_max_chars),
            Err(e) => unavailable("visible text", &e.to_string()),
        };

        let start = history.len().saturating_sub(self.history_window);
        debug!(tick, url = %url, tree_chars = ax_tree.len(), "Observation collected");
        Observation {
            tick,
            url,
            title,
            ax_tree,
            visible_text,
            last_error: last_error.map(str::to_string),
            history: history[start..].to_vec(),
        }
    }
}

fn unavailable(what: &str, error: &str) -> String {
    debug!(what, error, "Observation source unavailable");
    format!("({} unavailable: {})", what, error)
}
