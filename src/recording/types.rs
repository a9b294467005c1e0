use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A recorded browser session in DevTools Recorder JSON form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    #[serde(default)]
    pub title: String,
    pub steps: Vec<RecordedStep>,
}

impl Recording {
    /// Steps that act on the loaded page. Sidecar entries and generated
    /// `// step N` comments number these from 0; `navigate` and
    /// `setViewport` only set the page up and carry no number.
    pub fn action_steps(&self) -> Vec<&RecordedStep> {
        self.steps.iter().filter(|s| !s.kind().is_setup()).collect()
    }

    pub fn action_step(&self, index: usize) -> Option<&RecordedStep> {
        self.steps.iter().filter(|s| !s.kind().is_setup()).nth(index)
    }

    /// Every step in order, paired with its action number.
    pub fn numbered_steps(&self) -> Vec<(Option<usize>, &RecordedStep)> {
        let mut next = 0;
        self.steps
            .iter()
            .map(|step| {
                if step.kind().is_setup() {
                    (None, step)
                } else {
                    next += 1;
                    (Some(next - 1), step)
                }
            })
            .collect()
    }
}

/// One alternative way to find the element: either a single selector, or
/// one selector per frame depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectorAlternative {
    Single(String),
    Frames(Vec<String>),
}

impl SelectorAlternative {
    pub fn frames(&self) -> Vec<String> {
        match self {
            Self::Single(s) => vec![s.clone()],
            Self::Frames(v) => v.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedStep {
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selectors: Vec<SelectorAlternative>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl RecordedStep {
    pub fn kind(&self) -> StepKind {
        StepKind::parse(&self.step_type)
    }

    /// Selector alternatives as frame lists, in recorded order.
    pub fn selector_groups(&self) -> Vec<Vec<String>> {
        self.selectors.iter().map(SelectorAlternative::frames).collect()
    }

    /// Role and accessible name from the first `aria/Name[role="r"]`
    /// selector, or the name alone from a bare `aria/Name`.
    pub fn aria_target(&self) -> Option<(Option<String>, String)> {
        self.selectors
            .iter()
            .filter_map(|alt| alt.frames().into_iter().next())
            .find_map(|raw| super::scorer::parse_aria(&raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Navigate,
    Click,
    DoubleClick,
    Change,
    KeyDown,
    KeyUp,
    Scroll,
    Hover,
    SetViewport,
    WaitForElement,
    WaitForExpression,
    CustomStep,
    Unknown,
}

impl StepKind {
    pub fn parse(step_type: &str) -> Self {
        match step_type {
            "navigate" => Self::Navigate,
            "click" => Self::Click,
            "doubleClick" => Self::DoubleClick,
            "change" => Self::Change,
            "keyDown" => Self::KeyDown,
            "keyUp" => Self::KeyUp,
            "scroll" => Self::Scroll,
            "hover" => Self::Hover,
            "setViewport" => Self::SetViewport,
            "waitForElement" => Self::WaitForElement,
            "waitForExpression" => Self::WaitForExpression,
            "customStep" => Self::CustomStep,
            _ => Self::Unknown,
        }
    }

    /// Steps whose replay needs an element locator.
    pub fn targets_element(&self) -> bool {
        matches!(self, Self::Click | Self::DoubleClick | Self::Change | Self::Hover | Self::WaitForElement)
    }

    pub fn is_clickable(&self) -> bool {
        matches!(self, Self::Click | Self::DoubleClick)
    }

    pub fn is_setup(&self) -> bool {
        matches!(self, Self::Navigate | Self::SetViewport)
    }
}
