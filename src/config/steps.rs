use crate::{Error, Result};
use popsweep_resolver::Locator;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;

/// A scenario step.
#[derive(Debug, Clone)]
pub enum Step {
    // Navigation
    Visit(VisitStep),
    VisitAny(VisitAnyStep),

    // Waiting
    Wait(WaitStep),
    SettlePopup(SettleStep),

    // Interaction
    Click(SelectorStep),
    TryClick(SelectorStep),
    Fill(FillStep),

    // Checks
    AssertPresent(SelectorStep),
    AssertAbsent(SelectorStep),
    AssertUrl(AssertUrlStep),

    // Debug
    Log(LogStep),

    // Control flow
    Repeat(RepeatStep),
}

impl Step {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Visit(_) => "visit",
            Self::VisitAny(_) => "visit_any",
            Self::Wait(_) => "wait",
            Self::SettlePopup(_) => "settle_popup",
            Self::Click(_) => "click",
            Self::TryClick(_) => "try_click",
            Self::Fill(_) => "fill",
            Self::AssertPresent(_) => "assert_present",
            Self::AssertAbsent(_) => "assert_absent",
            Self::AssertUrl(_) => "assert_url",
            Self::Log(_) => "log",
            Self::Repeat(_) => "repeat",
        }
    }

    /// Whether this step (or a nested one) joins the popup sweeper.
    pub fn settles_popup(&self) -> bool {
        match self {
            Self::SettlePopup(_) => true,
            Self::Repeat(r) => r.steps.iter().any(Step::settles_popup),
            _ => false,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            Self::VisitAny(s) if s.urls.is_empty() => {
                Err(Error::Config("visit_any needs at least one url".into()))
            }
            Self::Wait(s) => s.validate(),
            Self::Repeat(r) => r.steps.iter().try_for_each(Step::validate),
            _ => Ok(()),
        }
    }
}

const STEP_NAMES: &[&str] = &[
    "visit",
    "visit_any",
    "wait",
    "settle_popup",
    "click",
    "try_click",
    "fill",
    "assert_present",
    "assert_absent",
    "assert_url",
    "log",
    "repeat",
];

impl<'de> Deserialize<'de> for Step {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(StepVisitor)
    }
}

struct StepVisitor;

impl<'de> Visitor<'de> for StepVisitor {
    type Value = Step;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a step (string for settle_popup, or map with single key)")
    }

    fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
    where
        E: de::Error,
    {
        match value {
            "settle_popup" => Ok(Step::SettlePopup(SettleStep::default())),
            other => Err(de::Error::unknown_variant(other, &["settle_popup"])),
        }
    }

    fn visit_map<M>(self, mut map: M) -> std::result::Result<Self::Value, M::Error>
    where
        M: MapAccess<'de>,
    {
        let key: String = map
            .next_key()?
            .ok_or_else(|| de::Error::custom("expected step type key"))?;

        let step = match key.as_str() {
            "visit" => Step::Visit(map.next_value()?),
            "visit_any" => Step::VisitAny(map.next_value()?),
            "wait" => Step::Wait(map.next_value()?),
            "settle_popup" => {
                let settle: Option<SettleStep> = map.next_value()?;
                Step::SettlePopup(settle.unwrap_or_default())
            }
            "click" => Step::Click(map.next_value()?),
            "try_click" => Step::TryClick(map.next_value()?),
            "fill" => Step::Fill(map.next_value()?),
            "assert_present" => Step::AssertPresent(map.next_value()?),
            "assert_absent" => Step::AssertAbsent(map.next_value()?),
            "assert_url" => Step::AssertUrl(map.next_value()?),
            "log" => Step::Log(map.next_value()?),
            "repeat" => Step::Repeat(map.next_value()?),
            other => return Err(de::Error::unknown_variant(other, STEP_NAMES)),
        };

        Ok(step)
    }
}

// --- Step payloads ---

#[derive(Debug, Clone, Deserialize)]
pub struct VisitStep {
    pub url: String,
}

/// Visit one of `urls`, picked at random.
#[derive(Debug, Clone, Deserialize)]
pub struct VisitAnyStep {
    pub urls: Vec<String>,
}

/// Sleep for `ms` milliseconds or `seconds` seconds (exactly one of them).
#[derive(Debug, Clone, Deserialize)]
pub struct WaitStep {
    pub ms: Option<u64>,
    pub seconds: Option<f64>,
}

impl WaitStep {
    /// Seconds are rounded up to whole milliseconds.
    pub fn duration_ms(&self) -> u64 {
        match (self.ms, self.seconds) {
            (Some(ms), _) => ms,
            (None, Some(s)) => (s * 1000.0).ceil() as u64,
            (None, None) => 0,
        }
    }

    fn validate(&self) -> Result<()> {
        match (self.ms, self.seconds) {
            (Some(_), None) => Ok(()),
            (None, Some(s)) if s.is_finite() && s >= 0.0 => Ok(()),
            (None, Some(s)) => Err(Error::Config(format!(
                "wait.seconds must be a non-negative number, got {}",
                s
            ))),
            _ => Err(Error::Config(
                "wait needs exactly one of 'ms' or 'seconds'".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettleStep {
    /// Fail unless the popup was found and clicked.
    #[serde(default)]
    pub required: bool,
}

/// Step that only needs a selector.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorStep {
    pub selector: Locator,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FillStep {
    pub selector: Locator,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssertUrlStep {
    pub contains: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogStep {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepeatStep {
    pub times: u32,
    pub steps: Vec<Step>,
}
