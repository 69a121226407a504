//! Scenario fixture loading.

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

fn default_file() -> String {
    String::from("scenario.c")
}

/// Expected counter values; absent fields are not checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsExpectation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_bytes: Option<u64>,
    /// Minimum value of `heap_max - heap_min`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_heap_span: Option<usize>,
}

/// One action against the debugger.
///
/// Slots name pointers returned by earlier steps. `line` overrides the call
/// site line, which otherwise is the 1-based step number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Malloc {
        slot: String,
        size: usize,
        #[serde(default)]
        line: Option<u32>,
    },
    Calloc {
        slot: String,
        count: usize,
        size: usize,
        #[serde(default)]
        line: Option<u32>,
    },
    Realloc {
        slot: String,
        size: usize,
        #[serde(default)]
        line: Option<u32>,
    },
    Free {
        slot: String,
        /// Bytes past the slot's pointer.
        #[serde(default)]
        offset: usize,
        #[serde(default)]
        line: Option<u32>,
    },
    FreeNull {
        #[serde(default)]
        line: Option<u32>,
    },
    /// Release an address that never came from the debugger.
    FreeForeign {
        #[serde(default)]
        line: Option<u32>,
    },
    /// Fill `len` bytes with `byte`, starting `offset` bytes into the slot.
    Write {
        slot: String,
        offset: usize,
        len: usize,
        #[serde(default)]
        byte: u8,
    },
    PrintStatistics,
    LeakReport,
    HeavyHitterReport,
    AssertStats(StatsExpectation),
}

/// A scripted run with its expected output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// File name reported for every call site in this scenario.
    #[serde(default = "default_file")]
    pub file: String,
    /// Refuse raw requests larger than this many bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_cap: Option<usize>,
    pub steps: Vec<Step>,
    /// Expected output lines; `???` is a wildcard.
    pub expected: Vec<String>,
}

/// A collection of scenarios.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSet {
    /// Schema version.
    pub version: String,
    /// Suite name.
    pub suite: String,
    pub scenarios: Vec<Scenario>,
}

impl ScenarioSet {
    /// Load from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load from a file path.
    pub fn from_file(path: &std::path::Path) -> Result<Self, HarnessError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    /// Scenarios whose name contains `filter` (all when `None`).
    pub fn select<'a>(&'a self, filter: Option<&'a str>) -> impl Iterator<Item = &'a Scenario> {
        self.scenarios
            .iter()
            .filter(move |s| filter.is_none_or(|f| s.name.contains(f)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_deserialize_from_tagged_json() {
        let set = ScenarioSet::from_json(
            r#"{
                "version": "v1",
                "suite": "smoke",
                "scenarios": [{
                    "name": "basic",
                    "steps": [
                        {"op": "malloc", "slot": "p", "size": 8},
                        {"op": "write", "slot": "p", "offset": 8, "len": 1},
                        {"op": "free", "slot": "p", "offset": 2, "line": 40},
                        {"op": "free_null"},
                        {"op": "print_statistics"},
                        {"op": "assert_stats", "active_count": 1}
                    ],
                    "expected": ["???"]
                }]
            }"#,
        )
        .expect("valid fixture json");

        let scenario = &set.scenarios[0];
        assert_eq!(scenario.file, "scenario.c");
        assert_eq!(scenario.raw_cap, None);
        assert_eq!(
            scenario.steps[1],
            Step::Write {
                slot: "p".into(),
                offset: 8,
                len: 1,
                byte: 0
            }
        );
        assert_eq!(
            scenario.steps[2],
            Step::Free {
                slot: "p".into(),
                offset: 2,
                line: Some(40)
            }
        );
        assert_eq!(
            scenario.steps[5],
            Step::AssertStats(StatsExpectation {
                active_count: Some(1),
                ..StatsExpectation::default()
            })
        );
    }

    #[test]
    fn select_filters_by_substring() {
        let set = ScenarioSet {
            version: "v1".into(),
            suite: "s".into(),
            scenarios: ["double_free", "leak", "double_free_coalesced"]
                .into_iter()
                .map(|name| Scenario {
                    name: name.into(),
                    description: String::new(),
                    file: default_file(),
                    raw_cap: None,
                    steps: Vec::new(),
                    expected: Vec::new(),
                })
                .collect(),
        };
        assert_eq!(set.select(Some("double")).count(), 2);
        assert_eq!(set.select(None).count(), 3);
    }
}
