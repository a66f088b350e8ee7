//! Feature Descriptions
//!
//! A feature is a named chain of transform stages. Its textual form is
//!
//! ```text
//! Name [Stage1(param=value, param2=value), Stage2, ...]
//! ```
//!
//! Whitespace around tokens is ignored and parameter order is preserved.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ExtractionError, ExtractionResult};

/// One stage of a feature: a registry name plus ordered parameter overrides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    pub transform: String,

    /// Applied in order; a JSON object keeps its key order
    #[serde(default, with = "ordered_parameters")]
    pub parameters: Vec<(String, String)>,
}

impl StageConfig {
    pub fn new(transform: impl Into<String>) -> Self {
        Self {
            transform: transform.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }
}

/// A requested feature and the stages that compute it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub name: String,
    pub stages: Vec<StageConfig>,
}

impl FeatureConfig {
    pub fn new(name: impl Into<String>, stages: Vec<StageConfig>) -> Self {
        Self {
            name: name.into(),
            stages,
        }
    }

    /// Parse the textual form described in the module docs
    pub fn parse(description: &str) -> ExtractionResult<Self> {
        let fail = |reason: &str| ExtractionError::InvalidFeatureDescription {
            description: description.to_string(),
            reason: reason.to_string(),
        };

        let text = description.trim();
        let open = text.find('[').ok_or_else(|| fail("missing '['"))?;
        let body = text[open + 1..]
            .strip_suffix(']')
            .ok_or_else(|| fail("missing closing ']'"))?;

        let name = text[..open].trim();
        if !is_identifier(name) {
            return Err(fail("feature name must be a non-empty identifier"));
        }

        let stages = split_top_level(body)
            .ok_or_else(|| fail("unbalanced parentheses"))?
            .into_iter()
            .map(|stage| parse_stage(stage).map_err(|reason| fail(&reason)))
            .collect::<ExtractionResult<Vec<_>>>()?;
        if stages.is_empty() {
            return Err(fail("no stages"));
        }

        Ok(Self::new(name, stages))
    }
}

impl FromStr for FeatureConfig {
    type Err = ExtractionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FeatureConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [", self.name)?;
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&stage.transform)?;
            if !stage.parameters.is_empty() {
                f.write_str("(")?;
                for (j, (name, value)) in stage.parameters.iter().enumerate() {
                    if j > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}={value}")?;
                }
                f.write_str(")")?;
            }
        }
        f.write_str("]")
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Split on commas outside parentheses; `None` when parentheses are unbalanced
fn split_top_level(body: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    parts.push(&body[start..]);
    // "Name []" has no stages rather than one empty stage
    if parts.len() == 1 && parts[0].trim().is_empty() {
        parts.clear();
    }
    Some(parts)
}

fn parse_stage(text: &str) -> Result<StageConfig, String> {
    let text = text.trim();
    let (name, arguments) = match text.find('(') {
        Some(open) => {
            let arguments = text[open + 1..]
                .strip_suffix(')')
                .ok_or_else(|| format!("stage \"{text}\" has text after ')'"))?;
            (text[..open].trim(), Some(arguments))
        }
        None => (text, None),
    };
    if !is_identifier(name) {
        return Err(format!("invalid stage name \"{name}\""));
    }

    let mut stage = StageConfig::new(name);
    let Some(arguments) = arguments else {
        return Ok(stage);
    };
    if arguments.trim().is_empty() {
        return Ok(stage);
    }
    for argument in arguments.split(',') {
        let (key, value) = argument
            .split_once('=')
            .ok_or_else(|| format!("parameter \"{}\" of {name} lacks '='", argument.trim()))?;
        let (key, value) = (key.trim(), value.trim());
        if !is_identifier(key) || value.is_empty() || value.contains(|c: char| c == '(' || c == ')') {
            return Err(format!("malformed parameter \"{}\" of {name}", argument.trim()));
        }
        stage.parameters.push((key.to_string(), value.to_string()));
    }
    Ok(stage)
}

/// (De)serializes `Vec<(String, String)>` as a JSON object, keeping key order
mod ordered_parameters {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        parameters: &[(String, String)],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(parameters.len()))?;
        for (name, value) in parameters {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<(String, String)>, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = Vec<(String, String)>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of parameter names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut parameters = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(entry) = access.next_entry::<String, String>()? {
                    parameters.push(entry);
                }
                Ok(parameters)
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}
