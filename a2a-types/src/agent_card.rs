//! Discovery document served at `/.well-known/agent.json`.

use serde::{Deserialize, Serialize};

fn text_modes() -> Vec<String> {
    vec!["text".to_string(), "text/plain".to_string()]
}

/// Optional protocol features the server implements.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentCapabilities {
    /// `tasks/sendSubscribe` and `tasks/resubscribe` are available.
    pub streaming: bool,
    /// `tasks/pushNotification/*` are available and a JWKS is published.
    pub push_notifications: bool,
}

/// One thing the agent is good at, advertised to clients.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Sample prompts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

impl AgentSkill {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn add_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn add_example(mut self, example: impl Into<String>) -> Self {
        self.examples.push(example.into());
        self
    }
}

/// Self-description of an agent server: where to reach it, what it accepts
/// and produces, and which optional methods it answers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON-RPC endpoint of the agent.
    pub url: String,
    pub version: String,
    #[serde(default)]
    pub capabilities: AgentCapabilities,
    #[serde(default = "text_modes")]
    pub default_input_modes: Vec<String>,
    #[serde(default = "text_modes")]
    pub default_output_modes: Vec<String>,
    #[serde(default)]
    pub skills: Vec<AgentSkill>,
}

impl AgentCard {
    /// A text-in, text-out card with no optional capabilities.
    pub fn new(name: impl Into<String>, url: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            url: url.into(),
            version: version.into(),
            capabilities: AgentCapabilities::default(),
            default_input_modes: text_modes(),
            default_output_modes: text_modes(),
            skills: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_streaming(mut self, enabled: bool) -> Self {
        self.capabilities.streaming = enabled;
        self
    }

    pub fn with_push_notifications(mut self, enabled: bool) -> Self {
        self.capabilities.push_notifications = enabled;
        self
    }

    pub fn with_default_output_modes(mut self, modes: Vec<String>) -> Self {
        self.default_output_modes = modes;
        self
    }

    pub fn add_skill(mut self, skill: AgentSkill) -> Self {
        self.skills.push(skill);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_uses_camel_case_on_the_wire() {
        let card = AgentCard::new("Currency Agent", "http://localhost:10000/", "1.0.0")
            .with_streaming(true)
            .with_push_notifications(true)
            .add_skill(AgentSkill::new("convert_currency", "Currency conversion").add_tag("fx"));

        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(value["capabilities"]["pushNotifications"], true);
        assert_eq!(value["defaultOutputModes"][1], "text/plain");
        assert_eq!(value["skills"][0]["tags"][0], "fx");
        assert!(value.get("description").is_none());
    }

    #[test]
    fn minimal_card_fills_defaults() {
        let card: AgentCard = serde_json::from_value(serde_json::json!({
            "name": "Echo",
            "url": "http://localhost:10000/",
            "version": "0.1.0"
        }))
        .unwrap();

        assert!(!card.capabilities.streaming);
        assert_eq!(card.default_input_modes, text_modes());
        assert!(card.skills.is_empty());
    }
}
