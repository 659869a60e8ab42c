use crate::error::{EmbedError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Identifier of the end user; the widget accepts either form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdentityId {
    Text(String),
    Number(Number),
}

impl From<&str> for IdentityId {
    fn from(value: &str) -> Self {
        IdentityId::Text(value.to_string())
    }
}

impl From<String> for IdentityId {
    fn from(value: String) -> Self {
        IdentityId::Text(value)
    }
}

impl From<u64> for IdentityId {
    fn from(value: u64) -> Self {
        IdentityId::Number(Number::from(value))
    }
}

impl From<i64> for IdentityId {
    fn from(value: i64) -> Self {
        IdentityId::Number(Number::from(value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<IdentityId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            email: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Parameters sent both to the priming endpoint and to the frame.
///
/// Equality is structural: two values built from equal props compare equal
/// even when every map and vector was freshly allocated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Params {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    #[serde(rename = "lang", default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Identity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(rename = "mobile", default = "platform_flag")]
    pub platform_flag: bool,
}

fn platform_flag() -> bool {
    true
}

impl Default for Params {
    fn default() -> Self {
        Self {
            data: None,
            locale: None,
            user: None,
            user_token: None,
            labels: None,
            platform_flag: platform_flag(),
        }
    }
}

/// Configuration inputs of one embed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedProps {
    pub widget: String,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub user: Option<Identity>,
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
    #[serde(default)]
    pub user_token: Option<String>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    /// Opaque styling forwarded to the frame adapter.
    #[serde(default)]
    pub style: Option<Value>,
}

impl EmbedProps {
    pub fn new(widget: impl Into<String>) -> Self {
        Self {
            widget: widget.into(),
            lang: None,
            user: None,
            data: None,
            user_token: None,
            labels: None,
            style: None,
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn with_user(mut self, user: Identity) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_user_token(mut self, token: impl Into<String>) -> Self {
        self.user_token = Some(token.into());
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_style(mut self, style: Value) -> Self {
        self.style = Some(style);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.widget.trim().is_empty() {
            return Err(EmbedError::InvalidProps(
                "widget URI cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn params(&self) -> Params {
        Params {
            data: self.data.clone(),
            locale: self.lang.clone(),
            user: self.user.clone(),
            user_token: self.user_token.clone(),
            labels: self.labels.clone(),
            platform_flag: platform_flag(),
        }
    }

    /// Value whose change requires a fresh priming fetch.
    pub fn priming_key(&self) -> PrimingKey {
        PrimingKey {
            widget: self.widget.clone(),
            params: self.params(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimingKey {
    pub widget: String,
    pub params: Params,
}
