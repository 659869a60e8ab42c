use crate::error::Result;
use crate::params::Params;
use serde::Serialize;
use serde_json::{Value, json};

pub const FRAME_VIEW_PATH: &str = "/view?react-native";
pub const FRAME_FORM_FIELD: &str = "json-body";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Runs once the frame document first paints. Safe to run repeatedly.
pub const BOOTSTRAP_SCRIPT: &str = r#"(function () {
  var head = document.getElementsByTagName('head')[0];
  if (!head) { return; }
  var tag = head.querySelector('meta[name="viewport"]');
  if (!tag) {
    tag = document.createElement('meta');
    tag.name = 'viewport';
    head.appendChild(tag);
  }
  tag.content = 'width=device-width, initial-scale=1, maximum-scale=1';
})();"#;

/// Everything a content frame adapter needs to load the widget document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSource {
    pub uri: String,
    pub method: String,
    pub body: String,
    pub headers: Vec<(String, String)>,
    pub bootstrap_script: String,
    pub options: FrameOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameOptions {
    pub allows_inline_media_playback: bool,
    pub origin_whitelist: Vec<String>,
    pub container_style: Value,
    pub style: Option<Value>,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            allows_inline_media_playback: true,
            origin_whitelist: vec!["*".to_string()],
            container_style: json!({
                "width": "100%",
                "height": "100%",
                "borderTopRightRadius": 10,
                "borderTopLeftRadius": 10,
            }),
            style: None,
        }
    }
}

pub fn frame_uri(widget: &str) -> String {
    format!("{widget}{FRAME_VIEW_PATH}")
}

pub fn form_body(params: &Params) -> Result<String> {
    let encoded = serde_json::to_string(params)?;
    Ok(format!(
        "{FRAME_FORM_FIELD}={}",
        urlencoding::encode(&encoded)
    ))
}

pub fn build_frame_source(
    widget: &str,
    params: &Params,
    style: Option<&Value>,
) -> Result<FrameSource> {
    Ok(FrameSource {
        uri: frame_uri(widget),
        method: "POST".to_string(),
        body: form_body(params)?,
        headers: vec![("content-type".to_string(), FORM_CONTENT_TYPE.to_string())],
        bootstrap_script: BOOTSTRAP_SCRIPT.to_string(),
        options: FrameOptions {
            style: style.cloned(),
            ..FrameOptions::default()
        },
    })
}
