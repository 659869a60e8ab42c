use crate::error::Result;
use crate::params::Params;
use crate::state_sync::Snapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request payload that asks the host to close the embed.
pub const CLOSE_REQUEST: &str = "close";

const POST_MESSAGE_PREFIX: &str = "window.postMessage(";
const POST_MESSAGE_SUFFIX: &str = ", \"*\");";

/// Host to frame messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum HostMessage {
    #[serde(rename = "R2L_INIT")]
    Init { params: Params },
}

/// Frame to host messages. Kinds outside this set fail to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum FrameMessage {
    #[serde(rename = "L2R_REQUEST")]
    Request(Value),

    #[serde(rename = "L2R_STATE")]
    State(Snapshot),

    #[serde(rename = "L2R_PATCH_STATE")]
    PatchState(Snapshot),
}

impl FrameMessage {
    pub fn is_close_request(&self) -> bool {
        matches!(self, FrameMessage::Request(Value::String(kind)) if kind == CLOSE_REQUEST)
    }
}

pub fn init_message(params: Params) -> HostMessage {
    HostMessage::Init { params }
}

pub fn encode_host_message(message: &HostMessage) -> Result<String> {
    Ok(serde_json::to_string(message)?)
}

/// Builds the script that posts `message` to the frame as a message object
/// with a wildcard target origin.
///
/// JSON text is a valid script expression once U+2028/U+2029 are escaped.
pub fn post_message_script(message: &HostMessage) -> Result<String> {
    let literal = encode_host_message(message)?
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029");
    Ok(format!("{POST_MESSAGE_PREFIX}{literal}{POST_MESSAGE_SUFFIX}"))
}

/// Recovers the message carried by a script built with [`post_message_script`].
pub fn parse_post_message_script(script: &str) -> Option<HostMessage> {
    let literal = script
        .trim()
        .strip_prefix(POST_MESSAGE_PREFIX)?
        .strip_suffix(POST_MESSAGE_SUFFIX)?;
    serde_json::from_str(literal).ok()
}

/// Decodes one inbound event payload; `None` means "ignore".
pub fn decode_frame_message(raw: &str) -> Option<FrameMessage> {
    match serde_json::from_str::<FrameMessage>(raw) {
        Ok(message) => Some(message),
        Err(err) => {
            tracing::debug!(error = %err, "dropping undecodable frame message");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{EmbedProps, Identity};
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn init_uses_event_and_payload_fields() {
        let params = EmbedProps::new("https://w").with_lang("en").params();
        let encoded = encode_host_message(&init_message(params)).expect("encode init");
        let value: Value = serde_json::from_str(&encoded).expect("parse encoded json");
        assert_eq!(value["event"], "R2L_INIT");
        assert_eq!(value["payload"]["params"]["lang"], "en");
        assert_eq!(value["payload"]["params"]["mobile"], true);
    }

    #[test]
    fn script_posts_an_object_with_wildcard_origin() {
        let script =
            post_message_script(&init_message(Params::default())).expect("build script");
        assert_eq!(
            script,
            r#"window.postMessage({"event":"R2L_INIT","payload":{"params":{"mobile":true}}}, "*");"#
        );
    }

    #[test]
    fn script_escapes_line_separators() {
        let params = EmbedProps::new("https://w")
            .with_user(Identity::new("u1").with_name("a\u{2028}b\u{2029}c"))
            .params();
        let message = init_message(params);
        let script = post_message_script(&message).expect("build script");
        assert!(!script.contains('\u{2028}'));
        assert!(!script.contains('\u{2029}'));
        assert_eq!(parse_post_message_script(&script), Some(message));
    }

    #[test]
    fn decodes_each_frame_kind() {
        let request = decode_frame_message(r#"{"event":"L2R_REQUEST","payload":"close"}"#)
            .expect("decode request");
        assert!(request.is_close_request());

        let state = decode_frame_message(r#"{"event":"L2R_STATE","payload":{"posts":[]}}"#)
            .expect("decode state");
        match state {
            FrameMessage::State(snapshot) => assert_eq!(snapshot["posts"], json!([])),
            other => panic!("expected state, got {other:?}"),
        }

        let patch =
            decode_frame_message(r#"{"event":"L2R_PATCH_STATE","payload":{"unread":3}}"#)
                .expect("decode patch");
        match patch {
            FrameMessage::PatchState(partial) => assert_eq!(partial["unread"], 3),
            other => panic!("expected patch, got {other:?}"),
        }
    }

    #[test]
    fn other_request_payloads_are_not_close() {
        let request = decode_frame_message(r#"{"event":"L2R_REQUEST","payload":"open"}"#)
            .expect("decode request");
        assert!(!request.is_close_request());
        let nested = decode_frame_message(r#"{"event":"L2R_REQUEST","payload":{"close":true}}"#)
            .expect("decode request");
        assert!(!nested.is_close_request());
    }

    #[test]
    fn malformed_and_unknown_payloads_decode_to_none() {
        assert_eq!(decode_frame_message("not json"), None);
        assert_eq!(decode_frame_message(r#"{"event":"L2R_RESIZE","payload":{}}"#), None);
        assert_eq!(decode_frame_message(r#"{"event":"L2R_STATE","payload":[1,2]}"#), None);
        assert_eq!(decode_frame_message(r#"{"event":"R2L_INIT","payload":{"params":{}}}"#), None);
        assert_eq!(decode_frame_message(r#"{"payload":"close"}"#), None);
    }

    #[test]
    fn foreign_scripts_are_not_parsed() {
        assert_eq!(parse_post_message_script("alert(1)"), None);
        assert_eq!(parse_post_message_script("window.postMessage({}, \"*\");"), None);
        let stringified = r#"window.postMessage("{\"event\":\"R2L_INIT\",\"payload\":{\"params\":{\"mobile\":true}}}", "*");"#;
        assert_eq!(parse_post_message_script(stringified), None);
    }

    proptest! {
        #[test]
        fn injected_init_decodes_to_the_sent_message(
            lang in ".*",
            name in ".*",
            token in "[ -~]{0,32}",
            labels in proptest::collection::vec(".*", 0..4),
            count in any::<i64>(),
        ) {
            let mut data = serde_json::Map::new();
            data.insert("count".to_string(), json!(count));
            data.insert("note".to_string(), json!(name.clone()));
            let params = EmbedProps::new("https://w")
                .with_lang(lang)
                .with_user(Identity::new(count).with_name(name))
                .with_user_token(token)
                .with_labels(labels)
                .with_data(data)
                .params();
            let message = init_message(params);
            let script = post_message_script(&message).expect("build script");
            prop_assert_eq!(parse_post_message_script(&script), Some(message));
        }
    }
}
