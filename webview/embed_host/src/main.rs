use announcekit_embed_host_runtime::config::EmbedConfig;
use announcekit_embed_host_runtime::logging::init_logging;
use announcekit_embed_host_runtime::serde_json::{Map, Value};
use announcekit_embed_host_runtime::shell::run_stdio;
use announcekit_embed_host_runtime::{EmbedProps, HttpPrimingClient, Identity, IdentityId};
use clap::Parser;
use std::process;

/// Embeds an AnnounceKit widget in a native webview shell attached to stdio.
#[derive(Parser, Debug)]
#[command(name = "embed_host", version)]
struct Cli {
    /// Widget URI, e.g. https://announcekit.co/widgets/v2/xxxx
    widget: String,

    #[arg(long)]
    lang: Option<String>,

    /// End user id; numeric ids are sent as numbers.
    #[arg(long)]
    user_id: Option<String>,

    #[arg(long, requires = "user_id")]
    user_name: Option<String>,

    #[arg(long, requires = "user_id")]
    user_email: Option<String>,

    #[arg(long)]
    user_token: Option<String>,

    /// Label filter; repeat for several labels.
    #[arg(long = "label")]
    labels: Vec<String>,

    /// Custom data as a JSON object.
    #[arg(long, value_parser = parse_json_object)]
    data: Option<Map<String, Value>>,

    /// Frame style as JSON, forwarded to the shell untouched.
    #[arg(long, value_parser = parse_json)]
    style: Option<Value>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("embed_host fatal error: {err}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging()?;

    let config = EmbedConfig::from_env();
    tracing::debug!(?config, "resolved embed configuration");

    let client = HttpPrimingClient::new(config.priming_timeout)?;
    run_stdio(cli.into_props(), config, client)?;
    Ok(())
}

impl Cli {
    fn into_props(self) -> EmbedProps {
        let mut props = EmbedProps::new(self.widget);
        props.lang = self.lang;
        props.user_token = self.user_token;
        props.data = self.data;
        props.style = self.style;

        if !self.labels.is_empty() {
            props.labels = Some(self.labels);
        }

        if let Some(id) = self.user_id {
            props.user = Some(Identity {
                id: parse_user_id(id),
                name: self.user_name,
                email: self.user_email,
            });
        }

        props
    }
}

/// Only canonical integers become numeric ids; `007` or `+5` stay text.
fn parse_user_id(raw: String) -> IdentityId {
    match raw.parse::<i64>() {
        Ok(number) if number.to_string() == raw => IdentityId::from(number),
        _ => IdentityId::from(raw),
    }
}

fn parse_json(raw: &str) -> Result<Value, String> {
    announcekit_embed_host_runtime::serde_json::from_str(raw).map_err(|err| err.to_string())
}

fn parse_json_object(raw: &str) -> Result<Map<String, Value>, String> {
    match parse_json(raw)? {
        Value::Object(map) => Ok(map),
        _ => Err("expected a JSON object".to_string()),
    }
}
