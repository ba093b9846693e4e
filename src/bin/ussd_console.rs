//! Interactive USSD simulator
//!
//! Plays the gateway against a running server: prints each reply, reads the
//! next input from stdin and posts it. Type `quit` to leave.
//!
//! Usage: `ussd-console [base-url] [phone]`

use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_PHONE: &str = "+254700000000";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GatewayRequest<'a> {
    phone_number: &'a str,
    input: &'a str,
    session_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct GatewayReply {
    message: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    error: String,
}

struct Console {
    agent: ureq::Agent,
    url: String,
    phone: String,
    session_id: String,
}

impl Console {
    fn new(base_url: &str, phone: String) -> Self {
        let base_url = if base_url.starts_with("http://") || base_url.starts_with("https://") {
            base_url.trim_end_matches('/').to_string()
        } else {
            format!("http://{base_url}")
        };

        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(Duration::from_secs(3))
                .timeout_read(Duration::from_secs(10))
                .build(),
            url: format!("{base_url}/api/ussd"),
            phone,
            session_id: new_session_id(),
        }
    }

    fn send(&self, input: &str) -> Result<GatewayReply, Box<dyn std::error::Error>> {
        let request = GatewayRequest {
            phone_number: &self.phone,
            input,
            session_id: &self.session_id,
        };

        match self.agent.post(&self.url).send_json(&request) {
            Ok(response) => Ok(response.into_json()?),
            Err(ureq::Error::Status(code, response)) => {
                let detail = response
                    .into_json::<ErrorReply>()
                    .map(|e| e.error)
                    .unwrap_or_else(|_| "no details".to_string());
                Err(format!("server returned {code}: {detail}").into())
            }
            Err(e) => Err(format!("request to {} failed: {e}", self.url).into()),
        }
    }
}

fn new_session_id() -> String {
    format!("console-{}", uuid::Uuid::new_v4())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let base_url = args.next().unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let phone = args.next().unwrap_or_else(|| DEFAULT_PHONE.to_string());

    let mut console = Console::new(&base_url, phone);
    println!("USSD console for {} via {}", console.phone, console.url);
    println!("Type `quit` to exit.\n");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut input = String::new();

    loop {
        let reply = console.send(&input)?;
        println!("{}\n", reply.message);

        let ended = reply.kind == "END";
        if ended {
            println!("--- session ended, press enter to dial again ---");
        }

        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        if line.trim().eq_ignore_ascii_case("quit") {
            break;
        }

        if ended {
            console.session_id = new_session_id();
            input.clear();
        } else {
            input = line;
        }
    }

    Ok(())
}
