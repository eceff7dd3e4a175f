//! joke-mcp - programming jokes over stdio JSON-RPC

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde_json::{json, Value};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use k2so_mcp::{serve_stdio, RpcError, ToolDescriptor, ToolHandler};

struct Joke {
    setup: &'static str,
    punchline: &'static str,
}

const JOKES: &[Joke] = &[
    Joke {
        setup: "Why do programmers prefer dark mode?",
        punchline: "Because light attracts bugs!",
    },
    Joke {
        setup: "Why did the developer go broke?",
        punchline: "Because he used up all his cache!",
    },
    Joke {
        setup: "How many programmers does it take to change a light bulb?",
        punchline: "None. It's a hardware problem!",
    },
    Joke {
        setup: "Why do Java developers wear glasses?",
        punchline: "Because they don't C#!",
    },
    Joke {
        setup: "What's a programmer's favorite hangout place?",
        punchline: "Foo Bar!",
    },
    Joke {
        setup: "Why did the Kubernetes pod go to therapy?",
        punchline: "It had too many container issues!",
    },
    Joke {
        setup: "What do you call a developer who doesn't comment their code?",
        punchline: "A job security expert!",
    },
    Joke {
        setup: "Why was the JavaScript developer sad?",
        punchline: "Because he didn't Node how to Express himself!",
    },
];

struct JokeServer;

fn joke_by_index(arguments: &Value) -> Result<Value, RpcError> {
    let out_of_range = || RpcError::invalid_params(format!("Index must be 0-{}", JOKES.len() - 1));

    let index = match arguments.get("index") {
        None | Some(Value::Null) => 0,
        Some(v) => v
            .as_u64()
            .and_then(|i| usize::try_from(i).ok())
            .ok_or_else(out_of_range)?,
    };

    let joke = JOKES.get(index).ok_or_else(out_of_range)?;
    Ok(json!({
        "setup": joke.setup,
        "punchline": joke.punchline,
        "index": index,
    }))
}

#[async_trait]
impl ToolHandler for JokeServer {
    fn server_name(&self) -> &str {
        "joke"
    }

    fn server_version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new(
                "get_random_joke",
                "Get a random programming joke",
                json!({ "type": "object", "properties": {} }),
            ),
            ToolDescriptor::new(
                "get_joke_by_index",
                format!("Get a specific joke by index (0-{})", JOKES.len() - 1),
                json!({
                    "type": "object",
                    "properties": {
                        "index": {
                            "type": "integer",
                            "description": "Joke index",
                            "minimum": 0,
                            "maximum": JOKES.len() - 1
                        }
                    },
                    "required": ["index"]
                }),
            ),
            ToolDescriptor::new(
                "count_jokes",
                "Get the total number of jokes",
                json!({ "type": "object", "properties": {} }),
            ),
        ]
    }

    async fn call(&self, tool: &str, arguments: &Value) -> Result<Value, RpcError> {
        debug!(tool = %tool, "Tool call");
        match tool {
            "get_random_joke" => {
                let joke = JOKES
                    .choose(&mut rand::thread_rng())
                    .ok_or_else(|| RpcError::internal("No jokes available"))?;
                Ok(json!({ "setup": joke.setup, "punchline": joke.punchline }))
            }
            "get_joke_by_index" => joke_by_index(arguments),
            "count_jokes" => Ok(json!({ "total_jokes": JOKES.len() })),
            other => Err(RpcError::method_not_found(format!("Unknown tool: {}", other))),
        }
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    serve_stdio(&JokeServer).await
}
