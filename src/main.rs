use anyhow::{Context, bail};
use smartsheet_client::{HttpRequest, SmartsheetClient};
use std::env;

const USAGE: &str = "usage: smartsheet <GET|POST|PUT|DELETE> <PATH> [JSON_BODY]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging with LOG_LEVEL environment variable
    // Default to "warn" if not set (only warnings and errors)
    let level = env::var("LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let (method, path, body) = match args.as_slice() {
        [method, path] => (method, path, None),
        [method, path, body] => (method, path, Some(body)),
        _ => bail!(USAGE),
    };

    let method = method
        .to_uppercase()
        .parse::<reqwest::Method>()
        .with_context(|| format!("invalid HTTP method '{}'", method))?;

    let mut request = HttpRequest::new(method, path.as_str());
    if let Some(body) = body {
        let json: serde_json::Value =
            serde_json::from_str(body).context("request body must be valid JSON")?;
        request = request.with_json(&json)?;
    }

    let client = SmartsheetClient::from_env()?;
    let response = client.execute(request).await?;

    let value: serde_json::Value = response.json()?;
    println!("{}", serde_json::to_string_pretty(&value)?);

    Ok(())
}
