//! Probe: backend envelope shape
//!
//! POSTs /sys/info (no auth) and /customer/info (login challenge) and documents:
//! - Status and latency over several requests
//! - Envelope fields (`code`, `data`, `msg`) and the shape of `data`
//! - What an unauthenticated call to a protected endpoint returns

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use serde_json::Value;

use wallet_monitor::config::{AppConfig, CONFIG_PATH};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::load_or_default(Path::new(CONFIG_PATH))?;
    let base = config.api.base_url.trim_end_matches('/').to_string();
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.api.timeout_secs))
        .build()?;

    println!("=== Probe: backend envelope ===");
    println!("Base: {base}");
    println!();

    // 1. System info, repeated for latency
    println!("--- 1. /sys/info ---");
    let mut latencies = Vec::new();
    let mut last: Option<Value> = None;
    for _ in 0..3 {
        let start = Instant::now();
        let resp = client
            .post(format!("{base}/sys/info"))
            .header("Authorization", "Bearer ")
            .send()
            .await?;
        latencies.push(start.elapsed());
        let status = resp.status();
        let body: Value = resp.json().await?;
        println!("Status: {status}");
        last = Some(body);
    }
    println!("Latencies: {latencies:?}");
    if let Some(body) = &last {
        describe_envelope(body);
    }
    println!();

    // 2. Login challenge
    println!("--- 2. /customer/info ---");
    let resp = client
        .post(format!("{base}/customer/info"))
        .header("Authorization", "Bearer ")
        .send()
        .await?;
    println!("Status: {}", resp.status());
    let body: Value = resp.json().await?;
    describe_envelope(&body);
    println!();

    // 3. Protected endpoint without a credential
    println!("--- 3. /customer/listCustomerChannels (no credential) ---");
    let resp = client
        .post(format!("{base}/customer/listCustomerChannels"))
        .header("Authorization", "Bearer ")
        .send()
        .await?;
    println!("Status: {}", resp.status());
    let body: Value = resp.json().await.unwrap_or(Value::Null);
    describe_envelope(&body);
    println!(
        "Configured session-expired code: {}",
        config.api.session_expired_code
    );

    Ok(())
}

fn describe_envelope(body: &Value) {
    let Some(obj) = body.as_object() else {
        println!("Response is not an object:");
        println!("{}", serde_json::to_string_pretty(body).unwrap_or_default());
        return;
    };
    println!("code: {}", obj.get("code").unwrap_or(&Value::Null));
    println!("msg:  {}", obj.get("msg").unwrap_or(&Value::Null));
    match obj.get("data") {
        Some(Value::Object(data)) => {
            println!("data fields:");
            for key in data.keys() {
                println!("  - {key}");
            }
        }
        Some(Value::Array(items)) => println!("data: array of {}", items.len()),
        Some(other) => println!("data: {other}"),
        None => println!("data: <absent>"),
    }
}
