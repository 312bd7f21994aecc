//! Print the generated OpenAPI document as JSON.

use anyhow::Result;
use mentorium::api;

fn main() -> Result<()> {
    let spec = api::openapi();
    println!("{}", serde_json::to_string_pretty(&spec)?);
    Ok(())
}
