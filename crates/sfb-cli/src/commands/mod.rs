pub mod completion;
pub mod lock;
pub mod queue;
pub mod worker;

use anyhow::Result;
use serde_json::Value;

/// Print one compact JSON object to stdout.
pub fn emit(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
