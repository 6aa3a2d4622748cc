//! Scripted shard runner.
//!
//! Returns pre-programmed exit codes per `(shard_key, attempt)` without
//! touching the filesystem or spawning anything, so worker-loop scenarios
//! are deterministic.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sfb_schemas::shard::ShardDoc;
use sfb_worker::runner::ShardRunner;

pub struct ScriptedRunner {
    exits: Mutex<HashMap<(String, u32), i32>>,
    default_exit: i32,
    invocations: Mutex<Vec<(String, u32)>>,
}

impl ScriptedRunner {
    /// All unscripted invocations exit with `default_exit`.
    pub fn new(default_exit: i32) -> Self {
        Self {
            exits: Mutex::new(HashMap::new()),
            default_exit,
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Program the exit code for one specific attempt of one shard.
    pub fn script(&self, shard_key: &str, attempt: u32, exit_code: i32) {
        self.exits
            .lock()
            .unwrap()
            .insert((shard_key.to_string(), attempt), exit_code);
    }

    /// `(shard_key, attempt)` pairs in execution order.
    pub fn invocations(&self) -> Vec<(String, u32)> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl ShardRunner for ScriptedRunner {
    async fn run(&self, shard: &ShardDoc) -> anyhow::Result<i32> {
        let call = (shard.shard_key.clone(), shard.attempt);
        self.invocations.lock().unwrap().push(call.clone());
        Ok(*self
            .exits
            .lock()
            .unwrap()
            .get(&call)
            .unwrap_or(&self.default_exit))
    }
}
