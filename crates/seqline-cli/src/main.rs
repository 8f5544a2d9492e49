use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::time::{Duration, sleep};
use tracing_subscriber::EnvFilter;

use seqline_core::{ActionHandler, ActionRegistry, QueueConfig, TaskQueue, TaskQueueBuilder};

/// Greets `arguments[0]`, failing the first `remaining_failures` calls.
struct HelloHandler {
    remaining_failures: AtomicU32,
}

impl HelloHandler {
    fn new(n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
        }
    }
}

#[async_trait]
impl ActionHandler<String, String> for HelloHandler {
    async fn handle(&self, arguments: Vec<Value>) -> Result<String, String> {
        let name = arguments
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| "hello expects a name".to_string())?;

        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(format!("intentional failure (left={left})"));
        }

        sleep(Duration::from_millis(5)).await;
        Ok(format!("Hello, {name}!"))
    }
}

fn build_queue() -> Result<TaskQueue<String, String>, Box<dyn std::error::Error>> {
    let mut registry = ActionRegistry::<String, String>::new();
    registry.register("hello", Arc::new(HelloHandler::new(1)))?;
    registry.register_fn("shout", |arguments: Vec<Value>| async move {
        let text = arguments.first().and_then(Value::as_str).unwrap_or_default();
        Ok(text.to_uppercase())
    })?;

    let config: QueueConfig =
        serde_json::from_str(r#"{ "name": "demo", "expected_actions": ["hello", "shout"] }"#)?;
    let queue = TaskQueueBuilder::from_config(config)
        .registry(Arc::new(registry))
        .build()?;
    Ok(queue)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=seqline_core=debug shows every enqueue / start / settle.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let queue = build_queue()?;

    // (A) FIFO: the slow task is submitted first, so it finishes first.
    let slow = queue.enqueue_fn(
        |_| async {
            sleep(Duration::from_millis(20)).await;
            Ok("slow".to_string())
        },
        None,
    )?;
    let fast = queue.enqueue_named("shout", Some(json!(["fast"])))?;
    let (slow, fast) = tokio::join!(slow, fast);
    println!("fifo: {slow:?} then {fast:?}");

    // (B) A failing task rejects its own handle and the queue keeps going.
    let failing = queue.enqueue_named("hello", Some(json!(["seqline"])))?;
    let second = queue.enqueue_named("hello", Some(json!(["seqline"])))?;
    println!("first hello: {:?}", failing.await);
    println!("second hello: {:?}", second.await);

    // (C) Validation errors are returned before anything is queued.
    if let Err(err) = queue.enqueue_named("missing", None) {
        println!("unknown action: {err}");
    }
    if let Err(err) = queue.enqueue_named("shout", Some(json!("not-an-array"))) {
        println!("bad arguments: {err}");
    }

    queue.idle().await;
    let counts = queue.counts();
    println!("status: {:?}", queue.status());
    println!("settled {} task(s), {} pending", counts.settled(), counts.pending());
    println!("counts: {}", serde_json::to_string(&counts)?);
    Ok(())
}
