//! Circuit breaker example demonstrating resilience patterns.
//!
//! This example shows how to:
//! - Guard an unreliable dependency with a circuit breaker
//! - Configure a trip policy and timeouts
//! - Handle open circuit rejections
//! - Abandon a slow call without losing its outcome
//!
//! Run with: cargo run --example with_circuit_breaker

use breakwater::operation::MockOperation;
use breakwater::prelude::*;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Circuit Breaker Example ===\n");

    let dependency = MockOperation::new_failing().with_name("unreliable-service");

    let config = CircuitBreakerConfig::default()
        .with_name("unreliable-service")
        .with_trip_policy(ConsecutiveFailures(3))
        .with_open_timeout(Duration::from_secs(2))
        .with_on_state_change(|name, from, to| {
            println!("  >> '{name}' moved from {from} to {to}");
        });

    println!("Circuit Breaker Configuration:");
    println!("  Trip policy: {}", config.trip_policy.describe());
    println!("  Open timeout: {:?}", config.open_timeout);
    println!("  Half-open probes: {}", config.max_half_open_requests);
    println!();

    let breaker = CircuitBreaker::new(config)?;

    println!("Sending requests to trip the circuit...\n");

    for i in 1..=6 {
        println!("Request #{}: Circuit state = {}", i, breaker.state());

        match breaker.call(dependency.clone()).await {
            Ok(value) => println!("  Success: {value}"),
            Err(BreakerError::CircuitOpen { name, retry_after }) => {
                println!("  Circuit OPEN for '{name}', retry in {retry_after:?}");
            }
            Err(e) => println!("  Failed: {e}"),
        }

        let metrics = breaker.metrics();
        println!(
            "  Metrics: {} total, {} success, {} failed, {} consecutive",
            metrics.requests, metrics.successes, metrics.failures, metrics.consecutive_failures
        );
    }

    println!("\n=== Demonstrating Recovery ===\n");

    dependency.set_failing(false);
    println!("Dependency healed, waiting for the open timeout...");
    tokio::time::sleep(Duration::from_millis(2100)).await;

    match breaker.call(dependency.clone()).await {
        Ok(value) => println!("Probe succeeded: {value}"),
        Err(e) => println!("Probe failed: {e}"),
    }
    println!("State after probe: {}", breaker.state());
    println!("Metrics after close: {:?}", breaker.metrics());

    println!("\n=== Demonstrating Cancellation ===\n");

    let slow = MockOperation::new()
        .with_name("slow-service")
        .with_latency(Duration::from_millis(500));
    let token = CancellationToken::new();
    let canceller = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        })
    };

    match breaker.execute(&token, slow.clone()).await {
        Err(BreakerError::Cancelled) => println!("Caller gave up after 50ms"),
        other => println!("Unexpected result: {other:?}"),
    }
    canceller.await?;

    tokio::time::sleep(Duration::from_millis(600)).await;
    println!(
        "Abandoned call completed in the background: {} completion(s), {} recorded request(s)",
        slow.completed_count(),
        breaker.metrics().requests
    );

    println!("\n=== Example Complete ===");
    Ok(())
}
