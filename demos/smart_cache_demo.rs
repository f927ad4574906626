//! tiercache walkthrough
//!
//! Exercises the public API end to end: tiered reads and writes, promotion, TTLs,
//! compression, tags, warmup, prefetch and the performance report.
//!
//! Run with `RUST_LOG=debug cargo run --example smart_cache_demo` to see cache logs.

use std::time::Duration;

use tiercache::prelude::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Session {
    user: String,
    roles: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    println!("tiercache smart cache demo");
    println!("==========================\n");

    let cache = SmartCache::builder()
        .cache_id("smart_cache_demo")
        .tiers(vec![
            TierConfig::memory(1_000, 16 * 1024 * 1024).named("hot"),
            TierConfig::worker(10_000, 64 * 1024 * 1024).named("warm"),
        ])
        .compression_threshold(4 * 1024)
        .adaptation_interval(Duration::from_secs(1))
        .loader(|key: String| async move {
            Ok::<_, CacheOperationError>(CacheValue::from(format!("loaded:{}", key)))
        })
        .build()
        .await?;

    basic_operations(&cache).await?;
    tiers_and_expiry(&cache).await?;
    typed_and_tagged(&cache).await?;
    warmup_and_prefetch(&cache).await?;
    report(&cache)?;

    cache.cleanup();
    println!("\nDone.");
    Ok(())
}

async fn basic_operations(cache: &SmartCache) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    println!("BASIC OPERATIONS");
    println!("----------------");

    cache.set("greeting", "hello").await?;
    let greeting = cache.get("greeting").await?;
    println!("get(greeting) -> {:?}", greeting);

    let blob = CacheValue::Bytes(b"compressible ".repeat(2_000));
    cache.set("blob", blob.clone()).await?;
    assert_eq!(cache.get("blob").await?, Some(blob));
    println!("16 KiB blob round-tripped, compressions = {}", cache.stats().compressions);

    println!("delete(greeting) -> {}", cache.delete("greeting").await?);
    println!("get(greeting) -> {:?}\n", cache.get("greeting").await?);
    Ok(())
}

async fn tiers_and_expiry(cache: &SmartCache) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    println!("TIERS AND EXPIRY");
    println!("----------------");

    cache
        .set_with("cold-start", "from the warm tier", SetOptions::new().level(1))
        .await?;
    cache.get("cold-start").await?;
    let promoted = cache
        .system()
        .tier(0)
        .is_some_and(|tier| tier.contains("cold-start"));
    println!("hit in tier 1 promoted to tier 0: {}", promoted);

    cache
        .set_with("flash", "gone soon", SetOptions::new().ttl(Duration::from_millis(100)))
        .await?;
    println!("before ttl: {:?}", cache.get("flash").await?);
    tokio::time::sleep(Duration::from_millis(150)).await;
    println!("after ttl: {:?}\n", cache.get("flash").await?);
    Ok(())
}

async fn typed_and_tagged(cache: &SmartCache) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    println!("TYPED VALUES AND TAGS");
    println!("---------------------");

    let session = Session {
        user: "ada".to_string(),
        roles: vec!["admin".to_string()],
    };
    cache
        .set_typed("session:ada", &session, SetOptions::new().tag("sessions").priority(5))
        .await?;
    let restored: Option<Session> = cache.get_typed("session:ada").await?;
    println!("typed round trip: {:?}", restored);

    println!("invalidate_tag(sessions) -> {}", cache.invalidate_tag("sessions").await);
    println!("contains session:ada -> {}\n", cache.contains_key("session:ada"));
    Ok(())
}

async fn warmup_and_prefetch(cache: &SmartCache) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    println!("WARMUP AND PREFETCH");
    println!("-------------------");

    let items = (0..50)
        .map(|i| WarmupItem::new(format!("item:{}", i), format!("value {}", i)))
        .collect();
    println!("warmup stored {} item(s)", cache.warmup(items).await);

    // a steady access rhythm lets the predictor forecast the next read
    for _ in 0..12 {
        cache.get("item:7").await?;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    cache.delete("item:7").await?;

    let loader = |key: String| async move {
        if key.ends_with('7') {
            Ok(CacheValue::from("refetched"))
        } else {
            Err(CacheOperationError::loader_failed(format!("no source for {}", key)))
        }
    };
    let stored = cache.prefetch(["item:7", "item:8"], &loader).await;
    println!("prefetch stored {} item(s)\n", stored);
    Ok(())
}

fn report(cache: &SmartCache) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    println!("PERFORMANCE REPORT");
    println!("------------------");
    let report = cache.performance_report();
    println!("strategy: {}", report.current_strategy);
    println!("{}", report.to_json()?);
    Ok(())
}
