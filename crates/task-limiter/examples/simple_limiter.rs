use std::time::Duration;
use task_limiter::Limiter;

#[tokio::main]
async fn main() {
    println!("Simple Limiter Example\n");

    // At most 3 tasks hold a slot at any moment
    let limiter = Limiter::builder()
        .capacity(3)
        .name("fetcher")
        .on_slot_acquired(|in_use, waited| {
            println!("slot acquired: {} in use, waited {:?}", in_use, waited);
        })
        .build();

    for i in 1..=8 {
        limiter.submit(async move {
            println!("Fetching item {}", i);
            tokio::time::sleep(Duration::from_millis(100)).await;
        });
    }

    println!("Submitted 8 tasks, {} outstanding", limiter.outstanding());

    limiter.join().await;

    println!("\nAll tasks completed!");
}
