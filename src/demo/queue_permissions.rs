// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use futures_util::StreamExt as _;
use tokio::{task::JoinHandle, time};

use crate::{
    connection::{payload_text, Credentials, Settings},
    error::Result,
    report::Report,
};

use super::{check_subscribe, connect};

pub(super) const PORT: u16 = 4225;
pub(super) const CONFIG_FILE: &str = "queue-permissions.conf";

const DISTRIBUTED_MESSAGES: usize = 10;
const WORKER_QUEUE: &str = "v1.dev";

fn spawn_worker(id: usize, mut subscriber: async_nats::Subscriber, count: Arc<AtomicUsize>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = subscriber.next().await {
            _ = count.fetch_add(1, Ordering::SeqCst);
            println!("  Worker {id} received message: {}", payload_text(&message));
        }
    })
}

pub(super) async fn run(settings: &Settings) -> Result<Report> {
    let mut report = Report::new("Queue Permissions");

    report.section("1. Testing Queue-Only User:");
    let Some(queue_only) = connect(
        &mut report,
        settings,
        "queue_only",
        PORT,
        Credentials::user_password("queue_only", "queue123"),
    )
    .await
    else {
        return Ok(report);
    };
    check_subscribe(
        &mut report,
        "Queue-only subscribed to 'foo' with queue group 'queue'",
        queue_only.queue_subscribe("foo", "queue").await,
    )
    .await;
    report.expect_denied(
        "Queue-only denied plain subscription to 'foo'",
        queue_only.subscribe("foo").await,
    );
    report.expect_denied(
        "Queue-only denied subscription to 'foo' with queue 'other'",
        queue_only.queue_subscribe("foo", "other").await,
    );

    report.section("2. Testing Queue-Restricted User:");
    let Some(restricted) = connect(
        &mut report,
        settings,
        "queue_restricted",
        PORT,
        Credentials::user_password("queue_restricted", "queue456"),
    )
    .await
    else {
        return Ok(report);
    };
    check_subscribe(
        &mut report,
        "Queue-restricted subscribed to 'foo' (plain)",
        restricted.subscribe("foo").await,
    )
    .await;
    for queue in ["v1", "v1.dev", "test.dev"] {
        check_subscribe(
            &mut report,
            &format!("Queue-restricted subscribed to 'foo' with queue '{queue}'"),
            restricted.queue_subscribe("foo", queue).await,
        )
        .await;
    }
    report.expect_denied(
        "Queue-restricted denied subscription to 'foo' with queue 'v1.prod'",
        restricted.queue_subscribe("foo", "v1.prod").await,
    );
    report.expect_denied(
        "Queue-restricted denied subscription to 'bar' with queue 'test.prod'",
        restricted.queue_subscribe("bar", "test.prod").await,
    );

    report.section("3. Demonstrating Queue Distribution:");
    let Some(publisher) = connect(&mut report, settings, "publisher", PORT, Credentials::Anonymous).await
    else {
        return Ok(report);
    };

    let counts = [Arc::new(AtomicUsize::new(0)), Arc::new(AtomicUsize::new(0))];
    let mut workers = Vec::with_capacity(counts.len());
    for (i, count) in counts.iter().enumerate() {
        if let Some(subscriber) = report.expect_allowed(
            &format!("Worker {} joined queue '{WORKER_QUEUE}' on 'foo'", i + 1),
            restricted.queue_subscribe("foo", WORKER_QUEUE).await,
        ) {
            workers.push(spawn_worker(i + 1, subscriber, Arc::clone(count)));
        }
    }
    if workers.len() != counts.len() {
        workers.iter().for_each(JoinHandle::abort);
        return Ok(report);
    }

    println!("  Publishing {DISTRIBUTED_MESSAGES} messages to 'foo'...");
    let mut published = Ok(());
    for i in 1..=DISTRIBUTED_MESSAGES {
        published = publisher.publish("foo", &format!("Message {i}")).await;
        if published.is_err() {
            break;
        }
    }
    let published = report
        .expect_allowed(&format!("Published {DISTRIBUTED_MESSAGES} messages to 'foo'"), published)
        .is_some();

    let delivered = || counts.iter().map(|c| c.load(Ordering::SeqCst)).sum::<usize>();
    let deadline = time::Instant::now() + settings.timeout;
    while published && delivered() < DISTRIBUTED_MESSAGES && time::Instant::now() < deadline {
        time::sleep(settings.settle / 10).await;
    }
    // Anything beyond the expected count would show up during this pause.
    time::sleep(settings.settle).await;
    workers.iter().for_each(JoinHandle::abort);

    let [first, second] = counts.map(|c| c.load(Ordering::SeqCst));
    println!("\n  Distribution: Worker 1 = {first} messages, Worker 2 = {second} messages");
    if published {
        report.expect_true(
            "Messages distributed across queue group members, each delivered once",
            first + second == DISTRIBUTED_MESSAGES,
            format!("{} of {DISTRIBUTED_MESSAGES} delivered", first + second),
        );
    }

    report.finish();
    Ok(report)
}
