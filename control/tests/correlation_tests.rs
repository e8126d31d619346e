mod support;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use fwctl::{Bus, CommandOutcome, ControlError, MemoryBus, WriterControl};
use fwctl_common::{
    CommandState, CommandStatus, JobState, JobStatus, JsonCodec, Message, WorkerState, WorkerStatus,
};
use support::{connect, eventually, publish, test_config};

#[tokio::test]
async fn test_stop_time_answered_through_ingress() {
    let bus = MemoryBus::new();
    let control = connect(&bus);
    let config = control.config().clone();

    let handle = control
        .dispatcher()
        .send_stop_time(None, "job-1", Utc::now())
        .unwrap();
    assert!(!handle.is_done());

    let answer = CommandStatus::new(handle.command_id(), "job-1", CommandState::Success, Utc::now());
    publish(&bus, &config.bus.command_topic, Message::CommandStatus(answer));

    assert!(eventually(|| handle.is_done()).await);
    let started = Instant::now();
    assert_eq!(handle.wait(Duration::from_secs(1)).await, CommandOutcome::Success);
    assert!(started.elapsed() < Duration::from_millis(100));

    control.shutdown().await;
}

#[tokio::test]
async fn test_unanswered_command_times_out() {
    let bus = MemoryBus::new();
    let control = connect(&bus);

    let handle = control.dispatcher().send_abort(None, "job-1").unwrap();

    let started = Instant::now();
    assert_eq!(handle.wait(Duration::from_millis(200)).await, CommandOutcome::Timeout);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(200), "returned early: {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(500), "overshot: {:?}", elapsed);

    // Timing out is local: the command is still pending
    assert!(!handle.is_done());
    assert_eq!(handle.state(), Some(CommandState::Pending));

    control.shutdown().await;
}

#[tokio::test]
async fn test_rejected_command_is_distinct_from_timeout() {
    let bus = MemoryBus::new();
    let control = connect(&bus);
    let topic = control.config().bus.command_topic.clone();

    let handle = control.dispatcher().send_abort(Some("writer-a"), "job-7").unwrap();
    let answer = CommandStatus::new(handle.command_id(), "job-7", CommandState::Error, Utc::now())
        .with_message("unknown job");
    publish(&bus, &topic, Message::CommandStatus(answer));

    assert_eq!(handle.wait(Duration::from_secs(1)).await, CommandOutcome::Error);
    assert_eq!(handle.message().as_deref(), Some("unknown job"));

    control.shutdown().await;
}

#[tokio::test]
async fn test_abort_serializes_as_stop_at_epoch() {
    let bus = MemoryBus::new();
    let control = connect(&bus);
    let topic = control.config().bus.command_topic.clone();

    let handle = control.dispatcher().send_abort(Some("writer-a"), "job-1").unwrap();
    let expected = control
        .dispatcher()
        .encode_stop_time(Some("writer-a"), "job-1", handle.command_id(), DateTime::<Utc>::UNIX_EPOCH)
        .unwrap();

    assert_eq!(bus.published_on(&topic), vec![expected]);

    control.shutdown().await;
}

#[tokio::test]
async fn test_unknown_job_is_unavailable() {
    let bus = MemoryBus::new();
    let control = connect(&bus);

    assert_eq!(control.registry().get_job_state("unknown-id"), JobState::Unavailable);
    assert!(control.registry().get_job_status("unknown-id").is_none());

    control.shutdown().await;
}

#[tokio::test]
async fn test_out_of_order_status_over_the_bus() {
    let bus = MemoryBus::new();
    let control = connect(&bus);
    let topic = control.config().bus.job_topic.clone();
    let now = Utc::now();

    publish(&bus, &topic, Message::JobStatus(JobStatus::new("job-1", JobState::Done, now)));
    publish(
        &bus,
        &topic,
        Message::JobStatus(JobStatus::new("job-1", JobState::Writing, now - chrono::Duration::seconds(2))),
    );
    publish(
        &bus,
        &topic,
        Message::JobStatus(JobStatus::new("job-1", JobState::Started, now - chrono::Duration::seconds(3))),
    );

    let registry = control.registry().clone();
    let processed = control.shutdown().await;
    assert_eq!(processed, 3);
    assert_eq!(registry.get_job_state("job-1"), JobState::Done);
}

#[tokio::test]
async fn test_garbage_does_not_stop_ingestion() {
    let bus = MemoryBus::new();
    let control = connect(&bus);
    let topic = control.config().bus.command_topic.clone();

    bus.publish(&topic, b"definitely not a status".to_vec()).unwrap();
    bus.publish(&topic, br#"{"schema":"f144","value":3}"#.to_vec()).unwrap();
    publish(
        &bus,
        &topic,
        Message::WorkerStatus(WorkerStatus::new("writer-a", WorkerState::Idle, Utc::now())),
    );

    let registry = control.registry().clone();
    assert!(eventually(|| registry.get_worker("writer-a").is_some()).await);
    assert_eq!(control.metrics().decode_failures(), 2);
    assert_eq!(control.metrics().ingested("x5f2"), 1);

    control.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_drains_buffered_messages() {
    let bus = MemoryBus::new();
    let control = connect(&bus);
    let topic = control.config().bus.job_topic.clone();

    for i in 0..50 {
        let status = JobStatus::new(format!("job-{}", i), JobState::Writing, Utc::now());
        publish(&bus, &topic, Message::JobStatus(status));
    }

    let registry = control.registry().clone();
    assert_eq!(control.shutdown().await, 50);
    assert_eq!(registry.job_count(), 50);
}

#[tokio::test]
async fn test_listing_known_entries() {
    let bus = MemoryBus::new();
    let control = connect(&bus);
    let config = control.config().clone();

    publish(
        &bus,
        &config.bus.command_topic,
        Message::WorkerStatus(WorkerStatus::new("writer-a", WorkerState::Writing, Utc::now())),
    );
    publish(
        &bus,
        &config.bus.job_topic,
        Message::JobStatus(JobStatus::new("job-1", JobState::Writing, Utc::now())),
    );
    control.dispatcher().send_abort(None, "job-1").unwrap();

    let registry = control.registry().clone();
    assert!(eventually(|| registry.list_known_jobs().len() == 1).await);
    assert!(eventually(|| registry.list_known_workers().len() == 1).await);
    // The abort itself is seen on the command topic but ignored by ingress
    assert_eq!(registry.list_known_commands().len(), 1);

    control.shutdown().await;
}

#[tokio::test]
async fn test_connect_fails_without_broker() {
    let bus = MemoryBus::new();
    bus.set_reachable(false);

    let result = WriterControl::connect(Arc::new(bus), Arc::new(JsonCodec), test_config());
    assert!(matches!(result, Err(ControlError::BusUnreachable(_))));
}
