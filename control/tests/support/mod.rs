#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fwctl::{Bus, Config, MemoryBus, WriterControl};
use fwctl_common::{Codec, CommandState, CommandStatus, JobState, JobStatus, JsonCodec, Message};
use tokio::task::JoinHandle;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Config with a short poll interval so tests run quickly.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.timing.poll_interval_ms = 20;
    config
}

pub fn connect(bus: &MemoryBus) -> WriterControl {
    connect_with(bus, test_config())
}

pub fn connect_with(bus: &MemoryBus, config: Config) -> WriterControl {
    init_logging();
    WriterControl::connect(Arc::new(bus.clone()), Arc::new(JsonCodec), config)
        .expect("memory bus is reachable")
}

pub fn publish(bus: &MemoryBus, topic: &str, message: Message) {
    let payload = JsonCodec.encode(&message).unwrap();
    bus.publish(topic, payload).unwrap();
}

pub fn decode_all(payloads: Vec<Vec<u8>>) -> Vec<Message> {
    payloads
        .into_iter()
        .map(|payload| JsonCodec.decode(&payload).unwrap())
        .collect()
}

/// Poll `check` until it holds or a second has passed.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

#[derive(Debug, Clone, Copy)]
pub enum Behaviour {
    /// Acknowledge starts and stops, never finish on its own.
    Accept,
    /// Acknowledge the start, then finish writing after the delay.
    AcceptAndFinish(Duration),
    /// Answer start requests with an error.
    RejectStart,
    /// Acknowledge starts, answer every stop command with an error.
    RejectStop,
}

/// A writer that reacts to start and stop commands the way a pool worker
/// does, reporting back on the status topics.
pub fn spawn_worker(bus: &MemoryBus, config: &Config, service_id: &str, behaviour: Behaviour) -> JoinHandle<()> {
    let bus = bus.clone();
    let command_topic = config.bus.command_topic.clone();
    let job_topic = config.bus.job_topic.clone();
    let service_id = service_id.to_string();
    let mut commands = bus
        .subscribe(&[command_topic.clone(), job_topic.clone()])
        .unwrap();

    tokio::spawn(async move {
        while let Some(payload) = commands.recv().await {
            let Ok(message) = JsonCodec.decode(&payload) else {
                continue;
            };
            match message {
                Message::RunStart(start) => match behaviour {
                    Behaviour::RejectStart => {
                        let mut answer = CommandStatus::new(&start.command_id, &start.job_id, CommandState::Error, Utc::now())
                            .with_message("worker busy");
                        answer.service_id = Some(service_id.clone());
                        publish(&bus, &command_topic, Message::CommandStatus(answer));
                    }
                    Behaviour::Accept | Behaviour::AcceptAndFinish(_) | Behaviour::RejectStop => {
                        let status = JobStatus::new(&start.job_id, JobState::Started, Utc::now())
                            .with_service_id(&service_id);
                        publish(&bus, &job_topic, Message::JobStatus(status));

                        if let Behaviour::AcceptAndFinish(delay) = behaviour {
                            let bus = bus.clone();
                            let job_topic = job_topic.clone();
                            let service_id = service_id.clone();
                            tokio::spawn(async move {
                                tokio::time::sleep(delay).await;
                                let status = JobStatus::new(&start.job_id, JobState::Done, Utc::now())
                                    .with_service_id(&service_id);
                                publish(&bus, &job_topic, Message::JobStatus(status));
                            });
                        }
                    }
                },
                Message::StopTime(stop) if matches!(behaviour, Behaviour::RejectStop) => {
                    let answer = CommandStatus::new(&stop.command_id, &stop.job_id, CommandState::Error, Utc::now())
                        .with_message("no such job");
                    publish(&bus, &command_topic, Message::CommandStatus(answer));
                }
                Message::StopTime(stop) => {
                    let answer = CommandStatus::new(&stop.command_id, &stop.job_id, CommandState::Success, Utc::now());
                    publish(&bus, &command_topic, Message::CommandStatus(answer));
                    let status = JobStatus::new(&stop.job_id, JobState::Done, Utc::now()).with_service_id(&service_id);
                    publish(&bus, &job_topic, Message::JobStatus(status));
                }
                _ => {}
            }
        }
    })
}
