//! the `run` workload: producers and a broadcaster feeding per-channel consumers, all on one
//! cooperative scheduler

use std::{
    path::Path,
    time::{Duration, Instant},
};

use anyhow::Result;
use corobus::{Bus, BusConfig, BusError, Handle, Message};
use serde::Deserialize;
use tokio::task::{spawn_local, yield_now};

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub bus: BusConfig,
    pub workload: Workload,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Workload {
    /// channels to open
    pub channels: usize,
    /// capacity of each channel
    pub capacity: usize,
    /// producers per channel
    pub producers: u32,
    /// messages per producer
    pub messages: u32,
    /// max messages moved per batched call
    pub batch: usize,
    /// messages broadcast to every channel
    pub broadcasts: u32,
}

impl Config {
    pub fn parse(src: &str) -> Result<Self> {
        let cfg: Self = config::Config::builder()
            .add_source(config::File::from_str(src, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn example() -> Result<Self> {
        Self::parse(include_str!("../corobus.example.toml"))
    }

    fn validate(&self) -> Result<()> {
        let w = &self.workload;
        if w.channels == 0 {
            bail!("workload.channels must be at least 1");
        }
        if w.capacity == 0 {
            bail!("workload.capacity must be at least 1 (nothing can ever be sent to a zero capacity channel)");
        }
        if w.batch == 0 {
            bail!("workload.batch must be at least 1");
        }
        if self.bus.max_channels.is_some_and(|max| max < w.channels) {
            bail!(
                "workload.channels ({}) is more than bus.max_channels allows",
                w.channels
            );
        }
        if w.producers.checked_mul(w.messages).is_none() {
            bail!("workload.producers * workload.messages does not fit in a message");
        }
        Ok(())
    }
}

pub fn load(path: &Path) -> Result<Config> {
    info!("Reading configuration from {:?}", path);
    if !path.exists() {
        error!("Configuration file does not exist!");
        bail!("Configuration file does not exist!");
    }
    let buf = std::fs::read_to_string(path)?;
    Config::parse(&buf)
}

#[derive(Debug)]
pub struct Report {
    pub channels: usize,
    /// messages received, over all channels
    pub received: u64,
    pub elapsed: Duration,
}

#[derive(Debug)]
struct ConsumerReport {
    channel: Handle,
    received: u64,
    sum: u64,
}

/// runs the workload. must be called from inside a `LocalSet`
pub async fn run(cfg: Config) -> Result<Report> {
    let Workload {
        channels,
        capacity,
        producers,
        messages,
        batch,
        broadcasts,
    } = cfg.workload;
    let bus = Bus::with_config(cfg.bus);
    debug!("bus limits: {:?}", bus.config());
    let handles = (0..channels)
        .map(|_| bus.open(capacity))
        .collect::<Result<Vec<_>, _>>()?;
    info!(
        "opened {channels} channel(s), {producers} producer(s) each, {} message(s) per channel",
        u64::from(producers) * u64::from(messages) + u64::from(broadcasts)
    );

    let expected_count = u64::from(producers) * u64::from(messages) + u64::from(broadcasts);
    let expected_sum = (0..producers * messages).map(u64::from).sum::<u64>()
        + (0..broadcasts).map(u64::from).sum::<u64>();

    let start = Instant::now();
    let (report_tx, report_rx) = flume::unbounded();
    let mut tasks = Vec::new();
    for &ch in &handles {
        for p in 0..producers {
            tasks.push(spawn_local(producer(
                bus.clone(),
                ch,
                p * messages,
                messages,
                batch,
            )));
        }
        tasks.push(spawn_local(consumer(
            bus.clone(),
            ch,
            expected_count,
            batch,
            report_tx.clone(),
        )));
    }
    drop(report_tx);
    tasks.push(spawn_local(broadcaster(bus.clone(), broadcasts)));

    let mut received = 0;
    let mut reports = 0;
    while let Ok(report) = report_rx.recv_async().await {
        let ConsumerReport {
            channel,
            received: count,
            sum,
        } = report;
        debug!("consumer for {channel} finished: {count} message(s), sum {sum}");
        if count != expected_count || sum != expected_sum {
            error!("channel {channel}: expected {expected_count} message(s) summing to {expected_sum}, got {count} summing to {sum}");
            bail!("messages were lost or corrupted on channel {channel}");
        }
        received += count;
        reports += 1;
    }
    for task in tasks {
        task.await??;
    }
    let elapsed = start.elapsed();
    if reports != channels {
        bail!("only {reports} of {channels} consumers finished");
    }

    let closed = bus.shutdown();
    debug!("closed {closed} channel(s)");
    Ok(Report {
        channels,
        received,
        elapsed,
    })
}

async fn producer(
    bus: Bus,
    ch: Handle,
    first: Message,
    count: u32,
    batch: usize,
) -> Result<(), BusError> {
    let msgs = (first..first + count).collect::<Vec<Message>>();
    for chunk in msgs.chunks(batch) {
        bus.send_all(ch, chunk).await?;
        // give the other producers a turn
        yield_now().await;
    }
    trace!("producer {first} on {ch} done");
    Ok(())
}

async fn consumer(
    bus: Bus,
    ch: Handle,
    expected: u64,
    batch: usize,
    report: flume::Sender<ConsumerReport>,
) -> Result<(), BusError> {
    let mut received = 0;
    let mut sum = 0;
    while received < expected {
        let msgs = bus.recv_many(ch, batch).await?;
        received += msgs.len() as u64;
        sum += msgs.iter().copied().map(u64::from).sum::<u64>();
    }
    // only fails if the main task already gave up
    let _ = report.send(ConsumerReport {
        channel: ch,
        received,
        sum,
    });
    Ok(())
}

async fn broadcaster(bus: Bus, count: u32) -> Result<(), BusError> {
    for msg in 0..count {
        bus.broadcast(msg).await?;
    }
    Ok(())
}
