//! # Example: launcher
//!
//! A complete launcher binary: three registered workloads, command-line
//! selection, instance count and signal-driven shutdown.
//!
//! ## Run
//! ```bash
//! cargo run --example launcher                         # default workload ("ticker"), 1 instance
//! cargo run --example launcher -- run echo -instances 4
//! cargo run --example launcher -- run flaky -instances 3
//! cargo run --example launcher -- list
//! ```
//! Stop with Ctrl-C; every instance is stopped before the process exits.

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use deployvisor::{
    InstanceContext, Launcher, LauncherConfig, Registry, Workload, WorkloadError,
    WorkloadFactory,
};

/// Prints a tick every second until the group stops.
#[derive(Default)]
struct Ticker;

#[async_trait]
impl Workload for Ticker {
    async fn start(&self, ctx: InstanceContext) -> Result<(), WorkloadError> {
        let id = ctx.id();
        let token = ctx.token().clone();
        tokio::spawn(async move {
            let mut every = tokio::time::interval(Duration::from_secs(1));
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = every.tick() => println!("ticker #{id}: tick"),
                }
            }
        });
        Ok(())
    }

    async fn stop(&self, ctx: InstanceContext) -> Result<(), WorkloadError> {
        println!("ticker #{}: bye", ctx.id());
        Ok(())
    }
}

/// TCP echo server on an ephemeral localhost port, one listener per instance.
#[derive(Default)]
struct Echo;

#[async_trait]
impl Workload for Echo {
    async fn start(&self, ctx: InstanceContext) -> Result<(), WorkloadError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        println!(
            "echo #{}: listening on {}",
            ctx.id(),
            listener.local_addr()?
        );

        let token = ctx.token().clone();
        tokio::spawn(async move {
            loop {
                let (mut sock, _) = tokio::select! {
                    _ = token.cancelled() => break,
                    accepted = listener.accept() => match accepted {
                        Ok(conn) => conn,
                        Err(_) => continue,
                    },
                };
                let token = token.clone();
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    loop {
                        let n = tokio::select! {
                            _ = token.cancelled() => break,
                            read = sock.read(&mut buf) => match read {
                                Ok(0) | Err(_) => break,
                                Ok(n) => n,
                            },
                        };
                        if sock.write_all(&buf[..n]).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });
        Ok(())
    }

    async fn stop(&self, _ctx: InstanceContext) -> Result<(), WorkloadError> {
        Ok(())
    }
}

/// Every second instance fails to start.
struct Flaky {
    nth: u32,
}

#[async_trait]
impl Workload for Flaky {
    async fn start(&self, ctx: InstanceContext) -> Result<(), WorkloadError> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if self.nth % 2 == 0 {
            return Err(WorkloadError::fail(format!(
                "instance #{} refused to start",
                ctx.id()
            )));
        }
        Ok(())
    }

    async fn stop(&self, _ctx: InstanceContext) -> Result<(), WorkloadError> {
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    deployvisor::init_tracing();

    let created = Arc::new(AtomicU32::new(0));
    let registry = Registry::from_entries([
        ("ticker", WorkloadFactory::of::<Ticker>()),
        ("echo", WorkloadFactory::of::<Echo>()),
        (
            "flaky",
            WorkloadFactory::new(move || Flaky {
                nth: created.fetch_add(1, Ordering::Relaxed) + 1,
            }),
        ),
    ])?;

    let mut cfg = LauncherConfig::with_default("ticker");
    cfg.program = "launcher".to_string();
    cfg.supervisor.stop_timeout = Duration::from_secs(5);

    Ok(Launcher::new(registry, cfg)
        .run_main(std::env::args().skip(1))
        .await)
}
