#![doc = include_str!("../README.md")]

mod config;
mod telemetry;

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use config::{CliArgs, ClientConfig, Command};
use suid::{Config, Error, FileStorage, Format, HttpTransport, Suid, TokioAllocator};
use telemetry::init_telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ClientConfig::try_from(args)?;

    init_telemetry()?;

    match config.command.clone() {
        Command::Generate { count } => generate(&config, count).await,
        Command::Decode { text, legacy } => {
            let format = if legacy {
                Format::Legacy
            } else {
                Format::Base36
            };
            let id = Suid::decode_as(format, &text)
                .with_context(|| format!("unable to decode {text:?}"))?;
            println!("{}", id.to_raw());
            Ok(())
        }
        Command::Encode { number } => {
            println!("{}", Suid::new(number)?);
            Ok(())
        }
        Command::Pool => print_pool(&config),
    }
}

fn allocator(config: &ClientConfig, suid: Config) -> anyhow::Result<TokioAllocator<HttpTransport>> {
    let allocator = TokioAllocator::builder(HttpTransport::new())
        .config(suid)
        .storage(FileStorage::new(&config.storage_dir))
        .build()?;
    Ok(allocator)
}

async fn generate(config: &ClientConfig, count: usize) -> anyhow::Result<()> {
    let allocator = allocator(config, config.suid.clone())?;
    if !allocator.status().persistent {
        tracing::warn!(
            "Unable to use {} for storage, unused blocks will be lost on exit",
            config.storage_dir.display()
        );
    }

    let mut printed = 0;
    while printed < count {
        match allocator.next() {
            Ok(id) => {
                println!("{id}");
                printed += 1;
            }
            Err(Error::PoolExhausted) => {
                wait_ready(&allocator, config.ready_timeout).await?;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

async fn wait_ready(
    allocator: &TokioAllocator<HttpTransport>,
    timeout: Duration,
) -> anyhow::Result<()> {
    tokio::time::timeout(timeout, allocator.ready())
        .await
        .with_context(|| {
            format!(
                "no suid blocks arrived within {}ms",
                timeout.as_millis()
            )
        })
}

fn print_pool(config: &ClientConfig) -> anyhow::Result<()> {
    // Zero thresholds keep this read-only: no replenishment is triggered.
    let allocator = allocator(config, config.suid.clone().with_min(0).with_max(0))?;
    let status = allocator.status();
    if !status.persistent {
        anyhow::bail!(
            "unable to read the suid pool from {}",
            config.storage_dir.display()
        );
    }
    for block in &status.pooled {
        println!("{block}\t{}", block.first().to_raw());
    }
    tracing::info!(blocks = status.pooled.len(), "Listed suid pool");
    Ok(())
}
