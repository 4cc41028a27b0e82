mod config;

use std::thread;
use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use spindle_core::{StopSource, StopToken, WaitStatus, WorkerPool};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::DemoConfig;

/// 各文字を少しずつ「処理」するだけのバックグラウンド作業
fn background_work(id: usize, text: &str, delay: Duration) {
    tracing::info!(bw = id, "started");
    for c in text.chars() {
        tracing::debug!(bw = id, %c, "tick");
        thread::sleep(delay);
    }
    tracing::info!(bw = id, "finished");
}

fn calculate_square(x: i64, fail_every: i64) -> Result<i64, String> {
    let delay = rand::thread_rng().gen_range(100..1500);
    tracing::info!(x, delay_ms = delay, "starting calculation");
    thread::sleep(Duration::from_millis(delay));

    if x % fail_every == 0 {
        return Err(format!("Error#{fail_every}"));
    }
    Ok(x * x)
}

fn save_to_file(filename: &str) {
    tracing::info!(filename, "saving to file");
    thread::sleep(Duration::from_secs(3));
    tracing::info!(filename, "file saved");
}

fn stoppable_work(token: StopToken, text: &str) -> usize {
    let mut processed = 0;
    for _ in text.chars() {
        if token.stop_requested() {
            tracing::info!(processed, "stop requested");
            break;
        }
        processed += 1;
        thread::sleep(Duration::from_millis(200));
    }
    processed
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spindle_cli=info,spindle_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_thread_names(true))
        .init();

    let config = DemoConfig::from_env();
    let config_json = serde_json::to_string(&config)?;
    tracing::info!(config = %config_json, "spindle demo starting");

    let pool = WorkerPool::with_config(config.pool.clone())?;

    // (A) fire-and-forget の background work
    let text = "Hello Threads";
    pool.execute(move || background_work(1, text, Duration::from_millis(250)))?;
    for i in 2..=config.tasks {
        let text = format!("{text}{i}");
        let delay = Duration::from_millis(100 + 10 * i as u64);
        pool.execute(move || background_work(i, &text, delay))?;
    }

    // (B) 結果を返すタスク + 進捗表示
    let save = pool.submit(|| save_to_file("data.txt"))?;
    let fail_every = config.fail_every;
    let squares = [7, 9, 13, 26, 97]
        .into_iter()
        .map(|n| Ok((n, pool.submit_fallible(move || calculate_square(n, fail_every))?)))
        .collect::<Result<Vec<_>>>()?;

    // 待ち合わせはブロッキングなので runtime のスレッドでは行わない
    let polls = tokio::task::spawn_blocking(move || {
        let mut dots = 0usize;
        while save.wait_for(Duration::from_millis(100)) != WaitStatus::Ready {
            dots += 1;
        }
        save.get().map(|()| dots)
    })
    .await??;
    tracing::info!(polls, "save finished");

    for (n, handle) in squares {
        match handle.get_async().await {
            Ok(square) => tracing::info!("{n}*{n} = {square}"),
            Err(err) => tracing::error!(n, error = %err, "square failed"),
        }
    }

    // (C) 同じ結果を複数スレッドで共有
    let shared = pool
        .submit_fallible(move || calculate_square(11, fail_every))?
        .share();
    let readers: Vec<_> = (0..2)
        .map(|reader| {
            let shared = shared.clone();
            tokio::task::spawn_blocking(move || match shared.get() {
                Ok(value) => tracing::info!(reader, value, "shared result"),
                Err(err) => tracing::warn!(reader, error = %err, "shared result failed"),
            })
        })
        .collect();
    for reader in readers {
        if let Err(err) = reader.await {
            tracing::error!(error = %err, "reader task failed");
        }
    }

    // (D) 協調的キャンセル
    let source = StopSource::new();
    let token = source.token();
    let stoppable = pool.submit(move || stoppable_work(token, "THREAD#1"))?;
    tokio::time::sleep(Duration::from_millis(700)).await;
    source.request_stop();
    let processed = stoppable.get_async().await?;
    tracing::info!(processed, "stoppable work returned");

    let pool = tokio::task::spawn_blocking(move || {
        pool.shutdown();
        pool
    })
    .await?;
    println!("{}", serde_json::to_string_pretty(&pool.status())?);
    tracing::info!("spindle demo finished");
    Ok(())
}
