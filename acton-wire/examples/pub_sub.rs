/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

//! Two services exchanging events over PUB/SUB, each in its own OS process.
//!
//! Run with `cargo run --example pub_sub`. The parent process re-executes itself once as
//! the subscriber and once as the publisher, then waits for both. The publisher emits ten
//! numbered events followed by `Terminate`; the subscriber logs them and stops on `Terminate`.

use std::process::Command;
use std::time::Duration;

use acton_wire::prelude::*;
use tracing::info;

const FEED_PORT: u16 = 5599;

#[acton_event]
enum Feed {
    Number(u32),
    Terminate,
}

struct Publisher {
    sockets: SocketManager,
    throttle: Duration,
}

#[async_trait]
impl Actor for Publisher {
    fn identity(&self) -> &str {
        "publisher"
    }

    fn socket_managers(&mut self) -> Vec<&mut SocketManager> {
        vec![&mut self.sockets]
    }

    async fn start(&mut self, ctx: &ActorContext) -> anyhow::Result<()> {
        // Subscribers joining late miss whatever was published before they connected.
        if ctx.until_cancelled(tokio::time::sleep(Duration::from_secs(1))).await.is_none() {
            return Ok(());
        }

        for n in 0..10 {
            info!(n, "Emitting event");
            self.sockets.send("pub", &Feed::Number(n)).await?;
            tokio::time::sleep(self.throttle).await;
        }
        info!("Emitting termination event");
        self.sockets.send("pub", &Feed::Terminate).await?;
        Ok(())
    }
}

struct Subscriber {
    sockets: SocketManager,
}

#[async_trait]
impl Actor for Subscriber {
    fn identity(&self) -> &str {
        "subscriber"
    }

    fn socket_managers(&mut self) -> Vec<&mut SocketManager> {
        vec![&mut self.sockets]
    }

    async fn start(&mut self, ctx: &ActorContext) -> anyhow::Result<()> {
        while let Some(event) = ctx.until_cancelled(self.sockets.receive::<Feed>("sub")).await {
            match event? {
                Feed::Number(n) => info!(n, "Received event"),
                Feed::Terminate => {
                    info!("Received termination event");
                    break;
                }
            }
        }
        Ok(())
    }
}

fn pub_service(config: WireConfig) -> anyhow::Result<RunOutcome> {
    let mut sockets = SocketManager::from_config("pub", ZmqTransport::new(), &config.sockets);
    sockets.register(EndpointDescriptor::bind(
        "pub",
        Pattern::Publish,
        address::tcp("127.0.0.1", FEED_PORT),
    )?)?;
    let actor = Publisher {
        sockets,
        throttle: Duration::from_millis(50),
    };
    ActorRuntime::with_config(config).run(actor)
}

fn sub_service(config: WireConfig) -> anyhow::Result<RunOutcome> {
    let mut sockets = SocketManager::from_config("sub", ZmqTransport::new(), &config.sockets);
    sockets.register(EndpointDescriptor::connect(
        "sub",
        Pattern::Subscribe,
        address::tcp("127.0.0.1", FEED_PORT),
    )?)?;
    ActorRuntime::with_config(config).run(Subscriber { sockets })
}

fn main() -> anyhow::Result<()> {
    let config = WireConfig::load();
    let guard = init_tracing(&config.tracing);

    let outcome = match std::env::args().nth(1).as_deref() {
        Some("pub") => pub_service(config)?,
        Some("sub") => sub_service(config)?,
        Some(other) => anyhow::bail!("unknown role '{other}', expected 'pub' or 'sub'"),
        None => {
            let exe = std::env::current_exe()?;
            let mut sub = Command::new(&exe).arg("sub").spawn()?;
            let mut publisher = Command::new(&exe).arg("pub").spawn()?;
            let pub_status = publisher.wait()?;
            let sub_status = sub.wait()?;
            info!(%pub_status, %sub_status, "Both services exited");
            return Ok(());
        }
    };

    info!(
        identity = %outcome.identity,
        exit = ?outcome.exit,
        event_loop = %outcome.event_loop,
        "Service finished"
    );
    drop(guard);
    std::process::exit(outcome.exit_code());
}
