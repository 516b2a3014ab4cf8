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

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use acton_wire::prelude::*;
use anyhow::bail;

/// What `start` does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    /// Returns `Ok` straight away.
    Complete,
    /// Returns an error.
    Fail,
    /// Panics.
    Panic,
    /// Waits for cancellation, then returns `Ok`.
    HonourCancel,
    /// Sleeps for an hour regardless of cancellation.
    IgnoreCancel,
    /// Blocks in `receive` on endpoint "in" and propagates whatever it returns.
    Receive,
    /// Like `Receive`, but stops waiting once shutdown is requested.
    ReceiveUntilCancelled,
}

/// Test actor with any number of socket managers.
pub struct ScriptedActor {
    pub name: String,
    pub behaviour: Behaviour,
    pub managers: Vec<SocketManager>,
    pub starts: Arc<AtomicUsize>,
}

impl ScriptedActor {
    pub fn new(name: &str, behaviour: Behaviour, managers: Vec<SocketManager>) -> Self {
        Self {
            name: name.to_string(),
            behaviour,
            managers,
            starts: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Actor for ScriptedActor {
    fn identity(&self) -> &str {
        &self.name
    }

    fn socket_managers(&mut self) -> Vec<&mut SocketManager> {
        self.managers.iter_mut().collect()
    }

    async fn start(&mut self, ctx: &ActorContext) -> anyhow::Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::Complete => Ok(()),
            Behaviour::Fail => bail!("scripted failure"),
            Behaviour::Panic => panic!("scripted panic"),
            Behaviour::HonourCancel => {
                ctx.cancelled().await;
                Ok(())
            }
            Behaviour::IgnoreCancel => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
            Behaviour::Receive => {
                let manager = self
                    .managers
                    .first_mut()
                    .ok_or_else(|| anyhow::anyhow!("no manager"))?;
                let value: u32 = manager.receive("in").await?;
                bail!("unexpected message {value}")
            }
            Behaviour::ReceiveUntilCancelled => {
                let manager = self
                    .managers
                    .first_mut()
                    .ok_or_else(|| anyhow::anyhow!("no manager"))?;
                match ctx.until_cancelled(manager.receive::<u32>("in")).await {
                    None => Ok(()),
                    Some(received) => bail!("unexpected message {}", received?),
                }
            }
        }
    }
}
