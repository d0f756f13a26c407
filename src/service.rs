//! Migration Service
//!
//! Single-writer front end for a [`MigrationCore`]. One tokio task owns the
//! core and every ledger; callers talk to it through a cloneable
//! [`MigrationHandle`] over an mpsc channel with oneshot replies.
//!
//! ```text
//! ┌────────┐  Command   ┌───────────────────────┐
//! │ Handle │──────────▶│ MigrationService task │──▶ LedgerRegistry
//! │ (many) │◀──────────│  (core + ledgers)      │
//! └────────┘  oneshot   └───────────────────────┘
//! ```
//!
//! Commands are processed one at a time in the order received, so no two
//! operations ever interleave on the ledgers.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::core_types::{Address, Amount, AssetId};
use crate::ledger::{LedgerError, LedgerRegistry};
use crate::migration::{MigrationCore, MigrationError, MigrationEvent};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Migration service is not running")]
    Closed,

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Closed => "SERVICE_CLOSED",
            ServiceError::Migration(e) => e.code(),
            ServiceError::Ledger(e) => e.code(),
        }
    }
}

type Reply<T> = oneshot::Sender<Result<T, ServiceError>>;

/// Request sent to the service task
#[derive(Debug)]
enum Command {
    Deposit {
        caller: Address,
        amount: Amount,
        reply: Reply<MigrationEvent>,
    },
    Convert {
        caller: Address,
        amount: Amount,
        reply: Reply<MigrationEvent>,
    },
    Withdraw {
        caller: Address,
        asset: AssetId,
        reply: Reply<MigrationEvent>,
    },
    TransferOwnership {
        caller: Address,
        new_owner: Address,
        reply: Reply<MigrationEvent>,
    },
    Approve {
        asset: AssetId,
        owner: Address,
        spender: Address,
        amount: Amount,
        reply: Reply<()>,
    },
    Transfer {
        asset: AssetId,
        from: Address,
        to: Address,
        amount: Amount,
        reply: Reply<()>,
    },
    Reserve {
        reply: Reply<Amount>,
    },
    Owner {
        reply: Reply<Address>,
    },
    BalanceOf {
        asset: AssetId,
        holder: Address,
        reply: Reply<Amount>,
    },
    Events {
        reply: Reply<Vec<MigrationEvent>>,
    },
}

pub struct MigrationService {
    core: MigrationCore,
    ledgers: LedgerRegistry,
    rx: mpsc::Receiver<Command>,
    journal: Vec<MigrationEvent>,
}

impl MigrationService {
    /// Start the service task.
    ///
    /// The task runs until every [`MigrationHandle`] is dropped, then hands
    /// the core and ledgers back through the join handle. A `queue_size` of
    /// zero is treated as one.
    pub fn spawn(
        core: MigrationCore,
        ledgers: LedgerRegistry,
        queue_size: usize,
    ) -> (MigrationHandle, JoinHandle<(MigrationCore, LedgerRegistry)>) {
        let (tx, rx) = mpsc::channel(queue_size.max(1));
        let journal = vec![core.deployment_event()];
        let service = Self {
            core,
            ledgers,
            rx,
            journal,
        };
        let task = tokio::spawn(service.run());
        (MigrationHandle { tx }, task)
    }

    async fn run(mut self) -> (MigrationCore, LedgerRegistry) {
        info!(
            core = %self.core.account(),
            owner = %self.core.owner(),
            assets = self.ledgers.len(),
            "Migration service started"
        );

        let mut processed: u64 = 0;
        while let Some(cmd) = self.rx.recv().await {
            self.handle(cmd);
            processed += 1;
        }

        info!(processed, "Migration service stopped");
        (self.core, self.ledgers)
    }

    fn handle(&mut self, cmd: Command) {
        debug!(?cmd, "Command received");
        match cmd {
            Command::Deposit {
                caller,
                amount,
                reply,
            } => {
                let result = self.core.deposit(&mut self.ledgers, &caller, amount);
                self.respond_event(reply, result);
            }
            Command::Convert {
                caller,
                amount,
                reply,
            } => {
                let result = self.core.convert(&mut self.ledgers, &caller, amount);
                self.respond_event(reply, result);
            }
            Command::Withdraw {
                caller,
                asset,
                reply,
            } => {
                let result = self.core.withdraw(&mut self.ledgers, &caller, &asset);
                self.respond_event(reply, result);
            }
            Command::TransferOwnership {
                caller,
                new_owner,
                reply,
            } => {
                let result = self.core.transfer_ownership(&caller, &new_owner);
                self.respond_event(reply, result);
            }
            Command::Approve {
                asset,
                owner,
                spender,
                amount,
                reply,
            } => {
                let result = match self.ledgers.get_mut(&asset) {
                    Some(ledger) => ledger
                        .approve(&owner, &spender, amount)
                        .map_err(ServiceError::from),
                    None => Err(MigrationError::UnknownAsset(asset).into()),
                };
                let _ = reply.send(result);
            }
            Command::Transfer {
                asset,
                from,
                to,
                amount,
                reply,
            } => {
                let result = match self.ledgers.get_mut(&asset) {
                    Some(ledger) => ledger
                        .transfer(&from, &to, amount)
                        .map_err(ServiceError::from),
                    None => Err(MigrationError::UnknownAsset(asset).into()),
                };
                let _ = reply.send(result);
            }
            Command::Reserve { reply } => {
                let _ = reply.send(self.core.reserve(&self.ledgers).map_err(Into::into));
            }
            Command::Owner { reply } => {
                let _ = reply.send(Ok(self.core.owner()));
            }
            Command::BalanceOf {
                asset,
                holder,
                reply,
            } => {
                let result = self
                    .ledgers
                    .balance_of(&asset, &holder)
                    .ok_or(MigrationError::UnknownAsset(asset).into());
                let _ = reply.send(result);
            }
            Command::Events { reply } => {
                let _ = reply.send(Ok(self.journal.clone()));
            }
        }
    }

    fn respond_event(
        &mut self,
        reply: Reply<MigrationEvent>,
        result: Result<MigrationEvent, MigrationError>,
    ) {
        if let Ok(event) = &result {
            self.journal.push(event.clone());
        }
        // Caller may have gone away; the operation is committed regardless
        let _ = reply.send(result.map_err(Into::into));
    }
}

/// Cloneable client side of a running [`MigrationService`]
#[derive(Clone)]
pub struct MigrationHandle {
    tx: mpsc::Sender<Command>,
}

impl MigrationHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, ServiceError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| ServiceError::Closed)?;
        response.await.map_err(|_| ServiceError::Closed)?
    }

    pub async fn deposit(
        &self,
        caller: Address,
        amount: Amount,
    ) -> Result<MigrationEvent, ServiceError> {
        self.request(|reply| Command::Deposit {
            caller,
            amount,
            reply,
        })
        .await
    }

    pub async fn convert(
        &self,
        caller: Address,
        amount: Amount,
    ) -> Result<MigrationEvent, ServiceError> {
        self.request(|reply| Command::Convert {
            caller,
            amount,
            reply,
        })
        .await
    }

    pub async fn withdraw(
        &self,
        caller: Address,
        asset: AssetId,
    ) -> Result<MigrationEvent, ServiceError> {
        self.request(|reply| Command::Withdraw {
            caller,
            asset,
            reply,
        })
        .await
    }

    pub async fn transfer_ownership(
        &self,
        caller: Address,
        new_owner: Address,
    ) -> Result<MigrationEvent, ServiceError> {
        self.request(|reply| Command::TransferOwnership {
            caller,
            new_owner,
            reply,
        })
        .await
    }

    /// Set `owner`'s allowance for `spender` on the `asset` ledger
    pub async fn approve(
        &self,
        asset: AssetId,
        owner: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<(), ServiceError> {
        self.request(|reply| Command::Approve {
            asset,
            owner,
            spender,
            amount,
            reply,
        })
        .await
    }

    /// Plain ledger transfer, bypassing the core
    pub async fn transfer(
        &self,
        asset: AssetId,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), ServiceError> {
        self.request(|reply| Command::Transfer {
            asset,
            from,
            to,
            amount,
            reply,
        })
        .await
    }

    pub async fn reserve(&self) -> Result<Amount, ServiceError> {
        self.request(|reply| Command::Reserve { reply }).await
    }

    pub async fn owner(&self) -> Result<Address, ServiceError> {
        self.request(|reply| Command::Owner { reply }).await
    }

    pub async fn balance_of(&self, asset: AssetId, holder: Address) -> Result<Amount, ServiceError> {
        self.request(|reply| Command::BalanceOf {
            asset,
            holder,
            reply,
        })
        .await
    }

    /// Every event committed since the service started, oldest first
    pub async fn events(&self) -> Result<Vec<MigrationEvent>, ServiceError> {
        self.request(|reply| Command::Events { reply }).await
    }
}
