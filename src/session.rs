use crate::app::Logger;
use crate::collab::{AssetCategory, AssetStore, Image, Network, Presenter, Storage};
use crate::guard::{Closable, ErrorSignal, FailFastGuard, Fault};

/// Top-level scope for the process lifetime. Owns the resources the guard
/// releases on failure (storage first, then the network session) together
/// with the surfaces it needs to report a failure.
pub struct Session {
    presenter: Box<dyn Presenter>,
    assets: Box<dyn AssetStore>,
    storage: Box<dyn Storage>,
    network: Box<dyn Network>,
    guard: FailFastGuard,
    logger: Logger,
}

impl Session {
    pub fn new(
        presenter: Box<dyn Presenter>,
        assets: Box<dyn AssetStore>,
        storage: Box<dyn Storage>,
        network: Box<dyn Network>,
        guard: FailFastGuard,
        logger: Logger,
    ) -> Self {
        Self {
            presenter,
            assets,
            storage,
            network,
            guard,
            logger,
        }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn presenter(&mut self) -> &mut dyn Presenter {
        self.presenter.as_mut()
    }

    pub fn storage(&mut self) -> &mut dyn Storage {
        self.storage.as_mut()
    }

    pub fn network(&mut self) -> &mut dyn Network {
        self.network.as_mut()
    }

    pub fn image(&self, category: AssetCategory, key: &str) -> Option<Image> {
        let image = self.assets.image(category, key);
        if image.is_none() {
            self.logger.debug(format!("no {category} image for '{key}'"));
        }
        image
    }

    /// Pass an outcome through the guard; returns only on success.
    pub fn check(&mut self, signal: ErrorSignal) {
        if let Err(fault) = signal {
            self.escalate(fault)
        }
    }

    /// Unwrap a fallible value, escalating the fault otherwise.
    pub fn require<T>(&mut self, outcome: Result<T, Fault>) -> T {
        match outcome {
            Ok(value) => value,
            Err(fault) => self.escalate(fault),
        }
    }

    pub fn escalate(&mut self, fault: Fault) -> ! {
        let storage: &mut dyn Closable = &mut self.storage;
        let network: &mut dyn Closable = &mut self.network;
        let mut resources = [storage, network];
        self.guard.fail(
            fault,
            self.presenter.as_mut(),
            self.assets.as_ref(),
            &mut resources,
        )
    }

    /// Association and internet reachability, both through the guard.
    pub fn verify_online(&mut self) {
        let associated = self.network.is_associated();
        self.check(associated);
        let online = self.network.has_internet();
        self.check(online);
    }

    pub fn restart(&mut self) -> ! {
        self.guard.restart()
    }

    /// Close everything outside the failure path, used on a clean shutdown.
    pub fn close_all(&mut self) {
        self.storage.close();
        self.network.close();
    }
}

impl Closable for Box<dyn Storage> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

impl Closable for Box<dyn Network> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn close(&mut self) {
        (**self).close()
    }
}
