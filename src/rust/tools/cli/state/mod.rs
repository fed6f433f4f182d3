#![cfg(feature = "cli")]

use std::sync::Arc;

use crate::tools::logger::Logger;

#[derive(Clone)]
pub struct CliContext {
    logger: Arc<Logger>,
    verbose: bool,
}

impl CliContext {
    pub fn new(verbose: bool) -> Self {
        Self {
            logger: Arc::new(Logger::new().verbose(verbose)),
            verbose,
        }
    }

    pub fn logger(&self) -> Arc<Logger> {
        Arc::clone(&self.logger)
    }

    /// Logger honouring `log.verbose` from the loaded config as well as `--verbose`.
    pub fn logger_with(&self, config_verbose: bool) -> Arc<Logger> {
        if config_verbose && !self.verbose {
            Arc::new(Logger::new().verbose(true))
        } else {
            self.logger()
        }
    }
}
