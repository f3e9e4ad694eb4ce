use serde::{Deserialize, Serialize};

#[cfg(feature = "rest")]
use crate::actors::rest;
use crate::{Error, actors::store};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub store: store::Config,
    #[cfg(feature = "rest")]
    pub rest: rest::Config,
}

impl Config {
    pub(crate) fn validate(&self) -> Result<(), Error> {
        self.store
            .location()
            .map(|_| ())
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }
}
