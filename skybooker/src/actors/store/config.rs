use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::actors::store::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// `memory://`, `file:///absolute/dir` or, with the `mongodb` feature,
    /// `mongodb://host[:port]/database`.
    pub url: Url,
}

impl Config {
    /// Checks that `url` names a supported backend before accepting it.
    pub fn new(url: Url) -> Result<Self, Error> {
        let config = Self { url };
        config.location()?;
        Ok(config)
    }

    pub fn memory() -> Self {
        Self {
            url: Url::parse("memory://").expect("static URL is valid"),
        }
    }

    pub fn directory(dir: &Path) -> Result<Self, Error> {
        let url = Url::from_directory_path(dir)
            .map_err(|()| Error::UnsupportedUrl(dir.display().to_string()))?;
        Ok(Self { url })
    }

    pub(crate) fn location(&self) -> Result<Location, Error> {
        match self.url.scheme() {
            "memory" => Ok(Location::Memory),
            "file" => self
                .url
                .to_file_path()
                .map(Location::Directory)
                .map_err(|()| Error::UnsupportedUrl(self.url.to_string())),
            #[cfg(feature = "mongodb")]
            "mongodb" | "mongodb+srv" => Ok(Location::MongoDb(self.url.clone())),
            #[cfg(not(feature = "mongodb"))]
            "mongodb" | "mongodb+srv" => Err(Error::UnsupportedUrl(format!(
                "{} (built without the mongodb feature)",
                self.url
            ))),
            _ => Err(Error::UnsupportedUrl(self.url.to_string())),
        }
    }
}

/// Where the documents live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Location {
    Memory,
    /// One JSON file per collection.
    Directory(PathBuf),
    #[cfg(feature = "mongodb")]
    MongoDb(Url),
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn locations() {
        assert_eq!(Config::memory().location().unwrap(), Location::Memory);

        let dir = TempDir::new().unwrap();
        let config = Config::directory(dir.path()).unwrap();
        assert_eq!(
            config.location().unwrap(),
            Location::Directory(dir.path().to_path_buf())
        );

        let err = Config::new(Url::parse("redis://localhost:6379").unwrap()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedUrl(_)));
    }

    #[cfg(feature = "mongodb")]
    #[test]
    fn mongodb_location() {
        let url = Url::parse("mongodb://localhost:27017/skybooker").unwrap();
        assert_eq!(
            Config::new(url.clone()).unwrap().location().unwrap(),
            Location::MongoDb(url)
        );
    }
}
