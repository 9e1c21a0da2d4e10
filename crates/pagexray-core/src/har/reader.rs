use super::types::Har;
use crate::{Error, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub struct HarReader;

impl HarReader {
    /// Read and parse a HAR file from the given path
    pub fn from_file(path: &Path) -> Result<Har> {
        tracing::debug!("Reading HAR file from: {}", path.display());

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let har: Har = serde_json::from_reader(reader)?;

        tracing::info!(
            "Successfully parsed HAR file with {} entries",
            har.log.entries.len()
        );

        Ok(har)
    }

    /// Parse a HAR file from a JSON string
    pub fn from_str(content: &str) -> Result<Har> {
        tracing::debug!("Parsing HAR from string");

        let har: Har = serde_json::from_str(content)?;

        tracing::info!(
            "Successfully parsed HAR from string with {} entries",
            har.log.entries.len()
        );

        Ok(har)
    }

    /// Check the preconditions a conversion relies on: at least one declared
    /// page and well-formed request URLs.
    pub fn validate(har: &Har) -> Result<()> {
        tracing::debug!("Validating HAR structure");

        match &har.log.pages {
            Some(pages) if !pages.is_empty() => {}
            _ => {
                return Err(Error::InvalidStructure(
                    "HAR log declares no pages".to_string(),
                ));
            }
        }

        if har.log.entries.is_empty() {
            tracing::warn!("HAR file contains no entries");
        }

        for (idx, entry) in har.log.entries.iter().enumerate() {
            if entry.request.url.is_empty() {
                return Err(Error::InvalidStructure(format!(
                    "Entry {} has empty request URL",
                    idx
                )));
            }
        }

        tracing::debug!("HAR structure is valid");
        Ok(())
    }
}
