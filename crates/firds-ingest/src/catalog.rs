//! Dataset Locator
//!
//! Queries the FIRDS file catalog and picks the download link of the first
//! document with the target `file_type`. The catalog answers in Solr's XML
//! response format:
//!
//! ```xml
//! <response>
//!   <result name="response" numFound="2" start="0">
//!     <doc>
//!       <str name="file_type">DLTINS</str>
//!       <str name="download_link">http://firds.esma.europa.eu/firds/DLTINS_20210117_01of01.zip</str>
//!     </doc>
//!   </result>
//! </response>
//! ```
//!
//! The catalog schema has no namespaces, so its tree is used as parsed.

use crate::config::CatalogConfig;
use crate::error::IngestError;
use crate::outcome::StageOutcome;
use crate::xml::{self, Element};
use reqwest::Client;
use tracing::{debug, error, info, instrument, warn};

/// One `doc` entry of the catalog response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogDocument {
    pub file_type: Option<String>,
    pub download_link: Option<String>,
    pub file_name: Option<String>,
    pub publication_date: Option<String>,
    pub checksum: Option<String>,
}

impl CatalogDocument {
    fn from_element(doc: &Element) -> Self {
        Self {
            file_type: named_str(doc, "file_type"),
            download_link: named_str(doc, "download_link"),
            file_name: named_field(doc, "file_name"),
            publication_date: named_field(doc, "publication_date"),
            checksum: named_field(doc, "checksum"),
        }
    }

    pub fn has_file_type(&self, target: &str) -> bool {
        self.file_type.as_deref() == Some(target)
    }
}

/// Text of the `<str name="...">` child of a catalog `doc`
fn named_str(doc: &Element, name: &str) -> Option<String> {
    doc.find_all("str")
        .find(|field| field.attribute("name") == Some(name))
        .and_then(Element::text)
        .map(str::to_string)
}

/// Like [`named_str`] but for any field element (`str`, `date`, `long`, ...)
fn named_field(doc: &Element, name: &str) -> Option<String> {
    doc.children
        .iter()
        .find(|field| field.attribute("name") == Some(name))
        .and_then(Element::text)
        .map(str::to_string)
}

/// Documents of the catalog response, lazily and in catalog order
pub fn catalog_documents(response: &Element) -> impl Iterator<Item = CatalogDocument> + '_ {
    response
        .find("result")
        .into_iter()
        .flat_map(|result| result.find_all("doc"))
        .map(CatalogDocument::from_element)
}

/// First catalog document whose `file_type` equals `target`
pub fn select_document(response: &Element, target: &str) -> Option<CatalogDocument> {
    catalog_documents(response).find(|doc| doc.has_file_type(target))
}

/// Finds the dataset to process in the remote catalog
pub struct DatasetLocator {
    client: Client,
    config: CatalogConfig,
}

impl DatasetLocator {
    pub fn new(client: Client, config: CatalogConfig) -> Self {
        Self { client, config }
    }

    /// Query the catalog and return the selected document
    ///
    /// `Success` always carries a document with a download link. A catalog
    /// without a matching document, or a match without a link, is `NoMatch`.
    /// Connection failures and non-200 answers are `HardFailure`.
    #[instrument(skip(self), fields(url = %self.config.url, target = %self.config.target_file_type))]
    pub async fn locate(&self) -> StageOutcome<CatalogDocument> {
        let response = match self
            .client
            .get(&self.config.url)
            .query(&self.config.query_params())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Unable to reach the catalog");
                return StageOutcome::HardFailure(e.into());
            },
        };
        info!("Connected to catalog");

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "Failed to read catalog response");
                return StageOutcome::HardFailure(e.into());
            },
        };

        if status != reqwest::StatusCode::OK {
            let body = String::from_utf8_lossy(&body).into_owned();
            error!(status = status.as_u16(), %body, "Catalog request was rejected");
            return StageOutcome::HardFailure(IngestError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let tree = match xml::parse_bytes(&body) {
            Ok(tree) => tree,
            Err(e) => {
                error!(error = %e, "Catalog response is not valid XML");
                return StageOutcome::HardFailure(e);
            },
        };

        self.pick(&tree)
    }

    fn pick(&self, tree: &Element) -> StageOutcome<CatalogDocument> {
        let target = self.config.target_file_type.as_str();
        let Some(document) = select_document(tree, target) else {
            info!("Did not get any file type as `{}`", target);
            return StageOutcome::NoMatch;
        };

        if document.download_link.is_none() {
            warn!(
                file_name = ?document.file_name,
                "Matching catalog document has no download link"
            );
            return StageOutcome::NoMatch;
        }

        debug!(
            file_name = ?document.file_name,
            publication_date = ?document.publication_date,
            checksum = ?document.checksum,
            "Selected catalog document"
        );
        StageOutcome::Success(document)
    }
}
