//! PubMed Central (PMC) source: ID converter, ELink and ESummary.

use async_trait::async_trait;
use quick_xml::de::from_str;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Deserialize;

use crate::config::{Config, EndpointConfig, MAX_BATCH_SIZE};
use crate::models::{
    strip_pmc_prefix, CitationMap, ConversionResult, IdType, LinkDirection, Metadata,
};
use crate::sources::{Source, SourceError};
use crate::utils::{with_retry, HttpClient, RetryConfig, Throttle};

/// PMC research source
///
/// Every request carries the configured `tool` and `email`, as NCBI's usage
/// policy requires. Requests are issued strictly one after another and each
/// is followed by a pause (see [`Throttle`]).
#[derive(Debug, Clone)]
pub struct PmcSource {
    client: HttpClient,
    tool: String,
    email: String,
    endpoints: EndpointConfig,
    batch_size: usize,
    throttle: Throttle,
    retry: RetryConfig,
}

impl PmcSource {
    /// Create a source from configuration.
    ///
    /// Fails with [`SourceError::InvalidArgument`] when no contact email is
    /// configured, the batch size is outside `1..=200` or the retry backoff
    /// multiplier is below 1.
    pub fn new(config: &Config) -> Result<Self, SourceError> {
        let client = HttpClient::new(
            config.client.request_timeout(),
            config.client.connect_timeout(),
        )?;
        Self::with_client(client, config)
    }

    /// Create with a custom HTTP client
    pub fn with_client(client: HttpClient, config: &Config) -> Result<Self, SourceError> {
        let email = config
            .client
            .email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .ok_or_else(|| {
                SourceError::InvalidArgument(
                    "a contact email is required by NCBI's usage policy".to_string(),
                )
            })?
            .to_string();

        let batch_size = config.rate_limits.batch_size;
        if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
            return Err(SourceError::InvalidArgument(format!(
                "batch size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE, batch_size
            )));
        }

        let multiplier = config.retry.backoff_multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(SourceError::InvalidArgument(format!(
                "retry backoff multiplier must be at least 1, got {}",
                multiplier
            )));
        }

        Ok(Self {
            client,
            tool: config.client.tool.clone(),
            email,
            endpoints: config.endpoints.clone(),
            batch_size,
            throttle: Throttle::from(&config.rate_limits),
            retry: RetryConfig::from(&config.retry),
        })
    }

    /// Replace the throttle
    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn require_ids(ids: &[String]) -> Result<(), SourceError> {
        if ids.is_empty() {
            return Err(SourceError::InvalidArgument(
                "at least one id is required".to_string(),
            ));
        }
        Ok(())
    }

    fn identity_params(&self) -> [(&'static str, String); 2] {
        [("tool", self.tool.clone()), ("email", self.email.clone())]
    }

    /// ID converter query: comma-joined ids plus identification
    fn build_convert_params(&self, batch: &[String]) -> Vec<(&'static str, String)> {
        let mut params = vec![("ids", batch.join(","))];
        params.extend(self.identity_params());
        params
    }

    /// ELink query: one `id` parameter per id
    fn build_elink_params(
        &self,
        batch: &[String],
        direction: LinkDirection,
    ) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("dbfrom", "pubmed".to_string()),
            ("linkname", direction.link_name().to_string()),
        ];
        params.extend(batch.iter().map(|id| ("id", id.clone())));
        params.extend(self.identity_params());
        params
    }

    /// ESummary query for one bare PMC id
    fn build_summary_params(&self, id: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("db", "pmc".to_string()),
            ("id", strip_pmc_prefix(id).to_string()),
        ];
        params.extend(self.identity_params());
        params
    }

    async fn fetch(
        &self,
        url: &str,
        params: &[(&'static str, String)],
        endpoint: &str,
    ) -> Result<String, SourceError> {
        with_retry(self.retry, || self.client.get_text(url, params, endpoint)).await
    }

    /// Parse an ID converter response into (requested id, converted id) pairs.
    ///
    /// Records without the target attribute were not resolved and are skipped.
    fn parse_convert_response(
        xml: &str,
        to: IdType,
    ) -> Result<Vec<(String, String)>, SourceError> {
        #[derive(Debug, Deserialize)]
        struct PmcIds {
            #[serde(rename = "@status", default)]
            status: Option<String>,
            #[serde(rename = "message", default)]
            message: Option<String>,
            #[serde(rename = "record", default)]
            records: Vec<Record>,
        }

        #[derive(Debug, Deserialize)]
        struct Record {
            #[serde(rename = "@requested-id")]
            requested_id: Option<String>,
            #[serde(rename = "@pmcid")]
            pmcid: Option<String>,
            #[serde(rename = "@pmid")]
            pmid: Option<String>,
            #[serde(rename = "@mid")]
            mid: Option<String>,
            #[serde(rename = "@doi")]
            doi: Option<String>,
            #[serde(rename = "@errmsg")]
            errmsg: Option<String>,
        }

        let response: PmcIds = from_str(xml)?;

        if response.status.as_deref() == Some("error") && response.records.is_empty() {
            return Err(SourceError::MalformedResponse(format!(
                "ID converter error: {}",
                response.message.unwrap_or_default()
            )));
        }

        let mut pairs = Vec::with_capacity(response.records.len());
        for record in response.records {
            let requested = record.requested_id.ok_or_else(|| {
                SourceError::MalformedResponse("record without requested-id".to_string())
            })?;

            let converted = match to {
                IdType::Pmcid => record.pmcid,
                IdType::Pmid => record.pmid,
                IdType::Mid => record.mid,
                IdType::Doi => record.doi,
            };

            match converted {
                Some(converted) => pairs.push((requested, converted)),
                None => tracing::debug!(
                    "No {} for {}: {}",
                    to,
                    requested,
                    record.errmsg.as_deref().unwrap_or("not resolved")
                ),
            }
        }

        Ok(pairs)
    }

    /// Parse an ELink response into (queried id, linked ids) pairs.
    ///
    /// Only link sets matching `link_name` count; a link set without one
    /// contributes nothing.
    fn parse_elink_response(
        xml: &str,
        link_name: &str,
    ) -> Result<Vec<(String, Vec<String>)>, SourceError> {
        #[derive(Debug, Deserialize)]
        struct ELinkResult {
            #[serde(rename = "LinkSet", default)]
            linksets: Vec<LinkSet>,
        }

        #[derive(Debug, Deserialize)]
        struct LinkSet {
            #[serde(rename = "IdList")]
            id_list: Option<IdList>,
            #[serde(rename = "LinkSetDb", default)]
            linkset_dbs: Vec<LinkSetDb>,
        }

        #[derive(Debug, Deserialize)]
        struct IdList {
            #[serde(rename = "Id", default)]
            ids: Vec<String>,
        }

        #[derive(Debug, Deserialize)]
        struct LinkSetDb {
            #[serde(rename = "LinkName")]
            link_name: Option<String>,
            #[serde(rename = "Link", default)]
            links: Vec<Link>,
        }

        #[derive(Debug, Deserialize)]
        struct Link {
            #[serde(rename = "Id")]
            id: String,
        }

        let result: ELinkResult = from_str(xml)?;

        let mut pairs = Vec::with_capacity(result.linksets.len());
        for linkset in result.linksets {
            let query_id = linkset
                .id_list
                .and_then(|list| list.ids.into_iter().next())
                .ok_or_else(|| {
                    SourceError::MalformedResponse("link set without a queried id".to_string())
                })?;

            let matching = linkset
                .linkset_dbs
                .into_iter()
                .find(|db| db.link_name.as_deref().map_or(true, |name| name == link_name));

            if let Some(db) = matching {
                let links = db.links.into_iter().map(|link| link.id).collect();
                pairs.push((query_id, links));
            }
        }

        Ok(pairs)
    }

    /// Parse an ESummary response into its flat (name, value) item list.
    ///
    /// Container items (`Type="List"` or with nested items) carry no value of
    /// their own; their leaves are listed in document order.
    fn parse_summary_response(xml: &str) -> Result<Vec<(String, String)>, SourceError> {
        struct OpenItem {
            name: String,
            container: bool,
            text: String,
        }

        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut pairs = Vec::new();
        let mut open: Vec<OpenItem> = Vec::new();
        let mut in_error = false;
        let mut error = String::new();

        loop {
            match reader.read_event()? {
                Event::Start(e) if e.name().as_ref() == b"Item" => {
                    let (name, container) = item_header(&e)?;
                    if let Some(parent) = open.last_mut() {
                        parent.container = true;
                    }
                    open.push(OpenItem {
                        name,
                        container,
                        text: String::new(),
                    });
                }
                Event::Empty(e) if e.name().as_ref() == b"Item" => {
                    let (name, container) = item_header(&e)?;
                    if let Some(parent) = open.last_mut() {
                        parent.container = true;
                    }
                    if !container {
                        pairs.push((name, String::new()));
                    }
                }
                Event::End(e) if e.name().as_ref() == b"Item" => {
                    if let Some(item) = open.pop() {
                        if !item.container {
                            pairs.push((item.name, item.text));
                        }
                    }
                }
                Event::Start(e) if e.name().as_ref() == b"ERROR" => in_error = true,
                Event::End(e) if e.name().as_ref() == b"ERROR" => in_error = false,
                Event::Text(t) => {
                    let text = t.unescape()?;
                    if let Some(item) = open.last_mut() {
                        item.text.push_str(&text);
                    } else if in_error {
                        error.push_str(&text);
                    }
                }
                Event::CData(c) => {
                    if let Some(item) = open.last_mut() {
                        item.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if pairs.is_empty() && !error.is_empty() {
            return Err(SourceError::MalformedResponse(format!(
                "ESummary error: {}",
                error
            )));
        }

        Ok(pairs)
    }
}

/// Name and container flag of an ESummary `<Item>`
fn item_header(e: &BytesStart<'_>) -> Result<(String, bool), SourceError> {
    let attribute = |key: &str| -> Result<Option<String>, SourceError> {
        match e.try_get_attribute(key) {
            Ok(Some(attr)) => Ok(Some(attr.unescape_value()?.into_owned())),
            Ok(None) => Ok(None),
            Err(err) => Err(SourceError::MalformedResponse(format!(
                "bad Item attribute: {}",
                err
            ))),
        }
    };

    let name = attribute("Name")?.ok_or_else(|| {
        SourceError::MalformedResponse("Item without a Name attribute".to_string())
    })?;
    let container = matches!(attribute("Type")?.as_deref(), Some("List" | "Structure"));

    Ok((name, container))
}

#[async_trait]
impl Source for PmcSource {
    fn id(&self) -> &str {
        "pmc"
    }

    fn name(&self) -> &str {
        "PubMed Central"
    }

    async fn convert(&self, ids: &[String], to: IdType) -> Result<ConversionResult, SourceError> {
        Self::require_ids(ids)?;

        let batch_count = ids.len().div_ceil(self.batch_size);
        let mut results = ConversionResult::with_capacity(ids.len());

        for (index, batch) in ids.chunks(self.batch_size).enumerate() {
            tracing::debug!(
                "Converting batch {}/{} ({} ids) to {}",
                index + 1,
                batch_count,
                batch.len(),
                to
            );

            let params = self.build_convert_params(batch);
            let xml = self
                .fetch(&self.endpoints.idconv_url, &params, "idconv")
                .await?;
            results.extend(Self::parse_convert_response(&xml, to)?);

            self.throttle.after_batch().await;
        }

        tracing::info!("Converted {} of {} ids to {}", results.len(), ids.len(), to);
        Ok(results)
    }

    async fn get_citations(
        &self,
        ids: &[String],
        direction: LinkDirection,
    ) -> Result<CitationMap, SourceError> {
        Self::require_ids(ids)?;

        let url = self.endpoints.elink_url();
        let link_name = direction.link_name();
        let mut results = CitationMap::with_capacity(ids.len());

        for batch in ids.chunks(self.batch_size) {
            tracing::debug!("Fetching {} links for {} ids", link_name, batch.len());

            let params = self.build_elink_params(batch, direction);
            let xml = self.fetch(&url, &params, "elink").await?;
            results.extend(Self::parse_elink_response(&xml, link_name)?);

            self.throttle.after_batch().await;
        }

        tracing::info!(
            "{} of {} ids have {} links",
            results.len(),
            ids.len(),
            direction
        );
        Ok(results)
    }

    async fn get_metadata(&self, id: &str) -> Result<Metadata, SourceError> {
        let params = self.build_summary_params(id);
        let xml = self
            .fetch(&self.endpoints.esummary_url(), &params, "esummary")
            .await?;
        let metadata = Metadata::from_pairs(Self::parse_summary_response(&xml)?);

        self.throttle.after_single().await;

        tracing::debug!("Fetched {} metadata fields for {}", metadata.len(), id);
        Ok(metadata)
    }
}
