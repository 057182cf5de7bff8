// ip-api geolocation lookup. The pro key is optional.

use async_trait::async_trait;
use serde::Deserialize;

use super::{send_json, trim_base_url, GeoSource, ProviderError};
use crate::{app_config::ThreatIntelConfig, models::GeoLocation};

const PROVIDER: &str = "ip-api";
const FIELDS: &str =
    "status,message,country,countryCode,regionName,city,isp,org,as,mobile,proxy,hosting";

pub struct IpApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl IpApiClient {
    pub fn new(http: reqwest::Client, config: &ThreatIntelConfig) -> Self {
        Self {
            http,
            base_url: trim_base_url(&config.ipapi_base_url),
            api_key: config
                .ipapi_api_key
                .as_ref()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    region_name: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    isp: Option<String>,
    #[serde(default)]
    org: Option<String>,
    #[serde(rename = "as", default)]
    asn: Option<String>,
    #[serde(default)]
    mobile: bool,
    #[serde(default)]
    proxy: bool,
    #[serde(default)]
    hosting: bool,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TryFrom<IpApiResponse> for GeoLocation {
    type Error = ProviderError;

    fn try_from(body: IpApiResponse) -> Result<Self, Self::Error> {
        if body.status != "success" {
            return Err(ProviderError::Rejected {
                provider: PROVIDER,
                message: body.message.unwrap_or_else(|| body.status.clone()),
            });
        }
        Ok(GeoLocation {
            country: non_empty(body.country),
            country_code: non_empty(body.country_code),
            region: non_empty(body.region_name),
            city: non_empty(body.city),
            isp: non_empty(body.isp),
            org: non_empty(body.org),
            asn: non_empty(body.asn),
            hosting: body.hosting,
            proxy: body.proxy,
            mobile: body.mobile,
        })
    }
}

#[async_trait]
impl GeoSource for IpApiClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn locate(&self, ip: &str) -> Result<GeoLocation, ProviderError> {
        let mut request = self
            .http
            .get(format!("{}/json/{}", self.base_url, ip))
            .query(&[("fields", FIELDS)]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }

        let body: IpApiResponse = send_json(PROVIDER, request).await?;
        body.try_into()
    }
}
