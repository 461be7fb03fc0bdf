//! REST implementation of the [`StorageApi`] boundary.
//!
//! Calls follow the provider's `{base}/{Service}/{id}/{method}.json`
//! convention with HTTP basic authentication. Lookups are GETs carrying
//! `objectMask`/`objectFilter` query parameters; mutations are POSTs with a
//! `parameters` array body. The client holds no state beyond the reqwest
//! connection pool, so one handle per process is enough.

mod filter;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::api::{
    ApiError, ApiFuture, Datacenter, ItemPrice, Partnership, StorageApi, StorageOrder, Volume,
};
use crate::config::{ApiConfig, ConfigError};

const STORAGE_SERVICE: &str = "Network_Storage_Iscsi";
const ORDER_SERVICE: &str = "Product_Order";
const PACKAGE_SERVICE: &str = "Product_Package";
const BILLING_SERVICE: &str = "Billing_Item";
const LOCATION_SERVICE: &str = "Location_Datacenter";
const ACCOUNT_SERVICE: &str = "Account";

/// Storage API client speaking the provider's JSON REST dialect.
#[derive(Clone, Debug)]
pub struct RestClient {
    http: Client,
    config: ApiConfig,
}

impl RestClient {
    /// Constructs a new client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the provided configuration fails
    /// validation.
    pub fn new(config: ApiConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            http: Client::new(),
            config,
        })
    }

    /// Builds a method endpoint, optionally scoped to an object id.
    fn endpoint(&self, service: &str, id: Option<i64>, method: &str) -> String {
        let base = self.config.api_url.trim_end_matches('/');
        id.map_or_else(
            || format!("{base}/{service}/{method}.json"),
            |object_id| format!("{base}/{service}/{object_id}/{method}.json"),
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&self.config.username, Some(&self.config.api_key))
    }

    async fn send(
        &self,
        request: RequestBuilder,
        not_found: Option<(&'static str, i64)>,
    ) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            if let Some((resource, id)) = not_found {
                return Err(ApiError::NotFound { resource, id });
            }
        }
        Err(provider_failure(response).await)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        what: &'static str,
        not_found: Option<(&'static str, i64)>,
    ) -> Result<T, ApiError> {
        tracing::debug!(%url, "issuing GET");
        let response = self
            .send(self.request(Method::GET, url).query(query), not_found)
            .await?;
        decode(response, what).await
    }

    async fn post_call(
        &self,
        url: &str,
        parameters: Value,
        not_found: Option<(&'static str, i64)>,
    ) -> Result<Response, ApiError> {
        tracing::debug!(%url, "issuing POST");
        let body = json!({ "parameters": parameters });
        self.send(self.request(Method::POST, url).json(&body), not_found)
            .await
    }

    fn filter_param(pattern: &str) -> Result<(&'static str, String), ApiError> {
        let rendered =
            serde_json::to_string(&filter::description_filter(pattern)).map_err(|err| {
                ApiError::Decode {
                    what: "object filter",
                    message: err.to_string(),
                }
            })?;
        Ok(("objectFilter", rendered))
    }
}

impl StorageApi for RestClient {
    fn volume<'a>(&'a self, id: i64, mask: &'a str) -> ApiFuture<'a, Volume> {
        Box::pin(async move {
            let url = self.endpoint(STORAGE_SERVICE, Some(id), "getObject");
            self.get_json(
                &url,
                &[("objectMask", mask.to_owned())],
                "volume record",
                Some(("volume", id)),
            )
            .await
        })
    }

    fn volumes<'a>(&'a self, mask: &'a str) -> ApiFuture<'a, Vec<Volume>> {
        Box::pin(async move {
            let url = self.endpoint(ACCOUNT_SERVICE, None, "getIscsiNetworkStorage");
            self.get_json(
                &url,
                &[("objectMask", mask.to_owned())],
                "volume listing",
                None,
            )
            .await
        })
    }

    fn item_prices<'a>(
        &'a self,
        package_id: i64,
        description: &'a str,
    ) -> ApiFuture<'a, Vec<ItemPrice>> {
        Box::pin(async move {
            let url = self.endpoint(PACKAGE_SERVICE, Some(package_id), "getItemPrices");
            let query = [
                ("objectMask", filter::PRICE_MASK.to_owned()),
                Self::filter_param(description)?,
            ];
            self.get_json(&url, &query, "price catalog", None).await
        })
    }

    fn verify_order<'a>(&'a self, order: &'a StorageOrder) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let url = self.endpoint(ORDER_SERVICE, None, "verifyOrder");
            self.post_call(&url, json!([order]), None).await?;
            Ok(())
        })
    }

    fn place_order<'a>(&'a self, order: &'a StorageOrder) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let url = self.endpoint(ORDER_SERVICE, None, "placeOrder");
            self.post_call(&url, json!([order]), None).await?;
            Ok(())
        })
    }

    fn cancel_item<'a>(
        &'a self,
        immediate: bool,
        cancel_associated: bool,
        reason: &'a str,
        id: i64,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let url = self.endpoint(BILLING_SERVICE, Some(id), "cancelItem");
            self.post_call(
                &url,
                json!([immediate, cancel_associated, reason]),
                Some(("billing item", id)),
            )
            .await?;
            Ok(())
        })
    }

    fn create_snapshot<'a>(&'a self, notes: &'a str, id: i64) -> ApiFuture<'a, Volume> {
        Box::pin(async move {
            let url = self.endpoint(STORAGE_SERVICE, Some(id), "createSnapshot");
            let response = self
                .post_call(&url, json!([notes]), Some(("volume", id)))
                .await?;
            decode(response, "snapshot record").await
        })
    }

    fn delete_snapshot<'a>(&'a self, id: i64) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let url = self.endpoint(STORAGE_SERVICE, Some(id), "deleteObject");
            self.post_call(&url, json!([]), Some(("snapshot", id)))
                .await?;
            Ok(())
        })
    }

    fn restore_from_snapshot<'a>(&'a self, snapshot_id: i64, id: i64) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let url = self.endpoint(STORAGE_SERVICE, Some(id), "restoreFromSnapshot");
            self.post_call(&url, json!([snapshot_id]), Some(("volume", id)))
                .await?;
            Ok(())
        })
    }

    fn partnerships<'a>(&'a self, mask: &'a str, id: i64) -> ApiFuture<'a, Vec<Partnership>> {
        Box::pin(async move {
            let url = self.endpoint(STORAGE_SERVICE, Some(id), "getPartnerships");
            self.get_json(
                &url,
                &[("objectMask", mask.to_owned())],
                "partnership listing",
                Some(("volume", id)),
            )
            .await
        })
    }

    fn datacenters<'a>(&'a self, mask: &'a str) -> ApiFuture<'a, Vec<Datacenter>> {
        Box::pin(async move {
            let url = self.endpoint(LOCATION_SERVICE, None, "getDatacenters");
            self.get_json(
                &url,
                &[("objectMask", mask.to_owned())],
                "datacenter listing",
                None,
            )
            .await
        })
    }
}

/// Application-level error body returned by the provider.
#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: String,
    #[serde(default)]
    code: Option<String>,
}

fn transport(err: reqwest::Error) -> ApiError {
    ApiError::Transport {
        message: err.to_string(),
    }
}

async fn decode<T: DeserializeOwned>(response: Response, what: &'static str) -> Result<T, ApiError> {
    response.json::<T>().await.map_err(|err| ApiError::Decode {
        what,
        message: err.to_string(),
    })
}

/// Shapes a non-success response into a provider error, falling back to the
/// bare status line when the body is not the provider's error shape.
async fn provider_failure(response: Response) -> ApiError {
    let status = response.status();
    match response.json::<ProviderErrorBody>().await {
        Ok(body) => ApiError::Provider {
            code: body.code,
            message: body.error,
        },
        Err(_) => ApiError::Provider {
            code: None,
            message: format!("HTTP status {status}"),
        },
    }
}
