use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::{
    client::{Error, FlightsApi},
    doc::{
        DocumentId,
        aviation::{
            booking::{Booking, BookingRecord},
            flight::{Flight, FlightPatch, FlightRecord, FlightUpdate},
        },
    },
};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the REST API, e.g. `http://127.0.0.1:3000/`. `https`
    /// URLs are served over rustls.
    pub api_url: Url,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct HttpClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpClient {
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Unavailable(e.to_string()))?;

        // Relative joins replace the last path segment unless it ends with '/'.
        let mut base_url = config.api_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Unavailable(format!("invalid API URL: {e}")))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, Error> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        let status = response.status();
        debug!("{} {status}", response.url());

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| Error::Unavailable(format!("unexpected response: {e}")));
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        Err(match status {
            StatusCode::NOT_FOUND => Error::NotFound,
            StatusCode::BAD_REQUEST => Error::Rejected(message),
            _ => Error::Unavailable(message),
        })
    }
}

#[async_trait::async_trait]
impl FlightsApi for HttpClient {
    async fn list_flights(&self) -> Result<Vec<Flight>, Error> {
        self.send(self.client.get(self.url("flights")?)).await
    }

    async fn get_flight(&self, id: DocumentId) -> Result<Flight, Error> {
        self.send(self.client.get(self.url(&format!("flights/{id}"))?))
            .await
    }

    async fn create_flight(&self, record: FlightRecord) -> Result<Flight, Error> {
        self.send(self.client.post(self.url("flights")?).json(&record))
            .await
    }

    async fn update_flight(
        &self,
        id: DocumentId,
        patch: FlightPatch,
    ) -> Result<FlightUpdate, Error> {
        self.send(
            self.client
                .put(self.url(&format!("flights/{id}"))?)
                .json(&patch),
        )
        .await
    }

    async fn delete_flight(&self, id: DocumentId) -> Result<(), Error> {
        let _: Value = self
            .send(self.client.delete(self.url(&format!("flights/{id}"))?))
            .await?;
        Ok(())
    }

    async fn list_bookings(&self) -> Result<Vec<Booking>, Error> {
        self.send(self.client.get(self.url("bookings")?)).await
    }

    async fn create_booking(&self, record: BookingRecord) -> Result<Booking, Error> {
        self.send(self.client.post(self.url("bookings")?).json(&record))
            .await
    }
}
