use std::borrow::Cow;

use tracing::warn;

use crate::{
    client::{Error, FlightsApi, sample},
    doc::aviation::flight::Flight,
};

/// Outcome of the last listing.
#[derive(Debug, Clone, PartialEq)]
pub enum Listing {
    Loaded(Vec<Flight>),
    Failed(Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rendered<'a> {
    Loading,
    Flights(Cow<'a, [Flight]>),
    /// Demo flights shown when the listing is empty or failed.
    Samples(Vec<Flight>),
}

#[derive(Debug)]
pub struct FlightListView {
    loading: bool,
    listing: Option<Listing>,
}

impl Default for FlightListView {
    fn default() -> Self {
        Self::new()
    }
}

impl FlightListView {
    pub fn new() -> Self {
        Self {
            loading: true,
            listing: None,
        }
    }

    pub async fn load<A: FlightsApi + ?Sized>(&mut self, api: &A) {
        self.loading = true;
        self.listing = Some(match api.list_flights().await {
            Ok(flights) => Listing::Loaded(flights),
            Err(e) => {
                warn!("Failed to fetch flights: {e}");
                Listing::Failed(e)
            }
        });
        self.loading = false;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn listing(&self) -> Option<&Listing> {
        self.listing.as_ref()
    }

    pub fn rendered(&self) -> Rendered<'_> {
        match &self.listing {
            _ if self.loading => Rendered::Loading,
            None => Rendered::Loading,
            Some(Listing::Loaded(flights)) if !flights.is_empty() => {
                Rendered::Flights(Cow::Borrowed(flights))
            }
            Some(_) => Rendered::Samples(sample::flights()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{api::tests::memory_store, client::tests::Unreachable};

    #[test_log::test(tokio::test)]
    async fn empty_listing_renders_samples() {
        let (store, _runner) = memory_store().await;
        let mut view = FlightListView::new();
        assert_eq!(view.rendered(), Rendered::Loading);

        view.load(&store).await;
        assert!(!view.is_loading());
        assert_eq!(view.listing(), Some(&Listing::Loaded(vec![])));
        assert_eq!(view.rendered(), Rendered::Samples(sample::flights()));
    }

    #[test_log::test(tokio::test)]
    async fn failed_listing_renders_samples() {
        let mut view = FlightListView::new();
        view.load(&Unreachable).await;
        assert!(matches!(view.listing(), Some(Listing::Failed(Error::Unavailable(_)))));
        assert_eq!(view.rendered(), Rendered::Samples(sample::flights()));
    }

    #[test_log::test(tokio::test)]
    async fn stored_flights_replace_samples() {
        let (store, _runner) = memory_store().await;
        let mut record = sample::flights().remove(0).record;
        record.flight_number = "SK999".to_string();
        let created = crate::api::inventory::create_flight(&store, record)
            .await
            .unwrap();

        let mut view = FlightListView::new();
        view.load(&store).await;
        assert_eq!(
            view.rendered(),
            Rendered::Flights(Cow::Owned(vec![created]))
        );
    }
}
