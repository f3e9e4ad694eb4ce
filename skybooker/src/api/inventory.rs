use tracing::info;

use crate::{
    actors::store::StoreHandle,
    api::{Error, decode, decode_all, to_fields},
    doc::{
        DocumentId,
        aviation::flight::{COLLECTION, Flight, FlightPatch, FlightRecord, FlightUpdate},
    },
};

pub async fn list_flights(store: &StoreHandle) -> Result<Vec<Flight>, Error> {
    decode_all(store.list(COLLECTION).await?)
}

pub async fn create_flight(store: &StoreHandle, record: FlightRecord) -> Result<Flight, Error> {
    record.validate()?;
    let document = store.insert(COLLECTION, to_fields(&record)?).await?;
    info!(
        "Flight {} created: {}",
        record.flight_number, document.id
    );
    decode(document)
}

pub async fn get_flight(store: &StoreHandle, id: DocumentId) -> Result<Flight, Error> {
    decode(store.get(COLLECTION, id).await?)
}

/// Merges `patch` onto the stored flight and returns the identifier with the
/// submitted fields only. The merged record must still satisfy every flight
/// invariant.
///
/// Concurrent updates of the same flight are not detected; the last write of
/// each field wins.
pub async fn update_flight(
    store: &StoreHandle,
    id: DocumentId,
    patch: FlightPatch,
) -> Result<FlightUpdate, Error> {
    let mut flight = get_flight(store, id).await?;
    patch.apply(&mut flight.record);
    flight.record.validate()?;

    store.merge(COLLECTION, id, to_fields(&patch)?).await?;
    info!("Flight {id} updated");
    Ok(FlightUpdate { id, patch })
}

pub async fn delete_flight(store: &StoreHandle, id: DocumentId) -> Result<(), Error> {
    store.delete(COLLECTION, id).await?;
    info!("Flight {id} deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use serde_json::json;

    use super::*;
    use crate::{api::tests::memory_store, doc::ValidationError};

    fn record(flight_number: &str) -> FlightRecord {
        FlightRecord::from_json(json!({
            "flightNumber": flight_number,
            "airline": "SkyBooker Airways",
            "from": "New York (JFK)",
            "to": "Los Angeles (LAX)",
            "departureTime": "2023-06-15T08:00:00Z",
            "arrivalTime": "2023-06-15T11:30:00Z",
            "price": 299,
            "seatsAvailable": 45,
        }))
        .unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn empty_inventory() {
        let (store, _runner) = memory_store().await;
        assert!(list_flights(&store).await.unwrap().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn created_ids_are_unique_and_stable() {
        let (store, _runner) = memory_store().await;

        let mut ids = HashSet::new();
        for n in 0..5 {
            let created = create_flight(&store, record(&format!("SK10{n}")))
                .await
                .unwrap();
            assert!(ids.insert(created.id));
            assert_eq!(get_flight(&store, created.id).await.unwrap(), created);
        }

        let listed = list_flights(&store).await.unwrap();
        assert_eq!(listed.len(), 5);
        assert!(listed.iter().all(|flight| ids.contains(&flight.id)));
    }

    #[test_log::test(tokio::test)]
    async fn invalid_record_is_not_stored() {
        let (store, _runner) = memory_store().await;
        let mut r = record("SK101");
        r.arrival_time = r.departure_time;

        assert!(matches!(
            create_flight(&store, r).await,
            Err(Error::Validation(ValidationError::ArrivalNotAfterDeparture))
        ));
        assert!(list_flights(&store).await.unwrap().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn partial_update_keeps_other_fields() {
        let (store, _runner) = memory_store().await;
        let created = create_flight(&store, record("SK101")).await.unwrap();

        let patch = FlightPatch::from_json(json!({"price": 199})).unwrap();
        let update = update_flight(&store, created.id, patch).await.unwrap();
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"id": created.id.to_string(), "price": 199.0})
        );

        let fetched = get_flight(&store, created.id).await.unwrap();
        let mut expected = created.clone();
        expected.record.price = 199.0;
        assert_eq!(fetched, expected);
    }

    #[test_log::test(tokio::test)]
    async fn update_violating_invariant_is_rejected() {
        let (store, _runner) = memory_store().await;
        let created = create_flight(&store, record("SK101")).await.unwrap();

        let patch = FlightPatch::from_json(json!({"arrivalTime": "2023-06-15T07:00:00Z"})).unwrap();
        assert!(matches!(
            update_flight(&store, created.id, patch).await,
            Err(Error::Validation(ValidationError::ArrivalNotAfterDeparture))
        ));
        assert_eq!(get_flight(&store, created.id).await.unwrap(), created);
    }

    #[test_log::test(tokio::test)]
    async fn delete_then_get_is_not_found() {
        let (store, _runner) = memory_store().await;
        let created = create_flight(&store, record("SK101")).await.unwrap();

        delete_flight(&store, created.id).await.unwrap();
        assert!(matches!(
            get_flight(&store, created.id).await,
            Err(Error::NotFound { .. })
        ));
    }

    #[test_log::test(tokio::test)]
    async fn missing_flight_is_not_found() {
        let (store, _runner) = memory_store().await;
        let id = DocumentId::new_random();

        assert!(matches!(
            get_flight(&store, id).await,
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            update_flight(&store, id, FlightPatch::default()).await,
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            delete_flight(&store, id).await,
            Err(Error::NotFound { .. })
        ));
    }

    #[test_log::test(tokio::test)]
    async fn stopped_store_is_unavailable() {
        let (store, runner) = memory_store().await;
        runner.shutdown().await;
        assert!(matches!(
            list_flights(&store).await,
            Err(Error::StorageUnavailable(_))
        ));
    }
}
