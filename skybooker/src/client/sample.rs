//! Fixed demo flights shown by the flight list when there is nothing to list.

use chrono::{DateTime, Utc};

use crate::doc::{
    DocumentId, timestamp,
    aviation::flight::{Flight, FlightRecord},
};

fn utc(s: &str) -> DateTime<Utc> {
    timestamp::parse(s).expect("sample timestamps are valid RFC 3339")
}

#[expect(clippy::too_many_arguments, reason = "one argument per sample column")]
fn flight(
    id: u128,
    flight_number: &str,
    from: &str,
    to: &str,
    departure_time: &str,
    arrival_time: &str,
    price: f64,
    seats_available: u32,
) -> Flight {
    Flight {
        id: DocumentId::from_u128(id),
        record: FlightRecord {
            flight_number: flight_number.to_string(),
            airline: "SkyBooker Airways".to_string(),
            from: from.to_string(),
            to: to.to_string(),
            departure_time: utc(departure_time),
            arrival_time: utc(arrival_time),
            price,
            seats_available,
        },
    }
}

pub fn flights() -> Vec<Flight> {
    vec![
        flight(
            1,
            "SK101",
            "New York (JFK)",
            "Los Angeles (LAX)",
            "2023-06-15T08:00:00Z",
            "2023-06-15T11:30:00Z",
            299.0,
            45,
        ),
        flight(
            2,
            "SK205",
            "Chicago (ORD)",
            "Miami (MIA)",
            "2023-06-16T10:15:00Z",
            "2023-06-16T13:45:00Z",
            249.0,
            32,
        ),
        flight(
            3,
            "SK310",
            "San Francisco (SFO)",
            "Seattle (SEA)",
            "2023-06-17T14:30:00Z",
            "2023-06-17T16:45:00Z",
            189.0,
            18,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_are_valid_flights() {
        let flights = flights();
        assert_eq!(flights.len(), 3);
        for flight in &flights {
            flight.record.validate().unwrap();
        }
        assert_eq!(flights[0].record.travel_time().to_string(), "3h 30m");
    }
}
