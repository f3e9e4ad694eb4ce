//! View state machines. Each view owns its state, drives the
//! [`FlightsApi`](crate::client::FlightsApi) it is given, and exposes what
//! should be rendered; presentation is left to the caller.

pub mod admin;
pub mod bookings;
pub mod confirmation;
pub mod flight_detail;
pub mod flight_list;

pub use admin::AdminView;
pub use bookings::MyBookingsView;
pub use confirmation::ConfirmationView;
pub use flight_detail::FlightDetailView;
pub use flight_list::FlightListView;
