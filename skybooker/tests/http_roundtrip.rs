use std::net::SocketAddr;

use skybooker::{
    Command, Config, RestConfig, Skybooker, StoreConfig,
    client::{
        ClientConfig, Error, FlightsApi, HttpClient,
        views::{
            AdminView, ConfirmationView, FlightDetailView, FlightListView, MyBookingsView,
            admin::FlightForm,
            flight_detail::{DetailState, Phase},
            flight_list::Rendered,
        },
    },
    doc::DocumentId,
};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use url::Url;

async fn start() -> (mpsc::Sender<Command>, JoinHandle<()>, SocketAddr) {
    let config = Config {
        store: StoreConfig::memory(),
        rest: RestConfig::default(),
    };
    let (skybooker, command_sender) = Skybooker::new(config).unwrap();
    let (ready_sender, ready_receiver) = oneshot::channel();
    let task = tokio::spawn(skybooker.run(ready_sender));
    ready_receiver.await.unwrap().unwrap();

    let (reply_sender, reply_receiver) = oneshot::channel();
    command_sender
        .send(Command::Status { reply_sender })
        .await
        .unwrap();
    let status = reply_receiver.await.unwrap().unwrap();
    (command_sender, task, status.rest_addr.unwrap())
}

fn client(addr: SocketAddr) -> HttpClient {
    let url = Url::parse(&format!("http://{addr}")).unwrap();
    HttpClient::new(&ClientConfig::new(url)).unwrap()
}

#[test_log::test(tokio::test)]
async fn book_a_flight_over_http() {
    let (command_sender, task, addr) = start().await;
    let api = client(addr);

    // Nothing stored yet: the listing falls back to samples.
    let mut list = FlightListView::new();
    list.load(&api).await;
    assert!(matches!(list.rendered(), Rendered::Samples(flights) if flights.len() == 3));

    // Add a flight through the admin view.
    let mut admin = AdminView::new();
    admin.load(&api).await;
    assert_eq!(admin.error(), None);
    admin.open_add();
    *admin.form_mut() = FlightForm {
        flight_number: "SK101".into(),
        airline: "SkyBooker Airways".into(),
        from: "New York (JFK)".into(),
        to: "Los Angeles (LAX)".into(),
        departure_time: "2023-06-15T08:00".into(),
        arrival_time: "2023-06-15T11:30".into(),
        price: "299".into(),
        seats_available: "45".into(),
    };
    assert!(admin.submit(&api).await, "{:?}", admin.error());
    let flight_id = admin.flights()[0].id;

    // Edit its price.
    assert!(admin.open_edit(flight_id));
    admin.form_mut().price = "279".into();
    assert!(admin.submit(&api).await, "{:?}", admin.error());
    assert_eq!(admin.flights()[0].record.price, 279.0);

    list.load(&api).await;
    assert!(matches!(list.rendered(), Rendered::Flights(flights) if flights.len() == 1));

    // Book it.
    let mut detail = FlightDetailView::new(flight_id);
    detail.load(&api).await;
    let form = detail.form_mut().unwrap();
    form.first_name = "Grace".into();
    form.last_name = "Hopper".into();
    form.email = "grace@example.com".into();
    form.phone = "+1 555 0199".into();
    form.passengers = 2;
    let Some(Phase::Redirected(redirect)) = detail.submit(&api).await.cloned() else {
        panic!("expected redirect, got {:?}", detail.state());
    };
    let confirmation = ConfirmationView::from(redirect);
    let reference = confirmation.booking_reference().as_str();
    assert_eq!(reference.len(), 8);
    assert!(reference.starts_with("SB"));
    assert!(reference[2..].chars().all(|c| c.is_ascii_digit()));
    assert_eq!(confirmation.flight_id(), flight_id);

    let mut bookings = MyBookingsView::new();
    bookings.load(&api).await;
    let rows = bookings.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0].reference, confirmation.booking_reference());
    assert_eq!(rows[0].flight_number, "SK101");

    // Delete the flight; the detail view now reports it missing.
    admin.request_delete(flight_id).unwrap();
    assert!(admin.confirm_delete(&api).await);
    assert!(admin.flights().is_empty());

    let mut detail = FlightDetailView::new(flight_id);
    detail.load(&api).await;
    assert_eq!(detail.state(), &DetailState::NotFound);

    command_sender.send(Command::Shutdown).await.unwrap();
    task.await.unwrap();
}

#[test_log::test(tokio::test)]
async fn error_statuses_map_to_client_errors() {
    let (command_sender, task, addr) = start().await;
    let api = client(addr);

    assert!(matches!(
        api.get_flight(DocumentId::new_random()).await,
        Err(Error::NotFound)
    ));
    assert!(matches!(
        api.delete_flight(DocumentId::new_random()).await,
        Err(Error::NotFound)
    ));

    let mut record = skybooker::client::sample::flights().remove(0).record;
    record.to = record.from.clone();
    assert!(matches!(
        api.create_flight(record).await,
        Err(Error::Rejected(_))
    ));
    assert!(api.list_flights().await.unwrap().is_empty());

    command_sender.send(Command::Shutdown).await.unwrap();
    task.await.unwrap();

    // The server is gone.
    assert!(matches!(
        api.list_flights().await,
        Err(Error::Unavailable(_))
    ));
}
