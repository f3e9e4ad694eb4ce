use std::{net::SocketAddr, time::Duration};

use clap::{Parser, Subcommand};
use skybooker::{
    Error, RestConfig, Skybooker, StoreConfig,
    client::{
        ClientConfig, HttpClient,
        views::{
            AdminView, ConfirmationView, FlightDetailView, FlightListView, MyBookingsView,
            admin::{Dialog, FlightForm},
            flight_detail::{DetailState, Phase},
            flight_list::Rendered,
        },
    },
    doc::{DocumentId, aviation::flight::Flight, timestamp},
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    signal,
    sync::{mpsc, oneshot},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use url::Url;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    info!("Starting SkyBooker binary...");
    if let Err(e) = run(args).await {
        error!("Error: {e:?}");
        eprintln!("{e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    match &args.command {
        Command::Serve => serve(&args, true).await,
        Command::Status => serve(&args, false).await,
        command => {
            let client = HttpClient::new(&args.to_client_config()?)?;
            run_client(command, &client).await
        }
    }
}

async fn serve(args: &Args, daemon: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.to_config()?;

    let (skybooker, command_sender) = Skybooker::new(config)?;
    let (ready_sender, ready_receiver) = oneshot::channel();
    let skybooker_task = tokio::spawn(async move { skybooker.run(ready_sender).await });
    ready_receiver.await??;

    handle_status(&command_sender).await;
    if daemon {
        daemonize().await;
    }

    // Shutdown SkyBooker.
    command_sender
        .send(skybooker::Command::Shutdown)
        .await
        .inspect_err(|e| {
            error!("Channel send error: {e}");
        })?;
    info!("Waiting for SkyBooker to terminate...");
    if let Err(e) = skybooker_task.await {
        error!("Failed to wait until SkyBooker is terminated: {e}");
    }
    info!("SkyBooker has been terminated.");
    Ok(())
}

/// A future that resolves when a termination signal is received.
async fn daemonize() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Termination signal received");
}

async fn handle_status(command_sender: &mpsc::Sender<skybooker::Command>) {
    info!("Handling status command");
    let (reply_sender, reply_receiver) = oneshot::channel();
    if let Err(e) = command_sender
        .send(skybooker::Command::Status { reply_sender })
        .await
    {
        error!("Channel send error: {e}");
        return;
    }
    let status = match reply_receiver.await {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => {
            error!("Failed to collect status: {e}");
            return;
        }
        Err(_) => {
            error!("Failed to receive status reply");
            return;
        }
    };

    println!("============================");
    println!(" Status");
    println!("============================");
    match serde_json::to_string_pretty(&status) {
        Ok(json) => println!("{json}"),
        Err(e) => error!("Failed to serialize status: {e}"),
    }
}

async fn run_client(
    command: &Command,
    api: &HttpClient,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Serve | Command::Status => unreachable!("handled by serve"),
        Command::Flights => list_flights(api).await,
        Command::Show { id } => show_flight(api, *id).await,
        Command::Book(booking) => book(api, booking).await,
        Command::Bookings => list_bookings(api).await,
        Command::Admin { command } => admin(api, command).await,
    }
}

fn print_flight(flight: &Flight) {
    let record = &flight.record;
    println!(
        "{:<7} {:<20} {:<44} {} → {} ({})  ${:<8} {:>3} seats  {}",
        record.flight_number,
        record.airline,
        record.route(),
        timestamp::format(&record.departure_time),
        timestamp::format(&record.arrival_time),
        record.travel_time(),
        record.price,
        record.seats_available,
        flight.id,
    );
}

async fn list_flights(api: &HttpClient) -> Result<(), Box<dyn std::error::Error>> {
    let mut view = FlightListView::new();
    view.load(api).await;
    match view.rendered() {
        Rendered::Loading => {}
        Rendered::Flights(flights) => flights.iter().for_each(print_flight),
        Rendered::Samples(flights) => {
            println!("(sample flights)");
            flights.iter().for_each(print_flight);
        }
    }
    Ok(())
}

async fn show_flight(api: &HttpClient, id: DocumentId) -> Result<(), Box<dyn std::error::Error>> {
    let mut view = FlightDetailView::new(id);
    view.load(api).await;
    match view.state() {
        DetailState::Found(found) => {
            print_flight(&found.flight);
            if let Some(summary) = view.summary() {
                println!("Duration:         {}", summary.travel_time);
                println!("Base fare:        ${}", summary.base_fare);
                println!("Taxes & fees:     ${}", summary.taxes_and_fees);
                println!("Per passenger:    ${}", summary.per_passenger);
            }
            Ok(())
        }
        DetailState::NotFound => Err(format!("Flight {id} not found").into()),
        DetailState::Unavailable(message) => {
            Err(format!("Flight service unavailable, try again: {message}").into())
        }
        DetailState::Loading => Ok(()),
    }
}

async fn book(api: &HttpClient, args: &BookArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut view = FlightDetailView::new(args.flight_id);
    view.load(api).await;
    let Some(form) = view.form_mut() else {
        return match view.state() {
            DetailState::Unavailable(message) => {
                Err(format!("Flight service unavailable, try again: {message}").into())
            }
            _ => Err(format!("Flight {} not found", args.flight_id).into()),
        };
    };
    form.first_name = args.first_name.clone();
    form.last_name = args.last_name.clone();
    form.email = args.email.clone();
    form.phone = args.phone.clone();
    form.passengers = args.passengers;

    let total = view.summary().map(|summary| summary.total);
    match view.submit(api).await.cloned() {
        Some(Phase::Redirected(redirect)) => {
            let confirmation = ConfirmationView::from(redirect);
            println!("Booking confirmed!");
            println!("Booking reference: {}", confirmation.booking_reference());
            println!("Flight:            {}", confirmation.flight_id());
            if let Some(total) = total {
                println!("Total:             ${total}");
            }
            Ok(())
        }
        Some(Phase::Error(message)) => Err(message.into()),
        _ => Err("Booking was not submitted".into()),
    }
}

async fn list_bookings(api: &HttpClient) -> Result<(), Box<dyn std::error::Error>> {
    let mut view = MyBookingsView::new();
    view.load(api).await;
    if let Some(message) = view.unavailable() {
        return Err(format!("Failed to load bookings: {message}").into());
    }
    let rows = view.rows();
    if rows.is_empty() {
        println!("No bookings yet.");
    }
    for row in rows {
        println!(
            "{}  {:<7} {:<44} {}  {}",
            row.reference,
            row.flight_number,
            row.route,
            timestamp::format(&row.departure_date),
            row.status
        );
    }
    Ok(())
}

async fn admin(api: &HttpClient, command: &AdminCommand) -> Result<(), Box<dyn std::error::Error>> {
    let mut view = AdminView::new();
    view.load(api).await;
    if let Some(message) = view.error() {
        return Err(message.to_string().into());
    }

    match command {
        AdminCommand::Add(fields) => {
            view.open_add();
            fields.fill(view.form_mut());
            save(&mut view, api).await
        }
        AdminCommand::Edit { id, fields } => {
            if !view.open_edit(*id) {
                return Err(format!("Flight {id} not found").into());
            }
            fields.fill(view.form_mut());
            save(&mut view, api).await
        }
        AdminCommand::Delete { id, yes } => {
            let Some(prompt) = view.request_delete(*id) else {
                return Err(format!("Flight {id} not found").into());
            };
            if !yes && !confirm(&prompt).await? {
                view.cancel_delete();
                println!("Cancelled.");
                return Ok(());
            }
            if !view.confirm_delete(api).await {
                return Err(view.error().unwrap_or("Failed to delete flight").into());
            }
            println!("Flight deleted successfully");
            Ok(())
        }
    }
}

async fn save(view: &mut AdminView, api: &HttpClient) -> Result<(), Box<dyn std::error::Error>> {
    let editing = matches!(view.dialog(), Dialog::Edit(_));
    if !view.submit(api).await {
        return Err(view.error().unwrap_or("Failed to save flight").into());
    }
    println!("{}", if editing { "Flight updated." } else { "Flight added." });
    view.flights().iter().for_each(print_flight);
    Ok(())
}

async fn confirm(prompt: &str) -> Result<bool, std::io::Error> {
    println!("{prompt} [y/N]");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

#[derive(Debug, Parser)]
struct Args {
    /// Store connection string: `memory://` or `file:///absolute/dir`.
    #[clap(long, env = "SKYBOOKER_STORE_URL")]
    store_url: Option<String>,
    #[clap(long, env = "SKYBOOKER_REST_ADDR")]
    rest_addr: Option<SocketAddr>,
    /// Base URL of a running service, used by the client commands.
    #[clap(long, env = "SKYBOOKER_API_URL", default_value = "http://127.0.0.1:3000")]
    api_url: String,
    #[clap(long, value_parser = humantime::parse_duration)]
    request_timeout: Option<Duration>,
    #[clap(subcommand)]
    command: Command,
}

impl Args {
    fn to_config(&self) -> Result<skybooker::Config, Error> {
        let store_url = self.store_url.as_deref().ok_or_else(|| {
            Error::InvalidConfig("--store-url or SKYBOOKER_STORE_URL is required".to_string())
        })?;
        let url = Url::parse(store_url)
            .map_err(|e| Error::InvalidConfig(format!("Invalid store URL {store_url:?}: {e}")))?;

        Ok(skybooker::Config {
            store: StoreConfig::new(url).map_err(|e| Error::InvalidConfig(e.to_string()))?,
            rest: self
                .rest_addr
                .map_or(Default::default(), |addr| RestConfig { addr }),
        })
    }

    fn to_client_config(&self) -> Result<ClientConfig, Error> {
        let api_url = Url::parse(&self.api_url).map_err(|e| {
            Error::InvalidConfig(format!("Invalid API URL {:?}: {e}", self.api_url))
        })?;
        let mut config = ClientConfig::new(api_url);
        if let Some(timeout) = self.request_timeout {
            config.request_timeout = timeout;
        }
        Ok(config)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the service until a termination signal is received.
    Serve,
    /// Start the service, print its status and exit.
    Status,
    /// List flights.
    Flights,
    /// Show a flight with its fare breakdown.
    Show { id: DocumentId },
    /// Book a flight.
    Book(BookArgs),
    /// List bookings.
    Bookings,
    /// Manage the flight inventory.
    Admin {
        #[clap(subcommand)]
        command: AdminCommand,
    },
}

#[derive(Debug, clap::Args)]
struct BookArgs {
    flight_id: DocumentId,
    #[clap(long)]
    first_name: String,
    #[clap(long)]
    last_name: String,
    #[clap(long)]
    email: String,
    #[clap(long)]
    phone: String,
    #[clap(long, default_value_t = 1)]
    passengers: u32,
}

#[derive(Debug, Subcommand)]
enum AdminCommand {
    Add(FlightFields),
    Edit {
        id: DocumentId,
        #[clap(flatten)]
        fields: FlightFields,
    },
    Delete {
        id: DocumentId,
        /// Skip the confirmation prompt.
        #[clap(long)]
        yes: bool,
    },
}

/// Admin form fields. Omitted fields keep the dialog's current value.
#[derive(Debug, clap::Args)]
struct FlightFields {
    #[clap(long)]
    flight_number: Option<String>,
    #[clap(long)]
    airline: Option<String>,
    #[clap(long)]
    from: Option<String>,
    #[clap(long)]
    to: Option<String>,
    /// `YYYY-MM-DDTHH:MM` (UTC) or RFC 3339.
    #[clap(long)]
    departure_time: Option<String>,
    #[clap(long)]
    arrival_time: Option<String>,
    #[clap(long)]
    price: Option<String>,
    #[clap(long)]
    seats_available: Option<String>,
}

impl FlightFields {
    fn fill(&self, form: &mut FlightForm) {
        let fields = [
            (&self.flight_number, &mut form.flight_number),
            (&self.airline, &mut form.airline),
            (&self.from, &mut form.from),
            (&self.to, &mut form.to),
            (&self.departure_time, &mut form.departure_time),
            (&self.arrival_time, &mut form.arrival_time),
            (&self.price, &mut form.price),
            (&self.seats_available, &mut form.seats_available),
        ];
        for (value, field) in fields {
            if let Some(value) = value {
                value.clone_into(field);
            }
        }
    }
}
